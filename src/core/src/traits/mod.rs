//! Collaborator contracts consumed by the compare path

pub mod backend;
pub mod collaborators;
pub mod sink;

pub use backend::{Backend, BackendRouter, CompareCapability};
pub use collaborators::{AccessGate, AccessKind, ControlProcessor, SchemaResolver, SpecialNamespace};
pub use sink::{CompareEvent, ResultSink, StatsSink};
