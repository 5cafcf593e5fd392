//! Shared directory types

pub mod dn;
pub mod entry;
pub mod operation;
pub mod request;
pub mod result;
pub mod schema;

pub use dn::{Dn, Rdn};
pub use entry::{Attribute, Entry};
pub use operation::{ControlState, Operation};
pub use request::{AttributeAssertion, CompareMessage, CompareRequest, Control};
pub use result::{ResultCode, ResultReport, Verdict};
pub use schema::{
    AttributeDescriptor, AttributeType, AttributeUsage, MatchingRule, NormalizedValue, Syntax,
};
