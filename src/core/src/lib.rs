//! # ldapd Core
//!
//! Shared types, collaborator traits and error handling for the directory
//! server. The compare path and its backends depend on this crate only.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{LdapError, Result};
pub use types::{
    AttributeAssertion, AttributeDescriptor, CompareRequest, Control, ControlState, Dn, Entry,
    Operation, ResultCode, ResultReport, Verdict,
};
