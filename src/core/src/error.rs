//! Unified error type for the directory server core
//!
//! Every operation-level failure of the compare path is one of these variants.
//! Each variant maps to exactly one wire result code; the flattening happens
//! only when a [`ResultReport`] is built.

use crate::types::result::{ResultCode, ResultReport};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LdapError>;

/// Operation-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LdapError {
    /// Malformed request reported as a result (e.g. a bad control value)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Target DN could not be normalized
    #[error("Invalid DN syntax: {0}")]
    InvalidDnSyntax(String),

    /// Assertion type is not a known attribute type
    #[error("Undefined attribute type: {0}")]
    UndefinedAttributeType(String),

    /// Attribute type has no equality matching rule
    #[error("Inappropriate matching: {0}")]
    InappropriateMatching(String),

    /// Value does not conform to the attribute syntax
    #[error("Invalid attribute syntax: {0}")]
    InvalidAttributeSyntax(String),

    /// Critical control not recognized
    #[error("Unavailable critical extension: {0}")]
    UnavailableCriticalExtension(String),

    /// Operation restricted or unsupported
    #[error("Unwilling to perform: {0}")]
    UnwillingToPerform(String),

    /// Security strength too low
    #[error("Confidentiality required: {0}")]
    ConfidentialityRequired(String),

    /// Target entry does not exist
    #[error("No such object: {0}")]
    NoSuchObject(String),

    /// Internal failure (resource or invariant)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LdapError {
    /// Create a protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        LdapError::Protocol(msg.into())
    }

    /// Create an invalid DN syntax error
    pub fn invalid_dn<S: Into<String>>(msg: S) -> Self {
        LdapError::InvalidDnSyntax(msg.into())
    }

    /// Create an invalid attribute syntax error
    pub fn invalid_syntax<S: Into<String>>(msg: S) -> Self {
        LdapError::InvalidAttributeSyntax(msg.into())
    }

    /// Create an unwilling to perform error
    pub fn unwilling<S: Into<String>>(msg: S) -> Self {
        LdapError::UnwillingToPerform(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        LdapError::Internal(msg.into())
    }

    /// Wire result code for this error
    pub fn result_code(&self) -> ResultCode {
        match self {
            LdapError::Protocol(_) => ResultCode::ProtocolError,
            LdapError::InvalidDnSyntax(_) => ResultCode::InvalidDnSyntax,
            LdapError::UndefinedAttributeType(_) => ResultCode::UndefinedAttributeType,
            LdapError::InappropriateMatching(_) => ResultCode::InappropriateMatching,
            LdapError::InvalidAttributeSyntax(_) => ResultCode::InvalidAttributeSyntax,
            LdapError::UnavailableCriticalExtension(_) => {
                ResultCode::UnavailableCriticalExtension
            }
            LdapError::UnwillingToPerform(_) => ResultCode::UnwillingToPerform,
            LdapError::ConfidentialityRequired(_) => ResultCode::ConfidentialityRequired,
            LdapError::NoSuchObject(_) => ResultCode::NoSuchObject,
            LdapError::Internal(_) => ResultCode::Other,
        }
    }

    /// Diagnostic text suitable for direct return to the client
    pub fn diagnostic(&self) -> &str {
        match self {
            LdapError::Protocol(text)
            | LdapError::InvalidDnSyntax(text)
            | LdapError::UndefinedAttributeType(text)
            | LdapError::InappropriateMatching(text)
            | LdapError::InvalidAttributeSyntax(text)
            | LdapError::UnavailableCriticalExtension(text)
            | LdapError::UnwillingToPerform(text)
            | LdapError::ConfidentialityRequired(text)
            | LdapError::NoSuchObject(text)
            | LdapError::Internal(text) => text,
        }
    }
}

impl From<&LdapError> for ResultReport {
    fn from(err: &LdapError) -> Self {
        ResultReport::new(err.result_code()).with_diagnostic(err.diagnostic())
    }
}

impl From<LdapError> for ResultReport {
    fn from(err: LdapError) -> Self {
        ResultReport::from(&err)
    }
}
