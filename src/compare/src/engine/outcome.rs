//! Internal outcome of one compare operation
//!
//! The pipeline works on this tagged union and only flattens it into the
//! wire result-code space when the report is built.

use ldapd_core::types::{ResultCode, ResultReport, Verdict};
use ldapd_core::LdapError;
use serde::{Deserialize, Serialize};

/// Terminal outcome reported to the client
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Local evaluation against a synthesized entry
    Verdict(Verdict),

    /// Local access check refused the comparison
    AccessDenied,

    /// Operation-level failure
    Error(LdapError),

    /// No local backend holds the DN; carries the rewritten default referrals
    Referral(Vec<String>),

    /// Authoritative report from a backend, forwarded unchanged
    Delegated(ResultReport),
}

impl Outcome {
    pub fn into_report(self) -> ResultReport {
        match self {
            Outcome::Verdict(verdict) => ResultReport::verdict(verdict),
            Outcome::AccessDenied => ResultReport::new(ResultCode::InsufficientAccess),
            Outcome::Error(err) => ResultReport::from(err),
            Outcome::Referral(urls) => ResultReport::referral(urls),
            Outcome::Delegated(report) => report,
        }
    }
}

impl From<LdapError> for Outcome {
    fn from(err: LdapError) -> Self {
        Outcome::Error(err)
    }
}

/// What `CompareEngine::compare` did with the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum CompareStatus {
    /// One result report was sent
    Reported(ResultCode),
    /// A notice of disconnection was sent
    Disconnected,
    /// The operation was abandoned; nothing was sent
    Abandoned,
}

impl CompareStatus {
    pub fn code(self) -> Option<ResultCode> {
        match self {
            CompareStatus::Reported(code) => Some(code),
            _ => None,
        }
    }
}
