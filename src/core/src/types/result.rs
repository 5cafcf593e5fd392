//! Result codes, verdicts and the result report sent back to the client

use serde::{Deserialize, Serialize};
use std::fmt;

/// LDAP result codes produced (or forwarded) by the compare path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultCode {
    Success,
    OperationsError,
    ProtocolError,
    CompareFalse,
    CompareTrue,
    StrongAuthRequired,
    Referral,
    UnavailableCriticalExtension,
    ConfidentialityRequired,
    NoSuchAttribute,
    UndefinedAttributeType,
    InappropriateMatching,
    InvalidAttributeSyntax,
    NoSuchObject,
    InvalidDnSyntax,
    InsufficientAccess,
    Busy,
    Unavailable,
    UnwillingToPerform,
    Other,
}

impl ResultCode {
    /// Numeric code as carried in `LDAPResult.resultCode`
    pub fn code(self) -> u32 {
        match self {
            Self::Success => 0,
            Self::OperationsError => 1,
            Self::ProtocolError => 2,
            Self::CompareFalse => 5,
            Self::CompareTrue => 6,
            Self::StrongAuthRequired => 8,
            Self::Referral => 10,
            Self::UnavailableCriticalExtension => 12,
            Self::ConfidentialityRequired => 13,
            Self::NoSuchAttribute => 16,
            Self::UndefinedAttributeType => 17,
            Self::InappropriateMatching => 18,
            Self::InvalidAttributeSyntax => 21,
            Self::NoSuchObject => 32,
            Self::InvalidDnSyntax => 34,
            Self::InsufficientAccess => 50,
            Self::Busy => 51,
            Self::Unavailable => 52,
            Self::UnwillingToPerform => 53,
            Self::Other => 80,
        }
    }

    /// compareTrue and compareFalse are successful compares, not errors
    pub fn is_compare_success(self) -> bool {
        matches!(self, Self::CompareTrue | Self::CompareFalse)
    }

    /// Protocol name of the code (e.g. `compareTrue`)
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::OperationsError => "operationsError",
            Self::ProtocolError => "protocolError",
            Self::CompareFalse => "compareFalse",
            Self::CompareTrue => "compareTrue",
            Self::StrongAuthRequired => "strongerAuthRequired",
            Self::Referral => "referral",
            Self::UnavailableCriticalExtension => "unavailableCriticalExtension",
            Self::ConfidentialityRequired => "confidentialityRequired",
            Self::NoSuchAttribute => "noSuchAttribute",
            Self::UndefinedAttributeType => "undefinedAttributeType",
            Self::InappropriateMatching => "inappropriateMatching",
            Self::InvalidAttributeSyntax => "invalidAttributeSyntax",
            Self::NoSuchObject => "noSuchObject",
            Self::InvalidDnSyntax => "invalidDNSyntax",
            Self::InsufficientAccess => "insufficientAccessRights",
            Self::Busy => "busy",
            Self::Unavailable => "unavailable",
            Self::UnwillingToPerform => "unwillingToPerform",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Outcome of matching an assertion against an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    True,
    False,
    NoSuchAttribute,
}

impl Verdict {
    /// Verdict → result code mapping shared by the local and delegated paths
    pub fn result_code(self) -> ResultCode {
        match self {
            Verdict::True => ResultCode::CompareTrue,
            Verdict::False => ResultCode::CompareFalse,
            Verdict::NoSuchAttribute => ResultCode::NoSuchAttribute,
        }
    }
}

/// Result report carried back to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultReport {
    pub code: ResultCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_dn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrals: Option<Vec<String>>,
}

impl ResultReport {
    /// Report with only a result code
    pub fn new(code: ResultCode) -> Self {
        Self {
            code,
            matched_dn: None,
            diagnostic: None,
            referrals: None,
        }
    }

    /// Report for a verdict
    pub fn verdict(verdict: Verdict) -> Self {
        Self::new(verdict.result_code())
    }

    /// Referral report
    pub fn referral(urls: Vec<String>) -> Self {
        Self::new(ResultCode::Referral).with_referrals(urls)
    }

    pub fn with_diagnostic(mut self, text: impl Into<String>) -> Self {
        self.diagnostic = Some(text.into());
        self
    }

    pub fn with_matched_dn(mut self, dn: impl Into<String>) -> Self {
        self.matched_dn = Some(dn.into());
        self
    }

    pub fn with_referrals(mut self, urls: Vec<String>) -> Self {
        self.referrals = Some(urls);
        self
    }
}
