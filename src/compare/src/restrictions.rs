//! Operational restrictions
//!
//! One set applies server-wide, and each backend may carry its own.

use ldapd_core::types::Operation;
use ldapd_core::{LdapError, Result};
use serde::{Deserialize, Serialize};

/// Restrictions on compare operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restrictions {
    /// Refuse compare outright
    pub disallow_compare: bool,
    /// Refuse anonymous compare
    pub require_authentication: bool,
    /// Minimum security strength factor
    pub min_ssf: u32,
}

impl Restrictions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn check(&self, op: &Operation) -> Result<()> {
        if self.disallow_compare {
            return Err(LdapError::unwilling("operation restricted"));
        }
        if self.require_authentication && op.is_anonymous() {
            return Err(LdapError::unwilling("authentication required"));
        }
        if op.ssf < self.min_ssf {
            return Err(LdapError::ConfidentialityRequired(
                "confidentiality required".to_string(),
            ));
        }
        Ok(())
    }
}
