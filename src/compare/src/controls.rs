//! Request control processing

use ldapd_core::traits::ControlProcessor;
use ldapd_core::types::{Control, ControlState};
use ldapd_core::{LdapError, Result};
use tracing::debug;

/// ManageDsaIT control (RFC 3296)
pub const MANAGE_DSA_IT_OID: &str = "2.16.840.1.113730.3.4.2";

/// Processor for the controls this server understands
#[derive(Debug, Clone, Default)]
pub struct StandardControls;

impl StandardControls {
    pub fn new() -> Self {
        Self
    }
}

impl ControlProcessor for StandardControls {
    fn process(&self, controls: &[Control]) -> Result<ControlState> {
        let mut state = ControlState::default();

        for control in controls {
            match control.oid.as_str() {
                MANAGE_DSA_IT_OID => {
                    if control.value.is_some() {
                        return Err(LdapError::protocol("manageDSAit control value not empty"));
                    }
                    state.manage_dsa_it = true;
                }
                _ if control.critical => {
                    debug!("Unrecognized critical control: {}", control.oid);
                    return Err(LdapError::UnavailableCriticalExtension(
                        "critical extension is not recognized".to_string(),
                    ));
                }
                _ => {
                    debug!("Ignoring non-critical control: {}", control.oid);
                }
            }
        }

        Ok(state)
    }

    fn supported_controls(&self) -> Vec<String> {
        vec![MANAGE_DSA_IT_OID.to_string()]
    }
}
