//! Per-operation context

use crate::types::dn::Dn;
use tokio_util::sync::CancellationToken;

/// Effects of the request controls on the operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    /// ManageDsaIT: treat referral objects as ordinary entries
    pub manage_dsa_it: bool,
}

/// Context of one operation on one connection
///
/// Cloning shares the cancellation token, so abandoning any clone abandons
/// the operation.
#[derive(Debug, Clone)]
pub struct Operation {
    pub conn_id: u64,
    pub op_id: u64,
    /// Authorization identity; `None` when anonymous
    pub authz_dn: Option<Dn>,
    /// Security strength factor of the connection
    pub ssf: u32,
    pub controls: ControlState,
    cancel: CancellationToken,
}

impl Operation {
    /// Anonymous operation with no controls
    pub fn new(conn_id: u64, op_id: u64) -> Self {
        Self {
            conn_id,
            op_id,
            authz_dn: None,
            ssf: 0,
            controls: ControlState::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Renumber the operation, e.g. with the message ID of a decoded PDU
    pub fn with_op_id(mut self, op_id: u64) -> Self {
        self.op_id = op_id;
        self
    }

    pub fn with_authz_dn(mut self, dn: Dn) -> Self {
        self.authz_dn = Some(dn);
        self
    }

    pub fn with_ssf(mut self, ssf: u32) -> Self {
        self.ssf = ssf;
        self
    }

    pub fn with_controls(mut self, controls: ControlState) -> Self {
        self.controls = controls;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.authz_dn.is_none()
    }

    /// Request early termination of the operation
    pub fn abandon(&self) {
        self.cancel.cancel();
    }

    pub fn is_abandoned(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
