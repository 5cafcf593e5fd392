//! Result delivery and statistics sinks

use crate::error::Result;
use crate::types::{Operation, ResultCode, ResultReport};
use async_trait::async_trait;

/// Delivers the terminal outcome of an operation to the client
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Send a result report; the connection stays usable
    async fn send_result(&self, op: &Operation, report: ResultReport) -> Result<()>;

    /// Send a notice of disconnection and tear the connection down
    async fn send_disconnect(&self, op: &Operation, code: ResultCode, text: &str) -> Result<()>;
}

/// A comparison that reached its evaluation stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareEvent {
    pub conn_id: u64,
    pub op_id: u64,
    /// Target DN as received
    pub dn: String,
    /// Canonical attribute description
    pub attribute: String,
}

/// Fire-and-forget statistics notifications
pub trait StatsSink: Send + Sync {
    /// A comparison is about to be evaluated
    fn record_compare(&self, event: &CompareEvent);

    /// A result report was sent
    fn record_result(&self, _code: ResultCode) {}
}
