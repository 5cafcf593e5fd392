//! Console result sink

use async_trait::async_trait;
use ldapd_compare::encode_response;
use ldapd_core::traits::ResultSink;
use ldapd_core::types::{Operation, ResultCode, ResultReport};
use ldapd_core::{LdapError, Result};
use parking_lot::Mutex;
use serde_json::json;
use std::io::Write;

/// How results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line
    Json,
    /// Hex-encoded `CompareResponse` PDU
    Pdu,
    /// Nothing; results only feed the statistics
    Silent,
}

/// Writes every result to stdout and remembers the last one
pub struct ConsoleSink {
    format: OutputFormat,
    last: Mutex<Option<Written>>,
}

/// What the sink last wrote
#[derive(Debug, Clone, PartialEq)]
pub enum Written {
    Result(ResultReport),
    Disconnect(ResultCode, String),
}

impl ConsoleSink {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            last: Mutex::new(None),
        }
    }

    pub fn last(&self) -> Option<Written> {
        self.last.lock().clone()
    }

    fn render_result(&self, op: &Operation, report: &ResultReport) -> Result<Option<String>> {
        Ok(match self.format {
            OutputFormat::Json => Some(
                serde_json::to_string(&json!({ "op": op.op_id, "result": report }))
                    .map_err(|e| LdapError::internal(e.to_string()))?,
            ),
            OutputFormat::Pdu => {
                let message_id = i32::try_from(op.op_id).unwrap_or_default();
                Some(hex::encode(encode_response(message_id, report)))
            }
            OutputFormat::Silent => None,
        })
    }
}

fn write_line(line: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", line).map_err(|e| LdapError::internal(format!("stdout: {}", e)))
}

#[async_trait]
impl ResultSink for ConsoleSink {
    async fn send_result(&self, op: &Operation, report: ResultReport) -> Result<()> {
        if let Some(line) = self.render_result(op, &report)? {
            write_line(&line)?;
        }
        *self.last.lock() = Some(Written::Result(report));
        Ok(())
    }

    async fn send_disconnect(&self, op: &Operation, code: ResultCode, text: &str) -> Result<()> {
        if self.format == OutputFormat::Json {
            let line = serde_json::to_string(&json!({
                "op": op.op_id,
                "disconnect": { "code": code, "text": text },
            }))
            .map_err(|e| LdapError::internal(e.to_string()))?;
            write_line(&line)?;
        }
        *self.last.lock() = Some(Written::Disconnect(code, text.to_string()));
        Ok(())
    }
}
