//! Compare engine
//!
//! Sequences one compare operation from the decoded request to exactly one
//! result report (or one notice of disconnection):
//!
//! ```text
//! decode → controls → DN → attribute type → value ─┬─ root DSE / subschema → restrictions → synthesize → access → match
//!                                                  └─ router → restrictions → referrals → alias → backend compare
//! ```

pub mod outcome;
pub mod stats;

pub use outcome::{CompareStatus, Outcome};
pub use stats::{CompareMetrics, CompareStats};

use crate::codec;
use crate::matcher::compare_entry;
use crate::restrictions::Restrictions;
use crate::router::rewrite_referrals;
use crate::schema::{Schema, SchemaHandle};
use crate::special::SpecialDn;
use ldapd_core::traits::{
    AccessGate, AccessKind, BackendRouter, CompareEvent, ControlProcessor, ResultSink,
    SchemaResolver, SpecialNamespace, StatsSink,
};
use ldapd_core::types::{AttributeAssertion, CompareRequest, Control, Dn, Operation, ResultCode};
use ldapd_core::LdapError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// DN of the subschema subentry
    pub subschema_dn: Dn,

    /// Server-wide restrictions, checked on every compare
    pub restrictions: Restrictions,
}

impl EngineConfig {
    pub fn new(subschema_dn: Dn) -> Self {
        Self {
            subschema_dn,
            restrictions: Restrictions::none(),
        }
    }

    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }
}

/// Everything the engine consults
pub struct Collaborators {
    pub controls: Arc<dyn ControlProcessor>,
    pub schema: Arc<SchemaHandle>,
    pub special: Arc<dyn SpecialNamespace>,
    pub router: Arc<dyn BackendRouter>,
    pub access: Arc<dyn AccessGate>,
    pub sink: Arc<dyn ResultSink>,
    pub stats: Arc<dyn StatsSink>,
}

/// Why the pipeline stopped without an outcome to report
#[derive(Debug)]
enum Halt {
    /// Reported as a result
    Failed(LdapError),
    /// Protocol stream is no longer trustworthy
    Disconnect(&'static str),
    /// Abandoned by the session; nothing is sent
    Abandoned,
}

impl From<LdapError> for Halt {
    fn from(err: LdapError) -> Self {
        Halt::Failed(err)
    }
}

fn checkpoint(op: &Operation) -> Result<(), Halt> {
    if op.is_abandoned() {
        Err(Halt::Abandoned)
    } else {
        Ok(())
    }
}

pub struct CompareEngine {
    config: EngineConfig,
    controls: Arc<dyn ControlProcessor>,
    schema: Arc<SchemaHandle>,
    special: Arc<dyn SpecialNamespace>,
    router: Arc<dyn BackendRouter>,
    access: Arc<dyn AccessGate>,
    sink: Arc<dyn ResultSink>,
    stats: Arc<dyn StatsSink>,
}

impl CompareEngine {
    pub fn new(config: EngineConfig, parts: Collaborators) -> Self {
        info!(
            "CompareEngine initialized with subschema={}, naming contexts={}",
            config.subschema_dn,
            parts.router.naming_contexts().len()
        );

        Self {
            config,
            controls: parts.controls,
            schema: parts.schema,
            special: parts.special,
            router: parts.router,
            access: parts.access,
            sink: parts.sink,
            stats: parts.stats,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active schema, for reloads
    pub fn schema(&self) -> &Arc<SchemaHandle> {
        &self.schema
    }

    /// Decode one `LDAPMessage` and run the compare it carries
    ///
    /// The operation is renumbered with the message ID so the sink can echo
    /// it. Undecodable input disconnects.
    pub async fn handle_pdu(&self, op: &Operation, bytes: &[u8]) -> CompareStatus {
        let message = match codec::decode_message(bytes) {
            Ok(message) => message,
            Err(err) => {
                debug!("conn={} PDU decoding failed: {}", op.conn_id, err);
                return self.disconnect(op, "decoding error").await;
            }
        };

        let op = op.clone().with_op_id(u64::try_from(message.message_id).unwrap_or_default());
        self.compare(&op, &message.request, &message.controls).await
    }

    /// Run one compare operation
    ///
    /// Sends exactly one result report or one notice of disconnection through
    /// the sink, or nothing at all when the operation is abandoned.
    pub async fn compare(
        &self,
        op: &Operation,
        request: &CompareRequest,
        controls: &[Control],
    ) -> CompareStatus {
        debug!(
            "conn={} op={} compare request: dn=\"{}\" attr=\"{}\"",
            op.conn_id, op.op_id, request.dn, request.attribute
        );

        let outcome = match self.evaluate(op, request, controls).await {
            Ok(outcome) => outcome,
            Err(Halt::Failed(err)) => Outcome::Error(err),
            Err(Halt::Disconnect(text)) => return self.disconnect(op, text).await,
            Err(Halt::Abandoned) => return abandoned(op),
        };

        if op.is_abandoned() {
            return abandoned(op);
        }

        let report = outcome.into_report();
        let code = report.code;
        debug!("conn={} op={} result: {}", op.conn_id, op.op_id, code);

        if let Err(err) = self.sink.send_result(op, report).await {
            warn!("conn={} op={} failed to send result: {}", op.conn_id, op.op_id, err);
        }
        self.stats.record_result(code);

        CompareStatus::Reported(code)
    }

    /// The pipeline proper
    ///
    /// Every intermediate (normalized DN, assertion, synthesized entry) is
    /// owned by this frame and dropped on every exit path.
    async fn evaluate(
        &self,
        op: &Operation,
        request: &CompareRequest,
        controls: &[Control],
    ) -> Result<Outcome, Halt> {
        // Step 1: well-formedness
        if request.attribute.trim().is_empty() {
            debug!("conn={} op={} empty attribute description", op.conn_id, op.op_id);
            return Err(Halt::Disconnect("decoding error"));
        }
        checkpoint(op)?;

        // Step 2: controls
        let state = self.controls.process(controls)?;
        let op = op.clone().with_controls(state);

        // Step 3: target DN
        let dn = Dn::parse(&request.dn).map_err(|err| {
            debug!("conn={} op={} {}", op.conn_id, op.op_id, err);
            LdapError::invalid_dn("invalid DN")
        })?;

        // Steps 4 and 5: attribute type and value, against one schema snapshot
        let schema = self.schema.snapshot();
        let desc = schema.resolve_type(&request.attribute)?;
        let value = schema.normalize_value(&desc, &request.value)?;
        let assertion = AttributeAssertion { desc, value };
        checkpoint(&op)?;

        // Step 6: reserved entries
        if let Some(kind) = SpecialDn::classify(&dn, &self.config.subschema_dn) {
            return self
                .compare_special(&op, &request.dn, kind, &assertion, &schema)
                .await;
        }

        // Step 7: routing
        let backend = match self.router.select_backend(&dn) {
            Some(backend) => backend,
            None => {
                debug!("No backend holds {}", dn.normalized());
                return Ok(self.default_referral(&dn));
            }
        };
        debug!("Routed {} to backend '{}'", dn.normalized(), backend.name());

        // Step 8: restrictions
        self.config.restrictions.check(&op)?;
        backend.check_restrictions(&op)?;
        checkpoint(&op)?;

        // Step 9: referral objects
        if let Err(report) = backend.check_referrals(&op, &dn).await {
            debug!("Backend '{}' returned {}", backend.name(), report.code);
            return Ok(Outcome::Delegated(report));
        }
        checkpoint(&op)?;

        self.record_compare(&op, &request.dn, &assertion);

        // Step 10: suffix alias
        let target = backend.resolve_suffix_alias(&dn);

        // Step 11: delegate
        match backend.compare_capability() {
            Some(capability) => {
                let report = capability
                    .compare(&op, &request.dn, &target, &assertion, &*schema)
                    .await;
                Ok(Outcome::Delegated(report))
            }
            None => Err(LdapError::unwilling("operation not supported within namingContext").into()),
        }
    }

    async fn compare_special(
        &self,
        op: &Operation,
        raw_dn: &str,
        kind: SpecialDn,
        assertion: &AttributeAssertion,
        schema: &Schema,
    ) -> Result<Outcome, Halt> {
        self.record_compare(op, raw_dn, assertion);

        self.config.restrictions.check(op)?;

        let entry = match kind {
            SpecialDn::RootDse => self.special.root_dse(op, schema)?,
            SpecialDn::Subschema => self.special.subschema(op, schema)?,
        };
        checkpoint(op)?;

        let allowed = self
            .access
            .check(op, &entry, &assertion.desc, &assertion.value, AccessKind::Compare)
            .await;
        if !allowed {
            debug!("Access denied to {} on {:?}", assertion.desc, kind);
            return Ok(Outcome::AccessDenied);
        }
        checkpoint(op)?;

        Ok(Outcome::Verdict(compare_entry(&entry, assertion, schema)))
    }

    fn default_referral(&self, dn: &Dn) -> Outcome {
        let urls = rewrite_referrals(self.router.default_referrals(), dn);
        if urls.is_empty() {
            return Outcome::Error(LdapError::NoSuchObject(
                "no global superior knowledge".to_string(),
            ));
        }
        Outcome::Referral(urls)
    }

    /// One structured event per comparison reaching evaluation
    fn record_compare(&self, op: &Operation, raw_dn: &str, assertion: &AttributeAssertion) {
        let event = CompareEvent {
            conn_id: op.conn_id,
            op_id: op.op_id,
            dn: raw_dn.to_string(),
            attribute: assertion.desc.cname(),
        };
        info!(
            target: "ldapd::stats",
            conn = event.conn_id,
            op = event.op_id,
            dn = %event.dn,
            attr = %event.attribute,
            "CMP"
        );
        self.stats.record_compare(&event);
    }

    async fn disconnect(&self, op: &Operation, text: &str) -> CompareStatus {
        warn!("conn={} op={} disconnecting: {}", op.conn_id, op.op_id, text);
        if let Err(err) = self
            .sink
            .send_disconnect(op, ResultCode::ProtocolError, text)
            .await
        {
            warn!("conn={} failed to send notice of disconnection: {}", op.conn_id, err);
        }
        CompareStatus::Disconnected
    }
}

fn abandoned(op: &Operation) -> CompareStatus {
    debug!("conn={} op={} abandoned", op.conn_id, op.op_id);
    CompareStatus::Abandoned
}
