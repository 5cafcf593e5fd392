//! Shared fixtures: counting collaborators around the real components

#![allow(dead_code)]

use async_trait::async_trait;
use ldapd_compare::{
    AttributeTypeDef, BackendRegistry, Collaborators, CompareEngine, CompareStats, CompareStatus,
    EngineConfig, MemoryBackend, Restrictions, Schema, SchemaHandle, ServerInfo, SpecialEntries,
    StandardControls,
};
use ldapd_core::traits::{
    AccessGate, AccessKind, Backend, BackendRouter, ResultSink, SchemaResolver, SpecialNamespace,
};
use ldapd_core::types::{
    AttributeDescriptor, CompareRequest, Control, Dn, Entry, MatchingRule, NormalizedValue,
    Operation, ResultCode, ResultReport, Syntax,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const DEFAULT_REFERRAL: &str = "ldap://root.example.net/";

// ============================================================================
// RECORDING SINK
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Result { op_id: u64, report: ResultReport },
    Disconnect { code: ResultCode, text: String },
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    pub fn last_report(&self) -> Option<ResultReport> {
        self.sent.lock().iter().rev().find_map(|s| match s {
            Sent::Result { report, .. } => Some(report.clone()),
            Sent::Disconnect { .. } => None,
        })
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn send_result(&self, op: &Operation, report: ResultReport) -> ldapd_core::Result<()> {
        self.sent.lock().push(Sent::Result {
            op_id: op.op_id,
            report,
        });
        Ok(())
    }

    async fn send_disconnect(
        &self,
        _op: &Operation,
        code: ResultCode,
        text: &str,
    ) -> ldapd_core::Result<()> {
        self.sent.lock().push(Sent::Disconnect {
            code,
            text: text.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// COUNTING COLLABORATORS
// ============================================================================

pub struct CountingRouter {
    inner: BackendRegistry,
    pub selects: AtomicUsize,
}

impl BackendRouter for CountingRouter {
    fn select_backend(&self, dn: &Dn) -> Option<Arc<dyn Backend>> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.inner.select_backend(dn)
    }

    fn default_referrals(&self) -> &[String] {
        self.inner.default_referrals()
    }

    fn naming_contexts(&self) -> Vec<Dn> {
        self.inner.naming_contexts()
    }
}

/// Special entries that can swap the live schema while an operation is running
pub struct CountingSpecial {
    inner: SpecialEntries,
    live_schema: Arc<SchemaHandle>,
    pub reload_on_call: AtomicBool,
    pub calls: AtomicUsize,
}

impl CountingSpecial {
    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reload_on_call.load(Ordering::SeqCst) {
            self.live_schema.reload(Schema::builtin().unwrap());
        }
    }
}

impl SpecialNamespace for CountingSpecial {
    fn root_dse(&self, op: &Operation, schema: &dyn SchemaResolver) -> ldapd_core::Result<Entry> {
        self.enter();
        self.inner.root_dse(op, schema)
    }

    fn subschema(&self, op: &Operation, schema: &dyn SchemaResolver) -> ldapd_core::Result<Entry> {
        self.enter();
        self.inner.subschema(op, schema)
    }
}

/// Access gate with a fixed answer; can abandon the operation it is asked about
#[derive(Default)]
pub struct CountingAccess {
    pub deny: AtomicBool,
    pub abandon_on_check: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl AccessGate for CountingAccess {
    async fn check(
        &self,
        op: &Operation,
        _entry: &Entry,
        _desc: &AttributeDescriptor,
        _value: &NormalizedValue,
        _kind: AccessKind,
    ) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.abandon_on_check.load(Ordering::SeqCst) {
            op.abandon();
        }
        !self.deny.load(Ordering::SeqCst)
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness {
    pub engine: CompareEngine,
    pub sink: Arc<RecordingSink>,
    pub router: Arc<CountingRouter>,
    pub special: Arc<CountingSpecial>,
    pub access: Arc<CountingAccess>,
    pub stats: Arc<CompareStats>,
}

pub fn dn(raw: &str) -> Dn {
    Dn::parse(raw).unwrap()
}

fn schema() -> Schema {
    Schema::with_extra_types(vec![AttributeTypeDef::new("1.3.6.1.4.1.99999.10", &["exactCode"])
        .syntax(Syntax::DirectoryString)
        .equality(MatchingRule::CaseExactMatch)])
    .unwrap()
}

/// Entry from (attribute, value) pairs; repeated names add values
fn entry(schema: &Schema, raw_dn: &str, attrs: &[(&str, &str)]) -> Entry {
    let mut entry = Entry::new(dn(raw_dn));
    for (name, value) in attrs {
        entry.add_values(schema.resolve_type(name).unwrap(), [*value]);
    }
    entry
}

impl Harness {
    pub fn new() -> Self {
        Self::with_server_restrictions(Restrictions::none())
    }

    pub fn with_server_restrictions(restrictions: Restrictions) -> Self {
        let schema = schema();
        let access = Arc::new(CountingAccess::default());
        let gate: Arc<dyn AccessGate> = access.clone();

        let example = MemoryBackend::new("example", vec![dn("dc=example,dc=com")], gate.clone())
            .with_alias(dn("o=example"), dn("dc=example,dc=com"))
            .unwrap()
            .with_default_referrals(vec![DEFAULT_REFERRAL.to_string()]);
        example
            .add_entry(entry(
                &schema,
                "dc=example,dc=com",
                &[("objectClass", "top"), ("objectClass", "domain"), ("dc", "example")],
            ))
            .unwrap();
        example
            .add_entry(entry(
                &schema,
                "uid=alice,dc=example,dc=com",
                &[
                    ("objectClass", "top"), ("objectClass", "person"),
                    ("uid", "alice"),
                    ("cn", "Alice Liddell"), ("cn", "Al"),
                    ("exactCode", "x"), ("exactCode", "y"),
                    ("uidNumber", "1000"),
                ],
            ))
            .unwrap();
        example
            .add_entry(entry(
                &schema,
                "ou=Remote,dc=example,dc=com",
                &[
                    ("objectClass", "referral"), ("objectClass", "extensibleObject"),
                    ("ou", "Remote"),
                    ("ref", "ldap://remote.example.net/ou=Remote,dc=example,dc=net"),
                ],
            ))
            .unwrap();
        example
            .add_entry(entry(
                &schema,
                "ou=Moved,dc=example,dc=com",
                &[("objectClass", "top"), ("objectClass", "referral"), ("ou", "Moved")],
            ))
            .unwrap();

        let people = MemoryBackend::new("people", vec![dn("ou=people,dc=example,dc=com")], gate.clone());
        people
            .add_entry(entry(&schema, "ou=people,dc=example,dc=com", &[("ou", "people")]))
            .unwrap();
        people
            .add_entry(entry(
                &schema,
                "uid=bob,ou=people,dc=example,dc=com",
                &[("uid", "bob"), ("cn", "Bob")],
            ))
            .unwrap();

        let no_compare =
            MemoryBackend::new("archive", vec![dn("dc=archive,dc=org")], gate.clone()).with_compare(false);
        no_compare
            .add_entry(entry(&schema, "dc=archive,dc=org", &[("dc", "archive")]))
            .unwrap();

        let restricted = MemoryBackend::new("restricted", vec![dn("dc=restricted,dc=org")], gate.clone())
            .with_restrictions(Restrictions {
                require_authentication: true,
                ..Default::default()
            });
        restricted
            .add_entry(entry(&schema, "dc=restricted,dc=org", &[("dc", "restricted")]))
            .unwrap();

        let mut registry = BackendRegistry::new(vec![DEFAULT_REFERRAL.to_string()]);
        registry.register(Arc::new(example)).unwrap();
        registry.register(Arc::new(people)).unwrap();
        registry.register(Arc::new(no_compare)).unwrap();
        registry.register(Arc::new(restricted)).unwrap();

        let router = Arc::new(CountingRouter {
            inner: registry,
            selects: AtomicUsize::new(0),
        });
        let schema = Arc::new(SchemaHandle::new(schema));
        let controls = Arc::new(StandardControls::new());
        let special = Arc::new(CountingSpecial {
            inner: SpecialEntries::new(
                ServerInfo {
                    subschema_dn: dn("cn=Subschema"),
                    vendor_name: "ldapd".to_string(),
                    vendor_version: "test".to_string(),
                    default_referrals: vec![DEFAULT_REFERRAL.to_string()],
                },
                router.clone(),
                controls.clone(),
            ),
            live_schema: schema.clone(),
            reload_on_call: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        });
        let sink = Arc::new(RecordingSink::default());
        let stats = Arc::new(CompareStats::new());

        let engine = CompareEngine::new(
            EngineConfig::new(dn("cn=Subschema")).with_restrictions(restrictions),
            Collaborators {
                controls,
                schema,
                special: special.clone(),
                router: router.clone(),
                access: gate,
                sink: sink.clone(),
                stats: stats.clone(),
            },
        );

        Self {
            engine,
            sink,
            router,
            special,
            access,
            stats,
        }
    }

    pub fn deny_access(&self) {
        self.access.deny.store(true, Ordering::SeqCst);
    }

    pub fn router_calls(&self) -> usize {
        self.router.selects.load(Ordering::SeqCst)
    }

    /// Replace the live schema with the builtin one (no `exactCode`) as soon
    /// as a special entry is requested
    pub fn reload_schema_during_special(&self) {
        self.special.reload_on_call.store(true, Ordering::SeqCst);
    }

    pub fn special_calls(&self) -> usize {
        self.special.calls.load(Ordering::SeqCst)
    }

    /// Run one compare and check that exactly one report was sent for it
    pub async fn compare_op(
        &self,
        op: &Operation,
        target: &str,
        attr: &str,
        value: &str,
        controls: &[Control],
    ) -> ResultReport {
        let before = self.sink.len();
        let request = CompareRequest::new(target, attr, value.as_bytes().to_vec());
        let status = self.engine.compare(op, &request, controls).await;

        assert_eq!(self.sink.len(), before + 1, "exactly one report per compare");
        let report = self.sink.last_report().expect("a result report");
        assert_eq!(status, CompareStatus::Reported(report.code));
        report
    }

    pub async fn compare(&self, target: &str, attr: &str, value: &str) -> ResultReport {
        self.compare_op(&Operation::new(1, 1), target, attr, value, &[])
            .await
    }
}
