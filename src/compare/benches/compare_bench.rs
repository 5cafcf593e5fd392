//! Compare path benchmarks

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ldapd_compare::{
    encode_message, AclEngine, BackendRegistry, Collaborators, CompareEngine, CompareStats,
    EngineConfig, MemoryBackend, Schema, SchemaHandle, ServerInfo, SpecialEntries,
    StandardControls,
};
use ldapd_core::traits::{ResultSink, SchemaResolver};
use ldapd_core::types::{
    CompareMessage, CompareRequest, Dn, Entry, Operation, ResultCode, ResultReport,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

struct NullSink;

#[async_trait]
impl ResultSink for NullSink {
    async fn send_result(&self, _op: &Operation, report: ResultReport) -> ldapd_core::Result<()> {
        black_box(report);
        Ok(())
    }

    async fn send_disconnect(
        &self,
        _op: &Operation,
        _code: ResultCode,
        _text: &str,
    ) -> ldapd_core::Result<()> {
        Ok(())
    }
}

/// Engine with `contexts` naming contexts of 100 entries each
fn create_engine(contexts: usize) -> CompareEngine {
    let schema = Schema::builtin().unwrap();
    let access = Arc::new(AclEngine::allow_all());
    let mut registry = BackendRegistry::new(vec!["ldap://root.example.net/".to_string()]);

    for c in 0..contexts {
        let suffix = Dn::parse(&format!("dc=ctx{},dc=example,dc=com", c)).unwrap();
        let backend = MemoryBackend::new(format!("ctx{}", c), vec![suffix.clone()], access.clone());
        for u in 0..100 {
            let dn = Dn::parse(&format!("uid=user{},{}", u, suffix.raw())).unwrap();
            let entry = Entry::new(dn)
                .with_values(schema.resolve_type("uid").unwrap(), [format!("user{}", u)])
                .with_values(schema.resolve_type("cn").unwrap(), [format!("User Number {}", u)])
                .with_values(schema.resolve_type("uidNumber").unwrap(), [format!("{}", 1000 + u)]);
            backend.add_entry(entry).unwrap();
        }
        registry.register(Arc::new(backend)).unwrap();
    }

    let schema = Arc::new(SchemaHandle::new(schema));
    let router = Arc::new(registry);
    let controls = Arc::new(StandardControls::new());
    let subschema_dn = Dn::parse("cn=Subschema").unwrap();
    let special = Arc::new(SpecialEntries::new(
        ServerInfo {
            subschema_dn: subschema_dn.clone(),
            vendor_name: "ldapd".to_string(),
            vendor_version: ldapd_compare::VERSION.to_string(),
            default_referrals: vec!["ldap://root.example.net/".to_string()],
        },
        router.clone(),
        controls.clone(),
    ));

    CompareEngine::new(
        EngineConfig::new(subschema_dn),
        Collaborators {
            controls,
            schema,
            special,
            router,
            access,
            sink: Arc::new(NullSink),
            stats: Arc::new(CompareStats::new()),
        },
    )
}

fn bench_backend_compare(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("backend_compare");

    for contexts in [1, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("naming_contexts", contexts),
            contexts,
            |b, &count| {
                let engine = create_engine(count);
                let request = CompareRequest::new(
                    format!("uid=user42,dc=ctx{},dc=example,dc=com", count - 1),
                    "cn",
                    b"user number 42".to_vec(),
                );
                let op = Operation::new(1, 1);

                b.to_async(&rt).iter(|| async {
                    let status = engine.compare(&op, black_box(&request), &[]).await;
                    black_box(status);
                });
            },
        );
    }

    group.finish();
}

fn bench_special_entries(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = create_engine(10);
    let op = Operation::new(1, 1);

    let root_dse = CompareRequest::new("", "supportedLDAPVersion", b"3".to_vec());
    c.bench_function("root_dse_compare", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.compare(&op, black_box(&root_dse), &[]).await);
        });
    });

    let subschema = CompareRequest::new("cn=Subschema", "attributeTypes", b"2.5.4.3".to_vec());
    c.bench_function("subschema_compare", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.compare(&op, black_box(&subschema), &[]).await);
        });
    });
}

fn bench_referral(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = create_engine(10);
    let op = Operation::new(1, 1);
    let request = CompareRequest::new("cn=John Smith,dc=elsewhere,dc=net", "cn", b"x".to_vec());

    c.bench_function("default_referral", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.compare(&op, black_box(&request), &[]).await);
        });
    });
}

fn bench_pdu(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = create_engine(10);
    let op = Operation::new(1, 0);
    let pdu = encode_message(&CompareMessage {
        message_id: 7,
        request: CompareRequest::new(
            "uid=user7,dc=ctx3,dc=example,dc=com",
            "uidNumber",
            b"1007".to_vec(),
        ),
        controls: Vec::new(),
    });

    c.bench_function("handle_pdu", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(engine.handle_pdu(&op, black_box(&pdu)).await);
        });
    });
}

fn bench_dn_parse(c: &mut Criterion) {
    c.bench_function("dn_parse", |b| {
        b.iter(|| {
            black_box(Dn::parse(black_box("CN=John Smith+UID=jsmith, OU=People, DC=Example, DC=Com")))
        })
    });
}

criterion_group!(
    benches,
    bench_backend_compare,
    bench_special_entries,
    bench_referral,
    bench_pdu,
    bench_dn_parse
);
criterion_main!(benches);
