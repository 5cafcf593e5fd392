//! # ldapd Compare
//!
//! The compare-operation path of the directory server: BER decoding, control
//! processing, schema-driven normalization, naming-context routing with
//! referral fallback, and access-gated attribute matching.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ldapd_compare::{build_engine, CompareStats, DirectoryConfig};
//!
//! let config = DirectoryConfig::load("ldapd.toml")?;
//! let stats = Arc::new(CompareStats::new());
//! let engine = build_engine(&config, sink, stats.clone())?;
//!
//! let status = engine.handle_pdu(&Operation::new(1, 0), &pdu).await;
//! ```

pub mod access;
pub mod backend;
pub mod codec;
pub mod config;
pub mod controls;
pub mod engine;
pub mod matcher;
pub mod restrictions;
pub mod router;
pub mod schema;
pub mod special;

pub use access::{AccessEffect, AccessRule, AclEngine};
pub use backend::MemoryBackend;
pub use codec::{decode_message, encode_message, encode_response, DecodeError};
pub use config::{build_engine, DirectoryConfig};
pub use controls::{StandardControls, MANAGE_DSA_IT_OID};
pub use engine::{
    Collaborators, CompareEngine, CompareMetrics, CompareStats, CompareStatus, EngineConfig,
    Outcome,
};
pub use matcher::compare_entry;
pub use restrictions::Restrictions;
pub use router::{rewrite_referrals, BackendRegistry};
pub use schema::{AttributeTypeDef, Schema, SchemaError, SchemaHandle};
pub use special::{ServerInfo, SpecialDn, SpecialEntries};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
