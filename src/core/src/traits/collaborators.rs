//! Schema, access, control and special-namespace contracts

use crate::error::{LdapError, Result};
use crate::types::{
    AttributeDescriptor, AttributeType, Control, ControlState, Entry, MatchingRule,
    NormalizedValue, Operation,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Kind of access being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Compare,
}

impl AccessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessKind::Compare => "compare",
        }
    }
}

/// Access-control policy query
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Whether `op` may perform `kind` on (`entry`, `desc`, `value`)
    async fn check(
        &self,
        op: &Operation,
        entry: &Entry,
        desc: &AttributeDescriptor,
        value: &NormalizedValue,
        kind: AccessKind,
    ) -> bool;
}

/// Schema lookups against one consistent schema snapshot
pub trait SchemaResolver: Send + Sync {
    /// Resolve an attribute description (`cn`, `2.5.4.3`, `cn;lang-en`)
    fn resolve_type(&self, name: &str) -> Result<AttributeDescriptor>;

    /// OID of the attribute type or object class named `descriptor`
    fn oid_of(&self, descriptor: &str) -> Option<String>;

    /// Attribute type table, in definition order
    fn attribute_types(&self) -> &[Arc<AttributeType>];

    /// Normalize `raw` under `rule`, resolving descriptors for the OID rules
    fn normalize_under(&self, rule: MatchingRule, raw: &[u8]) -> Result<NormalizedValue> {
        rule.normalize_with(raw, |name| self.oid_of(name))
    }

    /// Normalize `raw` under the equality rule of `desc`
    fn normalize_value(&self, desc: &AttributeDescriptor, raw: &[u8]) -> Result<NormalizedValue> {
        let rule = desc.equality().ok_or_else(|| {
            LdapError::InappropriateMatching("no equality matching rule".to_string())
        })?;
        self.normalize_under(rule, raw)
    }
}

/// Request control processing
pub trait ControlProcessor: Send + Sync {
    /// Validate the controls and derive their effect on the operation
    fn process(&self, controls: &[Control]) -> Result<ControlState>;

    /// OIDs of the controls this processor recognizes
    fn supported_controls(&self) -> Vec<String>;
}

/// Synthesizes the reserved entries without touching backend storage
///
/// Each call returns a freshly built entry; nothing is cached. `schema` is
/// the snapshot of the operation asking.
pub trait SpecialNamespace: Send + Sync {
    /// Root DSE (empty DN)
    fn root_dse(&self, op: &Operation, schema: &dyn SchemaResolver) -> Result<Entry>;

    /// Subschema subentry
    fn subschema(&self, op: &Operation, schema: &dyn SchemaResolver) -> Result<Entry>;
}
