//! Access-control engine
//!
//! Rules are evaluated by descending priority and the first rule that
//! matches the requester, the target entry, the attribute and the operation
//! decides. No match falls back to the default effect.

use async_trait::async_trait;
use ldapd_core::traits::{AccessGate, AccessKind};
use ldapd_core::types::{AttributeDescriptor, Dn, Entry, NormalizedValue, Operation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Access rule errors
#[derive(Debug, Error, PartialEq)]
pub enum AccessError {
    #[error("Rule '{rule}': invalid target DN '{target}'")]
    InvalidTarget { rule: String, target: String },

    #[error("Rule '{rule}': invalid requester pattern '{who}'")]
    InvalidWho { rule: String, who: String },

    #[error("Rule '{rule}': unknown operation '{operation}'")]
    UnknownOperation { rule: String, operation: String },
}

/// Rule effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessEffect {
    Allow,
    #[default]
    Deny,
}

fn wildcard() -> String {
    "*".to_string()
}

fn wildcard_list() -> Vec<String> {
    vec![wildcard()]
}

/// Access rule as configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub effect: AccessEffect,

    /// `*`, `anonymous`, `users`, `self`, or a DN pattern with `*` wildcards
    pub who: String,

    /// `*` or the DN of a subtree
    #[serde(default = "wildcard")]
    pub target: String,

    /// Attribute names (subtypes included) or `*`
    #[serde(default = "wildcard_list")]
    pub attributes: Vec<String>,

    /// Operation names or `*`
    #[serde(default = "wildcard_list")]
    pub operations: Vec<String>,

    /// Higher = evaluated first
    #[serde(default)]
    pub priority: i32,
}

impl AccessRule {
    pub fn new(id: &str, effect: AccessEffect, who: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            effect,
            who: who.to_string(),
            target: wildcard(),
            attributes: wildcard_list(),
            operations: wildcard_list(),
            priority: 0,
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug)]
enum Requester {
    Any,
    Anonymous,
    Users,
    SelfEntry,
    Exact(Dn),
    Pattern(Regex),
}

impl Requester {
    fn compile(rule: &AccessRule) -> Result<Self, AccessError> {
        let invalid = || AccessError::InvalidWho {
            rule: rule.id.clone(),
            who: rule.who.clone(),
        };

        let who = rule.who.trim();
        Ok(match who.to_ascii_lowercase().as_str() {
            "*" => Requester::Any,
            "anonymous" => Requester::Anonymous,
            "users" => Requester::Users,
            "self" => Requester::SelfEntry,
            _ if who.contains('*') => {
                // Same shape as a normalized DN: lowercase, no blanks around separators
                let compact: String = who
                    .split(',')
                    .map(|rdn| {
                        rdn.split('=')
                            .map(|part| part.trim().to_lowercase())
                            .collect::<Vec<_>>()
                            .join("=")
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                let pattern = compact
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(".*");
                Requester::Pattern(Regex::new(&format!("^{}$", pattern)).map_err(|_| invalid())?)
            }
            _ => Requester::Exact(Dn::parse(who).map_err(|_| invalid())?),
        })
    }

    fn matches(&self, op: &Operation, entry: &Entry) -> bool {
        match (self, &op.authz_dn) {
            (Requester::Any, _) => true,
            (Requester::Anonymous, authz) => authz.is_none(),
            (Requester::Users, authz) => authz.is_some(),
            (Requester::SelfEntry, Some(dn)) => dn == entry.dn(),
            (Requester::Exact(expected), Some(dn)) => dn == expected,
            (Requester::Pattern(regex), Some(dn)) => regex.is_match(dn.normalized()),
            _ => false,
        }
    }
}

#[derive(Debug)]
struct CompiledRule {
    id: String,
    effect: AccessEffect,
    requester: Requester,
    /// `None` = every entry
    target: Option<Dn>,
    attributes: Vec<String>,
    operations: Vec<String>,
}

impl CompiledRule {
    fn compile(rule: &AccessRule) -> Result<Self, AccessError> {
        let target = match rule.target.trim() {
            "*" => None,
            raw => Some(Dn::parse(raw).map_err(|_| AccessError::InvalidTarget {
                rule: rule.id.clone(),
                target: rule.target.clone(),
            })?),
        };

        for operation in &rule.operations {
            if operation != "*" && !operation.eq_ignore_ascii_case(AccessKind::Compare.as_str()) {
                return Err(AccessError::UnknownOperation {
                    rule: rule.id.clone(),
                    operation: operation.clone(),
                });
            }
        }

        Ok(Self {
            id: rule.id.clone(),
            effect: rule.effect,
            requester: Requester::compile(rule)?,
            target,
            attributes: rule.attributes.clone(),
            operations: rule.operations.clone(),
        })
    }

    fn matches(
        &self,
        op: &Operation,
        entry: &Entry,
        desc: &AttributeDescriptor,
        kind: AccessKind,
    ) -> bool {
        self.operations
            .iter()
            .any(|o| o == "*" || o.eq_ignore_ascii_case(kind.as_str()))
            && self.target.as_ref().map_or(true, |t| entry.dn().ends_with(t))
            && self.attributes.iter().any(|a| a == "*" || covers(a, desc))
            && self.requester.matches(op, entry)
    }
}

/// Whether the rule attribute `name` is the type of `desc` or one of its supertypes
fn covers(name: &str, desc: &AttributeDescriptor) -> bool {
    let mut current = Some(desc.attr_type());
    while let Some(at) = current {
        if at.has_name(name) {
            return true;
        }
        current = at.superior.as_deref();
    }
    false
}

/// Rule-list access engine
#[derive(Debug)]
pub struct AclEngine {
    /// Sorted by descending priority; ties keep configuration order
    rules: Vec<CompiledRule>,
    default_effect: AccessEffect,
}

impl AclEngine {
    pub fn new(rules: &[AccessRule], default_effect: AccessEffect) -> Result<Self, AccessError> {
        let mut ordered: Vec<&AccessRule> = rules.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let rules = ordered
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            default_effect,
        })
    }

    /// Engine with no rules that grants everything
    pub fn allow_all() -> Self {
        Self {
            rules: Vec::new(),
            default_effect: AccessEffect::Allow,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn decide(
        &self,
        op: &Operation,
        entry: &Entry,
        desc: &AttributeDescriptor,
        kind: AccessKind,
    ) -> AccessEffect {
        match self.rules.iter().find(|r| r.matches(op, entry, desc, kind)) {
            Some(rule) => {
                debug!(
                    "Access rule '{}' decided {:?} for {} on {}",
                    rule.id,
                    rule.effect,
                    desc,
                    entry.dn()
                );
                rule.effect
            }
            None => {
                debug!("No access rule matched, default {:?}", self.default_effect);
                self.default_effect
            }
        }
    }
}

#[async_trait]
impl AccessGate for AclEngine {
    async fn check(
        &self,
        op: &Operation,
        entry: &Entry,
        desc: &AttributeDescriptor,
        _value: &NormalizedValue,
        kind: AccessKind,
    ) -> bool {
        self.decide(op, entry, desc, kind) == AccessEffect::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use ldapd_core::traits::SchemaResolver;

    fn fixture() -> (Schema, Entry) {
        let schema = Schema::builtin().unwrap();
        let entry = Entry::new(Dn::parse("uid=alice,ou=People,dc=example,dc=com").unwrap());
        (schema, entry)
    }

    async fn allowed(engine: &AclEngine, schema: &Schema, op: &Operation, entry: &Entry, attr: &str) -> bool {
        let desc = schema.resolve_type(attr).unwrap();
        let value = schema.normalize_value(&desc, b"x").unwrap();
        engine.check(op, entry, &desc, &value, AccessKind::Compare).await
    }

    fn bound(dn: &str) -> Operation {
        Operation::new(1, 1).with_authz_dn(Dn::parse(dn).unwrap())
    }

    #[tokio::test]
    async fn test_default_deny() {
        let (schema, entry) = fixture();
        let engine = AclEngine::new(&[], AccessEffect::Deny).unwrap();
        assert!(!allowed(&engine, &schema, &Operation::new(1, 1), &entry, "cn").await);

        let engine = AclEngine::allow_all();
        assert!(allowed(&engine, &schema, &Operation::new(1, 1), &entry, "cn").await);
    }

    #[tokio::test]
    async fn test_priority_first_match_wins() {
        let (schema, entry) = fixture();
        let rules = vec![
            AccessRule::new("allow-all", AccessEffect::Allow, "*").with_priority(10),
            AccessRule::new("deny-password", AccessEffect::Deny, "*")
                .with_attributes(&["userPassword"])
                .with_priority(100),
        ];
        let engine = AclEngine::new(&rules, AccessEffect::Deny).unwrap();
        let op = Operation::new(1, 1);

        assert!(allowed(&engine, &schema, &op, &entry, "cn").await);
        assert!(!allowed(&engine, &schema, &op, &entry, "userPassword").await);
    }

    #[tokio::test]
    async fn test_requester_kinds() {
        let (schema, entry) = fixture();
        let op_anon = Operation::new(1, 1);
        let op_alice = bound("uid=alice,ou=people,dc=example,dc=com");
        let op_bob = bound("uid=bob,ou=people,dc=example,dc=com");
        let op_admin = bound("cn=admin,dc=example,dc=com");

        let engine = AclEngine::new(&[AccessRule::new("a", AccessEffect::Allow, "anonymous")], AccessEffect::Deny).unwrap();
        assert!(allowed(&engine, &schema, &op_anon, &entry, "cn").await);
        assert!(!allowed(&engine, &schema, &op_bob, &entry, "cn").await);

        let engine = AclEngine::new(&[AccessRule::new("u", AccessEffect::Allow, "users")], AccessEffect::Deny).unwrap();
        assert!(!allowed(&engine, &schema, &op_anon, &entry, "cn").await);
        assert!(allowed(&engine, &schema, &op_bob, &entry, "cn").await);

        let engine = AclEngine::new(&[AccessRule::new("s", AccessEffect::Allow, "self")], AccessEffect::Deny).unwrap();
        assert!(allowed(&engine, &schema, &op_alice, &entry, "cn").await);
        assert!(!allowed(&engine, &schema, &op_bob, &entry, "cn").await);

        let engine = AclEngine::new(
            &[AccessRule::new("p", AccessEffect::Allow, "uid=*, ou=People, dc=example, dc=com")],
            AccessEffect::Deny,
        )
        .unwrap();
        assert!(allowed(&engine, &schema, &op_bob, &entry, "cn").await);
        assert!(!allowed(&engine, &schema, &op_admin, &entry, "cn").await);

        let engine = AclEngine::new(
            &[AccessRule::new("d", AccessEffect::Allow, "CN=Admin,DC=Example,DC=Com")],
            AccessEffect::Deny,
        )
        .unwrap();
        assert!(allowed(&engine, &schema, &op_admin, &entry, "cn").await);
    }

    #[tokio::test]
    async fn test_target_subtree_and_supertype_attributes() {
        let (schema, entry) = fixture();
        let rules = vec![AccessRule::new("names", AccessEffect::Allow, "*")
            .with_target("ou=people,dc=example,dc=com")
            .with_attributes(&["name"])];
        let engine = AclEngine::new(&rules, AccessEffect::Deny).unwrap();
        let op = Operation::new(1, 1);

        // cn and sn are subtypes of name
        assert!(allowed(&engine, &schema, &op, &entry, "cn").await);
        assert!(allowed(&engine, &schema, &op, &entry, "sn;lang-en").await);
        assert!(!allowed(&engine, &schema, &op, &entry, "mail").await);

        let other = Entry::new(Dn::parse("cn=x,ou=groups,dc=example,dc=com").unwrap());
        assert!(!allowed(&engine, &schema, &op, &other, "cn").await);
    }

    #[test]
    fn test_invalid_rules() {
        let rule = AccessRule::new("t", AccessEffect::Allow, "*").with_target("***not-a-dn***");
        assert!(matches!(
            AclEngine::new(&[rule], AccessEffect::Deny),
            Err(AccessError::InvalidTarget { .. })
        ));

        let mut rule = AccessRule::new("o", AccessEffect::Allow, "*");
        rule.operations = vec!["delete".to_string()];
        assert!(matches!(
            AclEngine::new(&[rule], AccessEffect::Deny),
            Err(AccessError::UnknownOperation { .. })
        ));

        let rule = AccessRule::new("w", AccessEffect::Allow, "not a dn");
        assert!(matches!(
            AclEngine::new(&[rule], AccessEffect::Deny),
            Err(AccessError::InvalidWho { .. })
        ));
    }
}
