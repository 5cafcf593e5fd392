//! Directory configuration
//!
//! TOML layout:
//!
//! ```toml
//! [server]
//! subschema_dn = "cn=Subschema"
//! default_referrals = ["ldap://root.example.net/"]
//!
//! [server.restrictions]
//! min_ssf = 0
//!
//! [access]
//! default_effect = "deny"
//!
//! [[access.rules]]
//! id = "public"
//! effect = "allow"
//! who = "*"
//!
//! [[backends]]
//! name = "example"
//! suffixes = ["dc=example,dc=com"]
//!
//! [[backends.entries]]
//! dn = "dc=example,dc=com"
//! attributes = { objectClass = ["top", "domain"], dc = "example" }
//! ```

use crate::access::{AccessEffect, AccessRule, AclEngine};
use crate::backend::MemoryBackend;
use crate::controls::StandardControls;
use crate::engine::{Collaborators, CompareEngine, CompareStats, EngineConfig};
use crate::restrictions::Restrictions;
use crate::router::BackendRegistry;
use crate::schema::{AttributeTypeDef, Schema, SchemaHandle};
use crate::special::{ServerInfo, SpecialEntries};
use anyhow::{bail, Context, Result};
use ldapd_core::traits::{ResultSink, SchemaResolver};
use ldapd_core::types::{Dn, Entry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Complete directory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_subschema_dn")]
    pub subschema_dn: String,

    /// Referral URLs for DNs no backend holds
    #[serde(default)]
    pub default_referrals: Vec<String>,

    #[serde(default = "default_vendor_name")]
    pub vendor_name: String,

    #[serde(default = "default_vendor_version")]
    pub vendor_version: String,

    #[serde(default)]
    pub restrictions: Restrictions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            subschema_dn: default_subschema_dn(),
            default_referrals: Vec::new(),
            vendor_name: default_vendor_name(),
            vendor_version: default_vendor_version(),
            restrictions: Restrictions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub default_effect: AccessEffect,

    #[serde(default)]
    pub rules: Vec<AccessRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub attribute_types: Vec<AttributeTypeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,

    pub suffixes: Vec<String>,

    /// Compare capability
    #[serde(default = "default_true")]
    pub compare: bool,

    #[serde(default)]
    pub aliases: Vec<AliasConfig>,

    #[serde(default)]
    pub restrictions: Restrictions,

    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    pub alias: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConfig {
    pub dn: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValues>,
}

/// One value or a list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValues {
    One(String),
    Many(Vec<String>),
}

impl AttributeValues {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            AttributeValues::One(value) => vec![value.clone()],
            AttributeValues::Many(values) => values.clone(),
        }
    }
}

fn default_subschema_dn() -> String {
    "cn=Subschema".to_string()
}

fn default_vendor_name() -> String {
    "ldapd".to_string()
}

fn default_vendor_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_true() -> bool {
    true
}

impl DirectoryConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read configuration file {}", path.as_ref().display()))?;

        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Server
        let subschema = Dn::parse(&self.server.subschema_dn)
            .with_context(|| format!("Invalid subschema DN '{}'", self.server.subschema_dn))?;
        if subschema.is_root() {
            bail!("Subschema DN must not be empty");
        }
        if self.server.default_referrals.iter().any(|r| r.trim().is_empty()) {
            bail!("Default referral entries must not be empty");
        }

        // Access rules and schema compile on their own
        AclEngine::new(&self.access.rules, self.access.default_effect)
            .context("Invalid access rule")?;
        let schema = self.build_schema()?;

        // Backends
        let mut owners: HashMap<Dn, &str> = HashMap::new();
        let mut names: Vec<&str> = Vec::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                bail!("Backend name must not be empty");
            }
            if names.contains(&backend.name.as_str()) {
                bail!("Duplicate backend name '{}'", backend.name);
            }
            names.push(&backend.name);

            if backend.suffixes.is_empty() {
                bail!("Backend '{}' has no suffix", backend.name);
            }

            let suffixes = parse_dns(&backend.suffixes)
                .with_context(|| format!("Backend '{}'", backend.name))?;
            let aliases = backend
                .aliases
                .iter()
                .map(|a| Ok((parse_dn(&a.alias)?, parse_dn(&a.target)?)))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Backend '{}'", backend.name))?;

            for (alias, target) in &aliases {
                if !suffixes.contains(target) {
                    bail!(
                        "Backend '{}': alias '{}' targets '{}', which is not one of its suffixes",
                        backend.name,
                        alias,
                        target
                    );
                }
            }

            for suffix in suffixes.iter().chain(aliases.iter().map(|(alias, _)| alias)) {
                if suffix.is_root() {
                    bail!("Backend '{}': the empty DN cannot be a suffix", backend.name);
                }
                if *suffix == subschema {
                    bail!("Backend '{}': '{}' is the subschema DN", backend.name, suffix);
                }
                if let Some(owner) = owners.insert(suffix.clone(), &backend.name) {
                    bail!(
                        "Naming context '{}' is served by both '{}' and '{}'",
                        suffix.normalized(),
                        owner,
                        backend.name
                    );
                }
            }

            for entry in &backend.entries {
                let dn = parse_dn(&entry.dn).with_context(|| format!("Backend '{}'", backend.name))?;
                if !suffixes.iter().any(|s| dn.ends_with(s)) {
                    bail!(
                        "Backend '{}': entry '{}' is outside its suffixes",
                        backend.name,
                        entry.dn
                    );
                }
                for name in entry.attributes.keys() {
                    schema
                        .resolve_type(name)
                        .with_context(|| format!("Entry '{}': attribute '{}'", entry.dn, name))?;
                }
            }
        }

        Ok(())
    }

    fn build_schema(&self) -> Result<Schema> {
        Schema::with_extra_types(self.schema.attribute_types.clone())
            .context("Invalid attribute type definition")
    }
}

fn parse_dn(raw: &str) -> Result<Dn> {
    Dn::parse(raw).with_context(|| format!("Invalid DN '{}'", raw))
}

fn parse_dns(raws: &[String]) -> Result<Vec<Dn>> {
    raws.iter().map(|raw| parse_dn(raw)).collect()
}

fn build_entry(schema: &Schema, config: &EntryConfig) -> Result<Entry> {
    let mut entry = Entry::new(parse_dn(&config.dn)?);
    for (name, values) in &config.attributes {
        let desc = schema.resolve_type(name)?;
        entry.add_values(desc, values.to_vec());
    }
    Ok(entry)
}

/// Wire a compare engine from configuration
///
/// `sink` receives every result; `stats` collects counters the caller can
/// snapshot later.
pub fn build_engine(
    config: &DirectoryConfig,
    sink: Arc<dyn ResultSink>,
    stats: Arc<CompareStats>,
) -> Result<CompareEngine> {
    config.validate()?;

    let schema = config.build_schema()?;
    let access = Arc::new(AclEngine::new(&config.access.rules, config.access.default_effect)?);
    info!(
        "Access control loaded with {} rules, default {:?}",
        access.rule_count(),
        config.access.default_effect
    );

    let mut registry = BackendRegistry::new(config.server.default_referrals.clone());
    for backend_config in &config.backends {
        let suffixes = parse_dns(&backend_config.suffixes)?;
        let mut backend = MemoryBackend::new(&backend_config.name, suffixes, access.clone())
            .with_compare(backend_config.compare)
            .with_restrictions(backend_config.restrictions.clone())
            .with_default_referrals(config.server.default_referrals.clone());

        for alias in &backend_config.aliases {
            backend = backend
                .with_alias(parse_dn(&alias.alias)?, parse_dn(&alias.target)?)
                .map_err(anyhow::Error::msg)?;
        }

        for entry_config in &backend_config.entries {
            let entry = build_entry(&schema, entry_config)
                .with_context(|| format!("Entry '{}'", entry_config.dn))?;
            backend.add_entry(entry).map_err(anyhow::Error::msg)?;
        }

        info!(
            "Backend '{}' loaded with {} entries",
            backend_config.name,
            backend.entry_count()
        );
        registry
            .register(Arc::new(backend))
            .map_err(anyhow::Error::msg)?;
    }

    let schema = Arc::new(SchemaHandle::new(schema));
    let router = Arc::new(registry);
    let controls = Arc::new(StandardControls::new());
    let subschema_dn = parse_dn(&config.server.subschema_dn)?;

    let special = Arc::new(SpecialEntries::new(
        ServerInfo {
            subschema_dn: subschema_dn.clone(),
            vendor_name: config.server.vendor_name.clone(),
            vendor_version: config.server.vendor_version.clone(),
            default_referrals: config.server.default_referrals.clone(),
        },
        router.clone(),
        controls.clone(),
    ));

    Ok(CompareEngine::new(
        EngineConfig::new(subschema_dn).with_restrictions(config.server.restrictions.clone()),
        Collaborators {
            controls,
            schema,
            special,
            router,
            access,
            sink,
            stats,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[server]
default_referrals = ["ldap://root.example.net/"]

[server.restrictions]
min_ssf = 0

[access]
default_effect = "deny"

[[access.rules]]
id = "public"
effect = "allow"
who = "*"
priority = 10

[[schema.attribute_types]]
oid = "1.3.6.1.4.1.99999.1"
names = ["nickName"]
sup = "name"

[[backends]]
name = "example"
suffixes = ["dc=example,dc=com"]

[[backends.aliases]]
alias = "o=example"
target = "dc=example,dc=com"

[[backends.entries]]
dn = "dc=example,dc=com"
attributes = { objectClass = ["top", "domain"], dc = "example" }

[[backends.entries]]
dn = "uid=alice,dc=example,dc=com"
[backends.entries.attributes]
uid = "alice"
cn = ["Alice Liddell", "Alice"]
nickName = "Ally"
"#;

    #[test]
    fn test_parse_sample() {
        let config = DirectoryConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.server.subschema_dn, "cn=Subschema");
        assert_eq!(config.server.vendor_name, "ldapd");
        assert_eq!(config.access.default_effect, AccessEffect::Deny);
        assert_eq!(config.access.rules[0].attributes, vec!["*".to_string()]);
        assert_eq!(config.backends.len(), 1);
        assert!(config.backends[0].compare);
        assert_eq!(config.backends[0].entries.len(), 2);
        assert_eq!(
            config.backends[0].entries[1].attributes["cn"].to_vec(),
            vec!["Alice Liddell".to_string(), "Alice".to_string()]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = DirectoryConfig::load(file.path()).unwrap();
        assert_eq!(config.backends[0].name, "example");

        assert!(DirectoryConfig::load("/nonexistent/ldapd.toml").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = DirectoryConfig::from_toml_str("").unwrap();
        assert!(config.backends.is_empty());
        assert_eq!(config.server.restrictions, Restrictions::default());
        config.validate().unwrap();
    }

    fn invalid(toml: &str) -> String {
        let config = DirectoryConfig::from_toml_str(toml).unwrap();
        format!("{:#}", config.validate().unwrap_err())
    }

    #[test]
    fn test_validation_failures() {
        assert!(invalid("[server]\nsubschema_dn = \"***not-a-dn***\"").contains("subschema"));
        assert!(invalid("[server]\ndefault_referrals = [\" \"]").contains("referral"));

        let shared = r#"
[[backends]]
name = "a"
suffixes = ["dc=example,dc=com"]

[[backends]]
name = "b"
suffixes = ["DC=Example, DC=Com"]
"#;
        assert!(invalid(shared).contains("served by both"));

        let bad_alias = r#"
[[backends]]
name = "a"
suffixes = ["dc=example,dc=com"]
aliases = [{ alias = "o=x", target = "dc=other" }]
"#;
        assert!(invalid(bad_alias).contains("not one of its suffixes"));

        let bad_op = r#"
[[access.rules]]
id = "r"
effect = "allow"
who = "*"
operations = ["modify"]
"#;
        assert!(invalid(bad_op).contains("unknown operation"));

        let outside = r#"
[[backends]]
name = "a"
suffixes = ["dc=example,dc=com"]

[[backends.entries]]
dn = "dc=other,dc=org"
"#;
        assert!(invalid(outside).contains("outside"));

        let unknown_attr = r#"
[[backends]]
name = "a"
suffixes = ["dc=example,dc=com"]

[[backends.entries]]
dn = "dc=example,dc=com"
attributes = { shoeSize = "42" }
"#;
        assert!(invalid(unknown_attr).contains("shoeSize"));
    }

    #[test]
    fn test_unknown_effect_is_rejected_at_parse() {
        let toml = r#"
[[access.rules]]
id = "r"
effect = "maybe"
who = "*"
"#;
        assert!(DirectoryConfig::from_toml_str(toml).is_err());
    }
}
