//! In-memory backend
//!
//! Entries live in a concurrent map keyed by normalized DN. The backend
//! owns one or more suffixes, may expose further suffixes as aliases of
//! them, and handles compare itself when the capability is enabled.

use crate::matcher::compare_entry;
use crate::restrictions::Restrictions;
use crate::router::{chase_referrals, rewrite_referrals};
use async_trait::async_trait;
use dashmap::DashMap;
use ldapd_core::traits::{AccessGate, AccessKind, Backend, CompareCapability, SchemaResolver};
use ldapd_core::types::{AttributeAssertion, Dn, Entry, Operation, ResultCode, ResultReport};
use ldapd_core::Result;
use std::sync::Arc;
use tracing::debug;

/// Suffix alias: requests under `alias` are served from `target`
#[derive(Debug, Clone)]
pub struct SuffixAlias {
    pub alias: Dn,
    pub target: Dn,
}

pub struct MemoryBackend {
    name: String,
    /// Real suffixes followed by alias suffixes
    suffixes: Vec<Dn>,
    aliases: Vec<SuffixAlias>,
    entries: DashMap<String, Entry>,
    restrictions: Restrictions,
    access: Arc<dyn AccessGate>,
    compare_enabled: bool,
    /// Used for referral objects that carry no `ref` values
    default_referrals: Vec<String>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>, suffixes: Vec<Dn>, access: Arc<dyn AccessGate>) -> Self {
        Self {
            name: name.into(),
            suffixes,
            aliases: Vec::new(),
            entries: DashMap::new(),
            restrictions: Restrictions::none(),
            access,
            compare_enabled: true,
            default_referrals: Vec::new(),
        }
    }

    pub fn with_default_referrals(mut self, urls: Vec<String>) -> Self {
        self.default_referrals = urls;
        self
    }

    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    /// Enable or disable the compare capability
    pub fn with_compare(mut self, enabled: bool) -> Self {
        self.compare_enabled = enabled;
        self
    }

    /// Serve `alias` as another name for the owned suffix `target`
    pub fn with_alias(mut self, alias: Dn, target: Dn) -> std::result::Result<Self, String> {
        if !self.suffixes.contains(&target) {
            return Err(format!(
                "alias target '{}' is not a suffix of backend '{}'",
                target, self.name
            ));
        }
        self.suffixes.push(alias.clone());
        self.aliases.push(SuffixAlias { alias, target });
        Ok(self)
    }

    /// Store an entry; it must sit under one of the real suffixes
    pub fn add_entry(&self, entry: Entry) -> std::result::Result<(), String> {
        if !self.owns(entry.dn()) {
            return Err(format!(
                "entry '{}' is outside the naming contexts of backend '{}'",
                entry.dn(),
                self.name
            ));
        }
        self.entries.insert(entry.dn().normalized().to_string(), entry);
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Copy of the entry at `dn`, without holding the map shard
    pub fn get_entry(&self, dn: &Dn) -> Option<Entry> {
        self.entries.get(dn.normalized()).map(|e| e.value().clone())
    }

    fn real_suffixes(&self) -> &[Dn] {
        &self.suffixes[..self.suffixes.len() - self.aliases.len()]
    }

    fn owns(&self, dn: &Dn) -> bool {
        self.real_suffixes().iter().any(|s| dn.ends_with(s))
    }

    fn suffix_of(&self, dn: &Dn) -> Option<&Dn> {
        self.real_suffixes()
            .iter()
            .filter(|s| dn.ends_with(s))
            .max_by_key(|s| s.depth())
    }

    /// Closest existing entry at or above `dn`, within the suffix
    fn closest_existing(&self, dn: &Dn) -> Option<Entry> {
        let suffix = self.suffix_of(dn)?;
        let mut current = Some(dn.clone());
        while let Some(candidate) = current {
            if let Some(entry) = self.get_entry(&candidate) {
                return Some(entry);
            }
            if candidate == *suffix {
                break;
            }
            current = candidate.parent();
        }
        None
    }
}

fn is_referral(entry: &Entry) -> bool {
    entry.has_object_class("referral")
}

fn referral_urls(entry: &Entry) -> Vec<String> {
    entry
        .values_named("ref")
        .filter_map(|v| std::str::from_utf8(v).ok())
        .map(|s| s.trim().to_string())
        .collect()
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn suffixes(&self) -> &[Dn] {
        &self.suffixes
    }

    fn check_restrictions(&self, op: &Operation) -> Result<()> {
        self.restrictions.check(op)
    }

    async fn check_referrals(
        &self,
        op: &Operation,
        dn: &Dn,
    ) -> std::result::Result<(), ResultReport> {
        if op.controls.manage_dsa_it {
            return Ok(());
        }

        let target = self.resolve_suffix_alias(dn);
        let suffix = match self.suffix_of(&target) {
            Some(suffix) => suffix.clone(),
            None => return Ok(()),
        };

        // Closest referral object wins
        let mut current = Some(target.clone());
        while let Some(candidate) = current {
            if let Some(entry) = self.get_entry(&candidate).filter(is_referral) {
                let urls = referral_urls(&entry);
                debug!("Referral object {} on the path to {}", entry.dn(), target);
                let urls = if urls.is_empty() {
                    rewrite_referrals(&self.default_referrals, &target)
                } else {
                    chase_referrals(&urls, entry.dn(), &target)
                };
                if urls.is_empty() {
                    return Err(ResultReport::new(ResultCode::NoSuchObject)
                        .with_diagnostic("no global superior knowledge"));
                }
                return Err(ResultReport::referral(urls).with_matched_dn(entry.dn().raw()));
            }
            if candidate == suffix {
                break;
            }
            current = candidate.parent();
        }
        Ok(())
    }

    fn resolve_suffix_alias(&self, dn: &Dn) -> Dn {
        self.aliases
            .iter()
            .filter(|a| dn.ends_with(&a.alias))
            .max_by_key(|a| a.alias.depth())
            .and_then(|a| dn.replace_suffix(&a.alias, &a.target))
            .unwrap_or_else(|| dn.clone())
    }

    fn compare_capability(&self) -> Option<&dyn CompareCapability> {
        if self.compare_enabled {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl CompareCapability for MemoryBackend {
    async fn compare(
        &self,
        op: &Operation,
        raw_dn: &str,
        dn: &Dn,
        assertion: &AttributeAssertion,
        schema: &dyn SchemaResolver,
    ) -> ResultReport {
        let entry = match self.get_entry(dn) {
            Some(entry) => entry,
            None => {
                debug!("Backend '{}': no entry for \"{}\"", self.name, raw_dn);
                let report = ResultReport::new(ResultCode::NoSuchObject);
                return match dn.parent().and_then(|p| self.closest_existing(&p)) {
                    Some(matched) => report.with_matched_dn(matched.dn().raw()),
                    None => report,
                };
            }
        };

        if !self
            .access
            .check(op, &entry, &assertion.desc, &assertion.value, AccessKind::Compare)
            .await
        {
            return ResultReport::new(ResultCode::InsufficientAccess);
        }

        ResultReport::verdict(compare_entry(&entry, assertion, schema))
    }
}
