//! Root DSE and subschema subentry
//!
//! Both entries are synthesized on every call from the current configuration
//! and the schema snapshot of the operation asking; nothing is cached between
//! operations.

use crate::schema::object_class_descriptions;
use ldapd_core::traits::{BackendRouter, ControlProcessor, SchemaResolver, SpecialNamespace};
use ldapd_core::types::{Dn, Entry, MatchingRule, Operation, Syntax};
use ldapd_core::{LdapError, Result};
use std::sync::Arc;

/// Supported features: all operational attributes (RFC 3673)
const FEATURE_ALL_OP_ATTRS: &str = "1.3.6.1.4.1.4203.1.5.1";

/// Which reserved entry a normalized DN names, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialDn {
    RootDse,
    Subschema,
}

impl SpecialDn {
    /// Classify `dn` once, right after normalization
    pub fn classify(dn: &Dn, subschema_dn: &Dn) -> Option<Self> {
        if dn.is_root() {
            Some(SpecialDn::RootDse)
        } else if dn == subschema_dn {
            Some(SpecialDn::Subschema)
        } else {
            None
        }
    }
}

/// Server identity published in the root DSE
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub subschema_dn: Dn,
    pub vendor_name: String,
    pub vendor_version: String,
    /// Published as `altServer`
    pub default_referrals: Vec<String>,
}

pub struct SpecialEntries {
    info: ServerInfo,
    router: Arc<dyn BackendRouter>,
    controls: Arc<dyn ControlProcessor>,
}

impl SpecialEntries {
    pub fn new(
        info: ServerInfo,
        router: Arc<dyn BackendRouter>,
        controls: Arc<dyn ControlProcessor>,
    ) -> Self {
        Self {
            info,
            router,
            controls,
        }
    }

    pub fn subschema_dn(&self) -> &Dn {
        &self.info.subschema_dn
    }
}

fn put<I, V>(entry: &mut Entry, schema: &dyn SchemaResolver, name: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = V>,
    V: Into<Vec<u8>>,
{
    let desc = schema
        .resolve_type(name)
        .map_err(|_| LdapError::internal(format!("schema lacks '{}'", name)))?;
    let values: Vec<Vec<u8>> = values.into_iter().map(Into::into).collect();
    if !values.is_empty() {
        entry.add_values(desc, values);
    }
    Ok(())
}

impl SpecialNamespace for SpecialEntries {
    fn root_dse(&self, _op: &Operation, schema: &dyn SchemaResolver) -> Result<Entry> {
        let mut entry = Entry::new(Dn::root());

        put(&mut entry, schema, "objectClass", ["top", "extensibleObject"])?;
        put(
            &mut entry,
            schema,
            "namingContexts",
            self.router
                .naming_contexts()
                .iter()
                .map(|dn| dn.raw().to_string()),
        )?;
        put(
            &mut entry,
            schema,
            "subschemaSubentry",
            [self.info.subschema_dn.raw()],
        )?;
        put(
            &mut entry,
            schema,
            "supportedControl",
            self.controls.supported_controls(),
        )?;
        put(&mut entry, schema, "supportedFeatures", [FEATURE_ALL_OP_ATTRS])?;
        put(&mut entry, schema, "supportedLDAPVersion", ["3"])?;
        put(&mut entry, schema, "vendorName", [self.info.vendor_name.as_str()])?;
        put(
            &mut entry,
            schema,
            "vendorVersion",
            [self.info.vendor_version.as_str()],
        )?;
        put(
            &mut entry,
            schema,
            "altServer",
            self.info.default_referrals.iter().map(String::as_str),
        )?;

        Ok(entry)
    }

    fn subschema(&self, _op: &Operation, schema: &dyn SchemaResolver) -> Result<Entry> {
        let dn = self.info.subschema_dn.clone();
        let cn: Vec<String> = dn
            .rdns()
            .first()
            .map(|rdn| rdn.avas().iter().map(|a| a.value.clone()).collect())
            .unwrap_or_default();
        let mut entry = Entry::new(dn);

        put(
            &mut entry,
            schema,
            "objectClass",
            ["top", "subentry", "subschema", "extensibleObject"],
        )?;
        put(&mut entry, schema, "cn", cn)?;
        put(
            &mut entry,
            schema,
            "attributeTypes",
            schema
                .attribute_types()
                .iter()
                .map(|at| at.description_string()),
        )?;
        put(
            &mut entry,
            schema,
            "matchingRules",
            MatchingRule::all().iter().map(|rule| {
                format!(
                    "( {} NAME '{}' SYNTAX {} )",
                    rule.oid(),
                    rule.name(),
                    rule.assertion_syntax().oid()
                )
            }),
        )?;
        put(
            &mut entry,
            schema,
            "ldapSyntaxes",
            Syntax::all().iter().map(|s| format!("( {} )", s.oid())),
        )?;
        put(&mut entry, schema, "objectClasses", object_class_descriptions())?;

        Ok(entry)
    }
}
