//! Schema registry
//!
//! Attribute type definitions are resolved once, at build time, into shared
//! [`AttributeType`] handles: supertypes are linked with Kahn's algorithm so
//! every type is built after its superior, and a supertype cycle is reported
//! instead of looping. Operations read the schema through a [`SchemaHandle`]
//! snapshot so one operation never sees two different type tables.

mod builtin;

use ldapd_core::traits::SchemaResolver;
use ldapd_core::types::{AttributeDescriptor, AttributeType, AttributeUsage, MatchingRule, Syntax};
use ldapd_core::{LdapError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Schema build errors
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// Supertype chain loops back on itself
    #[error("Circular supertype chain: {0}")]
    CircularSuperior(String),

    /// `sup` names a type that is not defined
    #[error("Unknown supertype '{sup}' for attribute type '{attr}'")]
    UnknownSuperior { attr: String, sup: String },

    /// Two definitions share a name or OID
    #[error("Duplicate attribute type name: {0}")]
    DuplicateName(String),

    /// Definition is incomplete or malformed
    #[error("Invalid attribute type: {0}")]
    InvalidDefinition(String),
}

/// Unresolved attribute type definition, as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTypeDef {
    pub oid: String,
    pub names: Vec<String>,
    #[serde(default)]
    pub sup: Option<String>,
    /// Inherited from the supertype when unset
    #[serde(default)]
    pub syntax: Option<Syntax>,
    /// Inherited from the supertype when unset
    #[serde(default)]
    pub equality: Option<MatchingRule>,
    #[serde(default)]
    pub single_value: bool,
    #[serde(default)]
    pub no_user_modification: bool,
    #[serde(default)]
    pub usage: AttributeUsage,
    #[serde(default)]
    pub description: Option<String>,
}

impl AttributeTypeDef {
    pub fn new(oid: &str, names: &[&str]) -> Self {
        Self {
            oid: oid.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            sup: None,
            syntax: None,
            equality: None,
            single_value: false,
            no_user_modification: false,
            usage: AttributeUsage::UserApplications,
            description: None,
        }
    }

    pub fn sup(mut self, sup: &str) -> Self {
        self.sup = Some(sup.to_string());
        self
    }

    pub fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = Some(syntax);
        self
    }

    pub fn equality(mut self, rule: MatchingRule) -> Self {
        self.equality = Some(rule);
        self
    }

    pub fn single_value(mut self) -> Self {
        self.single_value = true;
        self
    }

    pub fn no_user_modification(mut self) -> Self {
        self.no_user_modification = true;
        self
    }

    pub fn usage(mut self, usage: AttributeUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn label(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.oid)
    }
}

/// Resolved attribute type table
#[derive(Debug, Clone)]
pub struct Schema {
    /// Types in definition order
    types: Vec<Arc<AttributeType>>,
    /// Lowercased names and OIDs → type
    by_name: HashMap<String, Arc<AttributeType>>,
}

impl Schema {
    /// Built-in types only
    pub fn builtin() -> std::result::Result<Self, SchemaError> {
        Self::build(builtin::builtin_definitions())
    }

    /// Built-in types plus `extra`
    pub fn with_extra_types(
        extra: Vec<AttributeTypeDef>,
    ) -> std::result::Result<Self, SchemaError> {
        let mut defs = builtin::builtin_definitions();
        defs.extend(extra);
        Self::build(defs)
    }

    /// Resolve a set of definitions
    pub fn build(defs: Vec<AttributeTypeDef>) -> std::result::Result<Self, SchemaError> {
        // Index every name and OID
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, def) in defs.iter().enumerate() {
            if def.oid.is_empty() {
                return Err(SchemaError::InvalidDefinition(format!(
                    "'{}' has no OID",
                    def.label()
                )));
            }
            for key in std::iter::once(&def.oid).chain(def.names.iter()) {
                if index.insert(key.to_ascii_lowercase(), i).is_some() {
                    return Err(SchemaError::DuplicateName(key.clone()));
                }
            }
        }

        // Edges superior → subtypes, in-degree is 0 or 1
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); defs.len()];
        let mut in_degree = vec![0usize; defs.len()];
        for (i, def) in defs.iter().enumerate() {
            if let Some(sup) = &def.sup {
                let parent = index.get(&sup.to_ascii_lowercase()).copied().ok_or_else(|| {
                    SchemaError::UnknownSuperior {
                        attr: def.label().to_string(),
                        sup: sup.clone(),
                    }
                })?;
                dependents[parent].push(i);
                in_degree[i] += 1;
            }
        }

        // Kahn's algorithm: resolve each type after its superior
        let mut queue: VecDeque<usize> = (0..defs.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut resolved: Vec<Option<Arc<AttributeType>>> = vec![None; defs.len()];

        while let Some(i) = queue.pop_front() {
            let def = &defs[i];
            let superior = match &def.sup {
                Some(sup) => index
                    .get(&sup.to_ascii_lowercase())
                    .and_then(|&p| resolved[p].clone()),
                None => None,
            };

            let syntax = def
                .syntax
                .or_else(|| superior.as_ref().map(|s| s.syntax))
                .ok_or_else(|| {
                    SchemaError::InvalidDefinition(format!("'{}' has no syntax", def.label()))
                })?;
            let equality = def
                .equality
                .or_else(|| superior.as_ref().and_then(|s| s.equality));

            resolved[i] = Some(Arc::new(AttributeType {
                oid: def.oid.clone(),
                names: def.names.clone(),
                description: def.description.clone(),
                superior,
                syntax,
                equality,
                single_value: def.single_value,
                no_user_modification: def.no_user_modification,
                usage: def.usage,
            }));

            for &child in &dependents[i] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        let unresolved: Vec<&str> = defs
            .iter()
            .zip(resolved.iter())
            .filter(|(_, r)| r.is_none())
            .map(|(def, _)| def.label())
            .collect();
        if !unresolved.is_empty() {
            return Err(SchemaError::CircularSuperior(unresolved.join(", ")));
        }

        let types: Vec<Arc<AttributeType>> = resolved.into_iter().flatten().collect();
        let mut by_name = HashMap::new();
        for at in &types {
            by_name.insert(at.oid.to_ascii_lowercase(), at.clone());
            for name in &at.names {
                by_name.insert(name.to_ascii_lowercase(), at.clone());
            }
        }

        debug!("Schema built with {} attribute types", types.len());
        Ok(Self { types, by_name })
    }

    /// Look up a type by name or OID, case-insensitively
    pub fn attribute_type(&self, name: &str) -> Option<Arc<AttributeType>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl SchemaResolver for Schema {
    fn resolve_type(&self, name: &str) -> Result<AttributeDescriptor> {
        let mut parts = name.trim().split(';');
        let base = parts.next().unwrap_or("");

        let options: Vec<String> = parts.map(str::to_string).collect();
        let valid_option =
            |o: &String| !o.is_empty() && o.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !options.iter().all(valid_option) {
            return Err(LdapError::UndefinedAttributeType(
                "attribute description contains inappropriate characters".to_string(),
            ));
        }

        let attr_type = self
            .attribute_type(base)
            .ok_or_else(|| LdapError::UndefinedAttributeType("attribute type undefined".to_string()))?;

        Ok(AttributeDescriptor::new(attr_type, options))
    }

    fn oid_of(&self, descriptor: &str) -> Option<String> {
        if let Some(at) = self.attribute_type(descriptor) {
            return Some(at.oid.clone());
        }
        builtin::BUILTIN_OBJECT_CLASSES
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(descriptor))
            .map(|(oid, _, _)| oid.to_string())
            .or_else(|| {
                MatchingRule::all()
                    .iter()
                    .find(|rule| rule.name().eq_ignore_ascii_case(descriptor))
                    .map(|rule| rule.oid().to_string())
            })
    }

    fn attribute_types(&self) -> &[Arc<AttributeType>] {
        &self.types
    }
}

/// Object class definitions the server knows, as published in `objectClasses`
pub fn object_class_descriptions() -> impl Iterator<Item = String> {
    builtin::BUILTIN_OBJECT_CLASSES
        .iter()
        .map(|(oid, name, rest)| format!("( {} NAME '{}' {} )", oid, name, rest))
}

/// Active schema, swappable at runtime
///
/// Readers take an `Arc<Schema>` snapshot and keep using it for the rest of
/// the operation; [`SchemaHandle::reload`] never blocks on them.
#[derive(Debug)]
pub struct SchemaHandle {
    current: RwLock<Arc<Schema>>,
}

impl SchemaHandle {
    pub fn new(schema: Schema) -> Self {
        Self {
            current: RwLock::new(Arc::new(schema)),
        }
    }

    /// Consistent view for one operation
    pub fn snapshot(&self) -> Arc<Schema> {
        self.current.read().clone()
    }

    /// Swap in a new table
    pub fn reload(&self, schema: Schema) {
        *self.current.write() = Arc::new(schema);
        debug!("Schema reloaded");
    }
}
