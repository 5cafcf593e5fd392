//! Attribute types, descriptors and equality matching rules

use crate::error::{LdapError, Result};
use crate::types::dn::{fold_value, Dn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Value syntaxes known to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    DirectoryString,
    Ia5String,
    Integer,
    Dn,
    OctetString,
    Oid,
    Boolean,
    NumericString,
    TelephoneNumber,
}

impl Syntax {
    /// Numeric OID of the syntax
    pub fn oid(self) -> &'static str {
        match self {
            Syntax::DirectoryString => "1.3.6.1.4.1.1466.115.121.1.15",
            Syntax::Ia5String => "1.3.6.1.4.1.1466.115.121.1.26",
            Syntax::Integer => "1.3.6.1.4.1.1466.115.121.1.27",
            Syntax::Dn => "1.3.6.1.4.1.1466.115.121.1.12",
            Syntax::OctetString => "1.3.6.1.4.1.1466.115.121.1.40",
            Syntax::Oid => "1.3.6.1.4.1.1466.115.121.1.38",
            Syntax::Boolean => "1.3.6.1.4.1.1466.115.121.1.7",
            Syntax::NumericString => "1.3.6.1.4.1.1466.115.121.1.36",
            Syntax::TelephoneNumber => "1.3.6.1.4.1.1466.115.121.1.50",
        }
    }

    /// All syntaxes, for the subschema entry
    pub fn all() -> &'static [Syntax] {
        &[
            Syntax::DirectoryString,
            Syntax::Ia5String,
            Syntax::Integer,
            Syntax::Dn,
            Syntax::OctetString,
            Syntax::Oid,
            Syntax::Boolean,
            Syntax::NumericString,
            Syntax::TelephoneNumber,
        ]
    }
}

/// Equality matching rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchingRule {
    CaseIgnoreMatch,
    CaseExactMatch,
    CaseIgnoreIa5Match,
    IntegerMatch,
    DistinguishedNameMatch,
    OctetStringMatch,
    ObjectIdentifierMatch,
    ObjectIdentifierFirstComponentMatch,
    BooleanMatch,
    NumericStringMatch,
    TelephoneNumberMatch,
}

impl MatchingRule {
    /// Rule name as published in the subschema entry
    pub fn name(self) -> &'static str {
        match self {
            MatchingRule::CaseIgnoreMatch => "caseIgnoreMatch",
            MatchingRule::CaseExactMatch => "caseExactMatch",
            MatchingRule::CaseIgnoreIa5Match => "caseIgnoreIA5Match",
            MatchingRule::IntegerMatch => "integerMatch",
            MatchingRule::DistinguishedNameMatch => "distinguishedNameMatch",
            MatchingRule::OctetStringMatch => "octetStringMatch",
            MatchingRule::ObjectIdentifierMatch => "objectIdentifierMatch",
            MatchingRule::ObjectIdentifierFirstComponentMatch => {
                "objectIdentifierFirstComponentMatch"
            }
            MatchingRule::BooleanMatch => "booleanMatch",
            MatchingRule::NumericStringMatch => "numericStringMatch",
            MatchingRule::TelephoneNumberMatch => "telephoneNumberMatch",
        }
    }

    /// Numeric OID of the rule
    pub fn oid(self) -> &'static str {
        match self {
            MatchingRule::CaseIgnoreMatch => "2.5.13.2",
            MatchingRule::CaseExactMatch => "2.5.13.5",
            MatchingRule::CaseIgnoreIa5Match => "1.3.6.1.4.1.1466.109.114.2",
            MatchingRule::IntegerMatch => "2.5.13.14",
            MatchingRule::DistinguishedNameMatch => "2.5.13.1",
            MatchingRule::OctetStringMatch => "2.5.13.17",
            MatchingRule::ObjectIdentifierMatch => "2.5.13.0",
            MatchingRule::ObjectIdentifierFirstComponentMatch => "2.5.13.30",
            MatchingRule::BooleanMatch => "2.5.13.13",
            MatchingRule::NumericStringMatch => "2.5.13.8",
            MatchingRule::TelephoneNumberMatch => "2.5.13.20",
        }
    }

    /// Syntax of assertion values for this rule
    pub fn assertion_syntax(self) -> Syntax {
        match self {
            MatchingRule::CaseIgnoreMatch | MatchingRule::CaseExactMatch => {
                Syntax::DirectoryString
            }
            MatchingRule::CaseIgnoreIa5Match => Syntax::Ia5String,
            MatchingRule::IntegerMatch => Syntax::Integer,
            MatchingRule::DistinguishedNameMatch => Syntax::Dn,
            MatchingRule::OctetStringMatch => Syntax::OctetString,
            MatchingRule::ObjectIdentifierMatch
            | MatchingRule::ObjectIdentifierFirstComponentMatch => Syntax::Oid,
            MatchingRule::BooleanMatch => Syntax::Boolean,
            MatchingRule::NumericStringMatch => Syntax::NumericString,
            MatchingRule::TelephoneNumberMatch => Syntax::TelephoneNumber,
        }
    }

    /// All rules, for the subschema entry
    pub fn all() -> &'static [MatchingRule] {
        &[
            MatchingRule::CaseIgnoreMatch,
            MatchingRule::CaseExactMatch,
            MatchingRule::CaseIgnoreIa5Match,
            MatchingRule::IntegerMatch,
            MatchingRule::DistinguishedNameMatch,
            MatchingRule::OctetStringMatch,
            MatchingRule::ObjectIdentifierMatch,
            MatchingRule::ObjectIdentifierFirstComponentMatch,
            MatchingRule::BooleanMatch,
            MatchingRule::NumericStringMatch,
            MatchingRule::TelephoneNumberMatch,
        ]
    }

    /// Canonical form of `raw` under this rule
    ///
    /// Two values are equal under the rule iff their normalized forms are
    /// byte-identical.
    pub fn normalize(self, raw: &[u8]) -> Result<NormalizedValue> {
        let bytes = match self {
            MatchingRule::OctetStringMatch => raw.to_vec(),
            MatchingRule::CaseIgnoreMatch => {
                non_empty(fold_value(utf8(raw)?))?.into_bytes()
            }
            MatchingRule::CaseExactMatch => {
                let text = utf8(raw)?.split_whitespace().collect::<Vec<_>>().join(" ");
                non_empty(text)?.into_bytes()
            }
            MatchingRule::CaseIgnoreIa5Match => {
                let text = utf8(raw)?;
                if !text.is_ascii() {
                    return Err(invalid_value());
                }
                fold_value(text).into_bytes()
            }
            MatchingRule::IntegerMatch => normalize_integer(utf8(raw)?)?.into_bytes(),
            MatchingRule::DistinguishedNameMatch => {
                let dn = Dn::parse(utf8(raw)?).map_err(|_| invalid_value())?;
                dn.normalized().as_bytes().to_vec()
            }
            MatchingRule::ObjectIdentifierMatch => normalize_oid(utf8(raw)?.trim())?.into_bytes(),
            MatchingRule::ObjectIdentifierFirstComponentMatch => {
                let text = utf8(raw)?.trim();
                let first = match text.strip_prefix('(') {
                    Some(rest) => rest.split_whitespace().next().unwrap_or(""),
                    None => text,
                };
                normalize_oid(first)?.into_bytes()
            }
            MatchingRule::BooleanMatch => match utf8(raw)?.trim().to_ascii_uppercase().as_str() {
                "TRUE" => b"TRUE".to_vec(),
                "FALSE" => b"FALSE".to_vec(),
                _ => return Err(invalid_value()),
            },
            MatchingRule::NumericStringMatch => {
                let digits: String = utf8(raw)?.chars().filter(|c| *c != ' ').collect();
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid_value());
                }
                digits.into_bytes()
            }
            MatchingRule::TelephoneNumberMatch => {
                let text: String = utf8(raw)?
                    .chars()
                    .filter(|c| *c != ' ' && *c != '-')
                    .collect();
                non_empty(text.to_lowercase())?.into_bytes()
            }
        };
        Ok(NormalizedValue(bytes))
    }

    /// Whether values under this rule are object identifiers
    pub fn is_oid_valued(self) -> bool {
        matches!(
            self,
            MatchingRule::ObjectIdentifierMatch | MatchingRule::ObjectIdentifierFirstComponentMatch
        )
    }

    /// Canonical form of `raw`, with descriptors mapped through `oid_of`
    ///
    /// Under the object identifier rules a name and the OID it stands for are
    /// equal, so a descriptor `oid_of` knows normalizes to its dotted OID.
    /// Unknown descriptors keep their lowercased form.
    pub fn normalize_with<F>(self, raw: &[u8], oid_of: F) -> Result<NormalizedValue>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = self.normalize(raw)?;
        if !self.is_oid_valued() || value.0.first().map_or(true, u8::is_ascii_digit) {
            return Ok(value);
        }
        let oid = std::str::from_utf8(&value.0).ok().and_then(oid_of);
        Ok(oid.map_or(value, |oid| NormalizedValue(oid.into_bytes())))
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn invalid_value() -> LdapError {
    LdapError::invalid_syntax("unable to normalize value")
}

fn utf8(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|_| invalid_value())
}

fn non_empty(text: String) -> Result<String> {
    if text.is_empty() {
        Err(invalid_value())
    } else {
        Ok(text)
    }
}

fn normalize_integer(text: &str) -> Result<String> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid_value());
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok("0".to_string());
    }
    Ok(if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    })
}

fn normalize_oid(text: &str) -> Result<String> {
    let first = text.chars().next().ok_or_else(invalid_value)?;
    if first.is_ascii_digit() {
        let valid = text
            .split('.')
            .all(|arc| !arc.is_empty() && arc.chars().all(|c| c.is_ascii_digit()));
        if !valid {
            return Err(invalid_value());
        }
        return Ok(text.to_string());
    }
    if first.is_ascii_alphabetic() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Ok(text.to_ascii_lowercase());
    }
    Err(invalid_value())
}

/// Attribute type usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttributeUsage {
    #[default]
    UserApplications,
    DirectoryOperation,
    DsaOperation,
}

/// Attribute type definition with its supertype resolved
#[derive(Debug, Clone)]
pub struct AttributeType {
    pub oid: String,
    /// Names; the first one is the canonical name
    pub names: Vec<String>,
    pub description: Option<String>,
    pub superior: Option<Arc<AttributeType>>,
    pub syntax: Syntax,
    pub equality: Option<MatchingRule>,
    pub single_value: bool,
    pub no_user_modification: bool,
    pub usage: AttributeUsage,
}

impl AttributeType {
    /// Canonical (first) name, or the OID when the type has no name
    pub fn canonical_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.oid)
    }

    /// Whether `name` (case-insensitive) or the OID identifies this type
    pub fn has_name(&self, name: &str) -> bool {
        self.oid == name || self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Whether this type is `other` or one of its subtypes
    pub fn is_subtype_of(&self, other: &AttributeType) -> bool {
        let mut current = Some(self);
        while let Some(at) = current {
            if at.oid == other.oid {
                return true;
            }
            current = at.superior.as_deref();
        }
        false
    }

    /// RFC 4512 `AttributeTypeDescription` for the subschema entry
    pub fn description_string(&self) -> String {
        let mut out = format!("( {}", self.oid);
        match self.names.len() {
            0 => {}
            1 => out.push_str(&format!(" NAME '{}'", self.names[0])),
            _ => {
                let names: Vec<String> = self.names.iter().map(|n| format!("'{}'", n)).collect();
                out.push_str(&format!(" NAME ( {} )", names.join(" ")));
            }
        }
        if let Some(desc) = &self.description {
            out.push_str(&format!(" DESC '{}'", desc));
        }
        if let Some(sup) = &self.superior {
            out.push_str(&format!(" SUP {}", sup.canonical_name()));
        }
        if let Some(rule) = self.equality {
            out.push_str(&format!(" EQUALITY {}", rule.name()));
        }
        out.push_str(&format!(" SYNTAX {}", self.syntax.oid()));
        if self.single_value {
            out.push_str(" SINGLE-VALUE");
        }
        if self.no_user_modification {
            out.push_str(" NO-USER-MODIFICATION");
        }
        match self.usage {
            AttributeUsage::UserApplications => {}
            AttributeUsage::DirectoryOperation => out.push_str(" USAGE directoryOperation"),
            AttributeUsage::DsaOperation => out.push_str(" USAGE dSAOperation"),
        }
        out.push_str(" )");
        out
    }
}

/// Resolved attribute description: a type plus options (`cn;lang-en`)
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    attr_type: Arc<AttributeType>,
    /// Lowercased, sorted options
    options: Vec<String>,
}

impl AttributeDescriptor {
    pub fn new(attr_type: Arc<AttributeType>, mut options: Vec<String>) -> Self {
        for option in options.iter_mut() {
            option.make_ascii_lowercase();
        }
        options.sort();
        options.dedup();
        Self { attr_type, options }
    }

    pub fn attr_type(&self) -> &AttributeType {
        &self.attr_type
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Canonical name including options, e.g. `cn;lang-en`
    pub fn cname(&self) -> String {
        let mut name = self.attr_type.canonical_name().to_string();
        for option in &self.options {
            name.push(';');
            name.push_str(option);
        }
        name
    }

    /// Equality matching rule bound to the type
    pub fn equality(&self) -> Option<MatchingRule> {
        self.attr_type.equality
    }

    /// Whether an attribute described by `self` is covered by an assertion on `assertion`
    ///
    /// The type must be the asserted type or a subtype, and the attribute must
    /// carry every option of the assertion.
    pub fn is_covered_by(&self, assertion: &AttributeDescriptor) -> bool {
        self.attr_type.is_subtype_of(&assertion.attr_type)
            && assertion.options.iter().all(|opt| self.options.contains(opt))
    }
}

impl PartialEq for AttributeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.attr_type.oid == other.attr_type.oid && self.options == other.options
    }
}

impl Eq for AttributeDescriptor {}

impl fmt::Display for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cname())
    }
}

/// Value in the canonical form of a matching rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedValue(Vec<u8>);

impl NormalizedValue {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
