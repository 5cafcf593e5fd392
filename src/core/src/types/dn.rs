//! Distinguished names
//!
//! A [`Dn`] keeps the raw string as received next to its normalized form.
//! The raw form is for diagnostics only; routing and namespace comparisons use
//! the normalized form and the parsed RDN sequence.
//!
//! Normalization follows the RFC 4514 string representation:
//! - RDNs separated by `,` (legacy `;` accepted), multi-valued RDNs by `+`
//! - attribute types are descriptors or numeric OIDs, lowercased
//! - values honour `\` escapes, `\XX` hex pairs, legacy quoting and `#hex`
//! - insignificant spaces are dropped, inner whitespace runs collapse to one
//!   space and values are case-folded
//! - AVAs inside a multi-valued RDN are sorted

use crate::error::{LdapError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// One `type=value` pair of an RDN, already normalized
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ava {
    /// Lowercased attribute type (descriptor or numeric OID)
    pub attr: String,
    /// Normalized value (unescaped)
    pub value: String,
    /// Value was given in `#hex` form and is kept verbatim
    pub hex: bool,
}

impl Ava {
    fn write_normalized(&self, out: &mut String) {
        out.push_str(&self.attr);
        out.push('=');
        if self.hex {
            out.push_str(&self.value);
            return;
        }
        for (idx, ch) in self.value.chars().enumerate() {
            let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
                || (idx == 0 && ch == '#');
            if needs_escape {
                out.push('\\');
            }
            out.push(ch);
        }
    }
}

/// Relative distinguished name (one or more AVAs)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rdn {
    avas: Vec<Ava>,
}

impl Rdn {
    fn new(mut avas: Vec<Ava>) -> Self {
        avas.sort();
        Self { avas }
    }

    /// AVAs of this RDN in normalized (sorted) order
    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// Normalized string form of this RDN
    pub fn normalized(&self) -> String {
        let mut out = String::new();
        for (idx, ava) in self.avas.iter().enumerate() {
            if idx > 0 {
                out.push('+');
            }
            ava.write_normalized(&mut out);
        }
        out
    }
}

/// Distinguished name kept as a (raw, normalized) pair
#[derive(Debug, Clone)]
pub struct Dn {
    raw: String,
    normalized: String,
    /// RDNs, leaf first
    rdns: Vec<Rdn>,
    /// RDN text as received, parallel to `rdns`
    raw_rdns: Vec<String>,
}

impl Dn {
    /// Parse and normalize a DN string
    ///
    /// Fails with [`LdapError::InvalidDnSyntax`] when the string is not a DN.
    pub fn parse(raw: &str) -> Result<Self> {
        let (rdns, raw_rdns) = DnParser::new(raw).parse()?.into_iter().unzip();
        Ok(Self::from_rdns(raw.to_string(), rdns, raw_rdns))
    }

    /// The empty DN (root DSE)
    pub fn root() -> Self {
        Self::from_rdns(String::new(), Vec::new(), Vec::new())
    }

    fn from_rdns(raw: String, rdns: Vec<Rdn>, raw_rdns: Vec<String>) -> Self {
        let normalized = rdns
            .iter()
            .map(Rdn::normalized)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            raw,
            normalized,
            rdns,
            raw_rdns,
        }
    }

    /// Derived DN; its raw form is the normalized one
    fn derived(rdns: Vec<Rdn>, raw_rdns: Vec<String>) -> Self {
        let dn = Self::from_rdns(String::new(), rdns, raw_rdns);
        Self {
            raw: dn.normalized.clone(),
            ..dn
        }
    }

    /// DN exactly as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Canonical form used for routing and comparisons
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// RDNs, leaf first
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Whether this is the empty (root) DN
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDNs
    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    /// Whether `suffix` is a suffix of this DN on RDN boundaries
    ///
    /// Every DN ends with the root DN, and every DN ends with itself.
    pub fn ends_with(&self, suffix: &Dn) -> bool {
        self.rdns.ends_with(&suffix.rdns)
    }

    /// Returns the parent DN, or `None` for the root DN
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self::derived(
            self.rdns[1..].to_vec(),
            self.raw_rdns[1..].to_vec(),
        ))
    }

    /// Replace `old` suffix by `new`, keeping the leading RDNs
    ///
    /// Returns `None` when `old` is not a suffix of this DN.
    pub fn replace_suffix(&self, old: &Dn, new: &Dn) -> Option<Dn> {
        if !self.ends_with(old) {
            return None;
        }
        let keep = self.rdns.len() - old.rdns.len();
        let mut rdns = self.rdns[..keep].to_vec();
        rdns.extend(new.rdns.iter().cloned());
        let mut raw_rdns = self.raw_rdns[..keep].to_vec();
        raw_rdns.extend(new.raw_rdns.iter().cloned());
        Some(Self::derived(rdns, raw_rdns))
    }

    /// Leading RDNs of this DN that lie below `ancestor`, in their received
    /// spelling
    pub fn relative_to(&self, ancestor: &Dn) -> Option<String> {
        if !self.ends_with(ancestor) {
            return None;
        }
        let keep = self.rdns.len() - ancestor.rdns.len();
        Some(self.raw_rdns[..keep].join(","))
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl FromStr for Dn {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Collapse whitespace runs, trim and case-fold a string value
pub fn fold_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn invalid(reason: &str) -> LdapError {
    LdapError::invalid_dn(format!("invalid DN: {}", reason))
}

/// Character-level RFC 4514 parser
struct DnParser {
    chars: Vec<char>,
    pos: usize,
}

impl DnParser {
    fn new(raw: &str) -> Self {
        Self {
            chars: raw.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(' ')) {
            self.pos += 1;
        }
    }

    /// Parsed RDNs, each with its text as received
    fn parse(mut self) -> Result<Vec<(Rdn, String)>> {
        self.skip_spaces();
        if self.peek().is_none() {
            return Ok(Vec::new());
        }

        let mut rdns = Vec::new();
        let mut avas = Vec::new();
        let mut start = self.pos;
        loop {
            avas.push(self.parse_ava()?);
            let end = self.pos;
            self.skip_spaces();
            match self.peek() {
                None => {
                    rdns.push((Rdn::new(std::mem::take(&mut avas)), self.span(start, end)));
                    return Ok(rdns);
                }
                Some('+') => {
                    self.pos += 1;
                }
                Some(',') | Some(';') => {
                    self.pos += 1;
                    rdns.push((Rdn::new(std::mem::take(&mut avas)), self.span(start, end)));
                    self.skip_spaces();
                    start = self.pos;
                }
                Some(other) => {
                    return Err(invalid(&format!("unexpected character '{}'", other)));
                }
            }
        }
    }

    /// Source text between two positions, without insignificant trailing spaces
    fn span(&self, start: usize, end: usize) -> String {
        let mut end = end;
        while end > start && self.chars[end - 1] == ' ' {
            let escapes = self.chars[start..end - 1]
                .iter()
                .rev()
                .take_while(|c| **c == '\\')
                .count();
            if escapes % 2 == 1 {
                break;
            }
            end -= 1;
        }
        self.chars[start..end].iter().collect()
    }

    fn parse_ava(&mut self) -> Result<Ava> {
        self.skip_spaces();
        let attr = self.parse_type()?;
        self.skip_spaces();
        if self.peek() != Some('=') {
            return Err(invalid("missing '=' in RDN"));
        }
        self.pos += 1;
        self.skip_spaces();

        match self.peek() {
            Some('#') => {
                self.pos += 1;
                let value = self.parse_hex_value()?;
                Ok(Ava {
                    attr,
                    value,
                    hex: true,
                })
            }
            Some('"') => {
                self.pos += 1;
                let value = self.parse_quoted_value()?;
                Ok(Ava {
                    attr,
                    value: fold_value(&value),
                    hex: false,
                })
            }
            _ => {
                let value = self.parse_string_value()?;
                Ok(Ava {
                    attr,
                    value: fold_value(&value),
                    hex: false,
                })
            }
        }
    }

    fn parse_type(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let attr: String = self.chars[start..self.pos].iter().collect();
        if attr.is_empty() {
            return Err(invalid("empty attribute type"));
        }

        let attr = attr
            .strip_prefix("oid.")
            .or_else(|| attr.strip_prefix("OID."))
            .map(str::to_string)
            .unwrap_or(attr);

        let first = attr.chars().next().unwrap_or('-');
        if first.is_ascii_digit() {
            let valid = attr
                .split('.')
                .all(|arc| !arc.is_empty() && arc.chars().all(|c| c.is_ascii_digit()));
            if !valid {
                return Err(invalid("malformed numeric OID"));
            }
        } else if !first.is_ascii_alphabetic() || attr.contains('.') {
            return Err(invalid("malformed attribute type"));
        }

        Ok(attr.to_ascii_lowercase())
    }

    fn parse_hex_value(&mut self) -> Result<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(invalid("malformed hex value"));
        }
        Ok(format!("#{}", digits.to_ascii_lowercase()))
    }

    fn parse_quoted_value(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None => return Err(invalid("unterminated quoted value")),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    self.parse_escape(&mut bytes)?;
                }
                Some(ch) => {
                    self.pos += 1;
                    push_char(&mut bytes, ch);
                }
            }
        }
        String::from_utf8(bytes).map_err(|_| invalid("value is not valid UTF-8"))
    }

    fn parse_string_value(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        while let Some(ch) = self.peek() {
            match ch {
                ',' | ';' | '+' => break,
                '\\' => {
                    self.pos += 1;
                    self.parse_escape(&mut bytes)?;
                }
                '"' | '<' | '>' => {
                    return Err(invalid(&format!("unescaped '{}' in value", ch)));
                }
                _ => {
                    self.pos += 1;
                    push_char(&mut bytes, ch);
                }
            }
        }
        String::from_utf8(bytes).map_err(|_| invalid("value is not valid UTF-8"))
    }

    fn parse_escape(&mut self, bytes: &mut Vec<u8>) -> Result<()> {
        let first = self.peek().ok_or_else(|| invalid("dangling escape"))?;
        if first.is_ascii_hexdigit() {
            let second = self
                .chars
                .get(self.pos + 1)
                .copied()
                .filter(char::is_ascii_hexdigit)
                .ok_or_else(|| invalid("malformed hex escape"))?;
            let pair: String = [first, second].iter().collect();
            let byte = u8::from_str_radix(&pair, 16).map_err(|_| invalid("malformed hex escape"))?;
            bytes.push(byte);
            self.pos += 2;
            return Ok(());
        }
        if matches!(first, ' ' | '"' | '#' | '+' | ',' | ';' | '<' | '=' | '>' | '\\') {
            push_char(bytes, first);
            self.pos += 1;
            return Ok(());
        }
        Err(invalid(&format!("invalid escape '\\{}'", first)))
    }
}

fn push_char(bytes: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}
