//! Compare request as produced by the decoder

use crate::types::schema::{AttributeDescriptor, NormalizedValue};

/// Request control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub critical: bool,
    pub value: Option<Vec<u8>>,
}

impl Control {
    pub fn new(oid: impl Into<String>, critical: bool) -> Self {
        Self {
            oid: oid.into(),
            critical,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Decoded `CompareRequest` fields, still raw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest {
    /// Target DN as received
    pub dn: String,
    /// Attribute description as received
    pub attribute: String,
    /// Assertion value bytes as received
    pub value: Vec<u8>,
}

impl CompareRequest {
    pub fn new(dn: impl Into<String>, attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            dn: dn.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Full `LDAPMessage` carrying a compare request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareMessage {
    pub message_id: i32,
    pub request: CompareRequest,
    pub controls: Vec<Control>,
}

/// Resolved assertion: descriptor plus value normalized under its equality rule
#[derive(Debug, Clone)]
pub struct AttributeAssertion {
    pub desc: AttributeDescriptor,
    pub value: NormalizedValue,
}
