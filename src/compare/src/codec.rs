//! BER codec for compare messages
//!
//! Decodes the `LDAPMessage` envelope carrying a `CompareRequest` and encodes
//! the matching `CompareResponse`:
//!
//! ```text
//! LDAPMessage ::= SEQUENCE {
//!     messageID   INTEGER,
//!     protocolOp  [APPLICATION 14] CompareRequest,
//!     controls    [0] Controls OPTIONAL }
//!
//! CompareRequest ::= SEQUENCE {
//!     entry  LDAPDN,
//!     ava    SEQUENCE { type AttributeDescription, value AssertionValue } }
//! ```
//!
//! Only definite lengths are accepted. Any decoding failure is fatal for the
//! connection.

use ldapd_core::types::{CompareMessage, CompareRequest, Control, ResultReport};
use thiserror::Error;

const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_ENUMERATED: u8 = 0x0a;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_COMPARE_REQUEST: u8 = 0x6e;
const TAG_COMPARE_RESPONSE: u8 = 0x6f;
const TAG_CONTROLS: u8 = 0xa0;
const TAG_REFERRAL: u8 = 0xa3;

/// Protocol-level decoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated element")]
    Truncated,

    #[error("unexpected tag 0x{found:02x} (expected 0x{expected:02x})")]
    UnexpectedTag { expected: u8, found: u8 },

    #[error("indefinite length not allowed")]
    IndefiniteLength,

    #[error("length field too long")]
    LengthTooLong,

    #[error("malformed integer")]
    InvalidInteger,

    #[error("malformed boolean")]
    InvalidBoolean,

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("trailing bytes after element")]
    TrailingBytes,
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Cursor over a BER buffer
struct BerReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BerReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn peek_tag(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> DecodeResult<u8> {
        let byte = *self.buf.get(self.pos).ok_or(DecodeError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_length(&mut self) -> DecodeResult<usize> {
        let first = self.next_byte()?;
        if first < 0x80 {
            return Ok(first as usize);
        }
        if first == 0x80 {
            return Err(DecodeError::IndefiniteLength);
        }
        let count = (first & 0x7f) as usize;
        if count > 4 {
            return Err(DecodeError::LengthTooLong);
        }
        let mut len = 0usize;
        for _ in 0..count {
            len = (len << 8) | self.next_byte()? as usize;
        }
        Ok(len)
    }

    /// Read one element with the expected tag and return its contents
    fn read_tlv(&mut self, tag: u8) -> DecodeResult<&'a [u8]> {
        let found = self.next_byte()?;
        if found != tag {
            return Err(DecodeError::UnexpectedTag {
                expected: tag,
                found,
            });
        }
        let len = self.read_length()?;
        let end = self.pos.checked_add(len).ok_or(DecodeError::Truncated)?;
        if end > self.buf.len() {
            return Err(DecodeError::Truncated);
        }
        let contents = &self.buf[self.pos..end];
        self.pos = end;
        Ok(contents)
    }

    fn read_integer(&mut self) -> DecodeResult<i32> {
        let bytes = self.read_tlv(TAG_INTEGER)?;
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(DecodeError::InvalidInteger);
        }
        let mut value: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        for byte in bytes {
            value = (value << 8) | *byte as i32;
        }
        Ok(value)
    }

    fn read_boolean(&mut self) -> DecodeResult<bool> {
        match self.read_tlv(TAG_BOOLEAN)? {
            [byte] => Ok(*byte != 0),
            _ => Err(DecodeError::InvalidBoolean),
        }
    }

    fn read_string(&mut self, field: &'static str) -> DecodeResult<String> {
        let bytes = self.read_tlv(TAG_OCTET_STRING)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(field))
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn finish(&self) -> DecodeResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes)
        }
    }
}

/// Decode an `LDAPMessage` carrying a compare request
pub fn decode_message(bytes: &[u8]) -> DecodeResult<CompareMessage> {
    let mut outer = BerReader::new(bytes);
    let body = outer.read_tlv(TAG_SEQUENCE)?;
    outer.finish()?;

    let mut message = BerReader::new(body);
    let message_id = message.read_integer()?;
    if message_id < 0 {
        return Err(DecodeError::InvalidInteger);
    }
    let request = decode_compare_request(message.read_tlv(TAG_COMPARE_REQUEST)?)?;

    let controls = if message.peek_tag() == Some(TAG_CONTROLS) {
        decode_controls(message.read_tlv(TAG_CONTROLS)?)?
    } else {
        Vec::new()
    };
    message.finish()?;

    Ok(CompareMessage {
        message_id,
        request,
        controls,
    })
}

/// Decode the contents of `[APPLICATION 14] CompareRequest`
pub fn decode_compare_request(contents: &[u8]) -> DecodeResult<CompareRequest> {
    let mut request = BerReader::new(contents);
    let dn = request.read_string("entry")?;

    let mut ava = BerReader::new(request.read_tlv(TAG_SEQUENCE)?);
    let attribute = ava.read_string("attribute description")?;
    let value = ava.read_tlv(TAG_OCTET_STRING)?.to_vec();
    ava.finish()?;
    request.finish()?;

    Ok(CompareRequest {
        dn,
        attribute,
        value,
    })
}

/// Decode the contents of `[0] Controls`
pub fn decode_controls(contents: &[u8]) -> DecodeResult<Vec<Control>> {
    let mut list = BerReader::new(contents);
    let mut controls = Vec::new();
    while !list.is_empty() {
        let mut control = BerReader::new(list.read_tlv(TAG_SEQUENCE)?);
        let oid = control.read_string("controlType")?;
        let critical = if control.peek_tag() == Some(TAG_BOOLEAN) {
            control.read_boolean()?
        } else {
            false
        };
        let value = if control.peek_tag() == Some(TAG_OCTET_STRING) {
            Some(control.read_tlv(TAG_OCTET_STRING)?.to_vec())
        } else {
            None
        };
        control.finish()?;
        controls.push(Control {
            oid,
            critical,
            value,
        });
    }
    Ok(controls)
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = (len as u32).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (4 - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn write_tlv(out: &mut Vec<u8>, tag: u8, contents: &[u8]) {
    out.push(tag);
    write_length(out, contents.len());
    out.extend_from_slice(contents);
}

fn integer_contents(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Encode a compare request message (client side)
pub fn encode_message(message: &CompareMessage) -> Vec<u8> {
    let mut ava = Vec::new();
    write_tlv(&mut ava, TAG_OCTET_STRING, message.request.attribute.as_bytes());
    write_tlv(&mut ava, TAG_OCTET_STRING, &message.request.value);

    let mut request = Vec::new();
    write_tlv(&mut request, TAG_OCTET_STRING, message.request.dn.as_bytes());
    write_tlv(&mut request, TAG_SEQUENCE, &ava);

    let mut body = Vec::new();
    write_tlv(&mut body, TAG_INTEGER, &integer_contents(message.message_id as i64));
    write_tlv(&mut body, TAG_COMPARE_REQUEST, &request);

    if !message.controls.is_empty() {
        let mut controls = Vec::new();
        for control in &message.controls {
            let mut item = Vec::new();
            write_tlv(&mut item, TAG_OCTET_STRING, control.oid.as_bytes());
            if control.critical {
                write_tlv(&mut item, TAG_BOOLEAN, &[0xff]);
            }
            if let Some(value) = &control.value {
                write_tlv(&mut item, TAG_OCTET_STRING, value);
            }
            write_tlv(&mut controls, TAG_SEQUENCE, &item);
        }
        write_tlv(&mut body, TAG_CONTROLS, &controls);
    }

    let mut out = Vec::new();
    write_tlv(&mut out, TAG_SEQUENCE, &body);
    out
}

/// Encode `[APPLICATION 15] CompareResponse` for `message_id`
pub fn encode_response(message_id: i32, report: &ResultReport) -> Vec<u8> {
    let mut result = Vec::new();
    write_tlv(
        &mut result,
        TAG_ENUMERATED,
        &integer_contents(report.code.code() as i64),
    );
    write_tlv(
        &mut result,
        TAG_OCTET_STRING,
        report.matched_dn.as_deref().unwrap_or("").as_bytes(),
    );
    write_tlv(
        &mut result,
        TAG_OCTET_STRING,
        report.diagnostic.as_deref().unwrap_or("").as_bytes(),
    );
    if let Some(urls) = report.referrals.as_ref().filter(|urls| !urls.is_empty()) {
        let mut referral = Vec::new();
        for url in urls {
            write_tlv(&mut referral, TAG_OCTET_STRING, url.as_bytes());
        }
        write_tlv(&mut result, TAG_REFERRAL, &referral);
    }

    let mut body = Vec::new();
    write_tlv(&mut body, TAG_INTEGER, &integer_contents(message_id as i64));
    write_tlv(&mut body, TAG_COMPARE_RESPONSE, &result);

    let mut out = Vec::new();
    write_tlv(&mut out, TAG_SEQUENCE, &body);
    out
}
