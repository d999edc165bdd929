//! Tag-length-value binary wire format.
//!
//! Hand-rolled rather than built on a schema library — the spec is explicit
//! that wire compatibility with any third-party protobuf definition is a
//! non-goal; this format exists purely to keep messages small and easy to
//! skip unknown fields in. Every field begins with a varint key
//! `(field_number << 3) | wire_type`; readers must tolerate and skip field
//! numbers they don't recognize so future fields never break old clients.

pub mod messages;

use crate::error::{NodeBridgeError, Result};

/// The four wire types a field's payload can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Unbounded non-negative integer, little-endian base-128 (LEB128).
    Varint = 0,
    /// IEEE-754 float32 bit pattern, 4 raw bytes.
    Fixed32 = 1,
    /// IEEE-754 float64 bit pattern, 8 raw bytes.
    Fixed64 = 2,
    /// Varint length prefix followed by that many raw bytes.
    LengthDelimited = 3,
}

impl WireType {
    fn from_tag_bits(bits: u64) -> Result<Self> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed32),
            2 => Ok(WireType::Fixed64),
            3 => Ok(WireType::LengthDelimited),
            other => Err(NodeBridgeError::Parse(format!(
                "unknown wire type tag {other}"
            ))),
        }
    }
}

/// One decoded field: its number, and its payload in whatever shape its
/// wire type implies. `Bytes` covers both raw byte fields and nested
/// messages/strings — callers reinterpret as needed.
#[derive(Debug, Clone)]
pub enum RawField {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(Vec<u8>),
}

/// Appends fields to a growing byte buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_key(&mut self, field_number: u32, wire_type: WireType) {
        let key = ((field_number as u64) << 3) | (wire_type as u64);
        write_varint(&mut self.buf, key);
    }

    pub fn write_varint_field(&mut self, field_number: u32, value: u64) {
        self.write_key(field_number, WireType::Varint);
        write_varint(&mut self.buf, value);
    }

    pub fn write_bool_field(&mut self, field_number: u32, value: bool) {
        self.write_varint_field(field_number, value as u64);
    }

    pub fn write_fixed32_field(&mut self, field_number: u32, value: f32) {
        self.write_key(field_number, WireType::Fixed32);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64_field(&mut self, field_number: u32, value: f64) {
        self.write_key(field_number, WireType::Fixed64);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes_field(&mut self, field_number: u32, value: &[u8]) {
        self.write_key(field_number, WireType::LengthDelimited);
        write_varint(&mut self.buf, value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    pub fn write_string_field(&mut self, field_number: u32, value: &str) {
        self.write_bytes_field(field_number, value.as_bytes());
    }

    /// Nested/sub-message fields are just length-prefixed bytes.
    pub fn write_message_field(&mut self, field_number: u32, encoded: &[u8]) {
        self.write_bytes_field(field_number, encoded);
    }
}

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Decodes `data` into a flat list of `(field_number, RawField)` pairs in
/// wire order. Malformed varints or truncated length prefixes stop
/// decoding immediately and return a `ParseError` — the RPC layer maps that
/// to an error frame; partially-decoded messages are never handed to a
/// caller.
pub fn decode_fields(data: &[u8]) -> Result<Vec<(u32, RawField)>> {
    let mut fields = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let (key, key_len) = read_varint(data, pos)?;
        pos += key_len;
        let field_number = (key >> 3) as u32;
        let wire_type = WireType::from_tag_bits(key & 0x7)?;
        match wire_type {
            WireType::Varint => {
                let (v, len) = read_varint(data, pos)?;
                pos += len;
                fields.push((field_number, RawField::Varint(v)));
            }
            WireType::Fixed32 => {
                let bytes = take(data, pos, 4)?;
                pos += 4;
                fields.push((
                    field_number,
                    RawField::Fixed32(u32::from_le_bytes(bytes.try_into().unwrap())),
                ));
            }
            WireType::Fixed64 => {
                let bytes = take(data, pos, 8)?;
                pos += 8;
                fields.push((
                    field_number,
                    RawField::Fixed64(u64::from_le_bytes(bytes.try_into().unwrap())),
                ));
            }
            WireType::LengthDelimited => {
                let (len, len_sz) = read_varint(data, pos)?;
                pos += len_sz;
                let bytes = take(data, pos, len as usize)?;
                pos += len as usize;
                fields.push((field_number, RawField::Bytes(bytes.to_vec())));
            }
        }
    }
    Ok(fields)
}

fn take(data: &[u8], pos: usize, n: usize) -> Result<&[u8]> {
    data.get(pos..pos + n)
        .ok_or_else(|| NodeBridgeError::Parse("truncated field payload".into()))
}

fn read_varint(data: &[u8], start: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut pos = start;
    loop {
        let byte = *data
            .get(pos)
            .ok_or_else(|| NodeBridgeError::Parse("truncated varint".into()))?;
        pos += 1;
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, pos - start));
        }
        shift += 7;
        if shift >= 64 {
            return Err(NodeBridgeError::Parse("varint too long".into()));
        }
    }
}

impl RawField {
    pub fn as_varint(&self) -> Option<u64> {
        match self {
            RawField::Varint(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        self.as_varint().map(|v| v != 0)
    }
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            RawField::Fixed32(bits) => Some(f32::from_bits(*bits)),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawField::Fixed64(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RawField::Bytes(b) => Some(b),
            _ => None,
        }
    }
    pub fn as_string(&self) -> Option<Result<String>> {
        self.as_bytes().map(|b| {
            String::from_utf8(b.to_vec())
                .map_err(|e| NodeBridgeError::Parse(format!("invalid utf-8: {e}")))
        })
    }
}

/// Encodes a varint length prefix followed by `payload` — the framing used
/// to delimit one RPC message on a byte stream (distinct from the
/// length-delimited *field* wire type, though it reuses the same varint
/// routine).
pub fn frame_message(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 5);
    write_varint(&mut out, payload.len() as u64);
    out.extend_from_slice(payload);
    out
}
