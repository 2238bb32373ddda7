//! TIFF field types and typed value encoding

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::error::{CodecError, Error, ParseError, Result};
use crate::io::ByteOrder;
use crate::types::Rational;

/// TIFF field type of an IFD entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// 8-bit unsigned
    Byte,
    /// NUL-terminated 8-bit text
    Ascii,
    /// 16-bit unsigned
    Short,
    /// 32-bit unsigned
    Long,
    /// Two LONGs: numerator, denominator
    Rational,
    /// 8-bit signed
    SByte,
    /// Opaque bytes
    Undefined,
    /// 16-bit signed
    SShort,
    /// 32-bit signed
    SLong,
    /// Two SLONGs
    SRational,
    /// 32-bit IEEE float, carried as raw bytes
    Float,
    /// 64-bit IEEE double, carried as raw bytes
    Double,
}

impl FieldType {
    /// Maps an on-disk type code
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            _ => None,
        }
    }

    /// On-disk type code
    pub fn code(self) -> u16 {
        match self {
            FieldType::Byte => 1,
            FieldType::Ascii => 2,
            FieldType::Short => 3,
            FieldType::Long => 4,
            FieldType::Rational => 5,
            FieldType::SByte => 6,
            FieldType::Undefined => 7,
            FieldType::SShort => 8,
            FieldType::SLong => 9,
            FieldType::SRational => 10,
            FieldType::Float => 11,
            FieldType::Double => 12,
        }
    }

    /// Size in bytes of one element
    pub fn element_size(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Byte => "BYTE",
            FieldType::Ascii => "ASCII",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Rational => "RATIONAL",
            FieldType::SByte => "SBYTE",
            FieldType::Undefined => "UNDEFINED",
            FieldType::SShort => "SSHORT",
            FieldType::SLong => "SLONG",
            FieldType::SRational => "SRATIONAL",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
        }
    }

    /// Whether values of this type are plain integers
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Long
                | FieldType::SByte
                | FieldType::SShort
                | FieldType::SLong
        )
    }

    fn int_range(self) -> Option<(i64, i64)> {
        match self {
            FieldType::Byte => Some((0, u8::MAX as i64)),
            FieldType::Short => Some((0, u16::MAX as i64)),
            FieldType::Long => Some((0, u32::MAX as i64)),
            FieldType::SByte => Some((i8::MIN as i64, i8::MAX as i64)),
            FieldType::SShort => Some((i16::MIN as i64, i16::MAX as i64)),
            FieldType::SLong => Some((i32::MIN as i64, i32::MAX as i64)),
            _ => None,
        }
    }

    /// Bytes occupied by `count` elements, `None` on overflow
    pub fn byte_len(self, count: u32) -> Option<usize> {
        (count as usize).checked_mul(self.element_size())
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded value of an IFD entry
///
/// The variant is tied to the entry's [`FieldType`]; see [`Value::is_compatible`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Single integer (BYTE, SHORT, LONG, SBYTE, SSHORT, SLONG)
    Int(i64),
    /// Integer array of any other length
    Ints(Vec<i64>),
    /// ASCII text without its terminator
    Text(String),
    /// RATIONAL / SRATIONAL values
    Rationals(Vec<Rational>),
    /// UNDEFINED bytes, or raw FLOAT/DOUBLE payloads
    Bytes(Vec<u8>),
}

impl Value {
    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Ints(_) => "integer array",
            Value::Text(_) => "text",
            Value::Rationals(_) => "rational",
            Value::Bytes(_) => "byte array",
        }
    }

    pub fn is_compatible(&self, field_type: FieldType) -> bool {
        match self {
            Value::Int(_) | Value::Ints(_) => field_type.is_integer(),
            Value::Text(_) => field_type == FieldType::Ascii,
            Value::Rationals(_) => {
                matches!(field_type, FieldType::Rational | FieldType::SRational)
            }
            Value::Bytes(_) => matches!(
                field_type,
                FieldType::Undefined | FieldType::Float | FieldType::Double
            ),
        }
    }

    /// Whether the record-level write path can store this value
    pub fn supports_in_place(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Ints(_))
    }

    /// Logical element count for an entry of `field_type`
    ///
    /// ASCII counts exclude the terminator.
    pub fn count(&self, field_type: FieldType) -> u32 {
        match self {
            Value::Int(_) => 1,
            Value::Ints(v) => v.len() as u32,
            Value::Text(s) => s.len() as u32,
            Value::Rationals(v) => v.len() as u32,
            Value::Bytes(b) => (b.len() / field_type.element_size()) as u32,
        }
    }

    /// Element count as written to disk (ASCII includes the terminator)
    pub fn disk_count(&self, field_type: FieldType) -> u32 {
        match self {
            Value::Text(s) => s.len() as u32 + 1,
            _ => self.count(field_type),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Ints(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<Vec<i64>> {
        match self {
            Value::Int(v) => Some(vec![*v]),
            Value::Ints(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rationals(&self) -> Option<&[Rational]> {
        match self {
            Value::Rationals(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Checks shape and integer range against `field_type`
    pub(crate) fn validate(&self, tag: u16, field_type: FieldType) -> Result<()> {
        if !self.is_compatible(field_type) {
            return Err(Error::TypeMismatch { tag, field_type, value: self.kind_name() });
        }

        if let Value::Bytes(b) = self {
            if b.len() % field_type.element_size() != 0 {
                return Err(Error::TypeMismatch { tag, field_type, value: self.kind_name() });
            }
        }
        // readers stop at the first NUL
        if let Value::Text(s) = self {
            if s.contains('\0') {
                return Err(Error::TypeMismatch { tag, field_type, value: "text with an embedded NUL" });
            }
        }

        if let Some((min, max)) = field_type.int_range() {
            let ints: &[i64] = match self {
                Value::Int(v) => std::slice::from_ref(v),
                Value::Ints(v) => v,
                _ => &[],
            };
            if let Some(&value) = ints.iter().find(|v| **v < min || **v > max) {
                return Err(CodecError::ValueOutOfRange { value, field_type }.into());
            }
        }

        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Ints(v) => {
                let parts: Vec<String> = v.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Text(s) => write!(f, "\"{s}\""),
            Value::Rationals(v) => {
                let parts: Vec<String> = v.iter().map(|r| r.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Bytes(b) if b.len() <= 16 => {
                let parts: Vec<String> = b.iter().map(|x| format!("{x:02X}")).collect();
                write!(f, "<{}>", parts.join(" "))
            }
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Encodes `value` as the on-disk bytes of a `field_type` entry
pub fn encode(value: &Value, tag: u16, field_type: FieldType, order: ByteOrder) -> Result<Vec<u8>> {
    value.validate(tag, field_type)?;

    let mut out = Vec::new();
    match value {
        Value::Int(_) | Value::Ints(_) => {
            for v in value.as_ints().unwrap_or_default() {
                match field_type.element_size() {
                    1 => out.push(v as u8),
                    2 => out.extend_from_slice(&order.encode_word(v as u16)),
                    _ => out.extend_from_slice(&order.encode_dword(v as u32)),
                }
            }
        }
        Value::Text(s) => {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        Value::Rationals(v) => {
            for r in v {
                out.extend_from_slice(&order.encode_dword(r.numerator as u32));
                out.extend_from_slice(&order.encode_dword(r.denominator as u32));
            }
        }
        Value::Bytes(b) => out.extend_from_slice(b),
    }
    Ok(out)
}

/// Decodes `disk_count` elements of `field_type` from `bytes`
pub fn decode(bytes: &[u8], field_type: FieldType, disk_count: u32, order: ByteOrder) -> Result<Value> {
    let len = field_type
        .byte_len(disk_count)
        .ok_or(ParseError::Truncated { offset: 0, needed: u64::MAX })?;
    let bytes = bytes.get(..len).ok_or(ParseError::Truncated {
        offset: 0,
        needed: len as u64,
    })?;
    let handler = order.handler();

    let value = match field_type {
        FieldType::Byte => ints(bytes.iter().map(|b| *b as i64).collect()),
        FieldType::SByte => ints(bytes.iter().map(|b| *b as i8 as i64).collect()),
        FieldType::Short => ints(
            bytes.chunks_exact(2).map(|c| handler.decode_word([c[0], c[1]]) as i64).collect(),
        ),
        FieldType::SShort => ints(
            bytes.chunks_exact(2).map(|c| handler.decode_sword([c[0], c[1]]) as i64).collect(),
        ),
        FieldType::Long => ints(
            bytes
                .chunks_exact(4)
                .map(|c| handler.decode_dword([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
        ),
        FieldType::SLong => ints(
            bytes
                .chunks_exact(4)
                .map(|c| handler.decode_sdword([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
        ),
        FieldType::Ascii => {
            let text = bytes.split(|b| *b == 0).next().unwrap_or_default();
            Value::Text(String::from_utf8_lossy(text).into_owned())
        }
        FieldType::Rational | FieldType::SRational => Value::Rationals(
            bytes
                .chunks_exact(8)
                .map(|c| {
                    let numerator = handler.decode_dword([c[0], c[1], c[2], c[3]]) as i32;
                    let denominator = handler.decode_dword([c[4], c[5], c[6], c[7]]) as i32;
                    Rational::new(numerator, denominator)
                })
                .collect(),
        ),
        FieldType::Undefined | FieldType::Float | FieldType::Double => Value::Bytes(bytes.to_vec()),
    };
    Ok(value)
}

fn ints(values: Vec<i64>) -> Value {
    if values.len() == 1 {
        Value::Int(values[0])
    } else {
        Value::Ints(values)
    }
}
