//! IFD entries: one 12-byte directory record plus its resolved value

use std::io::{Seek, Write};
use crate::error::{Error, Result};
use crate::io::ByteOrder;
use crate::types::Rational;
use super::value::{self, FieldType, Value};

/// Size of one directory record on disk
pub const RECORD_SIZE: usize = 12;

/// Bytes available inline in a record's value field
pub const INLINE_SIZE: usize = 4;

/// Where an entry's value currently lives
#[derive(Debug, Clone, PartialEq)]
pub enum ValueState {
    /// Created by a caller, no value set yet
    Unbound,
    /// Stored in the data area, not read yet
    Unresolved { offset: u32, len: usize },
    /// Decoded value
    Resolved(Value),
}

/// Edit state used by the writer to pick candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// New entry without a value; dropped on save
    Unbound,
    /// Matches the bytes on disk
    Unchanged,
    /// Set since it was read or created
    Changed,
}

/// Position of an entry in the original TIFF block
///
/// Offsets are relative to the TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOrigin {
    /// Offset of the 12-byte record
    pub record_offset: u32,
    /// Count field as stored on disk
    pub disk_count: u32,
    /// Offset of the value in the data area, `None` for inline values
    pub data_offset: Option<u32>,
}

impl EntryOrigin {
    /// Bytes the original value occupies
    pub fn allocation(&self, field_type: FieldType) -> usize {
        match self.data_offset {
            Some(_) => field_type.byte_len(self.disk_count).unwrap_or(0),
            None => INLINE_SIZE,
        }
    }
}

/// One tagged, typed value record within an IFD
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    tag: u16,
    field_type: FieldType,
    count: u32,
    value: ValueState,
    origin: Option<EntryOrigin>,
    state: EntryState,
}

impl Entry {
    /// Creates an unbound entry that does not exist on disk yet
    pub fn new(tag: u16, field_type: FieldType) -> Self {
        Self {
            tag,
            field_type,
            count: 0,
            value: ValueState::Unbound,
            origin: None,
            state: EntryState::Unbound,
        }
    }

    /// Creates a new entry holding `value`, rejecting mismatched pairs
    pub fn with_value(tag: u16, field_type: FieldType, value: Value) -> Result<Self> {
        let mut entry = Self::new(tag, field_type);
        entry.set_value(value)?;
        Ok(entry)
    }

    pub(crate) fn from_disk(
        tag: u16,
        field_type: FieldType,
        value: ValueState,
        origin: EntryOrigin,
    ) -> Self {
        let count = match (&value, field_type) {
            (ValueState::Resolved(v), FieldType::Ascii) => v.count(field_type),
            _ => origin.disk_count,
        };
        Self {
            tag,
            field_type,
            count,
            value,
            origin: Some(origin),
            state: EntryState::Unchanged,
        }
    }

    pub fn tag(&self) -> u16 {
        self.tag
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Number of values (ASCII: string length without terminator)
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Resolved value, `None` while unbound or not loaded yet
    pub fn value(&self) -> Option<&Value> {
        match &self.value {
            ValueState::Resolved(v) => Some(v),
            _ => None,
        }
    }

    pub fn value_state(&self) -> &ValueState {
        &self.value
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.value, ValueState::Resolved(_))
    }

    /// True if this entry was not present in the original file
    pub fn is_new_entry(&self) -> bool {
        self.origin.is_none()
    }

    pub fn origin(&self) -> Option<&EntryOrigin> {
        self.origin.as_ref()
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn is_changed(&self) -> bool {
        self.state == EntryState::Changed
    }

    pub fn set_int(&mut self, value: i64) -> Result<()> {
        self.assign(Value::Int(value))
    }

    pub fn set_ints(&mut self, values: Vec<i64>) -> Result<()> {
        self.assign(Value::Ints(values))
    }

    /// Sets ASCII text; the terminator is added when written
    pub fn set_text(&mut self, value: impl Into<String>) -> Result<()> {
        self.assign(Value::Text(value.into()))
    }

    pub fn set_rational(&mut self, value: Rational) -> Result<()> {
        self.assign(Value::Rationals(vec![value]))
    }

    pub fn set_rationals(&mut self, values: Vec<Rational>) -> Result<()> {
        self.assign(Value::Rationals(values))
    }

    /// Sets UNDEFINED bytes
    pub fn set_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
        if self.field_type != FieldType::Undefined {
            return Err(Error::TypeMismatch {
                tag: self.tag,
                field_type: self.field_type,
                value: "byte array",
            });
        }
        self.assign(Value::Bytes(bytes))
    }

    /// Sets any value whose shape matches the entry's type
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        self.assign(value)
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        value.validate(self.tag, self.field_type)?;
        self.count = value.count(self.field_type);
        self.value = ValueState::Resolved(value);
        self.state = EntryState::Changed;
        Ok(())
    }

    /// Stores a lazily loaded value without marking the entry changed
    pub(crate) fn resolve(&mut self, value: Value) {
        if matches!(self.value, ValueState::Unresolved { .. }) {
            self.count = value.count(self.field_type);
            self.value = ValueState::Resolved(value);
        }
    }

    /// Takes over the slot of the on-disk entry this one replaces
    pub(crate) fn adopt_origin(&mut self, origin: EntryOrigin) {
        self.origin = Some(origin);
    }

    /// Records the on-disk position after a successful save
    pub(crate) fn persisted(&mut self, origin: EntryOrigin) {
        self.origin = Some(origin);
        if self.state == EntryState::Changed {
            self.state = EntryState::Unchanged;
        }
    }

    /// Count field as it will be written
    pub fn disk_count(&self) -> u32 {
        match &self.value {
            ValueState::Resolved(v) => v.disk_count(self.field_type),
            _ => self.origin.map_or(self.count, |o| o.disk_count),
        }
    }

    /// Bytes the value occupies when encoded
    pub fn encoded_len(&self) -> usize {
        self.field_type.byte_len(self.disk_count()).unwrap_or(usize::MAX)
    }

    pub fn fits_inline(&self) -> bool {
        self.encoded_len() <= INLINE_SIZE
    }

    /// Writes type, count and inline value at the current position
    ///
    /// The writer must be positioned right after the record's tag field;
    /// the tag itself is not rewritten. Only fixed-width integer values
    /// that fit in the 4-byte slot are supported.
    pub fn update_value_on_disk<W: Write + Seek>(&self, file: &mut W, order: ByteOrder) -> Result<()> {
        let value = match &self.value {
            ValueState::Resolved(v) if v.supports_in_place() && self.field_type.is_integer() => v,
            _ => {
                return Err(Error::UnsupportedTypeForInPlaceUpdate {
                    tag: self.tag,
                    field_type: self.field_type,
                })
            }
        };

        let bytes = value::encode(value, self.tag, self.field_type, order)?;
        if bytes.len() > INLINE_SIZE {
            return Err(Error::UnsupportedTypeForInPlaceUpdate {
                tag: self.tag,
                field_type: self.field_type,
            });
        }

        let record = record_tail(order, self.field_type, self.disk_count(), &bytes)?;
        file.write_all(&record)?;
        Ok(())
    }
}

/// Builds bytes 2..12 of a record: type, count, and the 4-byte value field
pub(crate) fn record_tail(
    order: ByteOrder,
    field_type: FieldType,
    disk_count: u32,
    value_field: &[u8],
) -> Result<[u8; RECORD_SIZE - 2]> {
    let mut tail = [0u8; RECORD_SIZE - 2];
    order.put_word(&mut tail, 0, field_type.code())?;
    order.put_dword(&mut tail, 2, disk_count)?;
    let slot = tail
        .get_mut(6..6 + value_field.len())
        .ok_or(crate::error::CodecError::BufferTooSmall {
            position: 6,
            needed: value_field.len(),
            available: INLINE_SIZE,
        })?;
    slot.copy_from_slice(value_field);
    Ok(tail)
}
