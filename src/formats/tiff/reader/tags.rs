//! Directory record decoding

use crate::error::{ParseError, Result};
use crate::io::{ByteOrder, DataSource};
use crate::formats::tiff::entry::{Entry, EntryOrigin, ValueState, INLINE_SIZE, RECORD_SIZE};
use crate::formats::tiff::value::{self, FieldType};

/// One 12-byte record as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    pub tag: u16,
    pub type_code: u16,
    pub count: u32,
    pub value_field: [u8; 4],
    /// Offset of the record, relative to the TIFF header
    pub record_offset: u32,
}

impl RawRecord {
    pub fn parse(chunk: &[u8], record_offset: u32, order: ByteOrder) -> Result<Self> {
        let tag = order.get_word(chunk, 0)?;
        let type_code = order.get_word(chunk, 2)?;
        let count = order.get_dword(chunk, 4)?;
        let field = chunk.get(8..RECORD_SIZE).ok_or(ParseError::Truncated {
            offset: record_offset as u64,
            needed: RECORD_SIZE as u64,
        })?;
        let mut value_field = [0u8; 4];
        value_field.copy_from_slice(field);
        Ok(Self { tag, type_code, count, value_field, record_offset })
    }

    /// The value field read as an offset
    pub fn value_offset(&self, order: ByteOrder) -> u32 {
        order.decode_dword(self.value_field)
    }
}

/// Turns records into entries, reading data-area values through a [`DataSource`]
pub struct TagReader<'a> {
    source: &'a mut dyn DataSource,
    order: ByteOrder,
    eager_limit: usize,
}

impl<'a> TagReader<'a> {
    pub fn new(source: &'a mut dyn DataSource, order: ByteOrder, eager_limit: usize) -> Self {
        Self { source, order, eager_limit }
    }

    /// Decodes `record`, or `None` for an unknown field type
    ///
    /// Inline values and data-area values up to the eager limit are decoded
    /// right away; anything larger stays unresolved.
    pub fn read_entry(&mut self, record: &RawRecord) -> Result<Option<Entry>> {
        let Some(field_type) = FieldType::from_u16(record.type_code) else {
            log::warn!(
                "Skipping tag 0x{:04X}: unknown field type {}",
                record.tag,
                record.type_code
            );
            return Ok(None);
        };

        let len = field_type.byte_len(record.count).ok_or(ParseError::Truncated {
            offset: record.record_offset as u64,
            needed: u64::MAX,
        })?;

        if len <= INLINE_SIZE {
            let value = value::decode(&record.value_field, field_type, record.count, self.order)?;
            let origin = EntryOrigin {
                record_offset: record.record_offset,
                disk_count: record.count,
                data_offset: None,
            };
            return Ok(Some(Entry::from_disk(record.tag, field_type, ValueState::Resolved(value), origin)));
        }

        let offset = record.value_offset(self.order);
        let end = offset as u64 + len as u64;
        if end > self.source.len() {
            return Err(ParseError::Truncated { offset: offset as u64, needed: len as u64 }.into());
        }

        let state = if len <= self.eager_limit {
            let bytes = self.source.read_at(offset as u64, len)?;
            ValueState::Resolved(value::decode(&bytes, field_type, record.count, self.order)?)
        } else {
            ValueState::Unresolved { offset, len }
        };

        let origin = EntryOrigin {
            record_offset: record.record_offset,
            disk_count: record.count,
            data_offset: Some(offset),
        };
        Ok(Some(Entry::from_disk(record.tag, field_type, state, origin)))
    }
}
