//! Serializes a whole tree into a fresh TIFF block

use crate::error::{Error, Result};
use crate::formats::tiff::entry::{EntryOrigin, INLINE_SIZE, RECORD_SIZE};
use crate::formats::tiff::ifd::{IfdId, IfdOrigin, Payload};
use crate::formats::tiff::types::{Exif, Layout};
use crate::formats::tiff::value::{self, FieldType};
use crate::formats::tiff::{tags, TIFF_MAGIC};
use crate::io::ByteOrder;

/// Encoded TIFF block and the offsets it assigned
#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub(crate) layout: Layout,
}

enum Slot {
    Value(Vec<u8>),
    Child(IfdId),
    Thumbnail,
}

struct Record {
    tag: u16,
    field_type: FieldType,
    disk_count: u32,
    slot: Slot,
    is_entry: bool,
}

struct Encoder<'a> {
    exif: &'a Exif,
    order: ByteOrder,
    bytes: Vec<u8>,
    layout: Layout,
}

/// Lays out the header, the IFD chain, every sub-IFD and the data areas
///
/// Each IFD is followed by its own data area and then its children.
/// Values and directories start on even offsets. Every deferred value
/// must be resolved first.
pub fn encode(exif: &Exif) -> Result<Encoded> {
    let order = exif.byte_order();
    let mut encoder = Encoder {
        exif,
        order,
        bytes: Vec::with_capacity(1024),
        layout: Layout::default(),
    };

    encoder.bytes.extend_from_slice(&order.marker());
    encoder.bytes.extend_from_slice(&order.encode_word(TIFF_MAGIC));
    encoder.bytes.extend_from_slice(&[0; 4]);

    let mut next_slot = 4;
    for &id in exif.ifds() {
        let (offset, slot) = encoder.write_ifd(id)?;
        encoder.order.put_dword(&mut encoder.bytes, next_slot, offset)?;
        next_slot = slot;
    }

    log::debug!("Encoded TIFF block of {} bytes", encoder.bytes.len());
    Ok(Encoded { bytes: encoder.bytes, layout: encoder.layout })
}

impl Encoder<'_> {
    fn offset(&self) -> Result<u32> {
        u32::try_from(self.bytes.len()).map_err(|_| Error::SegmentTooLarge(self.bytes.len()))
    }

    fn align(&mut self) {
        if self.bytes.len() % 2 == 1 {
            self.bytes.push(0);
        }
    }

    fn records(&self, id: IfdId) -> Result<(Vec<Record>, Option<&'_ [u8]>)> {
        let ifd = self.exif.ifd(id)?;
        let mut records = Vec::new();

        for (kind, child) in ifd.children() {
            if let Some(tag) = kind.pointer_tag() {
                records.push(Record {
                    tag,
                    field_type: FieldType::Long,
                    disk_count: 1,
                    slot: Slot::Child(child),
                    is_entry: false,
                });
            }
        }

        let thumbnail = match ifd.thumbnail() {
            Some(Payload::Resolved(bytes)) => Some(bytes.as_slice()),
            Some(Payload::Unresolved { .. }) => {
                return Err(Error::Unsupported(format!("thumbnail of {} not loaded", ifd.kind())))
            }
            None => None,
        };
        if let Some(bytes) = thumbnail {
            records.push(Record {
                tag: tags::JPEG_INTERCHANGE_FORMAT,
                field_type: FieldType::Long,
                disk_count: 1,
                slot: Slot::Thumbnail,
                is_entry: false,
            });
            records.push(Record {
                tag: tags::JPEG_INTERCHANGE_FORMAT_LENGTH,
                field_type: FieldType::Long,
                disk_count: 1,
                slot: Slot::Value(self.order.encode_dword(bytes.len() as u32).to_vec()),
                is_entry: false,
            });
        }

        for entry in ifd.bound_entries() {
            let current = entry.value().ok_or_else(|| {
                Error::Unsupported(format!("tag 0x{:04X} in {} not loaded", entry.tag(), ifd.kind()))
            })?;
            records.push(Record {
                tag: entry.tag(),
                field_type: entry.field_type(),
                disk_count: current.disk_count(entry.field_type()),
                slot: Slot::Value(value::encode(current, entry.tag(), entry.field_type(), self.order)?),
                is_entry: true,
            });
        }

        // Structural records come first, so they win over same-tag entries
        records.sort_by_key(|r| r.tag);
        records.dedup_by_key(|r| r.tag);
        Ok((records, thumbnail))
    }

    /// Writes one IFD with its data and children; returns its offset and next-pointer slot
    fn write_ifd(&mut self, id: IfdId) -> Result<(u32, usize)> {
        let (records, thumbnail) = self.records(id)?;
        let thumbnail = thumbnail.map(<[u8]>::to_vec);
        let count = u16::try_from(records.len())
            .map_err(|_| Error::Unsupported(format!("{} records in one IFD", records.len())))?;

        self.align();
        let ifd_offset = self.offset()?;
        self.bytes.extend_from_slice(&self.order.encode_word(count));
        let table = self.bytes.len();
        let next_slot = table + records.len() * RECORD_SIZE;
        self.bytes.resize(next_slot + 4, 0);

        let mut children = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let at = table + index * RECORD_SIZE;
            let record_offset = u32::try_from(at).map_err(|_| Error::SegmentTooLarge(at))?;
            self.order.put_word(&mut self.bytes, at, record.tag)?;
            self.order.put_word(&mut self.bytes, at + 2, record.field_type.code())?;
            self.order.put_dword(&mut self.bytes, at + 4, record.disk_count)?;

            let data_offset = match &record.slot {
                Slot::Value(bytes) if bytes.len() <= INLINE_SIZE => {
                    self.bytes[at + 8..at + 8 + bytes.len()].copy_from_slice(bytes);
                    None
                }
                Slot::Value(bytes) => {
                    self.align();
                    let data = self.offset()?;
                    self.bytes.extend_from_slice(bytes);
                    self.order.put_dword(&mut self.bytes, at + 8, data)?;
                    Some(data)
                }
                Slot::Child(child) => {
                    children.push((at + 8, *child));
                    None
                }
                Slot::Thumbnail => {
                    if let Some(bytes) = &thumbnail {
                        self.align();
                        let data = self.offset()?;
                        self.bytes.extend_from_slice(bytes);
                        self.order.put_dword(&mut self.bytes, at + 8, data)?;
                    }
                    None
                }
            };

            if record.is_entry {
                let origin = EntryOrigin { record_offset, disk_count: record.disk_count, data_offset };
                self.layout.entries.push((id, record.tag, origin));
            }
        }

        self.layout.ifds.push((id, IfdOrigin { offset: ifd_offset, entry_count: count }));

        for (slot, child) in children {
            let (child_offset, _) = self.write_ifd(child)?;
            self.order.put_dword(&mut self.bytes, slot, child_offset)?;
        }

        Ok((ifd_offset, next_slot))
    }
}
