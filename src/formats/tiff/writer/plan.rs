//! Choosing between in-place patches and full regeneration

use std::fmt;
use crate::error::Result;
use crate::formats::tiff::entry::{record_tail, EntryOrigin, EntryState, INLINE_SIZE};
use crate::formats::tiff::ifd::IfdKind;
use crate::formats::tiff::types::{Exif, Layout};
use crate::formats::tiff::value;

/// Bytes to overwrite at an offset relative to the TIFF header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub offset: u32,
    pub bytes: Vec<u8>,
}

/// Every region a patch save rewrites, plus the resulting entry origins
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    pub patches: Vec<Patch>,
    pub(crate) layout: Layout,
}

/// Why a save has to rebuild the whole EXIF block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateReason {
    /// Directory added since the tree was read
    NewDirectory(IfdKind),
    /// Entry or sub-directory removed from this directory
    RemovedStructure(IfdKind),
    /// Entry not present in the original file
    NewEntry { kind: IfdKind, tag: u16 },
    /// Value no longer fits its original slot
    Grown { kind: IfdKind, tag: u16, required: usize, available: usize },
    /// Tree was built in memory
    NoOriginalLayout,
    /// In-place patching disabled
    Forced,
}

impl fmt::Display for RegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegenerateReason::NewDirectory(kind) => write!(f, "new {kind} directory"),
            RegenerateReason::RemovedStructure(kind) => write!(f, "structure removed from {kind}"),
            RegenerateReason::NewEntry { kind, tag } => write!(f, "new entry 0x{tag:04X} in {kind}"),
            RegenerateReason::Grown { kind, tag, required, available } => write!(
                f,
                "0x{tag:04X} in {kind} needs {required} bytes, {available} available"
            ),
            RegenerateReason::NoOriginalLayout => f.write_str("no original layout"),
            RegenerateReason::Forced => f.write_str("in-place updates disabled"),
        }
    }
}

/// Outcome of [`plan`]
#[derive(Debug, Clone)]
pub enum Strategy {
    Unchanged,
    Patch(PatchSet),
    Regenerate(RegenerateReason),
}

/// Decides how the changes in `exif` reach disk
///
/// A changed entry is patched when its encoding fits 4 bytes (record only)
/// or fits the data-area region it was read from (data area plus record).
/// Anything else, or any structural change, regenerates.
pub fn plan(exif: &Exif, prefer_in_place: bool) -> Result<Strategy> {
    if !exif.has_changes() {
        return Ok(Strategy::Unchanged);
    }
    if !prefer_in_place {
        return Ok(Strategy::Regenerate(RegenerateReason::Forced));
    }
    if exif.location().is_none() {
        return Ok(Strategy::Regenerate(RegenerateReason::NoOriginalLayout));
    }

    let order = exif.byte_order();
    let mut set = PatchSet::default();

    for id in exif.traverse() {
        let ifd = exif.ifd(id)?;
        let kind = ifd.kind();
        if ifd.is_new() {
            return Ok(Strategy::Regenerate(RegenerateReason::NewDirectory(kind)));
        }
        if ifd.structure_changed() {
            return Ok(Strategy::Regenerate(RegenerateReason::RemovedStructure(kind)));
        }

        for entry in ifd.entries().filter(|e| e.state() == EntryState::Changed) {
            let tag = entry.tag();
            let Some(origin) = entry.origin().copied() else {
                return Ok(Strategy::Regenerate(RegenerateReason::NewEntry { kind, tag }));
            };
            let Some(current) = entry.value() else { continue };

            let field_type = entry.field_type();
            let bytes = value::encode(current, tag, field_type, order)?;
            let disk_count = current.disk_count(field_type);
            let available = origin.allocation(field_type);

            let new_origin = if bytes.len() <= INLINE_SIZE {
                let tail = record_tail(order, field_type, disk_count, &bytes)?;
                set.patches.push(Patch { offset: origin.record_offset + 2, bytes: tail.to_vec() });
                EntryOrigin { record_offset: origin.record_offset, disk_count, data_offset: None }
            } else if let Some(data_offset) = origin.data_offset.filter(|_| bytes.len() <= available) {
                let mut region = bytes;
                region.resize(available, 0);
                set.patches.push(Patch { offset: data_offset, bytes: region });

                let tail = record_tail(order, field_type, disk_count, &order.encode_dword(data_offset))?;
                set.patches.push(Patch { offset: origin.record_offset + 2, bytes: tail.to_vec() });
                EntryOrigin { record_offset: origin.record_offset, disk_count, data_offset: Some(data_offset) }
            } else {
                return Ok(Strategy::Regenerate(RegenerateReason::Grown {
                    kind,
                    tag,
                    required: bytes.len(),
                    available,
                }));
            };

            log::debug!("Patching 0x{tag:04X} in {kind} (count {disk_count})");
            set.layout.entries.push((id, tag, new_origin));
        }
    }

    if set.patches.is_empty() {
        return Ok(Strategy::Unchanged);
    }
    Ok(Strategy::Patch(set))
}
