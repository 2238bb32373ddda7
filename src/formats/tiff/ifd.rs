//! Image File Directory (IFD) structures

use std::collections::BTreeMap;
use std::fmt;
use serde::Serialize;
use crate::error::{Error, Result};
use crate::types::Rational;
use super::entry::{Entry, EntryState};
use super::tags;

/// Semantic identity of a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IfdKind {
    /// Top-level image directory; 0 is the main image, 1 the thumbnail
    Image(u16),
    /// Exif private directory
    Exif,
    /// GPS directory
    Gps,
    /// Interoperability directory (under Exif)
    Interop,
}

impl IfdKind {
    /// Tag of the parent entry pointing at a directory of this kind
    pub fn pointer_tag(self) -> Option<u16> {
        match self {
            IfdKind::Image(_) => None,
            IfdKind::Exif => Some(tags::EXIF_IFD_POINTER),
            IfdKind::Gps => Some(tags::GPS_IFD_POINTER),
            IfdKind::Interop => Some(tags::INTEROP_IFD_POINTER),
        }
    }

    /// Maps a pointer tag found in a `parent` directory to the child kind
    pub fn from_pointer_tag(parent: IfdKind, tag: u16) -> Option<IfdKind> {
        match (parent, tag) {
            (IfdKind::Image(_), tags::EXIF_IFD_POINTER) => Some(IfdKind::Exif),
            (IfdKind::Image(_), tags::GPS_IFD_POINTER) => Some(IfdKind::Gps),
            (IfdKind::Exif, tags::INTEROP_IFD_POINTER) => Some(IfdKind::Interop),
            _ => None,
        }
    }
}

impl fmt::Display for IfdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfdKind::Image(n) => write!(f, "IFD{n}"),
            IfdKind::Exif => f.write_str("Exif"),
            IfdKind::Gps => f.write_str("GPS"),
            IfdKind::Interop => f.write_str("Interop"),
        }
    }
}

/// Index of a directory in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IfdId(pub(crate) usize);

impl IfdId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a directory was found in the original TIFF block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdOrigin {
    /// Offset of the entry count, relative to the TIFF header
    pub offset: u32,
    /// Number of records written at that offset
    pub entry_count: u16,
}

/// Opaque payload referenced by a directory, such as a JPEG thumbnail
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Unresolved { offset: u32, len: usize },
    Resolved(Vec<u8>),
}

/// Represents an Image File Directory
#[derive(Debug, Clone)]
pub struct Ifd {
    pub(crate) kind: IfdKind,
    pub(crate) entries: BTreeMap<u16, Entry>,
    pub(crate) children: BTreeMap<IfdKind, IfdId>,
    pub(crate) origin: Option<IfdOrigin>,
    pub(crate) thumbnail: Option<Payload>,
    pub(crate) structure_changed: bool,
}

impl Ifd {
    /// Creates an empty directory not yet attached to any tree
    pub fn new(kind: IfdKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            origin: None,
            thumbnail: None,
            structure_changed: false,
        }
    }

    pub fn kind(&self) -> IfdKind {
        self.kind
    }

    /// Original position, `None` for directories added in memory
    pub fn origin(&self) -> Option<&IfdOrigin> {
        self.origin.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.origin.is_none()
    }

    /// Entries in ascending tag order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn entry(&self, tag: u16) -> Option<&Entry> {
        self.entries.get(&tag)
    }

    pub fn entry_mut(&mut self, tag: u16) -> Option<&mut Entry> {
        self.entries.get_mut(&tag)
    }

    /// Returns number of entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Child directory of `kind`
    pub fn sub_ifd(&self, kind: IfdKind) -> Option<IfdId> {
        self.children.get(&kind).copied()
    }

    /// Child directories in on-disk pointer order
    pub fn children(&self) -> impl Iterator<Item = (IfdKind, IfdId)> + '_ {
        self.children.iter().map(|(k, id)| (*k, *id))
    }

    pub fn thumbnail(&self) -> Option<&Payload> {
        self.thumbnail.as_ref()
    }

    /// Inserts or replaces the entry for `tag`
    ///
    /// Only slot index 0 is addressable. Replacing an on-disk entry with a
    /// bound entry of the same type keeps the original slot for patching.
    pub fn set_entry(&mut self, tag: u16, index: usize, mut entry: Entry) -> Result<()> {
        if index != 0 {
            return Err(Error::Unsupported(format!(
                "slot index {index} for tag 0x{tag:04X}"
            )));
        }
        if entry.tag() != tag {
            return Err(Error::TagMismatch { expected: tag, found: entry.tag() });
        }

        if let Some(previous) = self.entries.get(&tag) {
            match previous.origin() {
                Some(origin)
                    if entry.is_new_entry()
                        && entry.field_type() == previous.field_type()
                        && entry.state() == EntryState::Changed =>
                {
                    entry.adopt_origin(*origin);
                }
                Some(_) => self.structure_changed = true,
                None => {}
            }
        }

        self.entries.insert(tag, entry);
        Ok(())
    }

    /// Entry for `tag`, optionally creating an unbound one
    ///
    /// New entries get their type from the tag dictionary of this directory
    /// kind and stay unbound until a value is set.
    pub fn get_tag_value(&mut self, tag: u16, create_if_absent: bool) -> Result<Option<&mut Entry>> {
        if !self.entries.contains_key(&tag) {
            if !create_if_absent {
                return Ok(None);
            }
            let field_type = tags::default_field_type(self.kind, tag).ok_or(Error::UnknownTag(tag))?;
            self.entries.insert(tag, Entry::new(tag, field_type));
        }
        Ok(self.entries.get_mut(&tag))
    }

    /// Removes the entry for `tag`
    pub fn remove_entry(&mut self, tag: u16) -> Option<Entry> {
        let removed = self.entries.remove(&tag)?;
        if !removed.is_new_entry() {
            self.structure_changed = true;
        }
        Some(removed)
    }

    /// Single integer value of `tag`
    pub fn int(&self, tag: u16) -> Option<i64> {
        self.entry(tag)?.value()?.as_int()
    }

    pub fn text(&self, tag: u16) -> Option<&str> {
        self.entry(tag)?.value()?.as_text()
    }

    pub fn rationals(&self, tag: u16) -> Option<&[Rational]> {
        self.entry(tag)?.value()?.as_rationals()
    }

    pub fn bytes(&self, tag: u16) -> Option<&[u8]> {
        self.entry(tag)?.value()?.as_bytes()
    }

    /// Whether saving this directory needs more than in-place patches
    pub fn structure_changed(&self) -> bool {
        self.structure_changed
    }

    /// Entries that will be written, dropping ones never given a value
    pub(crate) fn bound_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values().filter(|e| e.state() != EntryState::Unbound)
    }
}
