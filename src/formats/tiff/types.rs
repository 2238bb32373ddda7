//! EXIF directory tree

use std::fmt;
use serde::Serialize;
use crate::error::{Error, Result};
use crate::io::{ByteOrder, DataSource};
use super::entry::{EntryOrigin, ValueState};
use super::ifd::{Ifd, IfdId, IfdKind, IfdOrigin, Payload};
use super::tags;
use super::value::{self, FieldType, Value};

/// Container the TIFF block was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Container {
    /// JPEG APP1 segment; offsets are absolute and cover marker and length
    Jpeg { segment_start: u64, segment_len: u64 },
    /// Bare TIFF stream
    Tiff,
}

/// Position of the TIFF block within its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TiffLocation {
    pub container: Container,
    /// Absolute offset of the TIFF header
    pub tiff_base: u64,
    /// Bytes of the TIFF block
    pub tiff_len: u64,
}

/// Offsets assigned to a tree by the encoder
#[derive(Debug, Clone, Default)]
pub(crate) struct Layout {
    pub ifds: Vec<(IfdId, IfdOrigin)>,
    pub entries: Vec<(IfdId, u16, EntryOrigin)>,
}

/// Root of a parsed or synthesized EXIF tree
///
/// Owns every directory in an arena; parent/child links are [`IfdId`]s.
/// The byte order applies to the whole tree.
pub struct Exif {
    pub(crate) byte_order: ByteOrder,
    pub(crate) arena: Vec<Ifd>,
    pub(crate) chain: Vec<IfdId>,
    pub(crate) source: Option<Box<dyn DataSource>>,
    pub(crate) location: Option<TiffLocation>,
}

impl Exif {
    /// Creates an in-memory tree holding one empty main IFD
    pub fn new(byte_order: ByteOrder) -> Self {
        let mut exif = Self::empty(byte_order);
        let main = exif.alloc(Ifd::new(IfdKind::Image(0)));
        exif.chain.push(main);
        exif
    }

    pub(crate) fn empty(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            arena: Vec::new(),
            chain: Vec::new(),
            source: None,
            location: None,
        }
    }

    pub(crate) fn alloc(&mut self, ifd: Ifd) -> IfdId {
        self.arena.push(ifd);
        IfdId(self.arena.len() - 1)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Where the tree was read from, `None` for in-memory trees
    pub fn location(&self) -> Option<&TiffLocation> {
        self.location.as_ref()
    }

    /// Top-level IFD chain; index 0 is the main image
    pub fn ifds(&self) -> &[IfdId] {
        &self.chain
    }

    pub fn main_ifd(&self) -> Option<IfdId> {
        self.chain.first().copied()
    }

    pub fn ifd(&self, id: IfdId) -> Result<&Ifd> {
        self.arena.get(id.0).ok_or(Error::UnknownDirectory(id))
    }

    pub fn ifd_mut(&mut self, id: IfdId) -> Result<&mut Ifd> {
        self.arena.get_mut(id.0).ok_or(Error::UnknownDirectory(id))
    }

    /// Child of `parent` with the given kind
    pub fn get_ifd(&self, parent: IfdId, kind: IfdKind) -> Option<IfdId> {
        self.arena.get(parent.0)?.sub_ifd(kind)
    }

    /// Attaches `ifd` below `parent`
    pub fn add_ifd(&mut self, parent: IfdId, ifd: Ifd) -> Result<IfdId> {
        let kind = ifd.kind();
        let parent_kind = self.ifd(parent)?.kind();
        let allowed = match kind {
            IfdKind::Exif | IfdKind::Gps => matches!(parent_kind, IfdKind::Image(_)),
            IfdKind::Interop => parent_kind == IfdKind::Exif,
            IfdKind::Image(_) => false,
        };
        if !allowed {
            return Err(Error::Unsupported(format!("{kind} directory below {parent_kind}")));
        }
        if self.ifd(parent)?.sub_ifd(kind).is_some() {
            return Err(Error::DuplicateDirectory(kind));
        }

        let id = self.alloc(ifd);
        self.ifd_mut(parent)?.children.insert(kind, id);
        log::debug!("Attached {kind} directory below {parent_kind}");
        Ok(id)
    }

    /// Appends a top-level IFD to the chain
    pub fn push_ifd(&mut self) -> IfdId {
        let kind = IfdKind::Image(self.chain.len() as u16);
        let id = self.alloc(Ifd::new(kind));
        self.chain.push(id);
        id
    }

    /// Detaches the `kind` child of `parent`
    ///
    /// The directory stays in the arena but is no longer reachable or written.
    pub fn remove_ifd(&mut self, parent: IfdId, kind: IfdKind) -> Result<Option<IfdId>> {
        let ifd = self.ifd_mut(parent)?;
        let removed = ifd.children.remove(&kind);
        if removed.is_some() {
            ifd.structure_changed = true;
        }
        Ok(removed)
    }

    /// Reachable directories, depth-first pre-order
    pub fn traverse(&self) -> Vec<IfdId> {
        let mut order = Vec::new();
        let mut stack: Vec<IfdId> = self.chain.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(ifd) = self.arena.get(id.0) {
                stack.extend(ifd.children.values().rev().copied());
            }
        }
        order
    }

    /// First reachable directory of `kind`
    pub fn find_ifd(&self, kind: IfdKind) -> Option<IfdId> {
        self.traverse()
            .into_iter()
            .find(|id| self.arena.get(id.0).is_some_and(|ifd| ifd.kind() == kind))
    }

    /// GPS directory of the main image
    pub fn gps_ifd(&self) -> Option<IfdId> {
        self.get_ifd(self.main_ifd()?, IfdKind::Gps)
    }

    /// Value of `tag` in `id`, loading it from the source if deferred
    pub fn resolve(&mut self, id: IfdId, tag: u16) -> Result<Option<&Value>> {
        let order = self.byte_order;
        let ifd = self.arena.get_mut(id.0).ok_or(Error::UnknownDirectory(id))?;
        let Some(entry) = ifd.entries.get_mut(&tag) else {
            return Ok(None);
        };

        if let ValueState::Unresolved { offset, len } = *entry.value_state() {
            let source = self
                .source
                .as_mut()
                .ok_or_else(|| Error::Unsupported("deferred value without a data source".into()))?;
            let bytes = source.read_at(offset as u64, len)?;
            let decoded = value::decode(&bytes, entry.field_type(), entry.disk_count(), order)?;
            entry.resolve(decoded);
        }
        Ok(entry.value())
    }

    /// Thumbnail bytes stored with `id`, loading them if deferred
    pub fn thumbnail(&mut self, id: IfdId) -> Result<Option<&[u8]>> {
        let ifd = self.arena.get_mut(id.0).ok_or(Error::UnknownDirectory(id))?;
        if let Some(Payload::Unresolved { offset, len }) = ifd.thumbnail {
            let source = self
                .source
                .as_mut()
                .ok_or_else(|| Error::Unsupported("deferred thumbnail without a data source".into()))?;
            ifd.thumbnail = Some(Payload::Resolved(source.read_at(offset as u64, len)?));
        }
        Ok(match &ifd.thumbnail {
            Some(Payload::Resolved(bytes)) => Some(bytes),
            _ => None,
        })
    }

    /// Loads every deferred value and releases the data source
    pub fn materialize(&mut self) -> Result<()> {
        if self.source.is_none() {
            return Ok(());
        }
        for index in 0..self.arena.len() {
            let id = IfdId(index);
            let pending: Vec<u16> = self.arena[index]
                .entries
                .values()
                .filter(|e| matches!(e.value_state(), ValueState::Unresolved { .. }))
                .map(|e| e.tag())
                .collect();
            for tag in pending {
                self.resolve(id, tag)?;
            }
            self.thumbnail(id)?;
        }
        self.source = None;
        log::debug!("Materialized {} directories", self.arena.len());
        Ok(())
    }

    /// Whether a deferred value still needs the data source
    pub fn is_lazy(&self) -> bool {
        self.source.is_some()
    }

    /// Whether any reachable directory or entry differs from the original layout
    pub fn has_changes(&self) -> bool {
        self.traverse().into_iter().filter_map(|id| self.arena.get(id.0)).any(|ifd| {
            ifd.is_new() || ifd.structure_changed || ifd.entries().any(|e| e.is_changed())
        })
    }

    /// Encodes the whole tree as a standalone TIFF block
    pub fn to_tiff_bytes(&mut self) -> Result<Vec<u8>> {
        self.materialize()?;
        Ok(crate::formats::tiff::writer::encoder::encode(self)?.bytes)
    }

    /// Records offsets written by a save
    pub(crate) fn rebase(&mut self, layout: &Layout, location: Option<TiffLocation>) {
        for (id, origin) in &layout.ifds {
            if let Some(ifd) = self.arena.get_mut(id.0) {
                ifd.origin = Some(*origin);
                ifd.structure_changed = false;
            }
        }
        for (id, tag, origin) in &layout.entries {
            if let Some(entry) = self.arena.get_mut(id.0).and_then(|ifd| ifd.entries.get_mut(tag)) {
                entry.persisted(*origin);
            }
        }
        if location.is_some() {
            self.location = location;
        }
    }

    /// Serializable summary of every reachable directory
    pub fn report(&self) -> ExifReport {
        let directories = self
            .traverse()
            .into_iter()
            .filter_map(|id| self.arena.get(id.0))
            .map(|ifd| DirectoryReport {
                kind: ifd.kind(),
                name: ifd.kind().to_string(),
                offset: ifd.origin().map(|o| o.offset),
                entries: ifd
                    .entries()
                    .map(|e| EntryReport {
                        tag: e.tag(),
                        name: tags::tag_name(ifd.kind(), e.tag()),
                        field_type: e.field_type(),
                        count: e.count(),
                        value: e.value().cloned(),
                    })
                    .collect(),
                thumbnail_len: match ifd.thumbnail() {
                    Some(Payload::Resolved(b)) => Some(b.len()),
                    Some(Payload::Unresolved { len, .. }) => Some(*len),
                    None => None,
                },
            })
            .collect();

        ExifReport {
            byte_order: self.byte_order,
            location: self.location,
            directories,
        }
    }
}

impl fmt::Debug for Exif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exif")
            .field("byte_order", &self.byte_order)
            .field("chain", &self.chain)
            .field("arena", &self.arena)
            .field("lazy", &self.source.is_some())
            .field("location", &self.location)
            .finish()
    }
}

impl fmt::Display for Exif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EXIF Information:")?;
        let order = match self.byte_order {
            ByteOrder::LittleEndian => "little-endian (II)",
            ByteOrder::BigEndian => "big-endian (MM)",
        };
        writeln!(f, "  Byte order: {order}")?;
        writeln!(f, "  Number of IFDs: {}", self.chain.len())?;

        for id in self.traverse() {
            let Some(ifd) = self.arena.get(id.0) else { continue };
            write!(f, "\n{}", ifd.kind())?;
            if let Some(origin) = ifd.origin() {
                write!(f, " (offset {})", origin.offset)?;
            }
            writeln!(f, ":")?;

            for entry in ifd.entries() {
                let value = match entry.value_state() {
                    ValueState::Resolved(v) => v.to_string(),
                    ValueState::Unresolved { len, .. } => format!("<{len} bytes, not loaded>"),
                    ValueState::Unbound => "<unset>".to_string(),
                };
                writeln!(
                    f,
                    "  0x{:04X} {:<28} {:<9} {}",
                    entry.tag(),
                    tags::tag_name(ifd.kind(), entry.tag()),
                    entry.field_type(),
                    value
                )?;
            }
            match ifd.thumbnail() {
                Some(Payload::Resolved(b)) => writeln!(f, "  Thumbnail: {} bytes", b.len())?,
                Some(Payload::Unresolved { len, .. }) => writeln!(f, "  Thumbnail: {len} bytes")?,
                None => {}
            }
        }

        Ok(())
    }
}

/// JSON-friendly view of a tree
#[derive(Debug, Clone, Serialize)]
pub struct ExifReport {
    pub byte_order: ByteOrder,
    pub location: Option<TiffLocation>,
    pub directories: Vec<DirectoryReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryReport {
    pub kind: IfdKind,
    pub name: String,
    pub offset: Option<u32>,
    pub entries: Vec<EntryReport>,
    pub thumbnail_len: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub tag: u16,
    pub name: &'static str,
    pub field_type: FieldType,
    pub count: u32,
    pub value: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadOptions;
    use crate::formats::tiff::entry::Entry;
    use crate::formats::tiff::fixtures;
    use crate::types::Rational;

    fn gps_ifd() -> Ifd {
        let mut ifd = Ifd::new(IfdKind::Gps);
        let entry = Entry::with_value(tags::GPS_LATITUDE_REF, FieldType::Ascii, Value::Text("N".into())).unwrap();
        ifd.set_entry(tags::GPS_LATITUDE_REF, 0, entry).unwrap();
        ifd
    }

    #[test]
    fn test_new_tree_has_main_ifd() {
        let exif = Exif::new(ByteOrder::BigEndian);
        assert_eq!(exif.ifds().len(), 1);
        let main = exif.main_ifd().unwrap();
        assert_eq!(exif.ifd(main).unwrap().kind(), IfdKind::Image(0));
        assert!(exif.location().is_none());
        assert!(exif.has_changes());
    }

    #[test]
    fn test_add_and_get_ifd() {
        let mut exif = Exif::new(ByteOrder::LittleEndian);
        let main = exif.main_ifd().unwrap();
        assert!(exif.get_ifd(main, IfdKind::Gps).is_none());

        let gps = exif.add_ifd(main, gps_ifd()).unwrap();
        assert_eq!(exif.get_ifd(main, IfdKind::Gps), Some(gps));
        assert_eq!(exif.gps_ifd(), Some(gps));
        assert_eq!(exif.ifd(gps).unwrap().text(tags::GPS_LATITUDE_REF), Some("N"));
    }

    #[test]
    fn test_duplicate_directory() {
        let mut exif = Exif::new(ByteOrder::LittleEndian);
        let main = exif.main_ifd().unwrap();
        exif.add_ifd(main, gps_ifd()).unwrap();
        let err = exif.add_ifd(main, Ifd::new(IfdKind::Gps)).unwrap_err();
        assert!(matches!(err, Error::DuplicateDirectory(IfdKind::Gps)));
    }

    #[test]
    fn test_interop_belongs_under_exif() {
        let mut exif = Exif::new(ByteOrder::LittleEndian);
        let main = exif.main_ifd().unwrap();
        assert!(matches!(
            exif.add_ifd(main, Ifd::new(IfdKind::Interop)),
            Err(Error::Unsupported(_))
        ));
        let sub = exif.add_ifd(main, Ifd::new(IfdKind::Exif)).unwrap();
        assert!(exif.add_ifd(sub, Ifd::new(IfdKind::Interop)).is_ok());
    }

    #[test]
    fn test_unknown_directory() {
        let exif = Exif::new(ByteOrder::LittleEndian);
        assert!(matches!(exif.ifd(IfdId(9)), Err(Error::UnknownDirectory(_))));
    }

    #[test]
    fn test_traverse_is_preorder() {
        let mut exif = Exif::new(ByteOrder::LittleEndian);
        let main = exif.main_ifd().unwrap();
        let sub = exif.add_ifd(main, Ifd::new(IfdKind::Exif)).unwrap();
        let interop = exif.add_ifd(sub, Ifd::new(IfdKind::Interop)).unwrap();
        let gps = exif.add_ifd(main, Ifd::new(IfdKind::Gps)).unwrap();
        let thumb = exif.push_ifd();

        assert_eq!(exif.traverse(), vec![main, sub, interop, gps, thumb]);
        assert_eq!(exif.find_ifd(IfdKind::Interop), Some(interop));
        assert_eq!(exif.find_ifd(IfdKind::Image(1)), Some(thumb));
    }

    #[test]
    fn test_remove_ifd_detaches() {
        let mut exif = Exif::new(ByteOrder::LittleEndian);
        let main = exif.main_ifd().unwrap();
        let gps = exif.add_ifd(main, gps_ifd()).unwrap();
        assert_eq!(exif.remove_ifd(main, IfdKind::Gps).unwrap(), Some(gps));
        assert!(exif.gps_ifd().is_none());
        assert!(!exif.traverse().contains(&gps));
        assert!(exif.ifd(main).unwrap().structure_changed());
        assert_eq!(exif.remove_ifd(main, IfdKind::Gps).unwrap(), None);
    }

    #[test]
    fn test_lazy_values_resolve_on_demand() {
        let bytes = fixtures::sample_tiff(ByteOrder::LittleEndian);
        let mut exif = crate::read_bytes(&bytes, &Default::default()).unwrap().unwrap();
        let main = exif.main_ifd().unwrap();
        assert!(exif.is_lazy());
        assert!(exif.ifd(main).unwrap().entry(tags::X_RESOLUTION).unwrap().value().is_none());

        let value = exif.resolve(main, tags::X_RESOLUTION).unwrap().cloned();
        assert_eq!(value, Some(Value::Rationals(vec![Rational::new(72, 1)])));
        assert!(!exif.ifd(main).unwrap().entry(tags::X_RESOLUTION).unwrap().is_changed());
    }

    #[test]
    fn test_text_count_matches_between_eager_and_lazy_reads() {
        let bytes = fixtures::sample_tiff(ByteOrder::LittleEndian);
        let eager = ReadOptions { eager_limit: 1024, ..Default::default() };
        let eager = crate::read_bytes(&bytes, &eager).unwrap().unwrap();
        let main = eager.main_ifd().unwrap();
        assert_eq!(eager.ifd(main).unwrap().entry(tags::MAKE).unwrap().count(), 5);

        let mut lazy = crate::read_bytes(&bytes, &Default::default()).unwrap().unwrap();
        let main = lazy.main_ifd().unwrap();
        lazy.resolve(main, tags::MAKE).unwrap();
        let entry = lazy.ifd(main).unwrap().entry(tags::MAKE).unwrap();
        assert_eq!(entry.count(), 5);
        assert_eq!(entry.disk_count(), 6);
    }

    #[test]
    fn test_materialize_releases_source() {
        let bytes = fixtures::sample_tiff(ByteOrder::BigEndian);
        let mut exif = crate::read_bytes(&bytes, &Default::default()).unwrap().unwrap();
        exif.materialize().unwrap();
        assert!(!exif.is_lazy());
        for id in exif.traverse() {
            assert!(exif.ifd(id).unwrap().entries().all(|e| e.is_resolved()));
        }
        assert!(!exif.has_changes());
    }

    #[test]
    fn test_display_and_report() {
        let bytes = fixtures::sample_tiff(ByteOrder::LittleEndian);
        let mut exif = crate::read_bytes(&bytes, &Default::default()).unwrap().unwrap();
        exif.materialize().unwrap();

        let output = exif.to_string();
        assert!(output.contains("little-endian"));
        assert!(output.contains("Orientation"));
        assert!(output.contains("\"Canon\""));

        let json = serde_json::to_value(exif.report()).unwrap();
        assert_eq!(json["directories"][0]["name"], "IFD0");
        let entries = json["directories"][0]["entries"].as_array().unwrap();
        assert!(entries.iter().any(|e| e["name"] == "Make" && e["value"]["value"] == "Canon"));
    }
}
