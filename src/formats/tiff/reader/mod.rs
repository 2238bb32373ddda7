//! EXIF/TIFF reader

pub mod tags;

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};
use crate::config::ReadOptions;
use crate::error::{ParseError, Result};
use crate::formats::jpeg;
use crate::formats::tiff::entry::RECORD_SIZE;
use crate::formats::tiff::ifd::{Ifd, IfdId, IfdKind, IfdOrigin, Payload};
use crate::formats::tiff::types::{Container, Exif, TiffLocation};
use crate::formats::tiff::{tags as tiff_tags, TIFF_MAGIC};
use crate::io::{ByteOrder, DataSource, SeekableReader, StreamSource};

use self::tags::{RawRecord, TagReader};

/// Size of the TIFF header
pub const HEADER_SIZE: usize = 8;

/// Parses a TIFF block from a stream positioned anywhere
///
/// `base` is the absolute offset of the TIFF header; every IFD offset is
/// taken relative to it. The stream stays inside the returned tree so
/// deferred values can be loaded later.
pub struct ExifReader<R: SeekableReader> {
    stream: R,
    base: u64,
    limit: Option<u64>,
    options: ReadOptions,
}

impl<R: SeekableReader + 'static> ExifReader<R> {
    pub fn new(stream: R, base: u64, options: &ReadOptions) -> Self {
        Self {
            stream,
            base,
            limit: None,
            options: options.clone(),
        }
    }

    /// Bounds the TIFF block to `len` bytes after `base`
    pub fn with_limit(mut self, len: u64) -> Self {
        self.limit = Some(len);
        self
    }

    /// Reads the header and the whole directory tree
    pub fn read(self) -> Result<Exif> {
        let mut source = StreamSource::new(self.stream, self.base)?;
        if let Some(limit) = self.limit {
            source = source.with_limit(limit);
        }

        let header = source.read_at(0, HEADER_SIZE)?;
        let marker = [header[0], header[1]];
        let order = ByteOrder::from_tiff_magic(marker)
            .ok_or(ParseError::InvalidByteOrder(u16::from_be_bytes(marker)))?;
        let magic = order.get_word(&header, 2)?;
        if magic != TIFF_MAGIC {
            return Err(ParseError::InvalidMagic(magic).into());
        }
        let first = order.get_dword(&header, 4)?;

        let mut walker = Walker {
            source: &mut source,
            order,
            options: &self.options,
            visited: HashSet::new(),
            exif: Exif::empty(order),
        };

        let mut next = first;
        while next != 0 {
            if walker.exif.chain.len() >= self.options.max_ifds {
                return Err(ParseError::TooManyIfds(self.options.max_ifds).into());
            }
            let kind = IfdKind::Image(walker.exif.chain.len() as u16);
            let (id, following) = walker.read_ifd(next, kind, 0)?;
            walker.exif.chain.push(id);
            next = following;
        }

        let mut exif = walker.exif;
        log::debug!(
            "Parsed {} top-level IFDs ({} directories total)",
            exif.chain.len(),
            exif.arena.len()
        );

        exif.location = Some(TiffLocation {
            container: Container::Tiff,
            tiff_base: self.base,
            tiff_len: source.len(),
        });
        exif.source = Some(Box::new(source));
        Ok(exif)
    }
}

struct Walker<'a> {
    source: &'a mut dyn DataSource,
    order: ByteOrder,
    options: &'a ReadOptions,
    visited: HashSet<u32>,
    exif: Exif,
}

impl Walker<'_> {
    /// Reads the IFD at `offset` and its sub-IFDs; returns its id and next-IFD offset
    fn read_ifd(&mut self, offset: u32, kind: IfdKind, depth: usize) -> Result<(IfdId, u32)> {
        if depth > self.options.max_depth {
            return Err(ParseError::TooDeep(self.options.max_depth).into());
        }
        if !self.visited.insert(offset) {
            return Err(ParseError::IfdLoop(offset).into());
        }
        if offset as u64 + 2 > self.source.len() {
            return Err(ParseError::InvalidOffset(offset as u64).into());
        }

        let count_bytes = self.source.read_at(offset as u64, 2)?;
        let count = self.order.get_word(&count_bytes, 0)?;
        if count as usize > self.options.max_entries {
            return Err(ParseError::TooManyEntries {
                offset,
                count,
                limit: self.options.max_entries,
            }
            .into());
        }

        let table_len = count as usize * RECORD_SIZE;
        let table = self.source.read_at(offset as u64 + 2, table_len + 4)?;

        let mut ifd = Ifd::new(kind);
        ifd.origin = Some(IfdOrigin { offset, entry_count: count });

        let mut seen = HashSet::new();
        let mut children = Vec::new();
        let mut thumbnail_offset = None;
        let mut thumbnail_len = None;
        let mut reader = TagReader::new(&mut *self.source, self.order, self.options.eager_limit);

        for (index, chunk) in table[..table_len].chunks_exact(RECORD_SIZE).enumerate() {
            let record_offset = offset + 2 + (index * RECORD_SIZE) as u32;
            let record = RawRecord::parse(chunk, record_offset, self.order)?;

            if !seen.insert(record.tag) {
                log::warn!("Duplicate tag 0x{:04X} in {kind}; keeping the first", record.tag);
                continue;
            }

            if let Some(child) = IfdKind::from_pointer_tag(kind, record.tag) {
                children.push((child, record.value_offset(self.order)));
                continue;
            }

            if matches!(kind, IfdKind::Image(_)) {
                match record.tag {
                    tiff_tags::JPEG_INTERCHANGE_FORMAT => {
                        thumbnail_offset = Some(record.value_offset(self.order));
                        continue;
                    }
                    tiff_tags::JPEG_INTERCHANGE_FORMAT_LENGTH => {
                        thumbnail_len = Some(record.value_offset(self.order));
                        continue;
                    }
                    _ => {}
                }
            }

            if let Some(entry) = reader.read_entry(&record)? {
                ifd.entries.insert(record.tag, entry);
            }
        }

        let next = self.order.get_dword(&table, table_len)?;

        if let (Some(at), Some(len)) = (thumbnail_offset, thumbnail_len) {
            ifd.thumbnail = Some(self.read_thumbnail(at, len as usize)?);
        }

        log::debug!("Read {kind} at offset {offset}: {count} records");
        let id = self.exif.alloc(ifd);

        for (child_kind, child_offset) in children {
            let (child, _) = self.read_ifd(child_offset, child_kind, depth + 1)?;
            self.exif.arena[id.0].children.insert(child_kind, child);
        }

        Ok((id, next))
    }

    fn read_thumbnail(&mut self, offset: u32, len: usize) -> Result<Payload> {
        if offset as u64 + len as u64 > self.source.len() {
            return Err(ParseError::Truncated { offset: offset as u64, needed: len as u64 }.into());
        }
        if len <= self.options.eager_limit {
            Ok(Payload::Resolved(self.source.read_at(offset as u64, len)?))
        } else {
            Ok(Payload::Unresolved { offset, len })
        }
    }
}

/// Finds the TIFF block in a JPEG or bare TIFF stream
///
/// `Ok(None)` means the stream is a JPEG without an EXIF segment.
pub fn locate<R: Read + Seek + ?Sized>(stream: &mut R) -> Result<Option<TiffLocation>> {
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    let available = end.min(magic.len() as u64) as usize;
    stream.read_exact(&mut magic[..available])?;

    if jpeg::is_jpeg(&magic[..available]) {
        return Ok(jpeg::find_exif_segment(stream)?.map(|segment| TiffLocation {
            container: Container::Jpeg {
                segment_start: segment.offset,
                segment_len: segment.len,
            },
            tiff_base: segment.offset + jpeg::EXIF_PREFIX_LEN,
            tiff_len: segment.len - jpeg::EXIF_PREFIX_LEN,
        }));
    }

    if magic == *b"II*\0" || magic == *b"MM\0*" {
        return Ok(Some(TiffLocation {
            container: Container::Tiff,
            tiff_base: 0,
            tiff_len: end,
        }));
    }

    Err(ParseError::UnrecognizedContainer.into())
}

/// Locates and parses the EXIF tree of a JPEG or TIFF stream
pub fn read_stream<R: SeekableReader + 'static>(mut stream: R, options: &ReadOptions) -> Result<Option<Exif>> {
    let Some(location) = locate(&mut stream)? else {
        log::debug!("No EXIF segment found");
        return Ok(None);
    };

    let mut exif = ExifReader::new(stream, location.tiff_base, options)
        .with_limit(location.tiff_len)
        .read()?;
    exif.location = Some(location);
    Ok(Some(exif))
}
