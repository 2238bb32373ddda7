//! JPEG marker segments: locating and replacing the EXIF APP1 segment

use std::io::{self, Read, Seek, SeekFrom, Write};
use crate::error::{Error, ParseError, Result};

/// Start of image
pub const SOI: u8 = 0xD8;
/// End of image
pub const EOI: u8 = 0xD9;
/// Start of scan; entropy-coded data follows
pub const SOS: u8 = 0xDA;
/// JFIF
pub const APP0: u8 = 0xE0;
/// EXIF / XMP
pub const APP1: u8 = 0xE1;

const TEM: u8 = 0x01;
const RST0: u8 = 0xD0;
const RST7: u8 = 0xD7;

/// Identifier at the start of an EXIF APP1 payload
pub const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";

/// Largest payload one marker segment can carry
pub const MAX_SEGMENT_PAYLOAD: usize = 65533;

/// Marker, length field and signature preceding the TIFF header
pub const EXIF_PREFIX_LEN: u64 = 10;

/// One length-bearing marker segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub marker: u8,
    /// Absolute offset of the 0xFF byte
    pub offset: u64,
    /// Total size including marker and length field
    pub len: u64,
}

/// Returns whether `header` starts with a JPEG SOI marker
pub fn is_jpeg(header: &[u8]) -> bool {
    header.starts_with(&[0xFF, SOI])
}

fn is_standalone(marker: u8) -> bool {
    marker == TEM || (RST0..=RST7).contains(&marker)
}

fn read_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8], offset: u64) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ParseError::Truncated { offset, needed: buf.len() as u64 }.into(),
        _ => Error::Io(e),
    })
}

/// Reads a marker at `*pos`, skipping fill bytes
fn read_marker<R: Read + ?Sized>(reader: &mut R, pos: &mut u64) -> Result<u8> {
    let mut byte = [0u8; 1];
    read_exact(reader, &mut byte, *pos)?;
    if byte[0] != 0xFF {
        return Err(ParseError::InvalidMarker { offset: *pos, marker: byte[0] }.into());
    }
    loop {
        *pos += 1;
        read_exact(reader, &mut byte, *pos)?;
        if byte[0] != 0xFF {
            *pos += 1;
            return Ok(byte[0]);
        }
    }
}

fn read_length<R: Read + ?Sized>(reader: &mut R, pos: u64, marker: u8) -> Result<([u8; 2], usize)> {
    let mut len = [0u8; 2];
    read_exact(reader, &mut len, pos)?;
    let value = u16::from_be_bytes(len) as usize;
    if value < 2 {
        return Err(ParseError::InvalidMarker { offset: pos, marker }.into());
    }
    Ok((len, value))
}

/// Lists the marker segments before the first scan
pub fn scan_segments<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Vec<Segment>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut soi = [0u8; 2];
    read_exact(reader, &mut soi, 0)?;
    if !is_jpeg(&soi) {
        return Err(ParseError::InvalidMarker { offset: 0, marker: soi[1] }.into());
    }

    let mut segments = Vec::new();
    let mut pos = 2u64;
    loop {
        let start = pos;
        let marker = read_marker(reader, &mut pos)?;
        if marker == SOS || marker == EOI {
            break;
        }
        if is_standalone(marker) {
            continue;
        }
        let (_, len) = read_length(reader, pos, marker)?;
        let skip = len as u64 - 2;
        reader.seek(SeekFrom::Current(skip as i64))?;
        pos += len as u64;
        segments.push(Segment { marker, offset: start, len: pos - start });
    }
    Ok(segments)
}

/// Finds the first APP1 segment carrying EXIF data
pub fn find_exif_segment<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Option<Segment>> {
    for segment in scan_segments(reader)? {
        if segment.marker != APP1 || segment.len < EXIF_PREFIX_LEN {
            continue;
        }
        reader.seek(SeekFrom::Start(segment.offset + 4))?;
        let mut signature = [0u8; 6];
        read_exact(reader, &mut signature, segment.offset + 4)?;
        if signature == EXIF_SIGNATURE {
            log::debug!("EXIF segment at offset {} ({} bytes)", segment.offset, segment.len);
            return Ok(Some(segment));
        }
    }
    Ok(None)
}

/// Wraps a TIFF block into a complete APP1 segment
pub fn build_app1(tiff: &[u8]) -> Result<Vec<u8>> {
    let payload = EXIF_SIGNATURE.len() + tiff.len();
    if payload > MAX_SEGMENT_PAYLOAD {
        return Err(Error::SegmentTooLarge(payload));
    }

    let mut segment = Vec::with_capacity(payload + 4);
    segment.extend_from_slice(&[0xFF, APP1]);
    segment.extend_from_slice(&((payload + 2) as u16).to_be_bytes());
    segment.extend_from_slice(EXIF_SIGNATURE);
    segment.extend_from_slice(tiff);
    Ok(segment)
}

/// Copies a JPEG from `src` to `dst` with `segment` as its EXIF segment
///
/// An existing EXIF segment is replaced where it stood; otherwise the new
/// segment goes right after SOI and any APP0 segments. Everything else,
/// including the entropy-coded data, is copied unchanged. Returns the
/// offset of the new segment in `dst`.
pub fn splice_exif<R: Read + ?Sized, W: Write + ?Sized>(src: &mut R, dst: &mut W, segment: &[u8]) -> Result<u64> {
    let mut soi = [0u8; 2];
    read_exact(src, &mut soi, 0)?;
    if !is_jpeg(&soi) {
        return Err(ParseError::InvalidMarker { offset: 0, marker: soi[1] }.into());
    }
    dst.write_all(&soi)?;

    let mut pos = 2u64;
    let mut written = 2u64;
    let mut placed = None;

    loop {
        let marker = read_marker(src, &mut pos)?;

        if marker == SOS || marker == EOI {
            if placed.is_none() {
                dst.write_all(segment)?;
                placed = Some(written);
            }
            dst.write_all(&[0xFF, marker])?;
            io::copy(src, dst)?;
            break;
        }

        if is_standalone(marker) {
            dst.write_all(&[0xFF, marker])?;
            written += 2;
            continue;
        }

        let (len_bytes, len) = read_length(src, pos, marker)?;
        let mut payload = vec![0u8; len - 2];
        read_exact(src, &mut payload, pos + 2)?;
        pos += len as u64;

        if marker == APP1 && payload.starts_with(EXIF_SIGNATURE) {
            if placed.is_none() {
                dst.write_all(segment)?;
                placed = Some(written);
                written += segment.len() as u64;
            }
            continue;
        }

        if placed.is_none() && marker != APP0 {
            dst.write_all(segment)?;
            placed = Some(written);
            written += segment.len() as u64;
        }

        dst.write_all(&[0xFF, marker])?;
        dst.write_all(&len_bytes)?;
        dst.write_all(&payload)?;
        written += 2 + len as u64;
    }

    placed.ok_or_else(|| Error::Unsupported("JPEG without a place for the EXIF segment".into()))
}
