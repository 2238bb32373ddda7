//! Error types for exifkit

use std::io;
use thiserror::Error;

use crate::formats::tiff::ifd::{IfdId, IfdKind};
use crate::formats::tiff::value::FieldType;

/// Result type for exifkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in exifkit operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or truncated TIFF structure
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Value setter disagrees with the entry's declared type
    #[error("Type mismatch for tag 0x{tag:04X}: {field_type} entry cannot hold a {value} value")]
    TypeMismatch {
        tag: u16,
        field_type: FieldType,
        value: &'static str,
    },

    /// The record-level write path only handles fixed-width integers
    #[error("Tag 0x{tag:04X} ({field_type}) needs the data area and cannot be updated in place")]
    UnsupportedTypeForInPlaceUpdate { tag: u16, field_type: FieldType },

    /// Low-level packing error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A sub-IFD with the same kind is already attached to the parent
    #[error("Directory {0} already exists")]
    DuplicateDirectory(IfdKind),

    /// IFD id does not belong to this tree
    #[error("Unknown directory id {0:?}")]
    UnknownDirectory(IfdId),

    /// Tag type cannot be inferred for creation
    #[error("Unknown tag 0x{0:04X} in this directory")]
    UnknownTag(u16),

    /// Entry stored under a tag other than its own
    #[error("Entry tag 0x{found:04X} does not match slot 0x{expected:04X}")]
    TagMismatch { expected: u16, found: u16 },

    /// Rational with a zero denominator
    #[error("Rational has a zero denominator")]
    ZeroDenominator,

    /// Regenerated EXIF block does not fit in one APP1 segment
    #[error("EXIF block of {0} bytes does not fit in a JPEG APP1 segment")]
    SegmentTooLarge(usize),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Configuration could not be parsed or serialized
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for errors describing corrupt metadata rather than I/O or caller bugs
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

/// Structural problems found while reading a TIFF stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Invalid byte order marker
    #[error("Invalid byte order marker: 0x{0:04X}")]
    InvalidByteOrder(u16),

    /// Invalid TIFF magic number
    #[error("Invalid TIFF magic number: {0}")]
    InvalidMagic(u16),

    /// Stream ended before a structure was complete
    #[error("Truncated data: needed {needed} bytes at offset {offset}")]
    Truncated { offset: u64, needed: u64 },

    /// Offset points outside the stream
    #[error("Invalid offset: {0}")]
    InvalidOffset(u64),

    /// IFD chain revisits an offset
    #[error("IFD loop detected at offset {0}")]
    IfdLoop(u32),

    /// Too many IFDs in the chain
    #[error("Too many IFDs (limit {0})")]
    TooManyIfds(usize),

    /// Too many entries in one IFD
    #[error("IFD at offset {offset} declares {count} entries (limit {limit})")]
    TooManyEntries { offset: u32, count: u16, limit: usize },

    /// Sub-IFDs nested deeper than allowed
    #[error("Sub-IFD nesting exceeds depth {0}")]
    TooDeep(usize),

    /// Not a JPEG or TIFF stream
    #[error("Unrecognized container")]
    UnrecognizedContainer,

    /// JPEG marker structure is broken
    #[error("Invalid JPEG marker 0x{marker:02X} at offset {offset}")]
    InvalidMarker { offset: u64, marker: u8 },
}

/// Errors from packing values into fixed-size slots
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Destination or source slot too small for the requested position
    #[error("Buffer too small: {needed} bytes at position {position}, {available} available")]
    BufferTooSmall {
        position: usize,
        needed: usize,
        available: usize,
    },

    /// Integer does not fit the entry's field type
    #[error("Value {value} out of range for {field_type}")]
    ValueOutOfRange { value: i64, field_type: FieldType },
}
