//! EXIF data in TIFF structure

pub mod tags;
pub mod value;
pub mod entry;
pub mod ifd;
pub mod types;
pub mod reader;
pub mod writer;
pub mod gps;

#[cfg(test)]
pub(crate) mod fixtures;

pub use value::{FieldType, Value};
pub use entry::{Entry, EntryState, ValueState};
pub use ifd::{Ifd, IfdId, IfdKind};
pub use types::{Container, Exif, ExifReport, TiffLocation};
pub use reader::ExifReader;
pub use writer::{ExifWriter, RegenerateReason, SaveOutcome};
pub use gps::GpsPosition;

/// TIFF magic number (42)
pub const TIFF_MAGIC: u16 = 42;
