//! exifkit - In-place EXIF metadata editing for JPEG and TIFF files
//!
//! exifkit parses the TIFF-structured directory tree of an EXIF block into a
//! mutable tree of IFDs and entries, and writes changes back by patching the
//! original bytes whenever the new values fit, regenerating the JPEG APP1
//! segment otherwise.
//!
//! # Examples
//!
//! ## Reading
//!
//! ```no_run
//! use exifkit::config::ReadOptions;
//! use exifkit::formats::tiff::tags;
//!
//! let mut exif = exifkit::open("photo.jpg", &ReadOptions::default())?.expect("no EXIF");
//! let main = exif.main_ifd().unwrap();
//! if let Some(make) = exif.resolve(main, tags::MAKE)? {
//!     println!("Make: {}", make);
//! }
//! # Ok::<(), exifkit::Error>(())
//! ```
//!
//! ## Editing in place
//!
//! ```no_run
//! use exifkit::config::{ReadOptions, WriteOptions};
//! use exifkit::formats::tiff::tags;
//! use exifkit::ExifWriter;
//!
//! let mut exif = exifkit::open("photo.jpg", &ReadOptions::default())?.expect("no EXIF");
//! let main = exif.main_ifd().unwrap();
//! exif.ifd_mut(main)?
//!     .get_tag_value(tags::ORIENTATION, true)?
//!     .unwrap()
//!     .set_int(6)?;
//!
//! let outcome = ExifWriter::new(&WriteOptions::default()).save("photo.jpg", &mut exif)?;
//! println!("{:?}", outcome);
//! # Ok::<(), exifkit::Error>(())
//! ```

pub mod io;
pub mod error;
pub mod types;
pub mod config;
pub mod formats;

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use memmap2::Mmap;

pub use error::{Error, Result};
pub use types::Rational;
pub use config::{Config, ReadOptions, WriteOptions};
pub use formats::tiff::{
    Entry, Exif, ExifReader, ExifWriter, FieldType, GpsPosition, Ifd, IfdId, IfdKind,
    SaveOutcome, Value, tags, TIFF_MAGIC,
};
pub use io::{ByteOrder, DataSource, SeekableReader};

/// Parses the EXIF tree of an in-memory JPEG or TIFF
///
/// `Ok(None)` means the image carries no EXIF block.
pub fn read_bytes(data: &[u8], options: &ReadOptions) -> Result<Option<Exif>> {
    formats::tiff::reader::read_stream(Cursor::new(data.to_vec()), options)
}

/// Opens a JPEG or TIFF file and parses its EXIF tree
///
/// With `use_mmap` the file is memory-mapped; deferred values are then
/// loaded from the mapping.
pub fn open<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Option<Exif>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    log::debug!("Opening {}", path.display());

    if options.use_mmap {
        // Safety: the mapping is read-only; saves replace the file by rename
        // instead of writing through it.
        let mmap = unsafe { Mmap::map(&file)? };
        formats::tiff::reader::read_stream(Cursor::new(mmap), options)
    } else {
        formats::tiff::reader::read_stream(file, options)
    }
}
