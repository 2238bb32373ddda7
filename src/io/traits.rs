//! Core I/O traits

use std::io::{Read, Seek};
use crate::error::Result;

/// Trait for readers that support both reading and seeking operations
///
/// Automatically implemented for any [`Read`] + [`Seek`] + [`Send`] type,
/// so files, memory maps wrapped in a cursor, and in-memory buffers all work.
pub trait SeekableReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableReader for T {}

/// Random access to the bytes of a TIFF block
///
/// Offsets are relative to the start of the TIFF header, the same
/// coordinate system used by every offset stored inside IFD records.
/// A parsed tree keeps one of these to load deferred values on demand.
pub trait DataSource: Send {
    /// Reads exactly `len` bytes starting at `offset`
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Number of bytes addressable from the TIFF header onwards
    fn len(&self) -> u64;

    /// Returns whether the source is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, SeekFrom};

    #[test]
    fn test_cursor_implements_seekable_reader() {
        let data = vec![1u8, 2, 3, 4];
        let cursor = Cursor::new(data);

        fn accepts_seekable<R: SeekableReader>(_r: R) {}
        accepts_seekable(cursor);
    }

    #[test]
    fn test_boxed_seek_and_read() {
        let data = vec![0x10u8, 0x20, 0x30, 0x40];
        let mut reader: Box<dyn SeekableReader> = Box::new(Cursor::new(data));

        reader.seek(SeekFrom::Start(2)).unwrap();

        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 0x30);
    }
}
