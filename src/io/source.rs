//! Data sources backing lazily loaded entry values

use std::io::{self, Read, Seek, SeekFrom};
use crate::error::{ParseError, Result};
use crate::io::traits::{DataSource, SeekableReader};

/// A [`DataSource`] over any seekable stream whose TIFF header sits at `base`
///
/// Used for files opened directly, memory maps wrapped in a
/// [`Cursor`](std::io::Cursor), and in-memory buffers alike.
pub struct StreamSource<R: SeekableReader> {
    inner: R,
    base: u64,
    len: u64,
}

impl<R: SeekableReader> StreamSource<R> {
    /// Wraps `inner`, measuring how many bytes follow `base`
    pub fn new(mut inner: R, base: u64) -> Result<Self> {
        let end = inner.seek(SeekFrom::End(0))?;
        let len = end.checked_sub(base).ok_or(ParseError::InvalidOffset(base))?;
        Ok(Self { inner, base, len })
    }

    /// Restricts the source to the first `len` bytes after `base`
    pub fn with_limit(mut self, len: u64) -> Self {
        self.len = self.len.min(len);
        self
    }

    /// Offset of the TIFF header in the underlying stream
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Consumes the source and returns the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: SeekableReader> DataSource for StreamSource<R> {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let end = offset.checked_add(len as u64);
        if end.map_or(true, |end| end > self.len) {
            return Err(ParseError::Truncated { offset, needed: len as u64 }.into());
        }

        self.inner.seek(SeekFrom::Start(self.base + offset))?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ParseError::Truncated { offset, needed: len as u64 }.into(),
            _ => crate::Error::Io(e),
        })?;
        Ok(buf)
    }

    fn len(&self) -> u64 {
        self.len
    }
}
