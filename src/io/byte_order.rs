//! Byte order (endianness) handling
//!
//! Packs and unpacks the 2-byte (word) and 4-byte (dword) fields of a TIFF
//! stream. The order is fixed by the "II"/"MM" marker at the start of the
//! TIFF header and applies to every field beneath it.

use std::io::{Read, Write};
use serde::{Deserialize, Serialize};
use crate::error::{CodecError, ParseError, Result};

/// Represents the byte order (endianness) of binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    /// Little-endian byte order ("II", Intel)
    LittleEndian,
    /// Big-endian byte order ("MM", Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Detects byte order from TIFF marker bytes
    ///
    /// TIFF streams start with either "II" (0x4949) for little-endian
    /// or "MM" (0x4D4D) for big-endian.
    pub fn from_tiff_magic(magic: [u8; 2]) -> Option<Self> {
        match &magic {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Returns the marker bytes written at the start of a TIFF header
    pub fn marker(&self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }

    /// Reads and detects byte order from a reader
    pub fn detect<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;

        Self::from_tiff_magic(magic)
            .ok_or_else(|| ParseError::InvalidByteOrder(u16::from_be_bytes(magic)).into())
    }

    /// Returns the handler for this byte order
    pub fn handler(&self) -> &'static dyn ByteOrderHandler {
        match self {
            ByteOrder::LittleEndian => &LittleEndian,
            ByteOrder::BigEndian => &BigEndian,
        }
    }

    pub fn encode_word(&self, value: u16) -> [u8; 2] {
        self.handler().encode_word(value)
    }

    pub fn encode_dword(&self, value: u32) -> [u8; 4] {
        self.handler().encode_dword(value)
    }

    pub fn decode_word(&self, bytes: [u8; 2]) -> u16 {
        self.handler().decode_word(bytes)
    }

    pub fn decode_dword(&self, bytes: [u8; 4]) -> u32 {
        self.handler().decode_dword(bytes)
    }

    /// Writes a word into `buf` at `pos`
    pub fn put_word(&self, buf: &mut [u8], pos: usize, value: u16) -> std::result::Result<(), CodecError> {
        slot_mut(buf, pos, 2)?.copy_from_slice(&self.encode_word(value));
        Ok(())
    }

    /// Writes a dword into `buf` at `pos`
    pub fn put_dword(&self, buf: &mut [u8], pos: usize, value: u32) -> std::result::Result<(), CodecError> {
        slot_mut(buf, pos, 4)?.copy_from_slice(&self.encode_dword(value));
        Ok(())
    }

    /// Reads a word from `buf` at `pos`
    pub fn get_word(&self, buf: &[u8], pos: usize) -> std::result::Result<u16, CodecError> {
        let slot = slot(buf, pos, 2)?;
        Ok(self.decode_word([slot[0], slot[1]]))
    }

    /// Reads a dword from `buf` at `pos`
    pub fn get_dword(&self, buf: &[u8], pos: usize) -> std::result::Result<u32, CodecError> {
        let slot = slot(buf, pos, 4)?;
        Ok(self.decode_dword([slot[0], slot[1], slot[2], slot[3]]))
    }

    pub fn read_u16<R: Read + ?Sized>(&self, reader: &mut R) -> Result<u16> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(self.decode_word(buf))
    }

    pub fn read_u32<R: Read + ?Sized>(&self, reader: &mut R) -> Result<u32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(self.decode_dword(buf))
    }

    pub fn write_u16<W: Write + ?Sized>(&self, writer: &mut W, value: u16) -> Result<()> {
        writer.write_all(&self.encode_word(value))?;
        Ok(())
    }

    pub fn write_u32<W: Write + ?Sized>(&self, writer: &mut W, value: u32) -> Result<()> {
        writer.write_all(&self.encode_dword(value))?;
        Ok(())
    }
}

fn slot(buf: &[u8], pos: usize, needed: usize) -> std::result::Result<&[u8], CodecError> {
    let available = buf.len().saturating_sub(pos);
    pos.checked_add(needed)
        .and_then(|end| buf.get(pos..end))
        .ok_or(CodecError::BufferTooSmall { position: pos, needed, available })
}

fn slot_mut(buf: &mut [u8], pos: usize, needed: usize) -> std::result::Result<&mut [u8], CodecError> {
    let available = buf.len().saturating_sub(pos);
    pos.checked_add(needed)
        .and_then(|end| buf.get_mut(pos..end))
        .ok_or(CodecError::BufferTooSmall { position: pos, needed, available })
}

/// Places words and dwords in a fixed byte order
///
/// Signed values go through their two's-complement bit pattern
/// (`value as u16` / `value as u32`); unsigned values are never sign-extended.
pub trait ByteOrderHandler: Send + Sync {
    /// Encodes an unsigned 16-bit integer
    fn encode_word(&self, value: u16) -> [u8; 2];

    /// Encodes an unsigned 32-bit integer
    fn encode_dword(&self, value: u32) -> [u8; 4];

    /// Decodes an unsigned 16-bit integer
    fn decode_word(&self, bytes: [u8; 2]) -> u16;

    /// Decodes an unsigned 32-bit integer
    fn decode_dword(&self, bytes: [u8; 4]) -> u32;

    /// Decodes a signed 16-bit integer
    fn decode_sword(&self, bytes: [u8; 2]) -> i16 {
        self.decode_word(bytes) as i16
    }

    /// Decodes a signed 32-bit integer
    fn decode_sdword(&self, bytes: [u8; 4]) -> i32 {
        self.decode_dword(bytes) as i32
    }
}

struct LittleEndian;

impl ByteOrderHandler for LittleEndian {
    fn encode_word(&self, value: u16) -> [u8; 2] {
        value.to_le_bytes()
    }

    fn encode_dword(&self, value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }

    fn decode_word(&self, bytes: [u8; 2]) -> u16 {
        u16::from_le_bytes(bytes)
    }

    fn decode_dword(&self, bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(bytes)
    }
}

struct BigEndian;

impl ByteOrderHandler for BigEndian {
    fn encode_word(&self, value: u16) -> [u8; 2] {
        value.to_be_bytes()
    }

    fn encode_dword(&self, value: u32) -> [u8; 4] {
        value.to_be_bytes()
    }

    fn decode_word(&self, bytes: [u8; 2]) -> u16 {
        u16::from_be_bytes(bytes)
    }

    fn decode_dword(&self, bytes: [u8; 4]) -> u32 {
        u32::from_be_bytes(bytes)
    }
}
