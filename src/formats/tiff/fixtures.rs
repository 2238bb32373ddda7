//! Hand-laid TIFF and JPEG samples shared by the unit tests

use crate::io::ByteOrder;
use super::tags;
use super::value::FieldType;

/// Offsets inside [`sample_tiff`], relative to the TIFF header
pub const IFD0: u32 = 8;
pub const ORIENTATION_RECORD: u32 = 22;
pub const MAKE_DATA: u32 = 62;
pub const X_RESOLUTION_DATA: u32 = 68;
pub const EXIF_IFD: u32 = 76;
pub const EXPOSURE_DATA: u32 = 106;
pub const IFD1: u32 = 114;
pub const IFD1_NEXT: u32 = 152;
pub const THUMBNAIL_DATA: u32 = 156;
pub const SAMPLE_TIFF_LEN: usize = 160;

pub const THUMBNAIL: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

/// Absolute offsets inside [`sample_jpeg`]
pub const JPEG_EXIF_SEGMENT: u64 = 20;
pub const JPEG_TIFF_BASE: u64 = 30;

struct Builder {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl Builder {
    fn u16(&mut self, value: u16) {
        let bytes = self.order.encode_word(value);
        self.bytes.extend_from_slice(&bytes);
    }

    fn u32(&mut self, value: u32) {
        let bytes = self.order.encode_dword(value);
        self.bytes.extend_from_slice(&bytes);
    }

    fn record(&mut self, tag: u16, field_type: FieldType, count: u32, value: u32) {
        self.u16(tag);
        self.u16(field_type.code());
        self.u32(count);
        self.u32(value);
    }

    fn inline(&mut self, tag: u16, field_type: FieldType, count: u32, field: &[u8]) {
        self.u16(tag);
        self.u16(field_type.code());
        self.u32(count);
        let mut slot = [0u8; 4];
        slot[..field.len()].copy_from_slice(field);
        self.bytes.extend_from_slice(&slot);
    }

    fn at(&self, offset: u32) {
        assert_eq!(self.bytes.len(), offset as usize, "fixture layout drifted");
    }
}

/// IFD0 (Make, Orientation, XResolution, Exif pointer), an Exif IFD
/// (ExposureTime, ExifVersion) and IFD1 with a 4-byte thumbnail
pub fn sample_tiff(order: ByteOrder) -> Vec<u8> {
    let mut b = Builder { order, bytes: Vec::new() };
    b.bytes.extend_from_slice(&order.marker());
    b.u16(42);
    b.u32(IFD0);

    b.at(IFD0);
    b.u16(4);
    b.record(tags::MAKE, FieldType::Ascii, 6, MAKE_DATA);
    b.at(ORIENTATION_RECORD);
    b.inline(tags::ORIENTATION, FieldType::Short, 1, &order.encode_word(1));
    b.record(tags::X_RESOLUTION, FieldType::Rational, 1, X_RESOLUTION_DATA);
    b.record(tags::EXIF_IFD_POINTER, FieldType::Long, 1, EXIF_IFD);
    b.u32(IFD1);

    b.at(MAKE_DATA);
    b.bytes.extend_from_slice(b"Canon\0");
    b.at(X_RESOLUTION_DATA);
    b.u32(72);
    b.u32(1);

    b.at(EXIF_IFD);
    b.u16(2);
    b.record(tags::EXPOSURE_TIME, FieldType::Rational, 1, EXPOSURE_DATA);
    b.inline(tags::EXIF_VERSION, FieldType::Undefined, 4, b"0230");
    b.u32(0);

    b.at(EXPOSURE_DATA);
    b.u32(1);
    b.u32(250);

    b.at(IFD1);
    b.u16(3);
    b.inline(tags::COMPRESSION, FieldType::Short, 1, &order.encode_word(6));
    b.record(tags::JPEG_INTERCHANGE_FORMAT, FieldType::Long, 1, THUMBNAIL_DATA);
    b.record(tags::JPEG_INTERCHANGE_FORMAT_LENGTH, FieldType::Long, 1, THUMBNAIL.len() as u32);
    b.at(IFD1_NEXT);
    b.u32(0);

    b.at(THUMBNAIL_DATA);
    b.bytes.extend_from_slice(&THUMBNAIL);
    assert_eq!(b.bytes.len(), SAMPLE_TIFF_LEN);
    b.bytes
}

fn jfif_segment() -> Vec<u8> {
    vec![
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]
}

fn image_tail() -> Vec<u8> {
    let mut tail = vec![0xFF, 0xDB, 0x00, 0x04, 0x01, 0x02];
    tail.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    tail.extend_from_slice(&[0x12, 0x34, 0xFF, 0x00, 0x56]);
    tail.extend_from_slice(&[0xFF, 0xD9]);
    tail
}

/// JFIF JPEG with [`sample_tiff`] in an APP1 segment
pub fn sample_jpeg(order: ByteOrder) -> Vec<u8> {
    let tiff = sample_tiff(order);
    let mut jpeg = vec![0xFF, 0xD8];
    jpeg.extend_from_slice(&jfif_segment());
    assert_eq!(jpeg.len() as u64, JPEG_EXIF_SEGMENT);
    jpeg.extend_from_slice(&[0xFF, 0xE1]);
    jpeg.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    assert_eq!(jpeg.len() as u64, JPEG_TIFF_BASE);
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&image_tail());
    jpeg
}

/// JFIF JPEG without any EXIF segment
pub fn plain_jpeg() -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];
    jpeg.extend_from_slice(&jfif_segment());
    jpeg.extend_from_slice(&image_tail());
    jpeg
}
