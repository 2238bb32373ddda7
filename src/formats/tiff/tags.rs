//! EXIF/TIFF tag constants
//!
//! Only a working subset of the EXIF dictionary: enough to name common
//! entries and to infer the type of tags created through
//! [`Ifd::get_tag_value`](super::ifd::Ifd::get_tag_value).

use super::ifd::IfdKind;
use super::value::FieldType;

/// Image width in pixels
pub const IMAGE_WIDTH: u16 = 0x0100;

/// Image height in pixels
pub const IMAGE_LENGTH: u16 = 0x0101;

/// Compression scheme (6 = JPEG thumbnail)
pub const COMPRESSION: u16 = 0x0103;

/// Image description
pub const IMAGE_DESCRIPTION: u16 = 0x010E;

/// Camera manufacturer
pub const MAKE: u16 = 0x010F;

/// Camera model
pub const MODEL: u16 = 0x0110;

/// Orientation (1-8)
pub const ORIENTATION: u16 = 0x0112;

/// X resolution
pub const X_RESOLUTION: u16 = 0x011A;

/// Y resolution
pub const Y_RESOLUTION: u16 = 0x011B;

/// Resolution unit
pub const RESOLUTION_UNIT: u16 = 0x0128;

/// Software
pub const SOFTWARE: u16 = 0x0131;

/// Date/time of last modification
pub const DATE_TIME: u16 = 0x0132;

/// Artist
pub const ARTIST: u16 = 0x013B;

/// Offset of the embedded JPEG thumbnail
pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;

/// Length of the embedded JPEG thumbnail
pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

/// YCbCr positioning
pub const YCBCR_POSITIONING: u16 = 0x0213;

/// Copyright
pub const COPYRIGHT: u16 = 0x8298;

/// Pointer to the Exif sub-IFD
pub const EXIF_IFD_POINTER: u16 = 0x8769;

/// Pointer to the GPS sub-IFD
pub const GPS_IFD_POINTER: u16 = 0x8825;

/// Exposure time
pub const EXPOSURE_TIME: u16 = 0x829A;

/// F-number
pub const F_NUMBER: u16 = 0x829D;

/// ISO speed ratings
pub const ISO_SPEED_RATINGS: u16 = 0x8827;

/// Exif version
pub const EXIF_VERSION: u16 = 0x9000;

/// Date/time original
pub const DATE_TIME_ORIGINAL: u16 = 0x9003;

/// Date/time digitized
pub const DATE_TIME_DIGITIZED: u16 = 0x9004;

/// Focal length
pub const FOCAL_LENGTH: u16 = 0x920A;

/// Maker note
pub const MAKER_NOTE: u16 = 0x927C;

/// User comment
pub const USER_COMMENT: u16 = 0x9286;

/// Color space
pub const COLOR_SPACE: u16 = 0xA001;

/// Valid image width
pub const PIXEL_X_DIMENSION: u16 = 0xA002;

/// Valid image height
pub const PIXEL_Y_DIMENSION: u16 = 0xA003;

/// Pointer to the Interoperability sub-IFD
pub const INTEROP_IFD_POINTER: u16 = 0xA005;

/// GPS tag version
pub const GPS_VERSION_ID: u16 = 0x0000;

/// "N" or "S"
pub const GPS_LATITUDE_REF: u16 = 0x0001;

/// Latitude as degrees, minutes, seconds
pub const GPS_LATITUDE: u16 = 0x0002;

/// "E" or "W"
pub const GPS_LONGITUDE_REF: u16 = 0x0003;

/// Longitude as degrees, minutes, seconds
pub const GPS_LONGITUDE: u16 = 0x0004;

/// 0 above sea level, 1 below
pub const GPS_ALTITUDE_REF: u16 = 0x0005;

/// Altitude in meters
pub const GPS_ALTITUDE: u16 = 0x0006;

/// UTC time as hours, minutes, seconds
pub const GPS_TIME_STAMP: u16 = 0x0007;

/// Geodetic datum
pub const GPS_MAP_DATUM: u16 = 0x0012;

/// UTC date "YYYY:MM:DD"
pub const GPS_DATE_STAMP: u16 = 0x001D;

/// Interoperability identification
pub const INTEROP_INDEX: u16 = 0x0001;

/// Interoperability version
pub const INTEROP_VERSION: u16 = 0x0002;

/// Returns the name of a tag within a directory of `kind`
pub fn tag_name(kind: IfdKind, tag: u16) -> &'static str {
    match kind {
        IfdKind::Gps => match tag {
            GPS_VERSION_ID => "GPSVersionID",
            GPS_LATITUDE_REF => "GPSLatitudeRef",
            GPS_LATITUDE => "GPSLatitude",
            GPS_LONGITUDE_REF => "GPSLongitudeRef",
            GPS_LONGITUDE => "GPSLongitude",
            GPS_ALTITUDE_REF => "GPSAltitudeRef",
            GPS_ALTITUDE => "GPSAltitude",
            GPS_TIME_STAMP => "GPSTimeStamp",
            GPS_MAP_DATUM => "GPSMapDatum",
            GPS_DATE_STAMP => "GPSDateStamp",
            _ => "Unknown",
        },
        IfdKind::Interop => match tag {
            INTEROP_INDEX => "InteroperabilityIndex",
            INTEROP_VERSION => "InteroperabilityVersion",
            _ => "Unknown",
        },
        IfdKind::Image(_) | IfdKind::Exif => match tag {
            IMAGE_WIDTH => "ImageWidth",
            IMAGE_LENGTH => "ImageLength",
            COMPRESSION => "Compression",
            IMAGE_DESCRIPTION => "ImageDescription",
            MAKE => "Make",
            MODEL => "Model",
            ORIENTATION => "Orientation",
            X_RESOLUTION => "XResolution",
            Y_RESOLUTION => "YResolution",
            RESOLUTION_UNIT => "ResolutionUnit",
            SOFTWARE => "Software",
            DATE_TIME => "DateTime",
            ARTIST => "Artist",
            JPEG_INTERCHANGE_FORMAT => "JPEGInterchangeFormat",
            JPEG_INTERCHANGE_FORMAT_LENGTH => "JPEGInterchangeFormatLength",
            YCBCR_POSITIONING => "YCbCrPositioning",
            COPYRIGHT => "Copyright",
            EXIF_IFD_POINTER => "ExifIFDPointer",
            GPS_IFD_POINTER => "GPSInfoIFDPointer",
            EXPOSURE_TIME => "ExposureTime",
            F_NUMBER => "FNumber",
            ISO_SPEED_RATINGS => "ISOSpeedRatings",
            EXIF_VERSION => "ExifVersion",
            DATE_TIME_ORIGINAL => "DateTimeOriginal",
            DATE_TIME_DIGITIZED => "DateTimeDigitized",
            FOCAL_LENGTH => "FocalLength",
            MAKER_NOTE => "MakerNote",
            USER_COMMENT => "UserComment",
            COLOR_SPACE => "ColorSpace",
            PIXEL_X_DIMENSION => "PixelXDimension",
            PIXEL_Y_DIMENSION => "PixelYDimension",
            INTEROP_IFD_POINTER => "InteroperabilityIFDPointer",
            _ => "Unknown",
        },
    }
}

/// Returns the field type a new entry for `tag` gets in a directory of `kind`
pub fn default_field_type(kind: IfdKind, tag: u16) -> Option<FieldType> {
    use FieldType::*;

    match kind {
        IfdKind::Gps => match tag {
            GPS_VERSION_ID | GPS_ALTITUDE_REF => Some(Byte),
            GPS_LATITUDE_REF | GPS_LONGITUDE_REF | GPS_MAP_DATUM | GPS_DATE_STAMP => Some(Ascii),
            GPS_LATITUDE | GPS_LONGITUDE | GPS_ALTITUDE | GPS_TIME_STAMP => Some(Rational),
            _ => None,
        },
        IfdKind::Interop => match tag {
            INTEROP_INDEX => Some(Ascii),
            INTEROP_VERSION => Some(Undefined),
            _ => None,
        },
        IfdKind::Image(_) | IfdKind::Exif => match tag {
            IMAGE_WIDTH | IMAGE_LENGTH | JPEG_INTERCHANGE_FORMAT
            | JPEG_INTERCHANGE_FORMAT_LENGTH | PIXEL_X_DIMENSION | PIXEL_Y_DIMENSION => Some(Long),
            COMPRESSION | ORIENTATION | RESOLUTION_UNIT | YCBCR_POSITIONING | ISO_SPEED_RATINGS
            | COLOR_SPACE => Some(Short),
            IMAGE_DESCRIPTION | MAKE | MODEL | SOFTWARE | DATE_TIME | ARTIST | COPYRIGHT
            | DATE_TIME_ORIGINAL | DATE_TIME_DIGITIZED => Some(Ascii),
            X_RESOLUTION | Y_RESOLUTION | EXPOSURE_TIME | F_NUMBER | FOCAL_LENGTH => Some(Rational),
            EXIF_VERSION | MAKER_NOTE | USER_COMMENT => Some(Undefined),
            _ => None,
        },
    }
}
