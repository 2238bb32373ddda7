//! Decimal-degree view of the GPS IFD

use serde::Serialize;
use crate::error::{Error, Result};
use crate::formats::tiff::ifd::{Ifd, IfdId, IfdKind};
use crate::formats::tiff::tags;
use crate::formats::tiff::types::Exif;
use crate::formats::tiff::value::Value;
use crate::types::Rational;

/// Seconds are stored with this denominator
const SECONDS_SCALE: i32 = 100;

/// Position stored in the GPS IFD
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsPosition {
    /// Degrees, negative south of the equator
    pub latitude: f64,
    /// Degrees, negative west of Greenwich
    pub longitude: f64,
    /// Meters, negative below sea level
    pub altitude: Option<f64>,
}

impl GpsPosition {
    /// Decodes the position of the GPS IFD reachable from the main IFD
    ///
    /// Returns `None` when there is no GPS IFD or it lacks latitude or
    /// longitude.
    pub fn read(exif: &mut Exif) -> Result<Option<Self>> {
        let Some(gps) = exif.gps_ifd() else {
            return Ok(None);
        };

        let latitude = coordinate(exif, gps, tags::GPS_LATITUDE, tags::GPS_LATITUDE_REF, 'S')?;
        let longitude = coordinate(exif, gps, tags::GPS_LONGITUDE, tags::GPS_LONGITUDE_REF, 'W')?;
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Ok(None);
        };

        let below_sea = matches!(exif.resolve(gps, tags::GPS_ALTITUDE_REF)?.and_then(Value::as_int), Some(1));
        let altitude = match exif.resolve(gps, tags::GPS_ALTITUDE)?.and_then(Value::as_rationals) {
            Some([meters, ..]) => {
                let meters = meters.double_value()?;
                Some(if below_sea { -meters } else { meters })
            }
            _ => None,
        };

        Ok(Some(Self { latitude, longitude, altitude }))
    }

    /// Stores the position, creating the GPS IFD under the main IFD if needed
    pub fn write(&self, exif: &mut Exif) -> Result<IfdId> {
        let main = exif
            .main_ifd()
            .ok_or_else(|| Error::Unsupported("tree without a main IFD".into()))?;
        let gps = match exif.get_ifd(main, IfdKind::Gps) {
            Some(id) => id,
            None => {
                let id = exif.add_ifd(main, Ifd::new(IfdKind::Gps))?;
                put(exif.ifd_mut(id)?, tags::GPS_VERSION_ID, Value::Ints(vec![2, 3, 0, 0]))?;
                id
            }
        };

        let ifd = exif.ifd_mut(gps)?;
        let lat_ref = if self.latitude < 0.0 { "S" } else { "N" };
        put(ifd, tags::GPS_LATITUDE_REF, Value::Text(lat_ref.into()))?;
        put(ifd, tags::GPS_LATITUDE, Value::Rationals(to_dms(self.latitude)))?;

        let lon_ref = if self.longitude < 0.0 { "W" } else { "E" };
        put(ifd, tags::GPS_LONGITUDE_REF, Value::Text(lon_ref.into()))?;
        put(ifd, tags::GPS_LONGITUDE, Value::Rationals(to_dms(self.longitude)))?;

        if let Some(altitude) = self.altitude {
            let below_sea = i64::from(altitude < 0.0);
            put(ifd, tags::GPS_ALTITUDE_REF, Value::Int(below_sea))?;
            put(ifd, tags::GPS_ALTITUDE, Value::Rationals(vec![Rational::from_f64(altitude.abs())]))?;
        }

        log::debug!("Wrote GPS position {:.6}, {:.6}", self.latitude, self.longitude);
        Ok(gps)
    }
}

fn put(ifd: &mut Ifd, tag: u16, value: Value) -> Result<()> {
    match ifd.get_tag_value(tag, true)? {
        Some(entry) => entry.set_value(value),
        None => Err(Error::UnknownTag(tag)),
    }
}

fn coordinate(exif: &mut Exif, gps: IfdId, tag: u16, ref_tag: u16, negative: char) -> Result<Option<f64>> {
    let degrees = match exif.resolve(gps, tag)?.and_then(Value::as_rationals) {
        Some(parts) if !parts.is_empty() => from_dms(parts)?,
        _ => return Ok(None),
    };
    let negated = exif
        .resolve(gps, ref_tag)?
        .and_then(Value::as_text)
        .is_some_and(|r| r.starts_with(negative));
    Ok(Some(if negated { -degrees } else { degrees }))
}

fn from_dms(parts: &[Rational]) -> Result<f64> {
    let mut degrees = 0.0;
    for (part, scale) in parts.iter().zip([1.0, 60.0, 3600.0]) {
        degrees += part.double_value()? / scale;
    }
    Ok(degrees)
}

/// Degrees, minutes and hundredths of seconds
fn to_dms(value: f64) -> Vec<Rational> {
    let magnitude = value.abs();
    let mut degrees = magnitude.trunc() as i32;
    let minutes_f = (magnitude - degrees as f64) * 60.0;
    let mut minutes = minutes_f.trunc() as i32;
    let mut seconds = ((minutes_f - minutes as f64) * 60.0 * SECONDS_SCALE as f64).round() as i32;

    if seconds >= 60 * SECONDS_SCALE {
        seconds -= 60 * SECONDS_SCALE;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    vec![
        Rational::new(degrees, 1),
        Rational::new(minutes, 1),
        Rational::new(seconds, SECONDS_SCALE),
    ]
}
