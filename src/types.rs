//! Core data types for exifkit

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Denominator used when building a [`Rational`] from a floating value
pub const FLOAT_SCALE: i32 = 1000;

/// TIFF RATIONAL / SRATIONAL value
///
/// RATIONAL fields are unsigned on disk; their 32-bit patterns are kept
/// unchanged in these `i32` slots so every value survives a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: i32,
    pub denominator: i32,
}

impl Rational {
    /// Creates a rational from a numerator and denominator
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self { numerator, denominator }
    }

    /// Quantizes a double to thousandths
    ///
    /// Precision is capped at 3 decimal digits: `from_f64(1.2345)` is `1235/1000`.
    pub fn from_f64(value: f64) -> Self {
        let scaled = (value * FLOAT_SCALE as f64).round() as i32;
        Self::new(scaled, FLOAT_SCALE)
    }

    /// Quantizes a float to thousandths
    pub fn from_f32(value: f32) -> Self {
        Self::from_f64(value as f64)
    }

    pub fn double_value(&self) -> Result<f64> {
        if self.denominator == 0 {
            return Err(Error::ZeroDenominator);
        }
        Ok(self.numerator as f64 / self.denominator as f64)
    }

    pub fn float_value(&self) -> Result<f32> {
        Ok(self.double_value()? as f32)
    }

    /// Formats as an exposure time: "1/250", "2.5", "30"
    pub fn to_exposure_string(&self) -> Result<String> {
        let value = self.double_value()?;
        if self.numerator == 0 {
            return Ok("0".to_string());
        }

        let sign = if value < 0.0 { "-" } else { "" };
        let magnitude = value.abs();

        if magnitude < 1.0 {
            let reciprocal = (1.0 / magnitude).round() as i64;
            Ok(format!("{sign}1/{reciprocal}"))
        } else if magnitude.fract() == 0.0 {
            Ok(format!("{sign}{}", magnitude as i64))
        } else {
            Ok(format!("{sign}{magnitude:.1}"))
        }
    }
}

impl From<(i32, i32)> for Rational {
    fn from((numerator, denominator): (i32, i32)) -> Self {
        Self::new(numerator, denominator)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_number_from_double() {
        assert_eq!(Rational::from_f64(45.0).double_value().unwrap(), 45.0);
    }

    #[test]
    fn test_one_third() {
        let third = Rational::new(1, 3).double_value().unwrap();
        assert!((third - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_float_quantization_uses_thousandths() {
        assert_eq!(Rational::from_f64(1.2345678), Rational::new(1235, 1000));
        assert_eq!(Rational::from_f64(0.0004).double_value().unwrap(), 0.0);
        assert_eq!(Rational::from_f64(0.0006).double_value().unwrap(), 0.001);
        assert_eq!(Rational::from_f32(2.5).denominator, FLOAT_SCALE);
    }

    #[test]
    fn test_zero_denominator() {
        let r = Rational::new(5, 0);
        assert!(matches!(r.double_value(), Err(Error::ZeroDenominator)));
        assert!(r.float_value().is_err());
        assert!(r.to_exposure_string().is_err());
    }

    #[test]
    fn test_exposure_strings() {
        assert_eq!(Rational::new(1, 250).to_exposure_string().unwrap(), "1/250");
        assert_eq!(Rational::new(10, 2500).to_exposure_string().unwrap(), "1/250");
        assert_eq!(Rational::new(5, 2).to_exposure_string().unwrap(), "2.5");
        assert_eq!(Rational::new(30, 1).to_exposure_string().unwrap(), "30");
        assert_eq!(Rational::new(0, 1).to_exposure_string().unwrap(), "0");
        assert_eq!(Rational::new(-1, 4).to_exposure_string().unwrap(), "-1/4");
    }

    #[test]
    fn test_display() {
        assert_eq!(Rational::from((87, 1)).to_string(), "87/1");
    }
}
