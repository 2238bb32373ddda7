//! Container formats

pub mod jpeg;
pub mod tiff;
