//! I/O utilities for exifkit
//!
//! Provides the byte-order codec and the seekable sources the reader
//! and lazily loaded values work against.

pub mod traits;
pub mod byte_order;
pub mod source;

pub use traits::{DataSource, SeekableReader};
pub use byte_order::{ByteOrder, ByteOrderHandler};
pub use source::StreamSource;
