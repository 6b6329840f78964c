//! Codec module - Byte-level transforms applied to frame payloads.
//!
//! - `rle`: tagged `(count, value)` run-length coding for packed 1-bit data
//! - `bitplane`: row-major to page/column-major reordering for page-addressed
//!   display controllers

pub mod bitplane;
pub mod rle;

pub use bitplane::{column_major_pixel, row_major_pixel, to_column_major, verify_column_major};
pub use rle::{ENCODING_TYPE_RLE, RlePairs};

/// Error type for codec operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid RLE data: input is empty")]
    Empty,

    #[error("Unsupported encoding type: 0x{0:02X}")]
    UnknownEncoding(u8),

    #[error("Output buffer overflow: {required} > {capacity}")]
    BufferOverflow { required: usize, capacity: usize },

    #[error("Bit-plane transform needs 8-aligned geometry, got {width}x{height} with {len} bytes")]
    InvalidGeometry {
        width: usize,
        height: usize,
        len: usize,
    },
}

impl CodecError {
    /// True for the errors raised by a missing or unknown encoding tag.
    pub fn is_format_error(&self) -> bool {
        matches!(self, CodecError::Empty | CodecError::UnknownEncoding(_))
    }
}
