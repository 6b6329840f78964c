//! Animation containers for page-addressed monochrome displays.
//!
//! A container packs a sequence of equally sized frames, each optionally
//! reordered into page/column layout and RLE-compressed, behind an offset
//! table and an additive checksum. The display runtime locates a frame via the
//! table and streams its payload split by split.
//!
//! # File Format
//!
//! All integers are little-endian.
//!
//! ```text
//! Container header (12 + frame_count * 8 bytes):
//!   Frame count: u32
//!   Checksum: u32 (sum of every frame record byte, mod 2^32)
//!   Offset table length: u32 (frame_count * 8)
//!   Offset table (frame_count entries):
//!     Frame size: u32
//!     Frame offset: u32 (from start of container)
//!
//! Frame record (variable):
//!   Magic: u16 = 0x5A5A
//!   Format: "_S\0" (3 bytes)
//!   Version: 6 bytes ASCII, zero-padded
//!   Bit depth: u8
//!   Width: u16
//!   Height: u16
//!   Splits: u16
//!   Split height: u16
//!   Split lengths: u16 * splits
//!   Palette: (1 << bit depth) * 4 bytes (B, G, R, pad)
//!   Payload: RLE (tag 0x01, then (count, value) pairs) or raw pixels
//! ```

mod assembler;
mod format;
mod reader;

pub use assembler::{
    AnimationAssembler, AssembleError, AssemblyStats, ByteMismatch, FrameOutcome, FrameReport,
    PackedAnimation, RoundTripFailure, SkipReason, TransformFailure,
};
pub use format::{
    ContainerHeader, FRAME_FORMAT, FRAME_MAGIC, FrameHeader, OffsetEntry, checksum,
    default_palette, frame_record, normalize_palette, parse_frame_record, split_lengths,
};
pub use reader::{AnimationReader, Frame, PayloadEncoding, ReadError};
