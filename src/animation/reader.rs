//! Whole-buffer reader for animation containers.

use std::io::{self, Cursor};

use super::format::{ContainerHeader, FrameHeader, checksum, parse_frame_record};
use crate::codec::{CodecError, ENCODING_TYPE_RLE, rle};

/// Errors raised while reading a container back.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Malformed container: {0}")]
    Io(#[from] io::Error),

    #[error("Frame {index} expected at offset {expected}, table says {found}")]
    Misplaced {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Frame {index} extends past the end of the container")]
    OutOfBounds { index: usize },

    #[error("{0} trailing bytes after the last frame")]
    TrailingData(usize),

    #[error("Checksum mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("Frame index {index} out of range ({count} frames)")]
    FrameIndex { index: usize, count: usize },

    #[error("Split lengths sum to {sum} but payload has {len} bytes")]
    SplitMismatch { sum: usize, len: usize },

    #[error("Payload of {len} bytes reads as both RLE and raw pixels")]
    AmbiguousPayload { len: usize },

    #[error("Payload of {len} bytes is neither RLE nor {expected} raw bytes")]
    UndecodablePayload {
        len: usize,
        expected: usize,
        rle: Option<CodecError>,
    },
}

/// How a frame payload is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Rle,
    Raw,
}

/// One frame record borrowed from a container.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub header: FrameHeader,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Expected size of the decoded pixel buffer.
    pub fn pixel_bytes(&self) -> usize {
        self.header
            .bit_depth
            .frame_bytes(self.header.width as usize, self.header.height as usize)
    }

    /// Payload cut at the split lengths.
    pub fn splits(&self) -> Result<Vec<&'a [u8]>, ReadError> {
        let sum: usize = self.header.split_lengths.iter().map(|&l| l as usize).sum();
        if sum != self.payload.len() {
            return Err(ReadError::SplitMismatch {
                sum,
                len: self.payload.len(),
            });
        }

        let mut rest = self.payload;
        Ok(self
            .header
            .split_lengths
            .iter()
            .map(|&len| {
                let (chunk, tail) = rest.split_at(len as usize);
                rest = tail;
                chunk
            })
            .collect())
    }

    /// Decode the payload into packed pixels.
    ///
    /// The container does not flag compression; a payload counts as RLE when
    /// it carries the tag and decodes to exactly the frame size, and as raw
    /// when its length equals the frame size. A payload that satisfies both
    /// fails with [`ReadError::AmbiguousPayload`]; use [`Frame::decode_as`]
    /// when the encoding is known.
    pub fn decode(&self) -> Result<(PayloadEncoding, Vec<u8>), ReadError> {
        let expected = self.pixel_bytes();
        let raw_fits = self.payload.len() == expected;

        let rle_error = if self.payload.first() == Some(&ENCODING_TYPE_RLE) {
            match rle::decode(self.payload, Some(expected)) {
                Ok(pixels) if pixels.len() == expected => {
                    if raw_fits {
                        return Err(ReadError::AmbiguousPayload {
                            len: self.payload.len(),
                        });
                    }
                    return Ok((PayloadEncoding::Rle, pixels));
                }
                Ok(_) => None,
                Err(e) => Some(e),
            }
        } else {
            None
        };

        if raw_fits {
            return Ok((PayloadEncoding::Raw, self.payload.to_vec()));
        }

        Err(ReadError::UndecodablePayload {
            len: self.payload.len(),
            expected,
            rle: rle_error,
        })
    }

    /// Decode the payload with a known encoding.
    pub fn decode_as(&self, encoding: PayloadEncoding) -> Result<Vec<u8>, ReadError> {
        let expected = self.pixel_bytes();
        let undecodable = |rle| ReadError::UndecodablePayload {
            len: self.payload.len(),
            expected,
            rle,
        };

        match encoding {
            PayloadEncoding::Rle => match rle::decode(self.payload, Some(expected)) {
                Ok(pixels) if pixels.len() == expected => Ok(pixels),
                Ok(_) => Err(undecodable(None)),
                Err(e) => Err(undecodable(Some(e))),
            },
            PayloadEncoding::Raw if self.payload.len() == expected => Ok(self.payload.to_vec()),
            PayloadEncoding::Raw => Err(undecodable(None)),
        }
    }
}

/// Reader over a complete container held in memory.
///
/// Usage:
/// ```ignore
/// let bytes = std::fs::read("anim.bin")?;
/// let reader = AnimationReader::new(&bytes)?;
/// for frame in reader.frames() {
///     let (_, pixels) = frame?.decode()?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AnimationReader<'a> {
    bytes: &'a [u8],
    header: ContainerHeader,
}

impl<'a> AnimationReader<'a> {
    /// Parse the container header and verify offsets and checksum.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ReadError> {
        let header = ContainerHeader::read_from(&mut Cursor::new(bytes))?;

        let mut expected = header.size();
        for (index, entry) in header.entries.iter().enumerate() {
            let offset = entry.offset as usize;
            if offset != expected {
                return Err(ReadError::Misplaced {
                    index,
                    expected,
                    found: offset,
                });
            }
            expected = offset + entry.size as usize;
            if expected > bytes.len() {
                return Err(ReadError::OutOfBounds { index });
            }
        }
        if expected < bytes.len() {
            return Err(ReadError::TrailingData(bytes.len() - expected));
        }

        let computed = checksum(&bytes[header.size()..]);
        if computed != header.checksum {
            return Err(ReadError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }

        Ok(Self { bytes, header })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count()
    }

    /// Read a specific frame by index.
    pub fn frame(&self, index: usize) -> Result<Frame<'a>, ReadError> {
        let entry = self.header.entries.get(index).ok_or(ReadError::FrameIndex {
            index,
            count: self.frame_count(),
        })?;

        let start = entry.offset as usize;
        let record = &self.bytes[start..start + entry.size as usize];
        let (header, payload) = parse_frame_record(record)?;
        Ok(Frame { header, payload })
    }

    /// Iterate over all frames in order.
    pub fn frames(&self) -> impl Iterator<Item = Result<Frame<'a>, ReadError>> + '_ {
        (0..self.frame_count()).map(|i| self.frame(i))
    }
}
