//! Configuration types for animation packing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Longest version string a frame header can hold.
pub const VERSION_LEN: usize = 6;

fn default_enable_rle() -> bool {
    true
}

/// Pixel bit depth of a frame.
///
/// Only 1-bit frames are produced in practice; 4 and 8 bits are carried through
/// sizing and palette synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum BitDepth {
    #[default]
    One = 1,
    Four = 4,
    Eight = 8,
}

impl BitDepth {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(BitDepth::One),
            4 => Some(BitDepth::Four),
            8 => Some(BitDepth::Eight),
            _ => None,
        }
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Number of palette entries (`1 << bits`).
    #[inline]
    pub fn palette_entries(self) -> usize {
        1 << self.bits()
    }

    /// Packed byte length of a `width` x `height` frame, rounded up.
    #[inline]
    pub fn frame_bytes(self, width: usize, height: usize) -> usize {
        (width * height * self.bits() as usize).div_ceil(8)
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = ConfigError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        BitDepth::from_u8(v).ok_or(ConfigError::InvalidBitDepth(v))
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> u8 {
        depth.bits()
    }
}

/// Parameters for building one animation container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    /// Frame width in pixels.
    pub width: u16,
    /// Frame height in pixels.
    pub height: u16,
    /// Pixel bit depth.
    #[serde(default)]
    pub bit_depth: BitDepth,
    /// Number of chunks each frame payload is split into.
    pub splits: u16,
    /// Version string stored in every frame header (ASCII, at most 6 bytes).
    pub version: String,
    /// Compress payloads with RLE.
    #[serde(default = "default_enable_rle")]
    pub enable_rle: bool,
    /// Reorder frames into page/column-major layout before compression.
    #[serde(default)]
    pub column_major: bool,
    /// Palette as (B, G, R, pad) quadruplets. Empty selects the default palette.
    #[serde(default)]
    pub palette: Vec<u8>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 64,
            bit_depth: BitDepth::One,
            splits: 8,
            version: "V1.00".to_string(),
            enable_rle: true,
            column_major: false,
            palette: Vec::new(),
        }
    }
}

impl PackConfig {
    /// Expected byte length of every source frame.
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.bit_depth
            .frame_bytes(self.width as usize, self.height as usize)
    }

    /// Rows covered by one split (truncating when the height is not divisible).
    #[inline]
    pub fn split_height(&self) -> u16 {
        if self.splits > 0 {
            self.height / self.splits
        } else {
            self.height
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.splits == 0 {
            return Err(ConfigError::InvalidSplits);
        }
        if !self.version.is_ascii() || self.version.len() > VERSION_LEN {
            return Err(ConfigError::InvalidVersion(self.version.clone()));
        }
        if self.column_major {
            if self.bit_depth != BitDepth::One {
                return Err(ConfigError::TransformNeedsMonochrome(self.bit_depth.bits()));
            }
            if self.width % 8 != 0 || self.height % 8 != 0 {
                return Err(ConfigError::TransformGeometry {
                    width: self.width,
                    height: self.height,
                });
            }
        }
        Ok(())
    }

    /// Non-fatal configuration oddities worth reporting.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.splits > 0 && self.height % self.splits != 0 {
            warnings.push(format!(
                "height {} is not divisible by split count {}",
                self.height, self.splits
            ));
        }
        let palette_len = self.bit_depth.palette_entries() * 4;
        if !self.palette.is_empty() && self.palette.len() != palette_len {
            warnings.push(format!(
                "palette has {} bytes, {} expected",
                self.palette.len(),
                palette_len
            ));
        }
        warnings
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Frame width and height must be non-zero")]
    InvalidDimensions,
    #[error("Split count must be non-zero")]
    InvalidSplits,
    #[error("Unsupported bit depth {0} (expected 1, 4 or 8)")]
    InvalidBitDepth(u8),
    #[error("Version {0:?} must be ASCII and at most 6 bytes")]
    InvalidVersion(String),
    #[error("Column-major layout requires 1-bit frames, got {0}-bit")]
    TransformNeedsMonochrome(u8),
    #[error("Column-major layout requires dimensions divisible by 8, got {width}x{height}")]
    TransformGeometry { width: u16, height: u16 },
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
