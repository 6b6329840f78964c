//! Row-major to column-major conversion of whole listings.

use log::{info, warn};

use crate::codec::bitplane::{self, PixelMismatch};
use crate::codec::CodecError;
use crate::schema::NamedBuffers;

/// Errors that stop a listing conversion before any array is read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColumnsError {
    #[error("Image dimensions must be non-zero multiples of 8, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
}

/// Check that a `width` x `height` image can be cut into 8-pixel pages.
pub fn check_dimensions(width: usize, height: usize) -> Result<(), ColumnsError> {
    if width == 0 || height == 0 || width % 8 != 0 || height % 8 != 0 {
        return Err(ColumnsError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Outcome for one array of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOutcome {
    /// Converted; `mismatches` lists pixels the verification pass disagreed on.
    Converted { mismatches: Vec<PixelMismatch> },
    /// Name declared without data.
    Missing,
    SizeMismatch { expected: usize, actual: usize },
    Failed(CodecError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    pub name: String,
    pub outcome: ColumnOutcome,
}

impl ColumnReport {
    /// Converted without a single pixel mismatch.
    pub fn is_verified(&self) -> bool {
        matches!(&self.outcome, ColumnOutcome::Converted { mismatches } if mismatches.is_empty())
    }
}

/// Converted arrays plus one report per source name.
#[derive(Debug, Clone, Default)]
pub struct ColumnConversion {
    /// Converted arrays in source order.
    pub arrays: Vec<(String, Vec<u8>)>,
    pub reports: Vec<ColumnReport>,
}

impl ColumnConversion {
    pub fn verified_count(&self) -> usize {
        self.reports.iter().filter(|r| r.is_verified()).count()
    }
}

/// Convert every array of `buffers` from row-major to page/column-major order.
///
/// Fails up front on dimensions rejected by [`check_dimensions`]. Arrays of
/// the wrong size are reported and left out. Arrays whose verification finds
/// mismatching pixels are still emitted; the report carries the mismatches.
pub fn convert_listing(
    buffers: &NamedBuffers,
    width: usize,
    height: usize,
) -> Result<ColumnConversion, ColumnsError> {
    check_dimensions(width, height)?;
    let expected = width * height / 8;
    let mut conversion = ColumnConversion::default();

    for (name, data) in buffers.iter() {
        let outcome = match data {
            None => ColumnOutcome::Missing,
            Some(data) if data.len() != expected => ColumnOutcome::SizeMismatch {
                expected,
                actual: data.len(),
            },
            Some(data) => match convert_one(data, width, height) {
                Ok((columns, mismatches)) => {
                    conversion.arrays.push((name.to_string(), columns));
                    ColumnOutcome::Converted { mismatches }
                }
                Err(e) => ColumnOutcome::Failed(e),
            },
        };

        match &outcome {
            ColumnOutcome::Converted { mismatches } if mismatches.is_empty() => {
                info!("{name}: converted, verification passed")
            }
            ColumnOutcome::Converted { mismatches } => {
                let mut rows: Vec<usize> = mismatches.iter().map(|m| m.y).collect();
                rows.dedup();
                rows.truncate(5);
                warn!(
                    "{name}: converted with {} mismatching pixels, rows {:?}...",
                    mismatches.len(),
                    rows
                );
            }
            ColumnOutcome::Missing => warn!("{name}: no data, skipped"),
            ColumnOutcome::SizeMismatch { expected, actual } => {
                warn!("{name}: {actual} bytes, expected {expected}, skipped")
            }
            ColumnOutcome::Failed(e) => warn!("{name}: conversion failed: {e}"),
        }

        conversion.reports.push(ColumnReport {
            name: name.to_string(),
            outcome,
        });
    }

    info!(
        "Converted {}/{} arrays with clean verification",
        conversion.verified_count(),
        conversion.reports.len()
    );
    Ok(conversion)
}

fn convert_one(
    data: &[u8],
    width: usize,
    height: usize,
) -> Result<(Vec<u8>, Vec<PixelMismatch>), CodecError> {
    let columns = bitplane::to_column_major(data, width, height)?;
    let mismatches = bitplane::verify_column_major(data, &columns, width, height)?;
    Ok((columns, mismatches))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_listing() {
        let mut buffers = NamedBuffers::new();
        buffers.insert("blank", vec![0u8; 16]);
        buffers.insert("short", vec![0u8; 3]);
        buffers.declare("ghost");
        let mut dot = vec![0u8; 16];
        dot[0] = 0x80;
        buffers.insert("dot", dot);

        let conversion = convert_listing(&buffers, 16, 8).unwrap();
        assert_eq!(conversion.reports.len(), 4);
        assert_eq!(conversion.verified_count(), 2);
        assert_eq!(
            conversion.reports[1].outcome,
            ColumnOutcome::SizeMismatch {
                expected: 16,
                actual: 3
            }
        );
        assert_eq!(conversion.reports[2].outcome, ColumnOutcome::Missing);

        let names: Vec<_> = conversion.arrays.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["blank", "dot"]);
        assert_eq!(conversion.arrays[1].1[0], 0x01);
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        let buffers: NamedBuffers = [("odd", vec![0u8; 12])].into_iter().collect();
        for (width, height) in [(12, 8), (8, 12), (0, 8), (8, 0)] {
            assert_eq!(
                convert_listing(&buffers, width, height).unwrap_err(),
                ColumnsError::InvalidDimensions { width, height }
            );
        }
        assert!(check_dimensions(128, 64).is_ok());
    }

    #[test]
    fn test_mismatched_pixels_reported() {
        // Pixel (2, 5) set only in the converted buffer.
        let src = vec![0u8; 8];
        let mut converted = bitplane::to_column_major(&src, 8, 8).unwrap();
        converted[2] |= 1 << 5;
        let mismatches = bitplane::verify_column_major(&src, &converted, 8, 8).unwrap();
        let report = ColumnReport {
            name: "glitch".to_string(),
            outcome: ColumnOutcome::Converted { mismatches },
        };
        assert!(!report.is_verified());
    }
}
