//! Bit-plane transform between row-major and page/column-major 1-bit layouts.
//!
//! Row-major input packs 8 horizontal pixels per byte, most significant bit
//! first. Page-addressed controllers (SSD1306 and friends) expect the image
//! cut into 8-row pages, each page a run of `width` bytes where every byte is
//! one column of 8 vertical pixels, least significant bit on top:
//!
//! ```text
//! row-major:    byte[y * width/8 + x/8], bit 7 - x%8
//! column-major: byte[x + (y/8) * width], bit y%8
//! ```

use super::CodecError;

/// A pixel whose value differs between the source and the transformed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMismatch {
    pub x: usize,
    pub y: usize,
    pub original: u8,
    pub converted: u8,
}

/// Read pixel `(x, y)` from a row-major, MSB-first 1-bit buffer.
#[inline]
pub fn row_major_pixel(data: &[u8], width: usize, x: usize, y: usize) -> u8 {
    let bytes_per_row = width / 8;
    (data[y * bytes_per_row + x / 8] >> (7 - x % 8)) & 1
}

/// Read pixel `(x, y)` from a page/column-major, LSB-first 1-bit buffer.
#[inline]
pub fn column_major_pixel(data: &[u8], width: usize, x: usize, y: usize) -> u8 {
    (data[x + (y / 8) * width] >> (y % 8)) & 1
}

fn check_geometry(data: &[u8], width: usize, height: usize) -> Result<(), CodecError> {
    if width % 8 != 0 || height % 8 != 0 || data.len() != width * height / 8 {
        return Err(CodecError::InvalidGeometry {
            width,
            height,
            len: data.len(),
        });
    }
    Ok(())
}

/// Reorder a row-major bitmap into page/column-major order.
pub fn to_column_major(
    row_major: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<u8>, CodecError> {
    check_geometry(row_major, width, height)?;

    let mut out = vec![0u8; row_major.len()];
    if width == 0 {
        return Ok(out);
    }
    for (page, columns) in out.chunks_mut(width).enumerate() {
        for (x, column) in columns.iter_mut().enumerate() {
            *column = (0..8).fold(0u8, |byte, bit| {
                byte | row_major_pixel(row_major, width, x, page * 8 + bit) << bit
            });
        }
    }

    Ok(out)
}

/// Reorder a page/column-major bitmap back into row-major order.
pub fn from_column_major(
    column_major: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<u8>, CodecError> {
    check_geometry(column_major, width, height)?;

    let bytes_per_row = width / 8;
    let mut out = vec![0u8; column_major.len()];
    if bytes_per_row == 0 {
        return Ok(out);
    }
    for (y, row) in out.chunks_mut(bytes_per_row).enumerate() {
        for (xb, byte) in row.iter_mut().enumerate() {
            *byte = (0..8).fold(0u8, |acc, i| {
                acc | column_major_pixel(column_major, width, xb * 8 + i, y) << (7 - i)
            });
        }
    }

    Ok(out)
}

/// Compare every pixel of `row_major` with its counterpart in `column_major`.
///
/// Returns all disagreeing pixels in row order; an empty result means the
/// transform was exact.
pub fn verify_column_major(
    row_major: &[u8],
    column_major: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<PixelMismatch>, CodecError> {
    check_geometry(row_major, width, height)?;
    check_geometry(column_major, width, height)?;

    let mut mismatches = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let original = row_major_pixel(row_major, width, x, y);
            let converted = column_major_pixel(column_major, width, x, y);
            if original != converted {
                mismatches.push(PixelMismatch {
                    x,
                    y,
                    original,
                    converted,
                });
            }
        }
    }
    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_top_left_pixel() {
        // 16x8: only pixel (0, 0) set.
        let mut src = vec![0u8; 16];
        src[0] = 0b1000_0000;
        let out = to_column_major(&src, 16, 8).unwrap();
        assert_eq!(out[0], 0b0000_0001);
        assert!(out[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_vertical_line_becomes_full_byte() {
        // 8x16: column 3 set on every row.
        let src = vec![0b0001_0000u8; 16];
        let out = to_column_major(&src, 8, 16).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn test_second_page_placement() {
        // 8x16: pixel (7, 9) lands in page 1, column 7, bit 1.
        let mut src = vec![0u8; 16];
        src[9] = 0b0000_0001;
        let out = to_column_major(&src, 8, 16).unwrap();
        assert_eq!(out[8 + 7], 0b0000_0010);
        assert_eq!(out.iter().filter(|&&b| b != 0).count(), 1);
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(matches!(
            to_column_major(&[0u8; 8], 12, 8),
            Err(CodecError::InvalidGeometry { width: 12, .. })
        ));
        assert!(matches!(
            to_column_major(&[0u8; 7], 8, 8),
            Err(CodecError::InvalidGeometry { len: 7, .. })
        ));
    }

    #[test]
    fn test_verify_reports_mismatch() {
        let src = vec![0u8; 8];
        let mut converted = to_column_major(&src, 8, 8).unwrap();
        converted[2] |= 1 << 5;
        let mismatches = verify_column_major(&src, &converted, 8, 8).unwrap();
        assert_eq!(
            mismatches,
            vec![PixelMismatch {
                x: 2,
                y: 5,
                original: 0,
                converted: 1
            }]
        );
    }

    fn bitmap() -> impl Strategy<Value = (usize, usize, Vec<u8>)> {
        (1usize..6, 1usize..5).prop_flat_map(|(w, h)| {
            let (width, height) = (w * 8, h * 8);
            proptest::collection::vec(any::<u8>(), width * height / 8)
                .prop_map(move |data| (width, height, data))
        })
    }

    proptest! {
        #[test]
        fn prop_transform_preserves_pixels((width, height, src) in bitmap()) {
            let out = to_column_major(&src, width, height).unwrap();
            prop_assert!(verify_column_major(&src, &out, width, height).unwrap().is_empty());
        }

        #[test]
        fn prop_inverse_restores_source((width, height, src) in bitmap()) {
            let out = to_column_major(&src, width, height).unwrap();
            prop_assert_eq!(from_column_major(&out, width, height).unwrap(), src);
        }
    }
}
