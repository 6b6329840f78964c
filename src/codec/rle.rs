//! Run-length coding for bit-packed monochrome frames.
//!
//! ```text
//! encodingTag: u8 (0x01)
//! pairs: repeated (runLength: u8 in 1..=255, value: u8)
//! ```
//!
//! Runs longer than 255 bytes are split into several `(255, value)` pairs
//! followed by the remainder. Packed 1-bit data already holds 8 pixels per
//! byte, so runs are counted over whole bytes.

use std::fmt::Write as _;

use super::CodecError;

/// Tag byte prefixed to every RLE payload.
pub const ENCODING_TYPE_RLE: u8 = 0x01;

/// Longest run a single pair can describe.
pub const MAX_RUN: usize = u8::MAX as usize;

/// Encode `data` as a tagged RLE payload.
pub fn encode(data: &[u8]) -> Vec<u8> {
    // Worst case: every byte differs from its neighbour.
    let mut out = Vec::with_capacity(1 + data.len().min(4096) * 2);
    out.push(ENCODING_TYPE_RLE);

    let mut i = 0;
    while i < data.len() {
        let value = data[i];
        let run = data[i..]
            .iter()
            .take(MAX_RUN)
            .take_while(|&&b| b == value)
            .count();
        out.push(run as u8);
        out.push(value);
        i += run;
    }

    out
}

/// Decode a tagged RLE payload.
///
/// With `expected_len` set, fails before writing a run that would grow the
/// output past it. A trailing unpaired byte is ignored.
pub fn decode(compressed: &[u8], expected_len: Option<usize>) -> Result<Vec<u8>, CodecError> {
    let pairs = RlePairs::new(compressed)?;
    let mut decoded = Vec::with_capacity(expected_len.unwrap_or(compressed.len() * 2));

    for (count, value) in pairs {
        let required = decoded.len() + count as usize;
        if let Some(capacity) = expected_len {
            if required > capacity {
                return Err(CodecError::BufferOverflow { required, capacity });
            }
        }
        decoded.resize(required, value);
    }

    Ok(decoded)
}

/// Iterator over the `(count, value)` pairs of a tagged RLE payload.
#[derive(Debug, Clone)]
pub struct RlePairs<'a> {
    body: &'a [u8],
}

impl<'a> RlePairs<'a> {
    /// Check the encoding tag and iterate over the pairs after it.
    pub fn new(compressed: &'a [u8]) -> Result<Self, CodecError> {
        match compressed.split_first() {
            None => Err(CodecError::Empty),
            Some((&ENCODING_TYPE_RLE, body)) => Ok(Self { body }),
            Some((&tag, _)) => Err(CodecError::UnknownEncoding(tag)),
        }
    }

    /// Bytes after the tag that do not form a complete pair.
    pub fn trailing(&self) -> usize {
        self.body.len() % 2
    }
}

impl Iterator for RlePairs<'_> {
    type Item = (u8, u8);

    fn next(&mut self) -> Option<Self::Item> {
        if self.body.len() < 2 {
            return None;
        }
        let (pair, rest) = self.body.split_at(2);
        self.body = rest;
        Some((pair[0], pair[1]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.body.len() / 2;
        (n, Some(n))
    }
}

impl ExactSizeIterator for RlePairs<'_> {}

/// Render the first `max_pairs` pairs of an RLE payload for debug output.
pub fn describe(compressed: &[u8], max_pairs: usize) -> String {
    let pairs = match RlePairs::new(compressed) {
        Ok(pairs) => pairs,
        Err(e) => return format!("unreadable RLE data: {e}"),
    };

    let mut out = String::new();
    let total = pairs.len();
    let _ = writeln!(
        out,
        "encoding 0x{:02X}, {} payload bytes, {} pairs",
        ENCODING_TYPE_RLE,
        compressed.len() - 1,
        total
    );
    for (i, (count, value)) in pairs.clone().take(max_pairs).enumerate() {
        let _ = writeln!(out, "  pair {i}: count={count}, value=0x{value:02X} ({value:08b})");
    }
    if total > max_pairs {
        let _ = writeln!(out, "  ... {} more pairs", total - max_pairs);
    }
    if pairs.trailing() > 0 {
        let _ = writeln!(out, "  trailing unpaired byte ignored");
    }
    out
}

/// Render the first `max_bytes` bytes of a packed 1-bit buffer as pixel rows.
pub fn describe_packed(data: &[u8], max_bytes: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} bytes", data.len());
    for (i, &byte) in data.iter().take(max_bytes).enumerate() {
        let pixels: String = (0..8)
            .rev()
            .map(|bit| if (byte >> bit) & 1 == 1 { '#' } else { '.' })
            .collect();
        let _ = writeln!(out, "  byte {i:03}: 0x{byte:02X} | {byte:08b} | {pixels}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&[]), vec![ENCODING_TYPE_RLE]);
        assert_eq!(decode(&[ENCODING_TYPE_RLE], None).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_mixed_pattern() {
        let data = [0xFF, 0xFF, 0x00, 0x00, 0xAA, 0xAA];
        let encoded = encode(&data);
        assert_eq!(encoded, vec![0x01, 2, 0xFF, 2, 0x00, 2, 0xAA]);
        assert_eq!(decode(&encoded, Some(data.len())).unwrap(), data);
    }

    #[test]
    fn test_long_run_split() {
        let data = vec![0x55u8; 600];
        let encoded = encode(&data);
        assert_eq!(encoded, vec![0x01, 255, 0x55, 255, 0x55, 90, 0x55]);
        assert_eq!(decode(&encoded, None).unwrap(), data);
    }

    #[test]
    fn test_exact_255_run() {
        let encoded = encode(&[7u8; 255]);
        assert_eq!(encoded, vec![0x01, 255, 7]);
    }

    #[test]
    fn test_decode_empty_input() {
        let err = decode(&[], None).unwrap_err();
        assert_eq!(err, CodecError::Empty);
        assert!(err.is_format_error());
    }

    #[test]
    fn test_decode_unknown_tag() {
        let err = decode(&[0x02, 1, 1], None).unwrap_err();
        assert_eq!(err, CodecError::UnknownEncoding(0x02));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_decode_overflow() {
        let err = decode(&[0x01, 3, 0xAA, 3, 0xBB], Some(5)).unwrap_err();
        assert_eq!(
            err,
            CodecError::BufferOverflow {
                required: 6,
                capacity: 5
            }
        );
        assert!(!err.is_format_error());
    }

    #[test]
    fn test_decode_exact_capacity() {
        let decoded = decode(&[0x01, 3, 0xAA, 2, 0xBB], Some(5)).unwrap();
        assert_eq!(decoded, vec![0xAA, 0xAA, 0xAA, 0xBB, 0xBB]);
    }

    #[test]
    fn test_decode_ignores_trailing_byte() {
        let decoded = decode(&[0x01, 2, 0x10, 9], None).unwrap();
        assert_eq!(decoded, vec![0x10, 0x10]);
        assert_eq!(RlePairs::new(&[0x01, 2, 0x10, 9]).unwrap().trailing(), 1);
    }

    #[test]
    fn test_zero_count_pair_is_noop() {
        let decoded = decode(&[0x01, 0, 0x10, 1, 0x20], None).unwrap();
        assert_eq!(decoded, vec![0x20]);
    }

    #[test]
    fn test_describe() {
        let text = describe(&encode(&[1, 1, 2]), 1);
        assert!(text.contains("2 pairs"));
        assert!(text.contains("pair 0: count=2, value=0x01"));
        assert!(text.contains("1 more pairs"));

        assert!(describe(&[], 4).contains("unreadable"));
        assert!(describe_packed(&[0b1000_0001], 1).contains("#......#"));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let encoded = encode(&data);
            prop_assert_eq!(decode(&encoded, Some(data.len())).unwrap(), data);
        }

        #[test]
        fn prop_runs_are_clamped(value in any::<u8>(), len in 255usize..2000) {
            let encoded = encode(&vec![value; len]);
            let pairs: Vec<_> = RlePairs::new(&encoded).unwrap().collect();
            prop_assert_eq!(pairs.len(), len.div_ceil(MAX_RUN));
            for (i, &(count, v)) in pairs.iter().enumerate() {
                prop_assert_eq!(v, value);
                prop_assert!(count >= 1);
                if i + 1 < pairs.len() {
                    prop_assert_eq!(count, 255);
                }
            }
        }

        #[test]
        fn prop_adjacent_pairs_differ_unless_full(
            data in proptest::collection::vec(0u8..3, 1..1024),
        ) {
            let encoded = encode(&data);
            let pairs: Vec<_> = RlePairs::new(&encoded).unwrap().collect();
            for w in pairs.windows(2) {
                prop_assert!(w[0].1 != w[1].1 || w[0].0 == 255);
            }
        }
    }
}
