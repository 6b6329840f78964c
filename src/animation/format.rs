//! Binary format definitions for animation containers.

use std::io::{self, Read, Write};

use crate::schema::{BitDepth, PackConfig, VERSION_LEN};

/// Magic value opening every frame record.
pub const FRAME_MAGIC: u16 = 0x5A5A;

/// Frame format tag ("_S" padded to 3 bytes).
pub const FRAME_FORMAT: &[u8; 3] = b"_S\0";

/// Build the palette used when none (or too little) is supplied.
///
/// 1-bit frames get black and white, deeper frames a linear gray ramp. Entries
/// are (B, G, R, pad).
pub fn default_palette(depth: BitDepth) -> Vec<u8> {
    let gray = |level: u8| [level, level, level, 0];
    match depth {
        BitDepth::One => [0u8, 255].into_iter().flat_map(gray).collect(),
        BitDepth::Four => (0u8..16).map(|i| i * 17).flat_map(gray).collect(),
        BitDepth::Eight => (0u8..=255).flat_map(gray).collect(),
    }
}

/// Fit a supplied palette to `depth`: regenerate if short, truncate if long.
pub fn normalize_palette(depth: BitDepth, supplied: &[u8]) -> Vec<u8> {
    let len = depth.palette_entries() * 4;
    if supplied.len() < len {
        default_palette(depth)
    } else {
        supplied[..len].to_vec()
    }
}

/// Split a payload of `len` bytes into `splits` chunk lengths.
///
/// The first `splits - 1` chunks get `len / splits` bytes and the last one the
/// remainder. Chunks may be empty when `len < splits`.
pub fn split_lengths(len: usize, splits: usize) -> Vec<usize> {
    if splits <= 1 {
        return vec![len];
    }
    let chunk = len / splits;
    let mut lengths = vec![chunk; splits];
    lengths[splits - 1] = len - chunk * (splits - 1);
    lengths
}

/// Additive byte checksum, modulo 2^32.
///
/// Checksums of consecutive slices combine with `wrapping_add`.
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

/// Per-frame metadata serialized between the frame magic and the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Version string, zero-padded.
    pub version: [u8; VERSION_LEN],
    pub bit_depth: BitDepth,
    pub width: u16,
    pub height: u16,
    /// Rows covered by one split.
    pub split_height: u16,
    /// Payload byte count of each split; its length is the split count.
    pub split_lengths: Vec<u16>,
    /// Palette as (B, G, R, pad) quadruplets.
    pub palette: Vec<u8>,
}

impl FrameHeader {
    /// Size of the fixed part: format(3) + version(6) + depth(1) + width(2) +
    /// height(2) + splits(2) + split height(2) = 18
    pub const FIXED_SIZE: usize = 18;

    /// Header for a frame of `config`, before split lengths are known.
    pub fn new(config: &PackConfig) -> Self {
        Self {
            version: pad_version(&config.version),
            bit_depth: config.bit_depth,
            width: config.width,
            height: config.height,
            split_height: config.split_height(),
            split_lengths: Vec::new(),
            palette: normalize_palette(config.bit_depth, &config.palette),
        }
    }

    /// Version with the zero padding stripped.
    pub fn version_str(&self) -> String {
        let end = self.version.iter().position(|&b| b == 0).unwrap_or(VERSION_LEN);
        String::from_utf8_lossy(&self.version[..end]).into_owned()
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        Self::FIXED_SIZE + self.split_lengths.len() * 2 + self.bit_depth.palette_entries() * 4
    }

    /// Serialize the header (without the frame magic).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.extend_from_slice(FRAME_FORMAT);
        out.extend_from_slice(&self.version);
        out.push(self.bit_depth.bits());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&(self.split_lengths.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.split_height.to_le_bytes());
        for len in &self.split_lengths {
            out.extend_from_slice(&len.to_le_bytes());
        }
        out.extend_from_slice(&normalize_palette(self.bit_depth, &self.palette));
        out
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut format = [0u8; 3];
        r.read_exact(&mut format)?;
        if &format != FRAME_FORMAT {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown frame format tag: {:02X?}", format),
            ));
        }

        let mut version = [0u8; VERSION_LEN];
        r.read_exact(&mut version)?;

        let mut buf1 = [0u8; 1];
        r.read_exact(&mut buf1)?;
        let bit_depth = BitDepth::from_u8(buf1[0]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported bit depth: {}", buf1[0]),
            )
        })?;

        let width = read_u16(r)?;
        let height = read_u16(r)?;
        let splits = read_u16(r)?;
        let split_height = read_u16(r)?;

        let split_lengths = (0..splits)
            .map(|_| read_u16(r))
            .collect::<io::Result<Vec<_>>>()?;

        let mut palette = vec![0u8; bit_depth.palette_entries() * 4];
        r.read_exact(&mut palette)?;

        Ok(Self {
            version,
            bit_depth,
            width,
            height,
            split_height,
            split_lengths,
            palette,
        })
    }
}

fn pad_version(version: &str) -> [u8; VERSION_LEN] {
    let mut out = [0u8; VERSION_LEN];
    let bytes = version.as_bytes();
    let n = bytes.len().min(VERSION_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf2 = [0u8; 2];
    r.read_exact(&mut buf2)?;
    Ok(u16::from_le_bytes(buf2))
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf4 = [0u8; 4];
    r.read_exact(&mut buf4)?;
    Ok(u32::from_le_bytes(buf4))
}

/// Serialize a complete frame record: magic, header, payload.
pub fn frame_record(header: &FrameHeader, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + header.size() + payload.len());
    out.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    out
}

/// Split a frame record into its header and payload.
pub fn parse_frame_record(record: &[u8]) -> io::Result<(FrameHeader, &[u8])> {
    let mut cursor = io::Cursor::new(record);
    let magic = read_u16(&mut cursor)?;
    if magic != FRAME_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid frame magic: 0x{magic:04X}"),
        ));
    }
    let header = FrameHeader::read_from(&mut cursor)?;
    let start = cursor.position() as usize;
    Ok((header, &record[start..]))
}

/// Offset table entry for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEntry {
    /// Frame record size in bytes.
    pub size: u32,
    /// Byte offset from start of container.
    pub offset: u32,
}

impl OffsetEntry {
    /// Size of one table entry in bytes.
    pub const SIZE: usize = 8;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..4].copy_from_slice(&self.size.to_le_bytes());
        out[4..].copy_from_slice(&self.offset.to_le_bytes());
        out
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let size = read_u32(r)?;
        let offset = read_u32(r)?;
        Ok(Self { size, offset })
    }
}

/// Container-level metadata preceding all frame records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Sum of every frame record byte, modulo 2^32.
    pub checksum: u32,
    /// One entry per frame, in frame order.
    pub entries: Vec<OffsetEntry>,
}

impl ContainerHeader {
    /// Size of the fixed part: frame count(4) + checksum(4) + table length(4).
    pub const FIXED_SIZE: usize = 12;

    pub fn frame_count(&self) -> usize {
        self.entries.len()
    }

    /// Offset table length in bytes.
    pub fn table_length(&self) -> usize {
        self.entries.len() * OffsetEntry::SIZE
    }

    /// Serialized size, which is also the offset of the first frame.
    pub fn size(&self) -> usize {
        Self::header_size(self.entries.len())
    }

    /// Header size of a container holding `frame_count` frames.
    pub fn header_size(frame_count: usize) -> usize {
        Self::FIXED_SIZE + frame_count * OffsetEntry::SIZE
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.extend_from_slice(&(self.frame_count() as u32).to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.extend_from_slice(&(self.table_length() as u32).to_le_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.to_bytes());
        }
        out
    }

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let frame_count = read_u32(r)? as usize;
        let checksum = read_u32(r)?;
        let table_length = read_u32(r)? as usize;
        if table_length != frame_count * OffsetEntry::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Offset table length {} does not match {} frames",
                    table_length, frame_count
                ),
            ));
        }

        let entries = (0..frame_count)
            .map(|_| OffsetEntry::read_from(r))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self { checksum, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_default_palettes() {
        assert_eq!(
            default_palette(BitDepth::One),
            vec![0, 0, 0, 0, 255, 255, 255, 0]
        );

        let p4 = default_palette(BitDepth::Four);
        assert_eq!(p4.len(), 64);
        assert_eq!(&p4[4..8], &[17, 17, 17, 0]);
        assert_eq!(&p4[60..64], &[255, 255, 255, 0]);

        let p8 = default_palette(BitDepth::Eight);
        assert_eq!(p8.len(), 1024);
        assert_eq!(&p8[4 * 200..4 * 201], &[200, 200, 200, 0]);
    }

    #[test]
    fn test_normalize_palette() {
        // Short palettes are replaced, long ones truncated.
        assert_eq!(
            normalize_palette(BitDepth::One, &[1, 2, 3]),
            default_palette(BitDepth::One)
        );
        let long: Vec<u8> = (0..12).collect();
        assert_eq!(normalize_palette(BitDepth::One, &long), (0..8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_split_lengths() {
        assert_eq!(split_lengths(17, 8), vec![2, 2, 2, 2, 2, 2, 2, 3]);
        assert_eq!(split_lengths(17, 1), vec![17]);
        assert_eq!(split_lengths(17, 0), vec![17]);
        assert_eq!(split_lengths(3, 4), vec![0, 0, 0, 3]);
        assert_eq!(split_lengths(0, 2), vec![0, 0]);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[1, 2, 255]), 258);
        let big = vec![0xFFu8; 16_843_010];
        // 0xFF * 16_843_010 = 0x1_0000_00FE
        assert_eq!(checksum(&big), 0xFE);
    }

    #[test]
    fn test_frame_header_layout() {
        let config = PackConfig {
            width: 128,
            height: 64,
            splits: 2,
            version: "V1.00".to_string(),
            ..Default::default()
        };
        let mut header = FrameHeader::new(&config);
        header.split_lengths = vec![0x0102, 0x0304];

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), header.size());
        assert_eq!(bytes.len(), 18 + 4 + 8);
        assert_eq!(&bytes[0..3], b"_S\0");
        assert_eq!(&bytes[3..9], b"V1.00\0");
        assert_eq!(bytes[9], 1);
        assert_eq!(&bytes[10..12], &[128, 0]);
        assert_eq!(&bytes[12..14], &[64, 0]);
        assert_eq!(&bytes[14..16], &[2, 0]);
        assert_eq!(&bytes[16..18], &[32, 0]);
        assert_eq!(&bytes[18..22], &[0x02, 0x01, 0x04, 0x03]);
        assert_eq!(&bytes[22..], &default_palette(BitDepth::One)[..]);

        let decoded = FrameHeader::read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.version_str(), "V1.00");
    }

    #[test]
    fn test_frame_record_parse() {
        let mut header = FrameHeader::new(&PackConfig::default());
        header.split_lengths = vec![3];
        let record = frame_record(&header, &[9, 8, 7]);
        assert_eq!(&record[..2], &[0x5A, 0x5A]);

        let (parsed, payload) = parse_frame_record(&record).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(payload, &[9, 8, 7]);

        let mut bad = record.clone();
        bad[0] = 0;
        assert!(parse_frame_record(&bad).is_err());
        assert!(parse_frame_record(&record[..10]).is_err());
    }

    #[test]
    fn test_container_header_roundtrip() {
        let header = ContainerHeader {
            checksum: 0xDEADBEEF,
            entries: vec![
                OffsetEntry { size: 100, offset: 28 },
                OffsetEntry { size: 50, offset: 128 },
            ],
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), header.size());
        assert_eq!(buf.len(), 28);
        assert_eq!(&buf[0..4], &[2, 0, 0, 0]);
        assert_eq!(&buf[4..8], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&buf[8..12], &[16, 0, 0, 0]);

        let decoded = ContainerHeader::read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_container_header_bad_table_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&9u32.to_le_bytes());
        assert!(ContainerHeader::read_from(&mut Cursor::new(&buf)).is_err());
    }
}
