//! Animation assembler turning named source frames into a container.

use log::{debug, info, log_enabled, warn};
use rayon::prelude::*;

use super::format::{
    ContainerHeader, FrameHeader, OffsetEntry, checksum, frame_record, split_lengths,
};
use crate::codec::{CodecError, bitplane, rle};
use crate::schema::{ConfigError, NamedBuffers, PackConfig};

/// Mismatches listed individually in a round-trip failure report.
const REPORTED_MISMATCHES: usize = 3;

/// Assembly errors that abort the whole container.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("No frames produced ({skipped} skipped)")]
    NoFramesProduced { skipped: usize },
    #[error("Invalid pack configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Why a source frame was left out of the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Name listed in the source order without data.
    MissingBuffer,
    /// Buffer length differs from the configured frame size.
    SizeMismatch { expected: usize, actual: usize },
    /// Column-major reordering failed or did not preserve every pixel.
    Transform(TransformFailure),
    /// A split chunk does not fit the 16-bit split length field.
    SplitTooLarge { length: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformFailure {
    Codec(CodecError),
    PixelMismatch { count: usize },
}

/// One byte that differs between a source frame and its RLE round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteMismatch {
    pub position: usize,
    pub original: u8,
    pub decoded: u8,
}

/// Why a frame fell back to its uncompressed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTripFailure {
    Decode(CodecError),
    Mismatch {
        original_len: usize,
        decoded_len: usize,
        /// Differing positions plus the length difference.
        count: usize,
        first: Vec<ByteMismatch>,
    },
}

/// Result of processing one source frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Packed {
        /// Index of the frame in the container.
        frame_index: usize,
        /// Source buffer size.
        original_size: usize,
        /// Stored payload size (compressed or raw).
        stored_size: usize,
        /// Size of the full frame record.
        record_size: usize,
        /// Payload carries RLE data.
        compressed: bool,
        /// Set when compression was attempted and discarded.
        fallback: Option<RoundTripFailure>,
    },
    Skipped(SkipReason),
}

/// Per-source diagnostics, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Position of the name in the source order.
    pub source_index: usize,
    pub name: String,
    pub outcome: FrameOutcome,
}

impl FrameReport {
    pub fn is_packed(&self) -> bool {
        matches!(self.outcome, FrameOutcome::Packed { .. })
    }
}

/// Statistics from one assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyStats {
    /// Names in the source order.
    pub source_count: usize,
    pub packed_frames: usize,
    pub skipped_frames: usize,
    /// Sum of source buffer sizes of packed frames.
    pub original_bytes: usize,
    /// Sum of stored payload sizes of packed frames.
    pub stored_bytes: usize,
    /// Container header size (fixed part plus offset table).
    pub header_bytes: usize,
    /// Sum of frame record sizes.
    pub frame_bytes: usize,
    pub total_bytes: usize,
    pub checksum: u32,
}

impl AssemblyStats {
    /// Space saved by compression, in percent of the original payload.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.stored_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}

impl std::fmt::Display for AssemblyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} frames ({} skipped), {} bytes total ({} header + {} frames), payload {} -> {} bytes ({:+.1}%), checksum 0x{:08X}",
            self.packed_frames,
            self.source_count,
            self.skipped_frames,
            self.total_bytes,
            self.header_bytes,
            self.frame_bytes,
            self.original_bytes,
            self.stored_bytes,
            self.compression_ratio(),
            self.checksum
        )
    }
}

/// A finished container.
#[derive(Debug, Clone)]
pub struct PackedAnimation {
    /// Container bytes: header, offset table, frame records.
    pub bytes: Vec<u8>,
    pub header: ContainerHeader,
    pub stats: AssemblyStats,
    pub reports: Vec<FrameReport>,
}

impl PackedAnimation {
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Output of the per-frame stage, before offsets are known.
struct PreparedFrame {
    name: String,
    source_index: usize,
    result: Result<ReadyFrame, SkipReason>,
}

struct ReadyFrame {
    record: Vec<u8>,
    original_size: usize,
    stored_size: usize,
    compressed: bool,
    fallback: Option<RoundTripFailure>,
}

/// Builds animation containers from named source frames.
///
/// Usage:
/// ```ignore
/// let assembler = AnimationAssembler::new(PackConfig::default())?;
/// let packed = assembler.assemble(&buffers)?;
/// std::fs::write("anim.bin", &packed.bytes)?;
/// ```
///
/// Frames are prepared in parallel; offsets, the checksum and the frame order
/// are fixed in one sequential pass over the source order.
#[derive(Debug, Clone)]
pub struct AnimationAssembler {
    config: PackConfig,
}

impl AnimationAssembler {
    /// Create an assembler after validating `config`.
    pub fn new(config: PackConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        for warning in config.warnings() {
            warn!("{warning}");
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Validate `config` and build one container from `sources`.
    pub fn pack(
        config: PackConfig,
        sources: &NamedBuffers,
    ) -> Result<PackedAnimation, AssembleError> {
        Self::new(config)?.assemble(sources)
    }

    /// Build a container from `sources`, in their recorded order.
    pub fn assemble(&self, sources: &NamedBuffers) -> Result<PackedAnimation, AssembleError> {
        let prepared: Vec<PreparedFrame> = sources
            .names()
            .par_iter()
            .enumerate()
            .map(|(source_index, name)| PreparedFrame {
                name: name.clone(),
                source_index,
                result: self.prepare_frame(name, sources.get(name)),
            })
            .collect();

        let packed_count = prepared.iter().filter(|p| p.result.is_ok()).count();
        let header_bytes = ContainerHeader::header_size(packed_count);

        let mut header = ContainerHeader::default();
        let mut frames = Vec::new();
        let mut reports = Vec::with_capacity(prepared.len());
        let mut stats = AssemblyStats {
            source_count: sources.len(),
            header_bytes,
            ..Default::default()
        };
        let mut running_offset = header_bytes;

        for frame in prepared {
            let outcome = match frame.result {
                Ok(ready) => {
                    let record_size = ready.record.len();
                    header.entries.push(OffsetEntry {
                        size: record_size as u32,
                        offset: running_offset as u32,
                    });
                    running_offset += record_size;
                    header.checksum = header.checksum.wrapping_add(checksum(&ready.record));
                    frames.extend_from_slice(&ready.record);

                    stats.packed_frames += 1;
                    stats.original_bytes += ready.original_size;
                    stats.stored_bytes += ready.stored_size;
                    stats.frame_bytes += record_size;

                    FrameOutcome::Packed {
                        frame_index: header.entries.len() - 1,
                        original_size: ready.original_size,
                        stored_size: ready.stored_size,
                        record_size,
                        compressed: ready.compressed,
                        fallback: ready.fallback,
                    }
                }
                Err(reason) => {
                    stats.skipped_frames += 1;
                    FrameOutcome::Skipped(reason)
                }
            };

            let report = FrameReport {
                source_index: frame.source_index,
                name: frame.name,
                outcome,
            };
            log_report(&report);
            reports.push(report);
        }

        if header.entries.is_empty() {
            warn!("No frames produced from {} sources", sources.len());
            return Err(AssembleError::NoFramesProduced {
                skipped: stats.skipped_frames,
            });
        }

        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(&frames);
        stats.total_bytes = bytes.len();
        stats.checksum = header.checksum;

        info!("Assembled container: {stats}");

        Ok(PackedAnimation {
            bytes,
            header,
            stats,
            reports,
        })
    }

    /// Run the per-frame stages on one source buffer.
    fn prepare_frame(&self, name: &str, data: Option<&[u8]>) -> Result<ReadyFrame, SkipReason> {
        let data = data.ok_or(SkipReason::MissingBuffer)?;

        let expected = self.config.frame_bytes();
        if data.len() != expected {
            return Err(SkipReason::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let transformed;
        let source = if self.config.column_major {
            transformed = self.transform(data)?;
            &transformed[..]
        } else {
            data
        };

        let (payload, compressed, fallback) = if self.config.enable_rle {
            compress_checked(name, source)
        } else {
            (source.to_vec(), false, None)
        };

        let mut header = FrameHeader::new(&self.config);
        header.split_lengths = split_lengths(payload.len(), self.config.splits as usize)
            .into_iter()
            .map(|length| u16::try_from(length).map_err(|_| SkipReason::SplitTooLarge { length }))
            .collect::<Result<_, _>>()?;

        Ok(ReadyFrame {
            record: frame_record(&header, &payload),
            original_size: data.len(),
            stored_size: payload.len(),
            compressed,
            fallback,
        })
    }

    fn transform(&self, data: &[u8]) -> Result<Vec<u8>, SkipReason> {
        let (width, height) = (self.config.width as usize, self.config.height as usize);
        let codec_failure = |e| SkipReason::Transform(TransformFailure::Codec(e));

        let columns = bitplane::to_column_major(data, width, height).map_err(codec_failure)?;
        let mismatches =
            bitplane::verify_column_major(data, &columns, width, height).map_err(codec_failure)?;
        if !mismatches.is_empty() {
            return Err(SkipReason::Transform(TransformFailure::PixelMismatch {
                count: mismatches.len(),
            }));
        }
        Ok(columns)
    }
}

/// RLE-encode `data` and keep the result only if it decodes back exactly.
fn compress_checked(name: &str, data: &[u8]) -> (Vec<u8>, bool, Option<RoundTripFailure>) {
    let encoded = rle::encode(data);

    if log_enabled!(log::Level::Debug) {
        debug!("{name} source: {}", rle::describe_packed(data, 5));
        debug!("{name} encoded: {}", rle::describe(&encoded, 5));
    }

    let decoded = rle::decode(&encoded, Some(data.len()));
    select_payload(data, encoded, decoded)
}

/// Keep `encoded` when `decoded` reproduces `original`, else fall back to the
/// raw bytes.
fn select_payload(
    original: &[u8],
    encoded: Vec<u8>,
    decoded: Result<Vec<u8>, CodecError>,
) -> (Vec<u8>, bool, Option<RoundTripFailure>) {
    match round_trip_failure(original, decoded) {
        None => (encoded, true, None),
        Some(failure) => (original.to_vec(), false, Some(failure)),
    }
}

/// Compare a decoded payload against its source.
fn round_trip_failure(
    original: &[u8],
    decoded: Result<Vec<u8>, CodecError>,
) -> Option<RoundTripFailure> {
    let decoded = match decoded {
        Ok(decoded) if decoded == original => return None,
        Ok(decoded) => decoded,
        Err(e) => return Some(RoundTripFailure::Decode(e)),
    };

    let mut count = original.len().abs_diff(decoded.len());
    let mut first = Vec::new();
    for (position, (&expected, &actual)) in original.iter().zip(&decoded).enumerate() {
        if expected != actual {
            count += 1;
            if first.len() < REPORTED_MISMATCHES {
                first.push(ByteMismatch {
                    position,
                    original: expected,
                    decoded: actual,
                });
            }
        }
    }

    Some(RoundTripFailure::Mismatch {
        original_len: original.len(),
        decoded_len: decoded.len(),
        count,
        first,
    })
}

fn log_report(report: &FrameReport) {
    let FrameReport {
        source_index,
        name,
        outcome,
    } = report;
    let source = format!("Source {source_index} ({name})");

    match outcome {
        FrameOutcome::Packed {
            frame_index,
            original_size,
            stored_size,
            record_size,
            compressed,
            fallback,
        } => {
            match fallback {
                Some(RoundTripFailure::Decode(e)) => {
                    warn!("{source}: RLE check failed ({e}), storing uncompressed")
                }
                Some(RoundTripFailure::Mismatch {
                    original_len,
                    decoded_len,
                    count,
                    first,
                }) => {
                    warn!(
                        "{source}: RLE round trip differs in {count} bytes \
                         (decoded {decoded_len} of {original_len}), storing uncompressed"
                    );
                    for m in first {
                        warn!(
                            "  position {}: decoded=0x{:02X}, original=0x{:02X}",
                            m.position, m.decoded, m.original
                        );
                    }
                }
                None => {}
            }
            let saving = if *compressed {
                (1.0 - *stored_size as f64 / *original_size as f64) * 100.0
            } else {
                0.0
            };
            debug!(
                "Frame {frame_index} <- {source}: {original_size} -> {stored_size} bytes \
                 ({saving:+.1}%), record {record_size} bytes"
            );
        }
        FrameOutcome::Skipped(reason) => match reason {
            SkipReason::MissingBuffer => warn!("{source}: no data, skipped"),
            SkipReason::SizeMismatch { expected, actual } => warn!(
                "{source}: size mismatch, expected {expected} bytes, got {actual}, skipped"
            ),
            SkipReason::Transform(TransformFailure::Codec(e)) => {
                warn!("{source}: column-major transform failed ({e}), skipped")
            }
            SkipReason::Transform(TransformFailure::PixelMismatch { count }) => {
                warn!("{source}: column-major transform changed {count} pixels, skipped")
            }
            SkipReason::SplitTooLarge { length } => warn!(
                "{source}: split of {length} bytes exceeds 16-bit length field, skipped"
            ),
        },
    }
}
