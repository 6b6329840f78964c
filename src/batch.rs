//! Packing listing files into container files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::animation::{AnimationAssembler, AssembleError, AssemblyStats};
use crate::listing::read_listing;

/// Errors for a single listing file. The batch continues past them.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("No byte arrays found in {0}")]
    NoArrays(PathBuf),
    #[error("{path}: {source}")]
    Assemble {
        path: PathBuf,
        source: AssembleError,
    },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// A listing that produced a container file.
#[derive(Debug, Clone)]
pub struct PackOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stats: AssemblyStats,
}

/// Results of a batch, one per input file.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<Result<PackOutcome, BatchError>>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

fn is_listing(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "h")
}

/// Expand `paths` into listing files: `.h` files as given, directories
/// scanned (non-recursively) for `.h` files in name order.
pub fn collect_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_file() && is_listing(path) {
            inputs.push(path.clone());
        } else if path.is_dir() {
            let before = inputs.len();
            for entry in WalkDir::new(path).max_depth(1).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_listing(entry.path()) => {
                        inputs.push(entry.into_path())
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable entry in {}: {e}", path.display()),
                }
            }
            if inputs.len() == before {
                warn!("No .h files in {}", path.display());
            }
        } else {
            warn!("Skipping invalid input path {}", path.display());
        }
    }
    inputs
}

/// Pack one listing into `<out_dir>/<stem>.bin`.
///
/// If that file cannot be written, `<stem>_animation.bin` is tried once.
pub fn pack_file(
    assembler: &AnimationAssembler,
    input: &Path,
    out_dir: &Path,
) -> Result<PackOutcome, BatchError> {
    info!("Packing {}", input.display());

    let buffers = read_listing(input).map_err(|source| BatchError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    if buffers.is_empty() {
        return Err(BatchError::NoArrays(input.to_path_buf()));
    }
    info!("Found {} arrays in {}", buffers.len(), input.display());

    let packed = assembler
        .assemble(&buffers)
        .map_err(|source| BatchError::Assemble {
            path: input.to_path_buf(),
            source,
        })?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "animation".to_string());

    let output = write_container(out_dir, &stem, &packed.bytes)?;
    info!("Wrote {} ({})", output.display(), packed.stats);

    Ok(PackOutcome {
        input: input.to_path_buf(),
        output,
        stats: packed.stats,
    })
}

fn write_container(out_dir: &Path, stem: &str, bytes: &[u8]) -> Result<PathBuf, BatchError> {
    fs::create_dir_all(out_dir).map_err(|source| BatchError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let primary = out_dir.join(format!("{stem}.bin"));
    match fs::write(&primary, bytes) {
        Ok(()) => Ok(primary),
        Err(e) => {
            let fallback = out_dir.join(format!("{stem}_animation.bin"));
            warn!(
                "Failed to write {} ({e}), trying {}",
                primary.display(),
                fallback.display()
            );
            fs::write(&fallback, bytes).map_err(|source| BatchError::Write {
                path: fallback.clone(),
                source,
            })?;
            Ok(fallback)
        }
    }
}

/// Pack every input, continuing past failures.
pub fn pack_all(
    assembler: &AnimationAssembler,
    inputs: &[PathBuf],
    out_dir: &Path,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for input in inputs {
        let result = pack_file(assembler, input, out_dir);
        if let Err(e) = &result {
            warn!("{e}");
        }
        summary.results.push(result);
    }
    info!(
        "Packed {}/{} listings into {}",
        summary.succeeded(),
        summary.total(),
        out_dir.display()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationReader;
    use crate::schema::PackConfig;
    use tempfile::tempdir;

    fn listing(frames: &[Vec<u8>]) -> String {
        frames
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let values: Vec<String> = f.iter().map(|b| format!("0x{b:02X}")).collect();
                format!("const uint8_t frame_{i}[] = {{ {} }};\n", values.join(", "))
            })
            .collect()
    }

    fn assembler() -> AnimationAssembler {
        AnimationAssembler::new(PackConfig {
            width: 16,
            height: 8,
            splits: 2,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_collect_inputs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.h"), "").unwrap();
        fs::write(dir.path().join("a.h"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.h"), "").unwrap();

        let single = dir.path().join("nested").join("c.h");
        let inputs = collect_inputs(&[
            dir.path().to_path_buf(),
            single.clone(),
            dir.path().join("missing"),
        ]);
        assert_eq!(
            inputs,
            vec![dir.path().join("a.h"), dir.path().join("b.h"), single]
        );
    }

    #[test]
    fn test_pack_file_writes_container() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("blink.h");
        let frames = vec![vec![0u8; 16], vec![0xFFu8; 16], vec![1u8; 5]];
        fs::write(&input, listing(&frames)).unwrap();

        let out_dir = dir.path().join("out");
        let outcome = pack_file(&assembler(), &input, &out_dir).unwrap();
        assert_eq!(outcome.output, out_dir.join("blink.bin"));
        assert_eq!(outcome.stats.packed_frames, 2);
        assert_eq!(outcome.stats.skipped_frames, 1);

        let bytes = fs::read(&outcome.output).unwrap();
        let reader = AnimationReader::new(&bytes).unwrap();
        assert_eq!(reader.frame_count(), 2);
        let (_, pixels) = reader.frame(1).unwrap().decode().unwrap();
        assert_eq!(pixels, vec![0xFF; 16]);
    }

    #[test]
    fn test_pack_all_continues_past_failures() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.h");
        let empty = dir.path().join("empty.h");
        let bad = dir.path().join("bad.h");
        fs::write(&good, listing(&[vec![0x0Fu8; 16]])).unwrap();
        fs::write(&empty, "// nothing here\n").unwrap();
        fs::write(&bad, listing(&[vec![0u8; 3]])).unwrap();

        let out_dir = dir.path().join("out");
        let summary = pack_all(&assembler(), &[empty, bad, good], &out_dir);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded(), 1);
        assert!(matches!(summary.results[0], Err(BatchError::NoArrays(_))));
        assert!(matches!(
            summary.results[1],
            Err(BatchError::Assemble {
                source: AssembleError::NoFramesProduced { skipped: 1 },
                ..
            })
        ));
        assert!(out_dir.join("good.bin").exists());
        assert!(!out_dir.join("bad.bin").exists());
    }

    #[test]
    fn test_write_fallback_name() {
        let dir = tempdir().unwrap();
        // A directory squatting on the primary name forces the fallback.
        fs::create_dir(dir.path().join("clip.bin")).unwrap();
        let output = write_container(dir.path(), "clip", &[1, 2, 3]).unwrap();
        assert_eq!(output, dir.path().join("clip_animation.bin"));
        assert_eq!(fs::read(output).unwrap(), vec![1, 2, 3]);
    }
}
