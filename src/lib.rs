//! OLED Anim - Animation containers for page-addressed monochrome displays.
//!
//! This crate turns sequences of packed 1-bit bitmaps into a compact binary
//! container that small display controllers can stream frame by frame.
//!
//! # Architecture
//!
//! - `codec`: bit-plane reordering and tagged run-length coding
//! - `animation`: container/frame formats, the assembler and a reader
//! - `schema`: pack configuration and ordered source frames
//! - `listing`, `columns`, `batch`: C header listings in and out, the
//!   column-major conversion tool and file-level packing
//!
//! # Example
//!
//! ```rust,no_run
//! use oled_anim::{
//!     animation::AnimationAssembler,
//!     schema::{NamedBuffers, PackConfig},
//! };
//!
//! let config = PackConfig {
//!     width: 128,
//!     height: 64,
//!     ..Default::default()
//! };
//! let assembler = AnimationAssembler::new(config)?;
//!
//! let mut frames = NamedBuffers::new();
//! frames.insert("frame_0", vec![0u8; 1024]);
//! frames.insert("frame_1", vec![0xFFu8; 1024]);
//!
//! let packed = assembler.assemble(&frames)?;
//! std::fs::write("blink.bin", &packed.bytes)?;
//! println!("{}", packed.stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod animation;
pub mod batch;
pub mod codec;
pub mod columns;
pub mod listing;
pub mod schema;

// Re-export commonly used types
pub use animation::{AnimationAssembler, AnimationReader, AssembleError, PackedAnimation};
pub use schema::{BitDepth, NamedBuffers, PackConfig};
