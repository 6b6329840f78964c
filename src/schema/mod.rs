//! Schema module - Pack configuration and source frame types.

mod buffers;
mod config;

pub use buffers::*;
pub use config::*;
