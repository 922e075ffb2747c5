#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// row chunking and reassembly of images.
pub mod chunk;

/// Error types for the chunked filtering.
pub mod error;

/// image filtering module.
pub mod filter;

/// border handling for the convolution filters.
pub mod padding;

/// module containing the per effect fan-out and barrier.
pub mod parallel;

/// double buffered filtering surface.
pub mod surface;

pub use crate::error::{ChunkError, ParseEffectError};
