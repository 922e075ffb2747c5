#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pool and chunking settings.
pub mod config;

/// Job descriptor parsing.
pub mod descriptor;

/// Error types for the pipeline.
pub mod error;

/// Jobs and their filtering.
pub mod job;

/// Worker pool running whole jobs on named threads.
pub mod pool;

/// Batch runner driving a descriptor stream through the filters.
pub mod runner;

/// Writers for finished jobs.
pub mod sink;

/// Loaders for job images.
pub mod source;

pub use crate::error::{JobError, PipelineError};
