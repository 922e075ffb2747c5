use std::path::{Path, PathBuf};

use pixmill_imgproc::ChunkError;
use pixmill_io::IoError;

/// An error type for the pipeline module.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A descriptor line could not be parsed.
    #[error("Invalid job descriptor on line {line}. {message}")]
    Descriptor {
        /// 1-based line number in the descriptor stream.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// The descriptor stream could not be read.
    #[error("Failed to read the job descriptors. {0}")]
    Input(#[from] std::io::Error),

    /// The image could not be decoded or encoded.
    #[error(transparent)]
    Codec(#[from] IoError),

    /// The chunked filter failed.
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// The pool settings are not usable.
    #[error("Invalid pool configuration. {0}")]
    InvalidConfig(String),

    /// The chunk thread pool could not be created.
    #[error("Failed to build the chunk thread pool. {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A queue was closed while still in use.
    #[error("The {0} queue is disconnected")]
    Disconnected(&'static str),

    /// A worker broke an internal invariant.
    #[error("Internal error. {0}")]
    Internal(String),
}

/// A failed job, with enough context to report it.
#[derive(thiserror::Error, Debug)]
#[error("job {id}{} failed: {source}", describe_paths(.in_path.as_deref(), .out_path.as_deref()))]
pub struct JobError {
    /// Sequence id of the job.
    pub id: usize,
    /// Input location, when the descriptor was parsed.
    pub in_path: Option<PathBuf>,
    /// Output location, when the descriptor was parsed.
    pub out_path: Option<PathBuf>,
    /// Why the job failed.
    #[source]
    pub source: PipelineError,
}

impl JobError {
    /// A failure that happened before the descriptor was known.
    pub fn without_paths(id: usize, source: PipelineError) -> Self {
        Self {
            id,
            in_path: None,
            out_path: None,
            source,
        }
    }

    /// A failure of a job with known input and output locations.
    pub fn with_paths(id: usize, in_path: &Path, out_path: &Path, source: PipelineError) -> Self {
        Self {
            id,
            in_path: Some(in_path.to_path_buf()),
            out_path: Some(out_path.to_path_buf()),
            source,
        }
    }
}

fn describe_paths(in_path: Option<&Path>, out_path: Option<&Path>) -> String {
    match (in_path, out_path) {
        (Some(in_path), Some(out_path)) => {
            format!(" ({} -> {})", in_path.display(), out_path.display())
        }
        _ => String::new(),
    }
}
