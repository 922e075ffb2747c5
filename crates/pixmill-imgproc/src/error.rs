use pixmill_image::ImageError;

use crate::filter::Effect;

/// Errors that can occur while filtering an image in chunks.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ChunkError {
    /// The requested chunk count is invalid.
    #[error("chunk count must be > 0, got {0}")]
    InvalidChunkCount(usize),

    /// A chunk task failed while applying an effect.
    #[error("chunk {chunk} failed while applying {effect}: {message}")]
    TaskFailed {
        /// Index of the failing chunk.
        chunk: usize,
        /// The effect being applied.
        effect: Effect,
        /// Description of the failure.
        message: String,
    },

    /// A chunk task never reported completion to the barrier.
    #[error("chunk {chunk} did not report completion for {effect}")]
    MissingCompletion {
        /// Index of the silent chunk.
        chunk: usize,
        /// The effect being applied.
        effect: Effect,
    },

    /// The trimmed chunks do not cover every row exactly once.
    #[error("chunks do not partition the image rows: {0}")]
    Partition(String),

    /// Error coming from an image operation.
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Error returned when an effect code is not one of `G`, `S`, `E`, `B`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown effect code: {0:?}")]
pub struct ParseEffectError(pub String);
