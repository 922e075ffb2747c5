use pixmill_imgproc::{padding::BorderMode, parallel::ChunkConfig};

use crate::error::PipelineError;

/// Settings of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads, each running one job at a time.
    pub num_workers: usize,
    /// Number of threads shared by the chunk tasks of all workers.
    pub chunk_threads: usize,
    /// How every job is split into chunks.
    pub chunk: ChunkConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let num_workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(num_workers)
    }
}

impl PoolConfig {
    /// Create a config with `num_workers` workers.
    ///
    /// The chunk count and the chunk thread count default to the worker count.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            chunk_threads: num_workers,
            chunk: ChunkConfig::new(num_workers),
        }
    }

    /// Set the number of chunks every job is split into.
    pub fn with_chunks(mut self, num_chunks: usize) -> Self {
        self.chunk.num_chunks = num_chunks;
        self
    }

    /// Set the number of threads running chunk tasks.
    pub fn with_chunk_threads(mut self, chunk_threads: usize) -> Self {
        self.chunk_threads = chunk_threads;
        self
    }

    /// Set the minimum chunk overlap.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.chunk = self.chunk.with_overlap(overlap);
        self
    }

    /// Set the border mode of the convolutions.
    pub fn with_border(mut self, border: BorderMode) -> Self {
        self.chunk = self.chunk.with_border(border);
        self
    }

    /// Check that every count is positive.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.num_workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "worker count must be > 0".to_string(),
            ));
        }
        if self.chunk_threads == 0 {
            return Err(PipelineError::InvalidConfig(
                "chunk thread count must be > 0".to_string(),
            ));
        }
        if self.chunk.num_chunks == 0 {
            return Err(PipelineError::InvalidConfig(
                "chunk count must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a batch of jobs is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One job after the other on the calling thread, each image as a single chunk.
    Sequential {
        /// Border mode of the convolutions.
        border: BorderMode,
    },
    /// Jobs spread over a worker pool, each image split into chunks.
    Parallel(PoolConfig),
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Sequential {
            border: BorderMode::default(),
        }
    }
}
