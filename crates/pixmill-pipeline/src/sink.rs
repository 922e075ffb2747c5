use std::path::PathBuf;

use log::info;
use pixmill_io::png::write_image_png_layout;

use crate::{error::PipelineError, job::CompletedJob, source::resolve_path};

/// Receives every finished job.
pub trait ResultSink {
    /// Hand off a finished job.
    fn write(&mut self, job: &CompletedJob) -> Result<(), PipelineError>;
}

/// Writes finished jobs as PNG files.
///
/// Filtered images are written as 16-bit RGBA, jobs without effects in the layout of
/// their input file.
#[derive(Debug, Clone, Default)]
pub struct PngFileSink {
    base_dir: Option<PathBuf>,
    written: usize,
}

impl PngFileSink {
    /// Write to the output paths as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative output paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            written: 0,
        }
    }

    /// Number of images written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl ResultSink for PngFileSink {
    fn write(&mut self, job: &CompletedJob) -> Result<(), PipelineError> {
        let path = resolve_path(self.base_dir.as_deref(), &job.descriptor.out_path);
        write_image_png_layout(&path, &job.image, job.output_layout())?;
        self.written += 1;
        info!(
            "job {} written to {} ({}, {:?})",
            job.id,
            path.display(),
            job.image.size(),
            job.elapsed
        );
        Ok(())
    }
}
