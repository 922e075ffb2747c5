use std::path::{Path, PathBuf};

use pixmill_image::Rgba16Image;
use pixmill_io::png::{read_image_png_layout, PngLayout};

use crate::{descriptor::JobDescriptor, error::PipelineError};

/// Loads the input image of a job.
pub trait ImageSource {
    /// Decode the image `descriptor` points at.
    ///
    /// Returns the image with the layout of the file it was read from.
    fn load(
        &self,
        descriptor: &JobDescriptor,
    ) -> Result<(Rgba16Image, PngLayout), PipelineError>;
}

/// Reads PNG files from disk.
#[derive(Debug, Clone, Default)]
pub struct PngFileSource {
    base_dir: Option<PathBuf>,
}

impl PngFileSource {
    /// Read paths as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl ImageSource for PngFileSource {
    fn load(
        &self,
        descriptor: &JobDescriptor,
    ) -> Result<(Rgba16Image, PngLayout), PipelineError> {
        let path = resolve_path(self.base_dir.as_deref(), &descriptor.in_path);
        Ok(read_image_png_layout(path)?)
    }
}

/// Join `path` onto `base_dir` when it is relative.
pub(crate) fn resolve_path(base_dir: Option<&Path>, path: &Path) -> PathBuf {
    match base_dir {
        Some(base_dir) if path.is_relative() => base_dir.join(path),
        _ => path.to_path_buf(),
    }
}
