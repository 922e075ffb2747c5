use std::time::{Duration, Instant};

use log::debug;
use pixmill_image::Rgba16Image;
use pixmill_imgproc::{
    padding::BorderMode,
    parallel::{filter_chunked_with, filter_sequential, ChunkConfig},
};
use pixmill_io::png::PngLayout;

use crate::{
    descriptor::JobDescriptor,
    error::{JobError, PipelineError},
};

/// A job ready to be filtered: its descriptor and the decoded input image.
#[derive(Debug, Clone)]
pub struct Job {
    /// Sequence id of the job.
    pub id: usize,
    /// What to do with the image.
    pub descriptor: JobDescriptor,
    /// The decoded input image.
    pub image: Rgba16Image,
    /// Pixel layout of the input file.
    pub layout: PngLayout,
}

/// A job whose effects were all applied.
#[derive(Debug, Clone)]
pub struct CompletedJob {
    /// Sequence id of the job.
    pub id: usize,
    /// The descriptor the job was created from.
    pub descriptor: JobDescriptor,
    /// The filtered image.
    pub image: Rgba16Image,
    /// Pixel layout of the input file.
    pub layout: PngLayout,
    /// Time spent filtering.
    pub elapsed: Duration,
}

impl Job {
    /// Create a job for an image read from a 16-bit RGBA file.
    pub fn new(id: usize, descriptor: JobDescriptor, image: Rgba16Image) -> Self {
        Self {
            id,
            descriptor,
            image,
            layout: PngLayout::RGBA16,
        }
    }

    /// Set the layout of the file the image was read from.
    pub fn with_layout(mut self, layout: PngLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Wrap `source` into a [`JobError`] carrying this job's id and paths.
    pub fn error(&self, source: PipelineError) -> JobError {
        JobError::with_paths(
            self.id,
            &self.descriptor.in_path,
            &self.descriptor.out_path,
            source,
        )
    }

    /// Apply the effects on the calling thread, the image being a single chunk.
    pub fn process_sequential(self, border: BorderMode) -> Result<CompletedJob, JobError> {
        let Job {
            id,
            descriptor,
            image,
            layout,
        } = self;
        let start = Instant::now();
        match filter_sequential(image, &descriptor.effects, border) {
            Ok(image) => Ok(CompletedJob {
                id,
                descriptor,
                image,
                layout,
                elapsed: start.elapsed(),
            }),
            Err(err) => Err(JobError::with_paths(
                id,
                &descriptor.in_path,
                &descriptor.out_path,
                err.into(),
            )),
        }
    }

    /// Apply the effects to the image split in chunks.
    ///
    /// The chunk tasks run on the rayon pool of the caller.
    pub fn process_chunked(self, config: &ChunkConfig) -> Result<CompletedJob, JobError> {
        let Job {
            id,
            descriptor,
            image,
            layout,
        } = self;
        let start = Instant::now();
        let res = filter_chunked_with(image, &descriptor.effects, config, |stage| {
            debug!("job {id}: {stage:?}")
        });
        match res {
            Ok(image) => Ok(CompletedJob {
                id,
                descriptor,
                image,
                layout,
                elapsed: start.elapsed(),
            }),
            Err(err) => Err(JobError::with_paths(
                id,
                &descriptor.in_path,
                &descriptor.out_path,
                err.into(),
            )),
        }
    }
}

impl CompletedJob {
    /// Layout the result is written in.
    ///
    /// A job without effects keeps the layout of its input file, any filtered image is
    /// written as 16-bit RGBA.
    pub fn output_layout(&self) -> PngLayout {
        if self.descriptor.effects.is_empty() {
            self.layout
        } else {
            PngLayout::RGBA16
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmill_imgproc::filter::Effect;
    use pixmill_io::png::{PngColor, PngDepth};
    use std::path::PathBuf;

    fn job(effects: Vec<Effect>) -> Result<Job, PipelineError> {
        let descriptor = JobDescriptor {
            in_path: PathBuf::from("in.png"),
            out_path: PathBuf::from("out.png"),
            effects,
        };
        let data = (0..6 * 5 * 4).map(|i| (i * 977 % 65536) as u16).collect();
        let image = Rgba16Image::new([6, 5].into(), data).map_err(pixmill_io::IoError::from)?;
        Ok(Job::new(9, descriptor, image))
    }

    #[test]
    fn test_empty_effects_keep_the_image() -> Result<(), Box<dyn std::error::Error>> {
        let job = job(vec![])?;
        let input = job.image.clone();
        let done = job.process_chunked(&ChunkConfig::new(3))?;
        assert_eq!(done.image, input);
        assert_eq!(done.id, 9);
        Ok(())
    }

    #[test]
    fn test_chunked_matches_sequential() -> Result<(), Box<dyn std::error::Error>> {
        let effects = vec![Effect::Edge, Effect::Grayscale, Effect::Blur];
        let sequential = job(effects.clone())?.process_sequential(BorderMode::Zero)?;
        let chunked = job(effects)?.process_chunked(&ChunkConfig::new(4))?;
        assert_eq!(sequential.image, chunked.image);
        Ok(())
    }

    #[test]
    fn test_failure_carries_job_context() -> Result<(), Box<dyn std::error::Error>> {
        let err = match job(vec![Effect::Blur])?.process_chunked(&ChunkConfig::new(0)) {
            Ok(_) => return Err("chunk count 0 must fail".into()),
            Err(err) => err,
        };
        assert_eq!(err.id, 9);
        assert_eq!(err.in_path, Some(PathBuf::from("in.png")));
        assert!(matches!(err.source, PipelineError::Chunk(_)));
        Ok(())
    }

    #[test]
    fn test_output_layout() -> Result<(), Box<dyn std::error::Error>> {
        let gray8 = PngLayout {
            color: PngColor::Gray,
            depth: PngDepth::Eight,
        };

        let identity = job(vec![])?
            .with_layout(gray8)
            .process_sequential(BorderMode::Zero)?;
        assert_eq!(identity.output_layout(), gray8);

        let filtered = job(vec![Effect::Blur])?
            .with_layout(gray8)
            .process_chunked(&ChunkConfig::new(2))?;
        assert_eq!(filtered.layout, gray8);
        assert_eq!(filtered.output_layout(), PngLayout::RGBA16);
        Ok(())
    }
}
