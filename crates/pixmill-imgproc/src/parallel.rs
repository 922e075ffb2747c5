use std::panic::{self, AssertUnwindSafe};

use log::{trace, warn};
use pixmill_image::{Image, ImageError};

use crate::{
    chunk::{self, Chunk, DEFAULT_CHUNK_OVERLAP},
    error::ChunkError,
    filter::{chain_radius, Effect, FilterChannel},
    padding::BorderMode,
    surface::Surface,
};

/// Controls how an image is split for chunked filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Number of row chunks every image is split into.
    pub num_chunks: usize,
    /// Minimum number of overlap rows on each interior chunk border.
    pub overlap: usize,
    /// How convolutions read outside a chunk buffer.
    pub border: BorderMode,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        let num_chunks = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(num_chunks)
    }
}

impl ChunkConfig {
    /// Create a config splitting every image into `num_chunks` chunks.
    pub fn new(num_chunks: usize) -> Self {
        Self {
            num_chunks,
            overlap: DEFAULT_CHUNK_OVERLAP,
            border: BorderMode::default(),
        }
    }

    /// Set the minimum number of overlap rows.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Set the border mode of the convolutions.
    pub fn with_border(mut self, border: BorderMode) -> Self {
        self.border = border;
        self
    }

    /// Overlap used for an effect chain.
    ///
    /// Rows within `chain_radius(effects)` of a chunk border can be wrong after the whole
    /// chain ran, so the configured overlap is raised to that value when it is smaller.
    pub fn effective_overlap(&self, effects: &[Effect]) -> usize {
        self.overlap.max(chain_radius(effects))
    }
}

/// Progress of one image through the chunked filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    /// Nothing started yet.
    Pending,
    /// The image is being split into chunks.
    Splitting,
    /// The chunk tasks of effect `index` are running.
    Filtering {
        /// Position of the effect in the chain.
        index: usize,
        /// The effect being applied.
        effect: Effect,
    },
    /// Every chunk task of effect `index` finished.
    Barrier {
        /// Position of the effect in the chain.
        index: usize,
        /// The effect that was applied.
        effect: Effect,
    },
    /// The chunks are being put back together.
    Reassembling,
    /// The filtered image is ready.
    Done,
    /// The image could not be filtered.
    Failed,
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "chunk task panicked".to_string()
    }
}

/// Run one task per chunk and wait for all of them.
///
/// The tasks are spawned in a rayon scope, which only returns once every task finished.
/// A task that returns an error or panics still counts as finished, so the barrier never
/// waits for a chunk that will not report. The chunks are swapped only when every task
/// succeeded.
///
/// # Arguments
///
/// * `chunks` - The chunks of one image.
/// * `effect` - The effect of this stage, used in error reports.
/// * `op` - The operation applied to every chunk.
///
/// # Errors
///
/// Returns the error of the lowest failing chunk index.
pub fn run_stage<T, const C: usize, F>(
    chunks: &mut [Chunk<T, C>],
    effect: Effect,
    op: F,
) -> Result<(), ChunkError>
where
    T: Send,
    F: Fn(&mut Chunk<T, C>) -> Result<(), ImageError> + Sync,
{
    let mut outcomes: Vec<Option<Result<(), ChunkError>>> = Vec::new();
    outcomes.resize_with(chunks.len(), || None);

    let op = &op;
    rayon::scope(|s| {
        for (chunk, outcome) in chunks.iter_mut().zip(outcomes.iter_mut()) {
            s.spawn(move |_| {
                let index = chunk.index();
                let res = panic::catch_unwind(AssertUnwindSafe(|| op(chunk)));
                *outcome = Some(match res {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(ChunkError::TaskFailed {
                        chunk: index,
                        effect,
                        message: err.to_string(),
                    }),
                    Err(payload) => Err(ChunkError::TaskFailed {
                        chunk: index,
                        effect,
                        message: panic_message(payload),
                    }),
                });
            });
        }
    });

    let mut failures = outcomes
        .into_iter()
        .zip(chunks.iter())
        .filter_map(|(outcome, chunk)| match outcome {
            Some(Ok(())) => None,
            Some(Err(err)) => Some(err),
            None => Some(ChunkError::MissingCompletion {
                chunk: chunk.index(),
                effect,
            }),
        })
        .collect::<Vec<_>>();

    if !failures.is_empty() {
        warn!(
            "{} of {} chunks failed while applying {effect}",
            failures.len(),
            chunks.len()
        );
        return Err(failures.swap_remove(0));
    }

    chunks.iter_mut().for_each(Chunk::swap);
    Ok(())
}

/// Apply one effect to every chunk in parallel, then swap their surfaces.
pub fn run_effect_stage<T: FilterChannel>(
    chunks: &mut [Chunk<T, 4>],
    effect: Effect,
    border: BorderMode,
) -> Result<(), ChunkError> {
    run_stage(chunks, effect, |chunk| chunk.apply(effect, border))
}

/// Apply a chain of effects to an image on the current thread.
///
/// The whole image is one chunk without overlap.
///
/// # Example
///
/// ```
/// use pixmill_image::Image;
/// use pixmill_imgproc::{filter::Effect, padding::BorderMode, parallel::filter_sequential};
///
/// let image = Image::<u16, 4>::new([1, 1].into(), vec![65535, 0, 0, 65535]).unwrap();
/// let gray = filter_sequential(image, &[Effect::Grayscale], BorderMode::Zero).unwrap();
///
/// assert_eq!(gray.as_slice(), &[21845, 21845, 21845, 65535]);
/// ```
pub fn filter_sequential<T: FilterChannel>(
    image: Image<T, 4>,
    effects: &[Effect],
    border: BorderMode,
) -> Result<Image<T, 4>, ChunkError> {
    if effects.is_empty() {
        return Ok(image);
    }

    let mut surface = Surface::new(image)?;
    for effect in effects {
        surface.apply(*effect, border)?;
        surface.swap();
    }
    Ok(surface.into_current())
}

/// Apply a chain of effects to an image split in row chunks.
///
/// See [`filter_chunked_with`].
pub fn filter_chunked<T: FilterChannel>(
    image: Image<T, 4>,
    effects: &[Effect],
    config: &ChunkConfig,
) -> Result<Image<T, 4>, ChunkError> {
    filter_chunked_with(image, effects, config, |stage| trace!("{stage:?}"))
}

/// Apply a chain of effects to an image split in row chunks, reporting every stage.
///
/// The image is split once, every effect runs as one stage of parallel chunk tasks
/// followed by a barrier, and the chunks are reassembled at the end. An empty chain
/// returns the input untouched. The chunk tasks run on the rayon pool of the caller.
///
/// # Arguments
///
/// * `image` - The image to filter.
/// * `effects` - The effects to apply, in order.
/// * `config` - The chunking parameters.
/// * `on_stage` - Called on every stage transition.
pub fn filter_chunked_with<T: FilterChannel>(
    image: Image<T, 4>,
    effects: &[Effect],
    config: &ChunkConfig,
    mut on_stage: impl FnMut(FilterStage),
) -> Result<Image<T, 4>, ChunkError> {
    on_stage(FilterStage::Pending);
    if effects.is_empty() {
        on_stage(FilterStage::Done);
        return Ok(image);
    }

    let mut run = || -> Result<Image<T, 4>, ChunkError> {
        on_stage(FilterStage::Splitting);
        let overlap = config.effective_overlap(effects);
        let mut chunks = chunk::split(&image, config.num_chunks, overlap)?;

        for (index, &effect) in effects.iter().enumerate() {
            on_stage(FilterStage::Filtering { index, effect });
            run_effect_stage(&mut chunks, effect, config.border)?;
            on_stage(FilterStage::Barrier { index, effect });
        }

        on_stage(FilterStage::Reassembling);
        chunk::reassemble(image.size(), &chunks)
    };

    let res = run();
    on_stage(match res {
        Ok(_) => FilterStage::Done,
        Err(_) => FilterStage::Failed,
    });
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gradient(width: usize, height: usize) -> Result<Image<u16, 4>, ImageError> {
        let mut data = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7919 + y * 104729) % 65536) as u16;
                data.extend_from_slice(&[v, v / 2, 65535 - v, (x * 13 % 65536) as u16]);
            }
        }
        Image::new([width, height].into(), data)
    }

    #[test]
    fn test_config_defaults() {
        let config = ChunkConfig::new(3);
        assert_eq!(config.num_chunks, 3);
        assert_eq!(config.overlap, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(config.border, BorderMode::Zero);
        assert!(ChunkConfig::default().num_chunks >= 1);
    }

    #[test]
    fn test_effective_overlap() {
        let config = ChunkConfig::new(2);
        assert_eq!(config.effective_overlap(&[Effect::Blur; 3]), 4);
        assert_eq!(config.effective_overlap(&[Effect::Blur; 6]), 6);
        assert_eq!(config.with_overlap(1).effective_overlap(&[]), 1);
        assert_eq!(
            config
                .with_overlap(0)
                .effective_overlap(&[Effect::Grayscale, Effect::Edge]),
            1
        );
    }

    #[test]
    fn test_empty_chain_is_identity() -> Result<(), ChunkError> {
        let image = gradient(7, 9)?;
        assert_eq!(filter_chunked(image.clone(), &[], &ChunkConfig::new(3))?, image);
        assert_eq!(filter_sequential(image.clone(), &[], BorderMode::Zero)?, image);
        Ok(())
    }

    #[test]
    fn test_chunked_matches_sequential() -> Result<(), ChunkError> {
        let image = gradient(11, 23)?;
        let effects = [Effect::Sharpen, Effect::Grayscale, Effect::Edge, Effect::Blur];
        let expected = filter_sequential(image.clone(), &effects, BorderMode::Zero)?;
        for num_chunks in 1..=8 {
            let out = filter_chunked(image.clone(), &effects, &ChunkConfig::new(num_chunks))?;
            assert_eq!(out, expected, "num_chunks = {num_chunks}");
        }
        Ok(())
    }

    #[test]
    fn test_stage_sequence() -> Result<(), ChunkError> {
        let image = gradient(4, 8)?;
        let mut stages = Vec::new();
        filter_chunked_with(
            image,
            &[Effect::Grayscale, Effect::Blur],
            &ChunkConfig::new(2),
            |stage| stages.push(stage),
        )?;
        assert_eq!(
            stages,
            vec![
                FilterStage::Pending,
                FilterStage::Splitting,
                FilterStage::Filtering {
                    index: 0,
                    effect: Effect::Grayscale
                },
                FilterStage::Barrier {
                    index: 0,
                    effect: Effect::Grayscale
                },
                FilterStage::Filtering {
                    index: 1,
                    effect: Effect::Blur
                },
                FilterStage::Barrier {
                    index: 1,
                    effect: Effect::Blur
                },
                FilterStage::Reassembling,
                FilterStage::Done,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_stage_barrier_survives_panic() -> Result<(), ChunkError> {
        let image = gradient(5, 16)?;
        let mut chunks = chunk::split(&image, 4, DEFAULT_CHUNK_OVERLAP)?;
        let finished = AtomicUsize::new(0);

        let res = run_stage(&mut chunks, Effect::Blur, |chunk| {
            if chunk.index() == 2 {
                panic!("boom");
            }
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(finished.load(Ordering::SeqCst), 3);
        assert_eq!(
            res,
            Err(ChunkError::TaskFailed {
                chunk: 2,
                effect: Effect::Blur,
                message: "boom".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn test_stage_reports_lowest_failing_chunk() -> Result<(), ChunkError> {
        let image = gradient(3, 12)?;
        let mut chunks = chunk::split(&image, 3, DEFAULT_CHUNK_OVERLAP)?;
        let res = run_stage(&mut chunks, Effect::Edge, |chunk| {
            if chunk.index() == 0 {
                Ok(())
            } else {
                Err(ImageError::InvalidImageSize(1, 1, 2, 2))
            }
        });
        assert!(matches!(
            res,
            Err(ChunkError::TaskFailed {
                chunk: 1,
                effect: Effect::Edge,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_stage_swaps_only_on_success() -> Result<(), ChunkError> {
        let image = gradient(3, 6)?;
        let mut chunks = chunk::split(&image, 2, DEFAULT_CHUNK_OVERLAP)?;
        let before = chunks[0].surface().current().clone();

        run_effect_stage(&mut chunks, Effect::Grayscale, BorderMode::Zero)?;
        assert_ne!(chunks[0].surface().current(), &before);

        let after = chunks[0].surface().current().clone();
        let res = run_stage(&mut chunks, Effect::Blur, |_| {
            Err(ImageError::RowRangeOutOfBounds(0, 1, 0))
        });
        assert!(res.is_err());
        assert_eq!(chunks[0].surface().current(), &after);
        Ok(())
    }
}
