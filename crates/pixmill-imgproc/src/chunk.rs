use std::ops::Range;

use log::trace;
use pixmill_image::{Image, ImageError, ImageSize};
use rayon::prelude::*;

use crate::{
    error::ChunkError,
    filter::{Effect, FilterChannel},
    padding::BorderMode,
    surface::Surface,
};

/// Rows added on each interior chunk border unless a longer effect chain needs more.
///
/// Must stay above the read radius of the kernels (1 for all of them).
pub const DEFAULT_CHUNK_OVERLAP: usize = 4;

/// Position of a chunk in its image, which decides the borders that carry overlap rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRole {
    /// The only chunk of the image, no overlap.
    Single,
    /// Top chunk, overlap below.
    First,
    /// Interior chunk, overlap above and below.
    Middle,
    /// Bottom chunk, overlap above.
    Last,
}

impl ChunkRole {
    /// Role of the chunk at `index` out of `count` chunks.
    pub fn from_position(index: usize, count: usize) -> Self {
        match (index, count) {
            (_, 0 | 1) => ChunkRole::Single,
            (0, _) => ChunkRole::First,
            (i, n) if i + 1 == n => ChunkRole::Last,
            _ => ChunkRole::Middle,
        }
    }

    /// Whether the chunk shares its top border with a neighbour.
    pub fn pads_leading(&self) -> bool {
        matches!(self, ChunkRole::Middle | ChunkRole::Last)
    }

    /// Whether the chunk shares its bottom border with a neighbour.
    pub fn pads_trailing(&self) -> bool {
        matches!(self, ChunkRole::First | ChunkRole::Middle)
    }
}

/// Compute the unpadded row ranges of the chunks of an image.
///
/// Every range but the last one is `ceil(height / num_chunks)` rows high and the last one
/// absorbs the remainder. Chunks that would start past the last row are not produced, so
/// short images yield fewer ranges than requested.
///
/// # Arguments
///
/// * `height` - The number of rows of the image.
/// * `num_chunks` - The requested number of chunks.
///
/// # Example
///
/// ```
/// use pixmill_imgproc::chunk::chunk_rows;
///
/// assert_eq!(chunk_rows(10, 3).unwrap(), vec![0..4, 4..8, 8..10]);
/// assert_eq!(chunk_rows(5, 4).unwrap(), vec![0..2, 2..4, 4..5]);
/// ```
pub fn chunk_rows(height: usize, num_chunks: usize) -> Result<Vec<Range<usize>>, ChunkError> {
    if num_chunks == 0 {
        return Err(ChunkError::InvalidChunkCount(num_chunks));
    }
    if height == 0 {
        return Ok(vec![0..0]);
    }

    let base = height.div_ceil(num_chunks);
    let mut ranges = Vec::with_capacity(num_chunks);
    for i in 0..num_chunks {
        let start = i * base;
        if start >= height {
            break;
        }
        let end = if i + 1 == num_chunks {
            height
        } else {
            (start + base).min(height)
        };
        ranges.push(start..end);
    }
    Ok(ranges)
}

/// A horizontal band of an image, filtered independently of the other bands.
#[derive(Debug, Clone)]
pub struct Chunk<T, const C: usize> {
    index: usize,
    role: ChunkRole,
    rows: Range<usize>,
    leading: usize,
    trailing: usize,
    surface: Surface<T, C>,
}

impl<T, const C: usize> Chunk<T, C> {
    /// Position of the chunk in the split.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Role of the chunk.
    pub fn role(&self) -> ChunkRole {
        self.role
    }

    /// Absolute rows of the image this chunk produces.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Absolute rows held by the chunk, overlap included.
    pub fn padded_rows(&self) -> Range<usize> {
        self.rows.start - self.leading..self.rows.end + self.trailing
    }

    /// Overlap rows above the produced rows.
    pub fn leading_overlap(&self) -> usize {
        self.leading
    }

    /// Overlap rows below the produced rows.
    pub fn trailing_overlap(&self) -> usize {
        self.trailing
    }

    /// Rows of the chunk buffer kept at reassembly, relative to the buffer.
    pub fn kept_rows(&self) -> Range<usize> {
        self.leading..self.leading + self.rows.len()
    }

    /// The double buffered pixels of the chunk.
    pub fn surface(&self) -> &Surface<T, C> {
        &self.surface
    }

    /// Make the last effect output the input of the next effect.
    pub fn swap(&mut self) {
        self.surface.swap();
    }

    fn kept_slice(&self) -> Result<&[T], ImageError> {
        self.surface.current().row_slice(self.kept_rows())
    }
}

impl<T: FilterChannel> Chunk<T, 4> {
    /// Apply one effect to the chunk buffer without swapping.
    pub fn apply(&mut self, effect: Effect, border: BorderMode) -> Result<(), ImageError> {
        self.surface.apply(effect, border)
    }
}

/// Split an image into overlapping row chunks.
///
/// With more than one chunk, every border shared by two chunks gets `overlap` extra rows
/// on both sides, clamped to the image. A single chunk covers the whole image without
/// overlap.
///
/// # Arguments
///
/// * `image` - The image to split.
/// * `num_chunks` - The requested number of chunks.
/// * `overlap` - Number of rows added on each interior border.
pub fn split<T, const C: usize>(
    image: &Image<T, C>,
    num_chunks: usize,
    overlap: usize,
) -> Result<Vec<Chunk<T, C>>, ChunkError>
where
    T: Clone + Default,
{
    let height = image.rows();
    let ranges = chunk_rows(height, num_chunks)?;
    let count = ranges.len();

    ranges
        .into_iter()
        .enumerate()
        .map(|(index, rows)| -> Result<Chunk<T, C>, ChunkError> {
            let role = ChunkRole::from_position(index, count);
            let leading = if role.pads_leading() {
                overlap.min(rows.start)
            } else {
                0
            };
            let trailing = if role.pads_trailing() {
                overlap.min(height - rows.end)
            } else {
                0
            };
            let band = image.crop_rows(rows.start - leading..rows.end + trailing)?;
            trace!(
                "chunk {index} ({role:?}): rows {:?}, overlap {leading}/{trailing}",
                rows
            );

            Ok(Chunk {
                index,
                role,
                rows,
                leading,
                trailing,
                surface: Surface::new(band)?,
            })
        })
        .collect()
}

fn check_partition<T, const C: usize>(
    size: ImageSize,
    chunks: &[&Chunk<T, C>],
) -> Result<(), ChunkError> {
    let mut next_row = 0;
    for chunk in chunks {
        let band = chunk.surface.size();
        if band.width != size.width {
            return Err(ChunkError::Partition(format!(
                "chunk {} is {} pixels wide, expected {}",
                chunk.index, band.width, size.width
            )));
        }
        if band.height != chunk.padded_rows().len() {
            return Err(ChunkError::Partition(format!(
                "chunk {} holds {} rows, expected {}",
                chunk.index,
                band.height,
                chunk.padded_rows().len()
            )));
        }
        if chunk.rows.start > next_row {
            return Err(ChunkError::Partition(format!(
                "rows {}..{} are not covered",
                next_row, chunk.rows.start
            )));
        }
        if chunk.rows.start < next_row {
            return Err(ChunkError::Partition(format!(
                "chunk {} overlaps rows before {}",
                chunk.index, next_row
            )));
        }
        next_row = chunk.rows.end;
    }
    if next_row != size.height {
        return Err(ChunkError::Partition(format!(
            "rows {}..{} are not covered",
            next_row, size.height
        )));
    }
    Ok(())
}

/// Put filtered chunks back together into one image.
///
/// Each chunk drops its overlap rows and its remaining rows are copied into its own
/// band of a new image. The bands are disjoint, so the copies run in parallel.
///
/// # Arguments
///
/// * `size` - The size of the original image.
/// * `chunks` - The filtered chunks, in any order.
///
/// # Errors
///
/// Returns [`ChunkError::Partition`] if the kept rows do not cover every row exactly once.
pub fn reassemble<T, const C: usize>(
    size: ImageSize,
    chunks: &[Chunk<T, C>],
) -> Result<Image<T, C>, ChunkError>
where
    T: Clone + Default + Send + Sync,
{
    let mut ordered = chunks.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|chunk| chunk.rows.start);
    check_partition(size, &ordered)?;

    let mut dst = Image::from_size_val(size, T::default())?;
    let stride = size.width * C;

    let mut bands = Vec::with_capacity(ordered.len());
    let mut rest = dst.as_slice_mut();
    for chunk in &ordered {
        let (band, tail) = std::mem::take(&mut rest).split_at_mut(chunk.rows.len() * stride);
        bands.push(band);
        rest = tail;
    }

    ordered
        .par_iter()
        .zip(bands.into_par_iter())
        .try_for_each(|(chunk, band)| -> Result<(), ImageError> {
            band.clone_from_slice(chunk.kept_slice()?);
            Ok(())
        })?;

    Ok(dst)
}
