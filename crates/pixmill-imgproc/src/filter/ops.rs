use num_traits::{NumCast, PrimInt, Unsigned};
use pixmill_image::{Image, ImageError};

use super::{kernels::Kernel3, Effect};
use crate::padding::BorderMode;

/// Channel types the filters operate on: `u8`, `u16` and `u32`.
///
/// The maximum channel value is the upper clamping bound of the filters, e.g. 65535 for
/// 16-bit images. Samples are accumulated in `i64`, so only types that widen into it
/// without loss are accepted.
///
/// ```compile_fail
/// use pixmill_imgproc::filter::FilterChannel;
///
/// fn filterable<T: FilterChannel>() {}
/// filterable::<u64>();
/// ```
pub trait FilterChannel: PrimInt + Unsigned + Into<i64> + Default + Send + Sync {}

impl<T: PrimInt + Unsigned + Into<i64> + Default + Send + Sync> FilterChannel for T {}

/// Index of the alpha channel in an RGBA pixel.
const ALPHA: usize = 3;

#[inline]
fn to_i64<T: FilterChannel>(v: T) -> i64 {
    v.into()
}

/// Clamp an accumulated value into `[0, T::max_value()]`.
#[inline]
pub fn clamp_channel<T: FilterChannel>(value: i64) -> T {
    let max = to_i64(T::max_value());
    <T as NumCast>::from(value.clamp(0, max)).unwrap_or_else(T::max_value)
}

fn check_same_size<T, const C: usize>(
    src: &Image<T, C>,
    dst: &Image<T, C>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

/// Convert an RGBA image to gray by averaging the color channels.
///
/// out.R = out.G = out.B = (R + G + B) / 3, alpha is copied.
///
/// # Arguments
///
/// * `src` - The input RGBA image.
/// * `dst` - The output RGBA image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use pixmill_image::Image;
/// use pixmill_imgproc::filter::grayscale;
///
/// let src = Image::<u16, 4>::new([1, 1].into(), vec![65535, 0, 0, 65535]).unwrap();
/// let mut dst = Image::<u16, 4>::from_size_val(src.size(), 0).unwrap();
///
/// grayscale(&src, &mut dst).unwrap();
/// assert_eq!(dst.as_slice(), &[21845, 21845, 21845, 65535]);
/// ```
pub fn grayscale<T: FilterChannel>(
    src: &Image<T, 4>,
    dst: &mut Image<T, 4>,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    src.as_slice()
        .chunks_exact(4)
        .zip(dst.as_slice_mut().chunks_exact_mut(4))
        .for_each(|(src_pixel, dst_pixel)| {
            let sum = to_i64(src_pixel[0]) + to_i64(src_pixel[1]) + to_i64(src_pixel[2]);
            let gray = clamp_channel::<T>(sum / 3);
            dst_pixel[0] = gray;
            dst_pixel[1] = gray;
            dst_pixel[2] = gray;
            dst_pixel[ALPHA] = src_pixel[ALPHA];
        });

    Ok(())
}

/// Convolve an RGBA image with a 3x3 kernel.
///
/// The color channels are accumulated over the whole kernel and clamped to the channel
/// range afterwards; alpha is copied from the source pixel. Samples outside the image are
/// resolved with `border`.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, 4).
/// * `dst` - The destination image with shape (H, W, 4).
/// * `kernel` - The kernel to apply.
/// * `border` - How samples outside the image are read.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn convolve3x3<T: FilterChannel>(
    src: &Image<T, 4>,
    dst: &mut Image<T, 4>,
    kernel: &Kernel3,
    border: BorderMode,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let (rows, cols) = (src.rows(), src.cols());
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let radius = kernel.radius() as isize;
    let divisor = kernel.divisor as i64;
    let src_data = src.as_slice();

    for (y, dst_row) in dst
        .as_slice_mut()
        .chunks_exact_mut(cols * 4)
        .enumerate()
    {
        for (x, dst_pixel) in dst_row.chunks_exact_mut(4).enumerate() {
            let mut acc = [0i64; 3];
            for (ky, kernel_row) in kernel.weights.iter().enumerate() {
                let Some(sy) = border.map_index(y as isize + ky as isize - radius, rows) else {
                    continue;
                };
                for (kx, &weight) in kernel_row.iter().enumerate() {
                    if weight == 0 {
                        continue;
                    }
                    let Some(sx) = border.map_index(x as isize + kx as isize - radius, cols)
                    else {
                        continue;
                    };
                    let offset = (sy * cols + sx) * 4;
                    for (ch, sum) in acc.iter_mut().enumerate() {
                        *sum += weight as i64 * to_i64(src_data[offset + ch]);
                    }
                }
            }

            let center = (y * cols + x) * 4;
            for (ch, sum) in acc.iter().enumerate() {
                dst_pixel[ch] = clamp_channel::<T>(sum / divisor);
            }
            dst_pixel[ALPHA] = src_data[center + ALPHA];
        }
    }

    Ok(())
}

/// Apply one effect, reading from `src` and writing every pixel of `dst`.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, 4).
/// * `dst` - The destination image with shape (H, W, 4).
/// * `effect` - The effect to apply.
/// * `border` - How convolutions read outside the image.
pub fn apply_effect<T: FilterChannel>(
    src: &Image<T, 4>,
    dst: &mut Image<T, 4>,
    effect: Effect,
    border: BorderMode,
) -> Result<(), ImageError> {
    match effect.kernel() {
        Some(kernel) => convolve3x3(src, dst, kernel, border),
        None => grayscale(src, dst),
    }
}
