use std::ops::Range;

use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use pixmill_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Represents an image with interleaved pixel data.
///
/// The pixels are stored row-major with shape (H, W, C), where H is the height of the image,
/// W is the width and C the number of channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

/// A four channel image with 16 bits per channel, the working format of the filters.
pub type Rgba16Image = Image<u16, 4>;

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use pixmill_image::{Image, ImageSize};
    ///
    /// let image = Image::<u16, 4>::new(
    ///     ImageSize {
    ///         width: 10,
    ///         height: 20,
    ///     },
    ///     vec![0u16; 10 * 20 * 4],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 4);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        if data.len() != size.width * size.height * CHANNELS {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                size.width * size.height * CHANNELS,
            ));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size and default pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `val` - The value every channel of every pixel is set to.
    ///
    /// # Examples
    ///
    /// ```
    /// use pixmill_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::from_size_val([10, 20].into(), 7u8).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.as_slice()[0], 7);
    /// ```
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let data = vec![val; size.width * size.height * CHANNELS];
        Image::new(size, data)
    }

    /// Create a new image by repeating one pixel over the whole image.
    pub fn from_size_pixel(size: ImageSize, pixel: [T; CHANNELS]) -> Result<Self, ImageError>
    where
        T: Copy,
    {
        let mut data = Vec::with_capacity(size.width * size.height * CHANNELS);
        for _ in 0..size.width * size.height {
            data.extend_from_slice(&pixel);
        }
        Image::new(size, data)
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the number of columns of the image.
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// Get the number of rows of the image.
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        CHANNELS
    }

    /// Number of values in one row of pixels.
    pub fn row_stride(&self) -> usize {
        self.size.width * CHANNELS
    }

    /// Get the pixel data of the image as a flat slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the pixel data of the image as a mutable flat slice.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get a channel value at `[row, col, channel]`.
    ///
    /// Returns `None` if the index is out of bounds.
    pub fn get(&self, index: [usize; 3]) -> Option<&T> {
        let [row, col, ch] = index;
        if row >= self.rows() || col >= self.cols() || ch >= CHANNELS {
            return None;
        }
        self.data.get((row * self.cols() + col) * CHANNELS + ch)
    }

    /// Get the channels of the pixel at column `x` and row `y`.
    ///
    /// # Errors
    ///
    /// If the coordinates are out of bounds, an error is returned.
    pub fn pixel(&self, x: usize, y: usize) -> Result<&[T], ImageError> {
        if x >= self.width() || y >= self.height() {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.width(),
                self.height(),
            ));
        }
        let offset = (y * self.cols() + x) * CHANNELS;
        Ok(&self.data[offset..offset + CHANNELS])
    }

    /// Get the flat pixel data of a range of rows.
    ///
    /// # Errors
    ///
    /// If the range does not fit in the image, an error is returned.
    pub fn row_slice(&self, rows: Range<usize>) -> Result<&[T], ImageError> {
        if rows.start > rows.end || rows.end > self.rows() {
            return Err(ImageError::RowRangeOutOfBounds(
                rows.start,
                rows.end,
                self.rows(),
            ));
        }
        let stride = self.row_stride();
        Ok(&self.data[rows.start * stride..rows.end * stride])
    }

    /// Copy a range of rows into a new image of the same width.
    ///
    /// # Examples
    ///
    /// ```
    /// use pixmill_image::Image;
    ///
    /// let image = Image::<u8, 1>::new([2, 3].into(), vec![0, 1, 2, 3, 4, 5]).unwrap();
    /// let band = image.crop_rows(1..3).unwrap();
    ///
    /// assert_eq!(band.height(), 2);
    /// assert_eq!(band.as_slice(), &[2, 3, 4, 5]);
    /// ```
    pub fn crop_rows(&self, rows: Range<usize>) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let height = rows.end.saturating_sub(rows.start);
        let data = self.row_slice(rows)?.to_vec();
        Image::new(
            ImageSize {
                width: self.width(),
                height,
            },
            data,
        )
    }
}
