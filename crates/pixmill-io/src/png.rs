use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use pixmill_image::{Image, ImageSize, Rgba16Image};
use png::{BitDepth, ColorType, Decoder, Encoder, Transformations};

use crate::{
    conv_utils::{
        convert_buf_be_u16, convert_buf_u16_be, convert_buf_u16_u8_scaled,
        convert_buf_u8_u16_scaled, expand_to_rgba, reduce_rgba,
    },
    error::IoError,
};

/// Color channels of a PNG image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngColor {
    /// One gray channel.
    Gray,
    /// Gray and alpha.
    GrayAlpha,
    /// Red, green and blue.
    Rgb,
    /// Red, green, blue and alpha.
    Rgba,
}

impl PngColor {
    /// Number of samples per pixel.
    pub fn channels(self) -> usize {
        match self {
            PngColor::Gray => 1,
            PngColor::GrayAlpha => 2,
            PngColor::Rgb => 3,
            PngColor::Rgba => 4,
        }
    }

    fn from_png(color_type: ColorType) -> Result<Self, IoError> {
        match color_type {
            ColorType::Grayscale => Ok(PngColor::Gray),
            ColorType::GrayscaleAlpha => Ok(PngColor::GrayAlpha),
            ColorType::Rgb => Ok(PngColor::Rgb),
            ColorType::Rgba => Ok(PngColor::Rgba),
            ColorType::Indexed => Err(IoError::PngDecodeError(
                "indexed image was not expanded".to_string(),
            )),
        }
    }

    fn to_png(self) -> ColorType {
        match self {
            PngColor::Gray => ColorType::Grayscale,
            PngColor::GrayAlpha => ColorType::GrayscaleAlpha,
            PngColor::Rgb => ColorType::Rgb,
            PngColor::Rgba => ColorType::Rgba,
        }
    }
}

/// Bits per sample of a PNG image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngDepth {
    /// 8 bits per sample.
    Eight,
    /// 16 bits per sample.
    Sixteen,
}

/// Pixel layout of a PNG file.
///
/// Decoding records the layout after expansion: palettes become RGB or RGBA and gray
/// below 8 bits becomes 8-bit gray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngLayout {
    /// The color channels.
    pub color: PngColor,
    /// The sample depth.
    pub depth: PngDepth,
}

impl PngLayout {
    /// Four channels with 16 bits each.
    pub const RGBA16: Self = Self {
        color: PngColor::Rgba,
        depth: PngDepth::Sixteen,
    };
}

impl Default for PngLayout {
    fn default() -> Self {
        Self::RGBA16
    }
}

/// Read a PNG image as four channels with 16 bits per channel (rgba16).
///
/// Any PNG color type is accepted: gray is replicated into the color channels, palettes
/// are expanded, 8-bit samples are scaled to the 16-bit range and a missing alpha
/// channel is fully opaque.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// A RGBA image with four channels (rgba16).
pub fn read_image_png_rgba16(file_path: impl AsRef<Path>) -> Result<Rgba16Image, IoError> {
    let (image, _) = read_image_png_layout(file_path)?;
    Ok(image)
}

/// Read a PNG image as rgba16 together with the layout of the file.
///
/// # Arguments
///
/// * `file_path` - The path to the PNG file.
///
/// # Returns
///
/// The rgba16 image and the layout to write it back in with [`write_image_png_layout`].
pub fn read_image_png_layout(
    file_path: impl AsRef<Path>,
) -> Result<(Rgba16Image, PngLayout), IoError> {
    let file_path = file_path.as_ref();
    check_png_path(file_path)?;

    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let file = File::open(file_path)?;
    decode_png_impl(BufReader::new(file))
}

/// Decodes a PNG image from raw bytes into four channels with 16 bits per channel.
///
/// # Arguments
///
/// - `bytes` - Raw bytes of the png file
pub fn decode_image_png_rgba16(bytes: &[u8]) -> Result<Rgba16Image, IoError> {
    let (image, _) = decode_png_impl(bytes)?;
    Ok(image)
}

/// Writes the given PNG _(rgba16)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image to write.
pub fn write_image_png_rgba16(
    file_path: impl AsRef<Path>,
    image: &Rgba16Image,
) -> Result<(), IoError> {
    write_image_png_layout(file_path, image, PngLayout::RGBA16)
}

/// Writes an rgba16 image to a PNG file with the given layout.
///
/// Channels missing from `layout` are dropped (gray keeps the red channel) and 8-bit
/// layouts round the samples to the nearest 8-bit value.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The image to write.
/// - `layout` - The channels and depth of the file.
pub fn write_image_png_layout(
    file_path: impl AsRef<Path>,
    image: &Rgba16Image,
    layout: PngLayout,
) -> Result<(), IoError> {
    let file_path = file_path.as_ref();
    check_png_path(file_path)?;

    let file = File::create(file_path)?;
    encode_png_impl(BufWriter::new(file), image, layout)
}

/// Encodes the given image as a PNG _(rgba16)_ into memory.
pub fn encode_image_png_rgba16(image: &Rgba16Image) -> Result<Vec<u8>, IoError> {
    let mut bytes = Vec::new();
    encode_png_impl(&mut bytes, image, PngLayout::RGBA16)?;
    Ok(bytes)
}

fn check_png_path(file_path: &Path) -> Result<(), IoError> {
    match file_path.extension() {
        Some(extension) if extension.eq_ignore_ascii_case("png") => Ok(()),
        _ => Err(IoError::InvalidFileExtension(file_path.to_path_buf())),
    }
}

// utility function to decode a png stream into rgba16
fn decode_png_impl<R: Read>(source: R) -> Result<(Rgba16Image, PngLayout), IoError> {
    let mut decoder = Decoder::new(source);
    decoder.set_transformations(Transformations::EXPAND);

    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
    buf.truncate(info.buffer_size());

    let color = PngColor::from_png(info.color_type)?;

    let (samples, depth) = match info.bit_depth {
        BitDepth::Eight => (convert_buf_u8_u16_scaled(&buf), PngDepth::Eight),
        BitDepth::Sixteen => (convert_buf_be_u16(&buf), PngDepth::Sixteen),
        depth => {
            return Err(IoError::PngDecodeError(format!(
                "unsupported bit depth after expansion: {depth:?}"
            )))
        }
    };

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };

    let image = Image::new(size, expand_to_rgba(&samples, color.channels(), u16::MAX))?;
    Ok((image, PngLayout { color, depth }))
}

fn encode_png_impl<W: Write>(
    sink: W,
    image: &Rgba16Image,
    layout: PngLayout,
) -> Result<(), IoError> {
    let mut encoder = Encoder::new(sink, image.width() as u32, image.height() as u32);
    encoder.set_color(layout.color.to_png());

    let samples = reduce_rgba(image.as_slice(), layout.color.channels());
    let data = match layout.depth {
        PngDepth::Eight => {
            encoder.set_depth(BitDepth::Eight);
            convert_buf_u16_u8_scaled(&samples)
        }
        PngDepth::Sixteen => {
            encoder.set_depth(BitDepth::Sixteen);
            convert_buf_u16_be(&samples)
        }
    };

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .write_image_data(&data)
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png_8bit(
        path: &Path,
        width: u32,
        height: u32,
        color: ColorType,
        data: &[u8],
    ) -> Result<(), IoError> {
        let file = File::create(path)?;
        let mut encoder = Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(color);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
        writer
            .write_image_data(data)
            .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
        Ok(())
    }

    #[test]
    fn read_write_png_rgba16() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("gradient.png");

        let data = (0..3 * 2 * 4).map(|i| (i * 2731) as u16).collect::<Vec<_>>();
        let image = Rgba16Image::new([3, 2].into(), data)?;
        write_image_png_rgba16(&file_path, &image)?;

        let image_back = read_image_png_rgba16(&file_path)?;
        assert_eq!(image_back, image);
        Ok(())
    }

    #[test]
    fn read_png_rgb8_expands_to_rgba16() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("rgb8.png");
        write_png_8bit(&file_path, 2, 1, ColorType::Rgb, &[255, 0, 1, 10, 20, 30])?;

        let (image, layout) = read_image_png_layout(&file_path)?;
        assert_eq!(image.size(), [2, 1].into());
        assert_eq!(
            image.as_slice(),
            &[65535, 0, 257, 65535, 2570, 5140, 7710, 65535]
        );
        assert_eq!(
            layout,
            PngLayout {
                color: PngColor::Rgb,
                depth: PngDepth::Eight
            }
        );
        Ok(())
    }

    #[test]
    fn write_png_in_source_layout() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let src_path = tmp_dir.path().join("rgb8.png");
        let dst_path = tmp_dir.path().join("rgb8_out.png");
        let data = [255, 0, 1, 10, 20, 30, 128, 64, 32];
        write_png_8bit(&src_path, 3, 1, ColorType::Rgb, &data)?;

        let (image, layout) = read_image_png_layout(&src_path)?;
        write_image_png_layout(&dst_path, &image, layout)?;

        let decoder = Decoder::new(BufReader::new(File::open(&dst_path)?));
        let mut reader = decoder
            .read_info()
            .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
        assert_eq!(info.color_type, ColorType::Rgb);
        assert_eq!(info.bit_depth, BitDepth::Eight);
        assert_eq!(&buf[..info.buffer_size()], &data);
        Ok(())
    }

    #[test]
    fn write_png_gray_alpha16_layout() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("ga16.png");
        let image = Rgba16Image::new([2, 1].into(), vec![1000, 1000, 1000, 7, 3, 3, 3, 65535])?;
        let layout = PngLayout {
            color: PngColor::GrayAlpha,
            depth: PngDepth::Sixteen,
        };
        write_image_png_layout(&file_path, &image, layout)?;

        let (back, back_layout) = read_image_png_layout(&file_path)?;
        assert_eq!(back, image);
        assert_eq!(back_layout, layout);
        Ok(())
    }

    #[test]
    fn read_png_gray_alpha8() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("ga8.png");
        write_png_8bit(&file_path, 1, 1, ColorType::GrayscaleAlpha, &[2, 128])?;

        let image = read_image_png_rgba16(&file_path)?;
        assert_eq!(image.as_slice(), &[514, 514, 514, 32896]);
        Ok(())
    }

    #[test]
    fn encode_decode_in_memory() -> Result<(), IoError> {
        let image = Rgba16Image::from_size_pixel([4, 3].into(), [1, 2, 3, 4])?;
        let bytes = encode_image_png_rgba16(&image)?;
        assert_eq!(decode_image_png_rgba16(&bytes)?, image);
        Ok(())
    }

    #[test]
    fn read_png_errors() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;

        let missing = tmp_dir.path().join("missing.png");
        assert!(matches!(
            read_image_png_rgba16(&missing),
            Err(IoError::FileDoesNotExist(_))
        ));

        let wrong_ext = tmp_dir.path().join("image.jpg");
        assert!(matches!(
            read_image_png_rgba16(&wrong_ext),
            Err(IoError::InvalidFileExtension(_))
        ));

        let garbage = tmp_dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not a png")?;
        assert!(matches!(
            read_image_png_rgba16(&garbage),
            Err(IoError::PngDecodeError(_))
        ));
        Ok(())
    }
}
