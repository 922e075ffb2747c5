/// Widen 8-bit samples to 16 bits, mapping 255 to 65535.
pub fn convert_buf_u8_u16_scaled(buf: &[u8]) -> Vec<u16> {
    buf.iter().map(|&v| v as u16 * 257).collect()
}

/// Narrow 16-bit samples to 8 bits, rounding to the nearest value.
///
/// Samples widened by [`convert_buf_u8_u16_scaled`] come back unchanged.
pub fn convert_buf_u16_u8_scaled(buf: &[u16]) -> Vec<u8> {
    buf.iter()
        .map(|&v| ((v as u32 + 128) / 257) as u8)
        .collect()
}

/// Utility function to convert big endian 16-bit `&[u8]` samples to `Vec<u16>`
pub fn convert_buf_be_u16(buf: &[u8]) -> Vec<u16> {
    buf.chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Utility function to convert `&[u16]` samples to big endian bytes
pub fn convert_buf_u16_be(buf: &[u16]) -> Vec<u8> {
    let mut buf_u8: Vec<u8> = Vec::with_capacity(buf.len() * 2);
    for sample in buf {
        buf_u8.extend_from_slice(&sample.to_be_bytes());
    }
    buf_u8
}

/// Expand interleaved samples with `channels` channels into RGBA.
///
/// Gray is replicated into the color channels and a missing alpha is set to `opaque`.
pub fn expand_to_rgba(samples: &[u16], channels: usize, opaque: u16) -> Vec<u16> {
    let mut rgba = Vec::with_capacity(samples.len() / channels.max(1) * 4);
    for px in samples.chunks_exact(channels.max(1)) {
        match channels {
            1 => rgba.extend_from_slice(&[px[0], px[0], px[0], opaque]),
            2 => rgba.extend_from_slice(&[px[0], px[0], px[0], px[1]]),
            3 => rgba.extend_from_slice(&[px[0], px[1], px[2], opaque]),
            _ => rgba.extend_from_slice(&px[..4]),
        }
    }
    rgba
}

/// Reduce RGBA pixels to `channels` channels, the inverse of [`expand_to_rgba`].
///
/// Gray takes the red channel, gray-alpha the red and alpha channels and RGB drops alpha.
pub fn reduce_rgba(rgba: &[u16], channels: usize) -> Vec<u16> {
    let mut samples = Vec::with_capacity(rgba.len() / 4 * channels);
    for px in rgba.chunks_exact(4) {
        match channels {
            1 => samples.push(px[0]),
            2 => samples.extend_from_slice(&[px[0], px[3]]),
            3 => samples.extend_from_slice(&px[..3]),
            _ => samples.extend_from_slice(px),
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_samples() {
        assert_eq!(convert_buf_u8_u16_scaled(&[0, 1, 255]), vec![0, 257, 65535]);
        assert_eq!(convert_buf_be_u16(&[0x12, 0x34, 0xff, 0x00]), vec![0x1234, 0xff00]);
        assert_eq!(convert_buf_u16_be(&[0x1234, 0xff00]), vec![0x12, 0x34, 0xff, 0x00]);
        assert_eq!(
            convert_buf_u16_u8_scaled(&[0, 257, 300, 65535]),
            vec![0, 1, 1, 255]
        );
    }

    #[test]
    fn test_expand_to_rgba() {
        assert_eq!(expand_to_rgba(&[7], 1, 9), vec![7, 7, 7, 9]);
        assert_eq!(expand_to_rgba(&[7, 3], 2, 9), vec![7, 7, 7, 3]);
        assert_eq!(expand_to_rgba(&[1, 2, 3], 3, 9), vec![1, 2, 3, 9]);
        assert_eq!(expand_to_rgba(&[1, 2, 3, 4], 4, 9), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_reduce_rgba() {
        let rgba = [1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(reduce_rgba(&rgba, 1), vec![1, 5]);
        assert_eq!(reduce_rgba(&rgba, 2), vec![1, 4, 5, 8]);
        assert_eq!(reduce_rgba(&rgba, 3), vec![1, 2, 3, 5, 6, 7]);
        assert_eq!(reduce_rgba(&rgba, 4), rgba.to_vec());
    }
}
