/// A border type for the convolution filters.
///
/// Decides what a kernel reads when it reaches outside the buffer it is applied to.
/// Every mode only looks at the buffer itself, so the result near an image border does
/// not depend on how the image was split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderMode {
    /// Samples outside the buffer contribute zero.
    ///
    /// Example: ...d c b a | 0 0 0 0...
    #[default]
    Zero,

    /// Takes the outermost row or column of pixels and repeats it into the border.
    ///
    /// Example: ...d c b a | a a a a...
    Replicate,

    /// Reflects the pixel values at the boundary, starting with the pixel 'next' to the edge.
    ///
    /// Example: ...d c b a | b c d e...
    Reflect101,
}

impl BorderMode {
    #[inline]
    fn reflect101(i: isize, len: usize) -> usize {
        if len == 1 {
            return 0;
        }
        let len = len as isize;
        let mut i = i;
        while i < 0 || i >= len {
            if i < 0 {
                i = -i;
            } else {
                i = 2 * len - i - 2;
            }
        }
        i as usize
    }

    /// Maps index `i` to a valid index within `[0, len)` according to the border mode.
    ///
    /// Returns `None` when the sample must be treated as zero.
    ///
    /// # Arguments
    /// - `i`: The (possibly out-of-range) coordinate index.
    /// - `len`: The valid length of the dimension.
    #[inline]
    pub fn map_index(&self, i: isize, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if i >= 0 && (i as usize) < len {
            return Some(i as usize);
        }
        match self {
            BorderMode::Zero => None,
            BorderMode::Replicate => Some(i.clamp(0, len as isize - 1) as usize),
            BorderMode::Reflect101 => Some(Self::reflect101(i, len)),
        }
    }
}

impl std::str::FromStr for BorderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zero" | "constant" => Ok(BorderMode::Zero),
            "replicate" => Ok(BorderMode::Replicate),
            "reflect101" => Ok(BorderMode::Reflect101),
            other => Err(format!("unknown border mode: {other}")),
        }
    }
}
