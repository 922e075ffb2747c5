/// A 3x3 convolution kernel with integer weights.
///
/// The filtered value of a channel is `sum(weight * value) / divisor`, computed in integer
/// arithmetic so uniform kernels like the box blur reproduce constant regions exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel3 {
    /// Row-major kernel weights.
    pub weights: [[i32; 3]; 3],
    /// Divisor applied after accumulating all weighted samples.
    pub divisor: i32,
}

impl Kernel3 {
    /// Number of pixels the kernel reads on each side of the center pixel.
    pub const fn radius(&self) -> usize {
        1
    }
}

/// Sharpen kernel.
pub const SHARPEN: Kernel3 = Kernel3 {
    weights: [[0, -1, 0], [-1, 5, -1], [0, -1, 0]],
    divisor: 1,
};

/// Edge detection kernel.
pub const EDGE: Kernel3 = Kernel3 {
    weights: [[-1, -1, -1], [-1, 8, -1], [-1, -1, -1]],
    divisor: 1,
};

/// Box blur kernel, `1/9` in every cell.
pub const BLUR: Kernel3 = Kernel3 {
    weights: [[1, 1, 1], [1, 1, 1], [1, 1, 1]],
    divisor: 9,
};
