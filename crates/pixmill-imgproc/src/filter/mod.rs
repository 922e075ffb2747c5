//! Filter operations
//!
//! This module provides the effects that can be chained on an image: a pointwise
//! grayscale conversion and three 3x3 convolutions.

use std::{fmt, str::FromStr};

use crate::error::ParseEffectError;

/// Filter kernels
pub mod kernels;

/// Filter operations
mod ops;
pub use ops::*;

/// One image effect of a filtering job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Average the color channels of every pixel.
    Grayscale,
    /// 3x3 sharpen convolution.
    Sharpen,
    /// 3x3 edge detection convolution.
    Edge,
    /// 3x3 box blur convolution.
    Blur,
}

impl Effect {
    /// The one letter code of the effect in job descriptors.
    pub fn code(&self) -> char {
        match self {
            Effect::Grayscale => 'G',
            Effect::Sharpen => 'S',
            Effect::Edge => 'E',
            Effect::Blur => 'B',
        }
    }

    /// The convolution kernel of the effect, `None` for pointwise effects.
    pub fn kernel(&self) -> Option<&'static kernels::Kernel3> {
        match self {
            Effect::Grayscale => None,
            Effect::Sharpen => Some(&kernels::SHARPEN),
            Effect::Edge => Some(&kernels::EDGE),
            Effect::Blur => Some(&kernels::BLUR),
        }
    }

    /// Number of neighbouring rows (and columns) the effect reads on each side of a pixel.
    pub fn radius(&self) -> usize {
        self.kernel().map_or(0, |k| k.radius())
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Effect::Grayscale => "grayscale",
            Effect::Sharpen => "sharpen",
            Effect::Edge => "edge",
            Effect::Blur => "blur",
        };
        write!(f, "{name} ({})", self.code())
    }
}

impl FromStr for Effect {
    type Err = ParseEffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "G" => Ok(Effect::Grayscale),
            "S" => Ok(Effect::Sharpen),
            "E" => Ok(Effect::Edge),
            "B" => Ok(Effect::Blur),
            _ => Err(ParseEffectError(s.to_string())),
        }
    }
}

/// Sum of the read radius of every effect in the chain.
///
/// This is the number of rows next to a chunk border whose values can be wrong after
/// applying the whole chain to the chunk in isolation.
pub fn chain_radius(effects: &[Effect]) -> usize {
    effects.iter().map(Effect::radius).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_effect_codes() -> Result<(), ParseEffectError> {
        let effects = ["G", "S", "E", "B"]
            .iter()
            .map(|c| c.parse::<Effect>())
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            effects,
            vec![Effect::Grayscale, Effect::Sharpen, Effect::Edge, Effect::Blur]
        );
        for effect in effects {
            assert_eq!(effect.code().to_string().parse::<Effect>()?, effect);
        }
        Ok(())
    }

    #[test]
    fn parse_effect_unknown() {
        assert_eq!(
            "X".parse::<Effect>(),
            Err(ParseEffectError("X".to_string()))
        );
        assert!("g".parse::<Effect>().is_err());
        assert!("".parse::<Effect>().is_err());
    }

    #[test]
    fn effect_radius() {
        assert_eq!(Effect::Grayscale.radius(), 0);
        assert_eq!(Effect::Sharpen.radius(), 1);
        assert_eq!(Effect::Edge.radius(), 1);
        assert_eq!(Effect::Blur.radius(), 1);
        assert_eq!(
            chain_radius(&[Effect::Grayscale, Effect::Blur, Effect::Edge]),
            2
        );
        assert_eq!(chain_radius(&[]), 0);
    }
}
