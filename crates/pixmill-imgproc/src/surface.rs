use pixmill_image::{Image, ImageError, ImageSize};

use crate::{
    filter::{apply_effect, Effect, FilterChannel},
    padding::BorderMode,
};

/// A double buffered image used while chaining effects.
///
/// An effect reads the `current` surface and writes the `result` surface. Once every
/// pixel of `result` is written, [`Surface::swap`] makes it the new `current`, so the
/// next effect reads the output of the previous one. Nothing is copied between effects.
#[derive(Debug, Clone)]
pub struct Surface<T, const C: usize> {
    current: Image<T, C>,
    result: Image<T, C>,
}

impl<T, const C: usize> Surface<T, C>
where
    T: Clone + Default,
{
    /// Create a surface whose `current` is the given image.
    pub fn new(current: Image<T, C>) -> Result<Self, ImageError> {
        let result = Image::from_size_val(current.size(), T::default())?;
        Ok(Self { current, result })
    }
}

impl<T, const C: usize> Surface<T, C> {
    /// Size of both surfaces.
    pub fn size(&self) -> ImageSize {
        self.current.size()
    }

    /// The read-only source of the next effect.
    pub fn current(&self) -> &Image<T, C> {
        &self.current
    }

    /// Borrow the source for reading and the target for writing at the same time.
    pub fn split_mut(&mut self) -> (&Image<T, C>, &mut Image<T, C>) {
        (&self.current, &mut self.result)
    }

    /// Make the last written result the source of the next effect.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.result);
    }

    /// Consume the surface and return the `current` image.
    pub fn into_current(self) -> Image<T, C> {
        self.current
    }
}

impl<T: FilterChannel> Surface<T, 4> {
    /// Apply one effect from `current` into `result` without swapping.
    pub fn apply(&mut self, effect: Effect, border: BorderMode) -> Result<(), ImageError> {
        let (src, dst) = self.split_mut();
        apply_effect(src, dst, effect, border)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_swap_chains_effects() -> Result<(), ImageError> {
        let image = Image::<u16, 4>::new([1, 1].into(), vec![30, 60, 90, 5])?;
        let mut surface = Surface::new(image.clone())?;

        surface.apply(Effect::Grayscale, BorderMode::Zero)?;
        // current is untouched until the swap
        assert_eq!(surface.current(), &image);

        surface.swap();
        assert_eq!(surface.current().as_slice(), &[60, 60, 60, 5]);

        surface.apply(Effect::Sharpen, BorderMode::Zero)?;
        surface.swap();
        assert_eq!(surface.into_current().as_slice(), &[300, 300, 300, 5]);
        Ok(())
    }
}
