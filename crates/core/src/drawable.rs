//! The drawable capability and the image-source collaborator.
//!
//! Anything with a size and a texture that can be bound to a texture unit is
//! a [`Drawable`]: registered textures and group frames both qualify, which
//! lets the blend pipeline composite "a layer" and "an image" the same way.

use crate::error::CompositorError;
use crate::render::RenderContext;

/// A sized texture that can be bound to a texture unit.
pub trait Drawable<C: RenderContext> {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn texture(&self) -> C::Texture;

    /// Binds the texture to `unit`. Fails with `UseAfterDispose` when the
    /// underlying object has been released.
    fn bind(&self, ctx: &C, unit: u32) -> Result<(), CompositorError>;
}

/// Name-based drawable resolution, used for `TextureRef` uniforms and masks.
pub trait DrawableLookup<C: RenderContext> {
    fn drawable(&self, name: &str) -> Option<&dyn Drawable<C>>;
}

/// A lookup that resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDrawables;

impl<C: RenderContext> DrawableLookup<C> for NoDrawables {
    fn drawable(&self, _name: &str) -> Option<&dyn Drawable<C>> {
        None
    }
}

/// Mask for a pass: a registered texture name, any drawable, or an image
/// uploaded just for that pass. Only the red channel is sampled.
pub enum Mask<'a, C: RenderContext> {
    Named(&'a str),
    Drawable(&'a dyn Drawable<C>),
    Image(&'a dyn ImageSource),
}

impl<'a, C: RenderContext> Mask<'a, C> {
    /// The image to upload, for [`Mask::Image`].
    pub fn image(&self) -> Option<&'a dyn ImageSource> {
        match self {
            Mask::Image(source) => Some(*source),
            _ => None,
        }
    }
}

/// A loaded 2D image or video frame with known pixel dimensions.
///
/// Decoding happens elsewhere; the compositor only needs straight RGBA8
/// rows in top-to-bottom order.
pub trait ImageSource {
    /// Pixel dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Whether pixel data is available. Video sources report `false` until
    /// their first frame is decoded.
    fn is_loaded(&self) -> bool {
        true
    }

    /// RGBA8 pixels, `width * height * 4` bytes, top row first.
    fn rgba(&self) -> Option<&[u8]>;
}

/// An owned RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps existing RGBA8 data.
    ///
    /// Returns `InvalidDimensions` when a dimension is zero or the data
    /// length is not `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CompositorError> {
        if width == 0 || height == 0 {
            return Err(CompositorError::InvalidDimensions);
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(CompositorError::InvalidDimensions)?;
        if data.len() != expected {
            return Err(CompositorError::InvalidDimensions);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer filled with one RGBA8 color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, CompositorError> {
        let count = (width as usize) * (height as usize);
        Self::new(width, height, rgba.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ImageSource for PixelBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rgba(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}
