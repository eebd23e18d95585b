//! Registered textures: GPU copies of an [`ImageSource`].
//!
//! Sources are straight RGBA8; uploads premultiply them, since the blend
//! shell reads `iImage` as premultiplied. Uploads also flip rows to GL's
//! bottom-up order unless `flip_y` is disabled.
//! Video sources call [`Texture::update`] per frame; dimensions may change.

use std::collections::HashMap;

use tracing::debug;

use super::backend::{RenderContext, TextureFilter};
use crate::drawable::{Drawable, DrawableLookup, ImageSource};
use crate::error::CompositorError;

/// Parameters for allocating a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
}

impl TextureConfig {
    pub fn new(width: u32, height: u32, filter: TextureFilter) -> Self {
        Self {
            width,
            height,
            filter,
        }
    }
}

/// Creates a texture and allocates empty storage of the configured size.
///
/// # Errors
///
/// `Backend` if the context cannot create the texture.
pub fn create_texture<C: RenderContext>(
    ctx: &C,
    config: &TextureConfig,
) -> Result<C::Texture, CompositorError> {
    let texture = ctx
        .create_texture(config.filter)
        .map_err(CompositorError::Backend)?;
    ctx.upload_texture(texture, config.width, config.height, None);
    Ok(texture)
}

/// Returns RGBA8 rows in reverse order.
pub fn flip_rows(pixels: &[u8], width: u32, height: u32) -> Vec<u8> {
    let stride = width as usize * 4;
    if stride == 0 {
        return pixels.to_vec();
    }
    pixels
        .chunks(stride)
        .take(height as usize)
        .rev()
        .flatten()
        .copied()
        .collect()
}

/// Scales RGB by alpha in place, rounding to nearest.
pub fn premultiply_rgba8(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * a + 127) / 255) as u8;
        }
    }
}

/// A GPU texture created from an image source.
#[derive(Debug)]
pub struct Texture<C: RenderContext> {
    texture: C::Texture,
    width: u32,
    height: u32,
    flip_y: bool,
    disposed: bool,
}

impl<C: RenderContext> Texture<C> {
    /// Creates the texture and uploads `source`.
    ///
    /// # Errors
    ///
    /// `SourceNotLoaded` if the source has no pixels yet, `InvalidDimensions`
    /// for a zero-sized or short source, `Backend` if allocation fails.
    pub fn new(
        ctx: &C,
        source: &dyn ImageSource,
        filter: TextureFilter,
        flip_y: bool,
    ) -> Result<Self, CompositorError> {
        let (width, height, pixels) = read_source(source, flip_y)?;
        let texture = ctx
            .create_texture(filter)
            .map_err(CompositorError::Backend)?;
        ctx.upload_texture(texture, width, height, Some(&pixels));
        debug!(width, height, "texture uploaded");
        Ok(Self {
            texture,
            width,
            height,
            flip_y,
            disposed: false,
        })
    }

    /// Re-uploads pixels from `source`, adopting its current dimensions.
    pub fn update(&mut self, ctx: &C, source: &dyn ImageSource) -> Result<(), CompositorError> {
        self.check_disposed()?;
        let (width, height, pixels) = read_source(source, self.flip_y)?;
        ctx.upload_texture(self.texture, width, height, Some(&pixels));
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Deletes the GPU texture. Safe to call more than once.
    pub fn dispose(&mut self, ctx: &C) {
        if self.disposed {
            return;
        }
        ctx.delete_texture(self.texture);
        self.disposed = true;
    }

    fn check_disposed(&self) -> Result<(), CompositorError> {
        if self.disposed {
            Err(CompositorError::UseAfterDispose("texture"))
        } else {
            Ok(())
        }
    }
}

impl<C: RenderContext> Drawable<C> for Texture<C> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn texture(&self) -> C::Texture {
        self.texture
    }

    fn bind(&self, ctx: &C, unit: u32) -> Result<(), CompositorError> {
        self.check_disposed()?;
        ctx.bind_texture(unit, Some(self.texture));
        Ok(())
    }
}

/// Registered textures by name.
impl<C: RenderContext> DrawableLookup<C> for HashMap<String, Texture<C>> {
    fn drawable(&self, name: &str) -> Option<&dyn Drawable<C>> {
        self.get(name).map(|t| t as &dyn Drawable<C>)
    }
}

fn read_source(source: &dyn ImageSource, flip_y: bool) -> Result<(u32, u32, Vec<u8>), CompositorError> {
    if !source.is_loaded() {
        return Err(CompositorError::SourceNotLoaded);
    }
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(CompositorError::InvalidDimensions);
    }
    let pixels = source.rgba().ok_or(CompositorError::SourceNotLoaded)?;
    if pixels.len() < width as usize * height as usize * 4 {
        return Err(CompositorError::InvalidDimensions);
    }
    let mut pixels = if flip_y {
        flip_rows(pixels, width, height)
    } else {
        pixels[..width as usize * height as usize * 4].to_vec()
    };
    premultiply_rgba8(&mut pixels);
    Ok((width, height, pixels))
}
