//! Render target (framebuffer + texture) for off-screen rendering.
//!
//! A `RenderTarget` pairs a framebuffer with an RGBA8 color attachment.
//! Every group frame owns two of them.

use super::backend::{RenderContext, TextureFilter};
use super::texture::{create_texture, TextureConfig};
use crate::error::CompositorError;

/// An off-screen render target consisting of a framebuffer and its
/// attached color texture.
#[derive(Debug)]
pub struct RenderTarget<C: RenderContext> {
    fbo: C::Framebuffer,
    texture: C::Texture,
    width: u32,
    height: u32,
}

impl<C: RenderContext> RenderTarget<C> {
    /// Creates a target of the given size.
    ///
    /// # Errors
    ///
    /// `Backend` if the texture or framebuffer cannot be created, or the
    /// framebuffer is incomplete. Nothing is leaked on failure.
    pub fn new(ctx: &C, width: u32, height: u32, filter: TextureFilter) -> Result<Self, CompositorError> {
        let config = TextureConfig::new(width, height, filter);
        let texture = create_texture(ctx, &config)?;

        let fbo = match ctx.create_framebuffer(texture) {
            Ok(fbo) => fbo,
            Err(e) => {
                ctx.delete_texture(texture);
                return Err(CompositorError::Backend(e));
            }
        };

        Ok(Self {
            fbo,
            texture,
            width,
            height,
        })
    }

    /// Binds this target's framebuffer as the draw destination.
    pub fn bind(&self, ctx: &C) {
        ctx.bind_framebuffer(Some(self.fbo));
    }

    pub fn framebuffer(&self) -> C::Framebuffer {
        self.fbo
    }

    pub fn texture(&self) -> C::Texture {
        self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reallocates the color attachment at a new size. Contents are lost.
    pub fn resize(&mut self, ctx: &C, width: u32, height: u32) {
        ctx.upload_texture(self.texture, width, height, None);
        self.width = width;
        self.height = height;
    }

    /// Deletes the framebuffer and texture.
    pub fn destroy(&self, ctx: &C) {
        ctx.delete_framebuffer(self.fbo);
        ctx.delete_texture(self.texture);
    }
}
