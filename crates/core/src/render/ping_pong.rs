//! Double-buffered render targets.
//!
//! `PingPong` is the pure index math: which of two buffers holds the latest
//! output. `FramebufferPair` owns the two targets and performs the switch
//! before each pass: the latest output becomes the `iTexture` input and
//! the other target becomes the destination.

use tracing::trace;

use super::backend::{RenderContext, TextureFilter};
use super::target::RenderTarget;
use crate::drawable::Drawable;
use crate::error::CompositorError;
use crate::uniforms::PRIMARY_TEXTURE_UNIT;

/// Tracks which of two buffers is current. The invariant
/// `current() + other() == 1` always holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingPong {
    current: usize,
}

impl PingPong {
    /// Creates a new `PingPong` with buffer 0 current.
    pub fn new() -> Self {
        Self { current: 0 }
    }

    /// Index of the buffer holding the latest output.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Index of the next destination.
    pub fn other(&self) -> usize {
        1 - self.current
    }

    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

/// Two same-sized render targets with a one-shot "final" flag.
#[derive(Debug)]
pub struct FramebufferPair<C: RenderContext> {
    targets: [RenderTarget<C>; 2],
    ping_pong: PingPong,
    final_pass: bool,
}

impl<C: RenderContext> FramebufferPair<C> {
    /// Allocates both targets.
    ///
    /// # Errors
    ///
    /// `Backend` if either target cannot be created. The first target is
    /// released when the second fails.
    pub fn new(ctx: &C, width: u32, height: u32, filter: TextureFilter) -> Result<Self, CompositorError> {
        let first = RenderTarget::new(ctx, width, height, filter)?;
        let second = match RenderTarget::new(ctx, width, height, filter) {
            Ok(target) => target,
            Err(e) => {
                first.destroy(ctx);
                return Err(e);
            }
        };
        Ok(Self {
            targets: [first, second],
            ping_pong: PingPong::new(),
            final_pass: false,
        })
    }

    pub fn current_index(&self) -> usize {
        self.ping_pong.current()
    }

    pub fn current(&self) -> &RenderTarget<C> {
        &self.targets[self.ping_pong.current()]
    }

    pub fn is_final(&self) -> bool {
        self.final_pass
    }

    /// Makes the next switch target the visible surface instead of a
    /// framebuffer.
    pub fn set_final(&mut self, final_pass: bool) {
        self.final_pass = final_pass;
    }

    /// Binds the current texture to unit 0, flips, and binds the new
    /// current framebuffer (or the visible surface once, if final).
    pub fn switch_framebuffer(&mut self, ctx: &C) {
        ctx.bind_texture(PRIMARY_TEXTURE_UNIT, Some(self.current().texture()));
        self.ping_pong.swap();
        if self.final_pass {
            ctx.bind_framebuffer(None);
            self.final_pass = false;
            trace!("switched to visible surface");
        } else {
            self.current().bind(ctx);
            trace!(current = self.ping_pong.current(), "switched framebuffer");
        }
    }

    /// Clears the current buffer to transparent black, leaving it bound.
    pub fn clear_current(&self, ctx: &C) {
        let target = self.current();
        target.bind(ctx);
        ctx.viewport(target.width(), target.height());
        ctx.clear([0.0; 4]);
    }

    pub fn resize(&mut self, ctx: &C, width: u32, height: u32) {
        for target in &mut self.targets {
            target.resize(ctx, width, height);
        }
    }

    pub fn destroy(&self, ctx: &C) {
        for target in &self.targets {
            target.destroy(ctx);
        }
    }
}

impl<C: RenderContext> Drawable<C> for FramebufferPair<C> {
    fn width(&self) -> u32 {
        self.current().width()
    }

    fn height(&self) -> u32 {
        self.current().height()
    }

    fn texture(&self) -> C::Texture {
        self.current().texture()
    }

    fn bind(&self, ctx: &C, unit: u32) -> Result<(), CompositorError> {
        ctx.bind_texture(unit, Some(self.current().texture()));
        Ok(())
    }
}
