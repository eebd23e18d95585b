//! The layer group stack.
//!
//! Frame 0 is the root and ends up on the visible surface. `begin` opens a
//! frame one level deeper, allocating it on first use; frames are pooled by
//! depth and reused by later groups at the same depth. Closing is two-step:
//! `innermost` hands back the open frame with its parent so the caller can
//! blend one onto the other, and `close` pops it once that succeeded.
//!
//! After `destroy` the frame accessors return `None` and `begin` fails.

use tracing::debug;

use crate::error::CompositorError;
use crate::render::{FramebufferPair, RenderContext, TextureFilter};

#[derive(Debug)]
struct Frame<C: RenderContext> {
    pair: FramebufferPair<C>,
    active: bool,
}

/// Arena of framebuffer pairs indexed by group depth.
#[derive(Debug)]
pub struct GroupStack<C: RenderContext> {
    frames: Vec<Frame<C>>,
    depth: usize,
    width: u32,
    height: u32,
    filter: TextureFilter,
}

impl<C: RenderContext> GroupStack<C> {
    /// Allocates the root frame.
    pub fn new(ctx: &C, width: u32, height: u32, filter: TextureFilter) -> Result<Self, CompositorError> {
        let root = FramebufferPair::new(ctx, width, height, filter)?;
        Ok(Self {
            frames: vec![Frame {
                pair: root,
                active: true,
            }],
            depth: 0,
            width,
            height,
            filter,
        })
    }

    /// Number of open groups above the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Frames allocated so far, open or not.
    pub fn allocated(&self) -> usize {
        self.frames.len()
    }

    /// Whether the frame at `index` belongs to an open group (or is the root).
    pub fn is_active(&self, index: usize) -> bool {
        self.frames.get(index).is_some_and(|f| f.active)
    }

    /// The frame passes currently draw into.
    pub fn current(&self) -> Option<&FramebufferPair<C>> {
        self.frames.get(self.depth).map(|f| &f.pair)
    }

    pub fn current_mut(&mut self) -> Option<&mut FramebufferPair<C>> {
        self.frames.get_mut(self.depth).map(|f| &mut f.pair)
    }

    /// Opens a group one level deeper.
    ///
    /// The frame is cleared to transparent black, so nothing from an
    /// earlier group at this depth shows through.
    pub fn begin(&mut self, ctx: &C) -> Result<(), CompositorError> {
        if self.frames.is_empty() {
            return Err(CompositorError::UseAfterDispose("group stack"));
        }
        let index = self.depth + 1;
        if index == self.frames.len() {
            let pair = FramebufferPair::new(ctx, self.width, self.height, self.filter)?;
            self.frames.push(Frame {
                pair,
                active: false,
            });
            debug!(index, "allocated group frame");
        }
        let frame = &mut self.frames[index];
        frame.pair.set_final(false);
        frame.pair.clear_current(ctx);
        frame.active = true;
        self.depth = index;
        debug!(depth = self.depth, "group opened");
        Ok(())
    }

    /// The innermost open group and its parent, as `(parent, child)`.
    /// The group stays open until [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// `GroupUnderflow` when only the root is open.
    pub fn innermost(&mut self) -> Result<(&mut FramebufferPair<C>, &FramebufferPair<C>), CompositorError> {
        if self.depth == 0 {
            return Err(CompositorError::GroupUnderflow);
        }
        let (parents, children) = self.frames.split_at_mut(self.depth);
        Ok((&mut parents[self.depth - 1].pair, &children[0].pair))
    }

    /// Pops the innermost group.
    ///
    /// # Errors
    ///
    /// `GroupUnderflow` when only the root is open.
    pub fn close(&mut self) -> Result<(), CompositorError> {
        if self.depth == 0 {
            return Err(CompositorError::GroupUnderflow);
        }
        self.frames[self.depth].active = false;
        self.depth -= 1;
        debug!(depth = self.depth, "group closed");
        Ok(())
    }

    /// The root frame.
    pub fn root_mut(&mut self) -> Option<&mut FramebufferPair<C>> {
        self.frames.first_mut().map(|f| &mut f.pair)
    }

    /// Resizes every allocated frame, open or pooled.
    pub fn resize(&mut self, ctx: &C, width: u32, height: u32) {
        for frame in &mut self.frames {
            frame.pair.resize(ctx, width, height);
        }
        self.width = width;
        self.height = height;
    }

    /// Releases every frame.
    pub fn destroy(&mut self, ctx: &C) {
        for frame in self.frames.drain(..) {
            frame.pair.destroy(ctx);
        }
        self.depth = 0;
    }
}
