//! Placement options for drawing a layer or closing a group.

use serde::{Deserialize, Serialize};

use crate::blend::BlendMode;

/// Where and how a drawable is composited onto the current frame.
///
/// Positions and sizes are in output pixels with the origin at the top
/// left. `width`/`height` replace the drawable's own size only when both
/// are set and positive. `mask` names a registered texture whose red
/// channel scales the result; the `*_masked` draw calls take any mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawOptions {
    pub x: f32,
    pub y: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    opacity: f32,
    /// Rotation about the drawable's center, in radians.
    pub angle: f32,
    pub mode: BlendMode,
    pub mask: Option<String>,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            opacity: 1.0,
            angle: 0.0,
            mode: BlendMode::Normal,
            mask: None,
        }
    }
}

impl DrawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the opacity in [0.0, 1.0].
    pub fn opacity(&self) -> f32 {
        self.opacity.clamp(0.0, 1.0)
    }

    /// Sets the opacity, clamping to [0.0, 1.0].
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Returns options with the given opacity, clamped to [0.0, 1.0].
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.set_opacity(opacity);
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_mode(mut self, mode: BlendMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// Drawn size. A partial, zero or negative override counts as unset
    /// and the source's natural size is used.
    pub fn resolved_size(&self, natural_width: u32, natural_height: u32) -> (f32, f32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => (w, h),
            _ => (natural_width as f32, natural_height as f32),
        }
    }
}
