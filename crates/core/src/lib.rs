#![deny(unsafe_code)]
//! Core of the stratum layered image compositor.
//!
//! Provides the `@use` shader `Preprocessor`, `Program` with its
//! `UniformRegistry`, the ping-pong `FramebufferPair` and `GroupStack`,
//! the `BlendMode` shader library with a CPU reference, and the
//! `Compositor` that ties them together over a `RenderContext`.

pub mod blend;
pub mod color;
pub mod compositor;
pub mod config;
pub mod drawable;
pub mod error;
pub mod group;
pub mod imports;
pub mod options;
pub mod params;
pub mod preprocess;
pub mod program;
pub mod render;
pub mod uniforms;

#[cfg(test)]
pub(crate) mod testing;

pub use blend::BlendMode;
pub use color::Rgba;
pub use compositor::Compositor;
pub use config::CompositorConfig;
pub use drawable::{Drawable, DrawableLookup, ImageSource, Mask, PixelBuffer};
pub use error::{CompositorError, LineErrors, ShaderCompileError};
pub use group::GroupStack;
pub use options::DrawOptions;
pub use params::uniforms_from_json;
pub use preprocess::{Preprocessed, Preprocessor};
pub use program::{Pass, Program};
pub use render::{RenderContext, ShaderStage, TextureFilter};
pub use uniforms::{UniformRegistry, UniformType, UniformValue, Uniforms};
