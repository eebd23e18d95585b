//! GPU plumbing behind the compositor.
//!
//! Everything here goes through the [`RenderContext`] trait. The `glow`
//! implementation lives in [`context`] and is only compiled with the
//! `render` feature.
//!
//! # Module overview
//!
//! - [`backend`] -- The `RenderContext` capability trait.
//! - [`shader`] -- Stage compilation, error-log parsing, linking.
//! - [`fullscreen`] -- Quad geometry and default shaders.
//! - [`texture`] -- Registered textures and upload helpers.
//! - [`target`] -- Framebuffer + texture render targets.
//! - [`ping_pong`] -- Double-buffered framebuffer pairs.
//! - [`context`] -- `glow` implementation (feature `render`).

pub mod backend;
#[cfg(feature = "render")]
pub mod context;
pub mod fullscreen;
pub mod ping_pong;
pub mod shader;
pub mod target;
pub mod texture;

pub use backend::{ActiveUniform, RenderContext, ShaderStage, TextureFilter};
#[cfg(feature = "render")]
pub use context::GlContext;
pub use fullscreen::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
pub use ping_pong::{FramebufferPair, PingPong};
pub use shader::{format_shader_error, link_stages, parse_error_log, LinkedProgram};
pub use target::RenderTarget;
pub use texture::{create_texture, Texture, TextureConfig};
