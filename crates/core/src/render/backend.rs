//! The rendering-context capability every GPU operation goes through.
//!
//! `RenderContext` is the injected collaborator: it compiles shaders, links
//! programs, reports active uniforms, allocates textures and framebuffers,
//! and submits draws. The compositor never relies on binding state left
//! behind by an earlier call; each operation binds what it needs first.
//!
//! With the `render` feature, [`GlContext`](super::GlContext) implements
//! this trait on top of `glow`.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::uniforms::UniformData;

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// One active uniform as reported by the linked program.
///
/// `gl_type` is the raw GL type enum (e.g. `0x8B52` for `vec4`); the
/// uniform registry decides which types it can write.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUniform<L> {
    pub name: String,
    pub gl_type: u32,
    pub location: L,
}

/// Texture sampling filter, applied to both minification and magnification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

/// Capability object wrapping one rendering context.
///
/// Handle types are `Copy` so callers can hold them without borrowing the
/// context. Fallible allocations report the driver's message as `Err`;
/// `compile_shader` and `link_program` report the info log.
pub trait RenderContext {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Buffer: Copy + Debug;
    type Texture: Copy + PartialEq + Debug;
    type Framebuffer: Copy + PartialEq + Debug;
    type UniformLocation: Clone + Debug;

    /// Compiles one stage. On failure the shader object is released and the
    /// compiler's info log is returned.
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;

    fn delete_shader(&self, shader: Self::Shader);

    /// Links two compiled stages. On failure the program object is released
    /// and the linker's info log is returned.
    fn link_program(
        &self,
        vertex: Self::Shader,
        fragment: Self::Shader,
    ) -> Result<Self::Program, String>;

    fn delete_program(&self, program: Self::Program);

    fn use_program(&self, program: Option<Self::Program>);

    /// Enumerates every active uniform of a linked program, in the order the
    /// driver reports them.
    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveUniform<Self::UniformLocation>>;

    /// Writes a value to a uniform of the currently bound program.
    fn write_uniform(&self, location: &Self::UniformLocation, data: &UniformData);

    fn create_vertex_buffer(&self, vertices: &[f32]) -> Result<Self::Buffer, String>;

    /// Binds `buffer` to the vertex attribute `name` of `program` with
    /// `components` floats per vertex. Missing attributes are ignored.
    fn bind_vertex_attribute(
        &self,
        program: Self::Program,
        buffer: Self::Buffer,
        name: &str,
        components: i32,
    );

    fn delete_buffer(&self, buffer: Self::Buffer);

    /// Creates a clamped RGBA texture with the given filter and 1x1 storage.
    fn create_texture(&self, filter: TextureFilter) -> Result<Self::Texture, String>;

    /// (Re)allocates RGBA8 storage, optionally filled with `pixels`
    /// (bottom-up rows, `width * height * 4` bytes).
    fn upload_texture(&self, texture: Self::Texture, width: u32, height: u32, pixels: Option<&[u8]>);

    fn delete_texture(&self, texture: Self::Texture);

    /// Binds `texture` to texture unit `unit` (`TEXTURE0 + unit`).
    fn bind_texture(&self, unit: u32, texture: Option<Self::Texture>);

    /// Creates a framebuffer with `texture` as its color attachment and
    /// verifies completeness.
    fn create_framebuffer(&self, texture: Self::Texture) -> Result<Self::Framebuffer, String>;

    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);

    /// Binds a framebuffer as the render destination; `None` targets the
    /// visible surface.
    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>);

    fn viewport(&self, width: u32, height: u32);

    fn clear(&self, color: [f32; 4]);

    /// Draws `vertex_count` vertices as a triangle list from the bound attribute.
    fn draw_triangles(&self, vertex_count: i32);
}
