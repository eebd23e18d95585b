//! `glow`-backed [`RenderContext`].
//!
//! `GlContext` owns a `glow::Context` and translates every capability call
//! into the matching GL calls. All GL access in the crate is confined to
//! this file.

use glow::HasContext;

use super::backend::{ActiveUniform, RenderContext, ShaderStage, TextureFilter};
use crate::uniforms::UniformData;

/// Wraps a `glow::Context` for use by the compositor.
pub struct GlContext {
    gl: glow::Context,
    vertex_array: Option<glow::VertexArray>,
}

impl GlContext {
    /// Wraps the given GL context.
    ///
    /// Binds a vertex array object when the context supports them (GL 3+,
    /// GLES 3, WebGL 2); attribute state lives in it.
    #[allow(unsafe_code)]
    pub fn new(gl: glow::Context) -> Self {
        // SAFETY: creating and binding a VAO has no preconditions beyond a
        // current context; failure leaves the default attribute state.
        let vertex_array = unsafe { gl.create_vertex_array().ok() };
        if let Some(vao) = vertex_array {
            unsafe { gl.bind_vertex_array(Some(vao)) };
        }
        Self { gl, vertex_array }
    }

    /// Returns a reference to the underlying `glow::Context`.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Releases the vertex array and returns the underlying context.
    #[allow(unsafe_code)]
    pub fn into_gl(self) -> glow::Context {
        if let Some(vao) = self.vertex_array {
            // SAFETY: vao was created by this context in new().
            unsafe { self.gl.delete_vertex_array(vao) };
        }
        self.gl
    }
}

fn filter_enum(filter: TextureFilter) -> i32 {
    match filter {
        TextureFilter::Linear => glow::LINEAR as i32,
        TextureFilter::Nearest => glow::NEAREST as i32,
    }
}

#[allow(unsafe_code)]
impl RenderContext for GlContext {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type Texture = glow::Texture;
    type Framebuffer = glow::Framebuffer;
    type UniformLocation = glow::UniformLocation;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<glow::Shader, String> {
        let shader_type = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let gl = &self.gl;

        // SAFETY: shader_type is a valid stage enum and the shader handle is
        // used only after successful creation. It is deleted on failure.
        unsafe {
            let shader = gl.create_shader(shader_type)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if gl.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                Err(log)
            }
        }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        // SAFETY: shader came from compile_shader on this context.
        unsafe { self.gl.delete_shader(shader) };
    }

    fn link_program(&self, vertex: glow::Shader, fragment: glow::Shader) -> Result<glow::Program, String> {
        let gl = &self.gl;

        // SAFETY: both shaders are valid compiled handles. The program is
        // deleted on link failure.
        unsafe {
            let program = gl.create_program()?;
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            gl.link_program(program);
            if gl.get_program_link_status(program) {
                Ok(program)
            } else {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                Err(log)
            }
        }
    }

    fn delete_program(&self, program: glow::Program) {
        // SAFETY: program came from link_program on this context.
        unsafe { self.gl.delete_program(program) };
    }

    fn use_program(&self, program: Option<glow::Program>) {
        // SAFETY: program is None or a valid linked program.
        unsafe { self.gl.use_program(program) };
    }

    fn active_uniforms(&self, program: glow::Program) -> Vec<ActiveUniform<glow::UniformLocation>> {
        let gl = &self.gl;

        // SAFETY: program is a valid linked program; indices stay below the
        // reported active uniform count.
        unsafe {
            let count = gl.get_active_uniforms(program);
            (0..count)
                .filter_map(|index| {
                    let info = gl.get_active_uniform(program, index)?;
                    let location = gl.get_uniform_location(program, &info.name)?;
                    Some(ActiveUniform {
                        name: info.name,
                        gl_type: info.utype,
                        location,
                    })
                })
                .collect()
        }
    }

    fn write_uniform(&self, location: &glow::UniformLocation, data: &UniformData) {
        let gl = &self.gl;
        let loc = Some(location);

        // SAFETY: location belongs to the currently bound program; the
        // registry resolved `data` against the uniform's declared type.
        unsafe {
            match *data {
                UniformData::Float(x) => gl.uniform_1_f32(loc, x),
                UniformData::Vec2([x, y]) => gl.uniform_2_f32(loc, x, y),
                UniformData::Vec3([x, y, z]) => gl.uniform_3_f32(loc, x, y, z),
                UniformData::Vec4([x, y, z, w]) => gl.uniform_4_f32(loc, x, y, z, w),
                UniformData::Int(x) => gl.uniform_1_i32(loc, x),
                UniformData::IVec2([x, y]) => gl.uniform_2_i32(loc, x, y),
                UniformData::IVec3([x, y, z]) => gl.uniform_3_i32(loc, x, y, z),
                UniformData::IVec4([x, y, z, w]) => gl.uniform_4_i32(loc, x, y, z, w),
                UniformData::Mat2(ref m) => gl.uniform_matrix_2_f32_slice(loc, false, m),
                UniformData::Mat3(ref m) => gl.uniform_matrix_3_f32_slice(loc, false, m),
                UniformData::Mat4(ref m) => gl.uniform_matrix_4_f32_slice(loc, false, m),
            }
        }
    }

    fn create_vertex_buffer(&self, vertices: &[f32]) -> Result<glow::Buffer, String> {
        let bytes: Vec<u8> = vertices.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let gl = &self.gl;

        // SAFETY: the buffer is bound before upload and unbound afterwards.
        unsafe {
            let buffer = gl.create_buffer()?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &bytes, glow::STATIC_DRAW);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(buffer)
        }
    }

    fn bind_vertex_attribute(&self, program: glow::Program, buffer: glow::Buffer, name: &str, components: i32) {
        let gl = &self.gl;

        // SAFETY: program and buffer are valid handles; the attribute index
        // comes from the driver.
        unsafe {
            let Some(index) = gl.get_attrib_location(program, name) else {
                return;
            };
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            gl.enable_vertex_attrib_array(index);
            gl.vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, 0, 0);
        }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        // SAFETY: buffer came from create_vertex_buffer on this context.
        unsafe { self.gl.delete_buffer(buffer) };
    }

    fn create_texture(&self, filter: TextureFilter) -> Result<glow::Texture, String> {
        let gl = &self.gl;
        let filter = filter_enum(filter);

        // SAFETY: the new texture is bound to TEXTURE_2D while it is
        // configured and given 1x1 storage.
        unsafe {
            let texture = gl.create_texture()?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                1,
                1,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(None),
            );
            Ok(texture)
        }
    }

    fn upload_texture(&self, texture: glow::Texture, width: u32, height: u32, pixels: Option<&[u8]>) {
        let gl = &self.gl;

        // SAFETY: texture is valid; pixels, when present, hold
        // width * height * 4 bytes as checked by the caller.
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        // SAFETY: texture came from create_texture on this context.
        unsafe { self.gl.delete_texture(texture) };
    }

    fn bind_texture(&self, unit: u32, texture: Option<glow::Texture>) {
        // SAFETY: unit is a small non-negative offset from TEXTURE0.
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn create_framebuffer(&self, texture: glow::Texture) -> Result<glow::Framebuffer, String> {
        let gl = &self.gl;

        // SAFETY: texture is a valid 2D texture. The framebuffer is deleted
        // if it is incomplete.
        unsafe {
            let fbo = gl.create_framebuffer()?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(fbo);
                return Err(format!("framebuffer incomplete: status 0x{status:04X}"));
            }
            Ok(fbo)
        }
    }

    fn delete_framebuffer(&self, framebuffer: glow::Framebuffer) {
        // SAFETY: framebuffer came from create_framebuffer on this context.
        unsafe { self.gl.delete_framebuffer(framebuffer) };
    }

    fn bind_framebuffer(&self, framebuffer: Option<glow::Framebuffer>) {
        // SAFETY: framebuffer is None (default surface) or a complete FBO.
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
    }

    fn viewport(&self, width: u32, height: u32) {
        // SAFETY: plain state setter.
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) };
    }

    fn clear(&self, color: [f32; 4]) {
        let [r, g, b, a] = color;
        // SAFETY: plain state setter and clear of the bound framebuffer.
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_triangles(&self, vertex_count: i32) {
        // SAFETY: callers bind a program and the position attribute first.
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, 0, vertex_count) };
    }
}
