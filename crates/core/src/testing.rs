//! In-memory `RenderContext` for unit tests.
//!
//! Records every bind, uniform write and draw so tests can assert on the
//! call sequence without a GPU. Uniform introspection scans the linked
//! sources for `uniform <type> <name>;` declarations. A line starting with
//! `#error` fails compilation with a driver-style `ERROR: 0:<line>:` log.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::drawable::Drawable;
use crate::error::CompositorError;
use crate::render::{ActiveUniform, RenderContext, ShaderStage, TextureFilter};
use crate::uniforms::{UniformData, UniformType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockShader(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockProgram(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockBuffer(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockTexture(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockFramebuffer(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockLocation {
    pub program: MockProgram,
    pub name: String,
}

/// Snapshot of the binding state at a draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: Option<MockProgram>,
    pub framebuffer: Option<MockFramebuffer>,
    pub textures: BTreeMap<u32, MockTexture>,
    pub viewport: (u32, u32),
    pub vertex_count: i32,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    shaders: HashMap<u32, (ShaderStage, String)>,
    programs: HashMap<u32, Vec<(String, u32)>>,
    buffers: HashMap<u32, Vec<f32>>,
    textures: HashMap<u32, (u32, u32)>,
    framebuffers: HashMap<u32, MockTexture>,
    compiled: Vec<(ShaderStage, String)>,
    current_program: Option<MockProgram>,
    bound_framebuffer: Option<MockFramebuffer>,
    bound_textures: BTreeMap<u32, MockTexture>,
    attributes: Vec<(MockProgram, MockBuffer, String, i32)>,
    uploads: Vec<(MockTexture, u32, u32, Option<Vec<u8>>)>,
    uniform_writes: Vec<(String, UniformData)>,
    viewport: (u32, u32),
    clears: Vec<[f32; 4]>,
    draws: Vec<DrawCall>,
    fail_link: bool,
}

impl State {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MockContext {
    state: RefCell<State>,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent link fail.
    pub fn fail_links(&self) {
        self.state.borrow_mut().fail_link = true;
    }

    /// Compiles and links two sources, panicking on failure.
    pub fn link_sources(&self, vertex: &str, fragment: &str) -> MockProgram {
        let vs = self.compile_shader(ShaderStage::Vertex, vertex).unwrap();
        let fs = self.compile_shader(ShaderStage::Fragment, fragment).unwrap();
        self.link_program(vs, fs).unwrap()
    }

    pub fn compiled_sources(&self) -> Vec<(ShaderStage, String)> {
        self.state.borrow().compiled.clone()
    }

    pub fn current_program(&self) -> Option<MockProgram> {
        self.state.borrow().current_program
    }

    pub fn bound_framebuffer(&self) -> Option<MockFramebuffer> {
        self.state.borrow().bound_framebuffer
    }

    pub fn bound_texture(&self, unit: u32) -> Option<MockTexture> {
        self.state.borrow().bound_textures.get(&unit).copied()
    }

    pub fn framebuffer_texture(&self, fbo: MockFramebuffer) -> Option<MockTexture> {
        self.state.borrow().framebuffers.get(&fbo.0).copied()
    }

    pub fn texture_size(&self, texture: MockTexture) -> Option<(u32, u32)> {
        self.state.borrow().textures.get(&texture.0).copied()
    }

    pub fn uploads(&self) -> Vec<(MockTexture, u32, u32, Option<Vec<u8>>)> {
        self.state.borrow().uploads.clone()
    }

    pub fn attributes(&self) -> Vec<(MockProgram, MockBuffer, String, i32)> {
        self.state.borrow().attributes.clone()
    }

    pub fn buffer_data(&self, buffer: MockBuffer) -> Option<Vec<f32>> {
        self.state.borrow().buffers.get(&buffer.0).cloned()
    }

    pub fn uniform_writes(&self) -> Vec<(String, UniformData)> {
        self.state.borrow().uniform_writes.clone()
    }

    /// The last value written to uniform `name`, in any program.
    pub fn last_uniform(&self, name: &str) -> Option<UniformData> {
        self.state
            .borrow()
            .uniform_writes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.clone())
    }

    pub fn clear_uniform_writes(&self) {
        self.state.borrow_mut().uniform_writes.clear();
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.state.borrow().viewport
    }

    pub fn clears(&self) -> Vec<[f32; 4]> {
        self.state.borrow().clears.clone()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }
}

/// Extracts `uniform [precision] <type> <name>;` declarations.
fn declared_uniforms(source: &str) -> Vec<(String, u32)> {
    source
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("uniform ")?;
            let mut tokens = rest
                .split_whitespace()
                .filter(|t| !matches!(*t, "lowp" | "mediump" | "highp"));
            let ty = tokens.next()?;
            let name = tokens.next()?.trim_end_matches(';');
            let name = match name.find('[') {
                Some(i) => format!("{}[0]", &name[..i]),
                None => name.to_string(),
            };
            let gl_type = match UniformType::from_glsl_name(ty) {
                Some(t) => t.gl_enum(),
                None if ty == "samplerCube" => 0x8B60,
                None => 0,
            };
            Some((name, gl_type))
        })
        .collect()
}

impl RenderContext for MockContext {
    type Shader = MockShader;
    type Program = MockProgram;
    type Buffer = MockBuffer;
    type Texture = MockTexture;
    type Framebuffer = MockFramebuffer;
    type UniformLocation = MockLocation;

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<MockShader, String> {
        let mut state = self.state.borrow_mut();
        state.compiled.push((stage, source.to_string()));
        let log: Vec<String> = source
            .lines()
            .enumerate()
            .filter_map(|(i, line)| {
                let message = line.trim_start().strip_prefix("#error")?;
                Some(format!("ERROR: 0:{}: '#error' : {}", i + 1, message.trim()))
            })
            .collect();
        if !log.is_empty() {
            return Err(log.join("\n"));
        }
        let id = state.next();
        state.shaders.insert(id, (stage, source.to_string()));
        Ok(MockShader(id))
    }

    fn delete_shader(&self, shader: MockShader) {
        self.state.borrow_mut().shaders.remove(&shader.0);
    }

    fn link_program(&self, vertex: MockShader, fragment: MockShader) -> Result<MockProgram, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_link {
            return Err("ERROR: link failed".to_string());
        }
        let mut seen = HashSet::new();
        let mut uniforms = Vec::new();
        for shader in [vertex, fragment] {
            let (_, source) = state
                .shaders
                .get(&shader.0)
                .ok_or_else(|| "unknown shader".to_string())?;
            for (name, ty) in declared_uniforms(source) {
                if seen.insert(name.clone()) {
                    uniforms.push((name, ty));
                }
            }
        }
        let id = state.next();
        state.programs.insert(id, uniforms);
        Ok(MockProgram(id))
    }

    fn delete_program(&self, program: MockProgram) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program.0);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn use_program(&self, program: Option<MockProgram>) {
        self.state.borrow_mut().current_program = program;
    }

    fn active_uniforms(&self, program: MockProgram) -> Vec<ActiveUniform<MockLocation>> {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .map(|uniforms| {
                uniforms
                    .iter()
                    .map(|(name, gl_type)| ActiveUniform {
                        name: name.clone(),
                        gl_type: *gl_type,
                        location: MockLocation {
                            program,
                            name: name.clone(),
                        },
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn write_uniform(&self, location: &MockLocation, data: &UniformData) {
        self.state
            .borrow_mut()
            .uniform_writes
            .push((location.name.clone(), data.clone()));
    }

    fn create_vertex_buffer(&self, vertices: &[f32]) -> Result<MockBuffer, String> {
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.buffers.insert(id, vertices.to_vec());
        Ok(MockBuffer(id))
    }

    fn bind_vertex_attribute(&self, program: MockProgram, buffer: MockBuffer, name: &str, components: i32) {
        self.state
            .borrow_mut()
            .attributes
            .push((program, buffer, name.to_string(), components));
    }

    fn delete_buffer(&self, buffer: MockBuffer) {
        self.state.borrow_mut().buffers.remove(&buffer.0);
    }

    fn create_texture(&self, _filter: TextureFilter) -> Result<MockTexture, String> {
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.textures.insert(id, (1, 1));
        Ok(MockTexture(id))
    }

    fn upload_texture(&self, texture: MockTexture, width: u32, height: u32, pixels: Option<&[u8]>) {
        let mut state = self.state.borrow_mut();
        state.textures.insert(texture.0, (width, height));
        state
            .uploads
            .push((texture, width, height, pixels.map(<[u8]>::to_vec)));
    }

    fn delete_texture(&self, texture: MockTexture) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture.0);
        state.bound_textures.retain(|_, t| *t != texture);
    }

    fn bind_texture(&self, unit: u32, texture: Option<MockTexture>) {
        let mut state = self.state.borrow_mut();
        match texture {
            Some(t) => {
                state.bound_textures.insert(unit, t);
            }
            None => {
                state.bound_textures.remove(&unit);
            }
        }
    }

    fn create_framebuffer(&self, texture: MockTexture) -> Result<MockFramebuffer, String> {
        let mut state = self.state.borrow_mut();
        if !state.textures.contains_key(&texture.0) {
            return Err("framebuffer incomplete: missing attachment".to_string());
        }
        let id = state.next();
        state.framebuffers.insert(id, texture);
        Ok(MockFramebuffer(id))
    }

    fn delete_framebuffer(&self, framebuffer: MockFramebuffer) {
        self.state.borrow_mut().framebuffers.remove(&framebuffer.0);
    }

    fn bind_framebuffer(&self, framebuffer: Option<MockFramebuffer>) {
        self.state.borrow_mut().bound_framebuffer = framebuffer;
    }

    fn viewport(&self, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (width, height);
    }

    fn clear(&self, color: [f32; 4]) {
        self.state.borrow_mut().clears.push(color);
    }

    fn draw_triangles(&self, vertex_count: i32) {
        let mut state = self.state.borrow_mut();
        let call = DrawCall {
            program: state.current_program,
            framebuffer: state.bound_framebuffer,
            textures: state.bound_textures.clone(),
            viewport: state.viewport,
            vertex_count,
        };
        state.draws.push(call);
    }
}

/// A bare drawable backed by one mock texture.
#[derive(Debug)]
pub struct MockDrawable {
    pub texture: MockTexture,
    pub width: u32,
    pub height: u32,
}

impl MockDrawable {
    pub fn new(ctx: &MockContext, width: u32, height: u32) -> Self {
        let texture = ctx.create_texture(TextureFilter::Linear).unwrap();
        ctx.upload_texture(texture, width, height, None);
        Self {
            texture,
            width,
            height,
        }
    }
}

impl Drawable<MockContext> for MockDrawable {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn texture(&self) -> MockTexture {
        self.texture
    }

    fn bind(&self, ctx: &MockContext, unit: u32) -> Result<(), CompositorError> {
        ctx.bind_texture(unit, Some(self.texture));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_uniforms_skips_precision_and_marks_arrays() {
        let found = declared_uniforms(
            "uniform highp float a;\n  uniform vec3 weights[4];\nuniform samplerCube sky;\n",
        );
        assert_eq!(
            found,
            vec![
                ("a".to_string(), 0x1406),
                ("weights[0]".to_string(), 0x8B51),
                ("sky".to_string(), 0x8B60),
            ]
        );
    }

    #[test]
    fn error_directive_fails_with_line_number() {
        let ctx = MockContext::new();
        let err = ctx
            .compile_shader(ShaderStage::Fragment, "void main() {}\n#error boom\n")
            .unwrap_err();
        assert_eq!(err, "ERROR: 0:2: '#error' : boom");
    }

    #[test]
    fn link_merges_stage_uniforms_once() {
        let ctx = MockContext::new();
        let program = ctx.link_sources("uniform vec2 r;\n", "uniform vec2 r;\nuniform float t;\n");
        let names: Vec<String> = ctx
            .active_uniforms(program)
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["r", "t"]);
    }
}
