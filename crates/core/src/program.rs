//! Compiled programs and the full-screen pass.
//!
//! A [`Program`] owns a linked shader pair, the [`UniformRegistry`] built
//! from it and the quad buffer it draws. [`Program::apply`] runs one pass:
//! it flips the target pair so the previous output becomes `iTexture`, then
//! draws the quad into the other buffer.

use tracing::{debug, trace, warn};

use crate::drawable::{Drawable, DrawableLookup};
use crate::error::CompositorError;
use crate::preprocess::{Preprocessed, Preprocessor};
use crate::render::fullscreen::{QUAD_COMPONENTS, QUAD_VERTEX_COUNT, QUAD_VERTICES};
use crate::render::{link_stages, FramebufferPair, LinkedProgram, RenderContext, ShaderStage};
use crate::uniforms::{UniformRegistry, UniformValue, Uniforms};

/// Output size uniform set before every pass.
pub const RESOLUTION: &str = "iResolution";
/// Mask sampler declared when mask support is on.
pub const MASK_TEXTURE: &str = "iMask";
/// Flag telling the `mask` import whether `iMask` holds anything.
pub const MASK_ENABLED: &str = "iMaskEnabled";

const POSITION_ATTRIBUTE: &str = "position";
const CLEAR_COLOR: [f32; 4] = [0.0; 4];

/// Per-pass inputs that do not belong to the program itself.
pub struct Pass<'a, C: RenderContext> {
    /// Output size in pixels, written to `iResolution`.
    pub width: u32,
    pub height: u32,
    /// Resolves `TextureRef` uniform values.
    pub textures: &'a dyn DrawableLookup<C>,
    /// Extra sampler bindings applied after the caller's uniforms.
    pub samplers: &'a [(&'a str, &'a dyn Drawable<C>)],
    pub mask: Option<&'a dyn Drawable<C>>,
}

impl<'a, C: RenderContext> Pass<'a, C> {
    pub fn new(width: u32, height: u32, textures: &'a dyn DrawableLookup<C>) -> Self {
        Self {
            width,
            height,
            textures,
            samplers: &[],
            mask: None,
        }
    }

    pub fn with_samplers(mut self, samplers: &'a [(&'a str, &'a dyn Drawable<C>)]) -> Self {
        self.samplers = samplers;
        self
    }

    pub fn with_mask(mut self, mask: Option<&'a dyn Drawable<C>>) -> Self {
        self.mask = mask;
        self
    }
}

/// A linked vertex + fragment program with its uniforms and quad buffer.
#[derive(Debug)]
pub struct Program<C: RenderContext> {
    linked: LinkedProgram<C>,
    uniforms: UniformRegistry<C>,
    quad: C::Buffer,
    vertex_source: Preprocessed,
    fragment_source: Preprocessed,
    disposed: bool,
}

impl<C: RenderContext> Program<C> {
    /// Preprocesses, compiles and links both stages.
    ///
    /// # Errors
    ///
    /// `ShaderCompile` with per-line errors for both stages, `Link` with the
    /// driver log, or `Backend` if the quad buffer cannot be allocated.
    pub fn new(
        ctx: &C,
        fragment: &str,
        vertex: &str,
        preprocessor: &Preprocessor,
    ) -> Result<Self, CompositorError> {
        let vertex_source = preprocessor.preprocess(vertex, ShaderStage::Vertex);
        let fragment_source = preprocessor.preprocess(fragment, ShaderStage::Fragment);
        let linked = link_stages(ctx, &vertex_source, &fragment_source)?;

        let quad = match ctx.create_vertex_buffer(&QUAD_VERTICES) {
            Ok(buffer) => buffer,
            Err(e) => {
                ctx.delete_program(linked.program);
                ctx.delete_shader(linked.vertex);
                ctx.delete_shader(linked.fragment);
                return Err(CompositorError::Backend(e));
            }
        };

        let uniforms = UniformRegistry::new(ctx, linked.program);
        debug!(uniforms = uniforms.names().count(), "program linked");

        Ok(Self {
            linked,
            uniforms,
            quad,
            vertex_source,
            fragment_source,
            disposed: false,
        })
    }

    pub fn uniforms(&self) -> &UniformRegistry<C> {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformRegistry<C> {
        &mut self.uniforms
    }

    /// The backend program handle.
    pub fn handle(&self) -> C::Program {
        self.linked.program
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The fragment stage as compiled, with its line map.
    pub fn preprocessed_fragment(&self) -> &Preprocessed {
        &self.fragment_source
    }

    /// The vertex stage as compiled, with its line map.
    pub fn preprocessed_vertex(&self) -> &Preprocessed {
        &self.vertex_source
    }

    /// Sets one uniform outside of a pass.
    pub fn set_uniform(
        &mut self,
        ctx: &C,
        name: &str,
        value: &UniformValue,
        textures: &dyn DrawableLookup<C>,
    ) -> Result<(), CompositorError> {
        self.check_disposed()?;
        self.uniforms.set(ctx, name, value, textures)
    }

    /// Runs one full-screen pass into `target`.
    ///
    /// The pair is switched first, so the latest output is readable as
    /// `iTexture` on unit 0 while the other buffer (or the visible surface,
    /// if the pair is marked final) receives the draw.
    pub fn apply(
        &mut self,
        ctx: &C,
        target: &mut FramebufferPair<C>,
        pass: &Pass<'_, C>,
        uniforms: &Uniforms,
    ) -> Result<(), CompositorError> {
        self.check_disposed()?;

        target.switch_framebuffer(ctx);
        ctx.viewport(pass.width, pass.height);
        ctx.clear(CLEAR_COLOR);
        ctx.use_program(Some(self.linked.program));

        let resolution = UniformValue::Vec(vec![pass.width as f32, pass.height as f32]);
        self.uniforms.set(ctx, RESOLUTION, &resolution, pass.textures)?;
        self.uniforms.set_all(ctx, uniforms, pass.textures)?;

        for (name, drawable) in pass.samplers {
            if !self.uniforms.bind_sampler(ctx, name, *drawable)? {
                trace!(sampler = *name, "program has no such sampler");
            }
        }

        let masked = match pass.mask {
            Some(mask) => {
                let bound = self.uniforms.bind_sampler(ctx, MASK_TEXTURE, mask)?;
                if !bound {
                    warn!("mask ignored: program does not declare {MASK_TEXTURE}");
                }
                bound
            }
            None => false,
        };
        self.uniforms
            .set(ctx, MASK_ENABLED, &UniformValue::Bool(masked), pass.textures)?;

        ctx.bind_vertex_attribute(
            self.linked.program,
            self.quad,
            POSITION_ATTRIBUTE,
            QUAD_COMPONENTS,
        );
        ctx.draw_triangles(QUAD_VERTEX_COUNT);
        trace!(width = pass.width, height = pass.height, masked, "pass drawn");
        Ok(())
    }

    /// Deletes the program, its shaders and the quad buffer. Safe to call
    /// more than once.
    pub fn dispose(&mut self, ctx: &C) {
        if self.disposed {
            return;
        }
        ctx.delete_program(self.linked.program);
        ctx.delete_shader(self.linked.vertex);
        ctx.delete_shader(self.linked.fragment);
        ctx.delete_buffer(self.quad);
        self.disposed = true;
    }

    fn check_disposed(&self) -> Result<(), CompositorError> {
        if self.disposed {
            Err(CompositorError::UseAfterDispose("program"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::NoDrawables;
    use crate::render::{TextureFilter, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
    use crate::testing::{MockContext, MockDrawable};
    use crate::uniforms::{UniformData, PRIMARY_TEXTURE_UNIT};

    fn copy_program(ctx: &MockContext) -> Program<MockContext> {
        Program::new(
            ctx,
            DEFAULT_FRAGMENT_SHADER,
            DEFAULT_VERTEX_SHADER,
            &Preprocessor::default(),
        )
        .unwrap()
    }

    fn pair(ctx: &MockContext) -> FramebufferPair<MockContext> {
        FramebufferPair::new(ctx, 8, 4, TextureFilter::Linear).unwrap()
    }

    #[test]
    fn new_compiles_preprocessed_sources() {
        let ctx = MockContext::new();
        let program = copy_program(&ctx);
        let sources = ctx.compiled_sources();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].1.contains("attribute vec3 position;"));
        assert!(sources[1].1.contains("uniform vec2 iResolution;"));
        assert!(program.uniforms().contains(RESOLUTION));
        assert_eq!(program.uniforms().texture_unit("iTexture"), Some(PRIMARY_TEXTURE_UNIT));
    }

    #[test]
    fn compile_errors_map_to_caller_lines_for_both_stages() {
        let ctx = MockContext::new();
        let fragment = "void main() {\n#error broken\n}";
        let err = Program::new(&ctx, fragment, DEFAULT_VERTEX_SHADER, &Preprocessor::default())
            .unwrap_err();
        let CompositorError::ShaderCompile(errors) = err else {
            panic!("expected ShaderCompile, got {err:?}");
        };
        assert!(errors.vertex.is_empty());
        assert_eq!(errors.fragment[&2], vec!["'#error' : broken".to_string()]);
        assert_eq!(ctx.live_shaders(), 0);
    }

    #[test]
    fn both_stage_failures_are_reported() {
        let ctx = MockContext::new();
        let err = Program::new(&ctx, "#error f", "#error v", &Preprocessor::default()).unwrap_err();
        let CompositorError::ShaderCompile(errors) = err else {
            panic!("expected ShaderCompile, got {err:?}");
        };
        assert!(errors.vertex.contains_key(&1));
        assert!(errors.fragment.contains_key(&1));
    }

    #[test]
    fn link_failure_releases_shaders() {
        let ctx = MockContext::new();
        ctx.fail_links();
        let err = Program::new(
            &ctx,
            DEFAULT_FRAGMENT_SHADER,
            DEFAULT_VERTEX_SHADER,
            &Preprocessor::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompositorError::Link(_)));
        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn apply_switches_clears_and_draws_six_vertices() {
        let ctx = MockContext::new();
        let mut program = copy_program(&ctx);
        let mut target = pair(&ctx);
        let before = target.current().texture();

        program
            .apply(&ctx, &mut target, &Pass::new(8, 4, &NoDrawables), &Uniforms::new())
            .unwrap();

        let draws = ctx.draws();
        assert_eq!(draws.len(), 1);
        let draw = &draws[0];
        assert_eq!(draw.vertex_count, 6);
        assert_eq!(draw.viewport, (8, 4));
        assert_eq!(draw.program, Some(program.handle()));
        assert_eq!(draw.textures.get(&PRIMARY_TEXTURE_UNIT), Some(&before));
        assert_eq!(draw.framebuffer, Some(target.current().framebuffer()));
        assert_eq!(ctx.clears(), vec![[0.0; 4]]);
        assert_eq!(
            ctx.last_uniform(RESOLUTION),
            Some(UniformData::Vec2([8.0, 4.0]))
        );
    }

    #[test]
    fn apply_rebinds_quad_to_position() {
        let ctx = MockContext::new();
        let mut program = copy_program(&ctx);
        let mut target = pair(&ctx);
        program
            .apply(&ctx, &mut target, &Pass::new(8, 4, &NoDrawables), &Uniforms::new())
            .unwrap();
        let attributes = ctx.attributes();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].2, "position");
        assert_eq!(attributes[0].3, 2);
        assert_eq!(ctx.buffer_data(attributes[0].1).unwrap(), QUAD_VERTICES.to_vec());
    }

    #[test]
    fn successive_passes_alternate_buffers() {
        let ctx = MockContext::new();
        let mut program = copy_program(&ctx);
        let mut target = pair(&ctx);
        let pass = Pass::new(8, 4, &NoDrawables);
        program.apply(&ctx, &mut target, &pass, &Uniforms::new()).unwrap();
        program.apply(&ctx, &mut target, &pass, &Uniforms::new()).unwrap();

        let draws = ctx.draws();
        assert_ne!(draws[0].framebuffer, draws[1].framebuffer);
        let first_output = draws[0].framebuffer.and_then(|f| ctx.framebuffer_texture(f));
        assert_eq!(draws[1].textures.get(&0).copied(), first_output);
    }

    #[test]
    fn final_pass_draws_to_visible_surface() {
        let ctx = MockContext::new();
        let mut program = copy_program(&ctx);
        let mut target = pair(&ctx);
        target.set_final(true);
        program
            .apply(&ctx, &mut target, &Pass::new(8, 4, &NoDrawables), &Uniforms::new())
            .unwrap();
        assert_eq!(ctx.draws()[0].framebuffer, None);
        assert!(!target.is_final());
    }

    #[test]
    fn caller_uniforms_are_written() {
        let ctx = MockContext::new();
        let fragment = "uniform float iTime;\nvoid main() { gl_FragColor = vec4(iTime); }";
        let mut program =
            Program::new(&ctx, fragment, DEFAULT_VERTEX_SHADER, &Preprocessor::default()).unwrap();
        let mut target = pair(&ctx);
        let mut uniforms = Uniforms::new();
        uniforms.insert("iTime".into(), UniformValue::Float(2.5));
        uniforms.insert("unused".into(), UniformValue::Float(1.0));
        program
            .apply(&ctx, &mut target, &Pass::new(8, 4, &NoDrawables), &uniforms)
            .unwrap();
        assert_eq!(ctx.last_uniform("iTime"), Some(UniformData::Float(2.5)));
        assert_eq!(program.uniforms().get("iTime"), Some(&UniformValue::Float(2.5)));
    }

    #[test]
    fn mask_binds_sampler_and_enables_flag() {
        let ctx = MockContext::new();
        let fragment = "@use mask\nvoid main() { gl_FragColor = vec4(mask(vec2(0.0), 1.0)); }";
        let mut program =
            Program::new(&ctx, fragment, DEFAULT_VERTEX_SHADER, &Preprocessor::default()).unwrap();
        let mut target = pair(&ctx);
        let mask = MockDrawable::new(&ctx, 8, 4);

        program
            .apply(
                &ctx,
                &mut target,
                &Pass::new(8, 4, &NoDrawables).with_mask(Some(&mask)),
                &Uniforms::new(),
            )
            .unwrap();

        let unit = program.uniforms().texture_unit(MASK_TEXTURE).unwrap();
        assert_eq!(ctx.draws()[0].textures.get(&unit), Some(&mask.texture));
        assert_eq!(ctx.last_uniform(MASK_ENABLED), Some(UniformData::Int(1)));
    }

    #[test]
    fn missing_mask_disables_flag() {
        let ctx = MockContext::new();
        let mut program = copy_program(&ctx);
        let mut target = pair(&ctx);
        program
            .apply(&ctx, &mut target, &Pass::new(8, 4, &NoDrawables), &Uniforms::new())
            .unwrap();
        assert_eq!(ctx.last_uniform(MASK_ENABLED), Some(UniformData::Int(0)));
    }

    #[test]
    fn extra_samplers_are_bound_to_their_units() {
        let ctx = MockContext::new();
        let fragment = "uniform sampler2D iImage;\nvoid main() { gl_FragColor = vec4(0.0); }";
        let mut program =
            Program::new(&ctx, fragment, DEFAULT_VERTEX_SHADER, &Preprocessor::default()).unwrap();
        let mut target = pair(&ctx);
        let image = MockDrawable::new(&ctx, 2, 2);
        let samplers: [(&str, &dyn Drawable<MockContext>); 1] = [("iImage", &image)];

        program
            .apply(
                &ctx,
                &mut target,
                &Pass::new(8, 4, &NoDrawables).with_samplers(&samplers),
                &Uniforms::new(),
            )
            .unwrap();

        let unit = program.uniforms().texture_unit("iImage").unwrap();
        assert!(unit >= 1);
        assert_eq!(ctx.draws()[0].textures.get(&unit), Some(&image.texture));
    }

    #[test]
    fn apply_after_dispose_fails() {
        let ctx = MockContext::new();
        let mut program = copy_program(&ctx);
        let mut target = pair(&ctx);
        program.dispose(&ctx);
        let err = program
            .apply(&ctx, &mut target, &Pass::new(8, 4, &NoDrawables), &Uniforms::new())
            .unwrap_err();
        assert!(matches!(err, CompositorError::UseAfterDispose("program")));
        assert!(ctx.draws().is_empty());
    }

    #[test]
    fn dispose_releases_everything_once() {
        let ctx = MockContext::new();
        let mut program = copy_program(&ctx);
        assert_eq!(ctx.live_programs(), 1);
        program.dispose(&ctx);
        program.dispose(&ctx);
        assert!(program.is_disposed());
        assert_eq!(ctx.live_programs(), 0);
        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn preprocessed_stages_keep_line_maps() {
        let ctx = MockContext::new();
        let program = copy_program(&ctx);
        let fragment = program.preprocessed_fragment();
        let first_line = fragment.line_map.keys().next().copied().unwrap();
        assert_eq!(fragment.source_line(first_line), 1);
        assert!(program.preprocessed_vertex().source.contains("position"));
    }
}
