//! The compositor: named textures and programs over a group stack.
//!
//! One `Compositor` owns one rendering context. Everything it creates
//! (textures, programs, group frames) is released by [`Compositor::dispose`].
//! Passes always draw into the innermost open group; [`Compositor::render`]
//! flattens the stack and copies the root to the visible surface.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::blend::{BlendMode, BLEND_ANGLE, BLEND_IMAGE, BLEND_OFFSET, BLEND_OPACITY, BLEND_SIZE};
use crate::config::CompositorConfig;
use crate::drawable::{Drawable, ImageSource, Mask};
use crate::error::CompositorError;
use crate::group::GroupStack;
use crate::options::DrawOptions;
use crate::preprocess::Preprocessor;
use crate::program::{Pass, Program};
use crate::render::{
    FramebufferPair, RenderContext, Texture, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER,
};
use crate::uniforms::{UniformValue, Uniforms};

/// Program that copies `iTexture` unchanged; used by [`Compositor::render`].
pub const DEFAULT_PROGRAM: &str = "~default";

/// Prefix of names reserved for internal programs.
pub const RESERVED_PREFIX: char = '~';

/// Layered compositor over a [`RenderContext`].
#[derive(Debug)]
pub struct Compositor<C: RenderContext> {
    ctx: C,
    config: CompositorConfig,
    preprocessor: Preprocessor,
    programs: HashMap<String, Program<C>>,
    textures: HashMap<String, Texture<C>>,
    groups: GroupStack<C>,
    width: u32,
    height: u32,
    disposed: bool,
}

impl<C: RenderContext> Compositor<C> {
    /// Creates a compositor with the default configuration.
    pub fn new(ctx: C) -> Result<Self, CompositorError> {
        Self::with_config(ctx, CompositorConfig::default())
    }

    /// Creates a compositor with a 1x1 output and compiles the copy program.
    /// Call [`set_output_size`](Self::set_output_size) before drawing.
    pub fn with_config(ctx: C, config: CompositorConfig) -> Result<Self, CompositorError> {
        let preprocessor = Preprocessor::new(config.mask_support);
        let mut groups = GroupStack::new(&ctx, 1, 1, config.filter)?;
        let copy = match Program::new(
            &ctx,
            DEFAULT_FRAGMENT_SHADER,
            DEFAULT_VERTEX_SHADER,
            &preprocessor,
        ) {
            Ok(program) => program,
            Err(e) => {
                groups.destroy(&ctx);
                return Err(e);
            }
        };

        let mut programs = HashMap::new();
        programs.insert(DEFAULT_PROGRAM.to_string(), copy);
        debug!(?config, "compositor created");

        Ok(Self {
            ctx,
            config,
            preprocessor,
            programs,
            textures: HashMap::new(),
            groups,
            width: 1,
            height: 1,
            disposed: false,
        })
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Resizes the root and every pooled group frame.
    ///
    /// # Errors
    ///
    /// `InvalidDimensions` if either side is zero.
    pub fn set_output_size(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        self.check_disposed()?;
        if width == 0 || height == 0 {
            return Err(CompositorError::InvalidDimensions);
        }
        self.groups.resize(&self.ctx, width, height);
        self.width = width;
        self.height = height;
        debug!(width, height, "output resized");
        Ok(())
    }

    /// Output width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Output height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    // ---------------------------------------------------------------
    // Textures
    // ---------------------------------------------------------------

    /// Uploads `source` and registers it under `name`.
    pub fn register_texture(
        &mut self,
        name: &str,
        source: &dyn ImageSource,
    ) -> Result<&Texture<C>, CompositorError> {
        self.check_disposed()?;
        check_name(name)?;
        match self.textures.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CompositorError::NameAlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                let texture = Texture::new(&self.ctx, source, self.config.filter, self.config.flip_y)?;
                debug!(texture = name, "texture registered");
                Ok(slot.insert(texture))
            }
        }
    }

    /// Disposes and forgets a texture. Returns whether it existed.
    pub fn deregister_texture(&mut self, name: &str) -> Result<bool, CompositorError> {
        self.check_disposed()?;
        match self.textures.remove(name) {
            Some(mut texture) => {
                texture.dispose(&self.ctx);
                debug!(texture = name, "texture deregistered");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn texture(&self, name: &str) -> Option<&Texture<C>> {
        self.textures.get(name)
    }

    pub fn texture_mut(&mut self, name: &str) -> Option<&mut Texture<C>> {
        self.textures.get_mut(name)
    }

    /// Re-uploads a registered texture from a new frame of its source.
    pub fn update_texture(&mut self, name: &str, source: &dyn ImageSource) -> Result<(), CompositorError> {
        self.check_disposed()?;
        let texture = self
            .textures
            .get_mut(name)
            .ok_or_else(|| CompositorError::UnknownTexture(name.to_string()))?;
        texture.update(&self.ctx, source)
    }

    // ---------------------------------------------------------------
    // Programs
    // ---------------------------------------------------------------

    /// Compiles and registers a program. Missing sources fall back to the
    /// copy shaders.
    pub fn register_program(
        &mut self,
        name: &str,
        fragment: Option<&str>,
        vertex: Option<&str>,
    ) -> Result<&mut Program<C>, CompositorError> {
        self.check_disposed()?;
        check_name(name)?;
        match self.programs.entry(name.to_string()) {
            Entry::Occupied(_) => Err(CompositorError::NameAlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                let program = Program::new(
                    &self.ctx,
                    fragment.unwrap_or(DEFAULT_FRAGMENT_SHADER),
                    vertex.unwrap_or(DEFAULT_VERTEX_SHADER),
                    &self.preprocessor,
                )?;
                debug!(program = name, "program registered");
                Ok(slot.insert(program))
            }
        }
    }

    /// Disposes and forgets a program. Returns whether it existed.
    pub fn deregister_program(&mut self, name: &str) -> Result<bool, CompositorError> {
        self.check_disposed()?;
        check_name(name)?;
        match self.programs.remove(name) {
            Some(mut program) => {
                program.dispose(&self.ctx);
                debug!(program = name, "program deregistered");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn has_program(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn program(&self, name: &str) -> Option<&Program<C>> {
        self.programs.get(name)
    }

    pub fn program_mut(&mut self, name: &str) -> Option<&mut Program<C>> {
        self.programs.get_mut(name)
    }

    /// Runs a registered program as one pass over the current group.
    pub fn apply_program(
        &mut self,
        name: &str,
        uniforms: &Uniforms,
        mask: Option<Mask<'_, C>>,
    ) -> Result<(), CompositorError> {
        self.check_disposed()?;
        let mask_image = upload_image(&self.ctx, &self.config, mask.as_ref().and_then(Mask::image))?;
        let result = resolve_mask(&self.textures, mask.as_ref(), mask_image.as_ref()).and_then(|mask| {
            let program = self
                .programs
                .get_mut(name)
                .ok_or_else(|| CompositorError::UnknownName(name.to_string()))?;
            let target = self.groups.current_mut().ok_or(NO_FRAMES)?;
            let pass = Pass::new(self.width, self.height, &self.textures).with_mask(mask);
            program.apply(&self.ctx, target, &pass, uniforms)
        });
        release(&self.ctx, mask_image);
        result
    }

    /// Sets one uniform of a registered program outside of a pass.
    pub fn set_uniform(
        &mut self,
        program: &str,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), CompositorError> {
        self.check_disposed()?;
        let target = self
            .programs
            .get_mut(program)
            .ok_or_else(|| CompositorError::UnknownName(program.to_string()))?;
        target.set_uniform(&self.ctx, name, &value.into(), &self.textures)
    }

    /// Compiles, runs and disposes a one-off program.
    pub fn apply(
        &mut self,
        fragment: Option<&str>,
        vertex: Option<&str>,
        uniforms: &Uniforms,
    ) -> Result<(), CompositorError> {
        self.check_disposed()?;
        let mut program = Program::new(
            &self.ctx,
            fragment.unwrap_or(DEFAULT_FRAGMENT_SHADER),
            vertex.unwrap_or(DEFAULT_VERTEX_SHADER),
            &self.preprocessor,
        )?;
        let pass = Pass::new(self.width, self.height, &self.textures);
        let result = match self.groups.current_mut() {
            Some(target) => program.apply(&self.ctx, target, &pass, uniforms),
            None => Err(NO_FRAMES),
        };
        program.dispose(&self.ctx);
        result
    }

    // ---------------------------------------------------------------
    // Imports
    // ---------------------------------------------------------------

    /// Registers a `@use` partial, replacing any previous one of that name.
    /// Affects programs compiled afterwards.
    pub fn register_import(&mut self, name: &str, source: &str) -> Result<(), CompositorError> {
        self.check_disposed()?;
        self.preprocessor.register_import(name, source);
        debug!(import = name, "import registered");
        Ok(())
    }

    /// Removes a caller import. Returns whether it existed.
    pub fn deregister_import(&mut self, name: &str) -> Result<bool, CompositorError> {
        self.check_disposed()?;
        Ok(self.preprocessor.deregister_import(name))
    }

    // ---------------------------------------------------------------
    // Layers
    // ---------------------------------------------------------------

    /// Blends an unregistered image onto the current group.
    ///
    /// The source is uploaded to a temporary texture that is released
    /// afterwards, whether or not the draw succeeds.
    pub fn draw(&mut self, source: &dyn ImageSource, options: &DrawOptions) -> Result<(), CompositorError> {
        self.draw_layer(Layer::Image(source), options, None)
    }

    /// [`draw`](Self::draw) with a mask given directly instead of by
    /// `options.mask`.
    pub fn draw_masked(
        &mut self,
        source: &dyn ImageSource,
        options: &DrawOptions,
        mask: Mask<'_, C>,
    ) -> Result<(), CompositorError> {
        self.draw_layer(Layer::Image(source), options, Some(mask))
    }

    /// Blends a registered texture onto the current group.
    pub fn draw_texture(&mut self, name: &str, options: &DrawOptions) -> Result<(), CompositorError> {
        self.draw_layer(Layer::Named(name), options, None)
    }

    /// [`draw_texture`](Self::draw_texture) with a mask given directly.
    pub fn draw_texture_masked(
        &mut self,
        name: &str,
        options: &DrawOptions,
        mask: Mask<'_, C>,
    ) -> Result<(), CompositorError> {
        self.draw_layer(Layer::Named(name), options, Some(mask))
    }

    fn draw_layer(
        &mut self,
        layer: Layer<'_>,
        options: &DrawOptions,
        mask: Option<Mask<'_, C>>,
    ) -> Result<(), CompositorError> {
        self.check_disposed()?;
        let mask = mask.or_else(|| options.mask.as_deref().map(Mask::Named));
        let program = blend_program(&mut self.programs, &self.ctx, &self.preprocessor, options.mode)?;

        let layer_image = upload_image(&self.ctx, &self.config, layer.image())?;
        let mask_image = match upload_image(&self.ctx, &self.config, mask.as_ref().and_then(Mask::image)) {
            Ok(texture) => texture,
            Err(e) => {
                release(&self.ctx, layer_image);
                return Err(e);
            }
        };

        let result = resolve_layer(&self.textures, &layer, layer_image.as_ref()).and_then(|source| {
            let mask = resolve_mask(&self.textures, mask.as_ref(), mask_image.as_ref())?;
            let target = self.groups.current_mut().ok_or(NO_FRAMES)?;
            composite(
                &self.ctx,
                program,
                target,
                &self.textures,
                source,
                mask,
                options,
                (self.width, self.height),
            )
        });
        release(&self.ctx, layer_image);
        release(&self.ctx, mask_image);
        result
    }

    // ---------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------

    /// Opens a group; later passes draw into it until [`end`](Self::end).
    pub fn begin(&mut self) -> Result<(), CompositorError> {
        self.check_disposed()?;
        self.groups.begin(&self.ctx)
    }

    /// Closes the innermost group and blends it onto its parent.
    ///
    /// The group is popped only once the blend succeeds; on error it stays
    /// open with its contents intact.
    ///
    /// # Errors
    ///
    /// `GroupUnderflow` when no group is open.
    pub fn end(&mut self, options: &DrawOptions) -> Result<(), CompositorError> {
        self.close_group(options, None)
    }

    /// [`end`](Self::end) with a mask given directly.
    pub fn end_masked(&mut self, options: &DrawOptions, mask: Mask<'_, C>) -> Result<(), CompositorError> {
        self.close_group(options, Some(mask))
    }

    fn close_group(&mut self, options: &DrawOptions, mask: Option<Mask<'_, C>>) -> Result<(), CompositorError> {
        self.check_disposed()?;
        if self.groups.depth() == 0 {
            return Err(CompositorError::GroupUnderflow);
        }
        let mask = mask.or_else(|| options.mask.as_deref().map(Mask::Named));
        let program = blend_program(&mut self.programs, &self.ctx, &self.preprocessor, options.mode)?;
        let mask_image = upload_image(&self.ctx, &self.config, mask.as_ref().and_then(Mask::image))?;

        let result = resolve_mask(&self.textures, mask.as_ref(), mask_image.as_ref()).and_then(|mask| {
            let (parent, child) = self.groups.innermost()?;
            composite(
                &self.ctx,
                program,
                parent,
                &self.textures,
                child,
                mask,
                options,
                (self.width, self.height),
            )
        });
        release(&self.ctx, mask_image);
        result?;
        self.groups.close()
    }

    /// Number of open groups.
    pub fn group_depth(&self) -> usize {
        self.groups.depth()
    }

    /// Closes every open group with default options and copies the root to
    /// the visible surface. The root is then cleared for the next frame.
    ///
    /// If closing a group fails, the error is returned with that group and
    /// every group below it still open.
    pub fn render(&mut self) -> Result<(), CompositorError> {
        self.check_disposed()?;
        let defaults = DrawOptions::default();
        while self.groups.depth() > 0 {
            self.end(&defaults)?;
        }

        let program = self
            .programs
            .get_mut(DEFAULT_PROGRAM)
            .ok_or_else(|| CompositorError::UnknownName(DEFAULT_PROGRAM.to_string()))?;
        let root = self.groups.root_mut().ok_or(NO_FRAMES)?;
        root.set_final(true);
        let pass = Pass::new(self.width, self.height, &self.textures);
        program.apply(&self.ctx, root, &pass, &Uniforms::new())?;
        root.clear_current(&self.ctx);
        debug!(width = self.width, height = self.height, "frame rendered");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Releases every texture, program and frame. Safe to call more than
    /// once; every other operation fails afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for (_, mut program) in self.programs.drain() {
            program.dispose(&self.ctx);
        }
        for (_, mut texture) in self.textures.drain() {
            texture.dispose(&self.ctx);
        }
        self.groups.destroy(&self.ctx);
        self.disposed = true;
        debug!("compositor disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn check_disposed(&self) -> Result<(), CompositorError> {
        if self.disposed {
            Err(CompositorError::UseAfterDispose("compositor"))
        } else {
            Ok(())
        }
    }
}

/// Frames are only missing once the stack has been destroyed.
const NO_FRAMES: CompositorError = CompositorError::UseAfterDispose("group stack");

/// What a draw blends: an image uploaded for one pass or a registered texture.
enum Layer<'a> {
    Image(&'a dyn ImageSource),
    Named(&'a str),
}

impl<'a> Layer<'a> {
    fn image(&self) -> Option<&'a dyn ImageSource> {
        match self {
            Layer::Image(source) => Some(*source),
            Layer::Named(_) => None,
        }
    }
}

fn check_name(name: &str) -> Result<(), CompositorError> {
    if name.starts_with(RESERVED_PREFIX) {
        Err(CompositorError::ReservedName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Uploads an image passed by value to a temporary texture.
fn upload_image<C: RenderContext>(
    ctx: &C,
    config: &CompositorConfig,
    image: Option<&dyn ImageSource>,
) -> Result<Option<Texture<C>>, CompositorError> {
    image
        .map(|source| Texture::new(ctx, source, config.filter, config.flip_y))
        .transpose()
}

fn release<C: RenderContext>(ctx: &C, texture: Option<Texture<C>>) {
    if let Some(mut texture) = texture {
        texture.dispose(ctx);
    }
}

fn resolve_layer<'a, C: RenderContext>(
    textures: &'a HashMap<String, Texture<C>>,
    layer: &Layer<'_>,
    uploaded: Option<&'a Texture<C>>,
) -> Result<&'a dyn Drawable<C>, CompositorError> {
    match layer {
        Layer::Named(name) => textures
            .get(*name)
            .map(|t| t as &dyn Drawable<C>)
            .ok_or_else(|| CompositorError::UnknownTexture(name.to_string())),
        Layer::Image(_) => uploaded
            .map(|t| t as &dyn Drawable<C>)
            .ok_or(CompositorError::SourceNotLoaded),
    }
}

fn resolve_mask<'a, C: RenderContext>(
    textures: &'a HashMap<String, Texture<C>>,
    mask: Option<&Mask<'a, C>>,
    uploaded: Option<&'a Texture<C>>,
) -> Result<Option<&'a dyn Drawable<C>>, CompositorError> {
    match mask {
        None => Ok(None),
        Some(Mask::Drawable(drawable)) => Ok(Some(*drawable)),
        Some(Mask::Named(name)) => textures
            .get(*name)
            .map(|t| Some(t as &dyn Drawable<C>))
            .ok_or_else(|| CompositorError::UnknownTexture(name.to_string())),
        Some(Mask::Image(_)) => uploaded
            .map(|t| Some(t as &dyn Drawable<C>))
            .ok_or(CompositorError::SourceNotLoaded),
    }
}

/// The cached program for `mode`, compiled on first use.
fn blend_program<'a, C: RenderContext>(
    programs: &'a mut HashMap<String, Program<C>>,
    ctx: &C,
    preprocessor: &Preprocessor,
    mode: BlendMode,
) -> Result<&'a mut Program<C>, CompositorError> {
    match programs.entry(mode.program_name()) {
        Entry::Occupied(slot) => Ok(slot.into_mut()),
        Entry::Vacant(slot) => {
            let program = Program::new(ctx, &mode.fragment_shader(), DEFAULT_VERTEX_SHADER, preprocessor)?;
            debug!(mode = mode.name(), "blend program compiled");
            Ok(slot.insert(program))
        }
    }
}

/// Blends `source` onto `target` through a blend program.
#[allow(clippy::too_many_arguments)]
fn composite<C: RenderContext>(
    ctx: &C,
    program: &mut Program<C>,
    target: &mut FramebufferPair<C>,
    textures: &HashMap<String, Texture<C>>,
    source: &dyn Drawable<C>,
    mask: Option<&dyn Drawable<C>>,
    options: &DrawOptions,
    (width, height): (u32, u32),
) -> Result<(), CompositorError> {
    let (size_x, size_y) = options.resolved_size(source.width(), source.height());

    let mut uniforms = Uniforms::new();
    uniforms.insert(BLEND_SIZE.to_string(), [size_x, size_y].into());
    uniforms.insert(
        BLEND_OFFSET.to_string(),
        [options.x / width as f32, options.y / height as f32].into(),
    );
    uniforms.insert(BLEND_OPACITY.to_string(), options.opacity().into());
    uniforms.insert(BLEND_ANGLE.to_string(), options.angle.into());

    let samplers: [(&str, &dyn Drawable<C>); 1] = [(BLEND_IMAGE, source)];
    let pass = Pass::new(width, height, textures)
        .with_samplers(&samplers)
        .with_mask(mask);
    program.apply(ctx, target, &pass, &uniforms)
}
