//! Uniform introspection and typed value marshalling.
//!
//! A [`UniformRegistry`] is built once per linked program from the driver's
//! list of active uniforms. Values arrive as a tagged [`UniformValue`] and
//! are resolved against the uniform's declared [`UniformType`] before being
//! written, so the "string means color or texture name" case is explicit.
//!
//! Sampler uniforms receive texture units in enumeration order starting at
//! 1. Unit 0 belongs to `iTexture`, the previous pass's output.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::trace;

use crate::color::Rgba;
use crate::drawable::{Drawable, DrawableLookup};
use crate::error::CompositorError;
use crate::render::RenderContext;

/// Texture unit reserved for the primary input image.
pub const PRIMARY_TEXTURE_UNIT: u32 = 0;

/// Name of the primary input sampler declared by the preprocessor.
pub const PRIMARY_TEXTURE: &str = "iTexture";

/// Caller-supplied uniform values by name.
pub type Uniforms = BTreeMap<String, UniformValue>;

/// GLSL uniform types the registry can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2D,
}

const GL_TYPES: [(u32, UniformType, &str); 16] = [
    (0x1406, UniformType::Float, "float"),
    (0x8B50, UniformType::FloatVec2, "vec2"),
    (0x8B51, UniformType::FloatVec3, "vec3"),
    (0x8B52, UniformType::FloatVec4, "vec4"),
    (0x1404, UniformType::Int, "int"),
    (0x8B53, UniformType::IntVec2, "ivec2"),
    (0x8B54, UniformType::IntVec3, "ivec3"),
    (0x8B55, UniformType::IntVec4, "ivec4"),
    (0x8B56, UniformType::Bool, "bool"),
    (0x8B57, UniformType::BoolVec2, "bvec2"),
    (0x8B58, UniformType::BoolVec3, "bvec3"),
    (0x8B59, UniformType::BoolVec4, "bvec4"),
    (0x8B5A, UniformType::FloatMat2, "mat2"),
    (0x8B5B, UniformType::FloatMat3, "mat3"),
    (0x8B5C, UniformType::FloatMat4, "mat4"),
    (0x8B5E, UniformType::Sampler2D, "sampler2D"),
];

impl UniformType {
    /// Maps a GL type enum (`GL_FLOAT_VEC3`, ...) to a supported type.
    pub fn from_gl(gl_type: u32) -> Option<UniformType> {
        GL_TYPES
            .iter()
            .find(|(gl, _, _)| *gl == gl_type)
            .map(|(_, ty, _)| *ty)
    }

    pub fn gl_enum(self) -> u32 {
        self.entry().0
    }

    /// The GLSL keyword declaring this type.
    pub fn glsl_name(self) -> &'static str {
        self.entry().2
    }

    pub fn from_glsl_name(name: &str) -> Option<UniformType> {
        GL_TYPES
            .iter()
            .find(|(_, _, glsl)| *glsl == name)
            .map(|(_, ty, _)| *ty)
    }

    pub fn is_sampler(self) -> bool {
        self == UniformType::Sampler2D
    }

    fn entry(self) -> (u32, UniformType, &'static str) {
        GL_TYPES
            .iter()
            .copied()
            .find(|(_, ty, _)| *ty == self)
            .unwrap_or((0, self, ""))
    }
}

/// A value for a uniform, resolved against the declared type when set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    /// 2, 3 or 4 components (float, int or bool vectors).
    Vec(Vec<f32>),
    /// Column-major 2x2, 3x3 or 4x4 matrix.
    Mat(Vec<f32>),
    /// `#RRGGBB` or `#RRGGBBAA`, for `vec3`/`vec4` uniforms.
    ColorHex(String),
    /// Name of a registered texture, for `sampler2D` uniforms.
    TextureRef(String),
}

impl UniformValue {
    pub fn color(hex: impl Into<String>) -> Self {
        UniformValue::ColorHex(hex.into())
    }

    pub fn texture(name: impl Into<String>) -> Self {
        UniformValue::TextureRef(name.into())
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl<const N: usize> From<[f32; N]> for UniformValue {
    fn from(v: [f32; N]) -> Self {
        UniformValue::Vec(v.to_vec())
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        UniformValue::Vec(v.to_array().to_vec())
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(v: glam::Vec3) -> Self {
        UniformValue::Vec(v.to_array().to_vec())
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(v: glam::Vec4) -> Self {
        UniformValue::Vec(v.to_array().to_vec())
    }
}

impl From<glam::Mat2> for UniformValue {
    fn from(m: glam::Mat2) -> Self {
        UniformValue::Mat(m.to_cols_array().to_vec())
    }
}

impl From<glam::Mat3> for UniformValue {
    fn from(m: glam::Mat3) -> Self {
        UniformValue::Mat(m.to_cols_array().to_vec())
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(m: glam::Mat4) -> Self {
        UniformValue::Mat(m.to_cols_array().to_vec())
    }
}

/// A value ready for the type-specific uniform call.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

#[derive(Debug)]
struct UniformSlot<L> {
    gl_type: u32,
    uniform_type: Option<UniformType>,
    location: L,
    texture_unit: Option<u32>,
    last_value: Option<UniformValue>,
}

/// Active uniforms of one program, with their last written values.
#[derive(Debug)]
pub struct UniformRegistry<C: RenderContext> {
    program: C::Program,
    slots: HashMap<String, UniformSlot<C::UniformLocation>>,
    order: Vec<String>,
}

impl<C: RenderContext> UniformRegistry<C> {
    /// Enumerates the active uniforms of `program` and assigns texture units
    /// to samplers.
    pub fn new(ctx: &C, program: C::Program) -> Self {
        let mut slots = HashMap::new();
        let mut order = Vec::new();
        let mut next_unit = PRIMARY_TEXTURE_UNIT + 1;

        for active in ctx.active_uniforms(program) {
            let name = active
                .name
                .strip_suffix("[0]")
                .unwrap_or(&active.name)
                .to_string();
            if slots.contains_key(&name) {
                continue;
            }
            let uniform_type = UniformType::from_gl(active.gl_type);
            let texture_unit = match uniform_type {
                Some(UniformType::Sampler2D) if name == PRIMARY_TEXTURE => {
                    Some(PRIMARY_TEXTURE_UNIT)
                }
                Some(UniformType::Sampler2D) => {
                    let unit = next_unit;
                    next_unit += 1;
                    Some(unit)
                }
                _ => None,
            };
            trace!(uniform = %name, gl_type = active.gl_type, ?texture_unit, "active uniform");
            order.push(name.clone());
            slots.insert(
                name,
                UniformSlot {
                    gl_type: active.gl_type,
                    uniform_type,
                    location: active.location,
                    texture_unit,
                    last_value: None,
                },
            );
        }

        Self {
            program,
            slots,
            order,
        }
    }

    /// Uniform names in enumeration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn uniform_type(&self, name: &str) -> Option<UniformType> {
        self.slots.get(name).and_then(|s| s.uniform_type)
    }

    /// The texture unit assigned to a sampler uniform.
    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.slots.get(name).and_then(|s| s.texture_unit)
    }

    /// The last value set for `name`. Colors are cached as their resolved
    /// component vector. Does not query the GPU.
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.slots.get(name).and_then(|s| s.last_value.as_ref())
    }

    /// Sets one uniform. Names the program does not declare are ignored.
    pub fn set(
        &mut self,
        ctx: &C,
        name: &str,
        value: &UniformValue,
        textures: &dyn DrawableLookup<C>,
    ) -> Result<(), CompositorError> {
        ctx.use_program(Some(self.program));
        self.set_one(ctx, name, value, textures)
    }

    /// Sets every entry of `values`, stopping at the first error.
    pub fn set_all(
        &mut self,
        ctx: &C,
        values: &Uniforms,
        textures: &dyn DrawableLookup<C>,
    ) -> Result<(), CompositorError> {
        ctx.use_program(Some(self.program));
        values
            .iter()
            .try_for_each(|(name, value)| self.set_one(ctx, name, value, textures))
    }

    /// Binds `drawable` to the unit of sampler `name` and points the sampler
    /// at that unit. Returns `false` when the program has no such sampler.
    pub fn bind_sampler(
        &mut self,
        ctx: &C,
        name: &str,
        drawable: &dyn Drawable<C>,
    ) -> Result<bool, CompositorError> {
        let Some(slot) = self.slots.get_mut(name) else {
            return Ok(false);
        };
        let Some(unit) = slot.texture_unit else {
            return Ok(false);
        };
        drawable.bind(ctx, unit)?;
        ctx.use_program(Some(self.program));
        ctx.write_uniform(&slot.location, &UniformData::Int(unit as i32));
        slot.last_value = Some(UniformValue::Int(unit as i32));
        Ok(true)
    }

    fn set_one(
        &mut self,
        ctx: &C,
        name: &str,
        value: &UniformValue,
        textures: &dyn DrawableLookup<C>,
    ) -> Result<(), CompositorError> {
        let Some(slot) = self.slots.get_mut(name) else {
            trace!(uniform = name, "ignoring value for inactive uniform");
            return Ok(());
        };
        let Some(ty) = slot.uniform_type else {
            return Err(CompositorError::UnsupportedUniformType {
                name: name.to_string(),
                gl_type: slot.gl_type,
            });
        };

        let (data, cached) = match value {
            UniformValue::ColorHex(hex) => {
                let rgba = Rgba::from_hex(hex).map_err(|reason| invalid(name, reason))?;
                let components = match ty {
                    UniformType::FloatVec3 => rgba.rgb().to_vec(),
                    UniformType::FloatVec4 => rgba.to_array().to_vec(),
                    _ => {
                        return Err(invalid(
                            name,
                            format!("color strings need vec3 or vec4, not {}", ty.glsl_name()),
                        ))
                    }
                };
                let cached = UniformValue::Vec(components);
                (encode(name, ty, &cached)?, cached)
            }
            UniformValue::TextureRef(texture) => {
                let unit = match (ty, slot.texture_unit) {
                    (UniformType::Sampler2D, Some(unit)) => unit,
                    _ => {
                        return Err(invalid(
                            name,
                            format!("texture names need sampler2D, not {}", ty.glsl_name()),
                        ))
                    }
                };
                let drawable = textures
                    .drawable(texture)
                    .ok_or_else(|| CompositorError::UnknownTexture(texture.clone()))?;
                drawable.bind(ctx, unit)?;
                (UniformData::Int(unit as i32), value.clone())
            }
            other => (encode(name, ty, other)?, other.clone()),
        };

        trace!(uniform = name, ?data, "write uniform");
        ctx.write_uniform(&slot.location, &data);
        slot.last_value = Some(cached);
        Ok(())
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> CompositorError {
    CompositorError::InvalidUniformValue {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Resolves a numeric value for a declared type.
fn encode(name: &str, ty: UniformType, value: &UniformValue) -> Result<UniformData, CompositorError> {
    use UniformType as T;

    let mismatch = || {
        invalid(
            name,
            format!("{} cannot be written to {}", describe(value), ty.glsl_name()),
        )
    };

    match ty {
        T::Float => scalar_f32(value).map(UniformData::Float).ok_or_else(mismatch),
        T::Int | T::Sampler2D => scalar_i32(value).map(UniformData::Int).ok_or_else(mismatch),
        T::Bool => scalar_bool(value)
            .map(|b| UniformData::Int(b as i32))
            .ok_or_else(mismatch),
        T::FloatVec2 | T::FloatVec3 | T::FloatVec4 => {
            let UniformValue::Vec(v) = value else {
                return Err(mismatch());
            };
            match (ty, v.as_slice()) {
                (T::FloatVec2, &[x, y]) => Ok(UniformData::Vec2([x, y])),
                (T::FloatVec3, &[x, y, z]) => Ok(UniformData::Vec3([x, y, z])),
                (T::FloatVec4, &[x, y, z, w]) => Ok(UniformData::Vec4([x, y, z, w])),
                _ => Err(mismatch()),
            }
        }
        T::IntVec2 | T::IntVec3 | T::IntVec4 | T::BoolVec2 | T::BoolVec3 | T::BoolVec4 => {
            let UniformValue::Vec(v) = value else {
                return Err(mismatch());
            };
            let is_bool = matches!(ty, T::BoolVec2 | T::BoolVec3 | T::BoolVec4);
            let ints: Vec<i32> = v
                .iter()
                .map(|&x| if is_bool { (x != 0.0) as i32 } else { x as i32 })
                .collect();
            match (ty, ints.as_slice()) {
                (T::IntVec2 | T::BoolVec2, &[x, y]) => Ok(UniformData::IVec2([x, y])),
                (T::IntVec3 | T::BoolVec3, &[x, y, z]) => Ok(UniformData::IVec3([x, y, z])),
                (T::IntVec4 | T::BoolVec4, &[x, y, z, w]) => Ok(UniformData::IVec4([x, y, z, w])),
                _ => Err(mismatch()),
            }
        }
        T::FloatMat2 | T::FloatMat3 | T::FloatMat4 => {
            let (UniformValue::Mat(v) | UniformValue::Vec(v)) = value else {
                return Err(mismatch());
            };
            match ty {
                T::FloatMat2 => v.as_slice().try_into().map(UniformData::Mat2),
                T::FloatMat3 => v.as_slice().try_into().map(UniformData::Mat3),
                _ => v.as_slice().try_into().map(UniformData::Mat4),
            }
            .map_err(|_| mismatch())
        }
    }
}

fn scalar_f32(value: &UniformValue) -> Option<f32> {
    match *value {
        UniformValue::Float(v) => Some(v),
        UniformValue::Int(v) => Some(v as f32),
        _ => None,
    }
}

fn scalar_i32(value: &UniformValue) -> Option<i32> {
    match *value {
        UniformValue::Int(v) => Some(v),
        UniformValue::Float(v) if v.fract() == 0.0 => Some(v as i32),
        _ => None,
    }
}

fn scalar_bool(value: &UniformValue) -> Option<bool> {
    match *value {
        UniformValue::Bool(v) => Some(v),
        UniformValue::Int(v) => Some(v != 0),
        UniformValue::Float(v) => Some(v != 0.0),
        _ => None,
    }
}

fn describe(value: &UniformValue) -> String {
    match value {
        UniformValue::Float(_) => "float".into(),
        UniformValue::Int(_) => "int".into(),
        UniformValue::Bool(_) => "bool".into(),
        UniformValue::Vec(v) => format!("{}-component vector", v.len()),
        UniformValue::Mat(v) => format!("{}-element matrix", v.len()),
        UniformValue::ColorHex(_) => "color string".into(),
        UniformValue::TextureRef(_) => "texture name".into(),
    }
}
