//! Error types for the stratum compositor.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Per-line compiler diagnostics, keyed by the line of the caller's
/// original shader source. Line `0` collects messages that could not be
/// mapped back to a source line.
pub type LineErrors = BTreeMap<usize, Vec<String>>;

/// Compile diagnostics for both stages of a program.
///
/// A stage that compiled successfully has an empty map, never a missing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderCompileError {
    pub vertex: LineErrors,
    pub fragment: LineErrors,
}

impl ShaderCompileError {
    /// Total number of diagnostic messages across both stages.
    pub fn message_count(&self) -> usize {
        self.vertex
            .values()
            .chain(self.fragment.values())
            .map(Vec::len)
            .sum()
    }
}

impl fmt::Display for ShaderCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not compile shader")?;
        for (stage, errors) in [("vertex", &self.vertex), ("fragment", &self.fragment)] {
            for (line, messages) in errors {
                for message in messages {
                    write!(f, "\n  {stage}:{line}: {message}")?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ShaderCompileError {}

/// Errors produced by compositor operations.
#[derive(Debug, Error)]
pub enum CompositorError {
    /// A texture or program with this name is already registered.
    #[error("a resource with this name already exists: {0}")]
    NameAlreadyExists(String),

    /// Names starting with `~` are reserved for internal programs.
    #[error("names starting with '~' are reserved: {0}")]
    ReservedName(String),

    /// An operation required a registered program or import that does not exist.
    #[error("unknown name: {0}")]
    UnknownName(String),

    /// A sampler uniform or mask referenced a texture that is not registered.
    #[error("unknown texture: {0}")]
    UnknownTexture(String),

    /// A blend mode name did not match any supported mode.
    #[error("invalid blend mode: {0}")]
    InvalidBlendMode(String),

    /// The object has been disposed and can no longer be used.
    #[error("this {0} has been disposed")]
    UseAfterDispose(&'static str),

    /// One or both shader stages failed to compile.
    #[error(transparent)]
    ShaderCompile(#[from] ShaderCompileError),

    /// The program failed to link.
    #[error("could not link program:\n{0}")]
    Link(String),

    /// The image or video source has no decoded pixels yet.
    #[error("source is not loaded")]
    SourceNotLoaded,

    /// A uniform value could not be interpreted for the uniform's declared type.
    #[error("invalid value for uniform '{name}': {reason}")]
    InvalidUniformValue { name: String, reason: String },

    /// The program declares a uniform whose GPU type has no setter.
    #[error("unsupported type 0x{gl_type:04X} for uniform '{name}'")]
    UnsupportedUniformType { name: String, gl_type: u32 },

    /// Width or height was zero.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// `end()` was called without a matching `begin()`.
    #[error("end() called with no open group")]
    GroupUnderflow,

    /// The rendering context failed to allocate or configure an object.
    #[error("render backend error: {0}")]
    Backend(String),
}
