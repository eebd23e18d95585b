//! Shader compilation and linking through a [`RenderContext`].
//!
//! Compiles both stages of a program even when the first fails, translates
//! driver error logs back to the caller's source lines, and links the
//! result. The formatting helper is pure string processing for debug logs.

use tracing::debug;

use super::backend::{RenderContext, ShaderStage};
use crate::error::{CompositorError, LineErrors, ShaderCompileError};
use crate::preprocess::Preprocessed;

/// Shader objects and the program linked from them.
#[derive(Debug)]
pub struct LinkedProgram<C: RenderContext> {
    pub program: C::Program,
    pub vertex: C::Shader,
    pub fragment: C::Shader,
}

/// Formats a shader compilation error for human-readable debugging.
///
/// Prepends right-aligned line numbers to each line of `source`, then
/// appends the driver's error `log`.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let source_lines: Vec<&str> = if source.is_empty() {
        Vec::new()
    } else {
        source.lines().collect()
    };

    let width = source_lines.len().max(1).to_string().len();

    let numbered: String = source_lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

/// Groups the `ERROR:` lines of a compile log by caller source line.
///
/// Each line looks like `ERROR: <file>:<line>: <message>`. The line is
/// translated through `preprocessed`'s line map; unparsable or unmapped
/// lines go to bucket `0`. A non-empty log without any `ERROR:` line is
/// kept whole under bucket `0`.
pub fn parse_error_log(log: &str, preprocessed: &Preprocessed) -> LineErrors {
    let mut errors = LineErrors::new();

    for line in log.lines().map(str::trim).filter(|l| l.starts_with("ERROR:")) {
        let fields: Vec<&str> = line.split(':').collect();
        let output_line = fields
            .get(2)
            .and_then(|f| f.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let message = fields.get(3..).map(|rest| rest.join(":")).unwrap_or_default();
        errors
            .entry(preprocessed.source_line(output_line))
            .or_default()
            .push(message.trim().to_string());
    }

    let log = log.trim();
    if errors.is_empty() && !log.is_empty() {
        errors.insert(0, vec![log.to_string()]);
    }
    errors
}

/// Compiles one preprocessed stage, returning its per-line errors on failure.
pub fn compile_stage<C: RenderContext>(
    ctx: &C,
    stage: ShaderStage,
    preprocessed: &Preprocessed,
) -> Result<C::Shader, LineErrors> {
    ctx.compile_shader(stage, &preprocessed.source).map_err(|log| {
        debug!(
            stage = stage.name(),
            "shader compile failed:\n{}",
            format_shader_error(&preprocessed.source, &log)
        );
        let mut errors = parse_error_log(&log, preprocessed);
        if errors.is_empty() {
            errors.insert(0, vec![format!("{} shader failed to compile", stage.name())]);
        }
        errors
    })
}

/// Compiles both stages and links them.
///
/// Both stages are always compiled so the error carries diagnostics for
/// each. Shader objects are released on every failure path.
///
/// # Errors
///
/// `ShaderCompile` if either stage fails, `Link` if linking fails.
pub fn link_stages<C: RenderContext>(
    ctx: &C,
    vertex: &Preprocessed,
    fragment: &Preprocessed,
) -> Result<LinkedProgram<C>, CompositorError> {
    let vs = compile_stage(ctx, ShaderStage::Vertex, vertex);
    let fs = compile_stage(ctx, ShaderStage::Fragment, fragment);

    let (vs, fs) = match (vs, fs) {
        (Ok(vs), Ok(fs)) => (vs, fs),
        (vs, fs) => {
            let mut error = ShaderCompileError::default();
            match vs {
                Ok(shader) => ctx.delete_shader(shader),
                Err(lines) => error.vertex = lines,
            }
            match fs {
                Ok(shader) => ctx.delete_shader(shader),
                Err(lines) => error.fragment = lines,
            }
            return Err(error.into());
        }
    };

    match ctx.link_program(vs, fs) {
        Ok(program) => {
            debug!(?program, "program linked");
            Ok(LinkedProgram {
                program,
                vertex: vs,
                fragment: fs,
            })
        }
        Err(log) => {
            ctx.delete_shader(vs);
            ctx.delete_shader(fs);
            Err(CompositorError::Link(log))
        }
    }
}
