//! Subcommand implementations, kept free of printing so they can be tested.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use stratum_core::blend::reference::blend_pixel;
use stratum_core::{
    uniforms_from_json, BlendMode, Preprocessed, Preprocessor, Rgba, ShaderStage, Uniforms,
};
use tracing::debug;

use crate::error::CliError;

/// Parses an `--import name=path` argument.
pub fn parse_import(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected name=path, got '{arg}'")),
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::read(path, e))
}

/// Expands `@use` directives in a shader file.
pub fn preprocess_file(
    path: &Path,
    stage: ShaderStage,
    imports: &[(String, PathBuf)],
    mask_support: bool,
) -> Result<Preprocessed, CliError> {
    let mut preprocessor = Preprocessor::new(mask_support);
    for (name, import_path) in imports {
        preprocessor.register_import(name.as_str(), read(import_path)?);
        debug!(import = %name, path = %import_path.display(), "import loaded");
    }
    let source = read(path)?;
    Ok(preprocessor.preprocess(&source, stage))
}

/// The fragment shader for a blend mode, raw or preprocessed.
pub fn blend_shader(mode: &str, raw: bool, mask_support: bool) -> Result<String, CliError> {
    let mode: BlendMode = mode.parse()?;
    let shader = mode.fragment_shader();
    if raw {
        return Ok(shader);
    }
    Ok(Preprocessor::new(mask_support)
        .preprocess(&shader, ShaderStage::Fragment)
        .source)
}

fn color(label: &str, hex: &str) -> Result<Rgba, CliError> {
    Rgba::from_hex(hex).map_err(|e| CliError::Input(format!("invalid --{label}: {e}")))
}

/// Blends one source pixel over one backdrop pixel on the CPU.
pub fn blend(mode: &str, backdrop: &str, source: &str, opacity: f32) -> Result<Value, CliError> {
    let mode: BlendMode = mode.parse()?;
    if !(0.0..=1.0).contains(&opacity) {
        return Err(CliError::Input(format!(
            "--opacity must be within 0.0..=1.0, got {opacity}"
        )));
    }
    let backdrop = color("backdrop", backdrop)?;
    let source = color("source", source)?;
    let result = blend_pixel(mode, backdrop, source, opacity);
    Ok(json!({
        "mode": mode,
        "backdrop": backdrop,
        "source": source,
        "opacity": opacity,
        "result": result,
    }))
}

/// Blend modes and built-in import names.
pub fn list() -> Value {
    let modes: Vec<&str> = BlendMode::ALL.iter().map(|m| m.name()).collect();
    json!({
        "blend_modes": modes,
        "imports": Preprocessor::default().import_names(),
    })
}

/// Parses a uniform map from JSON text.
pub fn parse_uniforms(text: &str) -> Result<Uniforms, CliError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| CliError::Input(format!("invalid uniform JSON: {e}")))?;
    uniforms_from_json(&value).map_err(CliError::Input)
}
