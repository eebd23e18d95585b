#![deny(unsafe_code)]
//! CLI binary for the stratum compositor.
//!
//! Subcommands:
//! - `preprocess <file>` -- expand `@use` imports and print the line map
//! - `blend-shader <mode>` -- print the fragment shader for a blend mode
//! - `blend <mode>` -- blend two colors with the CPU reference
//! - `uniforms <map>` -- check a uniform map
//! - `list` -- print blend modes and built-in imports
//!
//! Set `RUST_LOG` (for example `RUST_LOG=debug`) for diagnostics on stderr.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use error::CliError;
use stratum_core::ShaderStage;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stratum", about = "Layered GPU image compositing tools")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Leave out the iMask/iMaskEnabled declarations.
    #[arg(long, global = true)]
    no_mask: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Expand `@use` directives in a shader file.
    Preprocess {
        /// Shader source file.
        file: PathBuf,

        /// Treat the file as a vertex shader.
        #[arg(long)]
        vertex: bool,

        /// Extra import as name=path; may be repeated.
        #[arg(long = "import", value_parser = commands::parse_import)]
        imports: Vec<(String, PathBuf)>,
    },
    /// Print the fragment shader generated for a blend mode.
    BlendShader {
        /// Blend mode name (e.g. "soft_light").
        mode: String,

        /// Print the template before preprocessing.
        #[arg(long)]
        raw: bool,
    },
    /// Blend a source color over a backdrop color.
    Blend {
        /// Blend mode name.
        mode: String,

        /// Backdrop color as #RRGGBB[AA].
        #[arg(long)]
        backdrop: String,

        /// Source color as #RRGGBB[AA].
        #[arg(long)]
        source: String,

        /// Layer opacity.
        #[arg(long, default_value_t = 1.0)]
        opacity: f32,
    },
    /// Parse a JSON uniform map and print the resolved values.
    Uniforms {
        /// JSON object, e.g. '{"iTime": 1.5}'.
        map: String,
    },
    /// List blend modes and built-in imports.
    List,
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mask_support = !cli.no_mask;
    match cli.command {
        Command::Preprocess {
            file,
            vertex,
            imports,
        } => {
            let stage = if vertex {
                ShaderStage::Vertex
            } else {
                ShaderStage::Fragment
            };
            let out = commands::preprocess_file(&file, stage, &imports, mask_support)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print!("{}", out.source);
            }
        }
        Command::BlendShader { mode, raw } => {
            let source = commands::blend_shader(&mode, raw, mask_support)?;
            if cli.json {
                let info = serde_json::json!({ "mode": mode, "source": source });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{source}");
            }
        }
        Command::Blend {
            mode,
            backdrop,
            source,
            opacity,
        } => {
            let report = commands::blend(&mode, &backdrop, &source, opacity)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report["result"].as_str().unwrap_or_default());
            }
        }
        Command::Uniforms { map } => {
            let uniforms = commands::parse_uniforms(&map)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&uniforms)?);
            } else {
                for (name, value) in &uniforms {
                    println!("{name}: {value:?}");
                }
            }
        }
        Command::List => {
            let listing = commands::list();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for (heading, key) in [("Blend modes:", "blend_modes"), ("Imports:", "imports")] {
                    println!("{heading}");
                    for name in listing[key].as_array().into_iter().flatten() {
                        println!("  {}", name.as_str().unwrap_or_default());
                    }
                }
            }
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
