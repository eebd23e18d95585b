//! Failures of `stratum` subcommands and their exit codes.
//!
//! | code | cause |
//! |------|-------|
//! | 2    | rejected by clap before a subcommand runs |
//! | 10   | refused by the core library: unknown blend mode, compile or link failure |
//! | 11   | a shader or `--import` file could not be read |
//! | 12   | malformed color, opacity or uniform map on the command line |
//! | 13   | a report could not be encoded as JSON |

use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use stratum_core::CompositorError;

#[derive(Debug)]
pub enum CliError {
    Compositor(CompositorError),
    Read { path: PathBuf, source: io::Error },
    Input(String),
    Encode(serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Compositor(_) => 10,
            CliError::Read { .. } => 11,
            CliError::Input(_) => 12,
            CliError::Encode(_) => 13,
        }
    }

    /// A file read failure, remembering which file.
    pub fn read(path: &Path, source: io::Error) -> Self {
        CliError::Read {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Compositor(e) => write!(f, "{e}"),
            CliError::Read { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            CliError::Input(msg) => f.write_str(msg),
            CliError::Encode(e) => write!(f, "cannot encode output: {e}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::Compositor(e) => Some(e),
            CliError::Read { source, .. } => Some(source),
            CliError::Encode(e) => Some(e),
            CliError::Input(_) => None,
        }
    }
}

impl From<CompositorError> for CliError {
    fn from(e: CompositorError) -> Self {
        CliError::Compositor(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Encode(e)
    }
}
