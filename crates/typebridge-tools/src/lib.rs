//! External declaration generators.
//!
//! A generator turns a JSON Schema document into source declarations. The
//! only built-in generator is [`Json2Ts`], a wrapper around the
//! `json-schema-to-typescript` CLI.
//!
//! ```text
//! SchemaDocument ──► schema.json (temp dir) ──► <cmd> -i schema.json ──► stdout
//! ```
//!
//! # Example
//!
//! ```ignore
//! use typebridge_tools::{Generator, Json2Ts};
//!
//! let generator = Json2Ts::from_command("yarn json2ts");
//! let declarations = generator.render(&doc)?;
//! ```

mod json2ts;
mod process;

use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use typebridge_schema::SchemaDocument;

// Re-exports: built-in generators
pub use json2ts::{DEFAULT_COMMAND, Json2Ts};

/// Static information about a generator.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorInfo {
    pub name: &'static str,
    /// Command that installs the default executable.
    pub install: &'static str,
}

/// Failure to run the external generator.
#[derive(Debug, thiserror::Error)]
pub enum RenderInvocationError {
    #[error(
        "`{command}` was not found; install it with `{install}` \
         or point the generator command at an existing executable"
    )]
    NotInstalled {
        command: String,
        install: &'static str,
    },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "`{command}` failed ({status}); check that json-schema-to-typescript is installed \
         and working:\n{stderr}"
    )]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` did not finish within {}s:\n{stderr}", .timeout.as_secs_f64())]
    TimedOut {
        command: String,
        timeout: Duration,
        stderr: String,
    },

    #[error("`{command}` produced output that is not valid UTF-8")]
    InvalidOutput { command: String },

    #[error("could not prepare generator input: {0}")]
    Io(#[from] io::Error),
}

/// An external program that renders declarations from a schema document.
pub trait Generator {
    fn info(&self) -> &GeneratorInfo;

    /// Whether the executable can be found before doing any work.
    fn is_available(&self) -> bool;

    /// Fail early with [`RenderInvocationError::NotInstalled`] when the
    /// executable is missing.
    fn check(&self) -> Result<(), RenderInvocationError>;

    /// Render `doc` and return the generator's stdout.
    fn render(&self, doc: &SchemaDocument) -> Result<String, RenderInvocationError>;
}
