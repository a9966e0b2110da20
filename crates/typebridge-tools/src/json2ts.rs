//! json-schema-to-typescript adapter.
//!
//! https://github.com/bcherny/json-schema-to-typescript

use crate::process::{self, Completion};
use crate::{Generator, GeneratorInfo, RenderInvocationError};
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use typebridge_schema::{ForcedInclusion, SchemaDocument};

/// Command used when none is configured.
pub const DEFAULT_COMMAND: &str = "json2ts";

const SCHEMA_FILE: &str = "schema.json";

const JSON2TS_INFO: GeneratorInfo = GeneratorInfo {
    name: "json2ts",
    install: "npm install -g json-schema-to-typescript",
};

/// The `json2ts` CLI, possibly behind a wrapper such as `yarn json2ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json2Ts {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl Json2Ts {
    pub fn new() -> Self {
        Self::from_command(DEFAULT_COMMAND)
    }

    /// Split a whitespace-separated command line. An empty string falls back
    /// to [`DEFAULT_COMMAND`].
    pub fn from_command(command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        Self {
            program,
            args: words.collect(),
            timeout: None,
        }
    }

    /// Kill the generator if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line as configured.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    fn render_in(&self, dir: &Path, doc: &SchemaDocument) -> Result<String, RenderInvocationError> {
        let schema_path = dir.join(SCHEMA_FILE);
        let json = doc.to_json_pretty().map_err(io::Error::other)?;
        std::fs::write(&schema_path, json)?;

        let mut cmd = self.command();
        cmd.arg("-i").arg(&schema_path).arg("--bannerComment").arg("");
        if doc.forced_inclusion == ForcedInclusion::Unreachable {
            cmd.arg("--unreachableDefinitions");
        }

        let command = self.command_line();
        tracing::debug!(command = %command, schema = %schema_path.display(), "running generator");

        let completion = process::run(cmd, self.timeout).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RenderInvocationError::NotInstalled {
                    command: command.clone(),
                    install: JSON2TS_INFO.install,
                }
            } else {
                RenderInvocationError::Spawn {
                    command: command.clone(),
                    source,
                }
            }
        })?;

        let output = match completion {
            Completion::Exited(output) => output,
            Completion::TimedOut { stderr } => {
                return Err(RenderInvocationError::TimedOut {
                    command,
                    timeout: self.timeout.unwrap_or_default(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                });
            }
        };

        if !output.status.success() {
            return Err(RenderInvocationError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %String::from_utf8_lossy(&output.stderr), "generator stderr");
        }

        String::from_utf8(output.stdout).map_err(|_| RenderInvocationError::InvalidOutput { command })
    }
}

impl Default for Json2Ts {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for Json2Ts {
    fn info(&self) -> &GeneratorInfo {
        &JSON2TS_INFO
    }

    /// Wrapped commands (`yarn json2ts`) resolve the tool themselves, so only
    /// a bare program is looked up on `PATH`.
    fn is_available(&self) -> bool {
        !self.args.is_empty() || which::which(&self.program).is_ok()
    }

    fn check(&self) -> Result<(), RenderInvocationError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(RenderInvocationError::NotInstalled {
                command: self.command_line(),
                install: JSON2TS_INFO.install,
            })
        }
    }

    fn render(&self, doc: &SchemaDocument) -> Result<String, RenderInvocationError> {
        self.check()?;

        let dir = tempfile::Builder::new().prefix("typebridge-").tempdir()?;
        let path = dir.path().to_path_buf();
        let result = self.render_in(&path, doc);
        if let Err(err) = dir.close() {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove temporary directory");
        }
        result
    }
}
