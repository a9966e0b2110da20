//! The generation pipeline: locate, reduce, synthesize, render, finalize.

use crate::config::TypebridgeConfig;
use crate::error::Error;
use crate::finalize::{OutputDocument, finalize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use typebridge_models::input::PYTHON_READER;
use typebridge_models::{LocatedDefinitions, Locator, reduce};
use typebridge_schema::{ForcedInclusion, SynthesisOptions, synthesize};
use typebridge_tools::{DEFAULT_COMMAND, Generator, Json2Ts};

/// Everything one run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub module: String,
    /// Search roots for dotted module paths; empty means the working
    /// directory.
    pub roots: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub json2ts_cmd: String,
    pub timeout: Option<Duration>,
    pub synthesis: SynthesisOptions,
}

impl GenerateOptions {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            roots: Vec::new(),
            exclude: Vec::new(),
            json2ts_cmd: DEFAULT_COMMAND.to_string(),
            timeout: None,
            synthesis: SynthesisOptions::default(),
        }
    }

    /// Resolve merged configuration into run options and the output path.
    pub fn from_config(config: TypebridgeConfig) -> Result<(Self, PathBuf), Error> {
        let module = config.module.ok_or(Error::Missing("module"))?;
        let output = config.output.ok_or(Error::Missing("output"))?;

        let mut synthesis = SynthesisOptions::default();
        if let Some(nullable) = config.nullable {
            synthesis.nullable = nullable;
        }
        if let Some(draft) = config.draft {
            synthesis.draft = draft;
        }
        if let Some(name) = config.aggregator_name {
            synthesis.aggregator_name = name;
        }
        synthesis.to_camel = config.to_camel.unwrap_or(false);
        synthesis.forbid_unless_allowed = config.forbid_extra.unwrap_or(true);
        if config.unreachable_definitions.unwrap_or(false) {
            synthesis.inclusion = ForcedInclusion::Unreachable;
        }

        let options = Self {
            module,
            roots: config.roots.unwrap_or_default(),
            exclude: config.exclude.unwrap_or_default(),
            json2ts_cmd: config
                .json2ts_cmd
                .unwrap_or_else(|| DEFAULT_COMMAND.to_string()),
            timeout: config.timeout.map(Duration::from_secs),
            synthesis,
        };
        Ok((options, output))
    }

    pub fn generator(&self) -> Json2Ts {
        Json2Ts::from_command(&self.json2ts_cmd).with_timeout(self.timeout)
    }
}

/// Run the pipeline with the configured `json2ts` command.
pub fn generate(options: &GenerateOptions) -> Result<OutputDocument, Error> {
    generate_with(&options.generator(), options)
}

/// Run the pipeline with an explicit generator.
pub fn generate_with(
    generator: &dyn Generator,
    options: &GenerateOptions,
) -> Result<OutputDocument, Error> {
    generator.check()?;

    tracing::info!(module = %options.module, "locating models");
    let located = Locator::new(&PYTHON_READER)
        .with_roots(options.roots.iter().cloned())
        .locate(&options.module)?;
    tracing::info!(
        models = located.models.len(),
        dependencies = located.dependencies.len(),
        enums = located.enums.len(),
        "discovered definitions"
    );

    warn_unused_exclusions(&located, &options.exclude);
    let models = reduce(located.all_models(), &options.exclude)?;
    if models.is_empty() {
        tracing::warn!(module = %options.module, "no pydantic models found");
        return Ok(OutputDocument::empty());
    }

    let doc = synthesize(&models, &located, &options.synthesis)?;
    tracing::info!(
        definitions = doc.definitions.len(),
        generator = generator.info().name,
        "rendering declarations"
    );
    let raw = generator.render(&doc)?;

    let output = finalize(&raw, &doc.aggregator, doc.forced_inclusion)?;
    tracing::info!(bytes = output.as_str().len(), "generated declarations");
    Ok(output)
}

fn warn_unused_exclusions(located: &LocatedDefinitions, exclude: &[String]) {
    for name in exclude {
        let used = located
            .all_models()
            .any(|m| m.name == *name || m.qualname == *name);
        if !used {
            tracing::warn!(name = %name, "excluded name matches no model");
        }
    }
}

/// Write `doc` to `path`. Called only once the whole pipeline succeeded.
pub fn write_output(path: &Path, doc: &OutputDocument) -> Result<(), Error> {
    std::fs::write(path, doc.as_str()).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "saved declarations");
    Ok(())
}
