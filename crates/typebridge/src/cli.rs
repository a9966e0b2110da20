//! Command-line arguments.

use crate::config::TypebridgeConfig;
use crate::error::Error;
use crate::merge::Merge;
use crate::pipeline::{GenerateOptions, generate, write_output};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use typebridge_schema::{NullableStyle, SchemaDraft};

/// Convert pydantic models into TypeScript declarations.
#[derive(Debug, Parser)]
#[command(name = "typebridge", version)]
pub struct Cli {
    /// Entry module: dotted path (`backend.api.schemas`) or a file or
    /// package directory.
    #[arg(long, short = 'm')]
    pub module: Option<String>,

    /// File the declarations are written to.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Model to leave out (plain or qualified name). Repeatable.
    #[arg(long, value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Generator command, e.g. `yarn json2ts` [default: json2ts]
    #[arg(long, value_name = "CMD")]
    pub json2ts_cmd: Option<String>,

    /// Directory searched for dotted module paths. Repeatable.
    #[arg(long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// How `Optional[T]` fields are rendered [default: union]
    #[arg(long, value_enum)]
    pub nullable: Option<NullableArg>,

    /// JSON Schema dialect handed to the generator [default: 2020-12]
    #[arg(long, value_enum)]
    pub draft: Option<DraftArg>,

    /// Convert field names to camelCase when no alias is set.
    #[arg(long)]
    pub to_camel: bool,

    /// Ask the generator for unreachable definitions instead of using an
    /// aggregator root.
    #[arg(long)]
    pub unreachable_definitions: bool,

    /// Kill the generator after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra config file, applied over the global and project config.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NullableArg {
    Union,
    Optional,
}

impl From<NullableArg> for NullableStyle {
    fn from(arg: NullableArg) -> Self {
        match arg {
            NullableArg::Union => NullableStyle::Union,
            NullableArg::Optional => NullableStyle::Optional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DraftArg {
    #[value(name = "2020-12")]
    Draft2020,
    #[value(name = "07")]
    Draft07,
}

impl From<DraftArg> for SchemaDraft {
    fn from(arg: DraftArg) -> Self {
        match arg {
            DraftArg::Draft2020 => SchemaDraft::Draft2020,
            DraftArg::Draft07 => SchemaDraft::Draft07,
        }
    }
}

impl Cli {
    /// The flags as the topmost config layer. Switches that are off leave
    /// lower layers untouched.
    pub fn layer(&self) -> TypebridgeConfig {
        TypebridgeConfig {
            module: self.module.clone(),
            output: self.output.clone(),
            exclude: non_empty(&self.exclude),
            json2ts_cmd: self.json2ts_cmd.clone(),
            roots: non_empty(&self.roots),
            nullable: self.nullable.map(Into::into),
            draft: self.draft.map(Into::into),
            to_camel: self.to_camel.then_some(true),
            unreachable_definitions: self.unreachable_definitions.then_some(true),
            forbid_extra: None,
            aggregator_name: None,
            timeout: self.timeout,
        }
    }

    /// Load config for `root`, apply the flags and run one generation.
    pub fn run(&self, root: &Path) -> Result<PathBuf, Error> {
        let config = TypebridgeConfig::load(root, self.config.as_deref())?.merge(self.layer());
        let (options, output) = GenerateOptions::from_config(config)?;
        let doc = generate(&options)?;
        write_output(&output, &doc)?;
        Ok(output)
    }
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_become_config_layer() {
        let cli = Cli::parse_from([
            "typebridge",
            "--module",
            "app.schemas",
            "--output",
            "out.ts",
            "--exclude",
            "A",
            "--exclude",
            "app.schemas.B",
            "--nullable",
            "optional",
            "--draft",
            "07",
            "--to-camel",
        ]);
        let layer = cli.layer();
        assert_eq!(layer.module.as_deref(), Some("app.schemas"));
        assert_eq!(
            layer.exclude,
            Some(vec!["A".to_string(), "app.schemas.B".to_string()])
        );
        assert_eq!(layer.nullable, Some(NullableStyle::Optional));
        assert_eq!(layer.draft, Some(SchemaDraft::Draft07));
        assert_eq!(layer.to_camel, Some(true));
        assert_eq!(layer.unreachable_definitions, None);
    }

    #[test]
    fn unset_flags_keep_file_values() {
        let file = TypebridgeConfig {
            exclude: Some(vec!["Internal".into()]),
            to_camel: Some(true),
            ..Default::default()
        };
        let cli = Cli::parse_from(["typebridge", "-m", "app"]);
        let merged = file.merge(cli.layer());
        assert_eq!(merged.exclude, Some(vec!["Internal".to_string()]));
        assert_eq!(merged.to_camel, Some(true));
        assert_eq!(merged.module.as_deref(), Some("app"));
    }

    #[test]
    fn rejects_unknown_nullable_style() {
        assert!(Cli::try_parse_from(["typebridge", "--nullable", "maybe"]).is_err());
    }
}
