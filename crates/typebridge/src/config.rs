//! Configuration for typebridge.
//!
//! Loads config from:
//! 1. Global: `<config dir>/typebridge/config.toml`
//! 2. Per-project: `.typebridge/config.toml` (overrides global)
//! 3. An explicit `--config <path>` (overrides both)
//!
//! Command-line flags override every file.
//!
//! Example config.toml:
//! ```toml
//! module = "backend.api.schemas"
//! output = "frontend/src/apiTypes.ts"
//! exclude = ["InternalState"]
//! json2ts_cmd = "yarn json2ts"
//! nullable = "optional"
//! ```

use crate::merge::Merge;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use typebridge_schema::{NullableStyle, SchemaDraft};

/// Location of the project config relative to the working directory.
pub const PROJECT_CONFIG: &str = ".typebridge/config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings for one generation run. Every key is optional so layers can be
/// merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct TypebridgeConfig {
    /// Entry module: dotted path (`pkg.schemas`) or a file or directory.
    pub module: Option<String>,
    /// Where to write the declarations.
    pub output: Option<PathBuf>,
    /// Model names (plain or qualified) to leave out.
    pub exclude: Option<Vec<String>>,
    /// Generator command line, e.g. `yarn json2ts`.
    pub json2ts_cmd: Option<String>,
    /// Directories searched for dotted module paths.
    pub roots: Option<Vec<PathBuf>>,
    /// How `Optional[T]` fields are rendered.
    pub nullable: Option<NullableStyle>,
    /// JSON Schema dialect handed to the generator.
    pub draft: Option<SchemaDraft>,
    /// Convert field names to camelCase when no alias is set.
    pub to_camel: Option<bool>,
    /// Ask the generator for unreachable definitions instead of using an
    /// aggregator root.
    pub unreachable_definitions: Option<bool>,
    /// Forbid extra properties unless a model allows them explicitly.
    pub forbid_extra: Option<bool>,
    /// Preferred title of the synthetic root.
    pub aggregator_name: Option<String>,
    /// Seconds before the generator is killed.
    pub timeout: Option<u64>,
}

impl Merge for TypebridgeConfig {
    fn merge(self, other: Self) -> Self {
        Self {
            module: self.module.merge(other.module),
            output: self.output.merge(other.output),
            exclude: self.exclude.merge(other.exclude),
            json2ts_cmd: self.json2ts_cmd.merge(other.json2ts_cmd),
            roots: self.roots.merge(other.roots),
            nullable: self.nullable.merge(other.nullable),
            draft: self.draft.merge(other.draft),
            to_camel: self.to_camel.merge(other.to_camel),
            unreachable_definitions: self
                .unreachable_definitions
                .merge(other.unreachable_definitions),
            forbid_extra: self.forbid_extra.merge(other.forbid_extra),
            aggregator_name: self.aggregator_name.merge(other.aggregator_name),
            timeout: self.timeout.merge(other.timeout),
        }
    }
}

impl TypebridgeConfig {
    /// Load the global and project config for `root`, then `explicit` if
    /// given. Missing global or project files are skipped; a missing explicit
    /// file is an error.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let implicit = Self::global_config_path()
            .into_iter()
            .chain(std::iter::once(root.join(PROJECT_CONFIG)));
        for path in implicit {
            if path.is_file() {
                config = config.merge(Self::load_file(&path)?);
            }
        }

        if let Some(path) = explicit {
            config = config.merge(Self::load_file(path)?);
        }
        Ok(config)
    }

    /// `<config dir>/typebridge/config.toml`.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("typebridge").join("config.toml"))
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_project_config(dir: &TempDir, content: &str) {
        let path = dir.path().join(PROJECT_CONFIG);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn load_project_config() {
        let dir = TempDir::new().unwrap();
        write_project_config(
            &dir,
            r#"
module = "app.schemas"
exclude = ["Internal"]
nullable = "optional"
draft = "07"
"#,
        );

        let config = TypebridgeConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.module.as_deref(), Some("app.schemas"));
        assert_eq!(config.exclude, Some(vec!["Internal".to_string()]));
        assert_eq!(config.nullable, Some(NullableStyle::Optional));
        assert_eq!(config.draft, Some(SchemaDraft::Draft07));
        assert_eq!(config.output, None);
    }

    #[test]
    fn explicit_config_overrides_project() {
        let dir = TempDir::new().unwrap();
        write_project_config(&dir, "module = \"app.schemas\"\nto_camel = true\n");
        let explicit = dir.path().join("ci.toml");
        std::fs::write(&explicit, "module = \"app.v2\"\n").unwrap();

        let config = TypebridgeConfig::load(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(config.module.as_deref(), Some("app.v2"));
        assert_eq!(config.to_camel, Some(true));
    }

    #[test]
    fn missing_explicit_config_fails() {
        let dir = TempDir::new().unwrap();
        let err = TypebridgeConfig::load(dir.path(), Some(&dir.path().join("nope.toml")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_project_config(&dir, "modul = \"typo\"\n");
        let err = TypebridgeConfig::load(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn later_layer_wins() {
        let global = TypebridgeConfig {
            json2ts_cmd: Some("json2ts".into()),
            timeout: Some(30),
            ..Default::default()
        };
        let project = TypebridgeConfig {
            json2ts_cmd: Some("yarn json2ts".into()),
            ..Default::default()
        };
        let merged = global.merge(project);
        assert_eq!(merged.json2ts_cmd.as_deref(), Some("yarn json2ts"));
        assert_eq!(merged.timeout, Some(30));
    }
}
