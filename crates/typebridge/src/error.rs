use crate::config::ConfigError;
use crate::finalize::FinalizeError;
use std::path::PathBuf;
use typebridge_models::{NameCollisionError, ResolutionError};
use typebridge_schema::SchemaGenerationError;
use typebridge_tools::RenderInvocationError;

/// Any failure of a generation run. Each stage's error is kept intact.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    NameCollision(#[from] NameCollisionError),

    #[error(transparent)]
    SchemaGeneration(#[from] SchemaGenerationError),

    #[error(transparent)]
    Render(#[from] RenderInvocationError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error("no {0} given; pass --{0} or set `{0}` in the config file")]
    Missing(&'static str),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
