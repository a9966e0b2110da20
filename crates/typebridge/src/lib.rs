//! Generate TypeScript declarations from pydantic models.
//!
//! # Architecture
//!
//! ```text
//!  entry module
//!       │
//!       ▼
//!  locate ──► reduce ──► synthesize ──► render (json2ts) ──► finalize ──► file
//!  (models)   (exclude,   (JSON Schema +   (subprocess)       (strip root,
//!              dedupe)     aggregator)                          banner)
//! ```
//!
//! Discovery lives in `typebridge-models`, schema synthesis in
//! `typebridge-schema` and generator invocation in `typebridge-tools`. This
//! crate wires them together and owns configuration and post-processing.
//!
//! # Example
//!
//! ```ignore
//! use typebridge::{GenerateOptions, generate, write_output};
//!
//! let mut options = GenerateOptions::new("backend.api.schemas");
//! options.exclude.push("InternalState".into());
//! let doc = generate(&options)?;
//! write_output("frontend/apiTypes.ts".as_ref(), &doc)?;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod finalize;
pub mod merge;
pub mod pipeline;

// Re-exports: pipeline
pub use error::Error;
pub use finalize::{BANNER, FinalizeError, OutputDocument, finalize};
pub use pipeline::{GenerateOptions, generate, generate_with, write_output};

// Re-exports: configuration
pub use config::{ConfigError, TypebridgeConfig};
pub use merge::Merge;
