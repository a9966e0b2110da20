//! JSON Schema synthesis for discovered pydantic models.
//!
//! Turns an ordered list of models into a single JSON Schema document whose
//! root forces every model into the generator's output.
//!
//! # Example
//!
//! ```ignore
//! use typebridge_models::{locate, reduce};
//! use typebridge_schema::{SynthesisOptions, synthesize};
//!
//! let located = locate("api.schemas", &[])?;
//! let models = reduce(&located.models, &[])?;
//! let doc = synthesize(&models, &located, &SynthesisOptions::default())?;
//! println!("{}", doc.to_json_pretty()?);
//! ```

pub mod inclusion;
pub mod synthesize;

pub use inclusion::{DEFAULT_AGGREGATOR_NAME, ForcedInclusion};
pub use synthesize::{
    NullableStyle, SchemaDocument, SchemaDraft, SchemaGenerationError, SynthesisOptions,
    synthesize, to_camel,
};
