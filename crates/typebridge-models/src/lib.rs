//! Static discovery of pydantic models and enums in Python source trees.
//!
//! `typebridge-models` reads Python modules with tree-sitter, follows
//! package structure and imports from an entry module, and produces typed
//! definitions for every concrete model and enum it finds.
//!
//! # Architecture
//!
//! ```text
//! Python sources        Declarations          Definitions
//! ──────────────     ─────────────────     ────────────────────
//! entry module  ─┐                      ┌─> ModelDefinition
//! submodules    ─┼─> ModuleSyntax ──────┤   (fields, extra policy)
//! imports       ─┘   (syntax.rs)        └─> EnumDefinition
//! ```
//!
//! # Example
//!
//! ```ignore
//! use typebridge_models::{locate, reduce};
//!
//! let located = locate("api.schemas", &[])?;
//! let models = reduce(located.all_models(), &["InternalOnly".to_string()])?;
//! for model in models {
//!     println!("{} ({} fields)", model.name, model.fields.len());
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `read-python` (default): tree-sitter based Python reader.

pub mod input;
pub mod ir;
pub mod locate;
pub mod reduce;
mod resolve;
pub mod syntax;
pub mod traits;

// Re-exports: IR types
pub use ir::{
    Constraints, DefinitionId, EnumDefinition, ExtraFields, Field, FieldDefault, FieldType,
    ModelDefinition, StringFormat,
};

// Re-exports: discovery
#[cfg(feature = "read-python")]
pub use locate::locate;
pub use locate::{LocatedDefinitions, Locator, ResolutionError};
pub use reduce::{NameCollisionError, reduce};

// Re-exports: Traits
pub use traits::{DefinitionCatalog, ModuleReader, ReadError, SchemaSource};
