//! Traits at the seams between readers, the locator and schema synthesis.

use crate::ir::{DefinitionId, EnumDefinition, ExtraFields, Field, ModelDefinition};
use crate::syntax::{ModuleSyntax, TypeExpr};

/// Error that can occur when reading a module's source.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// A reader extracts module declarations from source text.
pub trait ModuleReader: Send + Sync {
    /// File extensions of modules (e.g., &["py"]).
    fn extensions(&self) -> &'static [&'static str];

    /// File stem that turns a directory into a package (e.g., "__init__").
    fn package_marker(&self) -> &'static str;

    /// Parse source into module declarations.
    fn read(&self, source: &str) -> Result<ModuleSyntax, ReadError>;

    /// Parse a type written as a string, i.e. a forward reference
    /// (`"Team"`, `"List[Team]"`).
    fn parse_type(&self, text: &str) -> Result<TypeExpr, ReadError>;
}

/// Anything that can describe itself as an object schema.
///
/// Schema synthesis depends only on this capability, never on how the
/// definition was discovered.
pub trait SchemaSource {
    /// Name, unique within one generation run.
    fn name(&self) -> &str;

    /// Where the definition lives.
    fn location(&self) -> &DefinitionId;

    fn description(&self) -> Option<&str>;

    /// Fields in schema order.
    fn fields(&self) -> &[Field];

    fn extra_fields_policy(&self) -> Option<ExtraFields>;
}

impl SchemaSource for ModelDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &DefinitionId {
        &self.id
    }

    fn description(&self) -> Option<&str> {
        self.docs.as_deref()
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn extra_fields_policy(&self) -> Option<ExtraFields> {
        self.extra
    }
}

/// Lookup of every definition a field type may reference.
pub trait DefinitionCatalog {
    fn model(&self, id: &DefinitionId) -> Option<&dyn SchemaSource>;

    fn enumeration(&self, id: &DefinitionId) -> Option<&EnumDefinition>;
}
