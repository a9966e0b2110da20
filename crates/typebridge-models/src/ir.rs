//! Intermediate representation for discovered model definitions.
//!
//! Python sources are read into module syntax first; the locator then
//! resolves names across modules and produces these definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Identity of a definition: the module file that defines it plus its name.
///
/// Two imports of the same class share one `DefinitionId`; two classes that
/// merely share a name do not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId {
    /// Canonical path of the defining module.
    pub module: PathBuf,
    /// Class name inside that module.
    pub name: String,
}

impl DefinitionId {
    pub fn new(module: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.module.display())
    }
}

/// Policy for properties that a model does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraFields {
    Allow,
    Forbid,
    Ignore,
}

impl ExtraFields {
    /// Parse a policy name (`"allow"`, `"forbid"`, `"ignore"`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "allow" => Some(Self::Allow),
            "forbid" => Some(Self::Forbid),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// A concrete model class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub id: DefinitionId,
    /// Class name.
    pub name: String,
    /// Dotted module path plus class name (e.g. `shelter.animals.cats.Cat`).
    pub qualname: String,
    /// Class docstring.
    pub docs: Option<String>,
    /// Fields in schema order: inherited first, then own, then computed.
    pub fields: Vec<Field>,
    /// Extra-fields policy, `None` when never configured.
    pub extra: Option<ExtraFields>,
}

/// A model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Attribute name in Python.
    pub name: String,
    /// Serialization alias.
    pub alias: Option<String>,
    pub ty: FieldType,
    pub default: FieldDefault,
    pub description: Option<String>,
    pub title: Option<String>,
    pub constraints: Constraints,
    /// Declared through `@computed_field`; always present when serialized.
    pub computed: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            ty,
            default: FieldDefault::Required,
            description: None,
            title: None,
            constraints: Constraints::default(),
            computed: false,
        }
    }

    pub fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name used on the wire.
    pub fn serialized_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn has_default(&self) -> bool {
        !matches!(self.default, FieldDefault::Required)
    }
}

/// Default value of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldDefault {
    /// No default; the field must be supplied.
    Required,
    /// A statically known JSON-compatible value.
    Literal(Value),
    /// `default_factory=...`.
    Factory,
    /// A default whose value cannot be evaluated statically.
    Opaque,
}

/// Validation bounds taken from `Field(...)` keyword arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub minimum: Option<Value>,
    pub exclusive_minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub exclusive_maximum: Option<Value>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// String formats that map onto JSON Schema `format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringFormat {
    DateTime,
    Date,
    Time,
    Duration,
    Uuid,
    Email,
    Uri,
    Path,
    Ipv4,
    Ipv6,
}

impl StringFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Time => "time",
            Self::Duration => "duration",
            Self::Uuid => "uuid",
            Self::Email => "email",
            Self::Uri => "uri",
            Self::Path => "path",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }
}

/// Resolved type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Any,
    Null,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Decimal,
    Formatted(StringFormat),
    List(Box<FieldType>),
    Set(Box<FieldType>),
    /// `Tuple[A, B]`, or `Tuple[A, ...]` when `variadic`.
    Tuple {
        items: Vec<FieldType>,
        variadic: bool,
    },
    Dict {
        key: Box<FieldType>,
        value: Box<FieldType>,
    },
    /// `T | None`; the inner type is never `Null` or `Optional`.
    Optional(Box<FieldType>),
    /// Union without a `None` member.
    Union(Vec<FieldType>),
    Literal(Vec<Value>),
    /// Reference to a collected model or enum.
    Ref(DefinitionId),
    /// A name that did not resolve to anything the schema can express.
    Unresolved(String),
}

impl FieldType {
    /// Build a union, folding `None` members into `Optional`.
    pub fn union(members: Vec<FieldType>) -> FieldType {
        let mut flat = Vec::new();
        let mut nullable = false;
        for member in members {
            match member {
                FieldType::Null => nullable = true,
                FieldType::Optional(inner) => {
                    nullable = true;
                    push_flattened(&mut flat, *inner);
                }
                other => push_flattened(&mut flat, other),
            }
        }

        let base = match flat.len() {
            0 => return FieldType::Null,
            1 => flat.remove(0),
            _ => FieldType::Union(flat),
        };
        if nullable {
            FieldType::Optional(Box::new(base))
        } else {
            base
        }
    }

    pub fn optional(inner: FieldType) -> FieldType {
        FieldType::union(vec![inner, FieldType::Null])
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// Visit every definition reference in this type.
    pub fn for_each_ref(&self, f: &mut impl FnMut(&DefinitionId)) {
        match self {
            FieldType::Ref(id) => f(id),
            FieldType::List(inner) | FieldType::Set(inner) | FieldType::Optional(inner) => {
                inner.for_each_ref(f)
            }
            FieldType::Tuple { items, .. } => items.iter().for_each(|t| t.for_each_ref(f)),
            FieldType::Union(members) => members.iter().for_each(|t| t.for_each_ref(f)),
            FieldType::Dict { key, value } => {
                key.for_each_ref(f);
                value.for_each_ref(f);
            }
            _ => {}
        }
    }
}

fn push_flattened(out: &mut Vec<FieldType>, ty: FieldType) {
    match ty {
        FieldType::Union(members) => {
            for member in members {
                push_flattened(out, member);
            }
        }
        other => {
            if !out.contains(&other) {
                out.push(other);
            }
        }
    }
}

/// An enum class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub id: DefinitionId,
    pub name: String,
    pub qualname: String,
    pub docs: Option<String>,
    /// Member values in declaration order (strings or numbers).
    pub values: Vec<Value>,
}
