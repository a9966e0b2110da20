//! Build one JSON Schema document from a set of models.
//!
//! Every retained model becomes a titled definition. Enums are added when a
//! retained model references them. Models that are referenced but were not
//! retained are inlined without a title, so the generator emits no
//! declaration for them.

use crate::inclusion::{DEFAULT_AGGREGATOR_NAME, ForcedInclusion, aggregate_root, unique_name};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use typebridge_models::{
    DefinitionCatalog, DefinitionId, EnumDefinition, ExtraFields, Field, FieldDefault, FieldType,
    SchemaSource,
};

/// A model, field and reason the schema could not be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot generate schema for `{model}{}`: {reason}", display_field(.field))]
pub struct SchemaGenerationError {
    pub model: String,
    pub field: Option<String>,
    pub reason: String,
}

fn display_field(field: &Option<String>) -> String {
    field.as_ref().map(|f| format!(".{}", f)).unwrap_or_default()
}

/// How `Optional[T]` fields are expressed.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullableStyle {
    /// `T | null`, required unless a default exists.
    #[default]
    Union,
    /// Drop the null variant and make the field optional (`field?: T`).
    Optional,
}

/// JSON Schema dialect of the document.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaDraft {
    #[default]
    #[serde(rename = "2020-12")]
    Draft2020,
    #[serde(rename = "07")]
    Draft07,
}

impl SchemaDraft {
    /// Key of the definitions map.
    pub fn defs_key(self) -> &'static str {
        match self {
            SchemaDraft::Draft2020 => "$defs",
            SchemaDraft::Draft07 => "definitions",
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            SchemaDraft::Draft2020 => "https://json-schema.org/draft/2020-12/schema",
            SchemaDraft::Draft07 => "http://json-schema.org/draft-07/schema#",
        }
    }

    /// `$ref` target of a named definition.
    pub fn reference(self, name: &str) -> String {
        format!("#/{}/{}", self.defs_key(), name)
    }
}

/// Options controlling schema synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub nullable: NullableStyle,
    pub draft: SchemaDraft,
    /// Convert property names to camelCase when no alias is set.
    pub to_camel: bool,
    /// Emit `additionalProperties: false` unless a model explicitly allows
    /// extra fields.
    pub forbid_unless_allowed: bool,
    pub inclusion: ForcedInclusion,
    /// Preferred aggregator title; made unique against definition names.
    pub aggregator_name: String,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            nullable: NullableStyle::default(),
            draft: SchemaDraft::default(),
            to_camel: false,
            forbid_unless_allowed: true,
            inclusion: ForcedInclusion::default(),
            aggregator_name: DEFAULT_AGGREGATOR_NAME.to_string(),
        }
    }
}

/// The interchange document handed to the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub draft: SchemaDraft,
    /// Root object (the aggregator).
    pub root: Map<String, Value>,
    /// Named definitions in output order.
    pub definitions: Map<String, Value>,
    pub forced_inclusion: ForcedInclusion,
    /// Title of the root object.
    pub aggregator: String,
}

impl SchemaDocument {
    /// Assemble the full JSON document.
    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("$schema".into(), json!(self.draft.uri()));
        doc.extend(self.root.clone());
        doc.insert(
            self.draft.defs_key().into(),
            Value::Object(self.definitions.clone()),
        );
        Value::Object(doc)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_value())
    }

    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }
}

/// Synthesize the schema document for `models`, resolving references
/// through `catalog`.
pub fn synthesize<S: SchemaSource>(
    models: &[&S],
    catalog: &dyn DefinitionCatalog,
    options: &SynthesisOptions,
) -> Result<SchemaDocument, SchemaGenerationError> {
    let mut synth = Synthesizer {
        catalog,
        options,
        owners: HashMap::new(),
        retained: HashMap::new(),
        models: Vec::new(),
        enums: Vec::new(),
        inline_stack: Vec::new(),
    };

    for model in models {
        synth.claim(model.name(), model.location(), model.name(), None)?;
        synth
            .retained
            .insert(model.location().clone(), model.name().to_string());
    }
    for model in models {
        let schema = synth.object_schema(*model, true)?;
        synth.models.push((model.name().to_string(), schema));
    }

    let Synthesizer {
        models: model_defs,
        enums: mut enum_defs,
        owners,
        ..
    } = synth;
    enum_defs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut definitions = Map::new();
    definitions.extend(model_defs);
    definitions.extend(enum_defs);

    let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
    let aggregator = unique_name(&options.aggregator_name, |n| owners.contains_key(n));
    let root = aggregate_root(&aggregator, &names, options.draft, options.inclusion);

    tracing::debug!(
        definitions = definitions.len(),
        aggregator = %aggregator,
        "synthesized schema"
    );

    Ok(SchemaDocument {
        draft: options.draft,
        root,
        definitions,
        forced_inclusion: options.inclusion,
        aggregator,
    })
}

struct Synthesizer<'a> {
    catalog: &'a dyn DefinitionCatalog,
    options: &'a SynthesisOptions,
    /// Definition name -> owning definition, across models and enums.
    owners: HashMap<String, DefinitionId>,
    /// Retained model id -> definition name.
    retained: HashMap<DefinitionId, String>,
    models: Vec<(String, Value)>,
    enums: Vec<(String, Value)>,
    /// Non-retained models currently being inlined.
    inline_stack: Vec<DefinitionId>,
}

struct Context<'c> {
    model: &'c str,
    field: &'c str,
}

impl Context<'_> {
    fn error(&self, reason: impl Into<String>) -> SchemaGenerationError {
        SchemaGenerationError {
            model: self.model.to_string(),
            field: Some(self.field.to_string()),
            reason: reason.into(),
        }
    }
}

impl Synthesizer<'_> {
    /// Reserve `name` for `id` in the definition namespace.
    fn claim(
        &mut self,
        name: &str,
        id: &DefinitionId,
        model: &str,
        field: Option<&str>,
    ) -> Result<(), SchemaGenerationError> {
        match self.owners.get(name) {
            Some(owner) if owner != id => Err(SchemaGenerationError {
                model: model.to_string(),
                field: field.map(str::to_string),
                reason: format!(
                    "definition name `{}` is used by both {} and {}",
                    name, owner, id
                ),
            }),
            Some(_) => Ok(()),
            None => {
                self.owners.insert(name.to_string(), id.clone());
                Ok(())
            }
        }
    }

    fn object_schema(
        &mut self,
        model: &dyn SchemaSource,
        titled: bool,
    ) -> Result<Value, SchemaGenerationError> {
        let mut schema = Map::new();
        if titled {
            schema.insert("title".into(), json!(model.name()));
        }
        if let Some(description) = model.description() {
            schema.insert("description".into(), json!(description));
        }
        schema.insert("type".into(), json!("object"));

        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in model.fields() {
            let ctx = Context {
                model: model.name(),
                field: &field.name,
            };
            let name = self.property_name(field);
            if self.is_required(field) {
                required.push(json!(name));
            }
            properties.insert(name, self.field_schema(field, &ctx)?);
        }
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }

        let additional = match model.extra_fields_policy() {
            Some(ExtraFields::Allow) => Some(true),
            Some(ExtraFields::Forbid) => Some(false),
            _ if self.options.forbid_unless_allowed => Some(false),
            _ => None,
        };
        if let Some(additional) = additional {
            schema.insert("additionalProperties".into(), json!(additional));
        }

        Ok(Value::Object(schema))
    }

    fn property_name(&self, field: &Field) -> String {
        match &field.alias {
            Some(alias) => alias.clone(),
            None if self.options.to_camel => to_camel(&field.name),
            None => field.name.clone(),
        }
    }

    fn is_required(&self, field: &Field) -> bool {
        if field.computed {
            return true;
        }
        match self.options.nullable {
            NullableStyle::Union => !field.has_default(),
            NullableStyle::Optional => !field.has_default() && !field.ty.is_optional(),
        }
    }

    fn field_schema(&mut self, field: &Field, ctx: &Context) -> Result<Value, SchemaGenerationError> {
        let (inner, nullable) = match &field.ty {
            FieldType::Optional(inner) => (inner.as_ref(), true),
            other => (other, false),
        };

        let mut schema = self.type_schema(inner, ctx)?;
        self.apply_constraints(&mut schema, field);
        if nullable && self.options.nullable == NullableStyle::Union {
            schema = json!({ "anyOf": [schema, { "type": "null" }] });
        }

        if let Some(description) = &field.description {
            self.annotate(&mut schema, "description", json!(description));
        }
        if let FieldDefault::Literal(value) = &field.default {
            self.annotate(&mut schema, "default", value.clone());
        }
        if field.computed {
            self.annotate(&mut schema, "readOnly", json!(true));
        }
        Ok(schema)
    }

    fn apply_constraints(&self, schema: &mut Value, field: &Field) {
        let constraints = &field.constraints;
        if constraints.is_empty() {
            return;
        }
        let is_string = schema.get("type") == Some(&json!("string"));
        let length_keys = if is_string {
            ("minLength", "maxLength")
        } else {
            ("minItems", "maxItems")
        };

        let entries = [
            ("minimum", constraints.minimum.clone()),
            ("exclusiveMinimum", constraints.exclusive_minimum.clone()),
            ("maximum", constraints.maximum.clone()),
            ("exclusiveMaximum", constraints.exclusive_maximum.clone()),
            (length_keys.0, constraints.min_length.map(Value::from)),
            (length_keys.1, constraints.max_length.map(Value::from)),
            ("pattern", constraints.pattern.clone().map(Value::from)),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                self.annotate(schema, key, value);
            }
        }
    }

    /// Add a keyword next to a schema. Draft-07 ignores siblings of `$ref`,
    /// so references are wrapped in `allOf` there.
    fn annotate(&self, schema: &mut Value, key: &str, value: Value) {
        let is_ref = schema.get("$ref").is_some();
        if is_ref && self.options.draft == SchemaDraft::Draft07 {
            *schema = json!({ "allOf": [schema.take()] });
        }
        if let Value::Object(map) = schema {
            map.insert(key.to_string(), value);
        }
    }

    fn type_schema(&mut self, ty: &FieldType, ctx: &Context) -> Result<Value, SchemaGenerationError> {
        let schema = match ty {
            FieldType::Any => json!({}),
            FieldType::Null => json!({ "type": "null" }),
            FieldType::Bool => json!({ "type": "boolean" }),
            FieldType::Int => json!({ "type": "integer" }),
            FieldType::Float => json!({ "type": "number" }),
            FieldType::Str | FieldType::Decimal => json!({ "type": "string" }),
            FieldType::Bytes => json!({ "type": "string", "format": "binary" }),
            FieldType::Formatted(format) => json!({ "type": "string", "format": format.as_str() }),
            FieldType::List(item) => json!({ "type": "array", "items": self.type_schema(item, ctx)? }),
            FieldType::Set(item) => json!({
                "type": "array",
                "items": self.type_schema(item, ctx)?,
                "uniqueItems": true
            }),
            FieldType::Tuple { items, variadic } => self.tuple_schema(items, *variadic, ctx)?,
            FieldType::Dict { key, value } => {
                if !is_string_key(key, self.catalog) {
                    return Err(ctx.error("dictionary keys must serialize to strings"));
                }
                let values = match value.as_ref() {
                    FieldType::Any => json!(true),
                    other => self.type_schema(other, ctx)?,
                };
                json!({ "type": "object", "additionalProperties": values })
            }
            FieldType::Optional(inner) => {
                json!({ "anyOf": [self.type_schema(inner, ctx)?, { "type": "null" }] })
            }
            FieldType::Union(members) => {
                let members = members
                    .iter()
                    .map(|m| self.type_schema(m, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                json!({ "anyOf": members })
            }
            FieldType::Literal(values) => {
                let mut schema = Map::new();
                schema.insert("enum".into(), json!(values));
                if let Some(ty) = json_type(values) {
                    schema.insert("type".into(), json!(ty));
                }
                Value::Object(schema)
            }
            FieldType::Ref(id) => self.reference(id, ctx)?,
            FieldType::Unresolved(name) => {
                return Err(ctx.error(format!(
                    "type `{}` cannot be expressed in JSON Schema",
                    name
                )));
            }
        };
        Ok(schema)
    }

    fn tuple_schema(
        &mut self,
        items: &[FieldType],
        variadic: bool,
        ctx: &Context,
    ) -> Result<Value, SchemaGenerationError> {
        if variadic {
            let item = match items.first() {
                Some(item) => self.type_schema(item, ctx)?,
                None => json!({}),
            };
            return Ok(json!({ "type": "array", "items": item }));
        }

        let schemas = items
            .iter()
            .map(|item| self.type_schema(item, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        let count = schemas.len();
        let key = match self.options.draft {
            SchemaDraft::Draft2020 => "prefixItems",
            SchemaDraft::Draft07 => "items",
        };

        let mut schema = Map::new();
        schema.insert("type".into(), json!("array"));
        schema.insert(key.into(), Value::Array(schemas));
        schema.insert("minItems".into(), json!(count));
        schema.insert("maxItems".into(), json!(count));
        Ok(Value::Object(schema))
    }

    fn reference(&mut self, id: &DefinitionId, ctx: &Context) -> Result<Value, SchemaGenerationError> {
        if let Some(name) = self.retained.get(id) {
            return Ok(json!({ "$ref": self.options.draft.reference(name) }));
        }

        let catalog = self.catalog;
        if let Some(enumeration) = catalog.enumeration(id) {
            let name = enumeration.name.clone();
            self.claim(&name, id, ctx.model, Some(ctx.field))?;
            if !self.enums.iter().any(|(n, _)| *n == name) {
                self.enums.push((name.clone(), enum_schema(enumeration)));
            }
            return Ok(json!({ "$ref": self.options.draft.reference(&name) }));
        }

        let Some(model) = catalog.model(id) else {
            return Err(ctx.error(format!("reference to unknown definition {}", id)));
        };
        if self.inline_stack.contains(id) {
            return Err(ctx.error(format!(
                "excluded model `{}` references itself and cannot be inlined",
                model.name()
            )));
        }

        tracing::debug!(model = %model.name(), "inlining excluded model");
        self.inline_stack.push(id.clone());
        let schema = self.object_schema(model, false);
        self.inline_stack.pop();
        schema
    }
}

fn enum_schema(enumeration: &EnumDefinition) -> Value {
    let mut schema = Map::new();
    schema.insert("title".into(), json!(enumeration.name));
    if let Some(docs) = &enumeration.docs {
        schema.insert("description".into(), json!(docs));
    }
    schema.insert("enum".into(), json!(enumeration.values));
    if let Some(ty) = json_type(&enumeration.values) {
        schema.insert("type".into(), json!(ty));
    }
    Value::Object(schema)
}

/// Common JSON type of literal values, if they share one.
fn json_type(values: &[Value]) -> Option<&'static str> {
    let kind = |v: &Value| match v {
        Value::String(_) => Some("string"),
        Value::Bool(_) => Some("boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("number"),
        _ => None,
    };
    let first = kind(values.first()?)?;
    values.iter().all(|v| kind(v) == Some(first)).then_some(first)
}

/// Scalars and enums become JSON object keys; containers and models
/// cannot.
fn is_string_key(key: &FieldType, catalog: &dyn DefinitionCatalog) -> bool {
    match key {
        FieldType::Any
        | FieldType::Bool
        | FieldType::Int
        | FieldType::Float
        | FieldType::Str
        | FieldType::Bytes
        | FieldType::Decimal
        | FieldType::Formatted(_)
        | FieldType::Literal(_) => true,
        FieldType::Union(members) => members.iter().all(|m| is_string_key(m, catalog)),
        FieldType::Ref(id) => catalog.enumeration(id).is_some(),
        _ => false,
    }
}

/// `snake_case` to `camelCase`; leading underscores are kept.
pub fn to_camel(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    let prefix = &name[..name.len() - trimmed.len()];

    let mut out = String::from(prefix);
    let mut upper = false;
    for (i, c) in trimmed.chars().enumerate() {
        if c == '_' {
            upper = i > 0;
            continue;
        }
        if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use typebridge_models::{EnumDefinition, LocatedDefinitions, ModelDefinition, StringFormat};

    fn model(name: &str, fields: Vec<Field>) -> ModelDefinition {
        ModelDefinition {
            id: DefinitionId::new("/src/app.py", name),
            name: name.to_string(),
            qualname: format!("app.{}", name),
            docs: None,
            fields,
            extra: None,
        }
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(to_camel("first_name"), "firstName");
        assert_eq!(to_camel("url_of_x"), "urlOfX");
        assert_eq!(to_camel("_private_thing"), "_privateThing");
        assert_eq!(to_camel("plain"), "plain");
    }

    #[test]
    fn literal_json_type() {
        assert_eq!(json_type(&[json!("a"), json!("b")]), Some("string"));
        assert_eq!(json_type(&[json!(1), json!(2)]), Some("integer"));
        assert_eq!(json_type(&[json!(1), json!("b")]), None);
    }

    #[test]
    fn unresolved_type_names_model_and_field() {
        let broken = model(
            "Grid",
            vec![Field::required(
                "cells",
                FieldType::Unresolved("numpy.ndarray".into()),
            )],
        );
        let catalog = LocatedDefinitions {
            models: vec![broken.clone()],
            ..Default::default()
        };
        let err = synthesize(&[&broken], &catalog, &SynthesisOptions::default()).unwrap_err();
        assert_eq!(err.model, "Grid");
        assert_eq!(err.field.as_deref(), Some("cells"));
        assert!(err.to_string().contains("Grid.cells"));
    }

    #[test]
    fn enum_and_model_name_clash() {
        let status_enum = EnumDefinition {
            id: DefinitionId::new("/src/enums.py", "Status"),
            name: "Status".into(),
            qualname: "enums.Status".into(),
            docs: None,
            values: vec![json!("on")],
        };
        let status_model = model("Status", vec![Field::required("x", FieldType::Int)]);
        let holder = model(
            "Holder",
            vec![Field::required("s", FieldType::Ref(status_enum.id.clone()))],
        );
        let catalog = LocatedDefinitions {
            models: vec![holder.clone(), status_model.clone()],
            enums: vec![status_enum],
            ..Default::default()
        };
        let err = synthesize(
            &[&holder, &status_model],
            &catalog,
            &SynthesisOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.model, "Holder");
        assert!(err.reason.contains("`Status`"));
    }

    #[test]
    fn scalar_dict_keys_become_object_keys() {
        let dict = |key: FieldType| FieldType::Dict {
            key: Box::new(key),
            value: Box::new(FieldType::Float),
        };
        let scores = model(
            "Scores",
            vec![
                Field::required("by_id", dict(FieldType::Int)),
                Field::required("by_uuid", dict(FieldType::Formatted(StringFormat::Uuid))),
                Field::required("by_flag", dict(FieldType::Bool)),
            ],
        );
        let catalog = LocatedDefinitions {
            models: vec![scores.clone()],
            ..Default::default()
        };
        let doc = synthesize(&[&scores], &catalog, &SynthesisOptions::default()).unwrap();
        let properties = &doc.definition("Scores").unwrap()["properties"];
        for name in ["by_id", "by_uuid", "by_flag"] {
            assert_eq!(
                properties[name],
                json!({ "type": "object", "additionalProperties": { "type": "number" } }),
                "{name}"
            );
        }
    }

    #[test]
    fn container_and_model_dict_keys_fail() {
        let key = model("Key", vec![]);
        let bad = |name: &str, ty: FieldType| {
            model(
                "Index",
                vec![Field::required(
                    name,
                    FieldType::Dict {
                        key: Box::new(ty),
                        value: Box::new(FieldType::Int),
                    },
                )],
            )
        };
        for index in [
            bad(
                "by_pair",
                FieldType::Tuple {
                    items: vec![FieldType::Int, FieldType::Int],
                    variadic: false,
                },
            ),
            bad("by_key", FieldType::Ref(key.id.clone())),
        ] {
            let catalog = LocatedDefinitions {
                models: vec![index.clone(), key.clone()],
                ..Default::default()
            };
            let err = synthesize(&[&index], &catalog, &SynthesisOptions::default()).unwrap_err();
            assert_eq!(err.reason, "dictionary keys must serialize to strings");
        }
    }

    #[test]
    fn draft07_wraps_annotated_refs() {
        let child = model("Child", vec![]);
        let mut field = Field::required("child", FieldType::Ref(child.id.clone()));
        field.description = Some("The child".into());
        let parent = model("Parent", vec![field]);
        let catalog = LocatedDefinitions {
            models: vec![parent.clone(), child.clone()],
            ..Default::default()
        };
        let options = SynthesisOptions {
            draft: SchemaDraft::Draft07,
            ..Default::default()
        };
        let doc = synthesize(&[&child, &parent], &catalog, &options).unwrap();
        assert_eq!(
            doc.definition("Parent").unwrap()["properties"]["child"],
            json!({
                "allOf": [{ "$ref": "#/definitions/Child" }],
                "description": "The child"
            })
        );
    }
}
