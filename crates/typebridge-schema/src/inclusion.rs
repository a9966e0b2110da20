//! Forced inclusion of every retained model in the rendered output.
//!
//! Generators only emit declarations reachable from the root schema. The
//! default strategy makes every retained model reachable through a
//! synthetic aggregator object that the post-processor later strips.

use crate::synthesize::SchemaDraft;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Default title of the synthetic root object.
pub const DEFAULT_AGGREGATOR_NAME: &str = "_Aggregate_";

/// How retained models are made visible to the generator.
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForcedInclusion {
    /// Root object with one required reference per retained model.
    #[default]
    Aggregator,
    /// Empty root; the generator is asked to emit unreachable definitions.
    Unreachable,
}

impl ForcedInclusion {
    /// Whether the rendered output must contain the aggregator declaration.
    pub fn expects_aggregator(self) -> bool {
        matches!(self, ForcedInclusion::Aggregator)
    }
}

/// First of `preferred`, `preferred1`, `preferred2`, ... not already taken.
pub fn unique_name(preferred: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(preferred) {
        return preferred.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", preferred, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| preferred.to_string())
}

/// Build the root object for `inclusion`.
pub fn aggregate_root(
    name: &str,
    models: &[&str],
    draft: SchemaDraft,
    inclusion: ForcedInclusion,
) -> Map<String, Value> {
    let mut root = Map::new();
    root.insert("title".into(), json!(name));
    root.insert("type".into(), json!("object"));

    if inclusion == ForcedInclusion::Aggregator {
        let properties: Map<String, Value> = models
            .iter()
            .map(|model| (model.to_string(), json!({ "$ref": draft.reference(model) })))
            .collect();
        root.insert("properties".into(), Value::Object(properties));
        if !models.is_empty() {
            root.insert("required".into(), json!(models));
        }
    }

    root.insert("additionalProperties".into(), json!(false));
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_name_appends_counter() {
        assert_eq!(unique_name("_Aggregate_", |_| false), "_Aggregate_");
        assert_eq!(
            unique_name("_Aggregate_", |n| n == "_Aggregate_" || n == "_Aggregate_1"),
            "_Aggregate_2"
        );
    }

    #[test]
    fn aggregator_references_every_model() {
        let root = aggregate_root(
            "_Aggregate_",
            &["Athlete", "Team"],
            SchemaDraft::Draft2020,
            ForcedInclusion::Aggregator,
        );
        assert_eq!(
            Value::Object(root),
            json!({
                "title": "_Aggregate_",
                "type": "object",
                "properties": {
                    "Athlete": { "$ref": "#/$defs/Athlete" },
                    "Team": { "$ref": "#/$defs/Team" }
                },
                "required": ["Athlete", "Team"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn unreachable_root_is_empty() {
        let root = aggregate_root(
            "_Aggregate_",
            &["Athlete"],
            SchemaDraft::Draft07,
            ForcedInclusion::Unreachable,
        );
        assert!(!root.contains_key("properties"));
        assert_eq!(root["title"], json!("_Aggregate_"));
    }
}
