//! Exclusion, deduplication and ordering of located models.

use crate::ir::{DefinitionId, ModelDefinition};
use std::collections::BTreeMap;

/// Two distinct definitions share a name and would produce conflicting
/// declarations.
#[derive(Debug, thiserror::Error)]
#[error(
    "multiple models named `{name}`: {}; rename one or exclude it",
    display_locations(.locations)
)]
pub struct NameCollisionError {
    pub name: String,
    pub locations: Vec<DefinitionId>,
}

fn display_locations(locations: &[DefinitionId]) -> String {
    locations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Drop excluded models, collapse duplicates of one definition, and order
/// the rest by name.
///
/// A model is excluded when its name or its qualified name appears in
/// `excluded`.
pub fn reduce<'m>(
    models: impl IntoIterator<Item = &'m ModelDefinition>,
    excluded: &[String],
) -> Result<Vec<&'m ModelDefinition>, NameCollisionError> {
    let mut groups: BTreeMap<&str, Vec<&'m ModelDefinition>> = BTreeMap::new();

    for model in models {
        if excluded
            .iter()
            .any(|name| *name == model.name || *name == model.qualname)
        {
            tracing::debug!(model = %model.qualname, "excluded");
            continue;
        }
        let group = groups.entry(model.name.as_str()).or_default();
        if !group.iter().any(|m| m.id == model.id) {
            group.push(model);
        }
    }

    let mut reduced = Vec::with_capacity(groups.len());
    for (name, group) in groups {
        if group.len() > 1 {
            let mut locations: Vec<DefinitionId> = group.iter().map(|m| m.id.clone()).collect();
            locations.sort();
            return Err(NameCollisionError {
                name: name.to_string(),
                locations,
            });
        }
        reduced.extend(group);
    }

    reduced.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.qualname.cmp(&b.qualname)));
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, FieldType};

    fn model(module: &str, name: &str) -> ModelDefinition {
        ModelDefinition {
            id: DefinitionId::new(format!("/src/{}.py", module), name),
            name: name.to_string(),
            qualname: format!("{}.{}", module, name),
            docs: None,
            fields: vec![Field::required("id", FieldType::Int)],
            extra: None,
        }
    }

    #[test]
    fn orders_by_name() {
        let models = [model("a", "Zebra"), model("a", "Apple"), model("b", "Mango")];
        let names: Vec<&str> = reduce(&models, &[])
            .unwrap()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, ["Apple", "Mango", "Zebra"]);
    }

    #[test]
    fn same_definition_collapses() {
        let models = [model("a", "User"), model("a", "User")];
        assert_eq!(reduce(&models, &[]).unwrap().len(), 1);
    }

    #[test]
    fn distinct_definitions_collide() {
        let models = [model("a", "User"), model("b", "User")];
        let err = reduce(&models, &[]).unwrap_err();
        assert_eq!(err.name, "User");
        assert_eq!(err.locations.len(), 2);
        assert!(err.to_string().contains("multiple models named `User`"));
    }

    #[test]
    fn excludes_by_name_or_qualname() {
        let models = [model("a", "User"), model("b", "User"), model("a", "Team")];
        let kept: Vec<&str> = reduce(&models, &["b.User".to_string(), "Team".to_string()])
            .unwrap()
            .iter()
            .map(|m| m.qualname.as_str())
            .collect();
        assert_eq!(kept, ["a.User"]);
    }
}
