//! End-to-end pipeline runs with an in-process generator.

use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use typebridge::{BANNER, Error, GenerateOptions, generate, generate_with, write_output};
use typebridge_schema::{NullableStyle, SchemaDocument};
use typebridge_tools::{Generator, GeneratorInfo, RenderInvocationError};

const FAKE_INFO: GeneratorInfo = GeneratorInfo {
    name: "fake",
    install: "nothing to install",
};

/// Renders one declaration per schema object, roughly the way json2ts lays
/// them out, and keeps every document it was given.
#[derive(Default)]
struct FakeGenerator {
    seen: RefCell<Vec<Value>>,
    omit_root: bool,
}

impl FakeGenerator {
    fn calls(&self) -> usize {
        self.seen.borrow().len()
    }

    fn last(&self) -> Value {
        self.seen.borrow().last().cloned().unwrap()
    }
}

fn interface(name: &str, schema: &Value) -> String {
    let mut out = format!("export interface {} {{\n", name);
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if let Some(props) = schema["properties"].as_object() {
        for (prop, value) in props {
            let optional = if required.contains(&prop.as_str()) { "" } else { "?" };
            let ty = match value.get("$ref").and_then(Value::as_str) {
                Some(target) => target.rsplit('/').next().unwrap_or("unknown").to_string(),
                None => "unknown".to_string(),
            };
            out.push_str(&format!("  {}{}: {};\n", prop, optional, ty));
        }
    }
    out.push_str("}\n");
    out
}

impl Generator for FakeGenerator {
    fn info(&self) -> &GeneratorInfo {
        &FAKE_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn check(&self) -> Result<(), RenderInvocationError> {
        Ok(())
    }

    fn render(&self, doc: &SchemaDocument) -> Result<String, RenderInvocationError> {
        self.seen.borrow_mut().push(doc.to_value());

        let mut out = String::new();
        if !self.omit_root {
            out.push_str(&interface(&doc.aggregator, &Value::Object(doc.root.clone())));
            out.push('\n');
        }
        for (name, schema) in &doc.definitions {
            match schema.get("enum").and_then(Value::as_array) {
                Some(values) => {
                    let members: Vec<String> = values.iter().map(Value::to_string).collect();
                    out.push_str(&format!("export type {} = {};\n", name, members.join(" | ")));
                }
                None => out.push_str(&interface(name, schema)),
            }
        }
        Ok(out)
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn options(root: &TempDir, module: &str) -> GenerateOptions {
    let mut options = GenerateOptions::new(module);
    options.roots.push(root.path().to_path_buf());
    options
}

fn sports_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "league/__init__.py",
        "from .models import Athlete, Team\n",
    );
    write(
        dir.path(),
        "league/models.py",
        r#"from enum import Enum
from typing import List

from pydantic import BaseModel, Extra


class NoUnspecifiedProps:
    extra = Extra.forbid


class Sport(str, Enum):
    football = 'football'
    basketball = 'basketball'


class Athlete(BaseModel):
    name: str
    sports: List[Sport]
    Config = NoUnspecifiedProps


class Team(BaseModel):
    name: str
    sport: Sport
    captain: Athlete
    Config = NoUnspecifiedProps
"#,
    );
    dir
}

#[test]
fn athletes_and_teams_end_to_end() {
    let dir = sports_tree();
    let generator = FakeGenerator::default();

    let doc = generate_with(&generator, &options(&dir, "league")).unwrap();

    assert!(doc.as_str().starts_with(BANNER));
    insta::assert_snapshot!(doc.declarations().trim_end(), @r#"
    export interface Athlete {
      name: unknown;
      sports: unknown;
    }
    export interface Team {
      name: unknown;
      sport: Sport;
      captain: Athlete;
    }
    export type Sport = "football" | "basketball";
    "#);

    let schema = generator.last();
    assert_eq!(schema["title"], "_Aggregate_");
    assert_eq!(schema["$defs"]["Team"]["additionalProperties"], false);
}

#[test]
fn runs_are_deterministic() {
    let dir = sports_tree();
    let generator = FakeGenerator::default();
    let first = generate_with(&generator, &options(&dir, "league")).unwrap();
    let second = generate_with(&generator, &options(&dir, "league")).unwrap();
    assert_eq!(first, second);
    assert_eq!(generator.calls(), 2);
}

#[test]
fn excluded_model_has_no_declaration() {
    let dir = sports_tree();
    let generator = FakeGenerator::default();
    let mut options = options(&dir, "league");
    options.exclude.push("league.models.Athlete".into());

    let doc = generate_with(&generator, &options).unwrap();
    assert!(!doc.declarations().contains("interface Athlete"));
    assert!(doc.declarations().contains("export interface Team"));

    let schema = generator.last();
    assert!(schema["$defs"].get("Athlete").is_none());
    assert_eq!(
        schema["$defs"]["Team"]["properties"]["captain"]["type"],
        "object"
    );
}

#[test]
fn no_models_gives_banner_only() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "empty.py", "X = 1\n\nclass Plain:\n    pass\n");
    let generator = FakeGenerator::default();

    let doc = generate_with(&generator, &options(&dir, "empty")).unwrap();
    assert_eq!(doc.as_str(), BANNER);
    assert_eq!(generator.calls(), 0);
}

#[test]
fn single_model_keeps_only_its_declaration() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "one.py",
        "from pydantic import BaseModel\n\nclass Only(BaseModel):\n    x: int\n",
    );

    let doc = generate_with(&FakeGenerator::default(), &options(&dir, "one")).unwrap();
    assert_eq!(
        doc.declarations(),
        "export interface Only {\n  x: unknown;\n}\n"
    );
}

#[test]
fn optional_style_drops_required_marker() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "opt.py",
        "from typing import Optional\nfrom pydantic import BaseModel\n\nclass Foo(BaseModel):\n    required: str\n    optional: Optional[str]\n",
    );

    let union = generate_with(&FakeGenerator::default(), &options(&dir, "opt")).unwrap();
    assert!(union.declarations().contains("  optional: unknown;"));

    let mut opts = options(&dir, "opt");
    opts.synthesis.nullable = NullableStyle::Optional;
    let optional = generate_with(&FakeGenerator::default(), &opts).unwrap();
    assert!(optional.declarations().contains("  optional?: unknown;"));
}

#[test]
fn duplicate_names_abort() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(
        dir.path(),
        "pkg/a.py",
        "from pydantic import BaseModel\n\nclass Item(BaseModel):\n    x: int\n",
    );
    write(
        dir.path(),
        "pkg/b.py",
        "from pydantic import BaseModel\n\nclass Item(BaseModel):\n    y: str\n",
    );
    let generator = FakeGenerator::default();

    let err = generate_with(&generator, &options(&dir, "pkg")).unwrap_err();
    assert!(matches!(err, Error::NameCollision(_)), "{:?}", err);
    assert_eq!(generator.calls(), 0);
}

#[test]
fn generator_without_aggregator_fails() {
    let dir = sports_tree();
    let generator = FakeGenerator {
        omit_root: true,
        ..Default::default()
    };
    let err = generate_with(&generator, &options(&dir, "league")).unwrap_err();
    assert!(matches!(err, Error::Finalize(_)), "{:?}", err);
}

#[test]
fn missing_tool_fails_before_discovery() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.ts");
    let mut options = options(&dir, "does.not.exist");
    options.json2ts_cmd = dir.path().join("json2ts").display().to_string();

    let err = generate(&options).unwrap_err();
    assert!(
        matches!(err, Error::Render(RenderInvocationError::NotInstalled { .. })),
        "{:?}",
        err
    );
    assert!(!output.exists());
}

#[test]
fn write_output_saves_text() {
    let dir = sports_tree();
    let doc = generate_with(&FakeGenerator::default(), &options(&dir, "league")).unwrap();
    let path = dir.path().join("apiTypes.ts");
    write_output(&path, &doc).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), doc.as_str());
}
