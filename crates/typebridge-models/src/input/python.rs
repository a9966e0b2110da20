//! Tree-sitter based Python module reader.
//!
//! Extracts imports, classes and module-level aliases. Statements nested in
//! module-level `try` and `if` blocks are included, since that is where
//! version-compatibility imports usually live.

use super::annotation::{parse_type, type_expr};
use crate::syntax::{
    Attribute, ClassDecl, ComputedDecl, Expr, ImportDecl, ImportedName, ModuleSyntax, TypeExpr,
};
use crate::traits::{ModuleReader, ReadError};
use serde_json::Value;
use tree_sitter::{Node, Parser, Tree};

/// Static instance of the Python reader.
pub static PYTHON_READER: PythonReader = PythonReader;

/// Python reader using tree-sitter.
pub struct PythonReader;

impl ModuleReader for PythonReader {
    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn package_marker(&self) -> &'static str {
        "__init__"
    }

    fn read(&self, source: &str) -> Result<ModuleSyntax, ReadError> {
        read_python(source)
    }

    fn parse_type(&self, text: &str) -> Result<TypeExpr, ReadError> {
        parse_type(text)
    }
}

pub(crate) fn parse_tree(source: &str) -> Result<Tree, ReadError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_python::language().into())
        .map_err(|err| ReadError::Parse(err.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ReadError::Parse("failed to parse".into()))
}

/// Parse Python source into module declarations.
pub fn read_python(source: &str) -> Result<ModuleSyntax, ReadError> {
    let tree = parse_tree(source)?;
    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(ReadError::Syntax(format!("invalid syntax near line {}", line)));
    }

    let ctx = ReadContext::new(source);
    let mut module = ModuleSyntax::default();
    ctx.read_statements(root, &mut module);
    Ok(module)
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error_line)
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// Expressions of a simple statement.
///
/// Handle both grammar versions:
/// - Old: expression_statement > assignment / string
/// - New (arborium): assignment / string directly in the block
fn statement_expressions<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    match node.kind() {
        "expression_statement" => named_children(node),
        "assignment" | "string" | "concatenated_string" => vec![node],
        _ => Vec::new(),
    }
}

struct ReadContext<'a> {
    source: &'a str,
}

impl<'a> ReadContext<'a> {
    fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Read the statements of a module or block, descending into
    /// `try`/`if` compound statements.
    fn read_statements(&self, node: Node, module: &mut ModuleSyntax) {
        for child in named_children(node) {
            match child.kind() {
                "import_statement" => self.read_import(child, module),
                "import_from_statement" => self.read_import_from(child, module),
                "class_definition" => module.classes.push(self.read_class(child)),
                "decorated_definition" => {
                    if let Some(def) = child.child_by_field_name("definition")
                        && def.kind() == "class_definition"
                    {
                        module.classes.push(self.read_class(def));
                    }
                }
                "expression_statement" | "assignment" => {
                    for expr in statement_expressions(child) {
                        if expr.kind() == "assignment"
                            && let Some((name, value)) = self.read_plain_assignment(expr)
                        {
                            module.aliases.push((name, value));
                        }
                    }
                }
                "try_statement" | "if_statement" | "block" | "else_clause" | "elif_clause"
                | "except_clause" | "except_group_clause" | "finally_clause" => {
                    self.read_statements(child, module)
                }
                _ => {}
            }
        }
    }

    fn read_import(&self, node: Node, module: &mut ModuleSyntax) {
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let decl = match name.kind() {
                "aliased_import" => ImportDecl::Module {
                    path: name
                        .child_by_field_name("name")
                        .map(|n| self.node_text(n).to_string())
                        .unwrap_or_default(),
                    alias: name
                        .child_by_field_name("alias")
                        .map(|n| self.node_text(n).to_string()),
                },
                _ => ImportDecl::Module {
                    path: self.node_text(name).to_string(),
                    alias: None,
                },
            };
            module.imports.push(decl);
        }
    }

    fn read_import_from(&self, node: Node, module: &mut ModuleSyntax) {
        let Some(module_name) = node.child_by_field_name("module_name") else {
            return;
        };

        let (level, path) = if module_name.kind() == "relative_import" {
            let mut level = 0;
            let mut path = None;
            for part in named_children(module_name) {
                match part.kind() {
                    "import_prefix" => level = self.node_text(part).matches('.').count(),
                    "dotted_name" => path = Some(self.node_text(part).to_string()),
                    _ => {}
                }
            }
            (level, path)
        } else {
            (0, Some(self.node_text(module_name).to_string()))
        };

        let mut names = Vec::new();
        let mut cursor = node.walk();
        let name_nodes: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name in name_nodes {
            if name.kind() == "aliased_import" {
                names.push(ImportedName {
                    name: name
                        .child_by_field_name("name")
                        .map(|n| self.node_text(n).to_string())
                        .unwrap_or_default(),
                    alias: name
                        .child_by_field_name("alias")
                        .map(|n| self.node_text(n).to_string()),
                });
            } else {
                names.push(ImportedName {
                    name: self.node_text(name).to_string(),
                    alias: None,
                });
            }
        }

        let star = named_children(node)
            .iter()
            .any(|c| c.kind() == "wildcard_import");

        module.imports.push(ImportDecl::From {
            level,
            module: path,
            names,
            star,
        });
    }

    fn read_class(&self, node: Node) -> ClassDecl {
        let mut class = ClassDecl {
            name: node
                .child_by_field_name("name")
                .map(|n| self.node_text(n).to_string())
                .unwrap_or_default(),
            ..Default::default()
        };

        if let Some(args) = node.child_by_field_name("superclasses") {
            for arg in named_children(args) {
                if arg.kind() == "keyword_argument" {
                    if let Some((key, value)) = self.read_keyword(arg) {
                        class.keywords.push((key, value));
                    }
                } else {
                    class.bases.push(self.read_expr(arg));
                }
            }
        }

        let Some(body) = node.child_by_field_name("body") else {
            return class;
        };

        class.docstring = self.read_docstring(body);

        for stmt in named_children(body) {
            match stmt.kind() {
                "expression_statement" | "assignment" => {
                    for expr in statement_expressions(stmt) {
                        if expr.kind() != "assignment" {
                            continue;
                        }
                        if let Some(attr) = self.read_annotated(expr) {
                            class.attributes.push(attr);
                        } else if let Some(assignment) = self.read_plain_assignment(expr) {
                            class.assignments.push(assignment);
                        }
                    }
                }
                "class_definition" => {
                    let nested = self.read_class(stmt);
                    if nested.name == "Config" {
                        class.config = Some(nested.assignments);
                    }
                }
                "decorated_definition" => {
                    if let Some(computed) = self.read_computed(stmt) {
                        class.computed.push(computed);
                    }
                }
                _ => {}
            }
        }

        class
    }

    fn read_docstring(&self, body: Node) -> Option<String> {
        let first = named_children(body).into_iter().next()?;
        let expr = statement_expressions(first).into_iter().next()?;
        match self.read_expr(expr) {
            Expr::Literal(Value::String(s)) => Some(clean_docstring(&s)).filter(|d| !d.is_empty()),
            _ => None,
        }
    }

    /// `name: annotation [= value]` with a simple identifier target.
    fn read_annotated(&self, node: Node) -> Option<Attribute> {
        let left = node.child_by_field_name("left")?;
        let annotation = node.child_by_field_name("type")?;
        if left.kind() != "identifier" {
            return None;
        }
        Some(Attribute {
            name: self.node_text(left).to_string(),
            annotation: type_expr(annotation, self.source),
            value: node
                .child_by_field_name("right")
                .map(|right| self.read_expr(right)),
        })
    }

    /// `name = value` without annotation.
    fn read_plain_assignment(&self, node: Node) -> Option<(String, Expr)> {
        if node.child_by_field_name("type").is_some() {
            return None;
        }
        let left = node.child_by_field_name("left")?;
        let right = node.child_by_field_name("right")?;
        if left.kind() != "identifier" {
            return None;
        }
        Some((self.node_text(left).to_string(), self.read_expr(right)))
    }

    fn read_computed(&self, node: Node) -> Option<ComputedDecl> {
        let def = node.child_by_field_name("definition")?;
        if def.kind() != "function_definition" {
            return None;
        }

        let mut options = None;
        for decorator in named_children(node) {
            if decorator.kind() != "decorator" {
                continue;
            }
            let Some(expr) = named_children(decorator).into_iter().next() else {
                continue;
            };
            match self.read_expr(expr) {
                Expr::Name(name) if name.rsplit('.').next() == Some("computed_field") => {
                    options = Some(Vec::new());
                }
                Expr::Call { func, kwargs, .. }
                    if func.rsplit('.').next() == Some("computed_field") =>
                {
                    options = Some(kwargs);
                }
                _ => {}
            }
        }

        Some(ComputedDecl {
            name: def
                .child_by_field_name("name")
                .map(|n| self.node_text(n).to_string())?,
            returns: def
                .child_by_field_name("return_type")
                .map(|n| type_expr(n, self.source)),
            docstring: def
                .child_by_field_name("body")
                .and_then(|body| self.read_docstring(body)),
            options: options?,
        })
    }

    fn read_keyword(&self, node: Node) -> Option<(String, Expr)> {
        let name = node.child_by_field_name("name")?;
        let value = node.child_by_field_name("value")?;
        Some((self.node_text(name).to_string(), self.read_expr(value)))
    }

    fn read_expr(&self, node: Node) -> Expr {
        let text = self.node_text(node);
        match node.kind() {
            "identifier" | "attribute" | "dotted_name" => Expr::Name(compact(text)),
            "string" => match parse_string_literal(text) {
                Some(s) => Expr::Literal(Value::String(s)),
                None => Expr::Other(text.to_string()),
            },
            "concatenated_string" => {
                let mut joined = String::new();
                for part in named_children(node) {
                    match parse_string_literal(self.node_text(part)) {
                        Some(s) => joined.push_str(&s),
                        None => return Expr::Other(text.to_string()),
                    }
                }
                Expr::Literal(Value::String(joined))
            }
            "integer" => parse_int(text)
                .map(|i| Expr::Literal(Value::from(i)))
                .unwrap_or_else(|| Expr::Other(text.to_string())),
            "float" => text
                .replace('_', "")
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(|n| Expr::Literal(Value::Number(n)))
                .unwrap_or_else(|| Expr::Other(text.to_string())),
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            "none" => Expr::Literal(Value::Null),
            "ellipsis" => Expr::Ellipsis,
            "unary_operator" => self.read_unary(node, text),
            "parenthesized_expression" => match named_children(node).into_iter().next() {
                Some(inner) => self.read_expr(inner),
                None => Expr::Other(text.to_string()),
            },
            "list" | "set" => Expr::List(
                named_children(node)
                    .into_iter()
                    .map(|n| self.read_expr(n))
                    .collect(),
            ),
            "tuple" => Expr::Tuple(
                named_children(node)
                    .into_iter()
                    .map(|n| self.read_expr(n))
                    .collect(),
            ),
            "dictionary" => {
                let mut pairs = Vec::new();
                for pair in named_children(node) {
                    let (Some(key), Some(value)) = (
                        pair.child_by_field_name("key"),
                        pair.child_by_field_name("value"),
                    ) else {
                        return Expr::Other(text.to_string());
                    };
                    pairs.push((self.read_expr(key), self.read_expr(value)));
                }
                Expr::Dict(pairs)
            }
            "call" => self.read_call(node, text),
            "subscript" | "generic_type" => Expr::Type(type_expr(node, self.source)),
            "binary_operator" => match type_expr(node, self.source) {
                union @ TypeExpr::Union(_) => Expr::Type(union),
                _ => Expr::Other(text.to_string()),
            },
            _ => Expr::Other(text.to_string()),
        }
    }

    fn read_unary(&self, node: Node, text: &str) -> Expr {
        let operator = node
            .child_by_field_name("operator")
            .map(|op| self.node_text(op));
        let argument = node
            .child_by_field_name("argument")
            .map(|arg| self.read_expr(arg));
        match (operator, argument) {
            (Some("-"), Some(Expr::Literal(Value::Number(n)))) => {
                if let Some(i) = n.as_i64() {
                    Expr::Literal(Value::from(-i))
                } else if let Some(f) = n.as_f64().and_then(|f| serde_json::Number::from_f64(-f)) {
                    Expr::Literal(Value::Number(f))
                } else {
                    Expr::Other(text.to_string())
                }
            }
            (Some("+"), Some(literal @ Expr::Literal(Value::Number(_)))) => literal,
            _ => Expr::Other(text.to_string()),
        }
    }

    fn read_call(&self, node: Node, text: &str) -> Expr {
        let Some(function) = node.child_by_field_name("function") else {
            return Expr::Other(text.to_string());
        };
        let func = match function.kind() {
            "identifier" | "attribute" => compact(self.node_text(function)),
            _ => return Expr::Other(text.to_string()),
        };

        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for arg in named_children(arguments) {
                if arg.kind() == "keyword_argument" {
                    if let Some(kw) = self.read_keyword(arg) {
                        kwargs.push(kw);
                    }
                } else {
                    args.push(self.read_expr(arg));
                }
            }
        }
        Expr::Call { func, args, kwargs }
    }
}

/// Remove whitespace inside dotted names (`a . b` -> `a.b`).
fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn parse_int(text: &str) -> Option<i64> {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        lower.parse().ok()
    }
}

/// Decode a Python string literal. Byte and f-strings are not constants.
pub(crate) fn parse_string_literal(text: &str) -> Option<String> {
    let prefix_len = text
        .find(|c: char| c == '"' || c == '\'')
        .filter(|&i| i <= 2)?;
    let prefix = text[..prefix_len].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }
    let raw = prefix.contains('r');
    let body = &text[prefix_len..];

    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find(|q| body.len() >= 2 * q.len() && body.starts_with(**q) && body.ends_with(**q))
        .map(|q| &body[q.len()..body.len() - q.len()])?;

    if raw {
        Some(inner.to_string())
    } else {
        Some(unescape(inner))
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some('x') => push_code_point(&mut out, &mut chars, 2),
            Some('u') => push_code_point(&mut out, &mut chars, 4),
            Some('U') => push_code_point(&mut out, &mut chars, 8),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: usize,
) {
    let hex: String = (0..digits).filter_map(|_| chars.next()).collect();
    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push_str(&hex),
    }
}

/// Normalize docstring indentation the way `inspect.cleandoc` does.
/// Indentation is counted in characters.
pub fn clean_docstring(doc: &str) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first.trim().to_string()];
    for line in rest {
        cleaned.push(strip_indent(line, indent).trim_end().to_string());
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

/// Drop up to `indent` leading whitespace characters.
fn strip_indent(line: &str, indent: usize) -> &str {
    let start = line
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .take(indent)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_from_imports() {
        let module = read_python(
            "from pydantic import BaseModel, Field as F\nfrom ..animals.cats import Cat\nfrom . import dogs\nimport typing as t\n",
        )
        .unwrap();

        assert_eq!(module.imports.len(), 4);
        assert_eq!(
            module.imports[0],
            ImportDecl::From {
                level: 0,
                module: Some("pydantic".into()),
                names: vec![
                    ImportedName {
                        name: "BaseModel".into(),
                        alias: None
                    },
                    ImportedName {
                        name: "Field".into(),
                        alias: Some("F".into())
                    },
                ],
                star: false,
            }
        );
        assert_eq!(
            module.imports[1],
            ImportDecl::From {
                level: 2,
                module: Some("animals.cats".into()),
                names: vec![ImportedName {
                    name: "Cat".into(),
                    alias: None
                }],
                star: false,
            }
        );
        assert!(matches!(
            &module.imports[2],
            ImportDecl::From { level: 1, module: None, names, .. } if names[0].name == "dogs"
        ));
        assert_eq!(
            module.imports[3],
            ImportDecl::Module {
                path: "typing".into(),
                alias: Some("t".into())
            }
        );
    }

    #[test]
    fn reads_imports_inside_try_blocks() {
        let module = read_python(
            "try:\n    from pydantic.v1 import BaseModel\nexcept ImportError:\n    from pydantic import BaseModel\n",
        )
        .unwrap();
        assert_eq!(module.imports.len(), 2);
    }

    #[test]
    fn reads_model_class() {
        let source = r#"
class Profile(BaseModel, extra="forbid"):
    """A user profile.

    Shown on the account page.
    """

    username: str
    age: Optional[int] = None
    hobbies: List[str] = Field(default_factory=list, description="Things")
    kind = "profile"

    class Config:
        extra = Extra.forbid

    @computed_field
    @property
    def display(self) -> str:
        return self.username
"#;
        let module = read_python(source).unwrap();
        let class = &module.classes[0];

        assert_eq!(class.name, "Profile");
        assert_eq!(class.bases, vec![Expr::Name("BaseModel".into())]);
        assert_eq!(
            class.keywords,
            vec![("extra".to_string(), Expr::Literal(json!("forbid")))]
        );
        assert_eq!(
            class.docstring.as_deref(),
            Some("A user profile.\n\nShown on the account page.")
        );

        let names: Vec<&str> = class.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["username", "age", "hobbies"]);
        assert_eq!(
            class.attributes[1].annotation,
            TypeExpr::Subscript {
                base: "Optional".into(),
                args: vec![TypeExpr::Name("int".into())],
            }
        );
        assert_eq!(class.attributes[1].value, Some(Expr::Literal(Value::Null)));
        assert!(matches!(
            &class.attributes[2].value,
            Some(Expr::Call { func, kwargs, .. }) if func == "Field" && kwargs.len() == 2
        ));

        assert_eq!(
            class.assignments,
            vec![("kind".to_string(), Expr::Literal(json!("profile")))]
        );
        assert_eq!(
            class.config,
            Some(vec![("extra".to_string(), Expr::Name("Extra.forbid".into()))])
        );
        assert_eq!(class.computed.len(), 1);
        assert_eq!(class.computed[0].name, "display");
        assert_eq!(
            class.computed[0].returns,
            Some(TypeExpr::Name("str".into()))
        );
    }

    #[test]
    fn reads_enum_members() {
        let module =
            read_python("class Sport(str, Enum):\n    football = 'football'\n    size = -3\n")
                .unwrap();
        let class = &module.classes[0];
        assert_eq!(class.bases.len(), 2);
        assert_eq!(
            class.assignments,
            vec![
                ("football".to_string(), Expr::Literal(json!("football"))),
                ("size".to_string(), Expr::Literal(json!(-3))),
            ]
        );
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = read_python("class Broken(BaseModel:\n    x: int\n").unwrap_err();
        assert!(matches!(err, ReadError::Syntax(_)));
    }

    #[test]
    fn reads_module_aliases() {
        let module = read_python(
            "Ids = List[int]\nMaybe = int | None\nT = TypeVar(\"T\")\nNAME = \"x\"\n",
        )
        .unwrap();
        assert_eq!(
            module.aliases,
            vec![
                (
                    "Ids".to_string(),
                    Expr::Type(TypeExpr::Subscript {
                        base: "List".into(),
                        args: vec![TypeExpr::Name("int".into())],
                    })
                ),
                (
                    "Maybe".to_string(),
                    Expr::Type(TypeExpr::Union(vec![
                        TypeExpr::Name("int".into()),
                        TypeExpr::Name("None".into()),
                    ]))
                ),
                (
                    "T".to_string(),
                    Expr::Call {
                        func: "TypeVar".into(),
                        args: vec![Expr::Literal(json!("T"))],
                        kwargs: vec![],
                    }
                ),
                ("NAME".to_string(), Expr::Literal(json!("x"))),
            ]
        );
    }

    #[test]
    fn class_body_assignments_and_docstrings_are_read() {
        let module = read_python(
            "class Color(str, Enum):\n    \"Palette.\"\n    red = 'red'\n    blue = 'blue'\n",
        )
        .unwrap();
        let class = &module.classes[0];
        assert_eq!(class.docstring.as_deref(), Some("Palette."));
        assert_eq!(class.assignments.len(), 2);
    }

    #[test]
    fn docstring_with_wide_whitespace_is_dedented() {
        let doc = "Title.\n\u{3000}\u{3000}\n  body\n\u{3000}\u{3000}tail";
        assert_eq!(clean_docstring(doc), "Title.\n\nbody\ntail");
        assert_eq!(clean_docstring("Title.\n\u{3000}x\n  y"), "Title.\nx\n y");

        let module = read_python(&format!(
            "class A(BaseModel):\n    \"\"\"Doc.\n{}\n    \"\"\"\n    x: int\n",
            "\u{3000}\u{3000}"
        ))
        .unwrap();
        assert_eq!(module.classes[0].docstring.as_deref(), Some("Doc."));
    }

    #[test]
    fn string_literals_decode() {
        assert_eq!(parse_string_literal(r#""a\"b""#).as_deref(), Some("a\"b"));
        assert_eq!(parse_string_literal(r"r'\d+'").as_deref(), Some(r"\d+"));
        assert_eq!(parse_string_literal(r#""""doc""""#).as_deref(), Some("doc"));
        assert_eq!(parse_string_literal("f'{x}'"), None);
    }
}
