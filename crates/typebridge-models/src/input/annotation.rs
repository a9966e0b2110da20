//! Type annotations read from tree-sitter nodes.
//!
//! The Python grammar has two shapes for the same annotation: expression
//! nodes (`subscript`, `binary_operator`) and, in annotation position, type
//! nodes (`generic_type`, `union_type`, `member_type`). Both map onto one
//! [`TypeExpr`].

use super::python::{parse_string_literal, parse_tree};
use crate::syntax::TypeExpr;
use crate::traits::ReadError;
use tree_sitter::Node;

/// Parse a type written as source text, such as a string forward
/// reference.
pub fn parse_type(text: &str) -> Result<TypeExpr, ReadError> {
    let source = text.trim();
    let tree = parse_tree(source)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ReadError::Syntax(format!("invalid type `{}`", source)));
    }

    let mut cursor = root.walk();
    let statements: Vec<Node> = root.named_children(&mut cursor).collect();
    let [statement] = statements.as_slice() else {
        return Err(ReadError::Parse(format!(
            "expected a single type expression, found `{}`",
            source
        )));
    };
    // Older grammars wrap the expression in `expression_statement`.
    let expr = match statement.kind() {
        "expression_statement" => statement.named_child(0).ok_or_else(|| {
            ReadError::Parse(format!("expected a type expression, found `{}`", source))
        })?,
        _ => *statement,
    };
    Ok(type_expr(expr, source))
}

/// Build a [`TypeExpr`] from an annotation node.
pub(crate) fn type_expr(node: Node, source: &str) -> TypeExpr {
    let text = node.utf8_text(source.as_bytes()).unwrap_or("");
    match node.kind() {
        "type" | "parenthesized_expression" => match first_named(node) {
            Some(inner) => type_expr(inner, source),
            None => TypeExpr::Other(text.to_string()),
        },
        "none" => TypeExpr::Name("None".to_string()),
        "true" => TypeExpr::Bool(true),
        "false" => TypeExpr::Bool(false),
        "ellipsis" => TypeExpr::Ellipsis,
        "identifier" | "attribute" | "dotted_name" | "member_type" => TypeExpr::Name(compact(text)),
        "integer" => integer(text).map_or_else(|| TypeExpr::Other(text.to_string()), TypeExpr::Int),
        "unary_operator" => {
            let operand = node
                .child_by_field_name("argument")
                .map(|arg| type_expr(arg, source));
            match (node.child_by_field_name("operator").map(|op| op.kind()), operand) {
                (Some("-"), Some(TypeExpr::Int(i))) => TypeExpr::Int(-i),
                _ => TypeExpr::Other(text.to_string()),
            }
        }
        "string" | "concatenated_string" => string(node, source)
            .map_or_else(|| TypeExpr::Other(text.to_string()), TypeExpr::Str),
        "subscript" => {
            let base = node
                .child_by_field_name("value")
                .map(|value| compact(value.utf8_text(source.as_bytes()).unwrap_or("")))
                .unwrap_or_default();
            let mut cursor = node.walk();
            let args = node
                .children_by_field_name("subscript", &mut cursor)
                .map(|arg| type_expr(arg, source))
                .collect();
            TypeExpr::Subscript { base, args }
        }
        "generic_type" => {
            let children = named(node);
            let base = children
                .iter()
                .find(|c| c.kind() != "type_parameter")
                .map(|c| compact(c.utf8_text(source.as_bytes()).unwrap_or("")))
                .unwrap_or_default();
            let args = children
                .iter()
                .filter(|c| c.kind() == "type_parameter")
                .flat_map(|param| named(*param))
                .map(|arg| type_expr(arg, source))
                .collect();
            TypeExpr::Subscript { base, args }
        }
        "union_type" => {
            let mut members = Vec::new();
            for member in named(node) {
                push_member(&mut members, type_expr(member, source));
            }
            TypeExpr::Union(members)
        }
        "binary_operator" => {
            let is_pipe = node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "|");
            let (Some(left), Some(right), true) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
                is_pipe,
            ) else {
                return TypeExpr::Other(text.to_string());
            };
            let mut members = Vec::new();
            push_member(&mut members, type_expr(left, source));
            push_member(&mut members, type_expr(right, source));
            TypeExpr::Union(members)
        }
        "list" => TypeExpr::List(named(node).into_iter().map(|n| type_expr(n, source)).collect()),
        "call" => match node.child_by_field_name("function") {
            Some(function) => {
                TypeExpr::Call(compact(function.utf8_text(source.as_bytes()).unwrap_or("")))
            }
            None => TypeExpr::Other(text.to_string()),
        },
        _ => TypeExpr::Other(text.to_string()),
    }
}

/// `A | B | C` nests to the left; flatten it.
fn push_member(members: &mut Vec<TypeExpr>, member: TypeExpr) {
    match member {
        TypeExpr::Union(inner) => members.extend(inner),
        other => members.push(other),
    }
}

fn named(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn first_named(node: Node) -> Option<Node> {
    named(node).into_iter().next()
}

fn string(node: Node, source: &str) -> Option<String> {
    if node.kind() == "string" {
        return parse_string_literal(node.utf8_text(source.as_bytes()).ok()?);
    }
    let mut joined = String::new();
    for part in named(node) {
        joined.push_str(&parse_string_literal(part.utf8_text(source.as_bytes()).ok()?)?);
    }
    Some(joined)
}

fn integer(text: &str) -> Option<i64> {
    text.replace('_', "").parse().ok()
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> TypeExpr {
        TypeExpr::Name(n.to_string())
    }

    #[test]
    fn nested_subscripts() {
        assert_eq!(
            parse_type("Optional[List[\"Team\"]]").unwrap(),
            TypeExpr::Subscript {
                base: "Optional".into(),
                args: vec![TypeExpr::Subscript {
                    base: "List".into(),
                    args: vec![TypeExpr::Str("Team".into())],
                }],
            }
        );
    }

    #[test]
    fn pipe_unions_flatten() {
        assert_eq!(
            parse_type("int | typing.List[str] | None").unwrap(),
            TypeExpr::Union(vec![
                name("int"),
                TypeExpr::Subscript {
                    base: "typing.List".into(),
                    args: vec![name("str")],
                },
                name("None"),
            ])
        );
    }

    #[test]
    fn literals_and_ellipsis() {
        assert_eq!(
            parse_type("Literal['a', -1, True]").unwrap(),
            TypeExpr::Subscript {
                base: "Literal".into(),
                args: vec![
                    TypeExpr::Str("a".into()),
                    TypeExpr::Int(-1),
                    TypeExpr::Bool(true)
                ],
            }
        );
        assert_eq!(
            parse_type("Tuple[int, ...]").unwrap(),
            TypeExpr::Subscript {
                base: "Tuple".into(),
                args: vec![name("int"), TypeExpr::Ellipsis],
            }
        );
    }

    #[test]
    fn call_metadata_keeps_callee() {
        assert_eq!(
            parse_type("Annotated[int, Field(gt=0, le=[1, 2])]").unwrap(),
            TypeExpr::Subscript {
                base: "Annotated".into(),
                args: vec![name("int"), TypeExpr::Call("Field".into())],
            }
        );
    }

    #[test]
    fn annotation_nodes_match_expression_nodes() {
        let source = "x: Dict[str, List[int]] | None = None\n";
        let tree = parse_tree(source).unwrap();
        let root = tree.root_node();
        let assignment = if root.child(0).unwrap().kind() == "expression_statement" {
            root.child(0).unwrap().child(0).unwrap()
        } else {
            root.child(0).unwrap()
        };
        let annotation = assignment.child_by_field_name("type").unwrap();

        assert_eq!(
            type_expr(annotation, source),
            parse_type("Dict[str, List[int]] | None").unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_type("List[int").is_err());
        assert!(parse_type("int int").is_err());
    }
}
