//! Module-level declarations extracted from source, before name resolution.

use serde_json::Value;

/// Declarations of one source module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSyntax {
    pub imports: Vec<ImportDecl>,
    pub classes: Vec<ClassDecl>,
    /// Module-level `Name = expression` assignments.
    pub aliases: Vec<(String, Expr)>,
}

impl ModuleSyntax {
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().rev().find(|c| c.name == name)
    }
}

/// An import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDecl {
    /// `import a.b.c` or `import a.b.c as d`.
    Module { path: String, alias: Option<String> },
    /// `from ..a.b import c as d`; `level` counts leading dots.
    From {
        level: usize,
        module: Option<String>,
        names: Vec<ImportedName>,
        star: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// Name bound in the importing module.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A class statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub bases: Vec<Expr>,
    /// Class keyword arguments, e.g. `class M(BaseModel, extra="forbid")`.
    pub keywords: Vec<(String, Expr)>,
    pub docstring: Option<String>,
    /// Annotated attributes (`name: T` or `name: T = value`).
    pub attributes: Vec<Attribute>,
    /// Plain assignments (`name = value`).
    pub assignments: Vec<(String, Expr)>,
    /// Assignments inside a nested `class Config:` block.
    pub config: Option<Vec<(String, Expr)>>,
    /// `@computed_field` properties.
    pub computed: Vec<ComputedDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub annotation: TypeExpr,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedDecl {
    pub name: String,
    /// Return annotation, if any.
    pub returns: Option<TypeExpr>,
    pub docstring: Option<String>,
    /// Keyword arguments of `@computed_field(...)`.
    pub options: Vec<(String, Expr)>,
}

/// A statically evaluated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier or dotted attribute chain.
    Name(String),
    /// String, number, boolean or `None`.
    Literal(Value),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Call {
        func: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    /// A subscript or `A | B` expression, read as a type
    /// (`Tags = List[str]`, `class Page(BaseModel, Generic[T])`).
    Type(TypeExpr),
    /// `...`
    Ellipsis,
    /// Anything else, as source text.
    Other(String),
}

impl Expr {
    /// Evaluate to a JSON value when the expression is a constant.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Expr::Literal(v) => Some(v.clone()),
            Expr::List(items) | Expr::Tuple(items) => items
                .iter()
                .map(Expr::to_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Expr::Dict(pairs) => {
                let mut map = serde_json::Map::new();
                for (key, value) in pairs {
                    let Expr::Literal(Value::String(key)) = key else {
                        return None;
                    };
                    map.insert(key.clone(), value.to_json()?);
                }
                Some(Value::Object(map))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Literal(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Last segment of a dotted name (`Extra.forbid` -> `forbid`).
    pub fn last_segment(&self) -> Option<&str> {
        self.as_name().and_then(|n| n.rsplit('.').next())
    }

    pub fn kwarg<'a>(kwargs: &'a [(String, Expr)], name: &str) -> Option<&'a Expr> {
        kwargs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// A type annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Identifier or dotted name (`int`, `typing.List`, `None`).
    Name(String),
    /// `base[args...]`.
    Subscript { base: String, args: Vec<TypeExpr> },
    /// PEP 604 `A | B`.
    Union(Vec<TypeExpr>),
    /// String literal; a forward reference outside `Literal[...]`.
    Str(String),
    Int(i64),
    Bool(bool),
    /// `...` in `Tuple[int, ...]`.
    Ellipsis,
    /// Bracketed list, e.g. the parameters of `Callable[[int], str]`.
    List(Vec<TypeExpr>),
    /// Call such as `Field(gt=0)` in `Annotated` metadata; only the callee
    /// is kept.
    Call(String),
    /// Any other expression, as source text.
    Other(String),
}

impl TypeExpr {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Name(n) => Some(n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constant_containers_evaluate() {
        let expr = Expr::Dict(vec![(
            Expr::Literal(json!("a")),
            Expr::List(vec![Expr::Literal(json!(1)), Expr::Literal(Value::Null)]),
        )]);
        assert_eq!(expr.to_json(), Some(json!({"a": [1, null]})));
    }

    #[test]
    fn non_constant_is_opaque() {
        let expr = Expr::List(vec![Expr::Name("x".into())]);
        assert_eq!(expr.to_json(), None);
    }
}
