//! Name resolution and class classification over loaded modules.
//!
//! Models are collected from the modules in scope: the entry and its package
//! descendants. A name those modules bind by import counts as theirs. Models
//! outside the scope that collected fields refer to are built as
//! dependencies, including generic models applied to concrete arguments.

use crate::ir::{
    Constraints, DefinitionId, EnumDefinition, ExtraFields, Field, FieldDefault, FieldType,
    ModelDefinition, StringFormat,
};
use crate::locate::{Binding, LocatedDefinitions, ModuleUnit};
use crate::syntax::{Attribute, ClassDecl, ComputedDecl, Expr, TypeExpr};
use crate::traits::ModuleReader;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Bound on alias and re-export chains.
const MAX_DEPTH: usize = 32;

/// Bound on distinct parametrizations of generic models.
const MAX_PARAMETRIZATIONS: usize = 256;

/// Modules whose names are matched by their last segment.
const KNOWN_MODULES: &[&str] = &[
    "builtins",
    "collections",
    "collections.abc",
    "datetime",
    "decimal",
    "enum",
    "ipaddress",
    "pathlib",
    "typing",
    "typing_extensions",
    "uuid",
];

#[derive(Debug, Clone, PartialEq)]
enum Symbol {
    Class(DefinitionId),
    Module(PathBuf),
    External(String),
    /// Subscripted or union alias (`Tags = List[str]`) and its module.
    TypeAlias(usize, TypeExpr),
    /// `T = TypeVar("T")`.
    TypeVar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Model,
    /// Model with unbound type parameters.
    GenericModel,
    Enum,
    /// `StrEnum` or a subclass; `auto()` yields member names.
    StrEnum,
    Plain,
}

impl Kind {
    fn is_model(self) -> bool {
        matches!(self, Kind::Model | Kind::GenericModel)
    }
}

/// Types bound to a generic model's parameters, by parameter name.
type TypeArgs = HashMap<String, FieldType>;

/// Classify classes and build the definitions in scope plus everything
/// they reference.
pub(crate) fn collect(units: &[ModuleUnit], reader: &dyn ModuleReader) -> LocatedDefinitions {
    let mut resolver = Resolver::new(units, reader);

    let mut kinds = HashMap::new();
    for id in resolver.class_ids() {
        resolver.classify(&id, &mut kinds, &mut HashSet::new());
    }
    resolver.kinds = kinds;

    let mut located = LocatedDefinitions::default();
    let mut cache = HashMap::new();
    let mut seen = HashSet::new();
    for id in resolver.scope_ids() {
        match resolver.kind(&id) {
            Kind::Model => {
                if let Some(model) = resolver.model(&id, &TypeArgs::new(), &mut cache, &mut HashSet::new()) {
                    seen.insert(id);
                    located.models.push(model);
                }
            }
            Kind::GenericModel => tracing::debug!(class = %id, "skipping generic model"),
            Kind::Enum | Kind::StrEnum => {
                if let Some(enumeration) = resolver.enumeration(&id) {
                    seen.insert(id);
                    located.enums.push(enumeration);
                }
            }
            Kind::Plain => {}
        }
    }

    let mut queue = VecDeque::new();
    for model in &located.models {
        push_refs(&mut queue, model);
    }
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Some(model) = resolver.dependency(&id, &mut cache) {
            tracing::debug!(model = %model.qualname, "collected dependency");
            push_refs(&mut queue, &model);
            located.dependencies.push(model);
        } else if let Some(enumeration) = resolver.enumeration(&id) {
            located.enums.push(enumeration);
        }
    }

    tracing::debug!(
        models = located.models.len(),
        dependencies = located.dependencies.len(),
        enums = located.enums.len(),
        "collected definitions"
    );
    located
}

fn push_refs(queue: &mut VecDeque<DefinitionId>, model: &ModelDefinition) {
    for field in &model.fields {
        field.ty.for_each_ref(&mut |id| queue.push_back(id.clone()));
    }
}

struct Resolver<'u> {
    units: &'u [ModuleUnit],
    reader: &'u dyn ModuleReader,
    index: HashMap<&'u Path, usize>,
    kinds: HashMap<DefinitionId, Kind>,
    /// Generic models applied to arguments, keyed by the applied id
    /// (`Page[Item]`), discovered while resolving field types.
    parametrizations: RefCell<HashMap<DefinitionId, (DefinitionId, TypeArgs)>>,
}

impl<'u> Resolver<'u> {
    fn new(units: &'u [ModuleUnit], reader: &'u dyn ModuleReader) -> Self {
        let index = units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.key.as_path(), i))
            .collect();
        Self {
            units,
            reader,
            index,
            kinds: HashMap::new(),
            parametrizations: RefCell::new(HashMap::new()),
        }
    }

    /// Every class in module visit order; a redefined name counts once,
    /// at its last definition.
    fn class_ids(&self) -> Vec<DefinitionId> {
        let mut ids = Vec::new();
        for unit in self.units {
            ids.extend(own_class_ids(unit));
        }
        ids
    }

    /// Classes defined in or bound by the modules in scope, unique by id.
    fn scope_ids(&self) -> Vec<DefinitionId> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        for (module, unit) in self.units.iter().enumerate() {
            if !unit.in_scope {
                continue;
            }
            let bound = self
                .bound_names(module)
                .into_iter()
                .filter_map(|name| match self.lookup(module, &name, 0) {
                    Some(Symbol::Class(id)) => Some(id),
                    _ => None,
                });
            for id in own_class_ids(unit).into_iter().chain(bound) {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Names a module binds other than its own classes, including names
    /// brought in by star imports, in sorted order.
    fn bound_names(&self, module: usize) -> BTreeSet<String> {
        let unit = &self.units[module];
        let mut names: BTreeSet<String> = unit
            .bindings
            .iter()
            .filter(|(_, binding)| !matches!(binding, Binding::Class))
            .map(|(name, _)| name.clone())
            .collect();
        for key in &unit.stars {
            self.star_names(key, &mut names, 0);
        }
        names
    }

    fn star_names(&self, key: &Path, names: &mut BTreeSet<String>, depth: usize) {
        let Some(&module) = self.index.get(key) else {
            return;
        };
        if depth > MAX_DEPTH {
            return;
        }
        let unit = &self.units[module];
        names.extend(
            unit.bindings
                .keys()
                .filter(|name| !name.starts_with('_'))
                .cloned(),
        );
        for star in &unit.stars {
            self.star_names(star, names, depth + 1);
        }
    }

    fn class_decl(&self, id: &DefinitionId) -> Option<(usize, &'u ClassDecl)> {
        let module = *self.index.get(id.module.as_path())?;
        let class = self.units[module].syntax.class(&id.name)?;
        Some((module, class))
    }

    fn kind(&self, id: &DefinitionId) -> Kind {
        self.kinds.get(id).copied().unwrap_or(Kind::Plain)
    }

    fn qualname(&self, module: usize, name: &str) -> String {
        let dotted = &self.units[module].dotted;
        if dotted.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", dotted, name)
        }
    }

    // Symbols

    fn resolve(&self, module: usize, dotted: &str) -> Symbol {
        self.resolve_at(module, dotted, 0)
            .unwrap_or_else(|| Symbol::External(dotted.to_string()))
    }

    fn resolve_at(&self, module: usize, dotted: &str, depth: usize) -> Option<Symbol> {
        if depth > MAX_DEPTH {
            return None;
        }
        let mut segments = dotted.split('.');
        let head = segments.next()?;
        let mut symbol = self.lookup(module, head, depth)?;
        for segment in segments {
            symbol = match symbol {
                Symbol::Module(key) => self.module_attr(&key, segment, depth + 1)?,
                Symbol::External(qualified) => {
                    Symbol::External(format!("{}.{}", qualified, segment))
                }
                Symbol::Class(_) | Symbol::TypeAlias(..) | Symbol::TypeVar => return None,
            };
        }
        Some(symbol)
    }

    fn lookup(&self, module: usize, name: &str, depth: usize) -> Option<Symbol> {
        if depth > MAX_DEPTH {
            return None;
        }
        let unit = &self.units[module];
        match unit.bindings.get(name) {
            Some(Binding::Class) => Some(Symbol::Class(DefinitionId::new(&unit.key, name))),
            Some(Binding::Alias(expr)) => self.alias_target(module, expr, depth + 1),
            Some(Binding::Import { module: key, name }) => {
                self.module_attr(key, name, depth + 1)
            }
            Some(Binding::Module(key)) => Some(Symbol::Module(key.clone())),
            Some(Binding::External(qualified)) => Some(Symbol::External(qualified.clone())),
            None if name.starts_with('_') => None,
            None => unit
                .stars
                .iter()
                .find_map(|key| self.module_attr(key, name, depth + 1)),
        }
    }

    fn alias_target(&self, module: usize, expr: &Expr, depth: usize) -> Option<Symbol> {
        match expr {
            Expr::Name(target) => Some(
                self.resolve_at(module, target, depth)
                    .unwrap_or_else(|| Symbol::External(target.clone())),
            ),
            Expr::Type(ty) => Some(Symbol::TypeAlias(module, ty.clone())),
            Expr::Call { func, .. } if last_segment(func) == "TypeVar" => Some(Symbol::TypeVar),
            // `UserId = NewType("UserId", int)`
            Expr::Call { func, args, .. } if last_segment(func) == "NewType" => {
                self.alias_target(module, args.get(1)?, depth + 1)
            }
            _ => None,
        }
    }

    /// Attribute `name` of an in-tree module: a binding or a submodule.
    fn module_attr(&self, key: &Path, name: &str, depth: usize) -> Option<Symbol> {
        let module = *self.index.get(key)?;
        if let Some(symbol) = self.lookup(module, name, depth) {
            return Some(symbol);
        }

        let dir = self.units[module].package_dir.as_ref()?;
        let target = dir.join(name);
        self.units
            .iter()
            .find(|unit| match &unit.package_dir {
                Some(package) => package == &target,
                None => unit.key.with_extension("") == target,
            })
            .map(|unit| Symbol::Module(unit.key.clone()))
    }

    // Classification

    fn classify(
        &self,
        id: &DefinitionId,
        kinds: &mut HashMap<DefinitionId, Kind>,
        visiting: &mut HashSet<DefinitionId>,
    ) -> Kind {
        if let Some(kind) = kinds.get(id) {
            return *kind;
        }
        if !visiting.insert(id.clone()) {
            return Kind::Plain;
        }
        let Some((module, class)) = self.class_decl(id) else {
            return Kind::Plain;
        };

        let mut kind = Kind::Plain;
        let mut generic = false;
        for base in &class.bases {
            let base_kind = match base {
                Expr::Name(name) => match self.resolve(module, name) {
                    Symbol::External(qualified) => external_kind(&qualified),
                    Symbol::Class(base_id) => self.classify(&base_id, kinds, visiting),
                    _ => Kind::Plain,
                },
                // `Generic[T]`, `Page[T]` or a concrete `Page[Item]`
                Expr::Type(TypeExpr::Subscript { base, args }) => {
                    let open = args.iter().any(|arg| self.mentions_type_var(module, arg));
                    match self.resolve(module, base) {
                        Symbol::External(qualified) if external_name(&qualified) == "Generic" => {
                            generic = true;
                            continue;
                        }
                        Symbol::Class(base_id) => {
                            match self.classify(&base_id, kinds, visiting) {
                                base_kind if base_kind.is_model() => {
                                    generic |= open;
                                    Kind::Model
                                }
                                other => other,
                            }
                        }
                        _ => continue,
                    }
                }
                _ => continue,
            };
            kind = match (kind, base_kind) {
                (_, Kind::GenericModel) => {
                    generic = true;
                    Kind::Model
                }
                (Kind::Plain, other) | (Kind::Enum, other @ Kind::StrEnum) => other,
                (current, _) => current,
            };
        }

        if kind == Kind::Model && generic {
            kind = Kind::GenericModel;
        }
        kinds.insert(id.clone(), kind);
        kind
    }

    /// Based on `pydantic.v1` models, directly or through other classes.
    fn is_legacy(&self, id: &DefinitionId, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        let Some((module, class)) = self.class_decl(id) else {
            return false;
        };
        class.bases.iter().any(|base| {
            let name = match base {
                Expr::Name(name) | Expr::Type(TypeExpr::Subscript { base: name, .. }) => name,
                _ => return false,
            };
            match self.resolve(module, name) {
                Symbol::External(qualified) => qualified.starts_with("pydantic.v1."),
                Symbol::Class(base_id) => self.is_legacy(&base_id, depth + 1),
                _ => false,
            }
        })
    }

    // Generics

    /// Type parameters of a generic model in declaration order: those of
    /// `Generic[...]` when listed, else the type variables of its bases.
    fn parameters(&self, id: &DefinitionId, depth: usize) -> Vec<String> {
        let Some((module, class)) = self.class_decl(id) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for base in &class.bases {
            match base {
                Expr::Type(TypeExpr::Subscript { base, args }) => {
                    if matches!(
                        self.resolve(module, base),
                        Symbol::External(qualified) if external_name(&qualified) == "Generic"
                    ) {
                        return args
                            .iter()
                            .filter_map(|arg| arg.as_name().map(str::to_string))
                            .collect();
                    }
                    for arg in args {
                        self.type_vars(module, arg, &mut found, depth);
                    }
                }
                Expr::Name(name) if depth < MAX_DEPTH => {
                    if let Symbol::Class(base_id) = self.resolve(module, name)
                        && self.kind(&base_id) == Kind::GenericModel
                    {
                        for param in self.parameters(&base_id, depth + 1) {
                            if !found.contains(&param) {
                                found.push(param);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        found
    }

    fn type_vars(&self, module: usize, expr: &TypeExpr, found: &mut Vec<String>, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        match expr {
            TypeExpr::Name(name) => {
                if self.resolve(module, name) == Symbol::TypeVar && !found.contains(name) {
                    found.push(name.clone());
                }
            }
            TypeExpr::Subscript { args: items, .. }
            | TypeExpr::Union(items)
            | TypeExpr::List(items) => {
                for item in items {
                    self.type_vars(module, item, found, depth + 1);
                }
            }
            TypeExpr::Str(text) => {
                if let Ok(inner) = self.reader.parse_type(text) {
                    self.type_vars(module, &inner, found, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn mentions_type_var(&self, module: usize, expr: &TypeExpr) -> bool {
        let mut found = Vec::new();
        self.type_vars(module, expr, &mut found, 0);
        !found.is_empty()
    }

    /// Bind a generic model's parameters to resolved arguments; missing
    /// arguments are `Any`.
    fn bind(&self, generic: &DefinitionId, resolved: &[FieldType]) -> TypeArgs {
        self.parameters(generic, 0)
            .into_iter()
            .zip(resolved.iter().cloned().chain(std::iter::repeat(FieldType::Any)))
            .collect()
    }

    /// Reference to `generic` applied to `params`, recorded so the applied
    /// model is built as a dependency.
    fn parametrize(
        &self,
        generic: &DefinitionId,
        module: usize,
        params: &[TypeExpr],
        args: &TypeArgs,
        depth: usize,
    ) -> FieldType {
        let resolved: Vec<FieldType> = params
            .iter()
            .map(|param| self.resolve_type(module, param, args, depth + 1))
            .collect();
        let name = if resolved.is_empty() {
            generic.name.clone()
        } else {
            let labels: Vec<String> = resolved.iter().map(type_label).collect();
            format!("{}[{}]", generic.name, labels.join(", "))
        };
        let id = DefinitionId::new(&generic.module, name);

        let mut parametrizations = self.parametrizations.borrow_mut();
        if !parametrizations.contains_key(&id) {
            if parametrizations.len() >= MAX_PARAMETRIZATIONS {
                tracing::warn!(model = %id.name, "too many generic parametrizations");
                return FieldType::Unresolved(id.name);
            }
            let bound = self.bind(generic, &resolved);
            parametrizations.insert(id.clone(), (generic.clone(), bound));
        }
        FieldType::Ref(id)
    }

    /// A referenced model outside the scope: a parametrized generic or a
    /// plain model.
    fn dependency(
        &self,
        id: &DefinitionId,
        cache: &mut HashMap<DefinitionId, ModelDefinition>,
    ) -> Option<ModelDefinition> {
        let parametrization = self.parametrizations.borrow().get(id).cloned();
        match parametrization {
            Some((generic, args)) => {
                let (module, _) = self.class_decl(&generic)?;
                let model = self.model(&generic, &args, cache, &mut HashSet::new())?;
                Some(ModelDefinition {
                    id: id.clone(),
                    name: id.name.clone(),
                    qualname: self.qualname(module, &id.name),
                    ..model
                })
            }
            None if self.kind(id) == Kind::Model => {
                self.model(id, &TypeArgs::new(), cache, &mut HashSet::new())
            }
            None => None,
        }
    }

    // Models

    fn model(
        &self,
        id: &DefinitionId,
        args: &TypeArgs,
        cache: &mut HashMap<DefinitionId, ModelDefinition>,
        visiting: &mut HashSet<DefinitionId>,
    ) -> Option<ModelDefinition> {
        let cacheable = args.is_empty();
        if cacheable && let Some(model) = cache.get(id) {
            return Some(model.clone());
        }
        if !visiting.insert(id.clone()) {
            return None;
        }
        let (module, class) = self.class_decl(id)?;

        let mut bases = Vec::new();
        for base in &class.bases {
            if let Some((base_id, base_args)) = self.model_base(module, base, args)
                && let Some(base_model) = self.model(&base_id, &base_args, cache, visiting)
            {
                bases.push(base_model);
            }
        }

        let legacy = self.is_legacy(id, 0);
        let mut fields = Vec::new();
        for base in bases.iter().rev() {
            for field in &base.fields {
                upsert(&mut fields, field.clone());
            }
        }
        for attr in &class.attributes {
            if let Some(field) = self.field(module, attr, args, legacy) {
                upsert(&mut fields, field);
            }
        }
        for computed in &class.computed {
            upsert(&mut fields, self.computed_field(module, computed, args));
        }

        let extra = self
            .own_extra(module, class)
            .or_else(|| bases.iter().find_map(|base| base.extra));

        let model = ModelDefinition {
            id: id.clone(),
            name: class.name.clone(),
            qualname: self.qualname(module, &class.name),
            docs: class.docstring.clone(),
            fields,
            extra,
        };
        visiting.remove(id);
        if cacheable {
            cache.insert(id.clone(), model.clone());
        }
        Some(model)
    }

    /// A model base class and the arguments its fields resolve with.
    fn model_base(&self, module: usize, base: &Expr, args: &TypeArgs) -> Option<(DefinitionId, TypeArgs)> {
        match base {
            Expr::Name(name) => match self.resolve(module, name) {
                Symbol::Class(id) if self.kind(&id).is_model() => Some((id, args.clone())),
                _ => None,
            },
            Expr::Type(TypeExpr::Subscript { base, args: params }) => {
                match self.resolve(module, base) {
                    Symbol::Class(id) if self.kind(&id).is_model() => {
                        let resolved: Vec<FieldType> = params
                            .iter()
                            .map(|param| self.resolve_type(module, param, args, 0))
                            .collect();
                        let bound = self.bind(&id, &resolved);
                        Some((id, bound))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn field(&self, module: usize, attr: &Attribute, args: &TypeArgs, legacy: bool) -> Option<Field> {
        if attr.name.starts_with('_') || attr.name == "model_config" {
            return None;
        }
        if self.is_class_var(module, &attr.annotation) {
            return None;
        }

        let ty = self.resolve_type(module, &attr.annotation, args, 0);
        let mut field = Field::required(&attr.name, ty);
        match &attr.value {
            None | Some(Expr::Ellipsis) => {}
            Some(Expr::Call { func, args, kwargs }) if last_segment(func) == "Field" => {
                apply_field_call(&mut field, args, kwargs);
            }
            Some(value) => field.default = static_default(value),
        }

        // pydantic v1 gives `Optional` fields an implicit `None` default.
        if legacy
            && field.default == FieldDefault::Required
            && field.ty.is_optional()
            && !explicitly_required(attr.value.as_ref())
        {
            field.default = FieldDefault::Literal(Value::Null);
        }
        Some(field)
    }

    fn computed_field(&self, module: usize, computed: &ComputedDecl, args: &TypeArgs) -> Field {
        let ty = match &computed.returns {
            Some(returns) => self.resolve_type(module, returns, args, 0),
            None => FieldType::Any,
        };

        let option = |key: &str| {
            Expr::kwarg(&computed.options, key)
                .and_then(Expr::as_str)
                .map(str::to_string)
        };

        Field {
            alias: option("alias"),
            description: option("description").or_else(|| computed.docstring.clone()),
            title: option("title"),
            computed: true,
            ..Field::required(&computed.name, ty)
        }
    }

    /// Extra policy configured on the class itself: class keywords, then
    /// `model_config`, then a `Config` class.
    fn own_extra(&self, module: usize, class: &ClassDecl) -> Option<ExtraFields> {
        if let Some(extra) = Expr::kwarg(&class.keywords, "extra").and_then(extra_value) {
            return Some(extra);
        }

        if let Some(config) = Expr::kwarg(&class.assignments, "model_config") {
            let extra = match config {
                Expr::Call { kwargs, .. } => Expr::kwarg(kwargs, "extra").and_then(extra_value),
                Expr::Dict(pairs) => pairs
                    .iter()
                    .find(|(key, _)| key.as_str() == Some("extra"))
                    .and_then(|(_, value)| extra_value(value)),
                _ => None,
            };
            if extra.is_some() {
                return extra;
            }
        }

        if let Some(config) = &class.config {
            return Expr::kwarg(config, "extra").and_then(extra_value);
        }

        // `Config = SharedConfig`
        let name = Expr::kwarg(&class.assignments, "Config")?.as_name()?;
        let Symbol::Class(config_id) = self.resolve(module, name) else {
            return None;
        };
        let (_, config_class) = self.class_decl(&config_id)?;
        Expr::kwarg(&config_class.assignments, "extra").and_then(extra_value)
    }

    // Enums

    fn enumeration(&self, id: &DefinitionId) -> Option<EnumDefinition> {
        let by_name = match self.kind(id) {
            Kind::Enum => false,
            Kind::StrEnum => true,
            _ => return None,
        };
        let (module, class) = self.class_decl(id)?;

        let mut values: Vec<Value> = Vec::new();
        let mut last_int = 0i64;
        for (name, expr) in &class.assignments {
            if name.starts_with('_') {
                continue;
            }
            let value = match expr {
                Expr::Call { func, .. } if last_segment(func) == "auto" => {
                    if by_name {
                        Value::String(name.to_lowercase())
                    } else {
                        Value::from(last_int + 1)
                    }
                }
                other => match other.to_json() {
                    Some(value @ (Value::String(_) | Value::Number(_))) => value,
                    _ => {
                        tracing::debug!(class = %id, member = %name, "skipping non-literal enum member");
                        continue;
                    }
                },
            };
            if let Some(i) = value.as_i64() {
                last_int = i;
            }
            // Duplicate values are aliases of an earlier member.
            if !values.contains(&value) {
                values.push(value);
            }
        }

        Some(EnumDefinition {
            id: id.clone(),
            name: class.name.clone(),
            qualname: self.qualname(module, &class.name),
            docs: class.docstring.clone(),
            values,
        })
    }

    // Types

    fn is_class_var(&self, module: usize, expr: &TypeExpr) -> bool {
        let name = match expr {
            TypeExpr::Name(name) | TypeExpr::Subscript { base: name, .. } => name,
            TypeExpr::Str(text) => {
                return self
                    .reader
                    .parse_type(text)
                    .is_ok_and(|inner| self.is_class_var(module, &inner));
            }
            _ => return false,
        };
        matches!(
            self.resolve(module, name),
            Symbol::External(qualified) if external_name(&qualified) == "ClassVar"
        )
    }

    fn resolve_type(&self, module: usize, expr: &TypeExpr, args: &TypeArgs, depth: usize) -> FieldType {
        if depth > MAX_DEPTH {
            return FieldType::Unresolved(describe(expr));
        }
        match expr {
            TypeExpr::Name(name) if name == "None" => FieldType::Null,
            TypeExpr::Name(name) => self.resolve_named(module, name, args, depth),
            TypeExpr::Str(text) => match self.reader.parse_type(text) {
                Ok(inner) => self.resolve_type(module, &inner, args, depth + 1),
                Err(err) => {
                    tracing::debug!(annotation = %text, "unparsable forward reference: {}", err);
                    FieldType::Unresolved(text.clone())
                }
            },
            TypeExpr::Union(members) => FieldType::union(
                members
                    .iter()
                    .map(|member| self.resolve_type(module, member, args, depth + 1))
                    .collect(),
            ),
            TypeExpr::Subscript { base, args: params } => {
                self.resolve_generic(module, base, params, args, depth)
            }
            other => FieldType::Unresolved(describe(other)),
        }
    }

    fn resolve_named(&self, module: usize, name: &str, args: &TypeArgs, depth: usize) -> FieldType {
        match self.resolve(module, name) {
            // An unbound type variable validates anything.
            Symbol::TypeVar => args.get(name).cloned().unwrap_or(FieldType::Any),
            Symbol::Class(id) => match self.kind(&id) {
                Kind::Model | Kind::Enum | Kind::StrEnum => FieldType::Ref(id),
                Kind::GenericModel => self.parametrize(&id, module, &[], args, depth),
                Kind::Plain => {
                    let qualname = self
                        .class_decl(&id)
                        .map(|(m, _)| self.qualname(m, &id.name))
                        .unwrap_or_else(|| name.to_string());
                    FieldType::Unresolved(qualname)
                }
            },
            Symbol::External(qualified) => {
                scalar(external_name(&qualified)).unwrap_or(FieldType::Unresolved(qualified))
            }
            Symbol::TypeAlias(alias_module, expr) => {
                self.resolve_type(alias_module, &expr, args, depth + 1)
            }
            Symbol::Module(_) => FieldType::Unresolved(name.to_string()),
        }
    }

    fn resolve_generic(
        &self,
        module: usize,
        base: &str,
        params: &[TypeExpr],
        args: &TypeArgs,
        depth: usize,
    ) -> FieldType {
        let origin = match self.resolve(module, base) {
            Symbol::External(qualified) => external_name(&qualified).to_string(),
            Symbol::Class(id) => {
                return match self.kind(&id) {
                    Kind::GenericModel => self.parametrize(&id, module, params, args, depth),
                    Kind::Model => FieldType::Ref(id),
                    _ => FieldType::Unresolved(base.to_string()),
                };
            }
            _ => return FieldType::Unresolved(base.to_string()),
        };
        let arg = |i: usize| {
            params
                .get(i)
                .map(|a| self.resolve_type(module, a, args, depth + 1))
                .unwrap_or(FieldType::Any)
        };
        let all = || {
            params
                .iter()
                .map(|a| self.resolve_type(module, a, args, depth + 1))
                .collect::<Vec<_>>()
        };

        match origin.as_str() {
            "Optional" => FieldType::optional(arg(0)),
            "Union" => FieldType::union(all()),
            "List" | "list" | "Sequence" | "MutableSequence" | "Iterable" | "Collection"
            | "Deque" | "deque" => FieldType::List(Box::new(arg(0))),
            "Set" | "set" | "FrozenSet" | "frozenset" | "MutableSet" | "AbstractSet" => {
                FieldType::Set(Box::new(arg(0)))
            }
            "Tuple" | "tuple" => match params {
                [item, TypeExpr::Ellipsis] => FieldType::Tuple {
                    items: vec![self.resolve_type(module, item, args, depth + 1)],
                    variadic: true,
                },
                _ => FieldType::Tuple {
                    items: all(),
                    variadic: false,
                },
            },
            "Dict" | "dict" | "Mapping" | "MutableMapping" | "OrderedDict" | "DefaultDict"
            | "defaultdict" => FieldType::Dict {
                key: Box::new(arg(0)),
                value: Box::new(arg(1)),
            },
            "Literal" => literal(params).unwrap_or_else(|| FieldType::Unresolved(base.to_string())),
            "Annotated" | "Final" | "Required" | "NotRequired" | "ReadOnly" => arg(0),
            _ => FieldType::Unresolved(origin),
        }
    }
}

/// Classes defined in a module; a redefined name counts once, at its last
/// definition.
fn own_class_ids(unit: &ModuleUnit) -> Vec<DefinitionId> {
    unit.syntax
        .classes
        .iter()
        .filter(|class| {
            unit.syntax
                .class(&class.name)
                .is_some_and(|last| std::ptr::eq(last, *class))
        })
        .map(|class| DefinitionId::new(&unit.key, &class.name))
        .collect()
}

/// `x: T = ...` or `x: T = Field(...)`.
fn explicitly_required(value: Option<&Expr>) -> bool {
    match value {
        Some(Expr::Ellipsis) => true,
        Some(Expr::Call { func, args, kwargs }) if last_segment(func) == "Field" => matches!(
            args.first().or_else(|| Expr::kwarg(kwargs, "default")),
            Some(Expr::Ellipsis)
        ),
        _ => false,
    }
}

/// Python spelling of a resolved type, as pydantic names parametrized
/// models (`Page[Item]`, `Page[List[int]]`).
fn type_label(ty: &FieldType) -> String {
    fn join(items: &[FieldType]) -> String {
        items.iter().map(type_label).collect::<Vec<_>>().join(", ")
    }
    match ty {
        FieldType::Any => "Any".to_string(),
        FieldType::Null => "None".to_string(),
        FieldType::Bool => "bool".to_string(),
        FieldType::Int => "int".to_string(),
        FieldType::Float => "float".to_string(),
        FieldType::Str => "str".to_string(),
        FieldType::Bytes => "bytes".to_string(),
        FieldType::Decimal => "Decimal".to_string(),
        FieldType::Formatted(format) => format_label(*format).to_string(),
        FieldType::List(item) => format!("List[{}]", type_label(item)),
        FieldType::Set(item) => format!("Set[{}]", type_label(item)),
        FieldType::Tuple {
            items,
            variadic: true,
        } => format!("Tuple[{}, ...]", join(items)),
        FieldType::Tuple { items, .. } => format!("Tuple[{}]", join(items)),
        FieldType::Dict { key, value } => {
            format!("Dict[{}, {}]", type_label(key), type_label(value))
        }
        FieldType::Optional(inner) => format!("Optional[{}]", type_label(inner)),
        FieldType::Union(members) => format!("Union[{}]", join(members)),
        FieldType::Literal(values) => format!(
            "Literal[{}]",
            values
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        FieldType::Ref(id) => id.name.clone(),
        FieldType::Unresolved(text) => text.clone(),
    }
}

fn format_label(format: StringFormat) -> &'static str {
    match format {
        StringFormat::DateTime => "datetime",
        StringFormat::Date => "date",
        StringFormat::Time => "time",
        StringFormat::Duration => "timedelta",
        StringFormat::Uuid => "UUID",
        StringFormat::Email => "EmailStr",
        StringFormat::Uri => "AnyUrl",
        StringFormat::Path => "Path",
        StringFormat::Ipv4 => "IPv4Address",
        StringFormat::Ipv6 => "IPv6Address",
    }
}

/// Replace a field of the same name in place, or append.
fn upsert(fields: &mut Vec<Field>, field: Field) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Strip the module of well-known stdlib and pydantic names.
fn external_name(qualified: &str) -> &str {
    match qualified.rsplit_once('.') {
        Some((module, name))
            if KNOWN_MODULES.contains(&module) || module.split('.').next() == Some("pydantic") =>
        {
            name
        }
        _ => qualified,
    }
}

fn external_kind(qualified: &str) -> Kind {
    match qualified {
        "pydantic.BaseModel"
        | "pydantic.main.BaseModel"
        | "pydantic.v1.BaseModel"
        | "pydantic.v1.main.BaseModel" => Kind::Model,
        "pydantic.generics.GenericModel" | "pydantic.v1.generics.GenericModel" => {
            Kind::GenericModel
        }
        "enum.Enum" | "enum.IntEnum" | "enum.Flag" | "enum.IntFlag" => Kind::Enum,
        "enum.StrEnum" => Kind::StrEnum,
        _ => Kind::Plain,
    }
}

fn scalar(name: &str) -> Option<FieldType> {
    let ty = match name {
        "str" | "StrictStr" | "SecretStr" | "constr" | "ConstrainedStr" | "IPvAnyAddress" => {
            FieldType::Str
        }
        "int" | "StrictInt" | "PositiveInt" | "NegativeInt" | "NonNegativeInt"
        | "NonPositiveInt" | "conint" => FieldType::Int,
        "float" | "StrictFloat" | "PositiveFloat" | "NegativeFloat" | "NonNegativeFloat"
        | "NonPositiveFloat" | "confloat" => FieldType::Float,
        "bool" | "StrictBool" => FieldType::Bool,
        "bytes" | "StrictBytes" | "conbytes" => FieldType::Bytes,
        "Decimal" | "condecimal" => FieldType::Decimal,
        "Any" | "object" | "Json" | "JsonValue" => FieldType::Any,
        "NoneType" => FieldType::Null,
        "datetime" | "AwareDatetime" | "NaiveDatetime" | "PastDatetime" | "FutureDatetime" => {
            FieldType::Formatted(StringFormat::DateTime)
        }
        "date" | "PastDate" | "FutureDate" => FieldType::Formatted(StringFormat::Date),
        "time" => FieldType::Formatted(StringFormat::Time),
        "timedelta" => FieldType::Formatted(StringFormat::Duration),
        "UUID" | "UUID1" | "UUID3" | "UUID4" | "UUID5" => FieldType::Formatted(StringFormat::Uuid),
        "EmailStr" | "NameEmail" => FieldType::Formatted(StringFormat::Email),
        "AnyUrl" | "AnyHttpUrl" | "HttpUrl" | "FileUrl" | "Url" => {
            FieldType::Formatted(StringFormat::Uri)
        }
        "Path" | "PurePath" | "FilePath" | "DirectoryPath" | "NewPath" => {
            FieldType::Formatted(StringFormat::Path)
        }
        "IPv4Address" => FieldType::Formatted(StringFormat::Ipv4),
        "IPv6Address" => FieldType::Formatted(StringFormat::Ipv6),
        "List" | "list" | "Sequence" => FieldType::List(Box::new(FieldType::Any)),
        "Set" | "set" | "FrozenSet" | "frozenset" => FieldType::Set(Box::new(FieldType::Any)),
        "Tuple" | "tuple" => FieldType::Tuple {
            items: vec![FieldType::Any],
            variadic: true,
        },
        "Dict" | "dict" | "Mapping" => FieldType::Dict {
            key: Box::new(FieldType::Str),
            value: Box::new(FieldType::Any),
        },
        _ => return None,
    };
    Some(ty)
}

/// `Literal[...]`; a `None` member makes the literal optional.
fn literal(args: &[TypeExpr]) -> Option<FieldType> {
    let mut values = Vec::new();
    let mut nullable = false;
    for arg in args {
        match arg {
            TypeExpr::Str(s) => values.push(Value::String(s.clone())),
            TypeExpr::Int(i) => values.push(Value::from(*i)),
            TypeExpr::Bool(b) => values.push(Value::Bool(*b)),
            TypeExpr::Name(name) if name == "None" => nullable = true,
            _ => return None,
        }
    }
    let ty = if values.is_empty() {
        FieldType::Null
    } else {
        FieldType::Literal(values)
    };
    Some(if nullable { FieldType::optional(ty) } else { ty })
}

fn describe(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Name(name) | TypeExpr::Call(name) => name.clone(),
        TypeExpr::Subscript { base, .. } => format!("{}[...]", base),
        TypeExpr::Str(s) => format!("{:?}", s),
        TypeExpr::Int(i) => i.to_string(),
        TypeExpr::Bool(true) => "True".to_string(),
        TypeExpr::Bool(false) => "False".to_string(),
        TypeExpr::Ellipsis => "...".to_string(),
        TypeExpr::Union(_) => "union".to_string(),
        TypeExpr::List(_) => "[...]".to_string(),
        TypeExpr::Other(text) => text.clone(),
    }
}

fn extra_value(expr: &Expr) -> Option<ExtraFields> {
    expr.as_str()
        .or_else(|| expr.last_segment())
        .and_then(ExtraFields::parse)
}

fn static_default(expr: &Expr) -> FieldDefault {
    match expr.to_json() {
        Some(value) => FieldDefault::Literal(value),
        None => FieldDefault::Opaque,
    }
}

/// Interpret `Field(...)` keyword arguments.
fn apply_field_call(field: &mut Field, args: &[Expr], kwargs: &[(String, Expr)]) {
    let kwarg = |name: &str| Expr::kwarg(kwargs, name);
    let text = |name: &str| kwarg(name).and_then(Expr::as_str).map(str::to_string);

    field.default = match args.first().or_else(|| kwarg("default")) {
        Some(Expr::Ellipsis) => FieldDefault::Required,
        Some(value) => static_default(value),
        None if kwarg("default_factory").is_some() => FieldDefault::Factory,
        None => FieldDefault::Required,
    };

    field.alias = text("serialization_alias").or_else(|| text("alias"));
    field.description = text("description");
    field.title = text("title");

    let number = |name: &str| {
        kwarg(name)
            .and_then(Expr::to_json)
            .filter(Value::is_number)
    };
    let length = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| kwarg(name).and_then(Expr::to_json))
            .and_then(|v| v.as_u64())
    };

    field.constraints = Constraints {
        minimum: number("ge"),
        exclusive_minimum: number("gt"),
        maximum: number("le"),
        exclusive_maximum: number("lt"),
        min_length: length(&["min_length", "min_items"]),
        max_length: length(&["max_length", "max_items"]),
        pattern: text("pattern").or_else(|| text("regex")),
    };
}
