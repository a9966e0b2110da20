//! Model discovery across a Python source tree.
//!
//! The locator walks modules with an explicit worklist. The entry module and
//! its package descendants are in scope; imports that resolve to files under
//! the search roots are loaded only to resolve names. Every module is visited
//! at most once, keyed by its canonical path, so import cycles terminate.

use crate::ir::{DefinitionId, EnumDefinition, ModelDefinition};
use crate::resolve;
use crate::syntax::{ImportDecl, ModuleSyntax};
use crate::traits::{DefinitionCatalog, ModuleReader, SchemaSource};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Error that can occur while loading the modules to inspect.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("module `{entry}` not found (searched {})", display_roots(.roots))]
    NotFound { entry: String, roots: Vec<PathBuf> },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot load {}: {message}", .path.display())]
    Syntax { path: PathBuf, message: String },

    #[error("unresolved import `{import}` in {}", .module.display())]
    UnresolvedImport { module: PathBuf, import: String },
}

fn display_roots(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// How a name is bound at module level.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    /// A class defined in this module.
    Class,
    /// `Name = expression`.
    Alias(crate::syntax::Expr),
    /// `from <in-tree module> import name`.
    Import { module: PathBuf, name: String },
    /// An in-tree module or package.
    Module(PathBuf),
    /// Anything outside the search roots, by qualified name.
    External(String),
}

/// One loaded module.
#[derive(Debug)]
pub(crate) struct ModuleUnit {
    /// Canonical path: the `.py` file, a package's `__init__.py`, or the
    /// directory of a namespace package.
    pub key: PathBuf,
    /// Dotted module name derived from the package chain.
    pub dotted: String,
    /// Directory holding submodules, for packages.
    pub package_dir: Option<PathBuf>,
    pub syntax: ModuleSyntax,
    pub bindings: HashMap<String, Binding>,
    /// Targets of `from <in-tree module> import *`.
    pub stars: Vec<PathBuf>,
    /// The entry module or one of its package descendants.
    pub in_scope: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Entry,
    Child,
    Import,
}

/// Definitions discovered from one entry point.
#[derive(Debug, Default)]
pub struct LocatedDefinitions {
    /// Concrete models defined in or bound by the modules in scope, in
    /// discovery order, unique by id.
    pub models: Vec<ModelDefinition>,
    /// Models outside the scope that located models refer to, including
    /// parametrized generics such as `Page[Item]`.
    pub dependencies: Vec<ModelDefinition>,
    /// Enums in discovery order, unique by id.
    pub enums: Vec<EnumDefinition>,
}

impl LocatedDefinitions {
    /// Located models followed by their dependencies.
    pub fn all_models(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.iter().chain(&self.dependencies)
    }
}

impl DefinitionCatalog for LocatedDefinitions {
    fn model(&self, id: &DefinitionId) -> Option<&dyn SchemaSource> {
        self.all_models()
            .find(|m| &m.id == id)
            .map(|m| m as &dyn SchemaSource)
    }

    fn enumeration(&self, id: &DefinitionId) -> Option<&EnumDefinition> {
        self.enums.iter().find(|e| &e.id == id)
    }
}

/// Finds model and enum definitions reachable from an entry module.
pub struct Locator<'r> {
    reader: &'r dyn ModuleReader,
    roots: Vec<PathBuf>,
}

impl<'r> Locator<'r> {
    pub fn new(reader: &'r dyn ModuleReader) -> Self {
        Self {
            reader,
            roots: Vec::new(),
        }
    }

    /// Directories that dotted module paths are resolved against.
    /// Defaults to the current directory.
    pub fn with_roots(mut self, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        self.roots.extend(roots);
        self
    }

    /// Discover every definition reachable from `entry`, a filesystem path
    /// or a dotted module path.
    pub fn locate(&self, entry: &str) -> Result<LocatedDefinitions, ResolutionError> {
        let mut roots = self.search_roots()?;
        let entry_key = self.resolve_entry(entry, &roots)?;
        if let Some(root) = self.package_tree_root(&entry_key)
            && !roots.contains(&root)
        {
            roots.push(root);
        }
        tracing::debug!(entry = %entry_key.display(), "resolved entry module");

        let units = self.traverse(entry_key, &roots)?;
        Ok(resolve::collect(&units, self.reader))
    }

    fn search_roots(&self) -> Result<Vec<PathBuf>, ResolutionError> {
        let configured = if self.roots.is_empty() {
            let cwd = std::env::current_dir().map_err(|source| ResolutionError::Io {
                path: PathBuf::from("."),
                source,
            })?;
            vec![cwd]
        } else {
            self.roots.clone()
        };

        let mut roots = Vec::new();
        for root in configured {
            match fs::canonicalize(&root) {
                Ok(root) if root.is_dir() => {
                    if !roots.contains(&root) {
                        roots.push(root);
                    }
                }
                _ => tracing::warn!(root = %root.display(), "ignoring missing search root"),
            }
        }
        Ok(roots)
    }

    fn resolve_entry(&self, entry: &str, roots: &[PathBuf]) -> Result<PathBuf, ResolutionError> {
        let path = Path::new(entry);
        if path.exists() {
            let canonical = fs::canonicalize(path).map_err(|source| ResolutionError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if canonical.is_dir() {
                let init = canonical.join(self.init_file());
                return Ok(if init.is_file() { init } else { canonical });
            }
            return Ok(canonical);
        }

        let segments: Vec<&str> = entry.split('.').collect();
        if !segments.iter().all(|s| is_identifier(s)) {
            return Err(ResolutionError::NotFound {
                entry: entry.to_string(),
                roots: roots.to_vec(),
            });
        }
        roots
            .iter()
            .find_map(|root| self.module_at(root, &segments))
            .ok_or_else(|| ResolutionError::NotFound {
                entry: entry.to_string(),
                roots: roots.to_vec(),
            })
    }

    /// Parent of the outermost package containing `key`, so absolute
    /// imports within that package tree resolve.
    fn package_tree_root(&self, key: &Path) -> Option<PathBuf> {
        let mut dir = if key.is_dir() {
            key.to_path_buf()
        } else {
            key.parent()?.to_path_buf()
        };
        while dir.join(self.init_file()).is_file() {
            dir = dir.parent()?.to_path_buf();
        }
        Some(dir)
    }

    fn traverse(
        &self,
        entry: PathBuf,
        roots: &[PathBuf],
    ) -> Result<Vec<ModuleUnit>, ResolutionError> {
        let mut units = Vec::new();
        let mut visited = HashSet::new();
        let mut skipped = HashSet::new();
        let mut queue = VecDeque::new();

        let scope = self.package_tree(&entry);
        visited.insert(entry.clone());
        queue.push_back((entry, Edge::Entry));
        for child in &scope {
            if visited.insert(child.clone()) {
                queue.push_back((child.clone(), Edge::Child));
            }
        }

        while let Some((key, edge)) = queue.pop_front() {
            let loaded = self
                .load(&key)
                .and_then(|unit| self.link(unit, roots));
            let (mut unit, edges) = match loaded {
                Ok(loaded) => loaded,
                Err(err) if edge == Edge::Child => {
                    tracing::warn!("skipping submodule: {}", err);
                    skipped.insert(key);
                    continue;
                }
                Err(err) => return Err(err),
            };
            unit.in_scope = edge == Edge::Entry || scope.contains(&unit.key);
            tracing::debug!(
                module = %unit.dotted,
                path = %unit.key.display(),
                in_scope = unit.in_scope,
                "visited module"
            );

            for (target, kind) in edges {
                if visited.insert(target.clone()) {
                    queue.push_back((target, kind));
                } else if kind == Edge::Import && skipped.remove(&target) {
                    // A skipped submodule that is imported must load.
                    queue.push_back((target, kind));
                }
            }
            units.push(unit);
        }

        Ok(units)
    }

    fn load(&self, key: &Path) -> Result<ModuleUnit, ResolutionError> {
        let (syntax, package_dir) = if key.is_dir() {
            (ModuleSyntax::default(), Some(key.to_path_buf()))
        } else {
            let source = fs::read_to_string(key).map_err(|source| ResolutionError::Io {
                path: key.to_path_buf(),
                source,
            })?;
            let syntax = self
                .reader
                .read(&source)
                .map_err(|err| ResolutionError::Syntax {
                    path: key.to_path_buf(),
                    message: err.to_string(),
                })?;
            let package_dir = if self.is_init(key) {
                key.parent().map(Path::to_path_buf)
            } else {
                None
            };
            (syntax, package_dir)
        };

        Ok(ModuleUnit {
            key: key.to_path_buf(),
            dotted: self.dotted_name(key),
            package_dir,
            syntax,
            bindings: HashMap::new(),
            stars: Vec::new(),
            in_scope: false,
        })
    }

    /// Bind imported names and collect outgoing edges.
    fn link(
        &self,
        mut unit: ModuleUnit,
        roots: &[PathBuf],
    ) -> Result<(ModuleUnit, Vec<(PathBuf, Edge)>), ResolutionError> {
        let mut edges = Vec::new();
        let mut bindings = HashMap::new();
        let mut stars = Vec::new();

        for import in &unit.syntax.imports {
            match import {
                ImportDecl::Module { path, alias } => {
                    let segments: Vec<&str> = path.split('.').collect();
                    // `import a.b.c` also imports `a` and `a.b`.
                    for end in 1..segments.len() {
                        if let Some(parent) = self.find_absolute(roots, &segments[..end]) {
                            edges.push((parent, Edge::Import));
                        }
                    }
                    let target = self.find_absolute(roots, &segments);
                    if let Some(target) = &target {
                        edges.push((target.clone(), Edge::Import));
                    }
                    match alias {
                        Some(alias) => {
                            let binding = match target {
                                Some(target) => Binding::Module(target),
                                None => Binding::External(path.clone()),
                            };
                            bindings.insert(alias.clone(), binding);
                        }
                        None => {
                            let head = segments[0];
                            let binding = match self.find_absolute(roots, &segments[..1]) {
                                Some(top) => Binding::Module(top),
                                None => Binding::External(head.to_string()),
                            };
                            bindings.insert(head.to_string(), binding);
                        }
                    }
                }
                ImportDecl::From {
                    level,
                    module,
                    names,
                    star,
                } => {
                    let segments: Vec<&str> = module
                        .as_deref()
                        .map(|m| m.split('.').collect())
                        .unwrap_or_default();

                    let target = if *level > 0 {
                        let resolved = self
                            .relative_base(&unit, *level)
                            .and_then(|base| self.module_at(&base, &segments));
                        match resolved {
                            Some(target) => Some(target),
                            None => {
                                return Err(ResolutionError::UnresolvedImport {
                                    module: unit.key.clone(),
                                    import: format!(
                                        "{}{}",
                                        ".".repeat(*level),
                                        module.as_deref().unwrap_or("")
                                    ),
                                });
                            }
                        }
                    } else {
                        self.find_absolute(roots, &segments)
                    };

                    let Some(target) = target else {
                        let prefix = module.as_deref().unwrap_or("");
                        for name in names {
                            bindings.insert(
                                name.binding().to_string(),
                                Binding::External(format!("{}.{}", prefix, name.name)),
                            );
                        }
                        continue;
                    };

                    edges.push((target.clone(), Edge::Import));
                    let target_dir = self.package_dir_of(&target);
                    for name in names {
                        let submodule = target_dir
                            .as_deref()
                            .and_then(|dir| self.module_at(dir, &[name.name.as_str()]));
                        let binding = match submodule {
                            Some(sub) => {
                                edges.push((sub.clone(), Edge::Import));
                                Binding::Module(sub)
                            }
                            None => Binding::Import {
                                module: target.clone(),
                                name: name.name.clone(),
                            },
                        };
                        bindings.insert(name.binding().to_string(), binding);
                    }
                    if *star {
                        stars.push(target);
                    }
                }
            }
        }

        for (name, value) in &unit.syntax.aliases {
            bindings.insert(name.clone(), Binding::Alias(value.clone()));
        }
        for class in &unit.syntax.classes {
            bindings.insert(class.name.clone(), Binding::Class);
        }
        unit.bindings = bindings;
        unit.stars = stars;

        Ok((unit, edges))
    }

    /// Submodules of `key` at any depth, breadth first.
    fn package_tree(&self, key: &Path) -> Vec<PathBuf> {
        let mut tree = Vec::new();
        let mut pending = VecDeque::from([key.to_path_buf()]);
        while let Some(current) = pending.pop_front() {
            let Some(dir) = self.package_dir_of(&current) else {
                continue;
            };
            for child in self.package_children(&dir) {
                if child != key && !tree.contains(&child) {
                    tree.push(child.clone());
                    pending.push_back(child);
                }
            }
        }
        tree
    }

    /// Immediate submodules of a package directory, in sorted order.
    fn package_children(&self, dir: &Path) -> Vec<PathBuf> {
        let init = self.init_file();
        let mut children = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') || name.starts_with("__pycache__") {
                continue;
            }

            let candidate = if entry.file_type().is_dir() {
                let child_init = path.join(&init);
                child_init.is_file().then_some(child_init)
            } else if name != init.as_str() && self.has_module_extension(path) {
                Some(path.to_path_buf())
            } else {
                None
            };

            if let Some(candidate) = candidate.and_then(|c| fs::canonicalize(c).ok()) {
                children.push(candidate);
            }
        }

        children
    }

    /// Directory a relative import of `level` dots starts from.
    fn relative_base(&self, unit: &ModuleUnit, level: usize) -> Option<PathBuf> {
        let mut base = match &unit.package_dir {
            Some(dir) => dir.clone(),
            None => unit.key.parent()?.to_path_buf(),
        };
        for _ in 1..level {
            base = base.parent()?.to_path_buf();
        }
        Some(base)
    }

    fn find_absolute(&self, roots: &[PathBuf], segments: &[&str]) -> Option<PathBuf> {
        if segments.is_empty() {
            return None;
        }
        roots.iter().find_map(|root| self.module_at(root, segments))
    }

    /// Resolve `dir/a/b` to a package `__init__`, a module file, or a
    /// namespace directory.
    fn module_at(&self, dir: &Path, segments: &[&str]) -> Option<PathBuf> {
        let mut path = dir.to_path_buf();
        for segment in segments {
            path.push(segment);
        }

        let init = path.join(self.init_file());
        if init.is_file() {
            return fs::canonicalize(init).ok();
        }
        if let Some(last) = segments.last() {
            for ext in self.reader.extensions() {
                let file = path.with_file_name(format!("{}.{}", last, ext));
                if file.is_file() {
                    return fs::canonicalize(file).ok();
                }
            }
        }
        if path.is_dir() {
            return fs::canonicalize(path).ok();
        }
        None
    }

    fn package_dir_of(&self, key: &Path) -> Option<PathBuf> {
        if key.is_dir() {
            Some(key.to_path_buf())
        } else if self.is_init(key) {
            key.parent().map(Path::to_path_buf)
        } else {
            None
        }
    }

    fn dotted_name(&self, key: &Path) -> String {
        let base = self.package_dir_of(key).unwrap_or_else(|| key.with_extension(""));
        let mut parts = Vec::new();
        if let Some(name) = base.file_name() {
            parts.push(name.to_string_lossy().into_owned());
        }

        let init = self.init_file();
        let mut dir = base.parent();
        while let Some(current) = dir {
            if !current.join(&init).is_file() {
                break;
            }
            let Some(name) = current.file_name() else {
                break;
            };
            parts.push(name.to_string_lossy().into_owned());
            dir = current.parent();
        }

        parts.reverse();
        parts.join(".")
    }

    fn init_file(&self) -> String {
        let ext = self.reader.extensions().first().copied().unwrap_or("py");
        format!("{}.{}", self.reader.package_marker(), ext)
    }

    fn is_init(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy() == self.init_file())
    }

    fn has_module_extension(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.reader.extensions().iter().any(|e| ext == *e))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Discover Python definitions reachable from `entry`.
#[cfg(feature = "read-python")]
pub fn locate(entry: &str, roots: &[PathBuf]) -> Result<LocatedDefinitions, ResolutionError> {
    Locator::new(&crate::input::PYTHON_READER)
        .with_roots(roots.iter().cloned())
        .locate(entry)
}

#[cfg(all(test, feature = "read-python"))]
mod tests {
    use super::*;
    use crate::input::PYTHON_READER;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn dotted_names_follow_package_chain() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "shelter/__init__.py", "");
        write(tmp.path(), "shelter/animals/__init__.py", "");
        write(tmp.path(), "shelter/animals/cats.py", "");

        let locator = Locator::new(&PYTHON_READER);
        let root = fs::canonicalize(tmp.path()).unwrap();
        assert_eq!(
            locator.dotted_name(&root.join("shelter/animals/cats.py")),
            "shelter.animals.cats"
        );
        assert_eq!(
            locator.dotted_name(&root.join("shelter/animals/__init__.py")),
            "shelter.animals"
        );
        assert_eq!(locator.dotted_name(&root.join("shelter")), "shelter");
    }

    #[test]
    fn dotted_entry_resolves_against_roots() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "api/__init__.py", "");
        write(tmp.path(), "api/schemas.py", "");

        let locator = Locator::new(&PYTHON_READER);
        let roots = vec![fs::canonicalize(tmp.path()).unwrap()];
        let key = locator.resolve_entry("api.schemas", &roots).unwrap();
        assert!(key.ends_with("api/schemas.py"));

        let err = locator.resolve_entry("api.missing", &roots).unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { .. }));
    }

    #[test]
    fn package_tree_covers_nested_packages_only() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "pkg/__init__.py", "");
        write(tmp.path(), "pkg/a.py", "");
        write(tmp.path(), "pkg/sub/__init__.py", "");
        write(tmp.path(), "pkg/sub/deep.py", "");
        write(tmp.path(), "other/__init__.py", "");

        let locator = Locator::new(&PYTHON_READER);
        let root = fs::canonicalize(tmp.path()).unwrap();
        let tree: Vec<String> = locator
            .package_tree(&root.join("pkg/__init__.py"))
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(tree, ["pkg/a.py", "pkg/sub/__init__.py", "pkg/sub/deep.py"]);

        assert!(locator.package_tree(&root.join("pkg/a.py")).is_empty());
    }

    #[test]
    fn package_children_are_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "pkg/__init__.py", "");
        write(tmp.path(), "pkg/b.py", "");
        write(tmp.path(), "pkg/a.py", "");
        write(tmp.path(), "pkg/notes.txt", "");
        write(tmp.path(), "pkg/sub/__init__.py", "");
        write(tmp.path(), "pkg/data/readme.md", "");

        let locator = Locator::new(&PYTHON_READER);
        let dir = fs::canonicalize(tmp.path().join("pkg")).unwrap();
        let names: Vec<String> = locator
            .package_children(&dir)
            .iter()
            .map(|p| {
                p.strip_prefix(&dir)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, ["a.py", "b.py", "sub/__init__.py"]);
    }
}
