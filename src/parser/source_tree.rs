//! Lazy module loading from a Python source root.
//!
//! Modules are located by dotted name relative to the root, parsed on first
//! use and cached, including the fact that a module could not be found.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use super::python::{ParseError, ParseResult, PythonParser};
use super::types::ParsedModule;

/// A Python source root with a cache of parsed modules.
pub struct SourceTree {
    root: PathBuf,
    parser: PythonParser,
    modules: HashMap<String, Option<ParsedModule>>,
}

impl SourceTree {
    /// Create a source tree rooted at `root`.
    ///
    /// The root is canonicalized when it exists so that file targets spelled
    /// relative to the working directory and absolute ones map to the same
    /// module names.
    pub fn new(root: impl Into<PathBuf>) -> ParseResult<Self> {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Ok(Self {
            root,
            parser: PythonParser::new()?,
            modules: HashMap::new(),
        })
    }

    /// Derive the dotted module name for a file under the root.
    ///
    /// `schemas/user.py` becomes `schemas.user` and `schemas/__init__.py`
    /// becomes `schemas`. Returns `None` for files outside the root.
    pub fn module_name_for_path(&self, path: &Path) -> Option<String> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if let Some(last) = parts.pop() {
            let stem = last.strip_suffix(".py").unwrap_or(&last).to_string();
            if stem != "__init__" {
                parts.push(stem);
            }
        }

        Some(parts.join("."))
    }

    /// Expand a command-line target into module names.
    ///
    /// A target may be a `.py` file, a directory (walked recursively) or a
    /// dotted module name resolved against the root.
    pub fn expand_target(&self, target: &str) -> ParseResult<Vec<String>> {
        let as_path = Path::new(target);
        let candidates = [as_path.to_path_buf(), self.root.join(as_path)];
        let mut outside = None;

        for candidate in candidates.iter() {
            let is_file = candidate.is_file() && is_python_file(candidate);
            if !is_file && !candidate.is_dir() {
                continue;
            }
            match self.module_name_for_path(candidate) {
                Some(name) if is_file && !name.is_empty() => return Ok(vec![name]),
                Some(_) if !is_file => return Ok(self.modules_in_dir(candidate)),
                _ => {
                    outside.get_or_insert_with(|| self.outside_root(candidate));
                }
            }
        }

        if self.locate(target).is_some() {
            return Ok(vec![target.to_string()]);
        }

        Err(outside.unwrap_or_else(|| ParseError::UnknownTarget(target.to_string())))
    }

    /// Find the file backing a dotted module name.
    pub fn locate(&self, module: &str) -> Option<PathBuf> {
        if module.is_empty() || module.split('.').any(|part| part.is_empty()) {
            return None;
        }
        let base = module
            .split('.')
            .fold(self.root.clone(), |path, part| path.join(part));

        let file = base.with_extension("py");
        if file.is_file() {
            return Some(file);
        }
        let package = base.join("__init__.py");
        if package.is_file() {
            return Some(package);
        }
        None
    }

    /// Parse a module on first use. Returns the cached result afterwards.
    pub fn load(&mut self, module: &str) -> Option<&ParsedModule> {
        if !self.modules.contains_key(module) {
            let parsed = self.parse_module(module);
            self.modules.insert(module.to_string(), parsed);
        }
        self.modules.get(module).and_then(Option::as_ref)
    }

    /// Parse a module that must exist, propagating read and parse errors.
    pub fn load_target(&mut self, module: &str) -> ParseResult<&ParsedModule> {
        if !matches!(self.modules.get(module), Some(Some(_))) {
            let path = self
                .locate(module)
                .ok_or_else(|| ParseError::UnknownTarget(module.to_string()))?;
            let parsed = self.parser.parse_file(&path, module)?;
            self.modules.insert(module.to_string(), Some(parsed));
        }
        self.get(module)
            .ok_or_else(|| ParseError::UnknownTarget(module.to_string()))
    }

    /// Look up an already loaded module.
    pub fn get(&self, module: &str) -> Option<&ParsedModule> {
        self.modules.get(module).and_then(Option::as_ref)
    }

    /// Iterate over every module loaded so far, in name order.
    pub fn loaded(&self) -> Vec<&ParsedModule> {
        let mut modules: Vec<_> = self.modules.values().flatten().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    fn parse_module(&mut self, module: &str) -> Option<ParsedModule> {
        let Some(path) = self.locate(module) else {
            debug!(module = module; "Module not found under source root");
            return None;
        };
        match self.parser.parse_file(&path, module) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(module = module, error = e.to_string(); "Failed to parse module");
                None
            }
        }
    }

    fn outside_root(&self, path: &Path) -> ParseError {
        ParseError::OutsideRoot {
            path: path.display().to_string(),
            root: self.root.display().to_string(),
        }
    }

    fn modules_in_dir(&self, dir: &Path) -> Vec<String> {
        let mut modules: Vec<String> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_python_file(e.path()))
            .filter_map(|e| self.module_name_for_path(e.path()))
            .filter(|name| !name.is_empty())
            .collect();
        modules.dedup();
        modules
    }
}

fn is_python_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "py")
}

/// Check if a directory should be ignored during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(
        name.as_ref(),
        "__pycache__"
            | ".git"
            | ".venv"
            | "venv"
            | "env"
            | ".tox"
            | ".mypy_cache"
            | ".pytest_cache"
            | "node_modules"
            | "build"
            | "dist"
            | "site-packages"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "schemas/__init__.py", "");
        write(dir.path(), "schemas/user.py", "class User:\n    id: int\n");
        write(dir.path(), "schemas/post.py", "class Post:\n    id: int\n");
        write(dir.path(), "schemas/__pycache__/user.py", "class Stale: pass\n");
        write(dir.path(), "schemas/notes.txt", "not python");
        dir
    }

    #[test]
    fn test_module_name_for_path() {
        let dir = fixture();
        let tree = SourceTree::new(dir.path()).unwrap();

        assert_eq!(
            tree.module_name_for_path(&dir.path().join("schemas/user.py")).as_deref(),
            Some("schemas.user")
        );
        assert_eq!(
            tree.module_name_for_path(&dir.path().join("schemas/__init__.py")).as_deref(),
            Some("schemas")
        );
        assert_eq!(
            tree.module_name_for_path(&dir.path().join("schemas/../schemas/post.py")).as_deref(),
            Some("schemas.post")
        );
    }

    #[test]
    fn test_absolute_file_target_with_relative_root() {
        let dir = tempfile::Builder::new().tempdir_in(".").unwrap();
        write(dir.path(), "schemas/user.py", "class User:\n    id: int\n");
        assert!(dir.path().is_relative());

        let mut tree = SourceTree::new(dir.path()).unwrap();
        let absolute = dir.path().canonicalize().unwrap().join("schemas/user.py");

        let modules = tree.expand_target(&absolute.display().to_string()).unwrap();
        assert_eq!(modules, vec!["schemas.user"]);
        assert_eq!(tree.load_target("schemas.user").unwrap().classes[0].name, "User");
    }

    #[test]
    fn test_file_outside_root_is_rejected() {
        let root = fixture();
        let other = TempDir::new().unwrap();
        write(other.path(), "loose.py", "class Loose:\n    id: int\n");
        let tree = SourceTree::new(root.path()).unwrap();

        let target = other.path().join("loose.py").display().to_string();
        assert!(matches!(
            tree.expand_target(&target),
            Err(ParseError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn test_expand_dotted_target() {
        let dir = fixture();
        let tree = SourceTree::new(dir.path()).unwrap();

        assert_eq!(tree.expand_target("schemas.user").unwrap(), vec!["schemas.user"]);
        assert_eq!(tree.expand_target("schemas").unwrap().len(), 3);
    }

    #[test]
    fn test_expand_directory_skips_ignored() {
        let dir = fixture();
        let tree = SourceTree::new(dir.path()).unwrap();

        let modules = tree
            .expand_target(&dir.path().join("schemas").display().to_string())
            .unwrap();
        assert_eq!(modules, vec!["schemas", "schemas.post", "schemas.user"]);
    }

    #[test]
    fn test_expand_unknown_target() {
        let dir = fixture();
        let tree = SourceTree::new(dir.path()).unwrap();

        assert!(matches!(
            tree.expand_target("schemas.missing"),
            Err(ParseError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_load_caches_missing_modules() {
        let dir = fixture();
        let mut tree = SourceTree::new(dir.path()).unwrap();

        assert!(tree.load("pydantic").is_none());
        assert!(tree.load("pydantic").is_none());
        assert_eq!(tree.load("schemas.user").unwrap().classes[0].name, "User");
        assert_eq!(tree.loaded().len(), 1);
    }

    #[test]
    fn test_load_target_errors() {
        let dir = fixture();
        let mut tree = SourceTree::new(dir.path()).unwrap();

        assert!(tree.load_target("schemas.post").is_ok());
        assert!(tree.load_target("schemas.nope").is_err());
    }
}
