//! Host module-resolution policy.
//!
//! The extractor follows bare `export * from` declarations into other
//! modules, which requires resolving a specifier to a concrete file and
//! loading its source. `ModuleHost` is that policy seam; `FsModuleHost` is
//! the filesystem implementation with Node-style lookup rules.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::{CompilerError, UNRESOLVED_REEXPORT};

/// Extensions tried, in order, when a specifier has no exact file match.
const EXTENSION_CANDIDATES: &[&str] = &["js", "mjs", "jsx"];

lazy_static! {
    /// Bare specifiers: scoped or unscoped package name, optional subpath.
    static ref BARE_SPECIFIER_RE: Regex =
        Regex::new(r"^(@[^/]+/[^/]+|[^@./][^/]*)(?:/(.+))?$").unwrap();
}

pub trait ModuleHost: Send + Sync {
    /// Resolve `specifier` as imported from a module in directory `context`.
    fn resolve(&self, context: &Path, specifier: &str) -> Result<PathBuf, CompilerError>;
    /// Load the source text of a previously resolved module.
    fn load(&self, path: &Path) -> Result<String, CompilerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageType {
    Module,
    CommonJs,
    Absent,
}

/// Filesystem host. Package.json lookups are cached behind a mutex so one
/// host instance can serve the parallel transform pass.
#[derive(Default)]
pub struct FsModuleHost {
    package_type_cache: Mutex<HashMap<PathBuf, PackageType>>,
}

impl FsModuleHost {
    pub fn new() -> Self {
        FsModuleHost {
            package_type_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Walk up from `file` to the nearest package.json and report whether it
    /// declares `"type": "module"`. The walk stops at the volume root or at
    /// a `node_modules` boundary; a missing or unreadable package.json keeps
    /// walking.
    pub fn is_es_module(&self, file: &Path) -> bool {
        let mut dir = match file.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return false,
        };

        loop {
            if dir.file_name().is_some_and(|name| name == "node_modules") {
                return false;
            }

            match self.package_type(&dir.join("package.json")) {
                PackageType::Module => return true,
                PackageType::CommonJs => return false,
                PackageType::Absent => {}
            }

            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => return false,
            }
        }
    }

    fn package_type(&self, package_path: &Path) -> PackageType {
        if let Ok(cache) = self.package_type_cache.lock() {
            if let Some(cached) = cache.get(package_path) {
                return *cached;
            }
        }

        let parsed: Option<Value> = fs::read_to_string(package_path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());

        let package_type = match parsed {
            Some(manifest) => {
                if manifest.get("type").and_then(Value::as_str) == Some("module") {
                    PackageType::Module
                } else {
                    PackageType::CommonJs
                }
            }
            None => PackageType::Absent,
        };

        if let Ok(mut cache) = self.package_type_cache.lock() {
            cache.insert(package_path.to_path_buf(), package_type);
        }

        package_type
    }

    fn resolve_bare(&self, context: &Path, specifier: &str) -> Option<PathBuf> {
        let caps = BARE_SPECIFIER_RE.captures(specifier)?;
        let package = caps.get(1)?.as_str();
        let subpath = caps.get(2).map(|m| m.as_str());

        let mut dir = Some(context);
        while let Some(current) = dir {
            let package_dir = current.join("node_modules").join(package);
            if package_dir.is_dir() {
                return match subpath {
                    Some(sub) => resolve_file(&package_dir.join(sub)),
                    None => resolve_package_entry(&package_dir),
                };
            }
            dir = current.parent();
        }

        None
    }
}

impl ModuleHost for FsModuleHost {
    fn resolve(&self, context: &Path, specifier: &str) -> Result<PathBuf, CompilerError> {
        let resolved = if specifier.starts_with("./") || specifier.starts_with("../") {
            resolve_file(&context.join(specifier))
        } else if specifier.starts_with('/') {
            resolve_file(Path::new(specifier))
        } else {
            self.resolve_bare(context, specifier)
        };

        resolved.ok_or_else(|| {
            CompilerError::new(
                UNRESOLVED_REEXPORT,
                &format!("Cannot resolve \"{}\"", specifier),
                &context.display().to_string(),
                0,
                0,
            )
        })
    }

    fn load(&self, path: &Path) -> Result<String, CompilerError> {
        fs::read_to_string(path).map_err(|e| {
            CompilerError::new(
                UNRESOLVED_REEXPORT,
                &format!("Failed to read module: {}", e),
                &path.display().to_string(),
                0,
                0,
            )
        })
    }
}

/// Resolve a path to an existing file: exact match, then extension
/// candidates, then a directory index file. Canonicalized so the same file
/// always yields the same module identifier.
fn resolve_file(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return candidate.canonicalize().ok();
    }

    for ext in EXTENSION_CANDIDATES {
        let with_ext = PathBuf::from(format!("{}.{}", candidate.display(), ext));
        if with_ext.is_file() {
            return with_ext.canonicalize().ok();
        }
    }

    if candidate.is_dir() {
        for ext in EXTENSION_CANDIDATES {
            let index = candidate.join(format!("index.{}", ext));
            if index.is_file() {
                return index.canonicalize().ok();
            }
        }
    }

    None
}

fn resolve_package_entry(package_dir: &Path) -> Option<PathBuf> {
    let manifest: Option<Value> = fs::read_to_string(package_dir.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok());

    if let Some(manifest) = &manifest {
        for field in ["module", "main"] {
            if let Some(entry) = manifest.get(field).and_then(Value::as_str) {
                if let Some(resolved) = resolve_file(&package_dir.join(entry)) {
                    return Some(resolved);
                }
            }
        }
    }

    resolve_file(&package_dir.join("index"))
}
