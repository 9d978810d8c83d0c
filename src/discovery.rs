//! Build driver for the boundary transform.
//!
//! Recursively scans a source tree for candidate modules, transforms each
//! one, and emits the client and server manifests the runtime consumes.
//! Internal module ids are positions in the path-sorted module list, so
//! repeated builds of the same tree produce identical artifacts.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache::IncrementalCache;
use crate::codegen::TransformOptions;
use crate::manifest::{reference_id, ClientManifest, ImportManifestEntry, ServerManifest};
use crate::resolve::FsModuleHost;
use crate::transform::{
    module_id_for_path, transform_module_if_needed, BoundaryKind, TransformOutput,
};

const MODULE_EXTENSIONS: &[&str] = &["js", "mjs", "jsx"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub path: String,
    pub output: TransformOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub modules: Vec<ModuleRecord>,
    pub client_manifest: ClientManifest,
    pub server_manifest: ServerManifest,
}

/// Recursively find all candidate module files in a directory. Dependency
/// trees under node_modules are the resolver's concern, not the build's.
fn find_module_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
        let path = entry.path();
        if path.components().any(|c| c.as_os_str() == "node_modules") {
            continue;
        }
        if path.is_file() {
            if let Some(ext) = path.extension() {
                if MODULE_EXTENSIONS.iter().any(|candidate| ext == *candidate) {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    files
}

/// Transform every ES module under `base_dir` and assemble the manifests.
pub fn run_build(
    base_dir: &Path,
    host: &FsModuleHost,
    options: &TransformOptions,
    cache: Option<&IncrementalCache>,
) -> BuildOutput {
    let mut files = find_module_files(base_dir);
    files.sort();

    let modules: Vec<ModuleRecord> = files
        .par_iter()
        .filter_map(|path| {
            if !host.is_es_module(path) {
                return None;
            }

            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    log::error!("failed to read {}: {}", path.display(), e);
                    return None;
                }
            };

            let path_str = path.to_string_lossy().to_string();
            let output = match cache {
                Some(cache) => match cache.get(&path_str, &source) {
                    Some(hit) => hit,
                    None => {
                        let output = transform_module_if_needed(&source, path, host, options);
                        cache.set(&path_str, &source, output.clone());
                        output
                    }
                },
                None => transform_module_if_needed(&source, path, host, options),
            };

            Some(ModuleRecord {
                path: path_str,
                output,
            })
        })
        .collect();

    let mut client_manifest = ClientManifest::new();
    let mut server_manifest = ServerManifest::new();

    for (index, record) in modules.iter().enumerate() {
        let module_id = match &record.output.module_id {
            Some(module_id) => module_id.clone(),
            None => match module_id_for_path(Path::new(&record.path)) {
                Some(module_id) => module_id,
                None => continue,
            },
        };

        let internal_id = index.to_string();
        let chunk_file = Path::new(&record.path)
            .file_stem()
            .map(|stem| format!("{}.js", stem.to_string_lossy()))
            .unwrap_or_else(|| "chunk.js".to_string());
        let chunks = vec![internal_id.clone(), chunk_file];

        // Every module in the graph gets a server manifest entry; the
        // capability tag, not manifest membership, gates invocation.
        server_manifest.insert(
            module_id.clone(),
            ImportManifestEntry {
                id: internal_id.clone(),
                chunks: chunks.clone(),
                name: "*".to_string(),
            },
        );

        if record.output.kind == BoundaryKind::Client {
            for name in &record.output.export_names {
                client_manifest.insert(
                    reference_id(&module_id, name),
                    ImportManifestEntry {
                        id: internal_id.clone(),
                        chunks: chunks.clone(),
                        name: name.clone(),
                    },
                );
            }
        }
    }

    BuildOutput {
        modules,
        client_manifest,
        server_manifest,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn discover_boundary_modules_native(base_dir: String) -> serde_json::Value {
    let host = FsModuleHost::new();
    let output = run_build(
        Path::new(&base_dir),
        &host,
        &TransformOptions::default(),
        None,
    );
    serde_json::to_value(output).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn seed_tree(root: &Path) {
        write(&root.join("package.json"), r#"{"type": "module"}"#);
        write(
            &root.join("src/actions.js"),
            "\"use server\";\nexport async function save(x) { return x; }\nexport const limit = 10;",
        );
        write(
            &root.join("src/button.jsx"),
            "\"use client\";\nexport default function Button() { return null; }\nexport function Label() { return null; }",
        );
        write(&root.join("src/util.js"), "export const shared = 1;");
    }

    #[test]
    fn test_build_emits_manifests_for_boundary_modules() {
        let dir = tempfile::tempdir().unwrap();
        seed_tree(dir.path());

        let host = FsModuleHost::new();
        let output = run_build(dir.path(), &host, &TransformOptions::default(), None);

        assert_eq!(output.modules.len(), 3);

        // Every module is recorded in the server manifest, keyed by its
        // file URL.
        assert_eq!(output.server_manifest.len(), 3);
        let (module_id, entry) = output
            .server_manifest
            .iter()
            .find(|(key, _)| key.ends_with("actions.js"))
            .unwrap();
        assert!(module_id.starts_with("file://"));
        assert_eq!(entry.name, "*");
        assert_eq!(entry.chunks.len(), 2);
        assert_eq!(entry.chunks[0], entry.id);

        // One client manifest entry per exported name.
        assert_eq!(output.client_manifest.len(), 2);
        assert!(output
            .client_manifest
            .keys()
            .any(|key| key.ends_with("button.jsx#default")));
        assert!(output
            .client_manifest
            .keys()
            .any(|key| key.ends_with("button.jsx#Label")));

        // The plain module passed through untouched.
        let util = output
            .modules
            .iter()
            .find(|record| record.path.ends_with("util.js"))
            .unwrap();
        assert_eq!(util.output.kind, BoundaryKind::None);
    }

    #[test]
    fn test_build_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        seed_tree(dir.path());

        let host = FsModuleHost::new();
        let first = run_build(dir.path(), &host, &TransformOptions::default(), None);
        let second = run_build(dir.path(), &host, &TransformOptions::default(), None);

        assert_eq!(first.server_manifest, second.server_manifest);
        assert_eq!(first.client_manifest, second.client_manifest);
    }

    #[test]
    fn test_non_esm_trees_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("package.json"), r#"{"name": "legacy"}"#);
        write(
            &dir.path().join("src/actions.js"),
            "\"use server\";\nexport function save() {}",
        );

        let host = FsModuleHost::new();
        let output = run_build(dir.path(), &host, &TransformOptions::default(), None);
        assert!(output.modules.is_empty());
        assert!(output.server_manifest.is_empty());
        assert!(output.client_manifest.is_empty());
    }

    #[test]
    fn test_cached_build_reuses_outputs() {
        let dir = tempfile::tempdir().unwrap();
        seed_tree(dir.path());
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::at(cache_dir.path().to_path_buf());

        let host = FsModuleHost::new();
        let first = run_build(dir.path(), &host, &TransformOptions::default(), Some(&cache));
        let second = run_build(dir.path(), &host, &TransformOptions::default(), Some(&cache));

        assert_eq!(first.server_manifest, second.server_manifest);
        assert_eq!(first.client_manifest, second.client_manifest);
    }
}
