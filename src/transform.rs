//! Module boundary transform.
//!
//! Classifies a module by its directive prologue and rewrites it: client
//! boundaries become placeholder stubs, server boundaries gain registration
//! calls, everything else passes through untouched. The common case is the
//! untouched one, so a cheap substring check runs before any parse.

#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::codegen::{
    collect_local_export_names, render_server_module, transform_client_module, TransformOptions,
};
use crate::errors::{CompilerError, INVALID_RESOURCE_PATH, PARSE_ERROR};
use crate::extract::{module_source_type, parse_export_names_into};
use crate::resolve::ModuleHost;
#[cfg(feature = "napi")]
use crate::resolve::FsModuleHost;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryKind {
    None,
    Client,
    Server,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub code: String,
    pub kind: BoundaryKind,
    pub module_id: Option<String>,
    /// Exported names of the boundary module; the client manifest carries
    /// one entry per export.
    pub export_names: Vec<String>,
    pub errors: Vec<CompilerError>,
}

impl TransformOutput {
    fn passthrough(source: &str) -> Self {
        TransformOutput {
            code: source.to_string(),
            kind: BoundaryKind::None,
            module_id: None,
            export_names: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Canonical module identifier for a resource path: its absolute file URL.
pub fn module_id_for_path(path: &Path) -> Option<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Url::from_file_path(absolute).ok().map(|url| url.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrite a module according to its boundary directive, or return it
/// unchanged. Re-running on already-generated output is a no-op because the
/// generated code carries no directive prologue.
pub fn transform_module_if_needed(
    source: &str,
    resource_path: &Path,
    host: &dyn ModuleHost,
    options: &TransformOptions,
) -> TransformOutput {
    // The overwhelming majority of modules carry no directive; skip the
    // parse for them.
    if !source.contains("use client") && !source.contains("use server") {
        return TransformOutput::passthrough(source);
    }

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, module_source_type()).parse();
    if !ret.errors.is_empty() {
        log::error!(
            "failed to parse {}: {} error(s)",
            resource_path.display(),
            ret.errors.len()
        );
        let mut output = TransformOutput::passthrough(source);
        output.errors.push(CompilerError::new(
            PARSE_ERROR,
            "Module source failed to parse",
            &resource_path.display().to_string(),
            0,
            0,
        ));
        return output;
    }

    let mut use_client = false;
    let mut use_server = false;
    for directive in &ret.program.directives {
        if directive.directive == "use client" {
            use_client = true;
        }
        if directive.directive == "use server" {
            use_server = true;
        }
    }

    if !use_client && !use_server {
        return TransformOutput::passthrough(source);
    }

    let Some(module_id) = module_id_for_path(resource_path) else {
        let mut output = TransformOutput::passthrough(source);
        output.errors.push(CompilerError::new(
            INVALID_RESOURCE_PATH,
            "Resource path has no file URL form",
            &resource_path.display().to_string(),
            0,
            0,
        ));
        return output;
    };

    if use_client {
        let mut names = indexmap::IndexSet::new();
        let mut errors = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(module_id.clone());

        // The module id is a file URL by construction.
        if let Ok(module_url) = Url::parse(&module_id) {
            parse_export_names_into(
                &ret.program,
                &mut names,
                &module_url,
                host,
                &mut visited,
                &mut errors,
            );
        }

        let code = transform_client_module(&names, &module_id, options);
        TransformOutput {
            code,
            kind: BoundaryKind::Client,
            module_id: Some(module_id),
            export_names: names.into_iter().collect(),
            errors,
        }
    } else {
        let exports = collect_local_export_names(&ret.program);
        let export_names = exports.locals.values().cloned().collect();
        let code = render_server_module(source, &exports, &module_id, options);
        TransformOutput {
            code,
            kind: BoundaryKind::Server,
            module_id: Some(module_id),
            export_names,
            errors: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn transform_module_native(
    source: String,
    resource_path: String,
) -> napi::Result<serde_json::Value> {
    let host = FsModuleHost::new();
    let output = transform_module_if_needed(
        &source,
        Path::new(&resource_path),
        &host,
        &TransformOptions::default(),
    );
    serde_json::to_value(output).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn extract_export_names_native(
    source: String,
    resource_path: String,
) -> napi::Result<Vec<String>> {
    let module_id = module_id_for_path(Path::new(&resource_path))
        .ok_or_else(|| napi::Error::from_reason("resource path has no file URL form"))?;
    let module_url =
        Url::parse(&module_id).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let host = FsModuleHost::new();
    let extraction = crate::extract::extract_export_names(&source, &module_url, &host);
    Ok(extraction.names.into_iter().collect())
}
