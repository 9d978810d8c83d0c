//! # Boundary Compiler Core
//!
//! Build-time module boundary transform plus the run-time reference
//! registry and dispatch used to resolve and invoke boundary-crossing
//! calls.
//!
//! ## Ground Rules
//!
//! 1. **Module Identifier**: every boundary module is identified by its
//!    canonical `file://` URL, never by a bundler-internal id, so
//!    identifiers stay stable across independent builds of the same tree.
//!
//! 2. **Directive Prologue**: only leading string-literal statements
//!    classify a module; `"use client"` wins when both markers appear.
//!    Modules without a directive are passed through untouched, behind a
//!    substring pre-check that avoids parsing them at all.
//!
//! 3. **Capability Tag**: dispatch invokes a value only when it is a
//!    tagged server reference. Reachable-but-untagged exports are
//!    rejected with a generic error, whatever the caller's intent.
//!
//! 4. **Best-Effort Analysis**: a module that fails to parse or resolve
//!    contributes no export names and never aborts a build.
//!
//! 5. **Registration Transparency**: tagging a server function does not
//!    change its behavior for legitimate in-process callers.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod cache;
mod codegen;
mod discovery;
mod dispatch;
mod errors;
mod extract;
mod manifest;
mod registry;
mod resolve;
mod transform;

#[cfg(test)]
mod boundary_tests;

pub use cache::{CacheEntry, IncrementalCache};
pub use codegen::{transform_client_module, TransformOptions};
pub use discovery::{run_build, BuildOutput, ModuleRecord};
pub use dispatch::{dispatch, DispatchOutcome};
pub use errors::{
    client_stub_message, CompilerError, DirectInvocationForbidden, DispatchError, InvokeError,
    CYCLIC_REEXPORT, INVALID_RESOURCE_PATH, PARSE_ERROR, UNRESOLVED_REEXPORT,
};
pub use extract::{extract_export_names, Extraction};
pub use manifest::{
    manifest_from_json, manifest_to_json, reference_id, split_reference_id, ClientManifest,
    ImportManifestEntry, ServerManifest,
};
pub use registry::{
    is_server_reference, register_client_reference, register_server_reference, ClientReference,
    Completion, InMemoryModuleStore, Invocation, ModuleExport, ModuleExports, ModuleStore,
    Registry, ServerHandler, ServerReference,
};
pub use resolve::{FsModuleHost, ModuleHost};
pub use transform::{
    module_id_for_path, transform_module_if_needed, BoundaryKind, TransformOutput,
};

#[cfg(feature = "napi")]
pub use discovery::discover_boundary_modules_native;
#[cfg(feature = "napi")]
pub use transform::{extract_export_names_native, transform_module_native};

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "Boundary Native Bridge Connected".to_string()
}
