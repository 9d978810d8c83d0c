//! Reference registry: capability tagging and resolution.
//!
//! A value crosses the boundary only if it was deliberately registered. The
//! capability tag is the `ModuleExport::Server` variant itself: dispatch
//! matches on the variant, so nothing reachable-but-untagged can ever pass,
//! no matter how it was obtained from the loaded module.
//!
//! The registry is written during module initialization and read-only
//! afterwards; construct it once per process and pass it by reference.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{DirectInvocationForbidden, InvokeError};
use crate::manifest::{reference_id, ClientManifest, ImportManifestEntry, ServerManifest};

// ═══════════════════════════════════════════════════════════════════════════════
// INVOCATION
// ═══════════════════════════════════════════════════════════════════════════════

pub type Completion = Box<dyn FnOnce() -> Result<(), InvokeError> + Send>;

/// The product of one server-function invocation. `completion` is work the
/// function scheduled after producing its value; its failure is reported
/// through the dispatch side channel and never discards the value.
pub struct Invocation {
    pub value: Value,
    pub completion: Option<Completion>,
}

impl Invocation {
    pub fn immediate(value: Value) -> Self {
        Invocation {
            value,
            completion: None,
        }
    }

    pub fn with_completion(
        value: Value,
        completion: impl FnOnce() -> Result<(), InvokeError> + Send + 'static,
    ) -> Self {
        Invocation {
            value,
            completion: Some(Box::new(completion)),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("value", &self.value)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

pub type ServerHandler = Arc<dyn Fn(Vec<Value>) -> Result<Invocation, InvokeError> + Send + Sync>;

// ═══════════════════════════════════════════════════════════════════════════════
// REFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// A tagged server function: invokable across the boundary, transparent to
/// legitimate in-process callers.
#[derive(Clone)]
pub struct ServerReference {
    module_id: String,
    export_name: String,
    handler: ServerHandler,
}

impl ServerReference {
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    pub fn reference_id(&self) -> String {
        reference_id(&self.module_id, &self.export_name)
    }

    /// Direct local call; registration does not change call semantics.
    pub fn call(&self, args: Vec<Value>) -> Result<Invocation, InvokeError> {
        (self.handler)(args)
    }
}

impl fmt::Debug for ServerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerReference")
            .field("module_id", &self.module_id)
            .field("export_name", &self.export_name)
            .finish()
    }
}

/// A placeholder for a value that lives in the client context. The origin
/// process can describe it for the wire but never call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReference {
    module_id: String,
    export_name: String,
}

impl ClientReference {
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    pub fn reference_id(&self) -> String {
        reference_id(&self.module_id, &self.export_name)
    }

    pub fn call(&self, _args: Vec<Value>) -> Result<Value, DirectInvocationForbidden> {
        Err(DirectInvocationForbidden::new(
            &self.module_id,
            &self.export_name,
        ))
    }

    /// Loader metadata used when the server describes this reference for
    /// the external codec.
    pub fn describe<'a>(&self, manifest: &'a ClientManifest) -> Option<&'a ImportManifestEntry> {
        manifest.get(&self.reference_id())
    }
}

/// One slot in a module's export table.
#[derive(Debug, Clone)]
pub enum ModuleExport {
    /// An export that was never tagged; present but not invokable.
    Value(Value),
    Client(ClientReference),
    Server(ServerReference),
}

pub fn is_server_reference(export: &ModuleExport) -> bool {
    matches!(export, ModuleExport::Server(_))
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRATION ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn register_client_reference(module_id: &str, export_name: &str) -> ClientReference {
    ClientReference {
        module_id: module_id.to_string(),
        export_name: export_name.to_string(),
    }
}

pub fn register_server_reference<F>(
    handler: F,
    module_id: &str,
    export_name: &str,
) -> ServerReference
where
    F: Fn(Vec<Value>) -> Result<Invocation, InvokeError> + Send + Sync + 'static,
{
    ServerReference {
        module_id: module_id.to_string(),
        export_name: export_name.to_string(),
        handler: Arc::new(handler),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE STORE & REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// A module's current export table, in declaration order.
#[derive(Debug, Default)]
pub struct ModuleExports {
    exports: IndexMap<String, ModuleExport>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, export: ModuleExport) {
        self.exports.insert(name.into(), export);
    }

    pub fn get(&self, name: &str) -> Option<&ModuleExport> {
        self.exports.get(name)
    }
}

/// Host loader: internal module id to export table, the bundler-require
/// analogue.
pub trait ModuleStore: Send + Sync {
    fn require(&self, internal_id: &str) -> Option<&ModuleExports>;
}

#[derive(Debug, Default)]
pub struct InMemoryModuleStore {
    modules: HashMap<String, ModuleExports>,
}

impl InMemoryModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_module(&mut self, internal_id: impl Into<String>, exports: ModuleExports) {
        self.modules.insert(internal_id.into(), exports);
    }
}

impl ModuleStore for InMemoryModuleStore {
    fn require(&self, internal_id: &str) -> Option<&ModuleExports> {
        self.modules.get(internal_id)
    }
}

/// Process-wide registry: server manifest plus the host module store.
pub struct Registry {
    manifest: ServerManifest,
    store: Box<dyn ModuleStore>,
}

impl Registry {
    pub fn new(manifest: ServerManifest, store: Box<dyn ModuleStore>) -> Self {
        Registry { manifest, store }
    }

    pub fn manifest_entry(&self, module_id: &str) -> Option<&ImportManifestEntry> {
        self.manifest.get(module_id)
    }

    /// Load the owning module through the host store by its manifest
    /// internal id and index into its current export table.
    pub fn resolve(&self, module_id: &str, export_name: &str) -> Option<&ModuleExport> {
        let entry = self.manifest.get(module_id)?;
        let module = self.store.require(&entry.id)?;
        module.get(export_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MODULE_ID: &str = "file:///app/actions.js";

    fn manifest_with(module_id: &str, internal_id: &str) -> ServerManifest {
        let mut manifest = ServerManifest::new();
        manifest.insert(
            module_id.to_string(),
            ImportManifestEntry {
                id: internal_id.to_string(),
                chunks: vec![internal_id.to_string(), "actions.js".to_string()],
                name: "*".to_string(),
            },
        );
        manifest
    }

    #[test]
    fn test_server_reference_is_transparent_to_local_calls() {
        let reference = register_server_reference(
            |args| {
                let a = args[0].as_i64().unwrap_or(0);
                let b = args[1].as_i64().unwrap_or(0);
                Ok(Invocation::immediate(json!(a + b)))
            },
            MODULE_ID,
            "add",
        );

        let result = reference.call(vec![json!(2), json!(3)]).unwrap();
        assert_eq!(result.value, json!(5));
        assert_eq!(reference.reference_id(), "file:///app/actions.js#add");
    }

    #[test]
    fn test_capability_predicate() {
        let server = ModuleExport::Server(register_server_reference(
            |_| Ok(Invocation::immediate(Value::Null)),
            MODULE_ID,
            "f",
        ));
        let client = ModuleExport::Client(register_client_reference(MODULE_ID, "f"));
        let plain = ModuleExport::Value(json!("not a function"));

        assert!(is_server_reference(&server));
        assert!(!is_server_reference(&client));
        assert!(!is_server_reference(&plain));
    }

    #[test]
    fn test_client_reference_rejects_direct_invocation() {
        let reference = register_client_reference("file:///app/button.js", "Button");
        let err = reference.call(vec![]).unwrap_err();
        assert!(err.to_string().contains("Button()"));
        assert!(err.to_string().contains("file:///app/button.js"));
    }

    #[test]
    fn test_client_reference_describe() {
        let reference = register_client_reference("file:///app/button.js", "Button");
        let mut manifest = ClientManifest::new();
        manifest.insert(
            "file:///app/button.js#Button".to_string(),
            ImportManifestEntry {
                id: "7".to_string(),
                chunks: vec!["7".to_string(), "button.js".to_string()],
                name: "Button".to_string(),
            },
        );

        let entry = reference.describe(&manifest).unwrap();
        assert_eq!(entry.id, "7");
        assert!(reference
            .describe(&ClientManifest::new())
            .is_none());
    }

    #[test]
    fn test_registry_resolution_goes_through_manifest_and_store() {
        let mut exports = ModuleExports::new();
        exports.insert(
            "ping",
            ModuleExport::Server(register_server_reference(
                |_| Ok(Invocation::immediate(json!("pong"))),
                MODULE_ID,
                "ping",
            )),
        );
        let mut store = InMemoryModuleStore::new();
        store.insert_module("0", exports);

        let registry = Registry::new(manifest_with(MODULE_ID, "0"), Box::new(store));

        assert!(registry.resolve(MODULE_ID, "ping").is_some());
        assert!(registry.resolve(MODULE_ID, "absent").is_none());
        assert!(registry.resolve("file:///elsewhere.js", "ping").is_none());
    }
}
