//! End-to-end boundary tests.
//!
//! These exercise the full path a real deployment takes: a source tree is
//! discovered and transformed, the resulting server manifest seeds a
//! registry whose store stands in for the loaded server module, and
//! incoming reference identifiers are dispatched against it.

#[cfg(test)]
mod tests {
    use crate::codegen::TransformOptions;
    use crate::discovery::run_build;
    use crate::dispatch::dispatch;
    use crate::errors::{DispatchError, InvokeError};
    use crate::manifest::reference_id;
    use crate::registry::{
        register_server_reference, InMemoryModuleStore, Invocation, ModuleExport, ModuleExports,
        Registry,
    };
    use crate::resolve::FsModuleHost;
    use serde_json::{json, Value};
    use std::fs;
    use std::path::Path;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    /// Build a tree, then initialize the runtime the way the transformed
    /// server module would: one tagged export per registration statement,
    /// plain exports left untagged.
    fn build_and_register() -> (Registry, String) {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("package.json"), r#"{"type": "module"}"#);
        write(
            &dir.path().join("actions.js"),
            "\"use server\";\n\
             export async function greet(name) { return \"hi \" + name; }\n\
             export const limit = 10;",
        );

        let host = FsModuleHost::new();
        let output = run_build(dir.path(), &host, &TransformOptions::default(), None);
        assert_eq!(output.server_manifest.len(), 1);

        let (module_id, entry) = output.server_manifest.iter().next().unwrap();
        let module_id = module_id.clone();
        let internal_id = entry.id.clone();

        // The transform appended a registration for `greet` and a guarded
        // one for `limit`; at runtime the guard leaves `limit` untagged.
        let record = output
            .modules
            .iter()
            .find(|r| r.path.ends_with("actions.js"))
            .unwrap();
        assert!(record.output.code.contains("registerServerReference(greet,"));
        assert!(record
            .output
            .code
            .contains("if (typeof limit === \"function\")"));

        let mut exports = ModuleExports::new();
        exports.insert(
            "greet",
            ModuleExport::Server(register_server_reference(
                |args| {
                    let name = args.first().and_then(Value::as_str).unwrap_or("world");
                    Ok(Invocation::immediate(json!(format!("hi {}", name))))
                },
                &module_id,
                "greet",
            )),
        );
        exports.insert("limit", ModuleExport::Value(json!(10)));

        let mut store = InMemoryModuleStore::new();
        store.insert_module(internal_id, exports);

        let registry = Registry::new(output.server_manifest.clone(), Box::new(store));
        (registry, module_id)
    }

    #[test]
    fn test_discovered_server_module_is_dispatchable() {
        let (registry, module_id) = build_and_register();

        let outcome = dispatch(
            &registry,
            &reference_id(&module_id, "greet"),
            vec![json!("ada")],
        )
        .unwrap();
        assert_eq!(outcome.value, Some(json!("hi ada")));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_untagged_export_of_registered_module_is_rejected() {
        let (registry, module_id) = build_and_register();

        let err = dispatch(&registry, &reference_id(&module_id, "limit"), vec![]).unwrap_err();
        assert_eq!(err, DispatchError::InvalidAction);
    }

    #[test]
    fn test_unknown_module_is_rejected_before_resolution() {
        let (registry, _) = build_and_register();

        let err = dispatch(&registry, "file:///nowhere/else.js#greet", vec![]).unwrap_err();
        assert_eq!(err, DispatchError::ModuleNotFound);
    }

    #[test]
    fn test_deferred_failure_travels_on_the_side_channel() {
        let module_id = "file:///app/mutations.js";
        let mut exports = ModuleExports::new();
        exports.insert(
            "persist",
            ModuleExport::Server(register_server_reference(
                |args| {
                    let payload = args.first().cloned().unwrap_or(Value::Null);
                    Ok(Invocation::with_completion(payload, || {
                        Err(InvokeError::new("replica sync failed"))
                    }))
                },
                module_id,
                "persist",
            )),
        );

        let mut store = InMemoryModuleStore::new();
        store.insert_module("0", exports);

        let mut manifest = crate::manifest::ServerManifest::new();
        manifest.insert(
            module_id.to_string(),
            crate::manifest::ImportManifestEntry {
                id: "0".to_string(),
                chunks: vec!["0".to_string(), "mutations.js".to_string()],
                name: "*".to_string(),
            },
        );
        let registry = Registry::new(manifest, Box::new(store));

        let outcome = dispatch(
            &registry,
            "file:///app/mutations.js#persist",
            vec![json!({"id": 1})],
        )
        .unwrap();

        // The value survived; only the side channel carries the failure.
        assert_eq!(outcome.value, Some(json!({"id": 1})));
        assert_eq!(outcome.error, Some(InvokeError::new("replica sync failed")));
    }

    #[test]
    fn test_one_dispatch_failure_does_not_affect_the_next_call() {
        let (registry, module_id) = build_and_register();

        assert!(dispatch(&registry, "garbage", vec![]).is_err());
        assert!(dispatch(&registry, &reference_id(&module_id, "nope"), vec![]).is_err());

        let outcome = dispatch(
            &registry,
            &reference_id(&module_id, "greet"),
            vec![json!("eve")],
        )
        .unwrap();
        assert_eq!(outcome.value, Some(json!("hi eve")));
    }
}
