//! Build manifests and reference identifiers.
//!
//! A reference identifier is `moduleId#exportedName`. The server manifest is
//! keyed by module identifier and consulted when resolving an incoming call;
//! the client manifest is keyed by full reference identifier and consulted
//! when the server describes a client value for the wire.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Loader metadata for one module. `chunks` is a flat list of alternating
/// chunk id / chunk filename pairs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportManifestEntry {
    pub id: String,
    pub chunks: Vec<String>,
    pub name: String,
}

pub type ClientManifest = HashMap<String, ImportManifestEntry>;
pub type ServerManifest = HashMap<String, ImportManifestEntry>;

pub fn reference_id(module_id: &str, exported_name: &str) -> String {
    format!("{}#{}", module_id, exported_name)
}

/// Split a reference identifier on its first `#`. An identifier with no
/// separator yields the whole string as the module id and an empty export
/// name, which then fails manifest lookup downstream.
pub fn split_reference_id(reference_id: &str) -> (&str, &str) {
    match reference_id.split_once('#') {
        Some((module_id, exported_name)) => (module_id, exported_name),
        None => (reference_id, ""),
    }
}

pub fn manifest_from_json(json: &str) -> serde_json::Result<HashMap<String, ImportManifestEntry>> {
    serde_json::from_str(json)
}

pub fn manifest_to_json(
    manifest: &HashMap<String, ImportManifestEntry>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(manifest)
}
