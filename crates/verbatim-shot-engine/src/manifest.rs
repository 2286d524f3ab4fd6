//! Per-test-file snapshot manifests.
//!
//! Each test file gets one `manifest.json` mapping test keys to the name of
//! the file holding that test's snapshot:
//!
//! ```json
//! {
//!   "Renderer aligns columns": { "fileName": "3f2a9c01be.txt" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

const SNAPSHOT_EXTENSION: &str = "txt";
const FILE_NAME_HASH_LEN: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Snapshot file name, relative to the manifest's directory.
    #[serde(
        rename = "fileName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    /// The snapshot file assigned to `key`, if the entry exists and has one.
    pub fn file_name(&self, key: &str) -> Option<&str> {
        self.get(key)?.file_name.as_deref()
    }

    /// Create the entry for `key` if needed and give it a file name if it has
    /// none. An existing file name is never changed.
    pub fn assign_file_name(&mut self, key: &str) -> &str {
        self.entries
            .entry(key.to_string())
            .or_default()
            .file_name
            .get_or_insert_with(|| snapshot_file_name(key))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Snapshot file name for a test key: a short SHA-256 prefix of the key.
///
/// Depends only on the key, so every run maps a test to the same file.
pub fn snapshot_file_name(key: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    format!("{}.{SNAPSHOT_EXTENSION}", &digest[..FILE_NAME_HASH_LEN])
}
