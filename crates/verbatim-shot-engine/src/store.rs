//! Manifest-backed snapshot storage.
//!
//! Layout under the snapshot root:
//!
//! ```text
//! <snapshot root>/<test file relative to its test root>/manifest.json
//! <snapshot root>/<test file relative to its test root>/<hash of test key>.txt
//! ```
//!
//! Manifests are cached after the first successful load and never
//! invalidated: a run is one process executing one test at a time, and this
//! store is the only writer.

use relative_path::{RelativePath, RelativePathBuf};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use verbatim_shot_config::CorruptManifestPolicy;

use crate::identity::{IdentityError, TestIdentity};
use crate::io::{self, IoError};
use crate::manifest::{MANIFEST_FILE_NAME, Manifest};
use crate::roots::{TestRoots, normalize};
use crate::snapshot::Snapshot;

/// Default snapshot root, relative to the primary test root.
pub const DEFAULT_SNAPSHOT_DIR: &str = "snapshots/verbatim";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("Failed to parse snapshot manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize snapshot manifest for {path}: {source}")]
    ManifestSerialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to determine current directory: {0}")]
    CurrentDir(std::io::Error),
}

/// Absolute, lexically normalized snapshot root: the override resolved
/// against `cwd`, or `<primary test root>/snapshots/verbatim`.
pub fn resolve_snapshot_root(
    roots: &TestRoots,
    snapshot_root: Option<&Path>,
    cwd: &Path,
) -> PathBuf {
    match snapshot_root {
        Some(root) => normalize(&cwd.join(root)),
        None => RelativePath::new(DEFAULT_SNAPSHOT_DIR).to_path(roots.primary()),
    }
}

#[derive(Debug)]
pub struct SnapshotStore {
    snapshot_root: PathBuf,
    on_corrupt_manifest: CorruptManifestPolicy,
    manifests: HashMap<RelativePathBuf, Manifest>,
}

impl SnapshotStore {
    /// Store rooted per [`resolve_snapshot_root`], using the process's current
    /// directory for relative overrides.
    pub fn new(
        identity: &TestIdentity,
        snapshot_root: Option<&Path>,
        on_corrupt_manifest: CorruptManifestPolicy,
    ) -> Result<Self, StoreError> {
        let cwd = std::env::current_dir().map_err(StoreError::CurrentDir)?;
        let snapshot_root = resolve_snapshot_root(identity.roots(), snapshot_root, &cwd);
        Ok(Self::at(snapshot_root, on_corrupt_manifest))
    }

    /// Store rooted at an already absolute directory.
    pub fn at(snapshot_root: PathBuf, on_corrupt_manifest: CorruptManifestPolicy) -> Self {
        log::debug!("Snapshot root: {}", snapshot_root.display());
        Self {
            snapshot_root,
            on_corrupt_manifest,
            manifests: HashMap::new(),
        }
    }

    pub fn snapshot_root(&self) -> &Path {
        &self.snapshot_root
    }

    pub fn manifest_path(&self, relative_path: &RelativePath) -> PathBuf {
        relative_path
            .join(MANIFEST_FILE_NAME)
            .to_path(&self.snapshot_root)
    }

    /// Snapshot for the current test, or `None` when the manifest, its entry
    /// for the test, or the snapshot file does not exist yet.
    pub fn load_current_snapshot(
        &mut self,
        identity: &TestIdentity,
    ) -> Result<Option<Snapshot>, StoreError> {
        let relative_path = identity.relative_path()?;
        let key = identity.key();

        let Some(snapshot_path) = self.snapshot_path(&relative_path, &key)? else {
            return Ok(None);
        };

        match Snapshot::load_from_file(&snapshot_path) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(IoError::NotFound(path)) => {
                log::debug!("Snapshot file {} listed but missing", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write `snapshot` for the current test and flush its test file's
    /// manifest. Returns the path of the snapshot file.
    pub fn save_current_snapshot(
        &mut self,
        identity: &TestIdentity,
        snapshot: &Snapshot,
    ) -> Result<PathBuf, StoreError> {
        let relative_path = identity.relative_path()?;
        let key = identity.key();

        // Pull any manifest already on disk into the cache before changing it
        self.manifest(&relative_path)?;
        let manifest = self.manifests.entry(relative_path.clone()).or_default();
        let file_name = manifest.assign_file_name(&key).to_string();
        let manifest_path = self.manifest_path(&relative_path);
        let manifest_json = self.manifests[&relative_path].to_json().map_err(|source| {
            StoreError::ManifestSerialize {
                path: manifest_path.clone(),
                source,
            }
        })?;

        let snapshot_dir = relative_path.to_path(&self.snapshot_root);
        io::ensure_dir(&snapshot_dir)?;

        let snapshot_path = snapshot_dir.join(&file_name);
        snapshot.save(&snapshot_path)?;
        io::write_text(&manifest_path, &manifest_json)?;

        log::debug!(
            "Saved snapshot for '{key}' to {} ({} manifest entries)",
            snapshot_path.display(),
            self.manifests[&relative_path].len()
        );
        Ok(snapshot_path)
    }

    /// Where the manifest for `relative_path` currently points `key`, if it
    /// has an entry with a file name.
    pub fn snapshot_path(
        &mut self,
        relative_path: &RelativePath,
        key: &str,
    ) -> Result<Option<PathBuf>, StoreError> {
        let file_name = self
            .manifest(relative_path)?
            .and_then(|manifest| manifest.file_name(key))
            .map(str::to_string);

        Ok(file_name.map(|name| relative_path.join(name).to_path(&self.snapshot_root)))
    }

    /// Cached manifest for a test file, loading it from disk on a miss.
    /// `None` when no manifest has been written for the file.
    pub fn manifest(
        &mut self,
        relative_path: &RelativePath,
    ) -> Result<Option<&Manifest>, StoreError> {
        if !self.manifests.contains_key(relative_path)
            && let Some(manifest) = self.read_manifest(relative_path)?
        {
            self.manifests
                .insert(relative_path.to_relative_path_buf(), manifest);
        }

        Ok(self.manifests.get(relative_path))
    }

    fn read_manifest(&self, relative_path: &RelativePath) -> Result<Option<Manifest>, StoreError> {
        let manifest_path = self.manifest_path(relative_path);

        let json = match io::read_text(&manifest_path) {
            Ok(json) => json,
            Err(IoError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match Manifest::from_json(&json) {
            Ok(manifest) => {
                log::debug!(
                    "Loaded snapshot manifest {} ({} entries)",
                    manifest_path.display(),
                    manifest.len()
                );
                Ok(Some(manifest))
            }
            Err(source) => match self.on_corrupt_manifest {
                CorruptManifestPolicy::Fail => Err(StoreError::ManifestParse {
                    path: manifest_path,
                    source,
                }),
                CorruptManifestPolicy::TreatAsMissing => {
                    log::warn!(
                        "Ignoring unparsable snapshot manifest {}: {source}",
                        manifest_path.display()
                    );
                    Ok(None)
                }
            },
        }
    }
}
