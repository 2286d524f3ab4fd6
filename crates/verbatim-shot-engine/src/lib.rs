pub mod identity;
pub mod io;
pub mod manifest;
pub mod matcher;
pub mod roots;
pub mod session;
pub mod snapshot;
pub mod store;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use identity::{IdentityError, TITLE_SEPARATOR, TestCase, TestCaseInfo, TestIdentity};
pub use manifest::{MANIFEST_FILE_NAME, Manifest, ManifestEntry, snapshot_file_name};
pub use matcher::{MatchOutcome, SnapshotAction, SnapshotSubject, evaluate};
pub use roots::TestRoots;
pub use session::{VerbatimError, VerbatimSnapshots};
pub use snapshot::Snapshot;
pub use store::{DEFAULT_SNAPSHOT_DIR, SnapshotStore, StoreError, resolve_snapshot_root};
pub use verbatim_shot_config::{Config, CorruptManifestPolicy, UpdateMode};
