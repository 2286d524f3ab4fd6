//! One snapshot session per test process.
//!
//! Ties the current test identity, the snapshot store and the run-wide update
//! mode together. Host glue calls [`VerbatimSnapshots::begin_test`] before each
//! test body; assertions go through `match_verbatim_snapshot` and friends.

use std::path::Path;
use verbatim_shot_config::{Config, ConfigError, UpdateMode};

use crate::identity::{TestCase, TestIdentity};
use crate::matcher::{self, MatchOutcome, SnapshotAction, SnapshotSubject};
use crate::roots::TestRoots;
use crate::snapshot::Snapshot;
use crate::store::{SnapshotStore, StoreError, resolve_snapshot_root};

#[derive(Debug, thiserror::Error)]
pub enum VerbatimError {
    #[error("Verbatim snapshot subject must be a string, got {type_name}")]
    NotAString { type_name: &'static str },
    #[error("{0}")]
    Mismatch(MatchOutcome),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug)]
pub struct VerbatimSnapshots {
    identity: TestIdentity,
    store: SnapshotStore,
    update_mode: UpdateMode,
}

impl VerbatimSnapshots {
    pub fn new(identity: TestIdentity, store: SnapshotStore, update_mode: UpdateMode) -> Self {
        log::debug!(
            "Verbatim snapshots at {} (update mode: {})",
            store.snapshot_root().display(),
            update_mode.is_update()
        );
        Self {
            identity,
            store,
            update_mode,
        }
    }

    /// Build a session from a loaded config. Relative spec locations and a
    /// relative snapshot root are resolved against `project_dir`.
    pub fn from_config(config: &Config, project_dir: &Path, update_mode: UpdateMode) -> Self {
        let identity = TestIdentity::new(TestRoots::resolve(&config.spec, project_dir));
        let snapshot_root = resolve_snapshot_root(
            identity.roots(),
            config.snapshot_root.as_deref(),
            project_dir,
        );
        let store = SnapshotStore::at(snapshot_root, config.on_corrupt_manifest);
        Self::new(identity, store, update_mode)
    }

    /// Load `verbatim-shot.toml` from `project_dir` (defaults if absent) and
    /// detect update mode from the process arguments and environment.
    pub fn from_project_dir(project_dir: &Path) -> Result<Self, VerbatimError> {
        let config = Config::load_from_dir(project_dir)?.unwrap_or_default();
        Ok(Self::from_config(&config, project_dir, UpdateMode::from_env()))
    }

    /// Host hook: `test` is about to run.
    pub fn begin_test(&mut self, test: impl TestCase + 'static) {
        self.identity.set_current(test);
    }

    pub fn end_test(&mut self) {
        self.identity.clear();
    }

    pub fn identity(&self) -> &TestIdentity {
        &self.identity
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    pub fn match_verbatim_snapshot<S>(&mut self, subject: &S) -> Result<MatchOutcome, VerbatimError>
    where
        S: SnapshotSubject + ?Sized,
    {
        self.evaluate(subject, false)
    }

    pub fn not_match_verbatim_snapshot<S>(
        &mut self,
        subject: &S,
    ) -> Result<MatchOutcome, VerbatimError>
    where
        S: SnapshotSubject + ?Sized,
    {
        self.evaluate(subject, true)
    }

    /// Like [`Self::match_verbatim_snapshot`] but a failed match is an `Err`.
    pub fn check_verbatim_snapshot<S>(&mut self, subject: &S) -> Result<(), VerbatimError>
    where
        S: SnapshotSubject + ?Sized,
    {
        let outcome = self.match_verbatim_snapshot(subject)?;
        if outcome.pass {
            Ok(())
        } else {
            Err(VerbatimError::Mismatch(outcome))
        }
    }

    /// Panicking adapter for plain `#[test]` functions.
    #[track_caller]
    pub fn assert_verbatim_snapshot<S>(&mut self, subject: &S)
    where
        S: SnapshotSubject + ?Sized,
    {
        if let Err(e) = self.check_verbatim_snapshot(subject) {
            panic!("{e}");
        }
    }

    fn evaluate<S>(&mut self, subject: &S, negated: bool) -> Result<MatchOutcome, VerbatimError>
    where
        S: SnapshotSubject + ?Sized,
    {
        let actual = subject
            .as_snapshot_text()
            .map_err(|type_name| VerbatimError::NotAString { type_name })?;

        let stored = self.store.load_current_snapshot(&self.identity)?;
        let outcome = matcher::evaluate(
            actual,
            stored.as_ref(),
            self.update_mode.is_update(),
            negated,
        );

        if outcome.action.writes() {
            let path = self
                .store
                .save_current_snapshot(&self.identity, &Snapshot::new(actual))?;
            let verb = match outcome.action {
                SnapshotAction::Overwrite => "Updated",
                _ => "Created",
            };
            log::info!(
                "{verb} verbatim snapshot for '{}' at {}",
                self.identity.key(),
                path.display()
            );
        }

        Ok(outcome)
    }
}
