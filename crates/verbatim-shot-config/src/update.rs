/// Environment variable that switches a run into update mode.
pub const UPDATE_ENV_VAR: &str = "VERBATIM_SHOT_UPDATE";

/// Command-line flags that switch a run into update mode. Only useful for
/// custom harnesses (`harness = false`); libtest rejects unknown flags, so
/// `cargo test` runs should use [`UPDATE_ENV_VAR`] instead.
pub const UPDATE_FLAGS: [&str; 2] = ["--update", "-u"];

/// Whether mismatching snapshots fail the assertion or get rewritten.
///
/// Resolved once when the snapshot session is built, never per assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    #[default]
    Compare,
    Overwrite,
}

impl UpdateMode {
    pub fn detect<I, S>(args: I, env_value: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let flag_given = args
            .into_iter()
            .any(|arg| UPDATE_FLAGS.contains(&arg.as_ref()));
        let env_enabled = env_value.is_some_and(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        });

        if flag_given || env_enabled {
            UpdateMode::Overwrite
        } else {
            UpdateMode::Compare
        }
    }

    /// Detect update mode from the real process arguments and environment.
    pub fn from_env() -> Self {
        let env_value = std::env::var(UPDATE_ENV_VAR).ok();
        Self::detect(std::env::args().skip(1), env_value.as_deref())
    }

    pub fn is_update(self) -> bool {
        self == UpdateMode::Overwrite
    }
}

impl From<bool> for UpdateMode {
    fn from(update: bool) -> Self {
        if update {
            UpdateMode::Overwrite
        } else {
            UpdateMode::Compare
        }
    }
}
