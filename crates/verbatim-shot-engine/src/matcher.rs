//! The snapshot match/update decision.
//!
//! [`evaluate`] is pure: it decides what should happen and leaves disk
//! writes to the caller.
//!
//! | snapshot | update mode | matches | action      | passes      |
//! |----------|-------------|---------|-------------|-------------|
//! | missing  | any         | -       | `Create`    | yes         |
//! | present  | off         | yes     | `None`      | not negated |
//! | present  | off         | no      | `None`      | negated     |
//! | present  | on          | yes     | `None`      | yes         |
//! | present  | on          | no      | `Overwrite` | yes         |
//!
//! A negated assertion in update mode never rewrites: the only content it
//! could "accept" is the stored content itself.

use std::borrow::Cow;
use std::fmt;

use crate::snapshot::Snapshot;

/// What the caller must do with the stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotAction {
    None,
    Create,
    Overwrite,
}

impl SnapshotAction {
    pub fn writes(self) -> bool {
        self != SnapshotAction::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub pass: bool,
    pub action: SnapshotAction,
    /// Stored contents, if a snapshot existed.
    pub expected: Option<String>,
    pub actual: String,
    pub negated: bool,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = if self.negated { "not to match" } else { "to match" };
        match &self.expected {
            Some(expected) => write!(
                f,
                "expected subject {relation} verbatim snapshot\n--- expected ---\n{expected}\n--- actual ---\n{}",
                self.actual
            ),
            None => write!(f, "no verbatim snapshot recorded yet"),
        }
    }
}

pub fn evaluate(
    actual: &str,
    stored: Option<&Snapshot>,
    update_mode: bool,
    negated: bool,
) -> MatchOutcome {
    let Some(stored) = stored else {
        return MatchOutcome {
            pass: true,
            action: SnapshotAction::Create,
            expected: None,
            actual: actual.to_string(),
            negated,
        };
    };

    let matches = stored.contents() == actual;
    let (pass, action) = match (update_mode, matches) {
        (false, _) => (matches != negated, SnapshotAction::None),
        (true, true) => (true, SnapshotAction::None),
        (true, false) if negated => (true, SnapshotAction::None),
        (true, false) => (true, SnapshotAction::Overwrite),
    };

    MatchOutcome {
        pass,
        action,
        expected: Some(stored.contents().to_string()),
        actual: actual.to_string(),
        negated,
    }
}

/// A value that can be checked against a verbatim snapshot.
///
/// Only text can be. Dynamically typed subjects report their type instead
/// so the assertion fails before any snapshot is read or written.
pub trait SnapshotSubject {
    fn as_snapshot_text(&self) -> Result<&str, &'static str>;
}

impl SnapshotSubject for str {
    fn as_snapshot_text(&self) -> Result<&str, &'static str> {
        Ok(self)
    }
}

impl SnapshotSubject for String {
    fn as_snapshot_text(&self) -> Result<&str, &'static str> {
        Ok(self.as_str())
    }
}

impl SnapshotSubject for Cow<'_, str> {
    fn as_snapshot_text(&self) -> Result<&str, &'static str> {
        Ok(&**self)
    }
}

impl<T: SnapshotSubject + ?Sized> SnapshotSubject for &T {
    fn as_snapshot_text(&self) -> Result<&str, &'static str> {
        (**self).as_snapshot_text()
    }
}

impl SnapshotSubject for serde_json::Value {
    fn as_snapshot_text(&self) -> Result<&str, &'static str> {
        use serde_json::Value;

        match self {
            Value::String(text) => Ok(text.as_str()),
            Value::Null => Err("null"),
            Value::Bool(_) => Err("boolean"),
            Value::Number(_) => Err("number"),
            Value::Array(_) => Err("array"),
            Value::Object(_) => Err("object"),
        }
    }
}
