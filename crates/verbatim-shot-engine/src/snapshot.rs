use std::path::Path;

use crate::io::{self, IoError};

/// Recorded text a test's output is compared against.
///
/// Immutable once built. Which file it lives in is tracked by the manifest,
/// not by the snapshot itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    contents: String,
}

impl Snapshot {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
        }
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Write the contents to `path` as UTF-8, byte for byte. No trailing
    /// newline is added and none is stripped.
    pub fn save(&self, path: &Path) -> Result<(), IoError> {
        io::write_text(path, &self.contents)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, IoError> {
        io::read_text(path).map(Self::new)
    }
}
