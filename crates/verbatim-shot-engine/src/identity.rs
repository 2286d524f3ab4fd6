//! Identity of the test that is currently running.
//!
//! The host runner installs each test through [`TestIdentity::set_current`]
//! before its body executes. Everything else only reads the derived key and
//! relative path.

use relative_path::{Component, RelativePathBuf};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::roots::{TestRoots, normalize};

/// Joins enclosing group names and the test's own name into its key.
pub const TITLE_SEPARATOR: &str = " ";

/// What the snapshot machinery needs to know about a running test.
pub trait TestCase {
    /// All enclosing group names followed by the test's own name, joined
    /// with [`TITLE_SEPARATOR`]. Must be stable across runs.
    fn hierarchical_title(&self) -> String;

    /// Absolute path of the file defining the test.
    fn source_file_path(&self) -> &Path;
}

/// Plain [`TestCase`] for hosts that know titles and file up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseInfo {
    titles: Vec<String>,
    file: PathBuf,
}

impl TestCaseInfo {
    pub fn new<I, S>(titles: I, file: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: titles.into_iter().map(Into::into).collect(),
            file: file.into(),
        }
    }
}

impl TestCase for TestCaseInfo {
    fn hierarchical_title(&self) -> String {
        self.titles.join(TITLE_SEPARATOR)
    }

    fn source_file_path(&self) -> &Path {
        &self.file
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Current test not set on the test identity")]
    NoCurrentTest,
    #[error("Test file {file} is not inside any test root {roots:?}")]
    OutsideTestRoots { file: PathBuf, roots: Vec<PathBuf> },
    #[error("Test file {file} has no UTF-8 path relative to {root}")]
    NonUtf8Path { file: PathBuf, root: PathBuf },
    #[error("Test file {file} resolves to {relative}, outside test root {root}")]
    EscapesTestRoot {
        file: PathBuf,
        root: PathBuf,
        relative: RelativePathBuf,
    },
}

pub struct TestIdentity {
    roots: TestRoots,
    current: Option<Box<dyn TestCase>>,
}

impl TestIdentity {
    pub fn new(roots: TestRoots) -> Self {
        Self {
            roots,
            current: None,
        }
    }

    pub fn roots(&self) -> &TestRoots {
        &self.roots
    }

    pub fn set_current(&mut self, test: impl TestCase + 'static) {
        self.current = Some(Box::new(test));
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Hierarchical title of the current test, or an empty string before any
    /// test has started.
    pub fn key(&self) -> String {
        self.current
            .as_ref()
            .map(|test| test.hierarchical_title())
            .unwrap_or_default()
    }

    /// Path of the current test file relative to the most specific test root
    /// containing it. `.` and `..` in the file path are resolved lexically
    /// first, so the result always stays below its root.
    pub fn relative_path(&self) -> Result<RelativePathBuf, IdentityError> {
        let test = self.current.as_ref().ok_or(IdentityError::NoCurrentTest)?;
        let file = normalize(test.source_file_path());

        let outside = || IdentityError::OutsideTestRoots {
            file: file.clone(),
            roots: self.roots.iter().map(Path::to_path_buf).collect(),
        };

        let root = self.roots.find_root(&file).ok_or_else(outside)?;
        let stripped = file.strip_prefix(root).map_err(|_| outside())?;

        relative_below_root(&file, root, stripped)
    }
}

fn relative_below_root(
    file: &Path,
    root: &Path,
    stripped: &Path,
) -> Result<RelativePathBuf, IdentityError> {
    let relative =
        RelativePathBuf::from_path(stripped).map_err(|_| IdentityError::NonUtf8Path {
            file: file.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    if relative
        .components()
        .any(|component| component == Component::ParentDir)
    {
        return Err(IdentityError::EscapesTestRoot {
            file: file.to_path_buf(),
            root: root.to_path_buf(),
            relative,
        });
    }

    Ok(relative)
}

impl fmt::Debug for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestIdentity")
            .field("roots", &self.roots)
            .field("current", &self.current.as_ref().map(|t| t.hierarchical_title()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(specs: &[&str]) -> TestIdentity {
        TestIdentity::new(TestRoots::resolve(specs, Path::new("/project")))
    }

    #[test]
    fn test_key_is_empty_without_current_test() {
        let identity = identity(&[]);
        assert_eq!(identity.key(), "");
    }

    #[test]
    fn test_key_joins_titles() {
        let mut identity = identity(&[]);
        identity.set_current(TestCaseInfo::new(
            ["Renderer", "with tables", "aligns columns"],
            "/project/render.rs",
        ));

        assert_eq!(identity.key(), "Renderer with tables aligns columns");
    }

    #[test]
    fn test_relative_path_without_current_test_fails() {
        let identity = identity(&[]);

        let result = identity.relative_path();
        assert!(matches!(result, Err(IdentityError::NoCurrentTest)));
    }

    #[test]
    fn test_relative_path_against_single_root() {
        let mut identity = identity(&["tests/**/*.rs"]);
        identity.set_current(TestCaseInfo::new(["a"], "/project/tests/unit/parse.rs"));

        assert_eq!(identity.relative_path().unwrap().as_str(), "unit/parse.rs");
    }

    #[test]
    fn test_relative_path_uses_most_specific_root() {
        let mut identity = identity(&["test", "test/deeper"]);
        identity.set_current(TestCaseInfo::new(["a"], "/project/test/deeper/x.rs"));

        assert_eq!(identity.relative_path().unwrap().as_str(), "x.rs");
    }

    #[test]
    fn test_relative_path_outside_roots_fails() {
        let mut identity = identity(&["tests"]);
        identity.set_current(TestCaseInfo::new(["a"], "/elsewhere/x.rs"));

        let result = identity.relative_path();
        assert!(matches!(
            result,
            Err(IdentityError::OutsideTestRoots { ref file, .. })
                if file == Path::new("/elsewhere/x.rs")
        ));
    }

    #[test]
    fn test_parent_dir_out_of_root_is_outside() {
        let mut identity = identity(&["tests"]);
        identity.set_current(TestCaseInfo::new(["a"], "/project/tests/../../etc/x.rs"));

        let result = identity.relative_path();
        assert!(matches!(
            result,
            Err(IdentityError::OutsideTestRoots { ref file, .. })
                if file == Path::new("/etc/x.rs")
        ));
    }

    #[test]
    fn test_parent_dir_back_into_root_is_resolved() {
        let mut identity = TestIdentity::new(TestRoots::resolve(
            &["tests"],
            Path::new("/ws/crates/foo"),
        ));
        identity.set_current(TestCaseInfo::new(["a"], "/ws/crates/foo/../foo/tests/a.rs"));

        assert_eq!(identity.relative_path().unwrap().as_str(), "a.rs");
    }

    #[test]
    fn test_remainder_climbing_out_of_root_is_rejected() {
        let result = relative_below_root(
            Path::new("/project/x.rs"),
            Path::new("/project/tests"),
            Path::new("../x.rs"),
        );

        assert!(matches!(
            result,
            Err(IdentityError::EscapesTestRoot { ref relative, .. })
                if relative.as_str() == "../x.rs"
        ));
    }

    #[test]
    fn test_set_current_replaces_previous_test() {
        let mut identity = identity(&[]);
        identity.set_current(TestCaseInfo::new(["first"], "/project/a.rs"));
        identity.set_current(TestCaseInfo::new(["second"], "/project/b.rs"));

        assert_eq!(identity.key(), "second");
        assert_eq!(identity.relative_path().unwrap().as_str(), "b.rs");
    }

    #[test]
    fn test_clear_forgets_current_test() {
        let mut identity = identity(&[]);
        identity.set_current(TestCaseInfo::new(["first"], "/project/a.rs"));
        identity.clear();

        assert_eq!(identity.key(), "");
        assert!(identity.relative_path().is_err());
    }
}
