use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::identity::{TestCaseInfo, TestIdentity};
use crate::roots::TestRoots;

/// Create a temporary directory standing in for a project
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a file with content directly under the temporary directory
pub fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(filename);
    fs::write(&file_path, content).unwrap();
    file_path
}

/// Identity rooted at `dir` with `test.rs` > `title` as its current test
pub fn identity_for(dir: &TempDir, title: &str) -> TestIdentity {
    let mut identity = TestIdentity::new(TestRoots::resolve(&["."], dir.path()));
    identity.set_current(TestCaseInfo::new([title], dir.path().join("test.rs")));
    identity
}
