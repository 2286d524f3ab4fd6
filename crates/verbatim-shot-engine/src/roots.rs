//! Test root resolution.
//!
//! Turns the spec locations a project configures (literal paths or glob
//! patterns such as `tests/**/*.rs`) into absolute directories under which
//! test files live. A test file's snapshot directory is named after its path
//! relative to the most specific root that contains it.

use std::path::{Component, Path, PathBuf};

const GLOB_METACHARS: [char; 4] = ['*', '?', '[', '{'];

/// Absolute test root directories, most specific (longest) first.
///
/// Never empty: with no spec locations the current working directory is the
/// only root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRoots {
    by_specificity: Vec<PathBuf>,
    primary: PathBuf,
}

impl TestRoots {
    /// Resolve spec locations against `cwd`.
    pub fn resolve<S: AsRef<str>>(spec_locations: &[S], cwd: &Path) -> Self {
        let cwd = normalize(cwd);
        let mut declared: Vec<PathBuf> = Vec::new();

        for spec in spec_locations {
            let root = resolve_location(spec.as_ref(), &cwd);
            if !declared.contains(&root) {
                declared.push(root);
            }
        }

        if declared.is_empty() {
            declared.push(cwd);
        }

        let primary = declared[0].clone();
        let mut by_specificity = declared;
        // Stable, so equal lengths keep their declared order
        by_specificity.sort_by(|a, b| b.as_os_str().len().cmp(&a.as_os_str().len()));

        log::debug!("Resolved test roots: {by_specificity:?}");

        Self {
            by_specificity,
            primary,
        }
    }

    /// Resolve spec locations against the process's current working directory.
    pub fn from_current_dir<S: AsRef<str>>(spec_locations: &[S]) -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::resolve(spec_locations, &cwd))
    }

    /// The first root in declared order. The default snapshot root lives here.
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// Roots in matching order, longest first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.by_specificity.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_specificity.len()
    }

    /// Always false; kept for parity with `len`.
    pub fn is_empty(&self) -> bool {
        self.by_specificity.is_empty()
    }

    /// The most specific root containing `file`, compared component-wise.
    /// `file` is expected to be normalized already.
    pub fn find_root(&self, file: &Path) -> Option<&Path> {
        self.iter().find(|root| file.starts_with(root))
    }
}

fn resolve_location(spec: &str, cwd: &Path) -> PathBuf {
    match glob_base(spec) {
        Some(base) => normalize(&cwd.join(base)),
        None => {
            let path = normalize(&cwd.join(spec));
            // A literal pointing at a single test file roots at its directory
            if path.is_file()
                && let Some(parent) = path.parent()
            {
                return parent.to_path_buf();
            }
            path
        }
    }
}

/// The static directory prefix of a glob pattern, or `None` if `spec` has no
/// glob syntax. An empty result means the pattern starts matching right away.
///
/// Only the syntax `glob::Pattern` accepts counts: `*`, `?`, `[..]` and the
/// `{..}` alternation. Extglob forms such as `!(..)` are taken literally.
fn glob_base(spec: &str) -> Option<PathBuf> {
    if !spec.contains(GLOB_METACHARS) {
        return None;
    }

    let mut base = PathBuf::new();
    for component in Path::new(spec).components() {
        if component
            .as_os_str()
            .to_string_lossy()
            .contains(GLOB_METACHARS)
        {
            break;
        }
        base.push(component);
    }
    Some(base)
}

/// Lexically drop `.` and `..` components without touching the filesystem.
///
/// `..` at the filesystem root is dropped; leading `..` of a relative path is
/// kept.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }
    normalized
}
