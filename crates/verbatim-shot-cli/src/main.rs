use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use relative_path::RelativePathBuf;
use std::env;
use std::io::{Write, stdout};
use std::path::{Path, PathBuf};
use verbatim_shot_config::Config;
use verbatim_shot_engine::{
    Snapshot, SnapshotStore, TestCaseInfo, TestIdentity, TestRoots, resolve_snapshot_root,
};

#[derive(Parser, Debug)]
#[clap(
    name = "verbatim-shot",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect verbatim snapshot trees"
)]
struct Cli {
    /// Project directory holding `verbatim-shot.toml` (defaults to the current directory).
    #[clap(short, long, global = true, default_value = ".")]
    project: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Show resolved test roots and the snapshot root
    Roots,
    /// List snapshot entries recorded for a test file
    List { test_file: PathBuf },
    /// Print the stored snapshot for a test key
    Show { test_file: PathBuf, key: String },
}

/// A project's snapshot tree as configured by its `verbatim-shot.toml`.
struct Project {
    cwd: PathBuf,
    identity: TestIdentity,
    store: SnapshotStore,
}

impl Project {
    fn open(project_dir: &Path, cwd: PathBuf) -> Result<Self> {
        let project_dir = cwd.join(project_dir);
        let config = Config::load_from_dir(&project_dir)?.unwrap_or_default();
        log::debug!("Project {} with config {config:?}", project_dir.display());

        let identity = TestIdentity::new(TestRoots::resolve(&config.spec, &project_dir));
        let snapshot_root = resolve_snapshot_root(
            identity.roots(),
            config.snapshot_root.as_deref(),
            &project_dir,
        );
        let store = SnapshotStore::at(snapshot_root, config.on_corrupt_manifest);

        Ok(Self {
            cwd,
            identity,
            store,
        })
    }

    /// Point the identity at `key` in `test_file` and return the file's
    /// snapshot directory relative to the snapshot root.
    fn select(&mut self, test_file: &Path, key: &str) -> Result<RelativePathBuf> {
        let test_file = self.cwd.join(test_file);
        self.identity
            .set_current(TestCaseInfo::new([key], test_file));
        Ok(self.identity.relative_path()?)
    }

    fn roots(&self, out: &mut impl Write) -> Result<()> {
        writeln!(out, "Test roots (most specific first):")?;
        for root in self.identity.roots().iter() {
            let marker = if root == self.identity.roots().primary() {
                " (primary)"
            } else {
                ""
            };
            writeln!(out, "  {}{marker}", root.display())?;
        }
        writeln!(out, "Snapshot root: {}", self.store.snapshot_root().display())?;
        Ok(())
    }

    fn list(&mut self, test_file: &Path, out: &mut impl Write) -> Result<()> {
        let relative_path = self.select(test_file, "")?;
        let snapshot_dir = relative_path.to_path(self.store.snapshot_root());

        let Some(manifest) = self.store.manifest(&relative_path)? else {
            eprintln!("No snapshots recorded for {}", test_file.display());
            return Ok(());
        };

        for (key, entry) in manifest.entries() {
            let (file_name, status) = match entry.file_name.as_deref() {
                Some(name) if snapshot_dir.join(name).is_file() => (name, "ok"),
                Some(name) => (name, "missing"),
                None => ("-", "unassigned"),
            };
            writeln!(out, "{file_name}\t{status}\t{key}")?;
        }
        Ok(())
    }

    fn show(&mut self, test_file: &Path, key: &str, out: &mut impl Write) -> Result<()> {
        let relative_path = self.select(test_file, key)?;

        let Some(snapshot_path) = self.store.snapshot_path(&relative_path, key)? else {
            bail!(
                "No snapshot recorded for '{key}' in {}",
                test_file.display()
            );
        };

        let snapshot = Snapshot::load_from_file(&snapshot_path)?;
        out.write_all(snapshot.contents().as_bytes())?;
        Ok(())
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;
    let mut project = Project::open(&cli.project, cwd)?;
    let mut out = stdout().lock();

    match cli.command {
        Command::Roots => project.roots(&mut out),
        Command::List { test_file } => project.list(&test_file, &mut out),
        Command::Show { test_file, key } => project.show(&test_file, &key, &mut out),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    run(Cli::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use verbatim_shot_engine::{MANIFEST_FILE_NAME, snapshot_file_name};

    /// Project with `tests/a.rs` holding one recorded snapshot and one
    /// manifest entry whose file was deleted.
    fn create_project() -> TempDir {
        let project = tempfile::tempdir().unwrap();
        std::fs::write(
            project.path().join("verbatim-shot.toml"),
            "spec = [\"tests/**/*.rs\"]\n",
        )
        .unwrap();

        let snapshot_dir = project.path().join("tests/snapshots/verbatim/a.rs");
        std::fs::create_dir_all(&snapshot_dir).unwrap();
        let recorded = snapshot_file_name("Suite recorded");
        std::fs::write(
            snapshot_dir.join(MANIFEST_FILE_NAME),
            format!(
                r#"{{ "Suite recorded": {{ "fileName": "{recorded}" }}, "Suite lost": {{ "fileName": "gone.txt" }} }}"#
            ),
        )
        .unwrap();
        std::fs::write(snapshot_dir.join(recorded), "recorded output\n").unwrap();
        project
    }

    fn open(project: &TempDir) -> Project {
        Project::open(Path::new("."), project.path().to_path_buf()).unwrap()
    }

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("verbatim-shot").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_roots() {
        let cli = parse(&["roots"]).unwrap();

        assert_eq!(cli.project, PathBuf::from("."));
        assert_eq!(cli.command, Command::Roots);
    }

    #[test]
    fn test_parse_show_with_project() {
        let cli = parse(&["--project", "demo", "show", "tests/a.rs", "Suite case"]).unwrap();

        assert_eq!(cli.project, PathBuf::from("demo"));
        assert_eq!(
            cli.command,
            Command::Show {
                test_file: PathBuf::from("tests/a.rs"),
                key: "Suite case".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_project_after_subcommand() {
        let cli = parse(&["list", "tests/a.rs", "-p", "demo"]).unwrap();

        assert_eq!(cli.project, PathBuf::from("demo"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["list"]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&["roots", "--project"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_roots_output() {
        let project = create_project();
        let mut out = Vec::new();

        open(&project).roots(&mut out).unwrap();

        let tests_root = project.path().join("tests");
        let expected = format!(
            "Test roots (most specific first):\n  {} (primary)\nSnapshot root: {}\n",
            tests_root.display(),
            tests_root.join("snapshots/verbatim").display()
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_list_entries() {
        let project = create_project();
        let mut out = Vec::new();

        open(&project)
            .list(Path::new("tests/a.rs"), &mut out)
            .unwrap();

        let expected = format!(
            "gone.txt\tmissing\tSuite lost\n{}\tok\tSuite recorded\n",
            snapshot_file_name("Suite recorded")
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_list_without_manifest_prints_nothing() {
        let project = create_project();
        let mut out = Vec::new();

        open(&project)
            .list(Path::new("tests/other.rs"), &mut out)
            .unwrap();

        assert!(out.is_empty());
    }

    #[test]
    fn test_show_prints_snapshot_verbatim() {
        let project = create_project();
        let mut out = Vec::new();

        open(&project)
            .show(Path::new("tests/a.rs"), "Suite recorded", &mut out)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "recorded output\n");
    }

    #[test]
    fn test_show_unknown_key_fails() {
        let project = create_project();
        let mut out = Vec::new();

        let result = open(&project).show(Path::new("tests/a.rs"), "Suite unknown", &mut out);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Suite unknown"));
    }

    #[test]
    fn test_show_outside_test_roots_fails() {
        let project = create_project();
        let mut out = Vec::new();

        let result = open(&project).show(Path::new("src/lib.rs"), "Suite recorded", &mut out);

        assert!(result.is_err());
    }
}
