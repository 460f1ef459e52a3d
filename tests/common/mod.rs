//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture that builds real git repositories in a
//! temporary directory, and helpers to run the `scm-bridge` binary against
//! them.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new();
//!     let repo = fixture.init_repo("src/ring0");
//!     let commit = fixture.commit_file(&repo, "README.md", "# ring0", "initial");
//!     // ... run fixture.command()
//! }
//! ```
//!
//! Every git call passes its identity with `-c`, so the fixture never depends
//! on or touches the global git configuration.

use assert_fs::prelude::*;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_lfs_available, should_skip_network_tests};
    pub use super::TestFixture;
}

/// Git configuration applied to every fixture git call.
const GIT_IDENTITY: &[&str] = &[
    "-c",
    "user.name=SCM Bridge Tests",
    "-c",
    "user.email=tests@scm-bridge.invalid",
    "-c",
    "commit.gpgsign=false",
    "-c",
    "tag.gpgsign=false",
    "-c",
    "init.defaultBranch=main",
];

/// Check if network tests should be skipped.
///
/// Returns `true` if the `SKIP_NETWORK_TESTS` environment variable is set.
#[allow(dead_code)]
pub fn should_skip_network_tests() -> bool {
    env::var("SKIP_NETWORK_TESTS").is_ok()
}

/// Check whether `git lfs` is installed.
#[allow(dead_code)]
pub fn git_lfs_available() -> bool {
    Command::new("git")
        .args(["lfs", "version"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// A temporary directory in which git repositories are created.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Run git in `cwd` and return its trimmed stdout, panicking on failure.
    pub fn git(&self, cwd: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(GIT_IDENTITY)
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Create an empty repository with `main` as its default branch.
    pub fn init_repo(&self, path: &str) -> PathBuf {
        let repo = self.path().join(path);
        fs::create_dir_all(&repo).expect("Failed to create repository directory");
        self.git(&repo, &["init", "-q"]);
        self.git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        // lets a shallow fetch ask for any commit by id
        self.git(&repo, &["config", "uploadpack.allowAnySHA1InWant", "true"]);
        repo
    }

    /// Write `content` to `path` inside `repo`, commit it, and return the
    /// new HEAD commit.
    pub fn commit_file(&self, repo: &Path, path: &str, content: &str, message: &str) -> String {
        let file = repo.join(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file, content).expect("Failed to write file");
        self.git(repo, &["--literal-pathspecs", "add", "--", path]);
        self.git(repo, &["commit", "-q", "-m", message]);
        self.head(repo)
    }

    /// Record a gitlink for `path` pointing at `commit`, and declare it in
    /// `.gitmodules` with `url`. Nothing is cloned.
    #[allow(dead_code)]
    pub fn add_submodule(&self, repo: &Path, path: &str, url: &str, commit: &str) {
        let gitmodules = repo.join(".gitmodules");
        let mut content = fs::read_to_string(&gitmodules).unwrap_or_default();
        content.push_str(&format!(
            "[submodule \"{}\"]\n\tpath = {}\n\turl = {}\n",
            path, path, url
        ));
        fs::write(&gitmodules, content).expect("Failed to write .gitmodules");
        self.git(repo, &["add", ".gitmodules"]);
        self.git(
            repo,
            &[
                "update-index",
                "--add",
                "--cacheinfo",
                &format!("160000,{},{}", commit, path),
            ],
        );
    }

    /// Create a home directory whose global git configuration has the LFS
    /// filters installed. Pass it to [`TestFixture::command_with_home`].
    #[allow(dead_code)]
    pub fn lfs_home(&self) -> PathBuf {
        let home = self.path().join("home");
        fs::create_dir_all(&home).expect("Failed to create home directory");
        let output = Command::new("git")
            .args(["lfs", "install", "--skip-repo"])
            .env("HOME", &home)
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("GIT_CONFIG_GLOBAL")
            .output()
            .expect("Failed to run git lfs install");
        assert!(
            output.status.success(),
            "git lfs install failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        home
    }

    /// The current HEAD commit of `repo`.
    pub fn head(&self, repo: &Path) -> String {
        self.git(repo, &["rev-parse", "HEAD"])
    }

    /// Number of commits reachable from HEAD in `repo`.
    #[allow(dead_code)]
    pub fn history_length(&self, repo: &Path) -> usize {
        self.git(repo, &["rev-list", "--count", "HEAD"])
            .parse()
            .expect("rev-list --count did not print a number")
    }

    /// Create a command configured to run in this fixture's directory, with
    /// the full-history signal removed.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("scm-bridge");
        cmd.current_dir(self.path())
            .env_remove("OSC_VERSION")
            .env_remove("SCM_BRIDGE_GIT")
            .env("RUST_LOG", "warn");
        cmd
    }

    /// Like [`TestFixture::command`], with git reading its global
    /// configuration from `home`.
    #[allow(dead_code)]
    pub fn command_with_home(&self, home: &Path) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.env("HOME", home)
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("GIT_CONFIG_GLOBAL");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_commits() {
        let fixture = TestFixture::new();
        let repo = fixture.init_repo("repo");
        let first = fixture.commit_file(&repo, "a.txt", "a", "first");
        let second = fixture.commit_file(&repo, "b.txt", "b", "second");
        assert_ne!(first, second);
        assert_eq!(fixture.head(&repo), second);
        assert_eq!(fixture.history_length(&repo), 2);
    }
}
