//! # Git Engine Seam
//!
//! The bridge never talks to a repository directly. Every remote query,
//! fetch, checkout and tree lookup goes through the `GitOperations` trait,
//! which separates the checkout-resolution logic from the concrete engine.
//!
//! In the main application `DefaultGitOperations` is used, which drives the
//! system `git` command (see [`crate::git`]). In tests the trait is replaced
//! with mock implementations that simulate remotes, drifting checkouts and
//! failures without running git or touching the network.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::git::RemoteRefs;
use crate::locator::LfsPolicy;
use crate::revision::{CommitId, ResolvedRevision};

/// Everything the engine needs to produce one working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub remote: String,
    pub revision: ResolvedRevision,
    pub subdir: Option<String>,
    pub lfs: LfsPolicy,
}

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Enumerates `HEAD`, branches and tags of a remote.
    fn list_remote_refs(&self, remote: &str) -> Result<RemoteRefs>;

    /// Expands an abbreviated commit id against everything reachable from the
    /// remote's branches and tags. `Ok(None)` if no single commit matches.
    fn expand_abbreviated_commit(&self, remote: &str, prefix: &str) -> Result<Option<CommitId>>;

    /// Whether the engine can fetch a single commit by id without knowing a
    /// ref that points at it.
    fn supports_fetch_by_commit(&self, remote: &str) -> bool;

    /// Materializes `request` into the empty directory `dir` and returns the
    /// commit the resulting working tree's HEAD points at.
    fn checkout(&self, request: &CheckoutRequest, dir: &Path) -> Result<CommitId>;

    /// Reads the gitlink commit recorded at `path` in the HEAD tree of the
    /// checkout in `dir`. `Ok(None)` if `path` is not a gitlink.
    fn read_gitlink(&self, dir: &Path, path: &str) -> Result<Option<CommitId>>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
pub struct DefaultGitOperations {
    config: Config,
}

impl DefaultGitOperations {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl GitOperations for DefaultGitOperations {
    fn list_remote_refs(&self, remote: &str) -> Result<RemoteRefs> {
        crate::git::ls_remote(&self.config, remote)
    }

    fn expand_abbreviated_commit(&self, remote: &str, prefix: &str) -> Result<Option<CommitId>> {
        crate::git::expand_abbreviated_commit(&self.config, remote, prefix)
    }

    fn supports_fetch_by_commit(&self, _remote: &str) -> bool {
        // protocol v2 servers accept any reachable object as a want
        true
    }

    fn checkout(&self, request: &CheckoutRequest, dir: &Path) -> Result<CommitId> {
        crate::git::checkout(&self.config, request, dir)
    }

    fn read_gitlink(&self, dir: &Path, path: &str) -> Result<Option<CommitId>> {
        crate::git::read_gitlink(&self.config, dir, path)
    }
}
