//! # Checkout Marker
//!
//! After a plain checkout has fully succeeded, a small YAML file named
//! `_scmsync.obsinfo` is written at the root of the output directory. It
//! records which `remote#commit` the tree was materialized from, the ref the
//! caller asked for, and the subdir the tree was restricted to.
//!
//! The marker serves two purposes:
//!
//! - Downstream consumers read the pinned identity without running git.
//! - A re-run against the same output directory recognizes the directory as
//!   one of its own and replaces it, instead of refusing to touch it.
//!
//! The marker is never part of the checked-out content and is not written
//! in project mode.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, Stage};

/// File name of the marker inside the output directory.
pub const MARKER_FILE: &str = "_scmsync.obsinfo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// `{remote}#{commit}`, always for the whole repository.
    pub scmsync: String,
    pub remote: String,
    pub commit: String,
    /// The ref or commit the locator asked for, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
}

impl Marker {
    pub fn new(
        remote: &str,
        commit: &str,
        revision: Option<&str>,
        subdir: Option<&str>,
    ) -> Self {
        Self {
            scmsync: format!("{}#{}", remote, commit),
            remote: remote.to_string(),
            commit: commit.to_string(),
            revision: revision.map(str::to_string),
            subdir: subdir.map(str::to_string),
        }
    }

    /// Write the marker into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::output_dir(Stage::Materialize, dir, e.to_string()))?;
        let path = dir.join(MARKER_FILE);
        fs::write(&path, content).map_err(|e| {
            Error::output_dir(
                Stage::Materialize,
                &path,
                format!("failed to write marker: {}", e),
            )
        })
    }

    /// Read the marker from `dir`, `Ok(None)` if there is none.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MARKER_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::output_dir(Stage::Materialize, &path, e.to_string()))?;
        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|e| Error::output_dir(Stage::Materialize, &path, e.to_string()))
    }
}

/// What an output directory contains before a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDirState {
    Missing,
    Empty,
    /// Left behind by an earlier successful checkout.
    PreviousCheckout(Marker),
    /// Anything else; never overwritten.
    Occupied,
}

/// Inspect `dir` to decide whether a checkout may be placed there.
pub fn inspect_output_dir(dir: &Path) -> Result<OutputDirState> {
    if !dir.exists() {
        return Ok(OutputDirState::Missing);
    }
    if !dir.is_dir() {
        return Ok(OutputDirState::Occupied);
    }

    let mut entries = fs::read_dir(dir)
        .map_err(|e| Error::output_dir(Stage::Materialize, dir, e.to_string()))?;
    if entries.next().is_none() {
        return Ok(OutputDirState::Empty);
    }

    match Marker::read(dir) {
        Ok(Some(marker)) => Ok(OutputDirState::PreviousCheckout(marker)),
        // an unreadable marker is not proof of ownership
        Ok(None) | Err(_) => Ok(OutputDirState::Occupied),
    }
}
