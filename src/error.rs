//! # Error Handling
//!
//! This module defines the centralized error type for `scm-bridge`. It uses
//! the `thiserror` library to build one `Error` enum covering every failure
//! the bridge can surface to the calling orchestrator.
//!
//! ## Key Components
//!
//! - **`Error`**: One variant per failure kind. Every variant carries the
//!   offending input (locator substring, ref name, submodule path, output
//!   path) so the message alone is enough to diagnose a failed run.
//!
//! - **`Stage`**: The pipeline stage an error belongs to (`parse`, `resolve`,
//!   `materialize`, `traverse`, `write`). Every rendered message starts with
//!   the stage tag.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! All errors are terminal for the current invocation. Nothing is retried
//! internally; the orchestrator that invoked the bridge owns retry policy.

use std::fmt;

use thiserror::Error;

/// The pipeline stage in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Resolve,
    Materialize,
    Traverse,
    Write,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Resolve => "resolve",
            Stage::Materialize => "materialize",
            Stage::Traverse => "traverse",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for scm-bridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// The locator string could not be split into a valid remote plus
    /// optional query and fragment components.
    #[error("[parse] malformed locator '{locator}': {reason}")]
    MalformedLocator { locator: String, reason: String },

    /// The requested ref matched neither a commit id nor a branch or tag.
    #[error("[resolve] ref '{refspec}' not found on {remote}: {reason}")]
    RefNotFound {
        remote: String,
        refspec: String,
        reason: String,
    },

    /// The remote could not be queried at all.
    #[error("[{stage}] remote {remote} is unreachable: {message}")]
    RemoteUnreachable {
        stage: Stage,
        remote: String,
        message: String,
    },

    /// The materialized HEAD is not the commit that was resolved.
    #[error("[materialize] checkout of {remote} drifted: expected {expected}, HEAD is {actual}")]
    ChecksumDrift {
        remote: String,
        expected: String,
        actual: String,
    },

    /// LFS objects were required but could not be fetched.
    #[error("[materialize] LFS objects for {remote} could not be fetched: {message}")]
    LfsFetch { remote: String, message: String },

    /// The output directory could not be prepared or written.
    #[error("[{stage}] output directory {path}: {message}")]
    OutputDir {
        stage: Stage,
        path: String,
        message: String,
    },

    /// The requested subdirectory does not exist in the pinned commit.
    #[error("[materialize] subdir '{subdir}' does not exist in {remote}#{commit}")]
    SubdirNotFound {
        remote: String,
        commit: String,
        subdir: String,
    },

    /// A declared submodule could not be turned into a package.
    #[error("[traverse] submodule '{path}': {message}")]
    SubmoduleResolution { path: String, message: String },

    /// The git engine failed for a reason none of the typed errors covers.
    #[error("[{stage}] git {command} failed: {stderr}")]
    GitCommand {
        stage: Stage,
        command: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("[materialize] I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The pipeline stage this error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            Error::MalformedLocator { .. } => Stage::Parse,
            Error::RefNotFound { .. } => Stage::Resolve,
            Error::RemoteUnreachable { stage, .. }
            | Error::OutputDir { stage, .. }
            | Error::GitCommand { stage, .. } => *stage,
            Error::ChecksumDrift { .. }
            | Error::LfsFetch { .. }
            | Error::SubdirNotFound { .. }
            | Error::Io(_) => Stage::Materialize,
            Error::SubmoduleResolution { .. } => Stage::Traverse,
        }
    }

    pub(crate) fn malformed(locator: &str, reason: impl Into<String>) -> Self {
        Error::MalformedLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn output_dir(
        stage: Stage,
        path: &std::path::Path,
        message: impl Into<String>,
    ) -> Self {
        Error::OutputDir {
            stage,
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn submodule(path: &str, message: impl Into<String>) -> Self {
        Error::SubmoduleResolution {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
