//! # Run Configuration
//!
//! This module defines `Config`, the explicit configuration value threaded
//! through every stage of a bridge run. Nothing in the library reads or mutates
//! ambient git configuration on its own; whatever the git engine needs
//! (binary location, identity, credential helpers, protocol allowances) is
//! carried here and handed to each subprocess as `-c key=value` pairs.
//!
//! ## Key Components
//!
//! - **`Config`**: git binary, extra git config overrides, and the fetch-depth
//!   policy switch.
//!
//! - **`FULL_HISTORY_ENV`**: The environment variable whose presence requests
//!   full history. It is exported by `osc`, which inspects the history of the
//!   checkout and therefore cannot work with a shallow clone.

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Presence of this variable forces a full-history fetch.
pub const FULL_HISTORY_ENV: &str = "OSC_VERSION";

/// Explicit configuration for one bridge invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The git executable to drive.
    pub git_binary: PathBuf,
    /// Extra `-c key=value` pairs passed to every git invocation.
    pub git_config: Vec<(String, String)>,
    /// Fetch complete history instead of a single commit.
    pub full_history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            git_config: Vec::new(),
            full_history: false,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment.
    ///
    /// Only the presence of [`FULL_HISTORY_ENV`] is inspected; its value is
    /// irrelevant.
    pub fn from_env() -> Self {
        Self {
            full_history: env::var_os(FULL_HISTORY_ENV).is_some(),
            ..Self::default()
        }
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<PathBuf>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn with_full_history(mut self, full_history: bool) -> Self {
        self.full_history = full_history;
        self
    }

    /// Add a git configuration override, e.g. `user.name` for fixture commits
    /// or `credential.helper` for private remotes.
    pub fn with_git_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.git_config.push((key.into(), value.into()));
        self
    }

    /// Parse a `key=value` override as given on the command line.
    pub fn parse_git_config_override(raw: &str) -> Result<(String, String)> {
        match raw.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(Error::malformed(
                raw,
                "git config override must have the form key=value",
            )),
        }
    }

    /// The `-c key=value` argument pairs for a git command line.
    pub fn git_config_args(&self) -> Vec<String> {
        self.git_config
            .iter()
            .flat_map(|(key, value)| ["-c".to_string(), format!("{}={}", key, value)])
            .collect()
    }
}
