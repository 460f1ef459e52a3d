//! # Locator Parsing
//!
//! A locator is the single string that identifies what to check out:
//!
//! ```text
//! <remote>[?subdir=<path>][&lfs=<0|1>][#<ref-or-commit>]
//! ```
//!
//! The fragment is split off at the first `#`, then the query at the first
//! `?`. Query pairs may be separated by `&` or by a repeated `?`. Only the
//! keys in [`QueryKey`] are recognized; anything else is rejected so that a
//! typo never silently changes what gets materialized.
//!
//! Parsing is pure: no I/O and no remote access. The fragment is kept
//! verbatim because telling a branch from a tag from a commit needs the
//! remote (see `phases::resolve`). Relative remotes such as `../sibling` are
//! accepted here; turning them into absolute remotes happens during
//! submodule traversal.

use std::fmt;
use std::path::Path;

use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::path::{normalize_subdir, split_scp_like};

/// How the remote is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Network,
    Local,
}

/// Large-file-storage policy requested by the locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfsPolicy {
    /// Let the git engine decide based on the repository's attribute filters.
    #[default]
    Auto,
    /// Always download LFS objects.
    On,
    /// Leave LFS pointer files un-smudged and never contact the LFS endpoint.
    Off,
}

/// The fixed set of recognized query keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKey {
    /// Restrict the materialized tree to one subdirectory.
    Subdir,
    /// Override the LFS policy.
    Lfs,
}

impl QueryKey {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "subdir" => Some(QueryKey::Subdir),
            "lfs" => Some(QueryKey::Lfs),
            _ => None,
        }
    }
}

/// A parsed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    scheme: Scheme,
    remote: String,
    subdir: Option<String>,
    ref_spec: Option<String>,
    lfs: LfsPolicy,
}

impl Locator {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn subdir(&self) -> Option<&str> {
        self.subdir.as_deref()
    }

    pub fn ref_spec(&self) -> Option<&str> {
        self.ref_spec.as_deref()
    }

    pub fn lfs(&self) -> LfsPolicy {
        self.lfs
    }

    /// Make a relative local remote absolute against `base_dir`.
    ///
    /// Network remotes and absolute paths are returned unchanged.
    pub fn absolutized(mut self, base_dir: &Path) -> Self {
        if self.scheme == Scheme::Local && !self.remote.starts_with("file://") {
            let path = Path::new(&self.remote);
            if path.is_relative() {
                self.remote = base_dir.join(path).display().to_string();
            }
        }
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.remote)?;
        let mut separator = '?';
        if let Some(subdir) = &self.subdir {
            write!(f, "{}subdir={}", separator, subdir)?;
            separator = '&';
        }
        match self.lfs {
            LfsPolicy::On => write!(f, "{}lfs=1", separator)?,
            LfsPolicy::Off => write!(f, "{}lfs=0", separator)?,
            LfsPolicy::Auto => {}
        }
        if let Some(ref_spec) = &self.ref_spec {
            write!(f, "#{}", ref_spec)?;
        }
        Ok(())
    }
}

/// Classify a remote string.
pub fn scheme_of(remote: &str) -> Scheme {
    if remote.starts_with("file://") {
        return Scheme::Local;
    }
    if let Some((scheme, _)) = remote.split_once("://") {
        if !scheme.is_empty() && !scheme.contains('/') {
            return Scheme::Network;
        }
    }
    if split_scp_like(remote).is_some() {
        return Scheme::Network;
    }
    Scheme::Local
}

/// Parse a locator string.
pub fn parse(raw: &str) -> Result<Locator> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::malformed(raw, "locator is empty"));
    }

    let (rest, fragment) = match trimmed.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (trimmed, None),
    };

    let ref_spec = match fragment {
        Some("") => return Err(Error::malformed(raw, "empty ref after '#'")),
        Some(fragment) => Some(fragment.to_string()),
        None => None,
    };

    let (remote, query) = match rest.split_once('?') {
        Some((remote, query)) => (remote, Some(query)),
        None => (rest, None),
    };

    if remote.is_empty() {
        return Err(Error::malformed(raw, "remote is empty"));
    }
    // would be taken for an option by the git engine
    if remote.starts_with('-') {
        return Err(Error::malformed(raw, "remote must not start with '-'"));
    }

    let mut subdir = None;
    let mut lfs = None;

    if let Some(query) = query {
        // a repeated '?' is accepted as a pair separator
        let query = query.replace('?', "&");
        for segment in query.split('&').filter(|s| !s.is_empty()) {
            if !segment.contains('=') {
                return Err(Error::malformed(
                    raw,
                    format!("query parameter '{}' has no value", segment),
                ));
            }
        }

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            let key = QueryKey::from_name(&name).ok_or_else(|| {
                Error::malformed(raw, format!("unrecognized query key '{}'", name))
            })?;

            match key {
                QueryKey::Subdir => {
                    if subdir.is_some() {
                        return Err(Error::malformed(raw, "'subdir' given more than once"));
                    }
                    let normalized = normalize_subdir(&value)
                        .map_err(|e| Error::malformed(raw, e.to_string()))?;
                    subdir = Some(normalized);
                }
                QueryKey::Lfs => {
                    if lfs.is_some() {
                        return Err(Error::malformed(raw, "'lfs' given more than once"));
                    }
                    lfs = Some(match &*value {
                        "1" => LfsPolicy::On,
                        "0" => LfsPolicy::Off,
                        other => {
                            return Err(Error::malformed(
                                raw,
                                format!("'lfs' must be 0 or 1, got '{}'", other),
                            ))
                        }
                    });
                }
            }
        }
    }

    Ok(Locator {
        scheme: scheme_of(remote),
        remote: remote.to_string(),
        subdir,
        ref_spec,
        lfs: lfs.unwrap_or_default(),
    })
}
