//! Pinned revisions and packages
//!
//! A [`ResolvedRevision`] is the single source of truth for what gets
//! materialized and what gets recorded in descriptors. It is created once by
//! the resolver and never modified afterwards.

use std::fmt;

/// The object hash algorithm a repository uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Length of a full object id in hex characters.
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Sha256 => 64,
        }
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(HashAlgorithm::Sha1),
            64 => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }
}

/// Shortest prefix accepted as an abbreviated commit id.
pub const MIN_ABBREV_LEN: usize = 7;

/// A full hexadecimal commit id, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    /// Parse a full commit id. Returns `None` unless `hex` is all hex digits
    /// and exactly as long as a SHA-1 or SHA-256 object id.
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        HashAlgorithm::from_hex_len(hex.len())?;
        if !is_hex(hex) {
            return None;
        }
        Some(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self.0.len() {
            64 => HashAlgorithm::Sha256,
            _ => HashAlgorithm::Sha1,
        }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Whether `s` could be an abbreviated commit id.
pub fn is_abbreviated_commit(s: &str) -> bool {
    s.len() >= MIN_ABBREV_LEN && s.len() < HashAlgorithm::Sha256.hex_len() && is_hex(s)
}

/// The exact commit to pin, plus how it may be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRevision {
    commit: CommitId,
    shallow_eligible: bool,
    refname: Option<String>,
}

impl ResolvedRevision {
    pub fn new(commit: CommitId, shallow_eligible: bool) -> Self {
        Self {
            commit,
            shallow_eligible,
            refname: None,
        }
    }

    /// Record the full refname (`refs/heads/main`) the commit was read from.
    pub fn with_refname(mut self, refname: impl Into<String>) -> Self {
        self.refname = Some(refname.into());
        self
    }

    pub fn commit(&self) -> &CommitId {
        &self.commit
    }

    pub fn is_shallow_eligible(&self) -> bool {
        self.shallow_eligible
    }

    pub fn refname(&self) -> Option<&str> {
        self.refname.as_deref()
    }

    /// Fetch depth to request, `None` for full history.
    pub fn fetch_depth(&self) -> Option<u32> {
        self.shallow_eligible.then_some(1)
    }
}

/// One unit of output: a repository pinned at a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// Always absolute.
    pub remote: String,
    pub revision: ResolvedRevision,
}

impl Package {
    /// The `{remote}#{commit}` identity recorded in descriptors.
    pub fn scmsync(&self) -> String {
        format!("{}#{}", self.remote, self.revision.commit())
    }
}
