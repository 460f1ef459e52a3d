//! Path and remote manipulation utilities for scm-bridge

use url::{Position, Url};

/// Why a subdir value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubdirError {
    Empty,
    Absolute,
    ParentTraversal,
}

impl std::fmt::Display for SubdirError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            SubdirError::Empty => "subdir must not be empty",
            SubdirError::Absolute => "subdir must be a relative path",
            SubdirError::ParentTraversal => "subdir must not contain '..' segments",
        };
        f.write_str(message)
    }
}

/// Normalize a subdir value into `a/b/c` form.
///
/// Only `/` separates segments; a backslash is part of a directory name.
/// Empty and `.` segments are dropped. Absolute paths and `..` segments are
/// rejected, as is anything that normalizes to nothing.
pub fn normalize_subdir(raw: &str) -> Result<String, SubdirError> {
    if raw.starts_with('/') {
        return Err(SubdirError::Absolute);
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(SubdirError::ParentTraversal),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(SubdirError::Empty);
    }
    Ok(segments.join("/"))
}

/// Whether a submodule url is relative to its superproject's remote.
pub fn is_relative_remote(remote: &str) -> bool {
    remote.starts_with("./") || remote.starts_with("../") || remote == "." || remote == ".."
}

/// Split a remote into the part that must be kept verbatim and the path that
/// relative urls operate on.
///
/// - `https://host/org/repo` -> (`https://host`, `/org/repo`)
/// - `git@host:org/repo`     -> (`git@host:`, `org/repo`)
/// - `/srv/git/repo`         -> (``, `/srv/git/repo`)
fn split_remote(remote: &str) -> (String, String) {
    if remote.contains("://") {
        if let Ok(url) = Url::parse(remote) {
            return (
                url[..Position::BeforePath].to_string(),
                url[Position::BeforePath..Position::AfterPath].to_string(),
            );
        }
    }

    if let Some((host, path)) = split_scp_like(remote) {
        return (format!("{}:", host), path.to_string());
    }

    (String::new(), remote.to_string())
}

/// Split an scp-like remote (`user@host:path`) into host and path.
pub fn split_scp_like(remote: &str) -> Option<(&str, &str)> {
    if remote.contains("://") {
        return None;
    }
    let (host, path) = remote.split_once(':')?;
    // a colon after a slash belongs to a local path
    if host.is_empty() || host.contains('/') || host.contains('\\') {
        return None;
    }
    // single letter drive prefixes are local windows paths
    if host.len() == 1 && !host.contains('@') {
        return None;
    }
    Some((host, path))
}

/// Resolve a relative submodule url against the superproject's remote.
///
/// Like git, the base remote is treated as a directory: `../sibling` against
/// `https://host/org/super` gives `https://host/org/sibling` and `./child`
/// gives `https://host/org/super/child`. Returns `None` if the relative url
/// climbs above the root of the base remote.
pub fn resolve_relative_remote(base: &str, relative: &str) -> Option<String> {
    let (prefix, path) = split_remote(base.trim_end_matches('/'));
    let rooted = path.starts_with('/');

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return None;
    }

    let joined = segments.join("/");
    Some(if rooted {
        format!("{}/{}", prefix, joined)
    } else {
        format!("{}{}", prefix, joined)
    })
}

/// Derive a package name from a remote: its last path component without a
/// trailing `.git`.
pub fn package_name_from_remote(remote: &str) -> Option<String> {
    let (_, path) = split_remote(remote.trim_end_matches('/'));
    let last = path.rsplit(['/', '\\']).find(|s| !s.is_empty())?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    is_valid_package_name(name).then(|| name.to_string())
}

/// Derive a package name from a submodule path: its last component.
pub fn package_name_from_path(path: &str) -> Option<String> {
    let last = path.rsplit('/').find(|s| !s.is_empty())?;
    is_valid_package_name(last).then(|| last.to_string())
}

/// A package name must be usable as a plain file stem.
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
