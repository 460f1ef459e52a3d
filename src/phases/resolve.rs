//! Phase 1: Ref Resolution
//!
//! Turns the optional ref-or-commit token of a locator into the exact commit
//! to pin, and decides how deep the fetch may be.
//!
//! ## Resolution order
//!
//! 1.  **No token**: the remote's `HEAD` (its default branch tip).
//! 2.  **Full commit id** (40 or 64 hex digits): pinned directly, without
//!     asking the remote anything.
//! 3.  **Refname**: `refs/...` is looked up verbatim; otherwise the token is
//!     tried as a branch, then as a tag. When both a branch and a tag carry
//!     the name, the branch wins.
//! 4.  **Abbreviated commit id**: a hex token of at least seven digits that
//!     names no ref is expanded by the engine.
//!
//! Anything else is `RefNotFound`.
//!
//! ## Fetch depth
//!
//! A single-commit fetch is used unless [`Config::full_history`] is set. A
//! bare commit id only stays shallow when the engine can fetch a commit by
//! id. Depth never changes which commit is pinned.

use log::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::git::{RemoteRef, RemoteRefs};
use crate::repository::GitOperations;
use crate::revision::{is_abbreviated_commit, CommitId, ResolvedRevision};

/// Execute Phase 1: resolve `ref_spec` on `remote` to a pinned revision.
pub fn execute(
    git_ops: &dyn GitOperations,
    config: &Config,
    remote: &str,
    ref_spec: Option<&str>,
) -> Result<ResolvedRevision> {
    let shallow = !config.full_history;

    let Some(spec) = ref_spec else {
        let refs = git_ops.list_remote_refs(remote)?;
        let head = refs.head().ok_or_else(|| Error::RefNotFound {
            remote: remote.to_string(),
            refspec: "HEAD".to_string(),
            reason: "remote has no default branch".to_string(),
        })?;
        info!("resolved default branch of {} to {}", remote, head.commit);
        return Ok(ResolvedRevision::new(head.commit.clone(), shallow).with_refname("HEAD"));
    };

    if let Some(commit) = CommitId::parse(spec) {
        debug!("{} is a full commit id, skipping remote lookup", spec);
        let shallow = shallow && git_ops.supports_fetch_by_commit(remote);
        return Ok(ResolvedRevision::new(commit, shallow));
    }

    let refs = git_ops.list_remote_refs(remote)?;
    if let Some(found) = lookup_ref(&refs, spec) {
        info!("resolved {} on {} to {} ({})", spec, remote, found.commit, found.name);
        return Ok(ResolvedRevision::new(found.commit.clone(), shallow).with_refname(&found.name));
    }

    if is_abbreviated_commit(spec) {
        debug!("{} names no ref, expanding it as an abbreviated commit", spec);
        return match git_ops.expand_abbreviated_commit(remote, spec)? {
            Some(commit) => {
                info!("expanded {} on {} to {}", spec, remote, commit);
                let shallow = shallow && git_ops.supports_fetch_by_commit(remote);
                Ok(ResolvedRevision::new(commit, shallow))
            }
            None => Err(Error::RefNotFound {
                remote: remote.to_string(),
                refspec: spec.to_string(),
                reason: "no branch, tag or unique commit matches".to_string(),
            }),
        };
    }

    Err(Error::RefNotFound {
        remote: remote.to_string(),
        refspec: spec.to_string(),
        reason: "no branch or tag with this name".to_string(),
    })
}

/// Find the ref `spec` names. Branches take precedence over tags.
pub fn lookup_ref<'a>(refs: &'a RemoteRefs, spec: &str) -> Option<&'a RemoteRef> {
    if spec == "HEAD" || spec.starts_with("refs/") {
        return refs.get(spec);
    }
    refs.get(&format!("refs/heads/{}", spec))
        .or_else(|| refs.get(&format!("refs/tags/{}", spec)))
}
