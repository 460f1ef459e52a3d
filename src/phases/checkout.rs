//! Phase 2: Checkout
//!
//! Materializes a resolved revision into the output directory.
//!
//! The tree is built in a staging directory next to the output directory, so
//! the final move is a rename on the same filesystem. Only once the engine's
//! HEAD has been verified against the pinned commit, and the requested subdir
//! has been found, does anything happen to the output directory. The marker is
//! written last; an output directory without a marker is never authoritative.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result, Stage};
use crate::locator::Locator;
use crate::marker::{inspect_output_dir, Marker, OutputDirState};
use crate::repository::{CheckoutRequest, GitOperations};
use crate::revision::{CommitId, ResolvedRevision};

/// Execute Phase 2: check `revision` of the locator's remote out into `out_dir`.
pub fn execute(
    git_ops: &dyn GitOperations,
    locator: &Locator,
    revision: &ResolvedRevision,
    out_dir: &Path,
) -> Result<Marker> {
    let state = inspect_output_dir(out_dir)?;
    if state == OutputDirState::Occupied {
        return Err(Error::output_dir(
            Stage::Materialize,
            out_dir,
            "exists and holds content that is not a previous checkout",
        ));
    }

    let parent = match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .map_err(|e| Error::output_dir(Stage::Materialize, parent, e.to_string()))?;
    let staging = tempfile::Builder::new()
        .prefix(".scm-bridge-")
        .tempdir_in(parent)
        .map_err(|e| Error::output_dir(Stage::Materialize, parent, e.to_string()))?;
    let tree = staging.path().join("tree");

    let request = CheckoutRequest {
        remote: locator.remote().to_string(),
        revision: revision.clone(),
        subdir: locator.subdir().map(str::to_string),
        lfs: locator.lfs(),
    };
    let head = checkout_verified(git_ops, &request, &tree)?;

    let source = match locator.subdir() {
        Some(subdir) => {
            let source = tree.join(subdir);
            if !source.is_dir() {
                return Err(Error::SubdirNotFound {
                    remote: request.remote,
                    commit: head.to_string(),
                    subdir: subdir.to_string(),
                });
            }
            source
        }
        None => tree,
    };

    match state {
        OutputDirState::Missing | OutputDirState::Occupied => {}
        OutputDirState::Empty => fs::remove_dir(out_dir)
            .map_err(|e| Error::output_dir(Stage::Materialize, out_dir, e.to_string()))?,
        OutputDirState::PreviousCheckout(previous) => {
            info!("replacing previous checkout of {}", previous.scmsync);
            fs::remove_dir_all(out_dir)
                .map_err(|e| Error::output_dir(Stage::Materialize, out_dir, e.to_string()))?;
        }
    }

    debug!("moving {} to {}", source.display(), out_dir.display());
    fs::rename(&source, out_dir)
        .map_err(|e| Error::output_dir(Stage::Materialize, out_dir, e.to_string()))?;

    let marker = Marker::new(
        locator.remote(),
        head.as_str(),
        locator.ref_spec(),
        locator.subdir(),
    );
    marker.write(out_dir)?;
    info!("checked out {} into {}", marker.scmsync, out_dir.display());
    Ok(marker)
}

/// Run the engine for `request` and verify that HEAD is the pinned commit.
pub fn checkout_verified(
    git_ops: &dyn GitOperations,
    request: &CheckoutRequest,
    dir: &Path,
) -> Result<CommitId> {
    debug!(
        "checking out {}#{} (depth {:?}, lfs {:?})",
        request.remote,
        request.revision.commit(),
        request.revision.fetch_depth(),
        request.lfs
    );
    let head = git_ops.checkout(request, dir)?;
    if &head != request.revision.commit() {
        return Err(Error::ChecksumDrift {
            remote: request.remote.clone(),
            expected: request.revision.commit().to_string(),
            actual: head.to_string(),
        });
    }
    Ok(head)
}
