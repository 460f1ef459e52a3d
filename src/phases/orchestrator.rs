//! Orchestrator for a complete bridge run
//!
//! This module coordinates the phases to provide a clean API for both
//! operating modes.

use std::path::Path;

use log::info;

use super::{phase1, phase2, phase3, phase4, RootCheckout};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::locator::{self, LfsPolicy, Locator};
use crate::marker::Marker;
use crate::path::package_name_from_remote;
use crate::repository::{CheckoutRequest, GitOperations};
use crate::revision::Package;

/// What a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A pinned working tree plus marker.
    Checkout,
    /// One descriptor pair per package of the superproject.
    Project,
}

/// The result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Checkout(Marker),
    Project(Vec<Package>),
}

/// Execute a complete run for `raw_locator`.
///
/// Relative local remotes are made absolute against `cwd` first, so that
/// every recorded identity is absolute.
pub fn execute(
    raw_locator: &str,
    mode: Mode,
    git_ops: &dyn GitOperations,
    config: &Config,
    out_dir: &Path,
    cwd: &Path,
) -> Result<Outcome> {
    let locator = locator::parse(raw_locator)?.absolutized(cwd);
    info!("bridging {} ({:?} mode)", locator, mode);

    match mode {
        Mode::Checkout => execute_checkout(git_ops, config, &locator, out_dir).map(Outcome::Checkout),
        Mode::Project => execute_project(git_ops, config, &locator, out_dir).map(Outcome::Project),
    }
}

/// Phases 1-2: resolve and check out into `out_dir`.
pub fn execute_checkout(
    git_ops: &dyn GitOperations,
    config: &Config,
    locator: &Locator,
    out_dir: &Path,
) -> Result<Marker> {
    // Phase 1: Ref Resolution
    let revision = phase1::execute(git_ops, config, locator.remote(), locator.ref_spec())?;

    // Phase 2: Checkout
    phase2::execute(git_ops, locator, &revision, out_dir)
}

/// Phases 1-4: resolve, check the superproject out into a scratch directory,
/// traverse its submodules and write the descriptors into `out_dir`.
pub fn execute_project(
    git_ops: &dyn GitOperations,
    config: &Config,
    locator: &Locator,
    out_dir: &Path,
) -> Result<Vec<Package>> {
    if locator.subdir().is_some() {
        return Err(Error::malformed(
            &locator.to_string(),
            "'subdir' cannot be combined with project mode",
        ));
    }
    let name = package_name_from_remote(locator.remote()).ok_or_else(|| {
        Error::malformed(
            &locator.to_string(),
            "cannot derive a package name from the remote",
        )
    })?;
    phase4::prepare_project_dir(out_dir)?;

    // Phase 1: Ref Resolution
    let revision = phase1::execute(git_ops, config, locator.remote(), locator.ref_spec())?;

    // Phase 2: Checkout of the superproject, for traversal only
    let scratch = tempfile::Builder::new()
        .prefix("scm-bridge-project-")
        .tempdir()?;
    let request = CheckoutRequest {
        remote: locator.remote().to_string(),
        revision: revision.clone(),
        subdir: None,
        lfs: LfsPolicy::Off,
    };
    let dir = scratch.path().join("tree");
    phase2::checkout_verified(git_ops, &request, &dir)?;

    // Phase 3: Submodule Traversal
    let root = RootCheckout {
        dir,
        package: Package {
            name,
            remote: locator.remote().to_string(),
            revision,
        },
    };
    let packages = phase3::execute(git_ops, config, &root)?;

    // Phase 4: Descriptor Writing
    phase4::write_all(&packages, out_dir)?;
    info!(
        "wrote {} package descriptor(s) to {}",
        packages.len(),
        out_dir.display()
    );
    Ok(packages)
}
