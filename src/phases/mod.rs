//! Implementation of the phases of a bridge run.
//!
//! ## Overview
//!
//! Every run follows the same pipeline:
//! 1. Ref Resolution - Pin the locator's ref or commit to an exact commit
//! 2. Checkout - Materialize the pinned tree, restricted to a subdir if asked
//! 3. Submodule Traversal - Turn the superproject's submodules into packages
//! 4. Descriptor Writing - Emit one `.xml`/`.info` pair per package
//!
//! A plain run stops after Phase 2 and leaves a working tree plus a marker in
//! the output directory. A project-mode run checks the superproject out into a
//! scratch directory and continues with Phases 3 and 4.
//!
//! Each phase depends only on the previous phases and the foundation layers
//! (locator, revision, repository).

use std::path::PathBuf;

use crate::revision::Package;

// Phase modules
pub mod checkout;
pub mod orchestrator;
pub mod resolve;
pub mod submodules;
pub mod write;

pub use checkout as phase2;
pub use resolve as phase1;
pub use submodules as phase3;
pub use write as phase4;

/// A superproject checked out for traversal.
#[derive(Debug, Clone)]
pub struct RootCheckout {
    /// Working tree of the superproject, with its `.git`.
    pub dir: PathBuf,
    /// The superproject itself, pinned.
    pub package: Package,
}
