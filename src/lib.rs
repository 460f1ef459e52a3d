//! # SCM Bridge Library
//!
//! This library turns a single locator string into a pinned, reproducible
//! checkout of a git repository, or, in project mode, into one descriptor
//! pair per package of a superproject and its submodules. It is designed to
//! be used by the `scm-bridge` command-line tool that build services invoke,
//! but every stage can be driven on its own.
//!
//! ## Quick Example
//!
//! ```
//! use scm_bridge::locator::{self, LfsPolicy, Scheme};
//!
//! let locator = locator::parse("https://example.com/repo?subdir=test&lfs=0#main").unwrap();
//! assert_eq!(locator.scheme(), Scheme::Network);
//! assert_eq!(locator.remote(), "https://example.com/repo");
//! assert_eq!(locator.subdir(), Some("test"));
//! assert_eq!(locator.ref_spec(), Some("main"));
//! assert_eq!(locator.lfs(), LfsPolicy::Off);
//! ```
//!
//! ## Core Concepts
//!
//! - **Locators (`locator`)**: `<remote>[?subdir=..][&lfs=0|1][#ref-or-commit]`,
//!   parsed without any I/O.
//! - **Revisions (`revision`)**: commit ids, the resolved revision that pins a
//!   checkout, and the packages that carry a `remote#commit` identity.
//! - **Git Engine (`repository`, `git`)**: the `GitOperations` seam and its
//!   default implementation on top of the system `git` command.
//! - **Phases (`phases`)**: the pipeline from ref resolution to descriptor
//!   writing.
//! - **Output (`marker`)**: the marker a plain checkout leaves behind.
//!
//! ## Execution Flow
//!
//! The main entry point is `phases::orchestrator`:
//!
//! 1.  **Parse** the locator and make a relative local remote absolute.
//! 2.  **Resolve** the ref or commit to an exact commit and a fetch depth.
//! 3.  **Materialize** the pinned tree, verified against the resolved commit.
//! 4.  **Traverse** the submodules of the superproject (project mode).
//! 5.  **Write** the descriptor pairs (project mode) or the marker.

pub mod config;
pub mod error;
pub mod git;
pub mod locator;
pub mod marker;
pub mod path;
pub mod phases;
pub mod repository;
pub mod revision;

#[cfg(test)]
mod path_proptest;
