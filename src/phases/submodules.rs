//! Phase 3: Submodule Traversal
//!
//! Reads the superproject's `.gitmodules` and turns every declared submodule
//! into a [`Package`] pinned at the commit the superproject's tree records
//! for it (the gitlink), not at the submodule's branch tip.
//!
//! Only one level is described. Relative submodule urls are resolved against
//! the root package's remote, and layouts that would need a deeper level
//! (a submodule path inside another submodule path) are rejected.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use ini::{Ini, ParseOption};
use log::{debug, info};

use super::RootCheckout;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::locator::{scheme_of, Scheme};
use crate::path::{
    is_relative_remote, normalize_subdir, package_name_from_path, resolve_relative_remote,
};
use crate::repository::GitOperations;
use crate::revision::{Package, ResolvedRevision};

/// File holding the submodule declarations.
pub const GITMODULES_FILE: &str = ".gitmodules";

/// One `[submodule "name"]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleDeclaration {
    pub name: String,
    pub path: Option<String>,
    pub url: Option<String>,
}

/// Execute Phase 3: the root package followed by one package per declared
/// submodule, in declaration order.
pub fn execute(
    git_ops: &dyn GitOperations,
    config: &Config,
    root: &RootCheckout,
) -> Result<Vec<Package>> {
    let declarations = read_declarations(&root.dir)?;
    info!(
        "{} declares {} submodule(s)",
        root.package.scmsync(),
        declarations.len()
    );

    let mut names = HashSet::from([root.package.name.clone()]);
    let mut paths: Vec<String> = Vec::new();
    let mut packages = vec![root.package.clone()];

    for declaration in declarations {
        let raw_path = declaration.path.as_deref().ok_or_else(|| {
            Error::submodule(&declaration.name, "declaration has no 'path'")
        })?;
        let path = normalize_subdir(raw_path)
            .map_err(|e| Error::submodule(raw_path, e.to_string()))?;
        let url = declaration
            .url
            .as_deref()
            .ok_or_else(|| Error::submodule(&path, "declaration has no 'url'"))?;

        if let Some(outer) = paths.iter().find(|p| is_nested(p, &path)) {
            return Err(Error::submodule(
                &path,
                format!("overlaps submodule '{}'; nested submodules are not supported", outer),
            ));
        }

        let remote = absolute_remote(&root.package.remote, url)
            .map_err(|message| Error::submodule(&path, message))?;

        let name = package_name_from_path(&path)
            .ok_or_else(|| Error::submodule(&path, "cannot derive a package name"))?;
        if !names.insert(name.clone()) {
            return Err(Error::submodule(
                &path,
                format!("package name '{}' is already taken", name),
            ));
        }

        let commit = git_ops
            .read_gitlink(&root.dir, &path)?
            .ok_or_else(|| Error::submodule(&path, "no gitlink recorded in the superproject"))?;
        debug!("submodule {} -> {}#{}", path, remote, commit);

        packages.push(Package {
            name,
            remote,
            revision: ResolvedRevision::new(commit, !config.full_history),
        });
        paths.push(path);
    }

    Ok(packages)
}

/// Read the declarations from the checkout in `dir`. A missing
/// `.gitmodules` declares nothing.
pub fn read_declarations(dir: &Path) -> Result<Vec<SubmoduleDeclaration>> {
    let path = dir.join(GITMODULES_FILE);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::submodule(GITMODULES_FILE, e.to_string()))?;
    parse_gitmodules(&content)
}

/// Parse `.gitmodules` content, keeping section order.
pub fn parse_gitmodules(content: &str) -> Result<Vec<SubmoduleDeclaration>> {
    let option = ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(content, option)
        .map_err(|e| Error::submodule(GITMODULES_FILE, e.to_string()))?;

    let mut declarations = Vec::new();
    for (section, properties) in ini.iter() {
        let Some(name) = section.and_then(submodule_name) else {
            continue;
        };
        // git config keys are case-insensitive
        let lookup = |key: &str| {
            properties
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.trim().to_string())
        };
        declarations.push(SubmoduleDeclaration {
            name,
            path: lookup("path"),
            url: lookup("url"),
        });
    }
    Ok(declarations)
}

/// `submodule "name"` -> `name`
fn submodule_name(section: &str) -> Option<String> {
    let (kind, rest) = section.trim().split_once(char::is_whitespace)?;
    if !kind.eq_ignore_ascii_case("submodule") {
        return None;
    }
    let name = rest.trim().trim_matches('"');
    (!name.is_empty()).then(|| name.to_string())
}

/// Whether one of two submodule paths lies inside the other.
fn is_nested(a: &str, b: &str) -> bool {
    a == b || b.starts_with(&format!("{}/", a)) || a.starts_with(&format!("{}/", b))
}

fn absolute_remote(root_remote: &str, url: &str) -> std::result::Result<String, String> {
    if is_relative_remote(url) {
        return resolve_relative_remote(root_remote, url).ok_or_else(|| {
            format!(
                "relative url '{}' climbs above the root of {}",
                url, root_remote
            )
        });
    }
    if scheme_of(url) == Scheme::Local
        && !url.starts_with("file://")
        && !Path::new(url).is_absolute()
    {
        return Err(format!(
            "url '{}' is neither absolute nor relative to the superproject",
            url
        ));
    }
    Ok(url.to_string())
}
