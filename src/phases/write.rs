//! Phase 4: Descriptor Writing
//!
//! Emits the descriptor pair of each package into the output directory:
//!
//! - `{name}.xml`: `<package name="NAME"><scmsync>REMOTE#COMMIT</scmsync></package>`
//! - `{name}.info`: the commit id followed by a newline
//!
//! A pair is overwritten when it already exists. Nothing else is written in
//! project mode. [`write_all`] renders every pair into a staging directory
//! next to the output directory and only moves them into place once all of
//! them were written, so a failed run leaves the previous descriptors as they
//! were.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use xot::Xot;

use crate::error::{Error, Result, Stage};
use crate::revision::Package;

const XML_EXTENSION: &str = "xml";
const INFO_EXTENSION: &str = "info";

/// Render the XML descriptor of `package`.
pub fn render_xml(package: &Package) -> Result<String> {
    let xml_error = |e: xot::Error| {
        Error::output_dir(
            Stage::Write,
            Path::new(&package.name),
            format!("failed to render descriptor: {}", e),
        )
    };

    let mut xot = Xot::new();
    let package_name = xot.add_name("package");
    let name_attribute = xot.add_name("name");
    let scmsync_name = xot.add_name("scmsync");

    let root = xot.new_element(package_name);
    xot.attributes_mut(root)
        .insert(name_attribute, package.name.clone());
    let scmsync = xot.new_element(scmsync_name);
    xot.append_text(scmsync, &package.scmsync()).map_err(xml_error)?;
    xot.append(root, scmsync).map_err(xml_error)?;

    let document = xot.new_document_with_element(root).map_err(xml_error)?;
    let mut xml = xot.to_string(document).map_err(xml_error)?;
    xml.push('\n');
    Ok(xml)
}

/// Render the `.info` descriptor of `package`.
pub fn render_info(package: &Package) -> String {
    format!("{}\n", package.revision.commit())
}

/// Paths of the descriptor pair of a package named `name`.
pub fn descriptor_paths(out_dir: &Path, name: &str) -> (PathBuf, PathBuf) {
    (
        out_dir.join(format!("{}.{}", name, XML_EXTENSION)),
        out_dir.join(format!("{}.{}", name, INFO_EXTENSION)),
    )
}

/// Execute Phase 4 for one package: write its descriptor pair.
pub fn execute(package: &Package, out_dir: &Path) -> Result<()> {
    let (xml_path, info_path) = descriptor_paths(out_dir, &package.name);
    let xml = render_xml(package)?;

    fs::write(&xml_path, xml)
        .map_err(|e| Error::output_dir(Stage::Write, &xml_path, e.to_string()))?;
    fs::write(&info_path, render_info(package))
        .map_err(|e| Error::output_dir(Stage::Write, &info_path, e.to_string()))?;
    Ok(())
}

/// Write the descriptor pairs of all `packages`, in order.
///
/// Rendering and writing happen in a staging directory. A destination that
/// exists and is not a regular file fails the run before anything in
/// `out_dir` is replaced.
pub fn write_all(packages: &[Package], out_dir: &Path) -> Result<()> {
    let parent = match out_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".scm-bridge-")
        .tempdir_in(parent)
        .map_err(|e| Error::output_dir(Stage::Write, parent, e.to_string()))?;

    let mut moves: Vec<(PathBuf, PathBuf)> = Vec::new();
    for package in packages {
        execute(package, staging.path())?;
        let (staged_xml, staged_info) = descriptor_paths(staging.path(), &package.name);
        let (xml_path, info_path) = descriptor_paths(out_dir, &package.name);
        moves.push((staged_xml, xml_path));
        moves.push((staged_info, info_path));
    }

    for (_, destination) in &moves {
        if destination.exists() && !destination.is_file() {
            return Err(Error::output_dir(
                Stage::Write,
                destination,
                "exists and is not a regular file",
            ));
        }
    }

    for (staged, destination) in &moves {
        fs::rename(staged, destination)
            .map_err(|e| Error::output_dir(Stage::Write, destination, e.to_string()))?;
    }
    for package in packages {
        info!("wrote descriptors for {}", package.scmsync());
    }
    Ok(())
}

/// Make sure `out_dir` exists and holds nothing but descriptor files.
pub fn prepare_project_dir(out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        return fs::create_dir_all(out_dir)
            .map_err(|e| Error::output_dir(Stage::Write, out_dir, e.to_string()));
    }
    if !out_dir.is_dir() {
        return Err(Error::output_dir(
            Stage::Write,
            out_dir,
            "exists and is not a directory",
        ));
    }

    let entries =
        fs::read_dir(out_dir).map_err(|e| Error::output_dir(Stage::Write, out_dir, e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::output_dir(Stage::Write, out_dir, e.to_string()))?;
        let path = entry.path();
        let is_descriptor = path.is_file()
            && matches!(
                path.extension().and_then(|e| e.to_str()),
                Some(XML_EXTENSION) | Some(INFO_EXTENSION)
            );
        if !is_descriptor {
            return Err(Error::output_dir(
                Stage::Write,
                out_dir,
                format!(
                    "holds '{}', which is not a package descriptor",
                    entry.file_name().to_string_lossy()
                ),
            ));
        }
    }
    Ok(())
}
