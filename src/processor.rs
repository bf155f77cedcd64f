//! Output materialisation.
//! Writes the tree's output collection below the output directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::generator::Content;

/// Ensures the output directory is safe to write to.
///
/// # Errors
/// * `Error::OutputDirectoryExistsError` if the directory exists and `force`
///   is false
pub fn ensure_output_dir<P: AsRef<Path>>(output_dir: P, force: bool) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    if output_dir.exists() && !force {
        return Err(Error::OutputDirectoryExistsError {
            output_dir: output_dir.display().to_string(),
        });
    }
    Ok(output_dir.to_path_buf())
}

/// Whether a generated relative path stays inside the output directory.
///
/// A valid path is non-empty, relative, and has no empty, `.` or `..`
/// components.
pub fn is_rendered_path_valid(relative: &str) -> bool {
    if relative.is_empty() || relative.split('/').any(|part| part.is_empty()) {
        return false;
    }
    Path::new(relative)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

/// What was written, listed in generation order.
#[derive(Debug, Default, Serialize)]
pub struct WriteReport {
    pub output_dir: PathBuf,
    pub files: Vec<String>,
}

fn write_file(target: &Path, content: &Content) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content.as_bytes())?;
    Ok(())
}

/// Writes every generated file below `output_dir`.
///
/// # Errors
/// * `Error::InvalidOutputPath` if a generated path is not a valid relative
///   path; nothing is written in that case
/// * `Error::IoError` if writing fails
pub fn write_files<P: AsRef<Path>>(
    output_dir: P,
    files: &IndexMap<String, Content>,
) -> Result<WriteReport> {
    let output_dir = output_dir.as_ref();
    if let Some(invalid) = files.keys().find(|relative| !is_rendered_path_valid(relative)) {
        return Err(Error::InvalidOutputPath {
            path: invalid.clone(),
        });
    }

    fs::create_dir_all(output_dir)?;
    let mut report = WriteReport {
        output_dir: output_dir.to_path_buf(),
        files: Vec::with_capacity(files.len()),
    };
    for (relative, content) in files {
        let target = output_dir.join(relative);
        debug!("Writing file: {}", target.display());
        write_file(&target, content)?;
        report.files.push(relative.clone());
    }
    Ok(report)
}
