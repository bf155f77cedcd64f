//! Template and macro loading for proyo.
//! Locates the template directory and reads macro files, whose bodies replace
//! same-named template files during generation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Replacement file bodies keyed by file base name.
pub type Macros = HashMap<String, String>;

/// Returns the template directory after checking that it exists.
///
/// # Errors
/// * `Error::TemplateDoesNotExistsError` if `template` is not a directory
pub fn load_template<P: AsRef<Path>>(template: P) -> Result<PathBuf> {
    let path = template.as_ref();
    if !path.is_dir() {
        return Err(Error::TemplateDoesNotExistsError {
            template_dir: path.display().to_string(),
        });
    }
    debug!("Using template from '{}'.", path.display());
    Ok(path.to_path_buf())
}

/// Reads every regular file directly inside `folder` as a macro.
///
/// # Errors
/// * `Error::TemplateDoesNotExistsError` if `folder` is not a directory
/// * `Error::IoError` if a macro file cannot be read as text
pub fn load_macros<P: AsRef<Path>>(folder: P) -> Result<Macros> {
    let folder = folder.as_ref();
    if !folder.is_dir() {
        return Err(Error::TemplateDoesNotExistsError {
            template_dir: folder.display().to_string(),
        });
    }

    let mut macros = Macros::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        debug!("Loading macro '{}'.", name);
        macros.insert(name, fs::read_to_string(entry.path())?);
    }
    Ok(macros)
}
