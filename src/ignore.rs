//! File and directory ignore pattern handling for proyo templates.
//! This module processes .proyoignore files to exclude specific paths
//! from template traversal, similar to .gitignore functionality.

use crate::constants::{DEFAULT_IGNORE_PATTERNS, IGNORE_FILE};
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::{fs::read_to_string, path::Path};

fn add_pattern(builder: &mut GlobSetBuilder, pattern: &str) -> Result<()> {
    builder.add(Glob::new(pattern).map_err(|e| {
        Error::ProyoIgnoreError(format!("{IGNORE_FILE} loading failed: {e}"))
    })?);
    Ok(())
}

/// Reads the template's .proyoignore file into a set of glob patterns.
///
/// Patterns match paths relative to the template root. The default patterns
/// are always part of the set, whether the file exists or not.
///
/// # Example
/// ```ignore
/// # Contents of .proyoignore:
/// *.pyc
/// __pycache__/**
/// ```
///
/// # Errors
/// * `Error::ProyoIgnoreError` for an invalid pattern
pub fn parse_ignore_file<P: AsRef<Path>>(template_root: P) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_IGNORE_PATTERNS {
        add_pattern(&mut builder, pattern)?;
    }

    let ignore_path = template_root.as_ref().join(IGNORE_FILE);
    if let Ok(contents) = read_to_string(&ignore_path) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            add_pattern(&mut builder, line)?;
        }
    } else {
        debug!("{} does not exist", ignore_path.display());
    }

    builder
        .build()
        .map_err(|e| Error::ProyoIgnoreError(format!("{IGNORE_FILE} loading failed: {e}")))
}
