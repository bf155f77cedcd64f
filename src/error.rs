//! Error handling for proyo.
//! Defines the errors that propagate to the caller. Failures inside a single
//! script fragment or template file are contained and only logged; see
//! [`crate::script::ScriptError`] for those.

use std::io;
use thiserror::Error;

/// Custom error types for proyo operations.
///
/// This enum represents every error that can escape the generation core.
/// It implements the standard Error trait through thiserror's derive macro.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// The template directory handed to proyo does not exist
    #[error("Template directory does not exist: {template_dir}.")]
    TemplateDoesNotExistsError { template_dir: String },

    /// The output directory exists and `--force` was not given
    #[error("Output directory already exists: {output_dir}. Use --force to overwrite it.")]
    OutputDirectoryExistsError { output_dir: String },

    /// A template asked to mount a subdirectory that is not there
    #[error("Subdirectory does not exist: {folder}.")]
    MountError { folder: String },

    /// Represents errors that occur while applying node configuration
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Represents errors in seeding variables from stdin, files or definitions
    #[error("Variables error: {0}.")]
    VariablesError(String),

    /// Represents errors in processing .proyoignore files
    #[error("ProyoIgnore error: {0}.")]
    ProyoIgnoreError(String),

    /// A generated path would escape or malform the output directory
    #[error("Invalid output path: '{path}'.")]
    InvalidOutputPath { path: String },
}

/// Convenience type alias for Results with Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The Error to handle
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
