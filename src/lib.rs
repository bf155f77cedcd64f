//! proyo is a hierarchical project scaffolding engine.
//! A template directory is turned into a tree of generated files by running
//! the template's control files in phases against a tree of variable scopes
//! and expanding every regular file through a small control-line language.

/// Command-line interface module for the proyo application
pub mod cli;

/// Per-node generation options (`collect_files`, `var_regex`)
pub mod config;

pub mod constants;

/// Error types and handling for the proyo application
pub mod error;

/// Phased execution of control file chunks
/// Handles the `name = ...` imports and `... = name` exports of each chunk
pub mod fragment;

/// Expansion of regular template files into output content
pub mod generator;

/// File and directory ignore patterns
/// Processes .proyoignore files to exclude specific paths
pub mod ignore;

/// Template directory and macro loading
pub mod loader;

/// Variable seeding from stdin, files and definitions
pub mod parser;

/// Writing generated files to the output directory
pub mod processor;

/// User input and interaction handling
pub mod prompt;

pub mod scope;

/// The embedded script language
pub mod script;

/// The template context tree and its traversal phases
pub mod tree;
