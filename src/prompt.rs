//! User interaction for proyo.
//! Confirmation prompts go through the [`Prompter`] trait so the binary can
//! use dialoguer while tests answer programmatically.

use dialoguer::Confirm;

use crate::error::{Error, Result};

pub trait Prompter {
    /// Asks a yes/no question. Returns true without asking when `skip` is set.
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool>;
}

#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool> {
        if skip {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| Error::IoError(std::io::Error::other(e.to_string())))
    }
}

/// Asks whether the post-run chunks of `files` may run.
pub fn confirm_post_run(
    prompter: &dyn Prompter,
    files: &[std::path::PathBuf],
    skip: bool,
) -> Result<bool> {
    if files.is_empty() {
        return Ok(false);
    }
    let listing: Vec<String> = files.iter().map(|f| format!("  {}", f.display())).collect();
    prompter.confirm(
        skip,
        format!(
            "WARNING: these control files have post-run steps that may execute commands on your system:\n{}\nRun them?",
            listing.join("\n")
        ),
    )
}
