//! Per-node generation options.
//! Options are inherited by child nodes when they are mounted and are
//! independent afterwards. Scripts change them through `proyo.config(...)`
//! or temporarily through `with proyo.config_as(...):`.

use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;

use crate::constants::DEFAULT_VAR_REGEX;
use crate::error::{Error, Result};
use crate::script::Value;

/// Recognized option names
pub const CONFIG_KEYS: [&str; 2] = ["collect_files", "var_regex"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Whether regular files are rendered into the output collection at all.
    collect_files: bool,
    /// Placeholder syntax; capture group 1 holds the expression.
    var_regex: Regex,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collect_files: true,
            var_regex: Regex::new(DEFAULT_VAR_REGEX).expect("default placeholder regex is valid"),
        }
    }
}

impl Config {
    pub fn collect_files(&self) -> bool {
        self.collect_files
    }

    pub fn var_regex(&self) -> &Regex {
        &self.var_regex
    }

    /// Merges recognized options, warning about unknown ones.
    ///
    /// # Errors
    /// * `Error::ConfigError` if a value has the wrong type or `var_regex`
    ///   does not compile to a pattern with a capture group. On error the
    ///   configuration is left untouched.
    pub fn apply(&mut self, params: &IndexMap<String, Value>) -> Result<()> {
        let mut updated = self.clone();
        for (key, value) in params {
            match key.as_str() {
                "collect_files" => match value {
                    Value::Bool(b) => updated.collect_files = *b,
                    other => {
                        return Err(Error::ConfigError(format!(
                            "collect_files must be a bool, got {}",
                            other.type_name()
                        )))
                    }
                },
                "var_regex" => {
                    let pattern = value.as_str().ok_or_else(|| {
                        Error::ConfigError(format!(
                            "var_regex must be a str, got {}",
                            value.type_name()
                        ))
                    })?;
                    let regex = Regex::new(pattern).map_err(|e| {
                        Error::ConfigError(format!("invalid var_regex '{pattern}': {e}"))
                    })?;
                    if regex.captures_len() < 2 {
                        return Err(Error::ConfigError(format!(
                            "var_regex '{pattern}' needs a capture group for the expression"
                        )));
                    }
                    updated.var_regex = regex;
                }
                unknown => warn!(
                    "Unknown config option '{}' (known options: {})",
                    unknown,
                    CONFIG_KEYS.join(", ")
                ),
            }
        }
        debug!("Config updated: {:?}", updated);
        *self = updated;
        Ok(())
    }
}
