//! Template variable seeding.
//! Variables reach the initial scope from stdin (JSON), a variables file
//! (JSON or YAML) and `-D key=value` definitions, merged in that order so
//! later sources win.

use std::fs;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, Result};
use crate::script::Value;

/// Where to take variables from.
#[derive(Debug, Default)]
pub struct VariableSources<'a> {
    pub stdin: bool,
    pub vars_file: Option<&'a Path>,
    pub definitions: &'a [String],
}

fn into_variables(
    value: serde_json::Value,
    origin: &str,
) -> Result<IndexMap<String, Value>> {
    match value {
        serde_json::Value::Object(map) => {
            Ok(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
        }
        serde_json::Value::Null => Ok(IndexMap::new()),
        other => Err(Error::VariablesError(format!(
            "{origin} must hold an object, got {other}"
        ))),
    }
}

/// Parses a JSON object of variables. Empty input yields no variables.
pub fn parse_json_variables(text: &str, origin: &str) -> Result<IndexMap<String, Value>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(IndexMap::new());
    }
    let value = serde_json::from_str(text)
        .map_err(|e| Error::VariablesError(format!("{origin} is not valid JSON: {e}")))?;
    into_variables(value, origin)
}

pub fn load_from_stdin() -> Result<IndexMap<String, Value>> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    parse_json_variables(&buffer, "stdin")
}

/// Loads a variables file; `.yml`/`.yaml` files are YAML, anything else JSON.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<IndexMap<String, Value>> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let text = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    );
    if !is_yaml {
        return parse_json_variables(&text, &origin);
    }
    let value: serde_json::Value = serde_yaml::from_str(&text)
        .map_err(|e| Error::VariablesError(format!("{origin} is not valid YAML: {e}")))?;
    into_variables(value, &origin)
}

/// Parses a `key=value` definition. The value is read as JSON when it parses,
/// otherwise it is taken as a plain string.
pub fn parse_definition(definition: &str) -> Result<(String, Value)> {
    let (key, raw) = definition.split_once('=').ok_or_else(|| {
        Error::VariablesError(format!("definition '{definition}' is not of the form key=value"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::VariablesError(format!(
            "definition '{definition}' has an empty name"
        )));
    }
    let value = serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::Str(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Collects variables from every requested source.
pub fn get_variables(sources: &VariableSources) -> Result<IndexMap<String, Value>> {
    let mut variables = IndexMap::new();
    if sources.stdin {
        variables.extend(load_from_stdin()?);
    }
    if let Some(path) = sources.vars_file {
        variables.extend(load_from_file(path)?);
    }
    for definition in sources.definitions {
        let (key, value) = parse_definition(definition)?;
        variables.insert(key, value);
    }
    debug!("Seeded variables: {:?}", variables.keys());
    Ok(variables)
}
