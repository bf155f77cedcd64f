//! Control-file chunk execution.
//!
//! A control file holds up to three chunks separated by `# ~~~` lines, one
//! per [`Phase`]. Each chunk declares what it reads from the node's scope
//! (`name = ...`) and what it writes back (`... = name`). Only the declared
//! imports are visible to the chunk, and only the declared exports leave it.
//! Every failure is logged and contained to the chunk.

use std::path::Path;
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use log::{debug, error, warn};
use regex::Regex;

use crate::constants::CHUNK_SEPARATOR;
use crate::script::{self, ErrorKind, Interpreter, ScriptError, Value};
use crate::tree::{NodeId, Tree};

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CHUNK_SEPARATOR).expect("chunk separator regex is valid"));

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*([A-Za-z_][A-Za-z_0-9]*)[ \t]*=[ \t]*\.\.\.[ \t]*(?:#.*)?$")
        .expect("import regex is valid")
});

static EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\.\.\.[ \t]*=[ \t]*([A-Za-z_][A-Za-z_0-9]*)[ \t]*(?:#.*)?$")
        .expect("export regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Run,
    PostRun,
}

impl Phase {
    /// Verb used in diagnostics.
    pub fn action(&self) -> &'static str {
        match self {
            Phase::Parse => "parsing",
            Phase::Run => "running",
            Phase::PostRun => "post-running",
        }
    }

    pub fn chunk_index(&self) -> usize {
        match self {
            Phase::Parse => 0,
            Phase::Run => 1,
            Phase::PostRun => 2,
        }
    }
}

/// Splits control file text into its chunks.
pub fn split_chunks(text: &str) -> Vec<&str> {
    SEPARATOR.split(text).collect()
}

/// Import and export declarations of a chunk, with the declaration lines
/// blanked out of `body` so line numbers still match the chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarations {
    pub imports: IndexSet<String>,
    pub exports: IndexSet<String>,
    pub body: String,
}

impl Declarations {
    pub fn extract(chunk: &str) -> Self {
        let imports = IMPORT
            .captures_iter(chunk)
            .map(|caps| caps[1].to_string())
            .collect();
        let exports = EXPORT
            .captures_iter(chunk)
            .map(|caps| caps[1].to_string())
            .collect();
        let body = IMPORT.replace_all(chunk, "");
        let body = EXPORT.replace_all(&body, "").into_owned();
        Self {
            imports,
            exports,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// The chunk ran; these exports were merged into the scope.
    Exported(IndexMap<String, Value>),
    /// Some imports were missing from the scope, nothing ran.
    Unresolved(Vec<String>),
    Failed(ScriptError),
}

/// Executes one chunk against node `id`.
///
/// # Arguments
/// * `chunk` - Chunk text, declarations included
/// * `label` - Origin shown in diagnostics, usually the control file path
pub fn run_chunk(tree: &mut Tree, id: NodeId, phase: Phase, chunk: &str, label: &str) -> ChunkOutcome {
    let declarations = Declarations::extract(chunk);
    let scope = tree.scope(id);

    let missing: Vec<String> = declarations
        .imports
        .iter()
        .filter(|name| !scope.contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!(
            "Warning when {} {}: Could not resolve variables: {}",
            phase.action(),
            label,
            missing.join(", ")
        );
        return ChunkOutcome::Unresolved(missing);
    }

    let locals: IndexMap<String, Value> = declarations
        .imports
        .iter()
        .filter_map(|name| scope.get(name).map(|value| (name.clone(), value.clone())))
        .collect();

    let result = script::parse_program(&declarations.body).and_then(|program| {
        let mut interpreter = Interpreter::with_locals(tree, id, locals);
        interpreter.execute(&program)?;
        let locals = interpreter.into_locals();
        let unresolved: Vec<&str> = declarations
            .exports
            .iter()
            .filter(|name| !locals.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !unresolved.is_empty() {
            return Err(ScriptError::new(
                ErrorKind::NameError,
                format!("Could not resolve variables: {}", unresolved.join(", ")),
            ));
        }
        Ok(declarations
            .exports
            .iter()
            .filter_map(|name| locals.get(name).map(|value| (name.clone(), value.clone())))
            .collect::<IndexMap<String, Value>>())
    });

    match result {
        Ok(exports) => {
            debug!("{} {} exported {:?}", phase.action(), label, exports.keys());
            match phase {
                Phase::Parse => tree.update(id, exports.clone()),
                Phase::Run | Phase::PostRun => tree.update_global(id, exports.clone()),
            }
            ChunkOutcome::Exported(exports)
        }
        Err(err) => {
            report(phase.action(), label, &err, &declarations.body);
            ChunkOutcome::Failed(err)
        }
    }
}

/// Logs a script failure with the offending line when it is known.
pub(crate) fn report(action: &str, label: &str, err: &ScriptError, source: &str) {
    error!("Error when {} {}, {}: {}", action, label, err.kind, err.detail);
    if let Some(line) = err.line {
        match source.split('\n').nth(line.wrapping_sub(1)) {
            Some(text) if line > 0 => error!("Line {}: {}", line, text),
            _ => error!("On line {}", line),
        }
    }
}

/// Loads control file `path` and runs its chunk for `phase`, if present.
pub fn run_control_file(tree: &mut Tree, id: NodeId, path: &Path, phase: Phase) -> Option<ChunkOutcome> {
    let label = path.display().to_string();
    let text = match tree.load_text(path) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to load {}: {}", label, e);
            return None;
        }
    };
    let chunks = split_chunks(&text);
    match chunks.get(phase.chunk_index()) {
        Some(chunk) => Some(run_chunk(tree, id, phase, chunk, &label)),
        None => {
            debug!("{} has no chunk for {}", label, phase.action());
            None
        }
    }
}
