//! Regular file generation.
//!
//! A template file is literal text interleaved with control lines:
//!
//! ```text
//! # ~ if with_tests:
//! [dev-dependencies]
//! {{test_crate}} = "1"
//! # ~
//! ```
//!
//! Control lines carry one statement each; a statement ending in `:` opens a
//! block and an empty control line closes one. Literal runs between control
//! lines become output, with `{{expr}}` placeholders substituted.

use std::path::Path;
use std::sync::LazyLock;

use log::{debug, error};
use regex::Regex;

use crate::constants::{CONTROL_LINE, LINES_VAR};
use crate::fragment;
use crate::script::{
    self, ErrorKind, Instruction, Interpreter, ScriptError, ScriptResult, Value,
};
use crate::tree::{NodeId, Tree};

static CONTROL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CONTROL_LINE).expect("control line regex is valid"));

/// Generated file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    /// Content that is not valid UTF-8, copied verbatim.
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(data) => data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Generated {
    /// Stored in the output collection under this path.
    Emitted(String),
    /// Produced no lines, or a path placeholder was falsy.
    Suppressed,
    Failed(ScriptError),
}

/// Returns the statement carried by a control line, or `None` for literal
/// lines. Lines whose marker is doubled (`# ~~`) are literal.
fn control_statement(line: &str) -> Option<&str> {
    let caps = CONTROL.captures(line)?;
    let rest = caps.get(1)?.as_str();
    if rest.starts_with('~') {
        return None;
    }
    Some(rest.trim())
}

fn flush(literal: &mut Vec<&str>, start: usize, out: &mut Vec<Instruction>) {
    if !literal.is_empty() {
        out.push(Instruction::Emit {
            text: literal.join("\n"),
            line: start,
        });
        literal.clear();
    }
}

/// Turns template content into a flat instruction list.
pub fn transpile(content: &str) -> ScriptResult<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut literal: Vec<&str> = Vec::new();
    let mut literal_start = 1;
    let mut depth = 0usize;

    for (idx, line) in content.split('\n').enumerate() {
        let number = idx + 1;
        match control_statement(line) {
            None => {
                if literal.is_empty() {
                    literal_start = number;
                }
                literal.push(line);
            }
            Some(code) => {
                flush(&mut literal, literal_start, &mut instructions);
                if code.is_empty() {
                    if depth == 0 {
                        return Err(ScriptError::new(ErrorKind::IndentationError, "Too many unindents")
                            .at_line(number));
                    }
                    depth -= 1;
                    instructions.push(Instruction::End { line: number });
                } else if code.ends_with(':') {
                    depth += 1;
                    instructions.push(Instruction::Begin {
                        header: code.to_string(),
                        line: number,
                    });
                } else {
                    instructions.push(Instruction::Statement {
                        code: code.to_string(),
                        line: number,
                    });
                }
            }
        }
    }
    flush(&mut literal, literal_start, &mut instructions);

    if depth > 0 {
        return Err(ScriptError::new(
            ErrorKind::IndentationError,
            format!("{depth} indents remaining at end of file"),
        ));
    }
    Ok(instructions)
}

/// Runs the template program against the node's full scope, returning the
/// emitted lines.
fn render(tree: &mut Tree, id: NodeId, content: &str) -> ScriptResult<Vec<String>> {
    let program = script::compile(&transpile(content)?)?;
    let mut interpreter = Interpreter::with_scope(tree, id);
    interpreter.set_var(LINES_VAR, Value::List(Vec::new()));
    interpreter.execute(&program)?;
    match interpreter.get_var(LINES_VAR) {
        Some(Value::List(lines)) => Ok(lines.iter().map(|line| line.to_string()).collect()),
        Some(other) => Err(ScriptError::type_error(format!(
            "{LINES_VAR} must be a list, not {}",
            other.type_name()
        ))),
        None => Ok(Vec::new()),
    }
}

/// Resolves the placeholders of an output path. `Ok(None)` means one of them
/// was falsy, so the file must not be emitted.
fn resolve_path(tree: &mut Tree, id: NodeId, relative: &str) -> ScriptResult<Option<String>> {
    let regex = tree.node(id).config().var_regex().clone();
    let mut interpreter = Interpreter::with_scope(tree, id);
    let mut out = String::with_capacity(relative.len());
    let mut last = 0;
    for caps in regex.captures_iter(relative) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = interpreter.eval_source(inner.as_str())?;
        if !value.is_truthy() {
            return Ok(None);
        }
        out.push_str(&relative[last..whole.start()]);
        out.push_str(&value.to_string());
        last = whole.end();
    }
    out.push_str(&relative[last..]);
    Ok(Some(out))
}

/// Generates one regular file into the tree's output collection.
///
/// # Arguments
/// * `relative` - Output path relative to the node root, placeholders included
/// * `path` - Source file in the template directory
pub fn generate_file(tree: &mut Tree, id: NodeId, relative: &str, path: &Path) -> Generated {
    let bytes = match tree.load_bytes(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to generate {}: {}", path.display(), e);
            return Generated::Failed(ScriptError::new(ErrorKind::OSError, e.to_string()));
        }
    };

    let content = match String::from_utf8(bytes) {
        Ok(text) => match render(tree, id, &text) {
            Ok(lines) if lines.is_empty() => {
                debug!("{} produced no output", relative);
                return Generated::Suppressed;
            }
            Ok(lines) => Content::Text(lines.join("\n")),
            Err(err) => {
                fragment::report("generating", relative, &err, &text);
                return Generated::Failed(err);
            }
        },
        Err(e) => {
            // Binary content skips the mini-language and path placeholders.
            tree.emit(relative.to_string(), Content::Binary(e.into_bytes()));
            return Generated::Emitted(relative.to_string());
        }
    };

    match resolve_path(tree, id, relative) {
        Ok(Some(destination)) => {
            tree.emit(destination.clone(), content);
            Generated::Emitted(destination)
        }
        Ok(None) => {
            debug!("Path placeholder of {} is empty, skipping", relative);
            Generated::Suppressed
        }
        Err(err) => {
            debug!("Path placeholder of {} did not resolve: {}", relative, err);
            Generated::Suppressed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpile_blocks() {
        let content = "a\n# ~ if x:\nb\n# ~\nc";
        let instructions = transpile(content).unwrap();
        assert_eq!(
            instructions,
            vec![
                Instruction::Emit { text: "a".into(), line: 1 },
                Instruction::Begin { header: "if x:".into(), line: 2 },
                Instruction::Emit { text: "b".into(), line: 3 },
                Instruction::End { line: 4 },
                Instruction::Emit { text: "c".into(), line: 5 },
            ]
        );
    }

    #[test]
    fn test_doubled_marker_is_literal() {
        let instructions = transpile("# ~~ not code").unwrap();
        assert_eq!(
            instructions,
            vec![Instruction::Emit { text: "# ~~ not code".into(), line: 1 }]
        );
    }

    #[test]
    fn test_too_many_unindents() {
        let err = transpile("a\n# ~\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndentationError);
        assert_eq!(err.detail, "Too many unindents");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_unclosed_block() {
        let err = transpile("# ~ for i in range(2):\nx\n").unwrap_err();
        assert_eq!(err.detail, "1 indents remaining at end of file");
    }
}
