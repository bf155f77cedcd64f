//! Program assembly.
//!
//! Source text is first flattened into a list of [`Instruction`]s with
//! balanced `Begin`/`End` markers, then compiled into a statement tree.
//! Control chunks derive the instruction list from indentation; template
//! files derive it from their control lines (see [`crate::generator`]).

use super::ast::Stmt;
use super::error::{ErrorKind, ScriptError, ScriptResult};
use super::lexer::bracket_delta;
use super::parser::{is_header, parse_header, parse_statement, Header};

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// A simple statement.
    Statement { code: String, line: usize },
    /// A block header such as `if x:`; its body runs until the matching `End`.
    Begin { header: String, line: usize },
    End { line: usize },
    /// Literal template text.
    Emit { text: String, line: usize },
}

fn indentation_error(detail: &str, line: usize) -> ScriptError {
    ScriptError::new(ErrorKind::IndentationError, detail).at_line(line)
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => break,
        }
    }
    width
}

/// Joins physical lines into logical lines, skipping blanks and comments.
///
/// Returns `(first physical line number, text)` pairs.
fn logical_lines(source: &str) -> ScriptResult<Vec<(usize, String)>> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String, i32)> = None;

    for (idx, raw) in source.split('\n').enumerate() {
        let number = idx + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some((start, mut text, depth)) = pending.take() {
            text.push('\n');
            text.push_str(raw);
            let depth = depth + bracket_delta(raw);
            if depth > 0 || text.ends_with('\\') {
                pending = Some((start, text, depth));
            } else {
                lines.push((start, text));
            }
            continue;
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let depth = bracket_delta(raw);
        if depth > 0 || raw.ends_with('\\') {
            pending = Some((number, raw.to_string(), depth));
        } else {
            lines.push((number, raw.to_string()));
        }
    }

    match pending {
        Some((start, _, _)) => {
            Err(ScriptError::syntax("unexpected EOF while parsing").at_line(start))
        }
        None => Ok(lines
            .into_iter()
            .map(|(n, text)| (n, text.replace("\\\n", " ")))
            .collect()),
    }
}

/// Converts indented script source into a flat instruction list.
pub fn instructions_from_indented(source: &str) -> ScriptResult<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut expecting_body = false;
    let mut last_line = 0;

    for (line, text) in logical_lines(source)? {
        let width = indent_width(&text);
        let content = text.trim().to_string();
        last_line = line;

        match stack.last().copied() {
            None => stack.push(width),
            Some(top) if expecting_body => {
                if width <= top {
                    return Err(indentation_error("expected an indented block", line));
                }
                stack.push(width);
            }
            Some(top) if width > top => {
                return Err(indentation_error("unexpected indent", line));
            }
            Some(_) => {
                while stack.last().is_some_and(|&top| width < top) {
                    stack.pop();
                    instructions.push(Instruction::End { line });
                }
                if stack.last() != Some(&width) {
                    return Err(indentation_error(
                        "unindent does not match any outer indentation level",
                        line,
                    ));
                }
            }
        }

        expecting_body = is_header(&content);
        if expecting_body {
            instructions.push(Instruction::Begin {
                header: content,
                line,
            });
        } else {
            instructions.push(Instruction::Statement {
                code: content,
                line,
            });
        }
    }

    if expecting_body {
        return Err(indentation_error("expected an indented block", last_line));
    }
    for _ in 1..stack.len() {
        instructions.push(Instruction::End { line: last_line });
    }
    Ok(instructions)
}

/// Parses indented script source into a statement tree.
pub fn parse_program(source: &str) -> ScriptResult<Vec<Stmt>> {
    compile(&instructions_from_indented(source)?)
}

/// Compiles a balanced instruction list into a statement tree.
pub fn compile(instructions: &[Instruction]) -> ScriptResult<Vec<Stmt>> {
    let mut pos = 0;
    let body = compile_block(instructions, &mut pos, None)?;
    match instructions.get(pos) {
        Some(Instruction::End { line }) => Err(indentation_error("too many unindents", *line)),
        _ => Ok(body),
    }
}

/// Compiles statements until the `End` closing the block opened at
/// `opened_at` (consumed), or until the end of input at top level.
fn compile_block(
    instructions: &[Instruction],
    pos: &mut usize,
    opened_at: Option<usize>,
) -> ScriptResult<Vec<Stmt>> {
    let mut body = Vec::new();
    while let Some(instruction) = instructions.get(*pos) {
        match instruction {
            Instruction::End { .. } => {
                if opened_at.is_some() {
                    *pos += 1;
                }
                return Ok(body);
            }
            Instruction::Emit { text, line } => {
                *pos += 1;
                body.push(Stmt::Emit {
                    text: text.clone(),
                    line: *line,
                });
            }
            Instruction::Statement { code, line } => {
                *pos += 1;
                body.push(parse_statement(code, *line).map_err(|e| e.at_line(*line))?);
            }
            Instruction::Begin { header, line } => {
                *pos += 1;
                let line = *line;
                let header = parse_header(header).map_err(|e| e.at_line(line))?;
                body.push(compile_compound(instructions, pos, header, line)?);
            }
        }
    }
    match opened_at {
        Some(line) => Err(indentation_error("indented block is never closed", line)),
        None => Ok(body),
    }
}

fn compile_body(
    instructions: &[Instruction],
    pos: &mut usize,
    line: usize,
) -> ScriptResult<Vec<Stmt>> {
    let body = compile_block(instructions, pos, Some(line))?;
    if body.is_empty() {
        return Err(indentation_error("expected an indented block", line));
    }
    Ok(body)
}

fn compile_compound(
    instructions: &[Instruction],
    pos: &mut usize,
    header: Header,
    line: usize,
) -> ScriptResult<Stmt> {
    match header {
        Header::If(cond) => {
            let mut branches = vec![(cond, compile_body(instructions, pos, line)?)];
            let mut orelse = Vec::new();
            // Attach `elif`/`else` blocks that directly follow.
            while let Some(Instruction::Begin { header, line }) = instructions.get(*pos) {
                let line = *line;
                match parse_header(header).map_err(|e| e.at_line(line))? {
                    Header::Elif(cond) => {
                        *pos += 1;
                        branches.push((cond, compile_body(instructions, pos, line)?));
                    }
                    Header::Else => {
                        *pos += 1;
                        orelse = compile_body(instructions, pos, line)?;
                        break;
                    }
                    _ => break,
                }
            }
            Ok(Stmt::If {
                branches,
                orelse,
                line,
            })
        }
        Header::For(vars, iter) => Ok(Stmt::For {
            vars,
            iter,
            body: compile_body(instructions, pos, line)?,
            line,
        }),
        Header::While(cond) => Ok(Stmt::While {
            cond,
            body: compile_body(instructions, pos, line)?,
            line,
        }),
        Header::With(context) => Ok(Stmt::With {
            context,
            body: compile_body(instructions, pos, line)?,
            line,
        }),
        Header::Elif(_) | Header::Else => {
            Err(ScriptError::syntax("invalid syntax: no matching 'if'").at_line(line))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation_to_instructions() {
        let source = "if a:\n    x = 1\nelse:\n    x = 2\ny = x\n";
        let instructions = instructions_from_indented(source).unwrap();
        assert_eq!(
            instructions,
            vec![
                Instruction::Begin { header: "if a:".into(), line: 1 },
                Instruction::Statement { code: "x = 1".into(), line: 2 },
                Instruction::End { line: 3 },
                Instruction::Begin { header: "else:".into(), line: 3 },
                Instruction::Statement { code: "x = 2".into(), line: 4 },
                Instruction::End { line: 5 },
                Instruction::Statement { code: "y = x".into(), line: 5 },
            ]
        );
    }

    #[test]
    fn test_else_attaches_to_if() {
        let program = parse_program("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n").unwrap();
        assert_eq!(program.len(), 1);
        match &program[0] {
            Stmt::If { branches, orelse, .. } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_multiline_brackets() {
        let program = parse_program("x = {\n    'a': 1,  # one\n    'b': 2,\n}\ny = 1\n").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program[1].line(), 5);
    }

    #[test]
    fn test_indentation_errors() {
        let err = parse_program("x = 1\n    y = 2\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndentationError);
        assert_eq!(err.line, Some(2));

        let err = parse_program("if x:\ny = 2\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndentationError);

        let err = parse_program("if x:\n        y = 2\n    z = 3\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndentationError);
    }

    #[test]
    fn test_syntax_error_line() {
        let err = parse_program("x = 1\n\ny = (2 +\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn test_compile_rejects_extra_end() {
        let err = compile(&[
            Instruction::Statement { code: "x = 1".into(), line: 1 },
            Instruction::End { line: 2 },
        ])
        .unwrap_err();
        assert_eq!(err.detail, "too many unindents");
    }
}
