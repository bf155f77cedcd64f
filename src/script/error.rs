use std::fmt;
use thiserror::Error;

/// Category of a script failure, named the way template authors see it in
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    IndentationError,
    NameError,
    TypeError,
    ValueError,
    KeyError,
    IndexError,
    AttributeError,
    ZeroDivisionError,
    OverflowError,
    OSError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::IndentationError => "IndentationError",
            ErrorKind::NameError => "NameError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ValueError => "ValueError",
            ErrorKind::KeyError => "KeyError",
            ErrorKind::IndexError => "IndexError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::ZeroDivisionError => "ZeroDivisionError",
            ErrorKind::OverflowError => "OverflowError",
            ErrorKind::OSError => "OSError",
        };
        f.write_str(name)
    }
}

/// A failure raised while compiling or executing a script.
///
/// `line` is 1-based within the source that was compiled (a control-file
/// chunk or a template file) and is filled in by the innermost statement that
/// knows its position.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {detail}")]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub detail: String,
    pub line: Option<usize>,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            line: None,
        }
    }

    pub fn syntax(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, detail)
    }

    pub fn type_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, detail)
    }

    /// Attaches a line number unless a more precise one is already set.
    pub fn at_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }
}

pub type ScriptResult<T> = Result<T, ScriptError>;
