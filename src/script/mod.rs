//! The embedded script language used by control files and templates.
//!
//! A small, Python-flavoured language: expressions, assignments, `if`,
//! `for`, `while` and `with` blocks, plus a handful of builtins.

mod ast;
mod builtins;
mod error;
mod interp;
mod lexer;
mod parser;
mod program;
mod value;

pub use ast::{Expr, Stmt};
pub use error::{ErrorKind, ScriptError, ScriptResult};
pub use interp::Interpreter;
pub use parser::parse_expr;
pub use program::{compile, instructions_from_indented, parse_program, Instruction};
pub use value::Value;
