//! Expression and single-line statement parser.
//!
//! Operator precedence (lowest to highest):
//!   conditional → or → and → not → comparison → additive →
//!   multiplicative → unary → postfix → primary

use super::ast::{BinOp, CmpOp, Expr, Stmt, Target};
use super::error::{ScriptError, ScriptResult};
use super::lexer::{Lexer, Token};
use super::value::Value;

const KEYWORDS: [&str; 14] = [
    "if", "elif", "else", "for", "in", "while", "with", "and", "or", "not", "pass", "break",
    "continue", "is",
];

/// Opening line of a block, without its body.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    If(Expr),
    Elif(Expr),
    Else,
    For(Vec<String>, Expr),
    While(Expr),
    With(Expr),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> ScriptResult<Self> {
        Ok(Parser {
            tokens: Lexer::new(src).tokenize()?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> ScriptResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(ScriptError::syntax(format!("expected {what}, found {}", describe(self.peek()))))
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == word)
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.is_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_end(&self) -> ScriptResult<()> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(ScriptError::syntax(format!("invalid syntax near {}", describe(other)))),
        }
    }

    /// Strips the trailing `:` of a block header.
    fn take_trailing_colon(&mut self) -> bool {
        let len = self.tokens.len();
        if len >= 2 && self.tokens[len - 2] == Token::Colon {
            self.tokens.remove(len - 2);
            true
        } else {
            false
        }
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> ScriptResult<Expr> {
        let then = self.parse_or()?;
        if self.eat_keyword("if") {
            let cond = self.parse_or()?;
            if !self.eat_keyword("else") {
                return Err(ScriptError::syntax("expected 'else' in conditional expression"));
            }
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(then)
    }

    fn parse_or(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> ScriptResult<Expr> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ScriptResult<Expr> {
        let lhs = self.parse_additive()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Eq => CmpOp::Eq,
                Token::Ne => CmpOp::Ne,
                Token::Lt => CmpOp::Lt,
                Token::Le => CmpOp::Le,
                Token::Gt => CmpOp::Gt,
                Token::Ge => CmpOp::Ge,
                Token::Ident(s) if s == "in" => CmpOp::In,
                Token::Ident(s)
                    if s == "not" && matches!(self.peek_at(1), Token::Ident(n) if n == "in") =>
                {
                    CmpOp::NotIn
                }
                // `is` compares by value; there is no object identity here.
                Token::Ident(s)
                    if s == "is" && matches!(self.peek_at(1), Token::Ident(n) if n == "not") =>
                {
                    CmpOp::IsNot
                }
                Token::Ident(s) if s == "is" => CmpOp::Eq,
                _ => break,
            };
            let (op, width) = match op {
                CmpOp::NotIn => (CmpOp::NotIn, 2),
                CmpOp::IsNot => (CmpOp::Ne, 2),
                other => (other, 1),
            };
            self.pos += width;
            rest.push((op, self.parse_additive()?));
        }
        if rest.is_empty() {
            Ok(lhs)
        } else {
            Ok(Expr::Compare(Box::new(lhs), rest))
        }
    }

    fn parse_additive(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::DoubleSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ScriptResult<Expr> {
        match self.peek() {
            Token::Minus => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Token::Plus => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> ScriptResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.pos += 1;
                    match self.advance() {
                        Token::Ident(name) => expr = Expr::Attr(Box::new(expr), name),
                        other => {
                            return Err(ScriptError::syntax(format!(
                                "expected attribute name, found {}",
                                describe(&other)
                            )))
                        }
                    }
                }
                Token::LParen => {
                    self.pos += 1;
                    let (args, kwargs) = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        kwargs,
                    };
                }
                Token::LBracket => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> ScriptResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while self.peek() != &Token::RParen {
            let is_kwarg = matches!(self.peek_at(1), Token::Assign);
            if let (true, Token::Ident(name)) = (is_kwarg, self.peek().clone()) {
                self.pos += 2;
                kwargs.push((name, self.parse_expr()?));
            } else if !kwargs.is_empty() {
                return Err(ScriptError::syntax("positional argument follows keyword argument"));
            } else {
                args.push(self.parse_expr()?);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok((args, kwargs))
    }

    fn parse_primary(&mut self) -> ScriptResult<Expr> {
        match self.advance() {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Token::Str(mut s) => {
                // Adjacent literals concatenate.
                while let Token::Str(next) = self.peek().clone() {
                    s.push_str(&next);
                    self.pos += 1;
                }
                Ok(Expr::Literal(Value::Str(s)))
            }
            Token::Ident(name) => match name.as_str() {
                "True" | "true" => Ok(Expr::Literal(Value::Bool(true))),
                "False" | "false" => Ok(Expr::Literal(Value::Bool(false))),
                "None" | "null" => Ok(Expr::Literal(Value::None)),
                kw if KEYWORDS.contains(&kw) => {
                    Err(ScriptError::syntax(format!("invalid syntax near '{kw}'")))
                }
                _ => Ok(Expr::Var(name)),
            },
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                while self.peek() != &Token::RBracket {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            Token::LBrace => {
                let mut entries = Vec::new();
                while self.peek() != &Token::RBrace {
                    let key = self.parse_expr()?;
                    self.expect(&Token::Colon, "':'")?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBrace, "'}'")?;
                Ok(Expr::Map(entries))
            }
            other => Err(ScriptError::syntax(format!("unexpected {}", describe(&other)))),
        }
    }

    fn parse_for_vars(&mut self) -> ScriptResult<Vec<String>> {
        let mut vars = Vec::new();
        loop {
            match self.advance() {
                Token::Ident(name) if !KEYWORDS.contains(&name.as_str()) => vars.push(name),
                other => {
                    return Err(ScriptError::syntax(format!(
                        "expected loop variable, found {}",
                        describe(&other)
                    )))
                }
            }
            if !self.eat(&Token::Comma) {
                return Ok(vars);
            }
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Eof => "end of line".to_string(),
        Token::Ident(s) => format!("'{s}'"),
        Token::Str(s) => format!("'{s}'"),
        Token::Int(n) => format!("'{n}'"),
        Token::Float(x) => format!("'{x}'"),
        other => format!("{other:?}"),
    }
}

fn to_target(expr: Expr) -> ScriptResult<Target> {
    match expr {
        Expr::Var(name) => Ok(Target::Name(name)),
        Expr::Index(obj, key) => Ok(Target::Index(*obj, *key)),
        _ => Err(ScriptError::syntax("cannot assign to expression")),
    }
}

const BLOCK_KEYWORDS: [&str; 6] = ["if", "elif", "else", "for", "while", "with"];

/// Parses a standalone expression, e.g. the inside of a `{{...}}` placeholder.
pub fn parse_expr(src: &str) -> ScriptResult<Expr> {
    let mut parser = Parser::new(src)?;
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Returns true if `src` is a block header (`if x:`, `for a in b:`, ...).
pub fn is_header(src: &str) -> bool {
    let trimmed = src.trim_end();
    let first = trimmed
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("");
    trimmed.ends_with(':') && BLOCK_KEYWORDS.contains(&first)
}

/// Parses a block header line, including its trailing `:`.
pub fn parse_header(src: &str) -> ScriptResult<Header> {
    let mut parser = Parser::new(src)?;
    if !parser.take_trailing_colon() {
        return Err(ScriptError::syntax("expected ':'"));
    }
    let header = match parser.advance() {
        Token::Ident(kw) => match kw.as_str() {
            "if" => Header::If(parser.parse_expr()?),
            "elif" => Header::Elif(parser.parse_expr()?),
            "else" => Header::Else,
            "while" => Header::While(parser.parse_expr()?),
            "with" => Header::With(parser.parse_expr()?),
            "for" => {
                let vars = parser.parse_for_vars()?;
                if !parser.eat_keyword("in") {
                    return Err(ScriptError::syntax("expected 'in' in for statement"));
                }
                Header::For(vars, parser.parse_expr()?)
            }
            _ => return Err(ScriptError::syntax("invalid syntax")),
        },
        _ => return Err(ScriptError::syntax("invalid syntax")),
    };
    parser.expect_end()?;
    Ok(header)
}

/// Parses a simple (non-block) statement and stamps it with `line`.
pub fn parse_statement(src: &str, line: usize) -> ScriptResult<Stmt> {
    let mut parser = Parser::new(src)?;
    if let Token::Ident(kw) = parser.peek().clone() {
        match kw.as_str() {
            "pass" | "break" | "continue" => {
                parser.pos += 1;
                parser.expect_end()?;
                return Ok(match kw.as_str() {
                    "pass" => Stmt::Pass,
                    "break" => Stmt::Break { line },
                    _ => Stmt::Continue { line },
                });
            }
            k if BLOCK_KEYWORDS.contains(&k) => {
                return Err(ScriptError::syntax("expected ':'"));
            }
            _ => {}
        }
    }

    let expr = parser.parse_expr()?;
    let op = match parser.peek() {
        Token::Assign => Some(None),
        Token::PlusAssign => Some(Some(BinOp::Add)),
        Token::MinusAssign => Some(Some(BinOp::Sub)),
        Token::StarAssign => Some(Some(BinOp::Mul)),
        _ => None,
    };
    if let Some(op) = op {
        parser.pos += 1;
        let target = to_target(expr)?;
        let value = parser.parse_expr()?;
        parser.expect_end()?;
        return Ok(Stmt::Assign {
            target,
            op,
            value,
            line,
        });
    }
    parser.expect_end()?;
    Ok(Stmt::Expr { expr, line })
}
