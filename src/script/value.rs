//! Runtime values of the script language.
//!
//! Values are dynamically typed and follow Python's conventions for
//! truthiness, `str()` and `repr()` so that templates read the way their
//! authors expect.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use super::error::{ErrorKind, ScriptError, ScriptResult};
use crate::tree::NodeId;

/// Largest string or list a repetition or `range()` may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

/// A script runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// Handle to a node of the context tree.
    Node(NodeId),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Node(_) => "node",
        }
    }

    /// Python truthiness: empty containers, zero and `None` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Node(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Representation used inside containers and by `repr`.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => other.to_string(),
        }
    }

    /// Equality across numeric types, structural for containers.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.equals(w)))
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Node(a), Value::Node(b)) => a == b,
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    pub fn compare(&self, other: &Value) -> ScriptResult<Ordering> {
        let ordering = match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        unequal => return Ok(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        };
        ordering.ok_or_else(|| {
            ScriptError::type_error(format!(
                "'<' not supported between instances of '{}' and '{}'",
                self.type_name(),
                other.type_name()
            ))
        })
    }

    pub fn add(&self, other: &Value) -> ScriptResult<Value> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b).cloned().collect()))
            }
            _ => self.arith(other, "+", |a, b| a.checked_add(b), |a, b| a + b),
        }
    }

    pub fn sub(&self, other: &Value) -> ScriptResult<Value> {
        self.arith(other, "-", |a, b| a.checked_sub(b), |a, b| a - b)
    }

    pub fn mul(&self, other: &Value) -> ScriptResult<Value> {
        match (self, other) {
            (Value::Str(s), n @ (Value::Int(_) | Value::Bool(_)))
            | (n @ (Value::Int(_) | Value::Bool(_)), Value::Str(s)) => {
                let count = repeat_count(s.len(), n)?;
                Ok(Value::Str(s.repeat(count)))
            }
            (Value::List(items), n @ (Value::Int(_) | Value::Bool(_))) => {
                let count = repeat_count(items.len(), n)?;
                let mut out = Vec::with_capacity(items.len() * count);
                for _ in 0..count {
                    out.extend(items.iter().cloned());
                }
                Ok(Value::List(out))
            }
            _ => self.arith(other, "*", |a, b| a.checked_mul(b), |a, b| a * b),
        }
    }

    pub fn div(&self, other: &Value) -> ScriptResult<Value> {
        let (a, b) = self.numbers(other, "/")?;
        if b == 0.0 {
            return Err(ScriptError::new(ErrorKind::ZeroDivisionError, "division by zero"));
        }
        Ok(Value::Float(a / b))
    }

    pub fn floor_div(&self, other: &Value) -> ScriptResult<Value> {
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            if b == 0 {
                return Err(ScriptError::new(
                    ErrorKind::ZeroDivisionError,
                    "integer division or modulo by zero",
                ));
            }
            let q = a.checked_div(b).ok_or_else(|| {
                ScriptError::new(ErrorKind::OverflowError, "integer division overflows")
            })?;
            let floored = if a.wrapping_rem(b) != 0 && (a < 0) != (b < 0) { q - 1 } else { q };
            return Ok(Value::Int(floored));
        }
        let (a, b) = self.numbers(other, "//")?;
        if b == 0.0 {
            return Err(ScriptError::new(ErrorKind::ZeroDivisionError, "float floor division by zero"));
        }
        Ok(Value::Float((a / b).floor()))
    }

    pub fn rem(&self, other: &Value) -> ScriptResult<Value> {
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            if b == 0 {
                return Err(ScriptError::new(
                    ErrorKind::ZeroDivisionError,
                    "integer division or modulo by zero",
                ));
            }
            // Result takes the sign of the divisor.
            let r = a.wrapping_rem(b);
            return Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }));
        }
        let (a, b) = self.numbers(other, "%")?;
        if b == 0.0 {
            return Err(ScriptError::new(ErrorKind::ZeroDivisionError, "float modulo"));
        }
        Ok(Value::Float(a - b * (a / b).floor()))
    }

    pub fn neg(&self) -> ScriptResult<Value> {
        match self {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| {
                ScriptError::new(ErrorKind::OverflowError, "integer negation overflows")
            }),
            Value::Bool(b) => Ok(Value::Int(-(*b as i64))),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(ScriptError::type_error(format!(
                "bad operand type for unary -: '{}'",
                other.type_name()
            ))),
        }
    }

    fn arith(
        &self,
        other: &Value,
        op: &str,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> ScriptResult<Value> {
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            if let Some(n) = int_op(a, b) {
                return Ok(Value::Int(n));
            }
        }
        let (a, b) = self.numbers(other, op)?;
        Ok(Value::Float(float_op(a, b)))
    }

    fn numbers(&self, other: &Value, op: &str) -> ScriptResult<(f64, f64)> {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(ScriptError::type_error(format!(
                "unsupported operand type(s) for {op}: '{}' and '{}'",
                self.type_name(),
                other.type_name()
            ))),
        }
    }
}

/// Validates a repetition count, returning it once the result is known to
/// stay within [`MAX_SEQUENCE_LEN`].
fn repeat_count(len: usize, n: &Value) -> ScriptResult<usize> {
    let count = n.as_int().unwrap_or(0).max(0);
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    match len.checked_mul(count) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(count),
        _ => Err(ScriptError::new(
            ErrorKind::OverflowError,
            "repeated sequence is too long",
        )),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() && x.abs() < 1e16 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", inner.join(", "))
            }
            Value::Map(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                    .collect();
                write!(f, "{{{}}}", inner.join(", "))
            }
            Value::Node(id) => write!(f, "<node {}>", id.index()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => {
                Value::Map(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
