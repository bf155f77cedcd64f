//! Tree-walking interpreter.
//!
//! An [`Interpreter`] executes statements on behalf of one node. Variables
//! live either in a private local table (control chunks, seeded with their
//! declared imports) or directly in the node's scope (template files).

use indexmap::IndexMap;

use super::ast::{BinOp, CmpOp, Expr, Stmt, Target};
use super::builtins;
use super::error::{ErrorKind, ScriptError, ScriptResult};
use super::parser::parse_expr;
use super::value::Value;
use crate::constants::LINES_VAR;
use crate::error::Error;
use crate::tree::{NodeId, Tree};

/// Control flow signal returned by statement execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
}

pub struct Interpreter<'t> {
    tree: &'t mut Tree,
    node: NodeId,
    locals: Option<IndexMap<String, Value>>,
}

/// Converts tree errors raised from script calls into script errors.
fn tree_error(err: Error) -> ScriptError {
    match err {
        Error::IoError(e) => ScriptError::new(ErrorKind::OSError, e.to_string()),
        Error::MountError { folder } => {
            ScriptError::new(ErrorKind::ValueError, format!("Subdirectory does not exist: {folder}"))
        }
        other => ScriptError::new(ErrorKind::ValueError, other.to_string()),
    }
}

fn expect_str<'v>(value: &'v Value, what: &str) -> ScriptResult<&'v str> {
    value.as_str().ok_or_else(|| {
        ScriptError::type_error(format!("{what} must be str, not {}", value.type_name()))
    })
}

impl<'t> Interpreter<'t> {
    /// Interpreter whose variables are `locals` only.
    pub fn with_locals(tree: &'t mut Tree, node: NodeId, locals: IndexMap<String, Value>) -> Self {
        Self {
            tree,
            node,
            locals: Some(locals),
        }
    }

    /// Interpreter reading and writing the node's scope directly.
    pub fn with_scope(tree: &'t mut Tree, node: NodeId) -> Self {
        Self {
            tree,
            node,
            locals: None,
        }
    }

    pub fn into_locals(self) -> IndexMap<String, Value> {
        self.locals.unwrap_or_default()
    }

    pub fn get_var(&self, name: &str) -> Option<&Value> {
        match &self.locals {
            Some(locals) => locals.get(name),
            None => self.tree.scope(self.node).get(name),
        }
    }

    pub fn set_var(&mut self, name: &str, value: Value) {
        match &mut self.locals {
            Some(locals) => {
                locals.insert(name.to_string(), value);
            }
            None => self.tree.scope_mut(self.node).set(name, value),
        }
    }

    /// Runs a whole program.
    pub fn execute(&mut self, program: &[Stmt]) -> ScriptResult<()> {
        match self.exec_block(program)? {
            Flow::Normal => Ok(()),
            Flow::Break => Err(ScriptError::syntax("'break' outside loop")),
            Flow::Continue => Err(ScriptError::syntax("'continue' not properly in loop")),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> ScriptResult<Flow> {
        for stmt in stmts {
            let flow = self.exec_stmt(stmt).map_err(|e| e.at_line(stmt.line()))?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        match stmt {
            Stmt::Expr { expr, .. } => {
                self.eval(expr)?;
            }
            Stmt::Assign { target, op, value, .. } => {
                let value = self.eval(value)?;
                self.assign(target, *op, value)?;
            }
            Stmt::If { branches, orelse, .. } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            Stmt::For { vars, iter, body, .. } => {
                let iterable = self.eval(iter)?;
                let items = self.iterate(&iterable)?;
                for item in items {
                    self.bind_loop_vars(vars, item)?;
                    if self.exec_block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::While { cond, body, .. } => {
                while self.eval(cond)?.is_truthy() {
                    if self.exec_block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::With { context, body, .. } => return self.exec_with(context, body),
            Stmt::Emit { text, .. } => {
                let rendered = self.substitute(text)?;
                self.append_line(Value::Str(rendered))?;
            }
            Stmt::Pass => {}
            Stmt::Break { .. } => return Ok(Flow::Break),
            Stmt::Continue { .. } => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    /// `with node.config_as(...):` applies the overrides for the body only.
    fn exec_with(&mut self, context: &Expr, body: &[Stmt]) -> ScriptResult<Flow> {
        let Expr::Call { callee, args, kwargs } = context else {
            return Err(ScriptError::type_error("'with' expects a config_as(...) call"));
        };
        let Expr::Attr(obj, method) = callee.as_ref() else {
            return Err(ScriptError::type_error("'with' expects a config_as(...) call"));
        };
        if method != "config_as" || !args.is_empty() {
            return Err(ScriptError::type_error("'with' expects a config_as(...) call"));
        }
        let Value::Node(id) = self.eval(obj)? else {
            return Err(ScriptError::type_error("config_as() must be called on a node"));
        };
        let overrides = self.eval_kwargs(kwargs)?;

        let saved = self.tree.push_config(id, &overrides).map_err(tree_error)?;
        let result = self.exec_block(body);
        self.tree.pop_config(id, saved);
        result
    }

    fn append_line(&mut self, line: Value) -> ScriptResult<()> {
        let mut lines = match self.get_var(LINES_VAR) {
            Some(Value::List(lines)) => lines.clone(),
            Some(other) => {
                return Err(ScriptError::type_error(format!(
                    "{LINES_VAR} must be a list, not {}",
                    other.type_name()
                )))
            }
            None => Vec::new(),
        };
        lines.push(line);
        self.set_var(LINES_VAR, Value::List(lines));
        Ok(())
    }

    /// Replaces every placeholder in `text` with the value of its expression.
    pub fn substitute(&mut self, text: &str) -> ScriptResult<String> {
        let regex = self.tree.node(self.node).config().var_regex().clone();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in regex.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            let value = self.eval_source(inner.as_str())?;
            out.push_str(&value.to_string());
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Parses and evaluates a standalone expression.
    pub fn eval_source(&mut self, source: &str) -> ScriptResult<Value> {
        let expr = parse_expr(source.trim())?;
        self.eval(&expr)
    }

    fn bind_loop_vars(&mut self, vars: &[String], item: Value) -> ScriptResult<()> {
        if let [name] = vars {
            self.set_var(name, item);
            return Ok(());
        }
        let Value::List(values) = item else {
            return Err(ScriptError::type_error(format!(
                "cannot unpack non-sequence {}",
                item.type_name()
            )));
        };
        if values.len() != vars.len() {
            return Err(ScriptError::new(
                ErrorKind::ValueError,
                format!("expected {} values to unpack, got {}", vars.len(), values.len()),
            ));
        }
        for (name, value) in vars.iter().zip(values) {
            self.set_var(name, value);
        }
        Ok(())
    }

    fn iterate(&self, value: &Value) -> ScriptResult<Vec<Value>> {
        match value {
            Value::List(items) => Ok(items.clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Map(entries) => Ok(entries.keys().cloned().map(Value::Str).collect()),
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    fn assign(&mut self, target: &Target, op: Option<BinOp>, value: Value) -> ScriptResult<()> {
        match target {
            Target::Name(name) => {
                let value = match op {
                    None => value,
                    Some(op) => {
                        let current = self.get_var(name).cloned().ok_or_else(|| {
                            ScriptError::new(ErrorKind::NameError, format!("name '{name}' is not defined"))
                        })?;
                        binary(op, &current, &value)?
                    }
                };
                self.set_var(name, value);
            }
            Target::Index(obj, key) => {
                let Expr::Var(name) = obj else {
                    return Err(ScriptError::syntax("only names can be indexed in an assignment"));
                };
                let key = self.eval(key)?;
                let mut container = self.lookup(name)?;
                match &mut container {
                    Value::List(items) => {
                        let idx = list_index(items.len(), &key)?;
                        let new = match op {
                            None => value,
                            Some(op) => binary(op, &items[idx], &value)?,
                        };
                        items[idx] = new;
                    }
                    Value::Map(entries) => {
                        let key = map_key(&key)?;
                        let new = match (op, entries.get(&key)) {
                            (None, _) => value,
                            (Some(op), Some(current)) => binary(op, current, &value)?,
                            (Some(_), None) => {
                                return Err(ScriptError::new(ErrorKind::KeyError, format!("'{key}'")))
                            }
                        };
                        entries.insert(key, new);
                    }
                    other => {
                        return Err(ScriptError::type_error(format!(
                            "'{}' object does not support item assignment",
                            other.type_name()
                        )))
                    }
                }
                self.set_var(name, container);
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> ScriptResult<Value> {
        self.get_var(name).cloned().ok_or_else(|| {
            ScriptError::new(ErrorKind::NameError, format!("name '{name}' is not defined"))
        })
    }

    pub fn eval(&mut self, expr: &Expr) -> ScriptResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => self.lookup(name),
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::List(values))
            }
            Expr::Map(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let key = map_key(&self.eval(key)?)?;
                    map.insert(key, self.eval(value)?);
                }
                Ok(Value::Map(map))
            }
            Expr::Neg(inner) => self.eval(inner)?.neg(),
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
            Expr::Compare(first, rest) => {
                let mut lhs = self.eval(first)?;
                for (op, rhs) in rest {
                    let rhs = self.eval(rhs)?;
                    if !self.compare(*op, &lhs, &rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if !lhs.is_truthy() {
                    return Ok(lhs);
                }
                self.eval(rhs)
            }
            Expr::Or(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if lhs.is_truthy() {
                    return Ok(lhs);
                }
                self.eval(rhs)
            }
            Expr::Conditional { cond, then, otherwise } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Attr(obj, name) => {
                let obj = self.eval(obj)?;
                self.attribute(&obj, name)
            }
            Expr::Index(obj, key) => {
                let obj = self.eval(obj)?;
                let key = self.eval(key)?;
                index(&obj, &key)
            }
            Expr::Call { callee, args, kwargs } => self.eval_call(callee, args, kwargs),
        }
    }

    fn compare(&self, op: CmpOp, lhs: &Value, rhs: &Value) -> ScriptResult<bool> {
        use std::cmp::Ordering::*;
        Ok(match op {
            CmpOp::Eq => lhs.equals(rhs),
            CmpOp::Ne | CmpOp::IsNot => !lhs.equals(rhs),
            CmpOp::Lt => lhs.compare(rhs)? == Less,
            CmpOp::Le => lhs.compare(rhs)? != Greater,
            CmpOp::Gt => lhs.compare(rhs)? == Greater,
            CmpOp::Ge => lhs.compare(rhs)? != Less,
            CmpOp::In => self.contains(rhs, lhs)?,
            CmpOp::NotIn => !self.contains(rhs, lhs)?,
        })
    }

    fn contains(&self, container: &Value, item: &Value) -> ScriptResult<bool> {
        match container {
            Value::Str(s) => Ok(s.contains(expect_str(item, "left operand of 'in <str>'")?)),
            Value::List(items) => Ok(items.iter().any(|v| v.equals(item))),
            Value::Map(entries) => Ok(item.as_str().is_some_and(|k| entries.contains_key(k))),
            Value::Node(id) => Ok(item.as_str().is_some_and(|k| self.tree.scope(*id).contains(k))),
            other => Err(ScriptError::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    fn attribute(&self, obj: &Value, name: &str) -> ScriptResult<Value> {
        match obj {
            Value::Node(id) if name == "root" || name == "folder" => Ok(Value::Str(
                self.tree.node(*id).root().to_string_lossy().into_owned(),
            )),
            Value::Map(entries) if entries.contains_key(name) => Ok(entries[name].clone()),
            other => Err(ScriptError::new(
                ErrorKind::AttributeError,
                format!("'{}' object has no attribute '{name}'", other.type_name()),
            )),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> ScriptResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn eval_kwargs(&mut self, kwargs: &[(String, Expr)]) -> ScriptResult<IndexMap<String, Value>> {
        let mut out = IndexMap::new();
        for (name, expr) in kwargs {
            let value = self.eval(expr)?;
            out.insert(name.clone(), value);
        }
        Ok(out)
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        kwargs: &[(String, Expr)],
    ) -> ScriptResult<Value> {
        match callee {
            Expr::Var(name) if self.get_var(name).is_none() => {
                let args = self.eval_args(args)?;
                let kwargs = self.eval_kwargs(kwargs)?;
                builtins::call_function(name, args, kwargs)
            }
            Expr::Attr(obj, method) => {
                let receiver = self.eval(obj)?;
                let args = self.eval_args(args)?;
                let kwargs = self.eval_kwargs(kwargs)?;
                match receiver {
                    Value::Node(id) => self.call_node_method(id, method, args, kwargs),
                    Value::List(mut items) if method == "append" || method == "extend" => {
                        builtins::extend_list(&mut items, method, args)?;
                        // Lists are values; write the result back to the named variable.
                        if let Expr::Var(name) = obj.as_ref() {
                            self.set_var(name, Value::List(items));
                        }
                        Ok(Value::None)
                    }
                    receiver => builtins::call_method(&receiver, method, args, kwargs),
                }
            }
            other => {
                let value = self.eval(other)?;
                Err(ScriptError::type_error(format!(
                    "'{}' object is not callable",
                    value.type_name()
                )))
            }
        }
    }

    fn call_node_method(
        &mut self,
        id: NodeId,
        method: &str,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
    ) -> ScriptResult<Value> {
        match method {
            "sub" | "mount" => {
                let [name, rest @ ..] = args.as_slice() else {
                    return Err(ScriptError::type_error(format!("{method}() missing subfolder name")));
                };
                let name = expect_str(name, "subfolder")?;
                let mut extra = bindings_from(rest, method)?;
                extra.extend(kwargs);
                let child = self.tree.mount(id, name, extra).map_err(tree_error)?;
                Ok(Value::Node(child))
            }
            "config" => {
                let mut params = bindings_from(&args, method)?;
                params.extend(kwargs);
                self.tree.configure(id, &params).map_err(tree_error)?;
                Ok(Value::None)
            }
            "config_as" => Err(ScriptError::type_error(
                "config_as() can only be used as a 'with' target",
            )),
            "update" | "update_global" => {
                let mut bindings = bindings_from(&args, method)?;
                bindings.extend(kwargs);
                if method == "update" {
                    self.tree.update(id, bindings);
                } else {
                    self.tree.update_global(id, bindings);
                }
                Ok(Value::None)
            }
            "get_var" => {
                let Some(name) = args.first() else {
                    return Err(ScriptError::type_error("get_var() missing variable name"));
                };
                let name = expect_str(name, "variable name")?;
                let default = args
                    .get(1)
                    .cloned()
                    .or_else(|| kwargs.get("default").cloned())
                    .unwrap_or_default();
                Ok(self.tree.scope(id).get(name).cloned().unwrap_or(default))
            }
            "parse" => {
                self.tree.parse(id);
                Ok(Value::None)
            }
            "run" => {
                self.tree.run(id);
                Ok(Value::None)
            }
            other => Err(ScriptError::new(
                ErrorKind::AttributeError,
                format!("'node' object has no attribute '{other}'"),
            )),
        }
    }
}

/// Optional positional dict argument of node methods taking bindings.
fn bindings_from(args: &[Value], method: &str) -> ScriptResult<IndexMap<String, Value>> {
    match args {
        [] => Ok(IndexMap::new()),
        [Value::Map(entries)] => Ok(entries.clone()),
        _ => Err(ScriptError::type_error(format!(
            "{method}() takes keyword arguments or a single dict"
        ))),
    }
}

fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> ScriptResult<Value> {
    match op {
        BinOp::Add => lhs.add(rhs),
        BinOp::Sub => lhs.sub(rhs),
        BinOp::Mul => lhs.mul(rhs),
        BinOp::Div => lhs.div(rhs),
        BinOp::FloorDiv => lhs.floor_div(rhs),
        BinOp::Rem => lhs.rem(rhs),
    }
}

fn map_key(key: &Value) -> ScriptResult<String> {
    match key {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(_) | Value::Bool(_) | Value::Float(_) => Ok(key.to_string()),
        other => Err(ScriptError::type_error(format!(
            "unhashable type: '{}'",
            other.type_name()
        ))),
    }
}

fn list_index(len: usize, key: &Value) -> ScriptResult<usize> {
    let Value::Int(i) = key else {
        return Err(ScriptError::type_error(format!(
            "indices must be integers, not {}",
            key.type_name()
        )));
    };
    let idx = if *i < 0 { *i + len as i64 } else { *i };
    if idx < 0 || idx >= len as i64 {
        return Err(ScriptError::new(ErrorKind::IndexError, "index out of range"));
    }
    Ok(idx as usize)
}

fn index(obj: &Value, key: &Value) -> ScriptResult<Value> {
    match obj {
        Value::List(items) => Ok(items[list_index(items.len(), key)?].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::Str(chars[list_index(chars.len(), key)?].to_string()))
        }
        Value::Map(entries) => {
            let name = map_key(key)?;
            entries
                .get(&name)
                .cloned()
                .ok_or_else(|| ScriptError::new(ErrorKind::KeyError, format!("'{name}'")))
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}
