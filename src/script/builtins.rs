//! Builtin functions and methods of str, list and dict values.

use std::process::{Command, Stdio};

use cruet::Inflector;
use indexmap::IndexMap;
use log::{debug, info};

use super::error::{ErrorKind, ScriptError, ScriptResult};
use super::value::{Value, MAX_SEQUENCE_LEN};

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> ScriptResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min} to {max}")
        };
        return Err(ScriptError::type_error(format!(
            "{name}() takes {expected} arguments ({} given)",
            args.len()
        )));
    }
    Ok(())
}

fn str_arg<'v>(name: &str, value: &'v Value) -> ScriptResult<&'v str> {
    value.as_str().ok_or_else(|| {
        ScriptError::type_error(format!(
            "{name}() argument must be str, not {}",
            value.type_name()
        ))
    })
}

fn int_arg(name: &str, value: &Value) -> ScriptResult<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Bool(b) => Ok(*b as i64),
        other => Err(ScriptError::type_error(format!(
            "{name}() argument must be int, not {}",
            other.type_name()
        ))),
    }
}

fn to_list(name: &str, value: &Value) -> ScriptResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Map(entries) => Ok(entries.keys().cloned().map(Value::Str).collect()),
        other => Err(ScriptError::type_error(format!(
            "{name}() argument '{}' object is not iterable",
            other.type_name()
        ))),
    }
}

/// Calls the builtin function `name`.
pub fn call_function(
    name: &str,
    args: Vec<Value>,
    kwargs: IndexMap<String, Value>,
) -> ScriptResult<Value> {
    match name {
        "len" => {
            arity(name, &args, 1, 1)?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(entries) => entries.len(),
                other => {
                    return Err(ScriptError::type_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(len as i64))
        }
        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(|v| v.to_string()).unwrap_or_default()))
        }
        "int" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Int(0)),
                Some(Value::Int(n)) => Ok(Value::Int(*n)),
                Some(Value::Bool(b)) => Ok(Value::Int(*b as i64)),
                Some(Value::Float(x)) => Ok(Value::Int(x.trunc() as i64)),
                Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    ScriptError::new(
                        ErrorKind::ValueError,
                        format!("invalid literal for int() with base 10: '{s}'"),
                    )
                }),
                Some(other) => Err(ScriptError::type_error(format!(
                    "int() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))),
            }
        }
        "float" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Float(0.0)),
                Some(Value::Int(n)) => Ok(Value::Float(*n as f64)),
                Some(Value::Bool(b)) => Ok(Value::Float(*b as i64 as f64)),
                Some(Value::Float(x)) => Ok(Value::Float(*x)),
                Some(Value::Str(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    ScriptError::new(
                        ErrorKind::ValueError,
                        format!("could not convert string to float: '{s}'"),
                    )
                }),
                Some(other) => Err(ScriptError::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))),
            }
        }
        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
        }
        "list" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::List(Vec::new())),
                Some(value) => Ok(Value::List(to_list(name, value)?)),
            }
        }
        "range" => {
            arity(name, &args, 1, 3)?;
            let (start, stop) = match args.as_slice() {
                [start, stop, ..] => (int_arg(name, start)?, int_arg(name, stop)?),
                [stop] => (0, int_arg(name, stop)?),
                [] => (0, 0),
            };
            let step = match args.get(2) {
                Some(step) => int_arg(name, step)?,
                None => 1,
            };
            if step == 0 {
                return Err(ScriptError::new(
                    ErrorKind::ValueError,
                    "range() arg 3 must not be zero",
                ));
            }
            let span = if step > 0 {
                i128::from(stop) - i128::from(start)
            } else {
                i128::from(start) - i128::from(stop)
            };
            let len = if span > 0 {
                (span - 1) / i128::from(step).abs() + 1
            } else {
                0
            };
            if len > MAX_SEQUENCE_LEN as i128 {
                return Err(ScriptError::new(ErrorKind::OverflowError, "range() is too long"));
            }
            // Every element lies between start and stop, so it fits in i64.
            let items: Vec<Value> = (0..len)
                .map(|k| Value::Int((i128::from(start) + k * i128::from(step)) as i64))
                .collect();
            Ok(Value::List(items))
        }
        "print" => {
            let sep = kwargs.get("sep").map(|v| v.to_string()).unwrap_or(" ".into());
            let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            println!("{}", line.join(&sep));
            Ok(Value::None)
        }
        "run_command" => {
            arity(name, &args, 1, 2)?;
            let command = str_arg(name, &args[0])?;
            let cwd = args.get(1).or_else(|| kwargs.get("cwd"));
            let cwd = match cwd {
                None | Some(Value::None) => None,
                Some(value) => Some(str_arg(name, value)?),
            };
            run_command(command, cwd)
        }
        _ => Err(ScriptError::new(
            ErrorKind::NameError,
            format!("name '{name}' is not defined"),
        )),
    }
}

/// Runs `command` through the platform shell, returning its exit code.
fn run_command(command: &str, cwd: Option<&str>) -> ScriptResult<Value> {
    info!("Running command: {}", command);
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| ScriptError::new(ErrorKind::OSError, format!("{command}: {e}")))?;
    debug!("Command finished with {}", status);
    Ok(Value::Int(status.code().unwrap_or(-1) as i64))
}

/// `list.append` and `list.extend`, applied to `items` in place.
pub fn extend_list(items: &mut Vec<Value>, method: &str, args: Vec<Value>) -> ScriptResult<()> {
    arity(method, &args, 1, 1)?;
    let mut args = args;
    let arg = args.remove(0);
    if method == "append" {
        items.push(arg);
    } else {
        items.extend(to_list(method, &arg)?);
    }
    Ok(())
}

/// Calls a method on a str, list or dict receiver.
pub fn call_method(
    receiver: &Value,
    method: &str,
    args: Vec<Value>,
    _kwargs: IndexMap<String, Value>,
) -> ScriptResult<Value> {
    match receiver {
        Value::Str(s) => str_method(s, method, &args),
        Value::List(items) => list_method(items, method, &args),
        Value::Map(entries) => map_method(entries, method, &args),
        other => Err(no_attribute(other, method)),
    }
}

fn no_attribute(receiver: &Value, method: &str) -> ScriptError {
    ScriptError::new(
        ErrorKind::AttributeError,
        format!(
            "'{}' object has no attribute '{method}'",
            receiver.type_name()
        ),
    )
}

fn str_method(s: &str, method: &str, args: &[Value]) -> ScriptResult<Value> {
    let text = |t: String| Ok(Value::Str(t));
    match method {
        "upper" => text(s.to_uppercase()),
        "lower" => text(s.to_lowercase()),
        "strip" => text(s.trim().to_string()),
        "lstrip" => text(s.trim_start().to_string()),
        "rstrip" => text(s.trim_end().to_string()),
        "snake_case" => text(s.to_snake_case()),
        "camel_case" => text(s.to_camel_case()),
        "pascal_case" => text(s.to_pascal_case()),
        "kebab_case" => text(s.to_kebab_case()),
        "title_case" => text(s.to_title_case()),
        "screaming_snake_case" => text(s.to_screaming_snake_case()),
        "replace" => {
            arity(method, args, 2, 2)?;
            text(s.replace(str_arg(method, &args[0])?, str_arg(method, &args[1])?))
        }
        "startswith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.starts_with(str_arg(method, &args[0])?)))
        }
        "endswith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.ends_with(str_arg(method, &args[0])?)))
        }
        "split" => {
            arity(method, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => s.split_whitespace().map(Value::from).collect(),
                Some(sep) => {
                    let sep = str_arg(method, sep)?;
                    if sep.is_empty() {
                        return Err(ScriptError::new(ErrorKind::ValueError, "empty separator"));
                    }
                    s.split(sep).map(Value::from).collect()
                }
            };
            Ok(Value::List(parts))
        }
        "join" => {
            arity(method, args, 1, 1)?;
            let parts = to_list(method, &args[0])?
                .iter()
                .map(|v| str_arg(method, v).map(str::to_string))
                .collect::<ScriptResult<Vec<String>>>()?;
            text(parts.join(s))
        }
        _ => Err(no_attribute(&Value::Str(String::new()), method)),
    }
}

fn list_method(items: &[Value], method: &str, args: &[Value]) -> ScriptResult<Value> {
    match method {
        "index" => {
            arity(method, args, 1, 1)?;
            items
                .iter()
                .position(|v| v.equals(&args[0]))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| {
                    ScriptError::new(ErrorKind::ValueError, format!("{} is not in list", args[0].repr()))
                })
        }
        _ => Err(no_attribute(&Value::List(Vec::new()), method)),
    }
}

fn map_method(entries: &IndexMap<String, Value>, method: &str, args: &[Value]) -> ScriptResult<Value> {
    match method {
        "get" => {
            arity(method, args, 1, 2)?;
            let key = str_arg(method, &args[0])?;
            Ok(entries
                .get(key)
                .cloned()
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or_default()))
        }
        "keys" => Ok(Value::List(entries.keys().cloned().map(Value::Str).collect())),
        "values" => Ok(Value::List(entries.values().cloned().collect())),
        "items" => Ok(Value::List(
            entries
                .iter()
                .map(|(k, v)| Value::List(vec![Value::Str(k.clone()), v.clone()]))
                .collect(),
        )),
        _ => Err(no_attribute(&Value::Map(IndexMap::new()), method)),
    }
}
