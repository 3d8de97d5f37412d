//! Built-in helpers available in every [`Context`](crate::runtime::Context).

use crate::runtime::environment::Scope;
use crate::runtime::value::{Helper, RangeValue, Value};

pub fn builtins() -> Vec<Helper> {
    vec![
        Helper::new("range", range),
        Helper::new("between", between),
        Helper::new("until", until),
        Helper::new("len", len),
    ]
}

pub fn register_builtins(scope: &Scope) {
    for helper in builtins() {
        let name = helper.name.clone();
        scope.declare(&name, Value::Helper(helper));
    }
}

/// `range(a, b)`: every integer from `a` to `b` inclusive.
fn range(args: &[Value]) -> Result<Value, String> {
    arity(args, 2)?;
    let (start, end) = (int_arg(args, 0)?, int_arg(args, 1)?);
    Ok(Value::Range(RangeValue::new(start, end.saturating_add(1))))
}

/// `between(a, b)`: integers strictly between `a` and `b`.
fn between(args: &[Value]) -> Result<Value, String> {
    arity(args, 2)?;
    let (start, end) = (int_arg(args, 0)?, int_arg(args, 1)?);
    Ok(Value::Range(RangeValue::new(start.saturating_add(1), end)))
}

/// `until(n)`: `0` up to but excluding `n`.
fn until(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    Ok(Value::Range(RangeValue::new(0, int_arg(args, 0)?)))
}

fn len(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Map(entries) => entries.len(),
        Value::Range(range) => range.len(),
        other => return Err(format!("{} has no length", other.type_name())),
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| "length does not fit in an int".to_string())
}

fn arity(args: &[Value], expected: usize) -> Result<(), String> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(format!(
            "expected {expected} argument(s), got {}",
            args.len()
        ))
    }
}

fn int_arg(args: &[Value], idx: usize) -> Result<i64, String> {
    match args.get(idx) {
        Some(Value::Int(v)) => Ok(*v),
        Some(other) => Err(format!(
            "argument {} must be an int, got {}",
            idx + 1,
            other.type_name()
        )),
        None => Err(format!("missing argument {}", idx + 1)),
    }
}
