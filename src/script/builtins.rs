//=====================================================
// File: script/builtins.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Builtin functions, types, and native container methods
// Objective: Register the builtin namespace and implement str/list/dict
//            methods plus the callable builtin types
//=====================================================

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::ast::BinaryOp;
use super::errors::{ExceptionKind, ScriptError, ScriptResult};
use super::interpreter::Interpreter;
use super::ops;
use super::value::{repr_str, BuiltinType, Dict, Kwargs, Namespace, Number, Value};

type Builtin = fn(&mut Interpreter, Vec<Value>, Kwargs) -> ScriptResult<Value>;

const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
    "format",
];
const LIST_METHODS: &[&str] = &["append", "extend", "pop", "insert", "index"];
const DICT_METHODS: &[&str] = &["get", "keys", "values", "items"];

/// Populate the builtin namespace consulted after globals.
pub fn install(namespace: &mut Namespace) {
    register(namespace, "print", builtin_print);
    register(namespace, "len", builtin_len);
    register(namespace, "range", builtin_range);
    register(namespace, "repr", builtin_repr);
    register(namespace, "abs", builtin_abs);
    register(namespace, "min", builtin_min);
    register(namespace, "max", builtin_max);
    register(namespace, "sum", builtin_sum);
    register(namespace, "isinstance", builtin_isinstance);

    for ty in [
        BuiltinType::Str,
        BuiltinType::Int,
        BuiltinType::Float,
        BuiltinType::Bool,
        BuiltinType::List,
        BuiltinType::Tuple,
        BuiltinType::Dict,
        BuiltinType::Type,
    ] {
        namespace.insert(ty.name().to_string(), Value::Type(ty));
    }
    for kind in ExceptionKind::ALL {
        namespace.insert(kind.name().to_string(), Value::ExceptionClass(kind));
    }
}

fn register(namespace: &mut Namespace, name: &str, func: Builtin) {
    namespace.insert(name.to_string(), Value::native(name, func));
}

fn type_error(message: impl Into<String>) -> ScriptError {
    ScriptError::raise(ExceptionKind::TypeError, message)
}

fn value_error(message: impl Into<String>) -> ScriptError {
    ScriptError::raise(ExceptionKind::ValueError, message)
}

fn no_kwargs(name: &str, kwargs: &Kwargs) -> ScriptResult<()> {
    if kwargs.is_empty() {
        Ok(())
    } else {
        Err(type_error(format!("{name}() takes no keyword arguments")))
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> ScriptResult<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min}")
    } else if args.len() < min {
        format!("at least {min}")
    } else {
        format!("at most {max}")
    };
    Err(type_error(format!(
        "{name}() takes {expected} argument{} ({} given)",
        if expected.ends_with(" 1") { "" } else { "s" },
        args.len()
    )))
}

fn expect_int(value: &Value) -> ScriptResult<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Bool(b) => Ok(*b as i64),
        other => Err(type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            other.type_name()
        ))),
    }
}

fn expect_str<'a>(value: &'a Value, context: &str) -> ScriptResult<&'a str> {
    match value {
        Value::Str(text) => Ok(text),
        other => Err(type_error(format!(
            "{context} must be str, not {}",
            other.type_name()
        ))),
    }
}

// ----------------------------------------------------------------------
// Builtin functions
// ----------------------------------------------------------------------

fn builtin_print(interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    let mut sep = " ".to_string();
    let mut end = "\n".to_string();
    for (key, value) in kwargs {
        let text = match &value {
            Value::None => continue,
            other => expect_str(other, &key)?.to_string(),
        };
        match key.as_str() {
            "sep" => sep = text,
            "end" => end = text,
            other => {
                return Err(type_error(format!(
                    "'{other}' is an invalid keyword argument for print()"
                )))
            }
        }
    }
    let parts: Vec<String> = args.iter().map(ToString::to_string).collect();
    interp.write_output(&format!("{}{}", parts.join(&sep), end))?;
    Ok(Value::None)
}

fn builtin_len(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    no_kwargs("len", &kwargs)?;
    arity("len", &args, 1, 1)?;
    let len = match &args[0] {
        Value::Str(text) => text.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(dict) => dict.borrow().len(),
        other => {
            return Err(type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(len as i64))
}

fn builtin_range(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    no_kwargs("range", &kwargs)?;
    if args.is_empty() {
        return Err(type_error("range expected at least 1 argument, got 0"));
    }
    let (start, stop, step) = match args.as_slice() {
        [stop] => (0, expect_int(stop)?, 1),
        [start, stop] => (expect_int(start)?, expect_int(stop)?, 1),
        [start, stop, step] => (expect_int(start)?, expect_int(stop)?, expect_int(step)?),
        _ => {
            return Err(type_error(format!(
                "range expected at most 3 arguments, got {}",
                args.len()
            )))
        }
    };
    if step == 0 {
        return Err(value_error("range() arg 3 must not be zero"));
    }
    let span = if step > 0 {
        (stop as i128 - start as i128).max(0)
    } else {
        (start as i128 - stop as i128).max(0)
    };
    let step_size = (step as i128).abs();
    let len = ops::check_sequence_len(((span + step_size - 1) / step_size) as u128, "range()")?;
    let mut items = Vec::with_capacity(len);
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::list(items))
}

fn builtin_repr(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    no_kwargs("repr", &kwargs)?;
    arity("repr", &args, 1, 1)?;
    Ok(Value::str(args[0].repr()))
}

fn builtin_abs(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    no_kwargs("abs", &kwargs)?;
    arity("abs", &args, 1, 1)?;
    match args[0].as_number() {
        Some(Number::Int(n)) => n.checked_abs().map(Value::Int).ok_or_else(|| {
            ScriptError::raise(ExceptionKind::OverflowError, "integer overflow")
        }),
        Some(Number::Float(x)) => Ok(Value::Float(x.abs())),
        None => Err(type_error(format!(
            "bad operand type for abs(): '{}'",
            args[0].type_name()
        ))),
    }
}

fn extremum(name: &str, args: Vec<Value>, kwargs: Kwargs, wanted: Ordering) -> ScriptResult<Value> {
    no_kwargs(name, &kwargs)?;
    if args.is_empty() {
        return Err(type_error(format!(
            "{name} expected at least 1 argument, got 0"
        )));
    }
    let candidates = if args.len() == 1 {
        ops::iterate(&args[0])?
    } else {
        args
    };
    let mut items = candidates.into_iter();
    let Some(mut best) = items.next() else {
        return Err(value_error(format!("{name}() arg is an empty sequence")));
    };
    let symbol = if wanted == Ordering::Less { "<" } else { ">" };
    for item in items {
        if ops::order(&item, &best, symbol)? == wanted {
            best = item;
        }
    }
    Ok(best)
}

fn builtin_min(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    extremum("min", args, kwargs, Ordering::Less)
}

fn builtin_max(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    extremum("max", args, kwargs, Ordering::Greater)
}

fn builtin_sum(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    no_kwargs("sum", &kwargs)?;
    arity("sum", &args, 1, 2)?;
    let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
    if matches!(total, Value::Str(_)) {
        return Err(type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    for item in ops::iterate(&args[0])? {
        total = ops::binary(BinaryOp::Add, &total, &item)?;
    }
    Ok(total)
}

fn builtin_isinstance(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Kwargs,
) -> ScriptResult<Value> {
    no_kwargs("isinstance", &kwargs)?;
    arity("isinstance", &args, 2, 2)?;
    Ok(Value::Bool(is_instance(&args[0], &args[1])?))
}

fn is_instance(value: &Value, class: &Value) -> ScriptResult<bool> {
    match class {
        Value::Type(ty) => Ok(value.builtin_type() == *ty
            || (*ty == BuiltinType::Int && matches!(value, Value::Bool(_)))),
        Value::ExceptionClass(kind) => Ok(matches!(
            value,
            Value::Exception(exception) if exception.kind.is_subclass_of(*kind)
        )),
        Value::Tuple(classes) => {
            for class in classes.iter() {
                if is_instance(value, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(type_error(
            "isinstance() arg 2 must be a type or tuple of types",
        )),
    }
}

// ----------------------------------------------------------------------
// Builtin types as constructors
// ----------------------------------------------------------------------

pub fn construct(
    _interp: &mut Interpreter,
    ty: BuiltinType,
    args: Vec<Value>,
    kwargs: Kwargs,
) -> ScriptResult<Value> {
    if ty != BuiltinType::Dict {
        no_kwargs(ty.name(), &kwargs)?;
    }
    match ty {
        BuiltinType::Str => {
            arity("str", &args, 0, 1)?;
            Ok(Value::str(args.first().map(ToString::to_string).unwrap_or_default()))
        }
        BuiltinType::Int => {
            arity("int", &args, 0, 2)?;
            match args.as_slice() {
                [] => Ok(Value::Int(0)),
                [value] => to_int(value),
                [Value::Str(text), base] => parse_int(text, expect_int(base)?),
                _ => Err(type_error("int() can't convert non-string with explicit base")),
            }
        }
        BuiltinType::Float => {
            arity("float", &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Float(0.0)),
                Some(Value::Str(text)) => text
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| {
                        value_error(format!(
                            "could not convert string to float: {}",
                            repr_str(text)
                        ))
                    }),
                Some(other) => match other.as_number() {
                    Some(number) => Ok(Value::Float(number.to_f64())),
                    None => Err(type_error(format!(
                        "float() argument must be a string or a real number, not '{}'",
                        other.type_name()
                    ))),
                },
            }
        }
        BuiltinType::Bool => {
            arity("bool", &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
        }
        BuiltinType::List => {
            arity("list", &args, 0, 1)?;
            match args.first() {
                Some(iterable) => Ok(Value::list(ops::iterate(iterable)?)),
                None => Ok(Value::list(Vec::new())),
            }
        }
        BuiltinType::Tuple => {
            arity("tuple", &args, 0, 1)?;
            match args.first() {
                Some(iterable) => Ok(Value::tuple(ops::iterate(iterable)?)),
                None => Ok(Value::tuple(Vec::new())),
            }
        }
        BuiltinType::Dict => {
            arity("dict", &args, 0, 1)?;
            let mut dict = Dict::new();
            match args.first() {
                Some(Value::Dict(source)) => {
                    for (key, value) in source.borrow().items() {
                        dict.insert(key.clone(), value.clone())?;
                    }
                }
                Some(pairs) => {
                    for (index, pair) in ops::iterate(pairs)?.into_iter().enumerate() {
                        match ops::iterate(&pair)?.as_slice() {
                            [key, value] => dict.insert(key.clone(), value.clone())?,
                            other => {
                                return Err(value_error(format!(
                                    "dictionary update sequence element #{index} has length {}; 2 is required",
                                    other.len()
                                )))
                            }
                        }
                    }
                }
                None => {}
            }
            for (key, value) in kwargs {
                dict.insert(Value::str(key), value)?;
            }
            Ok(Value::dict(dict))
        }
        BuiltinType::Type => {
            arity("type", &args, 1, 1)?;
            Ok(match &args[0] {
                Value::Exception(exception) => Value::ExceptionClass(exception.kind),
                other => Value::Type(other.builtin_type()),
            })
        }
        other => Err(type_error(format!(
            "cannot create '{}' instances",
            other.name()
        ))),
    }
}

fn to_int(value: &Value) -> ScriptResult<Value> {
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(x) => {
            if x.is_nan() {
                return Err(value_error("cannot convert float NaN to integer"));
            }
            let truncated = x.trunc();
            if truncated.is_infinite() || truncated.abs() >= 9.223_372_036_854_776e18 {
                return Err(ScriptError::raise(
                    ExceptionKind::OverflowError,
                    "cannot convert float infinity to integer",
                ));
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(text) => parse_int(text, 10),
        other => Err(type_error(format!(
            "int() argument must be a string or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_int(text: &str, base: i64) -> ScriptResult<Value> {
    let invalid = || {
        value_error(format!(
            "invalid literal for int() with base {base}: {}",
            repr_str(text)
        ))
    };
    let radix = u32::try_from(base)
        .ok()
        .filter(|radix| (2..=36).contains(radix))
        .ok_or_else(|| value_error("int() base must be >= 2 and <= 36"))?;
    i64::from_str_radix(text.trim(), radix)
        .map(Value::Int)
        .map_err(|_| invalid())
}

// ----------------------------------------------------------------------
// Native methods
// ----------------------------------------------------------------------

pub fn has_method(receiver: &Value, name: &str) -> bool {
    let table = match receiver {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

pub fn call_method(
    _interp: &mut Interpreter,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Kwargs,
) -> ScriptResult<Value> {
    match receiver {
        Value::Str(text) => str_method(text, name, args, kwargs),
        Value::List(items) => {
            no_kwargs(name, &kwargs)?;
            list_method(items, name, args)
        }
        Value::Dict(dict) => {
            no_kwargs(name, &kwargs)?;
            dict_method(&dict.borrow(), name, args)
        }
        other => Err(ScriptError::raise(
            ExceptionKind::AttributeError,
            format!("'{}' object has no attribute '{name}'", other.type_name()),
        )),
    }
}

fn str_method(text: &Rc<str>, name: &str, mut args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
    if name == "split" {
        for (key, value) in kwargs {
            match key.as_str() {
                "sep" if args.is_empty() => args.push(value),
                "maxsplit" => {
                    if args.is_empty() {
                        args.push(Value::None);
                    }
                    args.push(value);
                }
                _ => {
                    return Err(type_error(format!(
                        "'{key}' is an invalid keyword argument for split()"
                    )))
                }
            }
        }
    } else {
        no_kwargs(name, &kwargs)?;
    }

    match name {
        "upper" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::str(text.to_uppercase()))
        }
        "lower" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::str(text.to_lowercase()))
        }
        "strip" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None | Some(Value::None) => Ok(Value::str(text.trim())),
                Some(chars) => {
                    let chars = expect_str(chars, "strip arg")?;
                    Ok(Value::str(text.trim_matches(|c: char| chars.contains(c))))
                }
            }
        }
        "split" => {
            arity(name, &args, 0, 2)?;
            let maxsplit = match args.get(1) {
                Some(value) => expect_int(value)?,
                None => -1,
            };
            let parts = match args.first() {
                None | Some(Value::None) => split_whitespace(text, maxsplit),
                Some(sep) => {
                    let sep = expect_str(sep, "separator")?;
                    if sep.is_empty() {
                        return Err(value_error("empty separator"));
                    }
                    if maxsplit < 0 {
                        text.split(sep).map(str::to_string).collect()
                    } else {
                        text.splitn(maxsplit as usize + 1, sep)
                            .map(str::to_string)
                            .collect()
                    }
                }
            };
            Ok(Value::list(parts.into_iter().map(Value::str).collect()))
        }
        "join" => {
            arity(name, &args, 1, 1)?;
            let mut parts = Vec::new();
            for (index, item) in ops::iterate(&args[0])?.into_iter().enumerate() {
                match item {
                    Value::Str(part) => parts.push(part.to_string()),
                    other => {
                        return Err(type_error(format!(
                            "sequence item {index}: expected str instance, {} found",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::str(parts.join(&**text)))
        }
        "replace" => {
            arity(name, &args, 2, 3)?;
            let old = expect_str(&args[0], "replace() argument 1")?;
            let new = expect_str(&args[1], "replace() argument 2")?;
            match args.get(2) {
                Some(count) => {
                    let count = expect_int(count)?;
                    if count < 0 {
                        Ok(Value::str(text.replace(old, new)))
                    } else {
                        Ok(Value::str(text.replacen(old, new, count as usize)))
                    }
                }
                None => Ok(Value::str(text.replace(old, new))),
            }
        }
        "startswith" | "endswith" => {
            arity(name, &args, 1, 1)?;
            let candidates = match &args[0] {
                Value::Tuple(items) => items.as_ref().clone(),
                single => vec![single.clone()],
            };
            for candidate in &candidates {
                let affix = expect_str(candidate, name)?;
                let hit = if name == "startswith" {
                    text.starts_with(affix)
                } else {
                    text.ends_with(affix)
                };
                if hit {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "format" => format_positional(text, &args).map(Value::str),
        _ => Err(ScriptError::raise(
            ExceptionKind::AttributeError,
            format!("'str' object has no attribute '{name}'"),
        )),
    }
}

fn split_whitespace(text: &str, maxsplit: i64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if maxsplit >= 0 && parts.len() as i64 == maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

/// `str.format` with `{}` and `{N}` fields and `{{`/`}}` escapes.
fn format_positional(template: &str, args: &[Value]) -> ScriptResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_auto = 0usize;
    let mut numbering: Option<bool> = None;
    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => {
                            return Err(value_error(
                                "expected '}' before end of string",
                            ))
                        }
                    }
                }
                let manual = !field.is_empty();
                if numbering.is_some_and(|mode| mode != manual) {
                    return Err(value_error(if manual {
                        "cannot switch from automatic field numbering to manual field specification"
                    } else {
                        "cannot switch from manual field specification to automatic field numbering"
                    }));
                }
                numbering = Some(manual);
                let index = if !manual {
                    next_auto += 1;
                    next_auto - 1
                } else {
                    field.parse::<usize>().map_err(|_| {
                        value_error(format!("unsupported format field '{field}'"))
                    })?
                };
                let value = args.get(index).ok_or_else(|| {
                    ScriptError::raise(
                        ExceptionKind::IndexError,
                        format!(
                            "Replacement index {index} out of range for positional args tuple"
                        ),
                    )
                })?;
                out.push_str(&value.to_string());
            }
            '}' => {
                return Err(value_error(
                    "Single '}' encountered in format string",
                ))
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn list_method(items: &RefCell<Vec<Value>>, name: &str, args: Vec<Value>) -> ScriptResult<Value> {
    match name {
        "append" => {
            arity(name, &args, 1, 1)?;
            items.borrow_mut().extend(args);
            Ok(Value::None)
        }
        "extend" => {
            arity(name, &args, 1, 1)?;
            let extra = ops::iterate(&args[0])?;
            items.borrow_mut().extend(extra);
            Ok(Value::None)
        }
        "pop" => {
            arity(name, &args, 0, 1)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(ScriptError::raise(
                    ExceptionKind::IndexError,
                    "pop from empty list",
                ));
            }
            let at = match args.first() {
                Some(index) => ops::normalize_index(index, items.len(), "pop")?,
                None => items.len() - 1,
            };
            Ok(items.remove(at))
        }
        "insert" => {
            arity(name, &args, 2, 2)?;
            let mut items = items.borrow_mut();
            let len = items.len() as i64;
            let raw = expect_int(&args[0])?;
            let at = if raw < 0 { (raw + len).max(0) } else { raw.min(len) };
            items.insert(at as usize, args[1].clone());
            Ok(Value::None)
        }
        "index" => {
            arity(name, &args, 1, 1)?;
            items
                .borrow()
                .iter()
                .position(|item| item.py_eq(&args[0]))
                .map(|at| Value::Int(at as i64))
                .ok_or_else(|| value_error(format!("{} is not in list", args[0].repr())))
        }
        _ => Err(ScriptError::raise(
            ExceptionKind::AttributeError,
            format!("'list' object has no attribute '{name}'"),
        )),
    }
}

fn dict_method(dict: &Dict, name: &str, args: Vec<Value>) -> ScriptResult<Value> {
    match name {
        "get" => {
            arity(name, &args, 1, 2)?;
            Ok(dict
                .get(&args[0])
                .cloned()
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
        }
        "keys" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(dict.keys()))
        }
        "values" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(dict.values()))
        }
        "items" => {
            arity(name, &args, 0, 0)?;
            Ok(Value::list(
                dict.items()
                    .iter()
                    .map(|(key, value)| Value::tuple(vec![key.clone(), value.clone()]))
                    .collect(),
            ))
        }
        _ => Err(ScriptError::raise(
            ExceptionKind::AttributeError,
            format!("'dict' object has no attribute '{name}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::interpreter::OutputBuffer;

    fn eval(source: &str) -> Value {
        Interpreter::new()
            .with_output(OutputBuffer::new())
            .eval_source(source)
            .expect("script evaluates")
    }

    fn repr_of(source: &str) -> String {
        eval(source).repr()
    }

    #[test]
    fn print_honours_sep_and_end() {
        let output = OutputBuffer::new();
        let mut interp = Interpreter::new().with_output(output.clone());
        interp
            .exec_source("print('a', 1, None, sep='-', end='!')\nprint(2.0)")
            .expect("print");
        assert_eq!(output.contents(), "a-1-None!2.0\n");
    }

    #[test]
    fn range_and_aggregates() {
        assert_eq!(repr_of("range(5, 0, -2)"), "[5, 3, 1]");
        assert_eq!(repr_of("sum(range(4), 10)"), "16");
        assert_eq!(repr_of("min(3, 1, 2), max([4, 9, 2])"), "(1, 9)");
        assert_eq!(repr_of("abs(-2.5)"), "2.5");
        assert_eq!(repr_of("range(0, 10, 4)"), "[0, 4, 8]");
        assert_eq!(repr_of("range(3, 3)"), "[]");
        let err = Interpreter::new()
            .with_output(OutputBuffer::new())
            .eval_source("range(9223372036854775807)")
            .expect_err("range too long");
        assert_eq!(err.kind(), ExceptionKind::OverflowError);
    }

    #[test]
    fn conversions_follow_python_rules() {
        assert_eq!(repr_of("int(' 42 ')"), "42");
        assert_eq!(repr_of("int('ff', 16)"), "255");
        assert_eq!(repr_of("int(-3.9)"), "-3");
        assert_eq!(repr_of("float('1.5') + 1"), "2.5");
        assert_eq!(repr_of("str(1.0) + str(True)"), "'1.0True'");
        assert_eq!(repr_of("dict([('a', 1)], b=2)"), "{'a': 1, 'b': 2}");
        let err = Interpreter::new()
            .with_output(OutputBuffer::new())
            .eval_source("int('x')")
            .expect_err("bad literal");
        assert_eq!(
            err.repr(),
            "ValueError(\"invalid literal for int() with base 10: 'x'\")"
        );
    }

    #[test]
    fn isinstance_and_type_cover_exceptions() {
        assert_eq!(repr_of("isinstance(True, int)"), "True");
        assert_eq!(repr_of("isinstance(1, (str, float))"), "False");
        assert_eq!(
            repr_of("isinstance(KeyError('k'), LookupError)"),
            "True"
        );
        assert_eq!(repr_of("type(1) == int"), "True");
    }

    #[test]
    fn string_methods() {
        assert_eq!(repr_of("'  a b  c '.split()"), "['a', 'b', 'c']");
        assert_eq!(repr_of("'a,b,c'.split(',', 1)"), "['a', 'b,c']");
        assert_eq!(repr_of("'-'.join(['x', 'y'])"), "'x-y'");
        assert_eq!(repr_of("'{} + {}'.format(1, 2)"), "'1 + 2'");
        assert_eq!(repr_of("'{1}{0}{{}}'.format('a', 'b')"), "'ba{}'");
        assert_eq!(repr_of("'Hello'.upper().startswith(('HE', 'x'))"), "True");
        assert_eq!(repr_of("'xxhixx'.strip('x').replace('h', 'H')"), "'Hi'");
    }

    #[test]
    fn list_and_dict_methods() {
        let source = r#"
items = [1, 2]
items.append(3)
items.extend((4, 5))
items.insert(0, 0)
last = items.pop()
config = {'a': 1}
config['b'] = 2
(items, last, items.index(3), config.get('c', 9), config.items())
"#;
        assert_eq!(
            repr_of(source),
            "([0, 1, 2, 3, 4], 5, 3, 9, [('a', 1), ('b', 2)])"
        );
    }
}

//=====================================================
// End of file
//=====================================================
