//=====================================================
// File: script/ops.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Operator semantics for script values
// Objective: Arithmetic with floor-division rules and overflow checks,
//            ordering and membership, iteration, and indexing
//=====================================================

use std::cmp::Ordering;
use std::rc::Rc;

use super::ast::{BinaryOp, CompareOp, UnaryOp};
use super::errors::{ExceptionKind, ScriptError, ScriptResult};
use super::value::{ExceptionObject, Number, Value};

fn type_error(message: impl Into<String>) -> ScriptError {
    ScriptError::raise(ExceptionKind::TypeError, message)
}

fn zero_division() -> ScriptError {
    ScriptError::raise(ExceptionKind::ZeroDivisionError, "division by zero")
}

fn overflow() -> ScriptError {
    ScriptError::raise(ExceptionKind::OverflowError, "integer overflow")
}

/// Upper bound on the length of a str or list built by one operation.
pub const MAX_SEQUENCE_LEN: usize = 1 << 28;

/// Reject sequence results longer than [`MAX_SEQUENCE_LEN`].
pub fn check_sequence_len(len: u128, what: &str) -> ScriptResult<usize> {
    match usize::try_from(len) {
        Ok(len) if len <= MAX_SEQUENCE_LEN => Ok(len),
        _ => Err(ScriptError::raise(
            ExceptionKind::OverflowError,
            format!("{what} result is too long"),
        )),
    }
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> ScriptError {
    type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> ScriptResult<Value> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return numeric(op, a, b);
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.as_ref().clone();
            items.extend(b.iter().cloned());
            Ok(Value::tuple(items))
        }
        (BinaryOp::Mul, Value::Str(text), count) | (BinaryOp::Mul, count, Value::Str(text))
            if matches!(count, Value::Int(_) | Value::Bool(_)) =>
        {
            let times = repeat_count(count);
            check_sequence_len(text.len() as u128 * times as u128, "repeated str")?;
            Ok(Value::str(text.repeat(times)))
        }
        (BinaryOp::Mul, Value::List(items), count) | (BinaryOp::Mul, count, Value::List(items))
            if matches!(count, Value::Int(_) | Value::Bool(_)) =>
        {
            let items = items.borrow();
            let times = repeat_count(count);
            let len = check_sequence_len(items.len() as u128 * times as u128, "repeated list")?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..times.min(len) {
                out.extend(items.iter().cloned());
            }
            Ok(Value::list(out))
        }
        _ => Err(unsupported(op, left, right)),
    }
}

fn repeat_count(count: &Value) -> usize {
    match count.as_number() {
        Some(Number::Int(n)) if n > 0 => n as usize,
        _ => 0,
    }
}

fn numeric(op: BinaryOp, a: Number, b: Number) -> ScriptResult<Value> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => integer(op, x, y),
        _ => float(op, a.to_f64(), b.to_f64()),
    }
}

fn integer(op: BinaryOp, x: i64, y: i64) -> ScriptResult<Value> {
    let result = match op {
        BinaryOp::Add => x.checked_add(y).ok_or_else(overflow)?,
        BinaryOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
        BinaryOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
        BinaryOp::Div => return float(op, x as f64, y as f64),
        BinaryOp::FloorDiv => {
            if y == 0 {
                return Err(zero_division());
            }
            let quotient = x.checked_div(y).ok_or_else(overflow)?;
            if (x % y != 0) && ((x < 0) != (y < 0)) {
                quotient - 1
            } else {
                quotient
            }
        }
        BinaryOp::Mod => {
            if y == 0 {
                return Err(zero_division());
            }
            let remainder = x.checked_rem(y).unwrap_or(0);
            if remainder != 0 && ((remainder < 0) != (y < 0)) {
                remainder + y
            } else {
                remainder
            }
        }
        BinaryOp::Pow => {
            if y < 0 {
                return float(op, x as f64, y as f64);
            }
            let exponent = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_pow(exponent).ok_or_else(overflow)?
        }
    };
    Ok(Value::Int(result))
}

fn float(op: BinaryOp, x: f64, y: f64) -> ScriptResult<Value> {
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y == 0.0 {
                return Err(zero_division());
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(zero_division());
            }
            (x / y).floor()
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(zero_division());
            }
            x - y * (x / y).floor()
        }
        BinaryOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(ScriptError::raise(
                    ExceptionKind::ZeroDivisionError,
                    "0.0 cannot be raised to a negative power",
                ));
            }
            x.powf(y)
        }
    };
    Ok(Value::Float(result))
}

pub fn unary(op: UnaryOp, operand: &Value) -> ScriptResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Pos => match operand.as_number() {
            Some(Number::Int(n)) => Ok(Value::Int(n)),
            Some(Number::Float(x)) => Ok(Value::Float(x)),
            None => Err(type_error(format!(
                "bad operand type for unary +: '{}'",
                operand.type_name()
            ))),
        },
        UnaryOp::Neg => match operand.as_number() {
            Some(Number::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
            Some(Number::Float(x)) => Ok(Value::Float(-x)),
            None => Err(type_error(format!(
                "bad operand type for unary -: '{}'",
                operand.type_name()
            ))),
        },
    }
}

/// Ordering used by `<`, `sorted`-style builtins, `min`, and `max`.
pub fn order(left: &Value, right: &Value, symbol: &str) -> ScriptResult<Ordering> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Ok(match (a, b) {
            (Number::Int(x), Number::Int(y)) => x.cmp(&y),
            _ => a
                .to_f64()
                .partial_cmp(&b.to_f64())
                .unwrap_or(Ordering::Equal),
        });
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) => order_sequences(&a.borrow(), &b.borrow(), symbol),
        (Value::Tuple(a), Value::Tuple(b)) => order_sequences(a, b, symbol),
        _ => Err(type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn order_sequences(a: &[Value], b: &[Value], symbol: &str) -> ScriptResult<Ordering> {
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y) {
            return order(x, y, symbol);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

pub fn compare(op: CompareOp, left: &Value, right: &Value) -> ScriptResult<bool> {
    Ok(match op {
        CompareOp::Eq => left.py_eq(right),
        CompareOp::NotEq => !left.py_eq(right),
        CompareOp::Less => order(left, right, op.symbol())? == Ordering::Less,
        CompareOp::LessEq => order(left, right, op.symbol())? != Ordering::Greater,
        CompareOp::Greater => order(left, right, op.symbol())? == Ordering::Greater,
        CompareOp::GreaterEq => order(left, right, op.symbol())? != Ordering::Less,
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
        CompareOp::Is => left.is_same(right),
        CompareOp::IsNot => !left.is_same(right),
    })
}

pub fn contains(container: &Value, needle: &Value) -> ScriptResult<bool> {
    match container {
        Value::Str(haystack) => match needle {
            Value::Str(part) => Ok(haystack.contains(&**part)),
            other => Err(type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.borrow().iter().any(|item| item.py_eq(needle))),
        Value::Tuple(items) => Ok(items.iter().any(|item| item.py_eq(needle))),
        Value::Dict(dict) => Ok(dict.borrow().get(needle).is_some()),
        other => Err(type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Snapshot of the items a `for` loop or builtin walks over.
pub fn iterate(value: &Value) -> ScriptResult<Vec<Value>> {
    match value {
        Value::Str(text) => Ok(text.chars().map(|c| Value::str(c.to_string())).collect()),
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.as_ref().clone()),
        Value::Dict(dict) => Ok(dict.borrow().keys()),
        other => Err(type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against `len`.
pub fn normalize_index(index: &Value, len: usize, what: &str) -> ScriptResult<usize> {
    let raw = match index {
        Value::Int(n) => *n,
        Value::Bool(b) => *b as i64,
        other => {
            return Err(type_error(format!(
                "{what} indices must be integers, not {}",
                other.type_name()
            )))
        }
    };
    let adjusted = if raw < 0 { raw + len as i64 } else { raw };
    if adjusted < 0 || adjusted >= len as i64 {
        return Err(ScriptError::raise(
            ExceptionKind::IndexError,
            format!("{what} index out of range"),
        ));
    }
    Ok(adjusted as usize)
}

pub fn get_item(container: &Value, index: &Value) -> ScriptResult<Value> {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let at = normalize_index(index, items.len(), "list")?;
            Ok(items[at].clone())
        }
        Value::Tuple(items) => {
            let at = normalize_index(index, items.len(), "tuple")?;
            Ok(items[at].clone())
        }
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            let at = normalize_index(index, chars.len(), "string")?;
            Ok(Value::str(chars[at].to_string()))
        }
        Value::Dict(dict) => {
            if !index.is_hashable() {
                return Err(type_error(format!(
                    "unhashable type: '{}'",
                    index.type_name()
                )));
            }
            dict.borrow().get(index).cloned().ok_or_else(|| {
                ScriptError::from_exception(Rc::new(ExceptionObject::new(
                    ExceptionKind::KeyError,
                    vec![index.clone()],
                )))
            })
        }
        other => Err(type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub fn set_item(container: &Value, index: &Value, value: Value) -> ScriptResult<()> {
    match container {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let at = normalize_index(index, items.len(), "list assignment")?;
            items[at] = value;
            Ok(())
        }
        Value::Dict(dict) => dict.borrow_mut().insert(index.clone(), value),
        other => Err(type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_repetition_raises_instead_of_allocating() {
        let huge = Value::Int(i64::MAX);
        for sequence in [Value::str("ab"), Value::list(vec![Value::Int(1), Value::Int(2)])] {
            match binary(BinaryOp::Mul, &sequence, &huge) {
                Err(err) => assert_eq!(err.kind(), ExceptionKind::OverflowError),
                other => panic!("unexpected repetition result: {other:?}"),
            }
        }
        match binary(BinaryOp::Mul, &Value::Int(3), &Value::str("ab")) {
            Ok(Value::Str(text)) => assert_eq!(&*text, "ababab"),
            other => panic!("unexpected repetition result: {other:?}"),
        }
        let empty = binary(BinaryOp::Mul, &Value::list(Vec::new()), &huge).expect("empty list");
        assert_eq!(empty.repr(), "[]");
    }

    #[test]
    fn floor_division_and_modulo_follow_the_divisor_sign() {
        let cases = [(7, 2, 3, 1), (-7, 2, -4, 1), (7, -2, -4, -1), (-7, -2, 3, -1)];
        for (x, y, quotient, remainder) in cases {
            match binary(BinaryOp::FloorDiv, &Value::Int(x), &Value::Int(y)) {
                Ok(Value::Int(q)) => assert_eq!(q, quotient, "{x} // {y}"),
                other => panic!("unexpected quotient: {other:?}"),
            }
            match binary(BinaryOp::Mod, &Value::Int(x), &Value::Int(y)) {
                Ok(Value::Int(r)) => assert_eq!(r, remainder, "{x} % {y}"),
                other => panic!("unexpected remainder: {other:?}"),
            }
        }
    }

    #[test]
    fn division_by_zero_raises() {
        let err = binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)).expect_err("zero");
        assert_eq!(err.kind(), ExceptionKind::ZeroDivisionError);
        assert_eq!(err.repr(), "ZeroDivisionError('division by zero')");
    }

    #[test]
    fn overflow_is_reported() {
        let err = binary(BinaryOp::Mul, &Value::Int(i64::MAX), &Value::Int(2)).expect_err("big");
        assert_eq!(err.kind(), ExceptionKind::OverflowError);
    }

    #[test]
    fn mixed_types_are_rejected_with_python_wording() {
        let err = binary(BinaryOp::Add, &Value::Int(1), &Value::str("a")).expect_err("mixed");
        assert!(err
            .repr()
            .contains("unsupported operand type(s) for +: 'int' and 'str'"));
        let err = compare(CompareOp::Less, &Value::Int(1), &Value::str("a")).expect_err("order");
        assert_eq!(err.kind(), ExceptionKind::TypeError);
    }

    #[test]
    fn sequences_compare_lexicographically() {
        let a = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::tuple(vec![Value::Int(1), Value::Int(3)]);
        assert!(compare(CompareOp::Less, &a, &b).expect("compare"));
        assert!(compare(CompareOp::In, &Value::Int(2), &a).expect("contains"));
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(matches!(get_item(&list, &Value::Int(-1)), Ok(Value::Int(3))));
        let err = get_item(&list, &Value::Int(3)).expect_err("out of range");
        assert_eq!(err.kind(), ExceptionKind::IndexError);
    }
}

//=====================================================
// End of file
//=====================================================
