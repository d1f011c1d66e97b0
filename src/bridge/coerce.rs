//=====================================================
// File: bridge/coerce.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Argument coercion across the runtime boundary
// Objective: Convert native script values, proxies, and sequences into
//            host values assignable to a parameter type
//=====================================================

use tracing::debug;

use super::signature;
use super::CoercionError;
use crate::host::{
    ForeignHandle, HostRuntime, HostValue, PrimitiveKind, TypeDescriptor, OBJECT_CLASS,
    STRING_CLASS,
};
use crate::script::value::Value;

/// Convert `value` into something assignable to `target`.
///
/// Rules apply in order: `None`, raw foreign handles, object proxies (unwrapped
/// one level), sequences (array targets only, first element checked), then
/// scalars against primitives, `String`, and `Object`.
pub fn coerce(
    host: &dyn HostRuntime,
    value: &Value,
    target: &TypeDescriptor,
) -> Result<HostValue, CoercionError> {
    match value {
        Value::None => {
            if target.is_primitive() {
                Err(CoercionError::CannotCastNullToPrimitive {
                    target: target.display_name(),
                })
            } else {
                Ok(HostValue::Null)
            }
        }
        Value::Handle(handle) => coerce_handle(host, *handle, target),
        Value::Foreign(object) => coerce_handle(host, object.handle(), target),
        Value::List(items) => {
            let items = items.borrow().clone();
            coerce_sequence(host, &items, target)
        }
        Value::Tuple(items) => coerce_sequence(host, items, target),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
            if target.is_primitive()
                || target.is_class(STRING_CLASS)
                || target.is_class(OBJECT_CLASS) =>
        {
            coerce_scalar(host, value, target)
        }
        _ => Err(no_rule(target)),
    }
}

fn no_rule(target: &TypeDescriptor) -> CoercionError {
    CoercionError::NoCoercionRule {
        signature: signature::encode(target),
    }
}

fn coerce_handle(
    host: &dyn HostRuntime,
    handle: ForeignHandle,
    target: &TypeDescriptor,
) -> Result<HostValue, CoercionError> {
    if host.is_instance(target, handle) {
        return Ok(HostValue::Object(handle));
    }
    let actual = host
        .class_of(handle)
        .map(|class| class.display_name())
        .unwrap_or_else(|_| format!("<invalid handle {handle}>"));
    Err(CoercionError::IncompatibleForeignType {
        actual,
        target: target.display_name(),
    })
}

fn coerce_sequence(
    host: &dyn HostRuntime,
    items: &[Value],
    target: &TypeDescriptor,
) -> Result<HostValue, CoercionError> {
    let Some(component) = target.component_type() else {
        return Err(CoercionError::NotAnArrayTarget {
            target: target.display_name(),
        });
    };
    if let Some(first) = items.first() {
        coerce(host, first, component)?;
    }
    bulk_convert(host, items, component, target)
}

/// Native sequence to foreign array; element failures surface as a missing rule for the array.
fn bulk_convert(
    host: &dyn HostRuntime,
    items: &[Value],
    component: &TypeDescriptor,
    target: &TypeDescriptor,
) -> Result<HostValue, CoercionError> {
    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        match coerce(host, item, component) {
            Ok(element) => elements.push(element),
            Err(err) => {
                debug!(%err, target = %target, "array element conversion failed");
                return Err(no_rule(target));
            }
        }
    }
    host.new_array(component, elements)
        .map(HostValue::Object)
        .map_err(|err| {
            debug!(%err, target = %target, "host rejected array");
            no_rule(target)
        })
}

fn coerce_scalar(
    host: &dyn HostRuntime,
    value: &Value,
    target: &TypeDescriptor,
) -> Result<HostValue, CoercionError> {
    if let Some(kind) = target.primitive_kind() {
        return to_primitive(value, kind).ok_or_else(|| no_rule(target));
    }
    if target.is_class(STRING_CLASS) {
        return match value {
            Value::Str(text) => new_string(host, text, target),
            _ => Err(no_rule(target)),
        };
    }
    let primitive = match value {
        Value::Str(text) => return new_string(host, text, target),
        Value::Bool(b) => HostValue::Boolean(*b),
        Value::Int(n) => match i32::try_from(*n) {
            Ok(small) => HostValue::Int(small),
            Err(_) => HostValue::Long(*n),
        },
        Value::Float(x) => HostValue::Double(*x),
        _ => return Err(no_rule(target)),
    };
    host.box_value(primitive)
        .map(HostValue::Object)
        .map_err(|_| no_rule(target))
}

fn new_string(
    host: &dyn HostRuntime,
    text: &str,
    target: &TypeDescriptor,
) -> Result<HostValue, CoercionError> {
    host.new_string(text)
        .map(HostValue::Object)
        .map_err(|_| no_rule(target))
}

fn to_primitive(value: &Value, kind: PrimitiveKind) -> Option<HostValue> {
    match (kind, value) {
        (PrimitiveKind::Boolean, Value::Bool(b)) => Some(HostValue::Boolean(*b)),
        (PrimitiveKind::Byte, Value::Int(n)) => i8::try_from(*n).ok().map(HostValue::Byte),
        (PrimitiveKind::Short, Value::Int(n)) => i16::try_from(*n).ok().map(HostValue::Short),
        (PrimitiveKind::Int, Value::Int(n)) => i32::try_from(*n).ok().map(HostValue::Int),
        (PrimitiveKind::Long, Value::Int(n)) => Some(HostValue::Long(*n)),
        (PrimitiveKind::Float, Value::Int(n)) => Some(HostValue::Float(*n as f32)),
        (PrimitiveKind::Float, Value::Float(x)) => Some(HostValue::Float(*x as f32)),
        (PrimitiveKind::Double, Value::Int(n)) => Some(HostValue::Double(*n as f64)),
        (PrimitiveKind::Double, Value::Float(x)) => Some(HostValue::Double(*x)),
        (PrimitiveKind::Char, Value::Str(text)) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if (c as u32) <= 0xFFFF => Some(HostValue::Char(c)),
                _ => None,
            }
        }
        (PrimitiveKind::Char, Value::Int(n)) => u32::try_from(*n)
            .ok()
            .filter(|code| *code <= 0xFFFF)
            .and_then(char::from_u32)
            .map(HostValue::Char),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryHost;

    fn int() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Int)
    }

    #[test]
    fn none_only_reaches_reference_types() {
        let host = InMemoryHost::new();
        assert_eq!(
            coerce(&host, &Value::None, &TypeDescriptor::string()),
            Ok(HostValue::Null)
        );
        match coerce(&host, &Value::None, &int()) {
            Err(CoercionError::CannotCastNullToPrimitive { target }) => assert_eq!(target, "int"),
            other => panic!("unexpected coercion: {other:?}"),
        }
    }

    #[test]
    fn integral_targets_check_range_and_reject_bool() {
        let host = InMemoryHost::new();
        let byte = TypeDescriptor::Primitive(PrimitiveKind::Byte);
        assert_eq!(coerce(&host, &Value::Int(-5), &byte), Ok(HostValue::Byte(-5)));
        assert!(coerce(&host, &Value::Int(300), &byte).is_err());
        assert!(coerce(&host, &Value::Bool(true), &int()).is_err());
        assert_eq!(
            coerce(&host, &Value::Int(3), &TypeDescriptor::Primitive(PrimitiveKind::Double)),
            Ok(HostValue::Double(3.0))
        );
    }

    #[test]
    fn chars_accept_single_character_strings() {
        let host = InMemoryHost::new();
        let char_type = TypeDescriptor::Primitive(PrimitiveKind::Char);
        assert_eq!(coerce(&host, &Value::str("x"), &char_type), Ok(HostValue::Char('x')));
        assert_eq!(coerce(&host, &Value::Int(65), &char_type), Ok(HostValue::Char('A')));
        assert!(coerce(&host, &Value::str("xy"), &char_type).is_err());
    }

    #[test]
    fn object_targets_box_scalars() {
        let host = InMemoryHost::new();
        let boxed = coerce(&host, &Value::Int(1 << 40), &TypeDescriptor::object())
            .expect("box long");
        let handle = boxed.as_handle().expect("handle");
        assert_eq!(
            host.class_of(handle).expect("class"),
            TypeDescriptor::class("java.lang.Long")
        );
        let text = coerce(&host, &Value::str("hi"), &TypeDescriptor::object()).expect("string");
        let handle = text.as_handle().expect("handle");
        assert_eq!(host.read_string(handle).expect("read"), Some("hi".to_string()));
    }

    #[test]
    fn foreign_handles_need_instance_of_target() {
        let host = InMemoryHost::new();
        let handle = host.new_string("abc").expect("string");
        assert_eq!(
            coerce(&host, &Value::Handle(handle), &TypeDescriptor::object()),
            Ok(HostValue::Object(handle))
        );
        match coerce(&host, &Value::Handle(handle), &TypeDescriptor::class("java.lang.Integer")) {
            Err(CoercionError::IncompatibleForeignType { actual, target }) => {
                assert_eq!(actual, "java.lang.String");
                assert_eq!(target, "java.lang.Integer");
            }
            other => panic!("unexpected coercion: {other:?}"),
        }
    }

    #[test]
    fn sequences_need_array_targets() {
        let host = InMemoryHost::new();
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert!(matches!(
            coerce(&host, &list, &int()),
            Err(CoercionError::NotAnArrayTarget { .. })
        ));
        let ints = TypeDescriptor::array_of(int());
        let array = coerce(&host, &list, &ints).expect("int array");
        let handle = array.as_handle().expect("handle");
        assert_eq!(host.class_of(handle).expect("class"), ints);
    }

    #[test]
    fn first_element_decides_array_compatibility() {
        let host = InMemoryHost::new();
        let ints = TypeDescriptor::array_of(int());
        let bad_first = Value::list(vec![Value::str("x"), Value::Int(2)]);
        assert_eq!(
            coerce(&host, &bad_first, &ints),
            Err(CoercionError::NoCoercionRule {
                signature: "I".to_string()
            })
        );
        let bad_later = Value::list(vec![Value::Int(1), Value::str("x")]);
        assert_eq!(
            coerce(&host, &bad_later, &ints),
            Err(CoercionError::NoCoercionRule {
                signature: "[I".to_string()
            })
        );
    }

    #[test]
    fn unsupported_values_have_no_rule() {
        let host = InMemoryHost::new();
        let target = TypeDescriptor::class("java.util.List");
        assert_eq!(
            coerce(&host, &Value::Int(1), &target),
            Err(CoercionError::NoCoercionRule {
                signature: "Ljava/util/List;".to_string()
            })
        );
    }
}

//=====================================================
// End of file
//=====================================================
