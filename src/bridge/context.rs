//=====================================================
// File: bridge/context.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Context marshalling between host bindings and script namespaces
// Objective: Turn host-side bindings into native script values, install the
//            proxy helper functions, and convert script results back
//=====================================================

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use super::proxy::{wrap_result, ForeignClass, ForeignObject};
use super::{signature, BridgeError, BridgeResult};
use crate::host::{HostValue, PrimitiveKind, SharedHost, TypeDescriptor};
use crate::script::errors::{ExceptionKind, ScriptError};
use crate::script::value::{Namespace, Value};

/// Host-side variable bindings handed to an engine with each request.
pub type Bindings = BTreeMap<String, HostValue>;

pub const OBJECT_WRAPPER: &str = "JWrapper";
pub const CLASS_WRAPPER: &str = "JClassWrapper";
pub const IMPORT_CLASS: &str = "importClass";

/// Copy `bindings` into `namespace` as native values and install the proxy helpers.
pub fn marshal(host: &SharedHost, bindings: &Bindings, namespace: &mut Namespace) -> BridgeResult<()> {
    for (name, value) in bindings {
        let native = to_native(host, *value)?;
        debug!(binding = %name, kind = native.type_name(), "marshalled context entry");
        namespace.insert(name.clone(), native);
    }
    install_helpers(host, namespace);
    Ok(())
}

/// Native view of one host value: strings and boxed primitives become native
/// scalars, every other reference becomes an object proxy.
pub fn to_native(host: &SharedHost, value: HostValue) -> BridgeResult<Value> {
    let HostValue::Object(handle) = value else {
        let declared = value
            .primitive_kind()
            .map(TypeDescriptor::Primitive)
            .unwrap_or_else(TypeDescriptor::object);
        return wrap_result(host, value, &declared);
    };
    if let Some(text) = host.read_string(handle)? {
        return Ok(Value::str(text));
    }
    let class = host.class_of(handle)?;
    if let Some(kind) = boxed_kind(&class) {
        let primitive = TypeDescriptor::Primitive(kind);
        let unboxed = host.call_method(
            handle,
            &format!("{}Value", kind.name()),
            &signature::method_signature(&[], &primitive),
            &[],
        )?;
        return wrap_result(host, unboxed, &primitive);
    }
    Ok(Value::Foreign(Rc::new(ForeignObject::new(host.clone(), handle)?)))
}

fn boxed_kind(class: &TypeDescriptor) -> Option<PrimitiveKind> {
    let name = class.class_name()?;
    PrimitiveKind::ALL
        .into_iter()
        .find(|kind| kind.boxed_class() == Some(name))
}

/// Host value for a script result.
pub fn to_host(host: &SharedHost, value: &Value) -> BridgeResult<HostValue> {
    Ok(match value {
        Value::None => HostValue::Null,
        Value::Bool(b) => HostValue::Boolean(*b),
        Value::Int(n) => match i32::try_from(*n) {
            Ok(small) => HostValue::Int(small),
            Err(_) => HostValue::Long(*n),
        },
        Value::Float(x) => HostValue::Double(*x),
        Value::Str(text) => HostValue::Object(host.new_string(text)?),
        Value::Handle(handle) => HostValue::Object(*handle),
        Value::Foreign(object) => HostValue::Object(object.handle()),
        Value::ForeignClass(class) => HostValue::Object(host.new_string(&class.class().display_name())?),
        Value::List(items) => {
            let items = items.borrow().clone();
            object_array(host, &items)?
        }
        Value::Tuple(items) => object_array(host, items)?,
        other => HostValue::Object(host.new_string(&other.to_string())?),
    })
}

fn object_array(host: &SharedHost, items: &[Value]) -> BridgeResult<HostValue> {
    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        let element = match to_host(host, item)? {
            HostValue::Null => HostValue::Null,
            HostValue::Object(handle) => HostValue::Object(handle),
            primitive => HostValue::Object(host.box_value(primitive)?),
        };
        elements.push(element);
    }
    Ok(HostValue::Object(host.new_array(&TypeDescriptor::object(), elements)?))
}

fn install_helpers(host: &SharedHost, namespace: &mut Namespace) {
    let object_host = host.clone();
    namespace.insert(
        OBJECT_WRAPPER.to_string(),
        Value::native(OBJECT_WRAPPER, move |_, args, _| match args.as_slice() {
            [Value::Handle(handle)] => Ok(Value::Foreign(Rc::new(ForeignObject::new(
                object_host.clone(),
                *handle,
            )?))),
            [Value::Foreign(object)] => Ok(Value::Foreign(object.clone())),
            [other] => Err(BridgeError::InvalidArgument(format!(
                "{OBJECT_WRAPPER}() expects a foreign object, got {}",
                other.type_name()
            ))
            .into()),
            _ => Err(arity_error(OBJECT_WRAPPER, "exactly one argument", args.len())),
        }),
    );

    let class_host = host.clone();
    namespace.insert(
        CLASS_WRAPPER.to_string(),
        Value::native(CLASS_WRAPPER, move |_, args, _| match args.as_slice() {
            [Value::Str(name)] => Ok(Value::ForeignClass(Rc::new(ForeignClass::for_name(
                class_host.clone(),
                name,
            )?))),
            [Value::ForeignClass(class)] => Ok(Value::ForeignClass(class.clone())),
            [other] => Err(BridgeError::InvalidArgument(format!(
                "{CLASS_WRAPPER}() expects a class name, got {}",
                other.type_name()
            ))
            .into()),
            _ => Err(arity_error(CLASS_WRAPPER, "exactly one argument", args.len())),
        }),
    );

    let import_host = host.clone();
    namespace.insert(
        IMPORT_CLASS.to_string(),
        Value::native(IMPORT_CLASS, move |interp, args, _| {
            let (name, alias) = match args.as_slice() {
                [Value::Str(name)] | [Value::Str(name), Value::None] => (name.clone(), None),
                [Value::Str(name), Value::Str(alias)] => (name.clone(), Some(alias.clone())),
                _ => {
                    return Err(ScriptError::raise(
                        ExceptionKind::TypeError,
                        format!("{IMPORT_CLASS}() expects a class name and an optional alias"),
                    ))
                }
            };
            let class = ForeignClass::for_name(import_host.clone(), &name)?;
            let binding = match alias {
                Some(alias) => alias.to_string(),
                None => class.class().simple_name(),
            };
            debug!(class = %name, binding = %binding, "imported foreign class");
            let value = Value::ForeignClass(Rc::new(class));
            interp.set_global(&binding, value.clone());
            Ok(value)
        }),
    );
}

fn arity_error(name: &str, expected: &str, got: usize) -> ScriptError {
    ScriptError::raise(
        ExceptionKind::TypeError,
        format!("{name}() takes {expected} ({got} given)"),
    )
}


//=====================================================
// End of file
//=====================================================
