//=====================================================
// File: bridge/proxy.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Reflective proxies for foreign objects and classes
// Objective: Introspect a foreign object or class once, then expose its
//            methods and fields by name through a uniform capability trait
//=====================================================

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use parking_lot::Mutex;
use tracing::debug;

use super::overload::{resolve, MethodTable};
use super::{coerce, signature, BridgeError, BridgeResult};
use crate::host::{
    FieldDescriptor, ForeignHandle, HostValue, MethodDescriptor, SharedHost, TypeDescriptor,
    STRING_CLASS,
};
use crate::script::value::Value;

/// Callable-by-name, gettable/settable-field-by-name surface shared by both proxies.
pub trait ForeignMembers {
    fn list_members(&self) -> Vec<String>;
    fn invoke(&self, name: &str, args: &[Value]) -> BridgeResult<Value>;
    fn get_field(&self, name: &str) -> BridgeResult<Value>;
    fn set_field(&self, name: &str, value: &Value) -> BridgeResult<()>;
}

/// Convert a host result into a script value, wrapping references in a new proxy.
///
/// Strings come back as native `str` when the declared type is `java.lang.String`.
pub fn wrap_result(
    host: &SharedHost,
    value: HostValue,
    declared: &TypeDescriptor,
) -> BridgeResult<Value> {
    Ok(match value {
        HostValue::Null => Value::None,
        HostValue::Boolean(b) => Value::Bool(b),
        HostValue::Byte(n) => Value::Int(n.into()),
        HostValue::Short(n) => Value::Int(n.into()),
        HostValue::Int(n) => Value::Int(n.into()),
        HostValue::Long(n) => Value::Int(n),
        HostValue::Float(x) => Value::Float(x.into()),
        HostValue::Double(x) => Value::Float(x),
        HostValue::Char(c) => Value::str(c.to_string()),
        HostValue::Object(handle) => {
            if declared.is_class(STRING_CLASS) {
                if let Some(text) = host.read_string(handle)? {
                    return Ok(Value::str(text));
                }
            }
            Value::Foreign(Rc::new(ForeignObject::new(host.clone(), handle)?))
        }
    })
}

/// Lazily resolved field descriptors, filtered by staticness.
struct FieldCache {
    want_static: bool,
    known: Mutex<HashMap<String, FieldDescriptor>>,
}

impl FieldCache {
    fn new(want_static: bool) -> Self {
        Self {
            want_static,
            known: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(
        &self,
        host: &SharedHost,
        class: &TypeDescriptor,
        name: &str,
    ) -> BridgeResult<FieldDescriptor> {
        if let Some(field) = self.known.lock().get(name) {
            return Ok(field.clone());
        }
        let field = host
            .field(class, name)?
            .filter(|field| field.is_static == self.want_static)
            .ok_or_else(|| BridgeError::no_such_member(class.display_name(), name))?;
        self.known.lock().insert(name.to_string(), field.clone());
        Ok(field)
    }
}

/// Proxy around one foreign object: instance methods and instance fields.
pub struct ForeignObject {
    host: SharedHost,
    handle: ForeignHandle,
    class: TypeDescriptor,
    methods: MethodTable,
    fields: FieldCache,
}

impl fmt::Debug for ForeignObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignObject")
            .field("handle", &self.handle)
            .field("class", &self.class)
            .field("methods", &self.methods.len())
            .finish()
    }
}

impl ForeignObject {
    pub fn new(host: SharedHost, handle: ForeignHandle) -> BridgeResult<Self> {
        let class = host.class_of(handle)?;
        let methods = MethodTable::from_methods(
            host.methods(&class)?
                .into_iter()
                .filter(|method| !method.is_static),
        );
        Ok(Self {
            host,
            handle,
            class,
            methods,
            fields: FieldCache::new(false),
        })
    }

    pub fn handle(&self) -> ForeignHandle {
        self.handle
    }

    pub fn class(&self) -> &TypeDescriptor {
        &self.class
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    pub fn describe(&self, name: &str) -> Option<String> {
        self.methods.describe(name)
    }

    pub fn to_display_string(&self) -> BridgeResult<String> {
        Ok(self.host.to_display_string(self.handle)?)
    }

    /// `str()` of the proxy; falls back to the class and handle when `toString` fails.
    pub fn display_string(&self) -> String {
        self.to_display_string()
            .unwrap_or_else(|_| format!("{}{}", self.class, self.handle))
    }

    pub fn repr(&self) -> String {
        format!("Instance of {}: {}", self.class, self.display_string())
    }
}

impl ForeignMembers for ForeignObject {
    fn list_members(&self) -> Vec<String> {
        let mut members: Vec<String> = self.methods.names().map(str::to_string).collect();
        if let Ok(fields) = self.host.fields(&self.class) {
            members.extend(
                fields
                    .into_iter()
                    .filter(|field| !field.is_static)
                    .map(|field| field.name),
            );
        }
        members
    }

    fn invoke(&self, name: &str, args: &[Value]) -> BridgeResult<Value> {
        let candidates = self
            .methods
            .get(name)
            .ok_or_else(|| BridgeError::no_such_member(self.class.display_name(), name))?;
        let host = self.host.as_ref();
        let resolved = resolve(name, args, candidates, |value, ty| coerce(host, value, ty))?;
        debug!(class = %self.class, method = name, signature = %resolved.signature, "invoking foreign method");
        let result = self
            .host
            .call_method(self.handle, name, &resolved.signature, &resolved.args)?;
        wrap_result(&self.host, result, &resolved.descriptor.return_type)
    }

    fn get_field(&self, name: &str) -> BridgeResult<Value> {
        let field = self.fields.lookup(&self.host, &self.class, name)?;
        let value = self.host.get_field(
            self.handle,
            name,
            &signature::encode(&field.field_type),
        )?;
        wrap_result(&self.host, value, &field.field_type)
    }

    fn set_field(&self, name: &str, value: &Value) -> BridgeResult<()> {
        let field = self.fields.lookup(&self.host, &self.class, name)?;
        let converted = coerce(self.host.as_ref(), value, &field.field_type)?;
        self.host.set_field(
            self.handle,
            name,
            &signature::encode(&field.field_type),
            converted,
        )?;
        Ok(())
    }
}

/// Proxy around a foreign class: static methods, static fields, and constructors.
pub struct ForeignClass {
    host: SharedHost,
    class: TypeDescriptor,
    methods: MethodTable,
    constructors: Vec<MethodDescriptor>,
    fields: FieldCache,
}

impl fmt::Debug for ForeignClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignClass")
            .field("class", &self.class)
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

impl ForeignClass {
    pub fn new(host: SharedHost, class: TypeDescriptor) -> BridgeResult<Self> {
        let methods = MethodTable::from_methods(
            host.methods(&class)?
                .into_iter()
                .filter(|method| method.is_static),
        );
        let constructors = host.constructors(&class)?;
        Ok(Self {
            host,
            class,
            methods,
            constructors,
            fields: FieldCache::new(true),
        })
    }

    /// Look up a class by its dotted name, e.g. `java.lang.Integer`.
    pub fn for_name(host: SharedHost, name: &str) -> BridgeResult<Self> {
        let class = host.class_for_name(name)?;
        Self::new(host, class)
    }

    pub fn class(&self) -> &TypeDescriptor {
        &self.class
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    pub fn describe(&self, name: &str) -> Option<String> {
        self.methods.describe(name)
    }

    pub fn constructors(&self) -> &[MethodDescriptor] {
        &self.constructors
    }

    pub fn construct(&self, args: &[Value]) -> BridgeResult<ForeignObject> {
        let host = self.host.as_ref();
        let name = format!("{} constructor", self.class);
        let resolved = resolve(&name, args, &self.constructors, |value, ty| {
            coerce(host, value, ty)
        })?;
        debug!(class = %self.class, signature = %resolved.signature, "constructing foreign object");
        let handle = self
            .host
            .construct(&self.class, &resolved.signature, &resolved.args)?;
        ForeignObject::new(self.host.clone(), handle)
    }
}

impl ForeignMembers for ForeignClass {
    fn list_members(&self) -> Vec<String> {
        let mut members: Vec<String> = self.methods.names().map(str::to_string).collect();
        if let Ok(fields) = self.host.fields(&self.class) {
            members.extend(
                fields
                    .into_iter()
                    .filter(|field| field.is_static)
                    .map(|field| field.name),
            );
        }
        members
    }

    fn invoke(&self, name: &str, args: &[Value]) -> BridgeResult<Value> {
        let candidates = self
            .methods
            .get(name)
            .ok_or_else(|| BridgeError::no_such_member(self.class.display_name(), name))?;
        let host = self.host.as_ref();
        let resolved = resolve(name, args, candidates, |value, ty| coerce(host, value, ty))?;
        debug!(class = %self.class, method = name, signature = %resolved.signature, "invoking static method");
        let result = self
            .host
            .call_static(&self.class, name, &resolved.signature, &resolved.args)?;
        wrap_result(&self.host, result, &resolved.descriptor.return_type)
    }

    fn get_field(&self, name: &str) -> BridgeResult<Value> {
        let field = self.fields.lookup(&self.host, &self.class, name)?;
        let value = self.host.get_static_field(
            &self.class,
            name,
            &signature::encode(&field.field_type),
        )?;
        wrap_result(&self.host, value, &field.field_type)
    }

    fn set_field(&self, name: &str, value: &Value) -> BridgeResult<()> {
        let field = self.fields.lookup(&self.host, &self.class, name)?;
        let converted = coerce(self.host.as_ref(), value, &field.field_type)?;
        self.host.set_static_field(
            &self.class,
            name,
            &signature::encode(&field.field_type),
            converted,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::CoercionError;
    use crate::host::{ClassBuilder, HostRuntime, InMemoryHost, PrimitiveKind};

    fn int() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Int)
    }

    fn host_with_counter() -> Arc<InMemoryHost> {
        let host = InMemoryHost::shared();
        ClassBuilder::new("demo.Counter")
            .field("count", int())
            .static_field("LIMIT", int(), HostValue::Int(10))
            .constructor(MethodDescriptor::constructor(vec![]), |_, _, _| Ok(()))
            .constructor(MethodDescriptor::constructor(vec![int()]), |host, this, args| {
                host.set_field(this, "count", "I", args[0])
            })
            .method(MethodDescriptor::new("bump", vec![], int()), |host, this, _| {
                let this = this.expect("receiver");
                let HostValue::Int(count) = host.get_field(this, "count", "I")? else {
                    unreachable!("count is an int field");
                };
                host.set_field(this, "count", "I", HostValue::Int(count + 1))?;
                Ok(HostValue::Int(count + 1))
            })
            .register(&host);
        host
    }

    #[test]
    fn constructs_and_invokes_through_overloads() {
        let host = host_with_counter();
        let shared: SharedHost = host.clone();
        let class = ForeignClass::for_name(shared, "demo.Counter").expect("class proxy");
        let counter = class.construct(&[Value::Int(4)]).expect("construct");
        match counter.invoke("bump", &[]).expect("bump") {
            Value::Int(5) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        match counter.get_field("count").expect("field") {
            Value::Int(5) => {}
            other => panic!("unexpected field: {other:?}"),
        }
    }

    #[test]
    fn static_and_instance_members_stay_separate() {
        let host = host_with_counter();
        let shared: SharedHost = host.clone();
        let class = ForeignClass::for_name(shared, "demo.Counter").expect("class proxy");
        let counter = class.construct(&[]).expect("construct");
        assert!(matches!(
            counter.get_field("LIMIT"),
            Err(BridgeError::NoSuchMember { .. })
        ));
        assert!(matches!(
            class.get_field("count"),
            Err(BridgeError::NoSuchMember { .. })
        ));
        match class.get_field("LIMIT").expect("static field") {
            Value::Int(10) => {}
            other => panic!("unexpected field: {other:?}"),
        }
        class.set_field("LIMIT", &Value::Int(12)).expect("set static");
        assert_eq!(
            host.get_static_field(class.class(), "LIMIT", "I").expect("read back"),
            HostValue::Int(12)
        );
    }

    #[test]
    fn unknown_names_and_bad_arguments_are_distinguished() {
        let host = host_with_counter();
        let shared: SharedHost = host.clone();
        let class = ForeignClass::for_name(shared, "demo.Counter").expect("class proxy");
        let counter = class.construct(&[]).expect("construct");
        assert!(matches!(
            counter.invoke("missing", &[]),
            Err(BridgeError::NoSuchMember { .. })
        ));
        assert!(matches!(
            counter.invoke("bump", &[Value::Int(1)]),
            Err(BridgeError::Coercion(CoercionError::NoMatchingOverload { .. }))
        ));
        assert!(matches!(
            counter.set_field("count", &Value::str("x")),
            Err(BridgeError::Coercion(CoercionError::NoCoercionRule { .. }))
        ));
    }

    #[test]
    fn string_results_come_back_native() {
        let host = InMemoryHost::shared();
        let shared: SharedHost = host.clone();
        let handle = host.new_string("abc").expect("string");
        let text = ForeignObject::new(shared, handle).expect("proxy");
        match text.invoke("toUpperCase", &[]).expect("upper") {
            Value::Str(s) => assert_eq!(&*s, "ABC"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(text.repr(), "Instance of java.lang.String: abc");
        assert!(text.list_members().iter().any(|name| name == "charAt"));
    }

    #[test]
    fn describe_lists_each_overload() {
        let host: SharedHost = InMemoryHost::shared();
        let math = ForeignClass::for_name(host, "java.lang.Math").expect("math");
        let listing = math.describe("max").expect("max overloads");
        assert_eq!(listing.lines().count(), 3);
        assert!(listing.starts_with("static int max(int, int)"));
    }
}

//=====================================================
// End of file
//=====================================================
