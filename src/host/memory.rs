//=====================================================
// File: host/memory.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: In-process reference host runtime
// Objective: Provide a class registry, an object slot table, and the core
//            java.lang / java.util classes so the bridge can run without a VM
//=====================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};

use super::types::{
    FieldDescriptor, ForeignHandle, HostValue, MethodDescriptor, PrimitiveKind, TypeDescriptor,
    BOOLEAN_CLASS, BYTE_CLASS, CHARACTER_CLASS, DOUBLE_CLASS, FLOAT_CLASS, INTEGER_CLASS,
    LONG_CLASS, OBJECT_CLASS, SHORT_CLASS, STRING_CLASS,
};
use super::{HostError, HostResult, HostRuntime};
use crate::bridge::signature;

const CLASS_CLASS: &str = "java.lang.Class";

pub type MethodBody =
    Arc<dyn Fn(&InMemoryHost, Option<ForeignHandle>, &[HostValue]) -> HostResult<HostValue> + Send + Sync>;
pub type ConstructorBody =
    Arc<dyn Fn(&InMemoryHost, ForeignHandle, &[HostValue]) -> HostResult<()> + Send + Sync>;

/// Payload stored behind a foreign handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    Plain(HashMap<String, HostValue>),
    Text(String),
    Boxed(HostValue),
    Array(Vec<HostValue>),
    List(Vec<HostValue>),
}

/// Storage layout used for fresh instances of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceLayout {
    Plain,
    Text,
    List,
}

#[derive(Clone)]
struct MethodEntry {
    descriptor: MethodDescriptor,
    signature: String,
    body: MethodBody,
}

#[derive(Clone)]
struct ConstructorEntry {
    descriptor: MethodDescriptor,
    signature: String,
    body: ConstructorBody,
}

struct ClassDef {
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    layout: InstanceLayout,
    methods: Vec<MethodEntry>,
    constructors: Vec<ConstructorEntry>,
    fields: Vec<FieldDescriptor>,
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("superclass", &self.superclass)
            .field("methods", &self.methods.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

#[derive(Debug)]
struct Slot {
    class: TypeDescriptor,
    data: ObjectData,
}

#[derive(Debug, Default)]
struct SlotTable {
    slots: Vec<Option<Slot>>,
    live: usize,
}

/// Declarative builder for classes registered with an [`InMemoryHost`].
///
/// Methods and constructors keep the order they were declared in, which is the
/// order introspection reports them.
pub struct ClassBuilder {
    def: ClassDef,
    statics: Vec<(String, HostValue)>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: ClassDef {
                name: name.into(),
                superclass: Some(OBJECT_CLASS.to_string()),
                interfaces: Vec::new(),
                layout: InstanceLayout::Plain,
                methods: Vec::new(),
                constructors: Vec::new(),
                fields: Vec::new(),
            },
            statics: Vec::new(),
        }
    }

    /// Root classes have no superclass at all.
    pub fn root(mut self) -> Self {
        self.def.superclass = None;
        self
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.def.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.def.interfaces.push(interface.into());
        self
    }

    pub fn layout(mut self, layout: InstanceLayout) -> Self {
        self.def.layout = layout;
        self
    }

    pub fn method<F>(mut self, descriptor: MethodDescriptor, body: F) -> Self
    where
        F: Fn(&InMemoryHost, Option<ForeignHandle>, &[HostValue]) -> HostResult<HostValue>
            + Send
            + Sync
            + 'static,
    {
        let signature = signature::method_signature(&descriptor.params, &descriptor.return_type);
        self.def.methods.push(MethodEntry {
            descriptor,
            signature,
            body: Arc::new(body),
        });
        self
    }

    pub fn constructor<F>(mut self, descriptor: MethodDescriptor, body: F) -> Self
    where
        F: Fn(&InMemoryHost, ForeignHandle, &[HostValue]) -> HostResult<()> + Send + Sync + 'static,
    {
        let signature = signature::method_signature(&descriptor.params, &TypeDescriptor::void());
        self.def.constructors.push(ConstructorEntry {
            descriptor,
            signature,
            body: Arc::new(body),
        });
        self
    }

    pub fn field(mut self, name: impl Into<String>, field_type: TypeDescriptor) -> Self {
        self.def
            .fields
            .push(FieldDescriptor::new(name, field_type, false));
        self
    }

    pub fn static_field(
        mut self,
        name: impl Into<String>,
        field_type: TypeDescriptor,
        value: HostValue,
    ) -> Self {
        let name = name.into();
        self.def
            .fields
            .push(FieldDescriptor::new(name.clone(), field_type, true));
        self.statics.push((name, value));
        self
    }

    pub fn register(self, host: &InMemoryHost) -> TypeDescriptor {
        host.register_class(self)
    }
}

/// Reference [`HostRuntime`] living entirely in process memory.
pub struct InMemoryHost {
    classes: RwLock<HashMap<String, Arc<ClassDef>>>,
    statics: Mutex<HashMap<(String, String), HostValue>>,
    objects: Mutex<SlotTable>,
    attached: Mutex<HashMap<ThreadId, usize>>,
    attach_events: AtomicUsize,
    detach_events: AtomicUsize,
}

impl fmt::Debug for InMemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryHost")
            .field("classes", &self.classes.read().len())
            .field("live_objects", &self.objects.lock().live)
            .finish()
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHost {
    /// Host with the core `java.lang` and `java.util` classes registered.
    pub fn new() -> Self {
        let host = Self::empty();
        install_core_classes(&host);
        host
    }

    /// Host with no classes at all, not even `java.lang.Object`.
    pub fn empty() -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            statics: Mutex::new(HashMap::new()),
            objects: Mutex::new(SlotTable::default()),
            attached: Mutex::new(HashMap::new()),
            attach_events: AtomicUsize::new(0),
            detach_events: AtomicUsize::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn register_class(&self, builder: ClassBuilder) -> TypeDescriptor {
        let ClassBuilder { def, statics } = builder;
        let name = def.name.clone();
        {
            let mut table = self.statics.lock();
            for (field, value) in statics {
                table.insert((name.clone(), field), value);
            }
        }
        self.classes.write().insert(name.clone(), Arc::new(def));
        TypeDescriptor::Class(name)
    }

    fn class_def(&self, name: &str) -> HostResult<Arc<ClassDef>> {
        self.classes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::ClassNotFound(name.to_string()))
    }

    /// Class followed by its superclasses, nearest first.
    fn lineage(&self, name: &str) -> HostResult<Vec<Arc<ClassDef>>> {
        let mut chain = Vec::new();
        let mut current = Some(name.to_string());
        while let Some(class_name) = current {
            let def = self.class_def(&class_name)?;
            current = def.superclass.clone().filter(|parent| parent != &def.name);
            chain.push(def);
        }
        Ok(chain)
    }

    /// Class used for member lookup: arrays and interfaces fall back to Object.
    fn member_class(&self, ty: &TypeDescriptor) -> Option<String> {
        match ty {
            TypeDescriptor::Class(name) => Some(name.clone()),
            TypeDescriptor::Array(_) => Some(OBJECT_CLASS.to_string()),
            TypeDescriptor::Primitive(_) => None,
        }
    }

    pub fn allocate(&self, class: TypeDescriptor, data: ObjectData) -> ForeignHandle {
        let mut table = self.objects.lock();
        let slot = Slot { class, data };
        let index = match table.slots.iter().position(Option::is_none) {
            Some(index) => {
                table.slots[index] = Some(slot);
                index
            }
            None => {
                table.slots.push(Some(slot));
                table.slots.len() - 1
            }
        };
        table.live += 1;
        ForeignHandle::from_raw(index as u64)
    }

    /// Drop the object behind `handle`; the id may be reused afterwards.
    pub fn release(&self, handle: ForeignHandle) -> bool {
        let mut table = self.objects.lock();
        match table.slots.get_mut(handle.raw() as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                table.live -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn live_objects(&self) -> usize {
        self.objects.lock().live
    }

    pub fn data(&self, handle: ForeignHandle) -> HostResult<ObjectData> {
        self.with_data(handle, |data| data.clone())
    }

    pub fn with_data<R>(
        &self,
        handle: ForeignHandle,
        f: impl FnOnce(&mut ObjectData) -> R,
    ) -> HostResult<R> {
        let mut table = self.objects.lock();
        match table.slots.get_mut(handle.raw() as usize) {
            Some(Some(slot)) => Ok(f(&mut slot.data)),
            _ => Err(HostError::InvalidHandle(handle)),
        }
    }

    fn slot_class(&self, handle: ForeignHandle) -> HostResult<TypeDescriptor> {
        let table = self.objects.lock();
        match table.slots.get(handle.raw() as usize) {
            Some(Some(slot)) => Ok(slot.class.clone()),
            _ => Err(HostError::InvalidHandle(handle)),
        }
    }

    /// Number of threads currently attached.
    pub fn attached_threads(&self) -> usize {
        self.attached.lock().len()
    }

    pub fn attach_events(&self) -> usize {
        self.attach_events.load(Ordering::SeqCst)
    }

    pub fn detach_events(&self) -> usize {
        self.detach_events.load(Ordering::SeqCst)
    }

    fn find_method(
        &self,
        class_name: &str,
        name: &str,
        signature: &str,
    ) -> HostResult<MethodEntry> {
        for def in self.lineage(class_name)? {
            if let Some(entry) = def
                .methods
                .iter()
                .find(|entry| entry.descriptor.name == name && entry.signature == signature)
            {
                return Ok(entry.clone());
            }
        }
        Err(HostError::NoSuchMethod {
            owner: class_name.to_string(),
            name: name.to_string(),
            signature: signature.to_string(),
        })
    }

    fn find_field(&self, class_name: &str, name: &str) -> HostResult<Option<FieldDescriptor>> {
        for def in self.lineage(class_name)? {
            if let Some(field) = def.fields.iter().find(|field| field.name == name) {
                return Ok(Some(field.clone()));
            }
        }
        Ok(None)
    }

    fn initial_data(&self, class_name: &str) -> HostResult<ObjectData> {
        let lineage = self.lineage(class_name)?;
        let layout = lineage
            .iter()
            .map(|def| def.layout)
            .find(|layout| *layout != InstanceLayout::Plain)
            .unwrap_or(InstanceLayout::Plain);
        Ok(match layout {
            InstanceLayout::Text => ObjectData::Text(String::new()),
            InstanceLayout::List => ObjectData::List(Vec::new()),
            InstanceLayout::Plain => {
                let mut fields = HashMap::new();
                for def in &lineage {
                    for field in def.fields.iter().filter(|field| !field.is_static) {
                        fields
                            .entry(field.name.clone())
                            .or_insert_with(|| default_value(&field.field_type));
                    }
                }
                ObjectData::Plain(fields)
            }
        })
    }

    fn default_display(&self, handle: ForeignHandle) -> HostResult<String> {
        let class = self.slot_class(handle)?;
        let data = self.data(handle)?;
        Ok(match data {
            ObjectData::Text(text) => text,
            ObjectData::Boxed(value) => value.to_string(),
            ObjectData::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.element_display(item)?);
                }
                format!("[{}]", parts.join(", "))
            }
            ObjectData::Array(_) => {
                format!("{}@{:x}", signature::encode(&class), handle.raw())
            }
            ObjectData::Plain(_) => format!("{}@{:x}", class.display_name(), handle.raw()),
        })
    }

    fn element_display(&self, value: HostValue) -> HostResult<String> {
        match value {
            HostValue::Object(handle) => self.to_display_string(handle),
            other => Ok(other.to_string()),
        }
    }

    fn values_equal(&self, left: HostValue, right: HostValue) -> HostResult<bool> {
        match (left, right) {
            (HostValue::Object(a), HostValue::Object(b)) => {
                if a == b {
                    return Ok(true);
                }
                let (left, right) = (self.data(a)?, self.data(b)?);
                Ok(match (&left, &right) {
                    (ObjectData::Text(_), ObjectData::Text(_))
                    | (ObjectData::Boxed(_), ObjectData::Boxed(_)) => {
                        left == right && self.slot_class(a)? == self.slot_class(b)?
                    }
                    _ => false,
                })
            }
            (a, b) => Ok(a == b),
        }
    }

    pub fn string_arg(&self, args: &[HostValue], index: usize) -> HostResult<String> {
        match args.get(index) {
            Some(HostValue::Object(handle)) => self
                .read_string(*handle)?
                .ok_or_else(|| HostError::invocation("ClassCastException", "expected a string")),
            Some(HostValue::Null) => Err(HostError::invocation(
                "NullPointerException",
                "string argument is null",
            )),
            _ => Err(HostError::invocation(
                "IllegalArgumentException",
                format!("argument {index} is not a string"),
            )),
        }
    }

    pub fn string_value(&self, text: impl Into<String>) -> HostValue {
        HostValue::Object(self.allocate(TypeDescriptor::string(), ObjectData::Text(text.into())))
    }
}

fn default_value(ty: &TypeDescriptor) -> HostValue {
    match ty.primitive_kind() {
        Some(PrimitiveKind::Boolean) => HostValue::Boolean(false),
        Some(PrimitiveKind::Byte) => HostValue::Byte(0),
        Some(PrimitiveKind::Short) => HostValue::Short(0),
        Some(PrimitiveKind::Int) => HostValue::Int(0),
        Some(PrimitiveKind::Long) => HostValue::Long(0),
        Some(PrimitiveKind::Float) => HostValue::Float(0.0),
        Some(PrimitiveKind::Double) => HostValue::Double(0.0),
        Some(PrimitiveKind::Char) => HostValue::Char('\0'),
        Some(PrimitiveKind::Void) | None => HostValue::Null,
    }
}

/// Check a stored value against a declared type before it lands in a field or array.
fn check_store(host: &InMemoryHost, ty: &TypeDescriptor, value: HostValue) -> HostResult<()> {
    let ok = match (ty.primitive_kind(), value) {
        (Some(kind), value) => value.primitive_kind() == Some(kind),
        (None, HostValue::Null) => true,
        (None, HostValue::Object(handle)) => host.is_instance(ty, handle),
        (None, _) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(HostError::invocation(
            "ArrayStoreException",
            format!("{value} is not assignable to {ty}"),
        ))
    }
}

impl HostRuntime for InMemoryHost {
    fn class_for_name(&self, name: &str) -> HostResult<TypeDescriptor> {
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Ok(TypeDescriptor::Primitive(kind));
        }
        if let Some(component) = name.strip_suffix("[]") {
            return Ok(TypeDescriptor::array_of(self.class_for_name(component)?));
        }
        if name.starts_with('[') {
            return signature::decode(&name.replace('.', "/"))
                .map_err(|_| HostError::ClassNotFound(name.to_string()));
        }
        self.class_def(name)
            .map(|def| TypeDescriptor::Class(def.name.clone()))
    }

    fn class_of(&self, handle: ForeignHandle) -> HostResult<TypeDescriptor> {
        self.slot_class(handle)
    }

    fn is_instance(&self, ty: &TypeDescriptor, handle: ForeignHandle) -> bool {
        match self.slot_class(handle) {
            Ok(actual) => self.is_assignable(ty, &actual),
            Err(_) => false,
        }
    }

    fn is_assignable(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> bool {
        if target == source {
            return true;
        }
        match (target, source) {
            (TypeDescriptor::Primitive(_), _) | (_, TypeDescriptor::Primitive(_)) => false,
            (TypeDescriptor::Class(name), _) if name == OBJECT_CLASS => true,
            (TypeDescriptor::Array(target), TypeDescriptor::Array(source)) => {
                !target.is_primitive() && !source.is_primitive() && self.is_assignable(target, source)
            }
            (TypeDescriptor::Class(target), TypeDescriptor::Class(source)) => {
                let Ok(lineage) = self.lineage(source) else {
                    return false;
                };
                lineage.iter().any(|def| {
                    &def.name == target
                        || def.interfaces.iter().any(|interface| {
                            interface == target
                                || self.is_assignable(
                                    &TypeDescriptor::class(target.clone()),
                                    &TypeDescriptor::class(interface.clone()),
                                )
                        })
                })
            }
            _ => false,
        }
    }

    fn methods(&self, ty: &TypeDescriptor) -> HostResult<Vec<MethodDescriptor>> {
        let Some(class_name) = self.member_class(ty) else {
            return Ok(Vec::new());
        };
        let mut seen: Vec<(String, String)> = Vec::new();
        let mut methods = Vec::new();
        for def in self.lineage(&class_name)? {
            for entry in &def.methods {
                let key = (entry.descriptor.name.clone(), entry.signature.clone());
                if !seen.contains(&key) {
                    seen.push(key);
                    methods.push(entry.descriptor.clone());
                }
            }
        }
        Ok(methods)
    }

    fn constructors(&self, ty: &TypeDescriptor) -> HostResult<Vec<MethodDescriptor>> {
        match ty {
            TypeDescriptor::Class(name) => Ok(self
                .class_def(name)?
                .constructors
                .iter()
                .map(|entry| entry.descriptor.clone())
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn field(&self, ty: &TypeDescriptor, name: &str) -> HostResult<Option<FieldDescriptor>> {
        match self.member_class(ty) {
            Some(class_name) => self.find_field(&class_name, name),
            None => Ok(None),
        }
    }

    fn fields(&self, ty: &TypeDescriptor) -> HostResult<Vec<FieldDescriptor>> {
        let Some(class_name) = self.member_class(ty) else {
            return Ok(Vec::new());
        };
        let mut fields: Vec<FieldDescriptor> = Vec::new();
        for def in self.lineage(&class_name)? {
            for field in &def.fields {
                if !fields.iter().any(|known| known.name == field.name) {
                    fields.push(field.clone());
                }
            }
        }
        Ok(fields)
    }

    fn call_method(
        &self,
        target: ForeignHandle,
        name: &str,
        signature: &str,
        args: &[HostValue],
    ) -> HostResult<HostValue> {
        let class = self.slot_class(target)?;
        let class_name = self
            .member_class(&class)
            .unwrap_or_else(|| OBJECT_CLASS.to_string());
        let entry = self.find_method(&class_name, name, signature)?;
        if entry.descriptor.is_static {
            return (entry.body)(self, None, args);
        }
        (entry.body)(self, Some(target), args)
    }

    fn call_static(
        &self,
        class: &TypeDescriptor,
        name: &str,
        signature: &str,
        args: &[HostValue],
    ) -> HostResult<HostValue> {
        let class_name = self
            .member_class(class)
            .ok_or_else(|| HostError::ClassNotFound(class.display_name()))?;
        let entry = self.find_method(&class_name, name, signature)?;
        if !entry.descriptor.is_static {
            return Err(HostError::invocation(
                "IncompatibleClassChangeError",
                format!("{name} is not static"),
            ));
        }
        (entry.body)(self, None, args)
    }

    fn construct(
        &self,
        class: &TypeDescriptor,
        signature: &str,
        args: &[HostValue],
    ) -> HostResult<ForeignHandle> {
        let class_name = class
            .class_name()
            .ok_or_else(|| HostError::ClassNotFound(class.display_name()))?;
        let def = self.class_def(class_name)?;
        let entry = def
            .constructors
            .iter()
            .find(|entry| entry.signature == signature)
            .cloned()
            .ok_or_else(|| HostError::NoSuchMethod {
                owner: class_name.to_string(),
                name: "<init>".to_string(),
                signature: signature.to_string(),
            })?;
        let handle = self.allocate(class.clone(), self.initial_data(class_name)?);
        if let Err(err) = (entry.body)(self, handle, args) {
            self.release(handle);
            return Err(err);
        }
        Ok(handle)
    }

    fn get_field(
        &self,
        target: ForeignHandle,
        name: &str,
        _signature: &str,
    ) -> HostResult<HostValue> {
        let class = self.slot_class(target)?;
        let missing = || HostError::NoSuchField {
            owner: class.display_name(),
            name: name.to_string(),
        };
        self.with_data(target, |data| match data {
            ObjectData::Plain(fields) => fields.get(name).copied(),
            _ => None,
        })?
        .ok_or_else(missing)
    }

    fn set_field(
        &self,
        target: ForeignHandle,
        name: &str,
        _signature: &str,
        value: HostValue,
    ) -> HostResult<()> {
        let class = self.slot_class(target)?;
        let class_name = self
            .member_class(&class)
            .unwrap_or_else(|| OBJECT_CLASS.to_string());
        let field = self
            .find_field(&class_name, name)?
            .filter(|field| !field.is_static)
            .ok_or_else(|| HostError::NoSuchField {
                owner: class_name.clone(),
                name: name.to_string(),
            })?;
        check_store(self, &field.field_type, value)?;
        self.with_data(target, |data| {
            if let ObjectData::Plain(fields) = data {
                fields.insert(name.to_string(), value);
            }
        })
    }

    fn get_static_field(
        &self,
        class: &TypeDescriptor,
        name: &str,
        _signature: &str,
    ) -> HostResult<HostValue> {
        let class_name = self
            .member_class(class)
            .ok_or_else(|| HostError::ClassNotFound(class.display_name()))?;
        let statics = self.statics.lock();
        for def in self.lineage(&class_name)? {
            if let Some(value) = statics.get(&(def.name.clone(), name.to_string())) {
                return Ok(*value);
            }
        }
        Err(HostError::NoSuchField {
            owner: class_name,
            name: name.to_string(),
        })
    }

    fn set_static_field(
        &self,
        class: &TypeDescriptor,
        name: &str,
        _signature: &str,
        value: HostValue,
    ) -> HostResult<()> {
        let class_name = self
            .member_class(class)
            .ok_or_else(|| HostError::ClassNotFound(class.display_name()))?;
        for def in self.lineage(&class_name)? {
            if let Some(field) = def
                .fields
                .iter()
                .find(|field| field.name == name && field.is_static)
            {
                check_store(self, &field.field_type, value)?;
                self.statics
                    .lock()
                    .insert((def.name.clone(), name.to_string()), value);
                return Ok(());
            }
        }
        Err(HostError::NoSuchField {
            owner: class_name,
            name: name.to_string(),
        })
    }

    fn new_string(&self, value: &str) -> HostResult<ForeignHandle> {
        Ok(self.allocate(TypeDescriptor::string(), ObjectData::Text(value.to_string())))
    }

    fn read_string(&self, handle: ForeignHandle) -> HostResult<Option<String>> {
        if !self.slot_class(handle)?.is_class(STRING_CLASS) {
            return Ok(None);
        }
        self.with_data(handle, |data| match data {
            ObjectData::Text(text) => Some(text.clone()),
            _ => None,
        })
    }

    fn new_array(
        &self,
        component: &TypeDescriptor,
        elements: Vec<HostValue>,
    ) -> HostResult<ForeignHandle> {
        for element in &elements {
            check_store(self, component, *element)?;
        }
        Ok(self.allocate(
            TypeDescriptor::array_of(component.clone()),
            ObjectData::Array(elements),
        ))
    }

    fn box_value(&self, value: HostValue) -> HostResult<ForeignHandle> {
        match value {
            HostValue::Object(handle) => Ok(handle),
            HostValue::Null => Err(HostError::invocation(
                "NullPointerException",
                "cannot box null",
            )),
            primitive => {
                let class = primitive
                    .primitive_kind()
                    .and_then(PrimitiveKind::boxed_class)
                    .unwrap_or(OBJECT_CLASS);
                Ok(self.allocate(TypeDescriptor::class(class), ObjectData::Boxed(primitive)))
            }
        }
    }

    fn to_display_string(&self, handle: ForeignHandle) -> HostResult<String> {
        let signature = signature::method_signature(&[], &TypeDescriptor::string());
        match self.call_method(handle, "toString", &signature, &[])? {
            HostValue::Object(text) => Ok(self
                .read_string(text)?
                .unwrap_or_else(|| format!("object{text}"))),
            other => Ok(other.to_string()),
        }
    }

    fn attach_current_thread(&self) -> HostResult<()> {
        *self.attached.lock().entry(thread::current().id()).or_insert(0) += 1;
        self.attach_events.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn detach_current_thread(&self) {
        let id = thread::current().id();
        let mut attached = self.attached.lock();
        if let Some(count) = attached.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                attached.remove(&id);
            }
            self.detach_events.fetch_add(1, Ordering::SeqCst);
        }
    }
}

//=====================================================
// Core classes
//=====================================================

fn prim(kind: PrimitiveKind) -> TypeDescriptor {
    TypeDescriptor::Primitive(kind)
}

fn this_handle(this: Option<ForeignHandle>) -> HostResult<ForeignHandle> {
    this.ok_or_else(|| HostError::invocation("NullPointerException", "missing receiver"))
}

fn text_of(host: &InMemoryHost, this: Option<ForeignHandle>) -> HostResult<String> {
    let handle = this_handle(this)?;
    host.with_data(handle, |data| match data {
        ObjectData::Text(text) => Ok(text.clone()),
        _ => Err(HostError::invocation("ClassCastException", "not a text object")),
    })?
}

fn boxed_of(host: &InMemoryHost, this: Option<ForeignHandle>) -> HostResult<HostValue> {
    let handle = this_handle(this)?;
    host.with_data(handle, |data| match data {
        ObjectData::Boxed(value) => Ok(*value),
        _ => Err(HostError::invocation("ClassCastException", "not a boxed value")),
    })?
}

fn int_arg(args: &[HostValue], index: usize) -> HostResult<i64> {
    args.get(index)
        .and_then(HostValue::as_i64)
        .ok_or_else(|| HostError::invocation("IllegalArgumentException", "expected an integer"))
}

fn double_arg(args: &[HostValue], index: usize) -> HostResult<f64> {
    args.get(index)
        .and_then(HostValue::as_f64)
        .ok_or_else(|| HostError::invocation("IllegalArgumentException", "expected a number"))
}

fn install_core_classes(host: &InMemoryHost) {
    let string = TypeDescriptor::string;
    let object = TypeDescriptor::object;

    ClassBuilder::new(OBJECT_CLASS)
        .method(MethodDescriptor::new("toString", vec![], string()), |host, this, _| {
            let text = host.default_display(this_handle(this)?)?;
            Ok(host.string_value(text))
        })
        .method(
            MethodDescriptor::new("hashCode", vec![], prim(PrimitiveKind::Int)),
            |_, this, _| Ok(HostValue::Int(this_handle(this)?.raw() as i32)),
        )
        .method(
            MethodDescriptor::new("equals", vec![object()], prim(PrimitiveKind::Boolean)),
            |host, this, args| {
                let other = args.first().copied().unwrap_or(HostValue::Null);
                let equal = host.values_equal(HostValue::Object(this_handle(this)?), other)?;
                Ok(HostValue::Boolean(equal))
            },
        )
        .method(
            MethodDescriptor::new("getClass", vec![], TypeDescriptor::class(CLASS_CLASS)),
            |host, this, _| {
                let class = host.slot_class(this_handle(this)?)?;
                Ok(HostValue::Object(host.allocate(
                    TypeDescriptor::class(CLASS_CLASS),
                    ObjectData::Text(class.display_name()),
                )))
            },
        )
        .constructor(MethodDescriptor::constructor(vec![]), |_, _, _| Ok(()))
        .root()
        .register(host);

    ClassBuilder::new(CLASS_CLASS)
        .layout(InstanceLayout::Text)
        .method(MethodDescriptor::new("getName", vec![], string()), |host, this, _| {
            Ok(host.string_value(text_of(host, this)?))
        })
        .method(MethodDescriptor::new("toString", vec![], string()), |host, this, _| {
            Ok(host.string_value(format!("class {}", text_of(host, this)?)))
        })
        .register(host);

    ClassBuilder::new("java.lang.CharSequence").register(host);
    ClassBuilder::new("java.util.Collection").register(host);
    ClassBuilder::new("java.util.List")
        .implements("java.util.Collection")
        .register(host);

    ClassBuilder::new(STRING_CLASS)
        .implements("java.lang.CharSequence")
        .layout(InstanceLayout::Text)
        .constructor(MethodDescriptor::constructor(vec![]), |_, _, _| Ok(()))
        .constructor(MethodDescriptor::constructor(vec![string()]), |host, this, args| {
            let text = host.string_arg(args, 0)?;
            host.with_data(this, |data| *data = ObjectData::Text(text))
        })
        .method(MethodDescriptor::new("toString", vec![], string()), |host, this, _| {
            Ok(host.string_value(text_of(host, this)?))
        })
        .method(
            MethodDescriptor::new("length", vec![], prim(PrimitiveKind::Int)),
            |host, this, _| Ok(HostValue::Int(text_of(host, this)?.chars().count() as i32)),
        )
        .method(
            MethodDescriptor::new("isEmpty", vec![], prim(PrimitiveKind::Boolean)),
            |host, this, _| Ok(HostValue::Boolean(text_of(host, this)?.is_empty())),
        )
        .method(MethodDescriptor::new("toUpperCase", vec![], string()), |host, this, _| {
            Ok(host.string_value(text_of(host, this)?.to_uppercase()))
        })
        .method(
            MethodDescriptor::new("concat", vec![string()], string()),
            |host, this, args| {
                let mut text = text_of(host, this)?;
                text.push_str(&host.string_arg(args, 0)?);
                Ok(host.string_value(text))
            },
        )
        .method(
            MethodDescriptor::new(
                "charAt",
                vec![prim(PrimitiveKind::Int)],
                prim(PrimitiveKind::Char),
            ),
            |host, this, args| {
                let index = int_arg(args, 0)?;
                text_of(host, this)?
                    .chars()
                    .nth(index.max(0) as usize)
                    .filter(|_| index >= 0)
                    .map(HostValue::Char)
                    .ok_or_else(|| {
                        HostError::invocation(
                            "StringIndexOutOfBoundsException",
                            format!("index {index} out of range"),
                        )
                    })
            },
        )
        .method(
            MethodDescriptor::new("valueOf", vec![object()], string()).with_static(),
            |host, _, args| {
                let text = match args.first().copied().unwrap_or(HostValue::Null) {
                    HostValue::Object(handle) => host.to_display_string(handle)?,
                    other => other.to_string(),
                };
                Ok(host.string_value(text))
            },
        )
        .register(host);

    install_boxed_classes(host);

    ClassBuilder::new("java.lang.Math")
        .static_field("PI", prim(PrimitiveKind::Double), HostValue::Double(std::f64::consts::PI))
        .method(
            MethodDescriptor::new(
                "max",
                vec![prim(PrimitiveKind::Int), prim(PrimitiveKind::Int)],
                prim(PrimitiveKind::Int),
            )
            .with_static(),
            |_, _, args| Ok(HostValue::Int(int_arg(args, 0)?.max(int_arg(args, 1)?) as i32)),
        )
        .method(
            MethodDescriptor::new(
                "max",
                vec![prim(PrimitiveKind::Long), prim(PrimitiveKind::Long)],
                prim(PrimitiveKind::Long),
            )
            .with_static(),
            |_, _, args| Ok(HostValue::Long(int_arg(args, 0)?.max(int_arg(args, 1)?))),
        )
        .method(
            MethodDescriptor::new(
                "max",
                vec![prim(PrimitiveKind::Double), prim(PrimitiveKind::Double)],
                prim(PrimitiveKind::Double),
            )
            .with_static(),
            |_, _, args| Ok(HostValue::Double(double_arg(args, 0)?.max(double_arg(args, 1)?))),
        )
        .method(
            MethodDescriptor::new("abs", vec![prim(PrimitiveKind::Int)], prim(PrimitiveKind::Int))
                .with_static(),
            |_, _, args| Ok(HostValue::Int(int_arg(args, 0)?.abs() as i32)),
        )
        .method(
            MethodDescriptor::new(
                "abs",
                vec![prim(PrimitiveKind::Double)],
                prim(PrimitiveKind::Double),
            )
            .with_static(),
            |_, _, args| Ok(HostValue::Double(double_arg(args, 0)?.abs())),
        )
        .register(host);

    let builder = TypeDescriptor::class("java.lang.StringBuilder");
    let append = |ty: TypeDescriptor| MethodDescriptor::new("append", vec![ty], builder.clone());
    ClassBuilder::new("java.lang.StringBuilder")
        .implements("java.lang.CharSequence")
        .layout(InstanceLayout::Text)
        .constructor(MethodDescriptor::constructor(vec![]), |_, _, _| Ok(()))
        .constructor(MethodDescriptor::constructor(vec![string()]), |host, this, args| {
            let text = host.string_arg(args, 0)?;
            host.with_data(this, |data| *data = ObjectData::Text(text))
        })
        .method(append(string()), |host, this, args| {
            let piece = host.string_arg(args, 0)?;
            append_text(host, this, &piece)
        })
        .method(append(prim(PrimitiveKind::Int)), |host, this, args| {
            append_text(host, this, &int_arg(args, 0)?.to_string())
        })
        .method(append(prim(PrimitiveKind::Double)), |host, this, args| {
            append_text(host, this, &double_arg(args, 0)?.to_string())
        })
        .method(append(object()), |host, this, args| {
            let piece = match args.first().copied().unwrap_or(HostValue::Null) {
                HostValue::Object(handle) => host.to_display_string(handle)?,
                other => other.to_string(),
            };
            append_text(host, this, &piece)
        })
        .method(
            MethodDescriptor::new("length", vec![], prim(PrimitiveKind::Int)),
            |host, this, _| Ok(HostValue::Int(text_of(host, this)?.chars().count() as i32)),
        )
        .method(MethodDescriptor::new("toString", vec![], string()), |host, this, _| {
            Ok(host.string_value(text_of(host, this)?))
        })
        .register(host);

    let list_class = TypeDescriptor::class("java.util.ArrayList");
    ClassBuilder::new("java.util.ArrayList")
        .implements("java.util.List")
        .layout(InstanceLayout::List)
        .constructor(MethodDescriptor::constructor(vec![]), |_, _, _| Ok(()))
        .method(
            MethodDescriptor::new("add", vec![object()], prim(PrimitiveKind::Boolean)),
            |host, this, args| {
                let item = args.first().copied().unwrap_or(HostValue::Null);
                host.with_data(this_handle(this)?, |data| {
                    if let ObjectData::List(items) = data {
                        items.push(item);
                    }
                })?;
                Ok(HostValue::Boolean(true))
            },
        )
        .method(
            MethodDescriptor::new("get", vec![prim(PrimitiveKind::Int)], object()),
            |host, this, args| {
                let index = int_arg(args, 0)?;
                host.with_data(this_handle(this)?, |data| match data {
                    ObjectData::List(items) if index >= 0 => items.get(index as usize).copied(),
                    _ => None,
                })?
                .ok_or_else(|| {
                    HostError::invocation(
                        "IndexOutOfBoundsException",
                        format!("Index {index} out of bounds"),
                    )
                })
            },
        )
        .method(
            MethodDescriptor::new("size", vec![], prim(PrimitiveKind::Int)),
            |host, this, _| {
                let size = host.with_data(this_handle(this)?, |data| match data {
                    ObjectData::List(items) => items.len(),
                    _ => 0,
                })?;
                Ok(HostValue::Int(size as i32))
            },
        )
        .method(
            MethodDescriptor::new("isEmpty", vec![], prim(PrimitiveKind::Boolean)),
            |host, this, _| {
                let empty = host.with_data(this_handle(this)?, |data| match data {
                    ObjectData::List(items) => items.is_empty(),
                    _ => true,
                })?;
                Ok(HostValue::Boolean(empty))
            },
        )
        .register(host);

    ClassBuilder::new("java.util.Arrays")
        .method(
            MethodDescriptor::new(
                "asList",
                vec![TypeDescriptor::array_of(object())],
                TypeDescriptor::class("java.util.List"),
            )
            .with_static()
            .with_var_args(),
            move |host, _, args| {
                let items = match args.first().copied() {
                    Some(HostValue::Object(array)) => match host.data(array)? {
                        ObjectData::Array(items) => items,
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                };
                Ok(HostValue::Object(
                    host.allocate(list_class.clone(), ObjectData::List(items)),
                ))
            },
        )
        .register(host);
}

fn append_text(
    host: &InMemoryHost,
    this: Option<ForeignHandle>,
    piece: &str,
) -> HostResult<HostValue> {
    let handle = this_handle(this)?;
    host.with_data(handle, |data| {
        if let ObjectData::Text(text) = data {
            text.push_str(piece);
        }
    })?;
    Ok(HostValue::Object(handle))
}

fn install_boxed_classes(host: &InMemoryHost) {
    let number_views: [(&str, PrimitiveKind); 6] = [
        ("byteValue", PrimitiveKind::Byte),
        ("shortValue", PrimitiveKind::Short),
        ("intValue", PrimitiveKind::Int),
        ("longValue", PrimitiveKind::Long),
        ("floatValue", PrimitiveKind::Float),
        ("doubleValue", PrimitiveKind::Double),
    ];
    let mut number = ClassBuilder::new("java.lang.Number");
    for (name, kind) in number_views {
        number = number.method(MethodDescriptor::new(name, vec![], prim(kind)), move |host, this, _| {
            let value = boxed_of(host, this)?;
            Ok(narrow(value, kind))
        });
    }
    number.register(host);

    let numeric: [(&str, PrimitiveKind); 6] = [
        (BYTE_CLASS, PrimitiveKind::Byte),
        (SHORT_CLASS, PrimitiveKind::Short),
        (INTEGER_CLASS, PrimitiveKind::Int),
        (LONG_CLASS, PrimitiveKind::Long),
        (FLOAT_CLASS, PrimitiveKind::Float),
        (DOUBLE_CLASS, PrimitiveKind::Double),
    ];
    for (class, kind) in numeric {
        let mut builder = ClassBuilder::new(class)
            .extends("java.lang.Number")
            .method(MethodDescriptor::new("toString", vec![], TypeDescriptor::string()), |host, this, _| {
                Ok(host.string_value(boxed_of(host, this)?.to_string()))
            });
        builder = with_value_of(builder, class, kind);
        if kind == PrimitiveKind::Int {
            builder = builder
                .static_field("MAX_VALUE", prim(kind), HostValue::Int(i32::MAX))
                .static_field("MIN_VALUE", prim(kind), HostValue::Int(i32::MIN))
                .method(
                    MethodDescriptor::new(
                        "parseInt",
                        vec![TypeDescriptor::string()],
                        prim(PrimitiveKind::Int),
                    )
                    .with_static(),
                    |host, _, args| {
                        let text = host.string_arg(args, 0)?;
                        text.trim().parse::<i32>().map(HostValue::Int).map_err(|_| {
                            HostError::invocation(
                                "NumberFormatException",
                                format!("For input string: \"{text}\""),
                            )
                        })
                    },
                );
        }
        builder.register(host);
    }

    let boolean = ClassBuilder::new(BOOLEAN_CLASS)
        .method(
            MethodDescriptor::new("booleanValue", vec![], prim(PrimitiveKind::Boolean)),
            |host, this, _| boxed_of(host, this),
        )
        .method(MethodDescriptor::new("toString", vec![], TypeDescriptor::string()), |host, this, _| {
            Ok(host.string_value(boxed_of(host, this)?.to_string()))
        });
    with_value_of(boolean, BOOLEAN_CLASS, PrimitiveKind::Boolean).register(host);

    let character = ClassBuilder::new(CHARACTER_CLASS)
        .method(
            MethodDescriptor::new("charValue", vec![], prim(PrimitiveKind::Char)),
            |host, this, _| boxed_of(host, this),
        )
        .method(MethodDescriptor::new("toString", vec![], TypeDescriptor::string()), |host, this, _| {
            Ok(host.string_value(boxed_of(host, this)?.to_string()))
        });
    with_value_of(character, CHARACTER_CLASS, PrimitiveKind::Char).register(host);
}

fn with_value_of(builder: ClassBuilder, class: &'static str, kind: PrimitiveKind) -> ClassBuilder {
    builder.method(
        MethodDescriptor::new("valueOf", vec![prim(kind)], TypeDescriptor::class(class)).with_static(),
        move |host, _, args| {
            let value = args.first().copied().unwrap_or(HostValue::Null);
            Ok(HostValue::Object(host.box_value(narrow(value, kind))?))
        },
    )
}

/// Java-style primitive narrowing/widening between numeric kinds.
fn narrow(value: HostValue, kind: PrimitiveKind) -> HostValue {
    let as_int = value.as_i64().unwrap_or_else(|| value.as_f64().unwrap_or(0.0) as i64);
    let as_float = value.as_f64().unwrap_or(0.0);
    match kind {
        PrimitiveKind::Byte => HostValue::Byte(as_int as i8),
        PrimitiveKind::Short => HostValue::Short(as_int as i16),
        PrimitiveKind::Int => HostValue::Int(as_int as i32),
        PrimitiveKind::Long => HostValue::Long(as_int),
        PrimitiveKind::Float => HostValue::Float(as_float as f32),
        PrimitiveKind::Double => HostValue::Double(as_float),
        PrimitiveKind::Boolean | PrimitiveKind::Char | PrimitiveKind::Void => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_round_trip_through_slots() {
        let host = InMemoryHost::new();
        let handle = host.new_string("héllo").expect("string");
        assert_eq!(host.read_string(handle).expect("read"), Some("héllo".to_string()));
        assert!(host.is_instance(&TypeDescriptor::object(), handle));
        assert!(host.is_instance(&TypeDescriptor::class("java.lang.CharSequence"), handle));
    }

    #[test]
    fn released_slots_are_reused() {
        let host = InMemoryHost::new();
        let first = host.new_string("a").expect("string");
        assert!(host.release(first));
        let second = host.new_string("b").expect("string");
        assert_eq!(first, second);
        assert_eq!(host.live_objects(), 1);
    }

    #[test]
    fn boxed_integers_unbox_through_number_views() {
        let host = InMemoryHost::new();
        let boxed = host.box_value(HostValue::Int(41)).expect("box");
        let value = host
            .call_method(boxed, "longValue", "()J", &[])
            .expect("longValue");
        assert_eq!(value, HostValue::Long(41));
        assert!(host.is_instance(&TypeDescriptor::class("java.lang.Number"), boxed));
    }

    #[test]
    fn object_arrays_accept_subclasses() {
        let host = InMemoryHost::new();
        let text = host.string_value("x");
        let array = host
            .new_array(&TypeDescriptor::object(), vec![text, HostValue::Null])
            .expect("array");
        let object_array = TypeDescriptor::array_of(TypeDescriptor::object());
        assert!(host.is_instance(&object_array, array));
        let err = host
            .new_array(&TypeDescriptor::string(), vec![HostValue::Int(3)])
            .expect_err("int in String[]");
        assert!(matches!(err, HostError::Invocation { .. }));
    }

    #[test]
    fn attach_and_detach_are_counted_per_thread() {
        let host = InMemoryHost::new();
        host.attach_current_thread().expect("attach");
        assert_eq!(host.attached_threads(), 1);
        host.detach_current_thread();
        assert_eq!(host.attached_threads(), 0);
        assert_eq!((host.attach_events(), host.detach_events()), (1, 1));
    }
}

//=====================================================
// End of file
//=====================================================
