//=====================================================
// File: host/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host runtime reflection facility
// Objective: Define the introspection and invocation surface the bridge
//            consumes from the host runtime, plus its error type
//=====================================================

pub mod memory;
pub mod types;

use std::sync::Arc;

use thiserror::Error;

pub use memory::{ClassBuilder, InMemoryHost};
pub use types::{
    FieldDescriptor, ForeignHandle, HostValue, MethodDescriptor, PrimitiveKind, TypeDescriptor,
    BOOLEAN_CLASS, BYTE_CLASS, CHARACTER_CLASS, CONSTRUCTOR_NAME, DOUBLE_CLASS, FLOAT_CLASS,
    INTEGER_CLASS, LONG_CLASS, OBJECT_CLASS, SHORT_CLASS, STRING_CLASS,
};

/// Failures reported by the host runtime itself.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("invalid foreign handle {0}")]
    InvalidHandle(ForeignHandle),
    #[error("no method {name}{signature} on {owner}")]
    NoSuchMethod {
        owner: String,
        name: String,
        signature: String,
    },
    #[error("no field {name} on {owner}")]
    NoSuchField { owner: String, name: String },
    #[error("{class}: {message}")]
    Invocation { class: String, message: String },
    #[error("thread attach failed: {0}")]
    ThreadAttach(String),
}

impl HostError {
    pub fn invocation(class: impl Into<String>, message: impl Into<String>) -> Self {
        HostError::Invocation {
            class: class.into(),
            message: message.into(),
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Reflection and invocation facility of the host runtime.
///
/// Everything the bridge knows about foreign objects flows through this trait:
/// type lookup and instance checks, member enumeration, and the generic
/// invoke/construct/field operations keyed by a wire signature.
pub trait HostRuntime: Send + Sync {
    fn class_for_name(&self, name: &str) -> HostResult<TypeDescriptor>;
    fn class_of(&self, handle: ForeignHandle) -> HostResult<TypeDescriptor>;
    fn is_instance(&self, ty: &TypeDescriptor, handle: ForeignHandle) -> bool;
    fn is_assignable(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> bool;

    /// Public methods, static and instance, in introspection discovery order.
    fn methods(&self, ty: &TypeDescriptor) -> HostResult<Vec<MethodDescriptor>>;
    fn constructors(&self, ty: &TypeDescriptor) -> HostResult<Vec<MethodDescriptor>>;
    fn field(&self, ty: &TypeDescriptor, name: &str) -> HostResult<Option<FieldDescriptor>>;
    fn fields(&self, ty: &TypeDescriptor) -> HostResult<Vec<FieldDescriptor>>;

    fn call_method(
        &self,
        target: ForeignHandle,
        name: &str,
        signature: &str,
        args: &[HostValue],
    ) -> HostResult<HostValue>;
    fn call_static(
        &self,
        class: &TypeDescriptor,
        name: &str,
        signature: &str,
        args: &[HostValue],
    ) -> HostResult<HostValue>;
    fn construct(
        &self,
        class: &TypeDescriptor,
        signature: &str,
        args: &[HostValue],
    ) -> HostResult<ForeignHandle>;

    fn get_field(&self, target: ForeignHandle, name: &str, signature: &str)
        -> HostResult<HostValue>;
    fn set_field(
        &self,
        target: ForeignHandle,
        name: &str,
        signature: &str,
        value: HostValue,
    ) -> HostResult<()>;
    fn get_static_field(
        &self,
        class: &TypeDescriptor,
        name: &str,
        signature: &str,
    ) -> HostResult<HostValue>;
    fn set_static_field(
        &self,
        class: &TypeDescriptor,
        name: &str,
        signature: &str,
        value: HostValue,
    ) -> HostResult<()>;

    fn new_string(&self, value: &str) -> HostResult<ForeignHandle>;
    /// Native contents of a foreign string, `None` when the handle is not a string.
    fn read_string(&self, handle: ForeignHandle) -> HostResult<Option<String>>;
    fn new_array(
        &self,
        component: &TypeDescriptor,
        elements: Vec<HostValue>,
    ) -> HostResult<ForeignHandle>;
    fn box_value(&self, value: HostValue) -> HostResult<ForeignHandle>;
    fn to_display_string(&self, handle: ForeignHandle) -> HostResult<String>;

    /// Bind the calling thread to the host's thread-local execution context.
    fn attach_current_thread(&self) -> HostResult<()>;
    fn detach_current_thread(&self);
}

pub type SharedHost = Arc<dyn HostRuntime>;

//=====================================================
// End of file
//=====================================================
