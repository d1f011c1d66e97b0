//=====================================================
// File: host/types.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Data model shared between the bridge and the host runtime
// Objective: Describe foreign handles, type descriptors, member descriptors,
//            and the values that cross the runtime boundary
//=====================================================

use std::fmt;

/// Opaque reference into the host runtime's object space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForeignHandle(u64);

impl ForeignHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ForeignHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive kinds understood by the wire signature alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Void,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Void,
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Char,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Char => "char",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Fully-qualified name of the boxed counterpart, if any.
    pub fn boxed_class(self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Void => None,
            PrimitiveKind::Boolean => Some(BOOLEAN_CLASS),
            PrimitiveKind::Byte => Some(BYTE_CLASS),
            PrimitiveKind::Short => Some(SHORT_CLASS),
            PrimitiveKind::Int => Some(INTEGER_CLASS),
            PrimitiveKind::Long => Some(LONG_CLASS),
            PrimitiveKind::Float => Some(FLOAT_CLASS),
            PrimitiveKind::Double => Some(DOUBLE_CLASS),
            PrimitiveKind::Char => Some(CHARACTER_CLASS),
        }
    }
}

pub const OBJECT_CLASS: &str = "java.lang.Object";
pub const STRING_CLASS: &str = "java.lang.String";
pub const BOOLEAN_CLASS: &str = "java.lang.Boolean";
pub const BYTE_CLASS: &str = "java.lang.Byte";
pub const SHORT_CLASS: &str = "java.lang.Short";
pub const INTEGER_CLASS: &str = "java.lang.Integer";
pub const LONG_CLASS: &str = "java.lang.Long";
pub const FLOAT_CLASS: &str = "java.lang.Float";
pub const DOUBLE_CLASS: &str = "java.lang.Double";
pub const CHARACTER_CLASS: &str = "java.lang.Character";

/// Identifies a foreign type: a primitive, an array of some component, or a named class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Array(Box<TypeDescriptor>),
    /// Fully-qualified, dot separated class name.
    Class(String),
}

impl TypeDescriptor {
    pub fn class(name: impl Into<String>) -> Self {
        TypeDescriptor::Class(name.into())
    }

    pub fn array_of(component: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(component))
    }

    pub fn object() -> Self {
        TypeDescriptor::class(OBJECT_CLASS)
    }

    pub fn string() -> Self {
        TypeDescriptor::class(STRING_CLASS)
    }

    pub const fn void() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDescriptor::Array(_))
    }

    pub fn component_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(component) => Some(component),
            _ => None,
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            TypeDescriptor::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.class_name() == Some(name)
    }

    /// Human readable name, e.g. `int`, `java.lang.String`, `double[]`.
    pub fn display_name(&self) -> String {
        match self {
            TypeDescriptor::Primitive(kind) => kind.name().to_string(),
            TypeDescriptor::Array(component) => format!("{}[]", component.display_name()),
            TypeDescriptor::Class(name) => name.clone(),
        }
    }

    /// Last dotted segment of a class name, used by `importClass`.
    pub fn simple_name(&self) -> String {
        match self {
            TypeDescriptor::Class(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
            other => other.display_name(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

pub const CONSTRUCTOR_NAME: &str = "<init>";

/// One declared method or constructor as reported by host introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
    pub var_args: bool,
    pub is_static: bool,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        params: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            var_args: false,
            is_static: false,
        }
    }

    pub fn constructor(params: Vec<TypeDescriptor>) -> Self {
        Self::new(CONSTRUCTOR_NAME, params, TypeDescriptor::void())
    }

    pub fn with_var_args(mut self) -> Self {
        self.var_args = true;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static {
            f.write_str("static ")?;
        }
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let last = index + 1 == self.params.len();
            match (last && self.var_args, param.component_type()) {
                (true, Some(component)) => write!(f, "{component}...")?,
                _ => write!(f, "{param}")?,
            }
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: TypeDescriptor,
    pub is_static: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: TypeDescriptor, is_static: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_static,
        }
    }
}

/// A value crossing the runtime boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Object(ForeignHandle),
}

impl HostValue {
    pub fn as_handle(&self) -> Option<ForeignHandle> {
        match self {
            HostValue::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Integral view of numeric primitives.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            HostValue::Byte(v) => Some(v as i64),
            HostValue::Short(v) => Some(v as i64),
            HostValue::Int(v) => Some(v as i64),
            HostValue::Long(v) => Some(v),
            HostValue::Char(c) => Some(c as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            HostValue::Float(v) => Some(v as f64),
            HostValue::Double(v) => Some(v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Primitive kind that describes this value, `None` for references.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            HostValue::Boolean(_) => Some(PrimitiveKind::Boolean),
            HostValue::Byte(_) => Some(PrimitiveKind::Byte),
            HostValue::Short(_) => Some(PrimitiveKind::Short),
            HostValue::Int(_) => Some(PrimitiveKind::Int),
            HostValue::Long(_) => Some(PrimitiveKind::Long),
            HostValue::Float(_) => Some(PrimitiveKind::Float),
            HostValue::Double(_) => Some(PrimitiveKind::Double),
            HostValue::Char(_) => Some(PrimitiveKind::Char),
            HostValue::Null | HostValue::Object(_) => None,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("null"),
            HostValue::Boolean(v) => write!(f, "{v}"),
            HostValue::Byte(v) => write!(f, "{v}"),
            HostValue::Short(v) => write!(f, "{v}"),
            HostValue::Int(v) => write!(f, "{v}"),
            HostValue::Long(v) => write!(f, "{v}"),
            HostValue::Float(v) => write!(f, "{v}"),
            HostValue::Double(v) => write!(f, "{v}"),
            HostValue::Char(v) => write!(f, "{v}"),
            HostValue::Object(handle) => write!(f, "object{handle}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_follow_host_conventions() {
        let ty = TypeDescriptor::array_of(TypeDescriptor::Primitive(PrimitiveKind::Double));
        assert_eq!(ty.display_name(), "double[]");
        assert_eq!(TypeDescriptor::string().simple_name(), "String");
    }

    #[test]
    fn var_args_methods_render_with_ellipsis() {
        let method = MethodDescriptor::new(
            "asList",
            vec![TypeDescriptor::array_of(TypeDescriptor::object())],
            TypeDescriptor::class("java.util.List"),
        )
        .with_var_args()
        .with_static();
        assert_eq!(
            method.to_string(),
            "static java.util.List asList(java.lang.Object...)"
        );
    }
}

//=====================================================
// End of file
//=====================================================
