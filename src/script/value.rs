//=====================================================
// File: script/value.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime values of the Python subset
// Objective: Model native scalars, containers, callables, exceptions, and
//            the foreign proxies that the bridge hands to scripts
//=====================================================

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use super::ast::{FunctionDecl, Parameter};
use super::errors::{ExceptionKind, ScriptError, ScriptResult};
use super::interpreter::Interpreter;
use crate::bridge::proxy::{ForeignClass, ForeignObject};
use crate::host::ForeignHandle;

pub type Namespace = HashMap<String, Value>;
pub type Kwargs = Vec<(String, Value)>;
pub type NativeFn = dyn Fn(&mut Interpreter, Vec<Value>, Kwargs) -> ScriptResult<Value>;

/// Built-in types that are also callable constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Dict,
    Function,
    BuiltinFunction,
    Type,
    ForeignObject,
    ForeignClass,
    ForeignHandle,
}

impl BuiltinType {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::NoneType => "NoneType",
            BuiltinType::Bool => "bool",
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Str => "str",
            BuiltinType::List => "list",
            BuiltinType::Tuple => "tuple",
            BuiltinType::Dict => "dict",
            BuiltinType::Function => "function",
            BuiltinType::BuiltinFunction => "builtin_function_or_method",
            BuiltinType::Type => "type",
            BuiltinType::ForeignObject => "JWrapper",
            BuiltinType::ForeignClass => "JClassWrapper",
            BuiltinType::ForeignHandle => "JB_Object",
        }
    }
}

/// Insertion-ordered mapping keyed by value equality.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.py_eq(key))
            .map(|(_, value)| value)
    }

    pub fn insert(&mut self, key: Value, value: Value) -> ScriptResult<()> {
        if !key.is_hashable() {
            return Err(ScriptError::raise(
                ExceptionKind::TypeError,
                format!("unhashable type: '{}'", key.type_name()),
            ));
        }
        match self.entries.iter_mut().find(|(existing, _)| existing.py_eq(&key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn items(&self) -> &[(Value, Value)] {
        &self.entries
    }
}

pub enum FunctionBody {
    Block(Rc<FunctionDecl>),
    Lambda(Rc<super::ast::Expr>),
}

/// Variables of one function activation; closures keep their defining scope alive.
#[derive(Default)]
pub struct Scope {
    pub vars: HashMap<String, Value>,
    pub parent: Option<Rc<RefCell<Scope>>>,
    pub globals: HashSet<String>,
}

impl Scope {
    pub fn child_of(parent: Option<Rc<RefCell<Scope>>>) -> Self {
        Self {
            vars: HashMap::new(),
            parent,
            globals: HashSet::new(),
        }
    }
}

pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    /// Defaults are evaluated once, when the function is defined.
    pub defaults: Vec<Option<Value>>,
    pub body: FunctionBody,
    pub closure: Option<Rc<RefCell<Scope>>>,
}

pub struct NativeFunction {
    pub name: String,
    pub func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Interpreter, Vec<Value>, Kwargs) -> ScriptResult<Value> + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

/// Method of a native container or string bound to its receiver.
pub struct BoundMethod {
    pub receiver: Value,
    pub name: String,
}

#[derive(Clone)]
pub enum ForeignTarget {
    Object(Rc<ForeignObject>),
    Class(Rc<ForeignClass>),
}

/// Overloaded host method bound to an object or class proxy.
pub struct ForeignMethod {
    pub target: ForeignTarget,
    pub name: String,
}

/// Instance of one of the built-in exception classes.
#[derive(Debug, Clone)]
pub struct ExceptionObject {
    pub kind: ExceptionKind,
    pub args: Vec<Value>,
}

impl ExceptionObject {
    pub fn new(kind: ExceptionKind, args: Vec<Value>) -> Self {
        Self { kind, args }
    }

    pub fn with_message(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self::new(kind, vec![Value::str(message.into())])
    }

    /// Text shown by `str(exc)`.
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [single] if self.kind == ExceptionKind::KeyError => single.repr(),
            [single] => single.to_string(),
            many => Value::Tuple(Rc::new(many.to_vec())).repr(),
        }
    }

    /// `Kind('arg', ...)`.
    pub fn repr(&self) -> String {
        let args: Vec<String> = self.args.iter().map(Value::repr).collect();
        format!("{}({})", self.kind.name(), args.join(", "))
    }
}

impl fmt::Display for ExceptionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.message();
        if message.is_empty() {
            f.write_str(self.kind.name())
        } else {
            write!(f, "{}: {}", self.kind.name(), message)
        }
    }
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<Vec<Value>>),
    Dict(Rc<RefCell<Dict>>),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    BoundMethod(Rc<BoundMethod>),
    Type(BuiltinType),
    ExceptionClass(ExceptionKind),
    Exception(Rc<ExceptionObject>),
    /// Raw foreign reference not wrapped in a proxy.
    Handle(ForeignHandle),
    Foreign(Rc<ForeignObject>),
    ForeignClass(Rc<ForeignClass>),
    ForeignMethod(Rc<ForeignMethod>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl Value {
    pub fn str(text: impl Into<String>) -> Value {
        Value::Str(Rc::from(text.into()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(items))
    }

    pub fn dict(dict: Dict) -> Value {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn native<F>(name: &str, func: F) -> Value
    where
        F: Fn(&mut Interpreter, Vec<Value>, Kwargs) -> ScriptResult<Value> + 'static,
    {
        Value::Native(Rc::new(NativeFunction::new(name, func)))
    }

    pub fn builtin_type(&self) -> BuiltinType {
        match self {
            Value::None => BuiltinType::NoneType,
            Value::Bool(_) => BuiltinType::Bool,
            Value::Int(_) => BuiltinType::Int,
            Value::Float(_) => BuiltinType::Float,
            Value::Str(_) => BuiltinType::Str,
            Value::List(_) => BuiltinType::List,
            Value::Tuple(_) => BuiltinType::Tuple,
            Value::Dict(_) => BuiltinType::Dict,
            Value::Function(_) => BuiltinType::Function,
            Value::Native(_) | Value::BoundMethod(_) | Value::ForeignMethod(_) => {
                BuiltinType::BuiltinFunction
            }
            Value::Type(_) | Value::ExceptionClass(_) => BuiltinType::Type,
            Value::Exception(_) => BuiltinType::Type,
            Value::Handle(_) => BuiltinType::ForeignHandle,
            Value::Foreign(_) => BuiltinType::ForeignObject,
            Value::ForeignClass(_) => BuiltinType::ForeignClass,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Exception(exception) => exception.kind.name(),
            other => other.builtin_type().name(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(dict) => !dict.borrow().is_empty(),
            _ => true,
        }
    }

    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Dict(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// Numeric view used by arithmetic; bools count as ints.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => None,
        }
    }

    /// `==` semantics.
    pub fn py_eq(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return a.to_f64() == b.to_f64()
                && match (a, b) {
                    (Number::Int(x), Number::Int(y)) => x == y,
                    _ => true,
                };
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || seq_eq(&a.borrow(), &b.borrow())
            }
            (Value::Tuple(a), Value::Tuple(b)) => seq_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.items()
                        .iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| value.py_eq(other)))
            }
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a == b,
            (Value::Foreign(a), Value::Foreign(b)) => a.handle() == b.handle(),
            (Value::ForeignClass(a), Value::ForeignClass(b)) => a.class() == b.class(),
            _ => self.is_same(other),
        }
    }

    /// `is` semantics.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a == b,
            (Value::Foreign(a), Value::Foreign(b)) => Rc::ptr_eq(a, b),
            (Value::ForeignClass(a), Value::ForeignClass(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => repr_str(s),
            Value::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                if parts.len() == 1 {
                    format!("({},)", parts[0])
                } else {
                    format!("({})", parts.join(", "))
                }
            }
            Value::Dict(dict) => {
                let parts: Vec<String> = dict
                    .borrow()
                    .items()
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr(), value.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Exception(exception) => exception.repr(),
            Value::Foreign(object) => object.repr(),
            other => other.to_string(),
        }
    }
}

fn seq_eq(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(s),
            Value::List(_) | Value::Tuple(_) | Value::Dict(_) => f.write_str(&self.repr()),
            Value::Function(function) => write!(f, "<function {}>", function.name),
            Value::Native(native) => write!(f, "<built-in function {}>", native.name),
            Value::BoundMethod(method) => write!(
                f,
                "<built-in method {} of {} object>",
                method.name,
                method.receiver.type_name()
            ),
            Value::Type(ty) => write!(f, "<class '{}'>", ty.name()),
            Value::ExceptionClass(kind) => write!(f, "<class '{}'>", kind.name()),
            Value::Exception(exception) => f.write_str(&exception.message()),
            Value::Handle(handle) => write!(f, "<foreign object {handle}>"),
            Value::Foreign(object) => f.write_str(&object.display_string()),
            Value::ForeignClass(class) => write!(f, "<foreign class {}>", class.class()),
            Value::ForeignMethod(method) => {
                let owner = match &method.target {
                    ForeignTarget::Object(object) => object.class().display_name(),
                    ForeignTarget::Class(class) => class.class().display_name(),
                };
                write!(f, "<foreign method {}.{}>", owner, method.name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }
}

/// Python float formatting: `1.0`, `0.1`, `1e+20`, `inf`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{x:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => formatted,
        };
    }
    if x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_format_like_python() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
    }

    #[test]
    fn strings_repr_with_escaped_quotes() {
        assert_eq!(repr_str("boom"), "'boom'");
        assert_eq!(repr_str("it's"), "\"it's\"");
        assert_eq!(repr_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn numeric_equality_crosses_types() {
        assert!(Value::Int(1).py_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).py_eq(&Value::Int(1)));
        assert!(!Value::Int(1).py_eq(&Value::str("1")));
    }

    #[test]
    fn dict_rejects_unhashable_keys() {
        let mut dict = Dict::new();
        dict.insert(Value::str("a"), Value::Int(1)).expect("insert");
        dict.insert(Value::str("a"), Value::Int(2)).expect("overwrite");
        assert_eq!(dict.len(), 1);
        assert!(dict.insert(Value::list(vec![]), Value::None).is_err());
    }

    #[test]
    fn exception_repr_and_message() {
        let exception = ExceptionObject::with_message(ExceptionKind::RuntimeError, "boom");
        assert_eq!(exception.repr(), "RuntimeError('boom')");
        assert_eq!(exception.to_string(), "RuntimeError: boom");
        let key = ExceptionObject::new(ExceptionKind::KeyError, vec![Value::str("k")]);
        assert_eq!(key.message(), "'k'");
    }
}

//=====================================================
// End of file
//=====================================================
