//=====================================================
// File: script/interpreter.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tree-walking interpreter for the Python subset
// Objective: Execute parsed programs against a persistent global namespace,
//            dispatch calls to script, native, and foreign callables, and
//            surface failures as Python exceptions with line numbers
//=====================================================

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use super::ast::{AssignTarget, BinaryOp, BoolOp, ExceptHandler, Expr, Literal, Parameter, Program, Stmt};
use super::builtins;
use super::errors::{ExceptionKind, ScriptError, ScriptResult};
use super::ops;
use super::parser::parse_program;
use super::value::{
    BoundMethod, Dict, ExceptionObject, ForeignMethod, ForeignTarget, Function, FunctionBody, Kwargs,
    Namespace, Scope, Value,
};
use crate::bridge::ForeignMembers;

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Attribute of an object proxy that yields the raw foreign handle.
pub const RAW_HANDLE_ATTRIBUTE: &str = "o";

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Clonable in-memory sink for `print` output.
#[derive(Clone, Default)]
pub struct OutputBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Interpreter {
    globals: Namespace,
    builtins: Namespace,
    frames: Vec<Rc<RefCell<Scope>>>,
    /// Exceptions whose handlers are running, for bare `raise`.
    handling: Vec<Rc<ExceptionObject>>,
    output: Box<dyn Write>,
    max_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let mut builtins = Namespace::new();
        builtins::install(&mut builtins);
        Self {
            globals: Namespace::new(),
            builtins,
            frames: Vec::new(),
            handling: Vec::new(),
            output: Box::new(io::stdout()),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Namespace {
        &mut self.globals
    }

    pub fn get_global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn write_output(&mut self, text: &str) -> ScriptResult<()> {
        self.output
            .write_all(text.as_bytes())
            .and_then(|_| self.output.flush())
            .map_err(|err| {
                ScriptError::raise(ExceptionKind::RuntimeError, format!("output failed: {err}"))
            })
    }

    /// Parse and run `source` as a module body.
    pub fn exec_source(&mut self, source: &str) -> ScriptResult<()> {
        let program = parse_program(source)?;
        self.run(&program)
    }

    /// Parse `source`, run its statements, and return the value of a trailing
    /// expression statement (or `None`).
    pub fn eval_source(&mut self, source: &str) -> ScriptResult<Value> {
        let (program, trailing) = parse_program(source)?.split_trailing_expression();
        self.run(&program)?;
        match trailing {
            Some(expr) => {
                let line = expr.position().line;
                self.evaluate(&expr).map_err(|err| err.with_line(line))
            }
            None => Ok(Value::None),
        }
    }

    pub fn run(&mut self, program: &Program) -> ScriptResult<()> {
        match self.exec_block(&program.statements)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(ScriptError::raise(
                ExceptionKind::SyntaxError,
                "'return' outside function",
            )),
            Flow::Break | Flow::Continue => Err(ScriptError::raise(
                ExceptionKind::SyntaxError,
                "'break' or 'continue' outside loop",
            )),
        }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> ScriptResult<Value> {
        self.eval_expr(expr)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_block(&mut self, statements: &[Stmt]) -> ScriptResult<Flow> {
        for statement in statements {
            match self.exec_stmt(statement)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        self.exec_stmt_inner(stmt)
            .map_err(|err| err.with_line(stmt.line()))
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Assign { targets, value, .. } => {
                let value = self.eval_expr(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
                Ok(Flow::Normal)
            }
            Stmt::AugAssign {
                target,
                operator,
                value,
                ..
            } => {
                self.exec_aug_assign(target, *operator, value)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                branches,
                else_body,
                ..
            } => {
                for (condition, body) in branches {
                    if self.eval_expr(condition)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                match else_body {
                    Some(body) => self.exec_block(body),
                    None => Ok(Flow::Normal),
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                while self.eval_expr(condition)?.is_truthy() {
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        returned @ Flow::Return(_) => return Ok(returned),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                target,
                iterable,
                body,
                ..
            } => {
                let iterable = self.eval_expr(iterable)?;
                for item in ops::iterate(&iterable)? {
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        returned @ Flow::Return(_) => return Ok(returned),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Continue { .. } => Ok(Flow::Continue),
            Stmt::Pass { .. } => Ok(Flow::Normal),
            Stmt::FunctionDef { decl, .. } => {
                let function =
                    self.make_function(&decl.name, &decl.params, FunctionBody::Block(decl.clone()))?;
                self.assign_name(&decl.name, function);
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Raise { exception, .. } => match exception {
                Some(expr) => {
                    let value = self.eval_expr(expr)?;
                    Err(self.raise_value(value))
                }
                None => match self.handling.last() {
                    Some(active) => Err(ScriptError::from_exception(active.clone())),
                    None => Err(ScriptError::raise(
                        ExceptionKind::RuntimeError,
                        "No active exception to reraise",
                    )),
                },
            },
            Stmt::Try {
                body,
                handlers,
                else_body,
                finally_body,
                ..
            } => {
                let outcome = match self.exec_block(body) {
                    Ok(Flow::Normal) => match else_body {
                        Some(else_body) => self.exec_block(else_body),
                        None => Ok(Flow::Normal),
                    },
                    Ok(flow) => Ok(flow),
                    Err(ScriptError::Raised { exception, line }) => {
                        self.handle_exception(handlers, exception, line)
                    }
                    Err(other) => Err(other),
                };
                match finally_body {
                    Some(finally_body) => match self.exec_block(finally_body)? {
                        Flow::Normal => outcome,
                        overriding => Ok(overriding),
                    },
                    None => outcome,
                }
            }
            Stmt::Global { names, .. } => {
                if let Some(frame) = self.frames.last() {
                    frame.borrow_mut().globals.extend(names.iter().cloned());
                }
                Ok(Flow::Normal)
            }
        }
    }

    fn raise_value(&self, value: Value) -> ScriptError {
        match value {
            Value::Exception(exception) => ScriptError::from_exception(exception),
            Value::ExceptionClass(kind) => {
                ScriptError::from_exception(Rc::new(ExceptionObject::new(kind, Vec::new())))
            }
            _ => ScriptError::raise(
                ExceptionKind::TypeError,
                "exceptions must derive from BaseException",
            ),
        }
    }

    fn handle_exception(
        &mut self,
        handlers: &[ExceptHandler],
        exception: Rc<ExceptionObject>,
        line: Option<usize>,
    ) -> ScriptResult<Flow> {
        for handler in handlers {
            let matched = match &handler.exception_type {
                None => true,
                Some(filter) => {
                    let filter = self.eval_expr(filter)?;
                    exception_matches(&filter, exception.kind)?
                }
            };
            if !matched {
                continue;
            }
            if let Some(name) = &handler.binding {
                self.assign_name(name, Value::Exception(exception.clone()));
            }
            self.handling.push(exception);
            let result = self.exec_block(&handler.body);
            self.handling.pop();
            return result;
        }
        Err(ScriptError::Raised { exception, line })
    }

    fn exec_aug_assign(
        &mut self,
        target: &AssignTarget,
        operator: BinaryOp,
        value: &Expr,
    ) -> ScriptResult<()> {
        match target {
            AssignTarget::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.eval_expr(value)?;
                let updated = in_place(operator, &current, &rhs)?;
                self.assign_name(name, updated);
                Ok(())
            }
            AssignTarget::Attribute { object, name } => {
                let object = self.eval_expr(object)?;
                let current = self.get_attribute(&object, name)?;
                let rhs = self.eval_expr(value)?;
                let updated = in_place(operator, &current, &rhs)?;
                self.set_attribute(&object, name, updated)
            }
            AssignTarget::Subscript { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                let current = ops::get_item(&object, &index)?;
                let rhs = self.eval_expr(value)?;
                let updated = in_place(operator, &current, &rhs)?;
                ops::set_item(&object, &index, updated)
            }
            AssignTarget::Unpack(_) => Err(ScriptError::raise(
                ExceptionKind::SyntaxError,
                "illegal expression for augmented assignment",
            )),
        }
    }

    fn assign(&mut self, target: &AssignTarget, value: Value) -> ScriptResult<()> {
        match target {
            AssignTarget::Name(name) => {
                self.assign_name(name, value);
                Ok(())
            }
            AssignTarget::Attribute { object, name } => {
                let object = self.eval_expr(object)?;
                self.set_attribute(&object, name, value)
            }
            AssignTarget::Subscript { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                ops::set_item(&object, &index, value)
            }
            AssignTarget::Unpack(targets) => {
                let items = ops::iterate(&value)?;
                if items.len() > targets.len() {
                    return Err(ScriptError::raise(
                        ExceptionKind::ValueError,
                        format!("too many values to unpack (expected {})", targets.len()),
                    ));
                }
                if items.len() < targets.len() {
                    return Err(ScriptError::raise(
                        ExceptionKind::ValueError,
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            targets.len(),
                            items.len()
                        ),
                    ));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
        }
    }

    /// Bind `name` in the innermost function scope, or globally at module level
    /// and for names declared `global`.
    pub fn assign_name(&mut self, name: &str, value: Value) {
        match self.frames.last() {
            Some(frame) if !frame.borrow().globals.contains(name) => {
                frame.borrow_mut().vars.insert(name.to_string(), value);
            }
            _ => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    fn lookup(&self, name: &str) -> ScriptResult<Value> {
        let mut scope = self.frames.last().cloned();
        while let Some(current) = scope {
            let borrowed = current.borrow();
            if borrowed.globals.contains(name) {
                break;
            }
            if let Some(value) = borrowed.vars.get(name) {
                return Ok(value.clone());
            }
            scope = borrowed.parent.clone();
        }
        self.globals
            .get(name)
            .or_else(|| self.builtins.get(name))
            .cloned()
            .ok_or_else(|| {
                ScriptError::raise(
                    ExceptionKind::NameError,
                    format!("name '{name}' is not defined"),
                )
            })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval_expr(&mut self, expr: &Expr) -> ScriptResult<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),
            Expr::Name { name, .. } => self.lookup(name),
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                ops::binary(*operator, &left, &right)
            }
            Expr::Unary {
                operator, operand, ..
            } => {
                let operand = self.eval_expr(operand)?;
                ops::unary(*operator, &operand)
            }
            Expr::Logical {
                operator,
                left,
                right,
                ..
            } => {
                let left = self.eval_expr(left)?;
                match (operator, left.is_truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval_expr(right),
                }
            }
            Expr::Compare {
                left, comparisons, ..
            } => {
                let mut current = self.eval_expr(left)?;
                for (operator, next) in comparisons {
                    let right = self.eval_expr(next)?;
                    if !ops::compare(*operator, &current, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    current = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Call {
                callee,
                args,
                kwargs,
                ..
            } => {
                let callee = self.eval_expr(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                let mut named = Vec::with_capacity(kwargs.len());
                for (name, arg) in kwargs {
                    named.push((name.clone(), self.eval_expr(arg)?));
                }
                self.call(&callee, values, named)
            }
            Expr::Attribute { object, name, .. } => {
                let object = self.eval_expr(object)?;
                self.get_attribute(&object, name)
            }
            Expr::Subscript { object, index, .. } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                ops::get_item(&object, &index)
            }
            Expr::List { elements, .. } => Ok(Value::list(self.eval_all(elements)?)),
            Expr::Tuple { elements, .. } => Ok(Value::tuple(self.eval_all(elements)?)),
            Expr::Dict { entries, .. } => {
                let mut dict = Dict::new();
                for (key, value) in entries {
                    let key = self.eval_expr(key)?;
                    let value = self.eval_expr(value)?;
                    dict.insert(key, value)?;
                }
                Ok(Value::dict(dict))
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_expr(then_branch)
                } else {
                    self.eval_expr(else_branch)
                }
            }
            Expr::Lambda { params, body, .. } => {
                self.make_function("<lambda>", params, FunctionBody::Lambda(body.clone()))
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> ScriptResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval_expr(expr)?);
        }
        Ok(values)
    }

    fn make_function(
        &mut self,
        name: &str,
        params: &[Parameter],
        body: FunctionBody,
    ) -> ScriptResult<Value> {
        let mut defaults = Vec::with_capacity(params.len());
        for param in params {
            defaults.push(match &param.default {
                Some(expr) => Some(self.eval_expr(expr)?),
                None => None,
            });
        }
        Ok(Value::Function(Rc::new(Function {
            name: name.to_string(),
            params: params.to_vec(),
            defaults,
            body,
            closure: self.frames.last().cloned(),
        })))
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn get_attribute(&mut self, object: &Value, name: &str) -> ScriptResult<Value> {
        match object {
            Value::Foreign(proxy) => {
                if name == RAW_HANDLE_ATTRIBUTE {
                    return Ok(Value::Handle(proxy.handle()));
                }
                if proxy.has_method(name) {
                    return Ok(Value::ForeignMethod(Rc::new(ForeignMethod {
                        target: ForeignTarget::Object(proxy.clone()),
                        name: name.to_string(),
                    })));
                }
                Ok(proxy.get_field(name)?)
            }
            Value::ForeignClass(class) => {
                if class.has_method(name) {
                    return Ok(Value::ForeignMethod(Rc::new(ForeignMethod {
                        target: ForeignTarget::Class(class.clone()),
                        name: name.to_string(),
                    })));
                }
                Ok(class.get_field(name)?)
            }
            Value::ForeignMethod(method) if name == "__doc__" => {
                let listing = match &method.target {
                    ForeignTarget::Object(proxy) => proxy.describe(&method.name),
                    ForeignTarget::Class(class) => class.describe(&method.name),
                };
                Ok(listing.map(Value::str).unwrap_or(Value::None))
            }
            Value::Exception(exception) if name == "args" => {
                Ok(Value::tuple(exception.args.clone()))
            }
            _ if builtins::has_method(object, name) => {
                Ok(Value::BoundMethod(Rc::new(BoundMethod {
                    receiver: object.clone(),
                    name: name.to_string(),
                })))
            }
            _ => Err(no_attribute(object, name)),
        }
    }

    pub fn set_attribute(&mut self, object: &Value, name: &str, value: Value) -> ScriptResult<()> {
        match object {
            Value::Foreign(proxy) => Ok(proxy.set_field(name, &value)?),
            Value::ForeignClass(class) => Ok(class.set_field(name, &value)?),
            _ => Err(no_attribute(object, name)),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    pub fn call(&mut self, callee: &Value, args: Vec<Value>, kwargs: Kwargs) -> ScriptResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(function.clone(), args, kwargs),
            Value::Native(native) => {
                let native = native.clone();
                (native.func)(self, args, kwargs)
            }
            Value::BoundMethod(method) => {
                let method = method.clone();
                builtins::call_method(self, &method.receiver, &method.name, args, kwargs)
            }
            Value::Type(ty) => builtins::construct(self, *ty, args, kwargs),
            Value::ExceptionClass(kind) => {
                reject_kwargs(kind.name(), &kwargs)?;
                Ok(Value::Exception(Rc::new(ExceptionObject::new(*kind, args))))
            }
            Value::ForeignMethod(method) => {
                reject_kwargs(&method.name, &kwargs)?;
                let result = match &method.target {
                    ForeignTarget::Object(proxy) => proxy.invoke(&method.name, &args),
                    ForeignTarget::Class(class) => class.invoke(&method.name, &args),
                };
                Ok(result?)
            }
            Value::ForeignClass(class) => {
                reject_kwargs(&class.class().display_name(), &kwargs)?;
                Ok(Value::Foreign(Rc::new(class.construct(&args)?)))
            }
            other => Err(ScriptError::raise(
                ExceptionKind::TypeError,
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn call_function(
        &mut self,
        function: Rc<Function>,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> ScriptResult<Value> {
        if self.frames.len() >= self.max_depth {
            return Err(ScriptError::raise(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        let scope = Rc::new(RefCell::new(Scope::child_of(function.closure.clone())));
        bind_arguments(&function, &scope, args, kwargs)?;
        self.frames.push(scope);
        let result = match &function.body {
            FunctionBody::Block(decl) => self.exec_block(&decl.body).map(|flow| match flow {
                Flow::Return(value) => value,
                _ => Value::None,
            }),
            FunctionBody::Lambda(body) => self.eval_expr(body),
        };
        self.frames.pop();
        result
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::None => Value::None,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Str(text) => Value::str(text.clone()),
    }
}

/// `+=` on a list extends it in place; everything else rebinds.
fn in_place(operator: BinaryOp, current: &Value, rhs: &Value) -> ScriptResult<Value> {
    if let (BinaryOp::Add, Value::List(items)) = (operator, current) {
        let extra = ops::iterate(rhs)?;
        items.borrow_mut().extend(extra);
        return Ok(current.clone());
    }
    ops::binary(operator, current, rhs)
}

fn exception_matches(filter: &Value, kind: ExceptionKind) -> ScriptResult<bool> {
    match filter {
        Value::ExceptionClass(expected) => Ok(kind.is_subclass_of(*expected)),
        Value::Tuple(filters) => {
            for filter in filters.iter() {
                if exception_matches(filter, kind)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(ScriptError::raise(
            ExceptionKind::TypeError,
            "catching classes that do not inherit from BaseException is not allowed",
        )),
    }
}

fn no_attribute(object: &Value, name: &str) -> ScriptError {
    ScriptError::raise(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{}'", object.type_name(), name),
    )
}

fn reject_kwargs(name: &str, kwargs: &Kwargs) -> ScriptResult<()> {
    if kwargs.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::raise(
            ExceptionKind::TypeError,
            format!("{name}() takes no keyword arguments"),
        ))
    }
}

fn bind_arguments(
    function: &Function,
    scope: &Rc<RefCell<Scope>>,
    args: Vec<Value>,
    kwargs: Kwargs,
) -> ScriptResult<()> {
    let params = &function.params;
    let name = &function.name;
    if args.len() > params.len() {
        return Err(ScriptError::raise(
            ExceptionKind::TypeError,
            format!(
                "{name}() takes {} positional argument{} but {} were given",
                params.len(),
                if params.len() == 1 { "" } else { "s" },
                args.len()
            ),
        ));
    }
    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, arg) in slots.iter_mut().zip(args) {
        *slot = Some(arg);
    }
    for (key, value) in kwargs {
        match params.iter().position(|param| param.name == key) {
            Some(index) if slots[index].is_some() => {
                return Err(ScriptError::raise(
                    ExceptionKind::TypeError,
                    format!("{name}() got multiple values for argument '{key}'"),
                ))
            }
            Some(index) => slots[index] = Some(value),
            None => {
                return Err(ScriptError::raise(
                    ExceptionKind::TypeError,
                    format!("{name}() got an unexpected keyword argument '{key}'"),
                ))
            }
        }
    }

    let mut scope = scope.borrow_mut();
    let mut missing = Vec::new();
    for ((param, slot), default) in params.iter().zip(slots).zip(&function.defaults) {
        match slot.or_else(|| default.clone()) {
            Some(value) => {
                scope.vars.insert(param.name.clone(), value);
            }
            None => missing.push(format!("'{}'", param.name)),
        }
    }
    if !missing.is_empty() {
        return Err(ScriptError::raise(
            ExceptionKind::TypeError,
            format!(
                "{name}() missing {} required positional argument{}: {}",
                missing.len(),
                if missing.len() == 1 { "" } else { "s" },
                missing.join(", ")
            ),
        ));
    }
    Ok(())
}


//=====================================================
// End of file
//=====================================================
