//=====================================================
// File: script/errors.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Script error model and exception hierarchy
// Objective: Carry syntax errors and raised Python exceptions with their
//            line numbers, and classify them with stable error codes
//=====================================================

use std::rc::Rc;

use thiserror::Error;

use super::parser::ParseError;
use super::value::{ExceptionObject, Value};
use crate::bridge::{BridgeError, CoercionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    Exception,
    RuntimeError,
    NotImplementedError,
    RecursionError,
    ValueError,
    TypeError,
    NameError,
    AttributeError,
    LookupError,
    KeyError,
    IndexError,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    SyntaxError,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 15] = [
        ExceptionKind::Exception,
        ExceptionKind::RuntimeError,
        ExceptionKind::NotImplementedError,
        ExceptionKind::RecursionError,
        ExceptionKind::ValueError,
        ExceptionKind::TypeError,
        ExceptionKind::NameError,
        ExceptionKind::AttributeError,
        ExceptionKind::LookupError,
        ExceptionKind::KeyError,
        ExceptionKind::IndexError,
        ExceptionKind::ArithmeticError,
        ExceptionKind::ZeroDivisionError,
        ExceptionKind::OverflowError,
        ExceptionKind::SyntaxError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::Exception => "Exception",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::NotImplementedError => "NotImplementedError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::ArithmeticError => "ArithmeticError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::SyntaxError => "SyntaxError",
        }
    }

    pub fn parent(self) -> Option<ExceptionKind> {
        match self {
            ExceptionKind::Exception => None,
            ExceptionKind::NotImplementedError | ExceptionKind::RecursionError => {
                Some(ExceptionKind::RuntimeError)
            }
            ExceptionKind::KeyError | ExceptionKind::IndexError => {
                Some(ExceptionKind::LookupError)
            }
            ExceptionKind::ZeroDivisionError | ExceptionKind::OverflowError => {
                Some(ExceptionKind::ArithmeticError)
            }
            _ => Some(ExceptionKind::Exception),
        }
    }

    /// True when `self` is `ancestor` or derives from it.
    pub fn is_subclass_of(self, ancestor: ExceptionKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    Name,
    TypeMismatch,
    InvalidOperation,
    RuntimePanic,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::Name => "E002",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::RuntimePanic => "E005",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error("SyntaxError: {0}")]
    Syntax(ParseError),
    #[error("{exception}")]
    Raised {
        exception: Rc<ExceptionObject>,
        line: Option<usize>,
    },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

impl ScriptError {
    pub fn raise(kind: ExceptionKind, message: impl Into<String>) -> Self {
        ScriptError::Raised {
            exception: Rc::new(ExceptionObject::with_message(kind, message)),
            line: None,
        }
    }

    pub fn from_exception(exception: Rc<ExceptionObject>) -> Self {
        ScriptError::Raised {
            exception,
            line: None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            ScriptError::Syntax(error) => Some(error.position().line),
            ScriptError::Raised { line, .. } => *line,
        }
    }

    /// Attach `line` unless an inner statement already did.
    pub fn with_line(self, at: usize) -> Self {
        match self {
            ScriptError::Raised {
                exception,
                line: None,
            } => ScriptError::Raised {
                exception,
                line: Some(at),
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ExceptionKind {
        match self {
            ScriptError::Syntax(_) => ExceptionKind::SyntaxError,
            ScriptError::Raised { exception, .. } => exception.kind,
        }
    }

    /// Python `repr` of the exception, e.g. `RuntimeError('boom')`.
    pub fn repr(&self) -> String {
        match self {
            ScriptError::Syntax(error) => {
                ExceptionObject::new(ExceptionKind::SyntaxError, vec![Value::str(error.to_string())])
                    .repr()
            }
            ScriptError::Raised { exception, .. } => exception.repr(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        let kind = self.kind();
        if kind == ExceptionKind::SyntaxError {
            ErrorCode::Syntax
        } else if kind.is_subclass_of(ExceptionKind::NameError) {
            ErrorCode::Name
        } else if kind.is_subclass_of(ExceptionKind::TypeError)
            || kind.is_subclass_of(ExceptionKind::AttributeError)
        {
            ErrorCode::TypeMismatch
        } else if kind.is_subclass_of(ExceptionKind::ValueError)
            || kind.is_subclass_of(ExceptionKind::LookupError)
            || kind.is_subclass_of(ExceptionKind::ArithmeticError)
        {
            ErrorCode::InvalidOperation
        } else {
            ErrorCode::RuntimePanic
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        ScriptError::Syntax(value)
    }
}

impl From<CoercionError> for ScriptError {
    fn from(value: CoercionError) -> Self {
        ScriptError::raise(ExceptionKind::TypeError, value.to_string())
    }
}

impl From<BridgeError> for ScriptError {
    fn from(value: BridgeError) -> Self {
        let kind = match &value {
            BridgeError::Coercion(_) | BridgeError::InvalidArgument(_) => ExceptionKind::TypeError,
            BridgeError::NoSuchMember { .. } => ExceptionKind::AttributeError,
            BridgeError::Host(_) => ExceptionKind::RuntimeError,
        };
        let message = match value {
            BridgeError::Coercion(inner) => inner.to_string(),
            other => other.to_string(),
        };
        ScriptError::raise(kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_walks_to_exception() {
        assert!(ExceptionKind::KeyError.is_subclass_of(ExceptionKind::LookupError));
        assert!(ExceptionKind::ZeroDivisionError.is_subclass_of(ExceptionKind::Exception));
        assert!(!ExceptionKind::TypeError.is_subclass_of(ExceptionKind::ValueError));
        assert!(ExceptionKind::ALL
            .iter()
            .all(|kind| kind.is_subclass_of(ExceptionKind::Exception)));
    }

    #[test]
    fn codes_follow_exception_families() {
        let name = ScriptError::raise(ExceptionKind::NameError, "name 'x' is not defined");
        assert_eq!(name.code_str(), "E002");
        let index = ScriptError::raise(ExceptionKind::IndexError, "list index out of range");
        assert_eq!(index.code(), ErrorCode::InvalidOperation);
        let runtime = ScriptError::raise(ExceptionKind::RuntimeError, "boom");
        assert_eq!(runtime.code(), ErrorCode::RuntimePanic);
    }

    #[test]
    fn innermost_line_wins() {
        let err = ScriptError::raise(ExceptionKind::ValueError, "bad")
            .with_line(3)
            .with_line(1);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn bridge_errors_map_to_python_exceptions() {
        let missing: ScriptError = BridgeError::NoSuchMember {
            owner: "java.lang.String".into(),
            name: "nope".into(),
        }
        .into();
        assert_eq!(missing.kind(), ExceptionKind::AttributeError);
        let overload: ScriptError = BridgeError::Coercion(CoercionError::NoMatchingOverload {
            name: "max".into(),
            last: None,
        })
        .into();
        assert_eq!(overload.kind(), ExceptionKind::TypeError);
        assert!(overload.repr().contains("No matching method found for max"));
    }
}

//=====================================================
// End of file
//=====================================================
