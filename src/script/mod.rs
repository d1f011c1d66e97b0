//=====================================================
// File: script/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Embedded Python-subset script engine
// Objective: Tokenize, parse, and interpret scripts over a namespace that
//            can hold proxies for foreign objects
//=====================================================

pub mod ast;
pub mod builtins;
pub mod errors;
pub mod interpreter;
pub mod ops;
pub mod parser;
pub mod tokenizer;
pub mod value;

pub use errors::{ErrorCode, ExceptionKind, ScriptError, ScriptResult};
pub use interpreter::{Interpreter, OutputBuffer};
pub use parser::{parse_program, ParseError};
pub use value::{Namespace, Value};

//=====================================================
// End of file
//=====================================================
