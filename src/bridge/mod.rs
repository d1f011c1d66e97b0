//=====================================================
// File: bridge/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Reflective bridge between scripts and the host runtime
// Objective: Group the signature codec, argument coercion, overload
//            resolution, proxies, and context marshalling layers
//=====================================================

pub mod coerce;
pub mod context;
pub mod overload;
pub mod proxy;
pub mod signature;

use thiserror::Error;

use crate::host::HostError;

pub use coerce::coerce;
pub use context::{marshal, to_host, Bindings};
pub use overload::{resolve, MethodTable, Resolved};
pub use proxy::{ForeignClass, ForeignMembers, ForeignObject};

/// A native value could not be converted to a parameter type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoercionError {
    #[error("Can't cast None to primitive type {target}")]
    CannotCastNullToPrimitive { target: String },
    #[error("Object of class {actual} cannot be cast to {target}")]
    IncompatibleForeignType { actual: String, target: String },
    #[error("Argument must not be a sequence when converting to {target}")]
    NotAnArrayTarget { target: String },
    #[error("Failed to convert argument to {signature}")]
    NoCoercionRule { signature: String },
    #[error("No matching method found for {name}")]
    NoMatchingOverload {
        name: String,
        /// Failure of the last candidate that passed the arity filters.
        last: Option<Box<CoercionError>>,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error("{owner} has no member '{name}'")]
    NoSuchMember { owner: String, name: String },
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl BridgeError {
    pub fn no_such_member(owner: impl Into<String>, name: impl Into<String>) -> Self {
        BridgeError::NoSuchMember {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

//=====================================================
// End of file
//=====================================================
