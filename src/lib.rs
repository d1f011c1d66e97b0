//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: solvra_pybridge library root
// Objective: Expose the host model, reflective bridge, script language,
//            evaluator, dispatcher and host-side client
//=====================================================

//! Python script engine dispatcher with a reflective foreign-object bridge.
//!
//! A [`Service`] hands out engines; each engine runs scripts on its own
//! thread against a context of host objects reached through [`HostRuntime`].

pub mod bridge;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod logging;
pub mod script;

pub use bridge::context::Bindings;
pub use bridge::{BridgeError, BridgeResult, CoercionError};
pub use client::{ScriptEngineClient, ScriptLanguage};
pub use config::BridgeConfig;
pub use dispatch::{Command, Message, PayloadItem, QueuePair, Service};
pub use error::{DispatchError, ScriptException};
pub use evaluator::ScriptEvaluator;
pub use host::memory::InMemoryHost;
pub use host::{HostError, HostRuntime, HostValue, SharedHost};

//=====================================================
// End of file
//=====================================================
