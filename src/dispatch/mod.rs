//=====================================================
// File: dispatch/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Engine dispatcher
// Objective: Group the queue, message, service and engine worker modules
//=====================================================

//! Request/response protocol between the host and script engines.
//!
//! The [`Service`] thread owns the well-known queues and answers NEW_ENGINE
//! with a fresh [`QueuePair`]. Every engine then runs on its own thread with
//! a private namespace and serves EXECUTE/EVALUATE until CLOSE_ENGINE.

pub mod engine;
pub mod message;
pub mod queue;
pub mod service;

pub use engine::{EngineId, EngineRecord, ENGINE_STACK_SIZE};
pub use message::{Command, Message, PayloadItem, QueuePair};
pub use queue::{BlockingQueue, RecvError};
pub use service::Service;

//=====================================================
// End of file
//=====================================================
