//=====================================================
// File: error.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Errors that cross the engine boundary
// Objective: Define the host-visible script exception and the dispatcher's
//            error type
//=====================================================

use std::fmt;

use thiserror::Error;

use crate::dispatch::{Command, RecvError};

/// Host-visible failure of a script request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptException {
    pub message: String,
    pub file_name: String,
    pub line_number: Option<usize>,
}

impl ScriptException {
    pub fn new(
        message: impl Into<String>,
        file_name: impl Into<String>,
        line_number: Option<usize>,
    ) -> Self {
        Self {
            message: message.into(),
            file_name: file_name.into(),
            line_number,
        }
    }

    /// Exception raised by the dispatcher itself rather than by a script.
    pub fn dispatcher(message: impl Into<String>) -> Self {
        Self::new(message, String::new(), None)
    }
}

impl fmt::Display for ScriptException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (self.file_name.is_empty(), self.line_number) {
            (true, _) => Ok(()),
            (false, Some(line)) => write!(f, " in {} at line number {}", self.file_name, line),
            (false, None) => write!(f, " in {}", self.file_name),
        }
    }
}

impl std::error::Error for ScriptException {}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown command: {0}")]
    UnknownCommand(Command),
    #[error("interrupted while waiting on a queue")]
    QueueInterrupted,
    #[error("queue closed")]
    QueueClosed,
    #[error("timed out waiting for {expected}")]
    Timeout { expected: Command },
    #[error("expected {expected} but received {actual}")]
    UnexpectedResponse { expected: Command, actual: Command },
    #[error("{command} payload is malformed: {detail}")]
    MalformedPayload { command: Command, detail: String },
    #[error(transparent)]
    Script(#[from] ScriptException),
    #[error("failed to spawn thread '{name}'")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<RecvError> for DispatchError {
    fn from(value: RecvError) -> Self {
        match value {
            RecvError::Interrupted => DispatchError::QueueInterrupted,
            RecvError::Closed => DispatchError::QueueClosed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_when_known() {
        let located = ScriptException::new("Python exception: RuntimeError('boom')", "job.py", Some(3));
        assert_eq!(
            located.to_string(),
            "Python exception: RuntimeError('boom') in job.py at line number 3"
        );
        let bare = ScriptException::dispatcher("Unknown command: EXECUTION");
        assert_eq!(bare.to_string(), "Unknown command: EXECUTION");
    }

    #[test]
    fn queue_failures_map_to_dispatch_errors() {
        assert!(matches!(
            DispatchError::from(RecvError::Interrupted),
            DispatchError::QueueInterrupted
        ));
        assert!(matches!(
            DispatchError::from(RecvError::Closed),
            DispatchError::QueueClosed
        ));
    }
}

//=====================================================
// End of file
//=====================================================
