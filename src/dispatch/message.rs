//=====================================================
// File: dispatch/message.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Request/response messages exchanged over engine queues
// Objective: Define commands, payload items, queue pairs, and the small
//            constructors and accessors the service and engines share
//=====================================================

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::queue::BlockingQueue;
use crate::bridge::context::Bindings;
use crate::error::{DispatchError, ScriptException};
use crate::host::HostValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    NewEngine,
    CloseService,
    Execute,
    Evaluate,
    CloseEngine,
    NewEngineResult,
    EvaluateResult,
    Execution,
    Exception,
}

static COMMANDS_BY_NAME: Lazy<HashMap<&'static str, Command>> = Lazy::new(|| {
    Command::ALL
        .iter()
        .map(|command| (command.as_str(), *command))
        .collect()
});

impl Command {
    pub const ALL: [Command; 9] = [
        Command::NewEngine,
        Command::CloseService,
        Command::Execute,
        Command::Evaluate,
        Command::CloseEngine,
        Command::NewEngineResult,
        Command::EvaluateResult,
        Command::Execution,
        Command::Exception,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::NewEngine => "NEW_ENGINE",
            Command::CloseService => "CLOSE_SERVICE",
            Command::Execute => "EXECUTE",
            Command::Evaluate => "EVALUATE",
            Command::CloseEngine => "CLOSE_ENGINE",
            Command::NewEngineResult => "NEW_ENGINE_RESULT",
            Command::EvaluateResult => "EVALUATE_RESULT",
            Command::Execution => "EXECUTION",
            Command::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        COMMANDS_BY_NAME
            .get(s)
            .copied()
            .ok_or_else(|| format!("unknown command name '{s}'"))
    }
}

/// Request and response queues of one engine (or of the service).
#[derive(Clone)]
pub struct QueuePair {
    pub request: Arc<BlockingQueue<Message>>,
    pub response: Arc<BlockingQueue<Message>>,
}

impl QueuePair {
    pub fn new() -> Self {
        Self {
            request: Arc::new(BlockingQueue::new()),
            response: Arc::new(BlockingQueue::new()),
        }
    }
}

impl Default for QueuePair {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuePair")
            .field("pending_requests", &self.request.len())
            .field("pending_responses", &self.response.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum PayloadItem {
    Text(String),
    Context(Bindings),
    Queues(QueuePair),
    Value(HostValue),
    Error(ScriptException),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub command: Command,
    pub payload: Vec<PayloadItem>,
}

impl Message {
    pub fn new(command: Command, payload: Vec<PayloadItem>) -> Self {
        Self { command, payload }
    }

    pub fn bare(command: Command) -> Self {
        Self::new(command, Vec::new())
    }

    pub fn execute(script: impl Into<String>, bindings: Bindings) -> Self {
        Self::new(
            Command::Execute,
            vec![PayloadItem::Text(script.into()), PayloadItem::Context(bindings)],
        )
    }

    pub fn evaluate(script: impl Into<String>, bindings: Bindings) -> Self {
        Self::new(
            Command::Evaluate,
            vec![PayloadItem::Text(script.into()), PayloadItem::Context(bindings)],
        )
    }

    pub fn engine_created(queues: QueuePair) -> Self {
        Self::new(Command::NewEngineResult, vec![PayloadItem::Queues(queues)])
    }

    pub fn evaluated(value: HostValue) -> Self {
        Self::new(Command::EvaluateResult, vec![PayloadItem::Value(value)])
    }

    pub fn exception(exception: ScriptException) -> Self {
        Self::new(Command::Exception, vec![PayloadItem::Error(exception)])
    }

    /// The script text and context of an EXECUTE or EVALUATE request.
    pub fn script(&self) -> Result<(&str, Bindings), DispatchError> {
        match self.payload.as_slice() {
            [PayloadItem::Text(script)] => Ok((script.as_str(), Bindings::new())),
            [PayloadItem::Text(script), PayloadItem::Context(bindings)] => {
                Ok((script.as_str(), bindings.clone()))
            }
            other => Err(self.malformed(format!("expected script and context, got {other:?}"))),
        }
    }

    pub fn queues(&self) -> Option<&QueuePair> {
        self.payload.iter().find_map(|item| match item {
            PayloadItem::Queues(pair) => Some(pair),
            _ => None,
        })
    }

    pub fn value(&self) -> Option<HostValue> {
        self.payload.iter().find_map(|item| match item {
            PayloadItem::Value(value) => Some(*value),
            _ => None,
        })
    }

    pub fn error(&self) -> Option<&ScriptException> {
        self.payload.iter().find_map(|item| match item {
            PayloadItem::Error(exception) => Some(exception),
            _ => None,
        })
    }

    /// Turn an EXCEPTION response into an error, and reject any command other than `expected`.
    pub fn expect_command(self, expected: Command) -> Result<Message, DispatchError> {
        if self.command == expected {
            return Ok(self);
        }
        if self.command == Command::Exception {
            let exception = self
                .error()
                .cloned()
                .unwrap_or_else(|| ScriptException::dispatcher("exception without details"));
            return Err(DispatchError::Script(exception));
        }
        Err(DispatchError::UnexpectedResponse {
            expected,
            actual: self.command,
        })
    }

    fn malformed(&self, detail: String) -> DispatchError {
        DispatchError::MalformedPayload {
            command: self.command,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_are_screaming_snake_case() {
        let json = serde_json::to_string(&Command::NewEngineResult).expect("serialize");
        assert_eq!(json, "\"NEW_ENGINE_RESULT\"");
        for command in Command::ALL {
            let parsed: Command = command.as_str().parse().expect("parse name");
            assert_eq!(parsed, command);
            let decoded: Command =
                serde_json::from_str(&format!("\"{command}\"")).expect("deserialize");
            assert_eq!(decoded, command);
        }
        assert!("SHUTDOWN".parse::<Command>().is_err());
    }

    #[test]
    fn script_payload_context_is_optional() {
        let bare = Message::new(Command::Execute, vec![PayloadItem::Text("x = 1".into())]);
        let (script, bindings) = bare.script().expect("script");
        assert_eq!(script, "x = 1");
        assert!(bindings.is_empty());

        let mut context = Bindings::new();
        context.insert("n".into(), HostValue::Int(3));
        let full = Message::evaluate("n", context);
        let (_, bindings) = full.script().expect("script");
        assert_eq!(bindings.get("n"), Some(&HostValue::Int(3)));

        let broken = Message::bare(Command::Evaluate);
        assert!(matches!(
            broken.script(),
            Err(DispatchError::MalformedPayload { command: Command::Evaluate, .. })
        ));
    }

    #[test]
    fn expect_command_surfaces_exceptions() {
        let ok = Message::evaluated(HostValue::Int(2));
        let ok = ok.expect_command(Command::EvaluateResult).expect("result");
        assert_eq!(ok.value(), Some(HostValue::Int(2)));

        let failed = Message::exception(ScriptException::new("Python exception: x", "f", Some(1)));
        match failed.expect_command(Command::Execution) {
            Err(DispatchError::Script(exception)) => assert_eq!(exception.line_number, Some(1)),
            other => panic!("unexpected response: {other:?}"),
        }

        match Message::bare(Command::Execution).expect_command(Command::EvaluateResult) {
            Err(DispatchError::UnexpectedResponse { expected, actual }) => {
                assert_eq!(expected, Command::EvaluateResult);
                assert_eq!(actual, Command::Execution);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}

//=====================================================
// End of file
//=====================================================
