//=====================================================
// File: client.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host-side engine client and language facade
// Objective: Wrap one engine's queue pair behind execute/eval calls and
//            start the shared service lazily for the language plugin
//=====================================================

use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::bridge::context::Bindings;
use crate::config::BridgeConfig;
use crate::dispatch::service::drain_stale;
use crate::dispatch::{Command, Message, QueuePair, Service};
use crate::error::DispatchError;
use crate::host::{HostValue, SharedHost};

/// One script engine as seen from the host.
pub struct ScriptEngineClient {
    queues: QueuePair,
    /// Held across put/take. Counts replies still owed to timed-out requests.
    exchange: Mutex<usize>,
    closed: bool,
}

impl ScriptEngineClient {
    /// Ask `service` for a new engine.
    pub fn new(service: &Service) -> Result<Self, DispatchError> {
        let queues = service.new_engine()?;
        Ok(Self::from_queues(queues))
    }

    /// Client for an engine whose queues were obtained elsewhere.
    pub fn from_queues(queues: QueuePair) -> Self {
        Self {
            queues,
            exchange: Mutex::new(0),
            closed: false,
        }
    }

    pub fn queues(&self) -> &QueuePair {
        &self.queues
    }

    pub fn execute(&self, script: &str, bindings: Bindings) -> Result<(), DispatchError> {
        self.round_trip(Message::execute(script, bindings), Command::Execution)?;
        Ok(())
    }

    pub fn eval(&self, script: &str, bindings: Bindings) -> Result<HostValue, DispatchError> {
        let reply = self.round_trip(Message::evaluate(script, bindings), Command::EvaluateResult)?;
        evaluated_value(&reply)
    }

    /// [`eval`](Self::eval) that gives up after `timeout`.
    ///
    /// The engine still finishes the abandoned script; its reply is discarded
    /// by the next request on this client, which waits for it first.
    pub fn eval_timeout(
        &self,
        script: &str,
        bindings: Bindings,
        timeout: Duration,
    ) -> Result<HostValue, DispatchError> {
        if self.closed {
            return Err(DispatchError::QueueClosed);
        }
        let mut stale = self.exchange.lock();
        drain_stale(&self.queues, &mut stale)?;
        self.queues.request.put(Message::evaluate(script, bindings));
        let Some(reply) = self.queues.response.take_timeout(timeout)? else {
            *stale += 1;
            return Err(DispatchError::Timeout {
                expected: Command::EvaluateResult,
            });
        };
        evaluated_value(&reply.expect_command(Command::EvaluateResult)?)
    }

    /// Send CLOSE_ENGINE. Never waits; the engine sends no reply.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.queues.request.put(Message::bare(Command::CloseEngine));
            debug!("script engine close requested");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn round_trip(&self, request: Message, expected: Command) -> Result<Message, DispatchError> {
        if self.closed {
            return Err(DispatchError::QueueClosed);
        }
        let mut stale = self.exchange.lock();
        drain_stale(&self.queues, &mut stale)?;
        self.queues.request.put(request);
        self.queues.response.take()?.expect_command(expected)
    }
}

fn evaluated_value(reply: &Message) -> Result<HostValue, DispatchError> {
    reply.value().ok_or_else(|| DispatchError::MalformedPayload {
        command: Command::EvaluateResult,
        detail: "missing value".to_string(),
    })
}

impl Drop for ScriptEngineClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Language plugin facade: names the language and owns the shared service.
pub struct ScriptLanguage {
    host: SharedHost,
    config: BridgeConfig,
    service: Mutex<Option<Service>>,
}

impl ScriptLanguage {
    pub const ENGINE_NAME: &'static str = "cpython";
    pub const LANGUAGE_NAME: &'static str = "CPython";

    pub fn new(host: SharedHost, config: BridgeConfig) -> Self {
        Self {
            host,
            config,
            service: Mutex::new(None),
        }
    }

    pub fn engine_name(&self) -> &'static str {
        Self::ENGINE_NAME
    }

    pub fn language_name(&self) -> &'static str {
        Self::LANGUAGE_NAME
    }

    pub fn is_started(&self) -> bool {
        self.service.lock().is_some()
    }

    /// New engine client; the service starts on the first call.
    pub fn script_engine(&self) -> Result<ScriptEngineClient, DispatchError> {
        let mut guard = self.service.lock();
        let service = match guard.take() {
            Some(service) => service,
            None => Service::start(self.host.clone(), self.config.clone())?,
        };
        ScriptEngineClient::new(guard.insert(service))
    }
}

impl Drop for ScriptLanguage {
    fn drop(&mut self) {
        if let Some(service) = self.service.lock().take() {
            service.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::InMemoryHost;

    #[test]
    fn language_starts_service_lazily() {
        let language = ScriptLanguage::new(InMemoryHost::shared(), BridgeConfig::default());
        assert_eq!(language.engine_name(), "cpython");
        assert_eq!(language.language_name(), "CPython");
        assert!(!language.is_started());
        let engine = language.script_engine().expect("engine");
        assert!(language.is_started());
        assert_eq!(engine.eval("1 + 1", Bindings::new()).expect("eval"), HostValue::Int(2));
    }

    #[test]
    fn closed_client_rejects_requests() {
        let language = ScriptLanguage::new(InMemoryHost::shared(), BridgeConfig::default());
        let mut engine = language.script_engine().expect("engine");
        engine.close();
        assert!(engine.is_closed());
        assert!(matches!(
            engine.execute("x = 1", Bindings::new()),
            Err(DispatchError::QueueClosed)
        ));
    }

    #[test]
    fn timed_out_reply_does_not_leak_into_the_next_call() {
        let language = ScriptLanguage::new(InMemoryHost::shared(), BridgeConfig::default());
        let engine = language.script_engine().expect("engine");
        let slow = "total = 0\nfor i in range(200000):\n    total += i\ntotal";
        match engine.eval_timeout(slow, Bindings::new(), Duration::ZERO) {
            Err(DispatchError::Timeout { expected }) => {
                assert_eq!(expected, Command::EvaluateResult)
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(engine.eval("40 + 2", Bindings::new()).expect("eval"), HostValue::Int(42));
        assert_eq!(
            engine
                .eval_timeout("6 * 7", Bindings::new(), Duration::from_secs(5))
                .expect("eval"),
            HostValue::Int(42)
        );
        assert_eq!(engine.eval("1 + 1", Bindings::new()).expect("eval"), HostValue::Int(2));
    }

    #[test]
    fn script_failures_surface_as_script_errors() {
        let language = ScriptLanguage::new(InMemoryHost::shared(), BridgeConfig::default());
        let engine = language.script_engine().expect("engine");
        match engine.execute("raise ValueError('bad')", Bindings::new()) {
            Err(DispatchError::Script(exception)) => {
                assert_eq!(exception.message, "Python exception: ValueError('bad')");
                assert_eq!(exception.line_number, Some(1));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

//=====================================================
// End of file
//=====================================================
