//=====================================================
// File: dispatch/engine.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Engine worker threads
// Objective: Serve EXECUTE/EVALUATE requests for one engine on its own thread
//            with a private namespace until CLOSE_ENGINE arrives
//=====================================================

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::message::{Command, Message, QueuePair};
use crate::config::BridgeConfig;
use crate::error::{DispatchError, ScriptException};
use crate::evaluator::ScriptEvaluator;
use crate::host::SharedHost;

/// Stack reserved for each engine thread; the interpreter recurses per call frame.
pub const ENGINE_STACK_SIZE: usize = 16 * 1024 * 1024;

pub type EngineId = u64;

#[derive(Debug, Clone)]
pub struct EngineRecord {
    pub id: EngineId,
    pub thread_name: String,
    pub queues: QueuePair,
}

pub(crate) type EngineRegistry = Arc<Mutex<HashMap<EngineId, EngineRecord>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Closed,
    Abandoned,
}

struct EngineWorker {
    id: EngineId,
    host: SharedHost,
    config: BridgeConfig,
    queues: QueuePair,
    registry: EngineRegistry,
}

/// Register engine `id` and start its worker thread.
pub(crate) fn spawn_engine(
    id: EngineId,
    host: SharedHost,
    config: &BridgeConfig,
    queues: QueuePair,
    registry: &EngineRegistry,
) -> Result<(), DispatchError> {
    let thread_name = config.engine_thread_name.clone();
    registry.lock().insert(
        id,
        EngineRecord {
            id,
            thread_name: thread_name.clone(),
            queues: queues.clone(),
        },
    );
    let worker = EngineWorker {
        id,
        host,
        config: config.clone(),
        queues,
        registry: Arc::clone(registry),
    };
    let spawned = thread::Builder::new()
        .name(thread_name.clone())
        .stack_size(ENGINE_STACK_SIZE)
        .spawn(move || worker.run());
    match spawned {
        Ok(_detached) => Ok(()),
        Err(source) => {
            registry.lock().remove(&id);
            Err(DispatchError::Spawn {
                name: thread_name,
                source,
            })
        }
    }
}

/// Detaches from the host and deregisters the engine however the worker ends.
struct ExitGuard<'a> {
    worker: &'a EngineWorker,
    attached: bool,
    exit: Exit,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if self.attached {
            self.worker.host.detach_current_thread();
        }
        self.worker.finish(self.exit);
    }
}

impl EngineWorker {
    fn run(self) {
        let attached = match self.host.attach_current_thread() {
            Ok(()) => true,
            Err(err) => {
                warn!(engine = self.id, error = %err, "engine thread could not attach to host");
                false
            }
        };
        let mut guard = ExitGuard {
            worker: &self,
            attached,
            exit: Exit::Abandoned,
        };
        if !attached {
            return;
        }
        // Declared after the guard so it is dropped before the thread detaches.
        let mut evaluator = ScriptEvaluator::new(Arc::clone(&self.host), &self.config);
        loop {
            let request = match self.queues.request.take() {
                Ok(request) => request,
                Err(err) => {
                    warn!(engine = self.id, error = %err, "engine stopped waiting for requests");
                    return;
                }
            };
            debug!(engine = self.id, command = %request.command, "engine request received");
            if request.command == Command::CloseEngine {
                guard.exit = Exit::Closed;
                return;
            }
            let handled =
                panic::catch_unwind(AssertUnwindSafe(|| self.handle(&mut evaluator, &request)));
            match handled {
                Ok(response) => self.queues.response.put(response),
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    error!(engine = self.id, %reason, "engine panicked while serving a request");
                    self.queues.response.put(Message::exception(ScriptException::dispatcher(
                        format!("engine failure: {reason}"),
                    )));
                    return;
                }
            }
        }
    }

    fn handle(&self, evaluator: &mut ScriptEvaluator, request: &Message) -> Message {
        match request.command {
            Command::Execute => self.execute(evaluator, request),
            Command::Evaluate => self.evaluate(evaluator, request),
            other => {
                warn!(engine = self.id, command = %other, "unknown engine command");
                unknown_command(other)
            }
        }
    }

    fn execute(&self, evaluator: &mut ScriptEvaluator, request: &Message) -> Message {
        let (script, bindings) = match request.script() {
            Ok(parts) => parts,
            Err(err) => return Message::exception(ScriptException::dispatcher(err.to_string())),
        };
        info!(engine = self.id, "executing script");
        match evaluator.execute(script, &bindings) {
            Ok(()) => Message::bare(Command::Execution),
            Err(exception) => Message::exception(exception),
        }
    }

    fn evaluate(&self, evaluator: &mut ScriptEvaluator, request: &Message) -> Message {
        let (script, bindings) = match request.script() {
            Ok(parts) => parts,
            Err(err) => return Message::exception(ScriptException::dispatcher(err.to_string())),
        };
        info!(engine = self.id, "evaluating script");
        match evaluator.evaluate_to_host(script, &bindings) {
            Ok(value) => Message::evaluated(value),
            Err(exception) => Message::exception(exception),
        }
    }

    fn finish(&self, exit: Exit) {
        // Wake any caller still blocked on a reply that will never come.
        if exit == Exit::Abandoned {
            self.queues.response.close();
        }
        self.registry.lock().remove(&self.id);
        info!(engine = self.id, ?exit, "engine thread exiting");
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) fn unknown_command(command: Command) -> Message {
    Message::exception(ScriptException::dispatcher(
        DispatchError::UnknownCommand(command).to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bridge::context::Bindings;
    use crate::host::memory::InMemoryHost;
    use crate::host::{ClassBuilder, HostValue, MethodDescriptor, TypeDescriptor};

    fn start(host: SharedHost) -> (QueuePair, EngineRegistry) {
        let registry = EngineRegistry::default();
        let queues = QueuePair::new();
        spawn_engine(7, host, &BridgeConfig::default(), queues.clone(), &registry)
            .expect("spawn engine");
        (queues, registry)
    }

    fn wait_until_gone(registry: &EngineRegistry, id: EngineId) {
        for _ in 0..200 {
            if !registry.lock().contains_key(&id) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("engine {id} never left the registry");
    }

    #[test]
    fn replies_in_request_order() {
        let host = InMemoryHost::shared();
        let (queues, registry) = start(host.clone());
        assert!(registry.lock().contains_key(&7));

        queues.request.put(Message::execute("x = 1", Bindings::new()));
        queues.request.put(Message::evaluate("x + 1", Bindings::new()));
        let first = queues.response.take().expect("first reply");
        assert_eq!(first.command, Command::Execution);
        let second = queues.response.take().expect("second reply");
        assert_eq!(second.value(), Some(HostValue::Int(2)));

        queues.request.put(Message::bare(Command::CloseEngine));
        wait_until_gone(&registry, 7);
        assert_eq!(host.attached_threads(), 0);
    }

    #[test]
    fn unknown_commands_keep_the_engine_alive() {
        let (queues, _registry) = start(InMemoryHost::shared());
        queues.request.put(Message::bare(Command::NewEngineResult));
        let reply = queues.response.take().expect("reply");
        let exception = reply.error().expect("exception payload");
        assert_eq!(exception.message, "Unknown command: NEW_ENGINE_RESULT");

        queues.request.put(Message::evaluate("2 * 21", Bindings::new()));
        let reply = queues.response.take().expect("reply");
        assert_eq!(reply.value(), Some(HostValue::Int(42)));
        queues.request.put(Message::bare(Command::CloseEngine));
    }

    #[test]
    fn close_engine_is_silent() {
        let (queues, registry) = start(InMemoryHost::shared());
        queues.request.put(Message::bare(Command::CloseEngine));
        wait_until_gone(&registry, 7);
        queues.request.put(Message::execute("x = 1", Bindings::new()));
        let reply = queues
            .response
            .take_timeout(Duration::from_millis(50))
            .expect("queue stays open");
        assert!(reply.is_none());
    }

    #[test]
    fn script_overflow_is_reported_and_the_engine_keeps_serving() {
        let (queues, _registry) = start(InMemoryHost::shared());
        queues
            .request
            .put(Message::evaluate("[1, 2] * 9223372036854775807", Bindings::new()));
        let reply = queues.response.take().expect("reply");
        assert_eq!(reply.command, Command::Exception);
        let exception = reply.error().expect("exception payload");
        assert!(exception.message.contains("OverflowError"), "{}", exception.message);

        queues.request.put(Message::evaluate("1 + 1", Bindings::new()));
        let reply = queues.response.take().expect("reply");
        assert_eq!(reply.value(), Some(HostValue::Int(2)));
        queues.request.put(Message::bare(Command::CloseEngine));
    }

    #[test]
    fn host_panic_replies_with_exception_and_retires_the_engine() {
        let host = InMemoryHost::shared();
        ClassBuilder::new("demo.Faulty")
            .method(
                MethodDescriptor::new("boom", Vec::new(), TypeDescriptor::string()).with_static(),
                |_, _, _| panic!("host fault"),
            )
            .register(&host);
        let (queues, registry) = start(host.clone());
        queues.request.put(Message::execute(
            "importClass('demo.Faulty')\nFaulty.boom()",
            Bindings::new(),
        ));
        let reply = queues.response.take().expect("reply");
        assert_eq!(reply.command, Command::Exception);
        let exception = reply.error().expect("exception payload");
        assert_eq!(exception.message, "engine failure: host fault");

        wait_until_gone(&registry, 7);
        assert_eq!(host.attached_threads(), 0);
        assert!(queues.response.is_closed());
        queues.request.put(Message::evaluate("1", Bindings::new()));
        assert!(queues.response.take().is_err());
    }

    #[test]
    fn interrupted_engine_exits_and_closes_replies() {
        let (queues, registry) = start(InMemoryHost::shared());
        queues.request.interrupt();
        wait_until_gone(&registry, 7);
        assert!(queues.response.is_closed());
    }
}

//=====================================================
// End of file
//=====================================================
