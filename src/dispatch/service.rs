//=====================================================
// File: dispatch/service.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Engine requester service
// Objective: Own the well-known request/response queues, create engines on
//            request, and track live engines in a shared registry
//=====================================================

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::engine::{self, EngineId, EngineRecord, EngineRegistry};
use super::message::{Command, Message, PayloadItem, QueuePair};
use crate::config::BridgeConfig;
use crate::error::{DispatchError, ScriptException};
use crate::host::SharedHost;

/// Running engine requester. Dropping it stops the service thread.
pub struct Service {
    host: SharedHost,
    config: BridgeConfig,
    queues: QueuePair,
    registry: EngineRegistry,
    /// Held across put/take so concurrent callers never swap replies. Counts
    /// replies still owed to requests that timed out.
    request_lock: Mutex<usize>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct ServiceLoop {
    host: SharedHost,
    config: BridgeConfig,
    queues: QueuePair,
    registry: EngineRegistry,
    next_id: EngineId,
}

impl Service {
    pub fn start(host: SharedHost, config: BridgeConfig) -> Result<Self, DispatchError> {
        let queues = QueuePair::new();
        let registry = EngineRegistry::default();
        let worker = ServiceLoop {
            host: Arc::clone(&host),
            config: config.clone(),
            queues: queues.clone(),
            registry: Arc::clone(&registry),
            next_id: 1,
        };
        let handle = thread::Builder::new()
            .name(config.service_thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|source| DispatchError::Spawn {
                name: config.service_thread_name.clone(),
                source,
            })?;
        info!(thread = %config.service_thread_name, "script engine service started");
        Ok(Self {
            host,
            config,
            queues,
            registry,
            request_lock: Mutex::new(0),
            thread: Mutex::new(Some(handle)),
        })
    }

    /// The well-known service queues.
    pub fn queues(&self) -> &QueuePair {
        &self.queues
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn engine_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn engines(&self) -> Vec<EngineRecord> {
        let mut records: Vec<EngineRecord> = self.registry.lock().values().cloned().collect();
        records.sort_by_key(|record| record.id);
        records
    }

    /// Send one request to the service and wait for its reply.
    pub fn request(&self, message: Message) -> Result<Message, DispatchError> {
        let mut stale = self.request_lock.lock();
        self.prepare(&mut stale)?;
        self.queues.request.put(message);
        Ok(self.queues.response.take()?)
    }

    /// Like [`request`](Self::request) but gives up after `timeout`.
    pub fn request_timeout(
        &self,
        message: Message,
        timeout: Duration,
    ) -> Result<Message, DispatchError> {
        let mut stale = self.request_lock.lock();
        self.prepare(&mut stale)?;
        let expected = message.command;
        self.queues.request.put(message);
        match self.queues.response.take_timeout(timeout)? {
            Some(reply) => Ok(reply),
            None => {
                *stale += 1;
                Err(DispatchError::Timeout { expected })
            }
        }
    }

    /// Refuse requests once the service has shut down, then discard replies
    /// owed to timed-out requests so the next reply matches the next request.
    fn prepare(&self, stale: &mut usize) -> Result<(), DispatchError> {
        if self.queues.request.is_closed() {
            return Err(DispatchError::QueueClosed);
        }
        drain_stale(&self.queues, stale)
    }

    /// Create an engine and return its queue pair.
    pub fn new_engine(&self) -> Result<QueuePair, DispatchError> {
        self.bind_engine(Message::bare(Command::NewEngine))
    }

    /// Create an engine that serves the caller-supplied `queues`.
    pub fn new_engine_with(&self, queues: QueuePair) -> Result<QueuePair, DispatchError> {
        self.bind_engine(Message::new(
            Command::NewEngine,
            vec![PayloadItem::Queues(queues)],
        ))
    }

    fn bind_engine(&self, request: Message) -> Result<QueuePair, DispatchError> {
        let reply = self.request(request)?.expect_command(Command::NewEngineResult)?;
        reply
            .queues()
            .cloned()
            .ok_or_else(|| DispatchError::MalformedPayload {
                command: Command::NewEngineResult,
                detail: "missing queue pair".to_string(),
            })
    }

    /// Ask the service thread to exit and wait for it. Engines keep running;
    /// later service requests fail with [`DispatchError::QueueClosed`].
    pub fn stop(&self) {
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        {
            let _guard = self.request_lock.lock();
            self.queues.request.put(Message::bare(Command::CloseService));
        }
        if handle.join().is_err() {
            warn!("script engine service thread panicked");
        }
        info!("script engine service stopped");
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Take and discard `stale` replies left behind by timed-out requests.
pub(crate) fn drain_stale(queues: &QueuePair, stale: &mut usize) -> Result<(), DispatchError> {
    while *stale > 0 {
        let discarded = queues.response.take()?;
        *stale -= 1;
        debug!(command = %discarded.command, "discarded reply to a timed-out request");
    }
    Ok(())
}

impl ServiceLoop {
    fn run(mut self) {
        if let Err(err) = self.host.attach_current_thread() {
            warn!(error = %err, "service thread could not attach to host");
            self.shut_queues();
            return;
        }
        loop {
            let request = match self.queues.request.take() {
                Ok(request) => request,
                Err(err) => {
                    warn!(error = %err, "service stopped waiting for requests");
                    self.shut_queues();
                    break;
                }
            };
            debug!(command = %request.command, "service request received");
            let response = match request.command {
                Command::NewEngine => self.create_engine(&request),
                Command::CloseService => {
                    self.shut_queues();
                    break;
                }
                other => {
                    warn!(command = %other, "unknown service command");
                    engine::unknown_command(other)
                }
            };
            self.queues.response.put(response);
        }
        self.host.detach_current_thread();
        info!("service thread exiting");
    }

    fn shut_queues(&self) {
        self.queues.request.close();
        self.queues.response.close();
    }

    fn create_engine(&mut self, request: &Message) -> Message {
        let queues = match request.payload.as_slice() {
            [] => QueuePair::new(),
            [PayloadItem::Queues(pair)] => pair.clone(),
            other => {
                let err = DispatchError::MalformedPayload {
                    command: Command::NewEngine,
                    detail: format!("expected no payload or a queue pair, got {other:?}"),
                };
                return Message::exception(ScriptException::dispatcher(err.to_string()));
            }
        };
        let id = self.next_id;
        self.next_id += 1;
        info!(engine = id, "creating script engine");
        match engine::spawn_engine(
            id,
            Arc::clone(&self.host),
            &self.config,
            queues.clone(),
            &self.registry,
        ) {
            Ok(()) => Message::engine_created(queues),
            Err(err) => {
                warn!(engine = id, error = %err, "failed to create script engine");
                Message::exception(ScriptException::dispatcher(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::context::Bindings;
    use crate::host::memory::InMemoryHost;
    use crate::host::HostValue;

    fn service() -> Service {
        Service::start(InMemoryHost::shared(), BridgeConfig::default()).expect("start service")
    }

    #[test]
    fn new_engine_returns_working_queues() {
        let service = service();
        let queues = service.new_engine().expect("engine");
        assert_eq!(service.engine_count(), 1);
        queues.request.put(Message::evaluate("3 + 4", Bindings::new()));
        let reply = queues.response.take().expect("reply");
        assert_eq!(reply.value(), Some(HostValue::Int(7)));
        queues.request.put(Message::bare(Command::CloseEngine));
    }

    #[test]
    fn caller_supplied_queues_are_bound() {
        let service = service();
        let mine = QueuePair::new();
        let bound = service.new_engine_with(mine.clone()).expect("engine");
        assert!(Arc::ptr_eq(&bound.request, &mine.request));
        mine.request.put(Message::execute("pass", Bindings::new()));
        assert_eq!(mine.response.take().expect("reply").command, Command::Execution);
        mine.request.put(Message::bare(Command::CloseEngine));
    }

    #[test]
    fn unknown_service_command_replies_and_keeps_running() {
        let service = service();
        let reply = service.request(Message::bare(Command::Evaluate)).expect("reply");
        assert_eq!(reply.command, Command::Exception);
        assert_eq!(
            reply.error().expect("exception").message,
            "Unknown command: EVALUATE"
        );
        assert!(service.new_engine().is_ok());
    }

    #[test]
    fn engine_ids_are_distinct() {
        let service = service();
        let first = service.new_engine().expect("first");
        let second = service.new_engine().expect("second");
        let ids: Vec<EngineId> = service.engines().iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![1, 2]);
        first.request.put(Message::bare(Command::CloseEngine));
        second.request.put(Message::bare(Command::CloseEngine));
    }

    #[test]
    fn stop_ends_the_service_thread() {
        let service = service();
        assert!(service.is_running());
        service.stop();
        assert!(!service.is_running());
        service.stop();
    }

    #[test]
    fn requests_after_stop_fail_instead_of_blocking() {
        let service = service();
        service.stop();
        assert!(service.queues().request.is_closed());
        assert!(service.queues().response.is_closed());
        assert!(matches!(service.new_engine(), Err(DispatchError::QueueClosed)));
        assert!(matches!(
            service.request_timeout(Message::bare(Command::NewEngine), Duration::from_secs(1)),
            Err(DispatchError::QueueClosed)
        ));
    }

    #[test]
    fn reply_to_a_timed_out_request_is_not_handed_to_the_next_caller() {
        let service = service();
        let engine = service.new_engine().expect("engine");
        engine.request.put(Message::bare(Command::CloseEngine));
        let first = service.request_timeout(Message::bare(Command::Evaluate), Duration::ZERO);
        match first {
            Err(DispatchError::Timeout { expected }) => assert_eq!(expected, Command::Evaluate),
            Ok(reply) => assert_eq!(reply.command, Command::Exception),
            other => panic!("unexpected result: {other:?}"),
        }
        let queues = service.new_engine().expect("second engine");
        queues.request.put(Message::evaluate("5 * 5", Bindings::new()));
        let reply = queues.response.take().expect("reply");
        assert_eq!(reply.value(), Some(HostValue::Int(25)));
        queues.request.put(Message::bare(Command::CloseEngine));
    }
}

//=====================================================
// End of file
//=====================================================
