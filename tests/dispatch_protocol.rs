//=====================================================
// File: tests/dispatch_protocol.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Request/response protocol checks across service and engines
// Objective: Cover evaluation results, exceptions, engine isolation, silent
//            close, unknown commands and concurrent engine creation
//=====================================================

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use solvra_pybridge::host::HostRuntime;
use solvra_pybridge::{
    Bindings, BridgeConfig, Command, DispatchError, HostValue, InMemoryHost, Message,
    ScriptEngineClient, Service,
};

fn start() -> (Arc<InMemoryHost>, Service) {
    let host = InMemoryHost::shared();
    let service = Service::start(host.clone(), BridgeConfig::default()).expect("start service");
    (host, service)
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn trailing_expression_value_reaches_the_host() {
    let (_host, service) = start();
    let engine = ScriptEngineClient::new(&service).expect("engine");
    let value = engine.eval("x = 1\nx + 1", Bindings::new()).expect("eval");
    assert_eq!(value, HostValue::Int(2));
    assert_eq!(engine.eval("x = 5", Bindings::new()).expect("eval"), HostValue::Null);
}

#[test]
fn raised_exception_arrives_as_exception_message() {
    let (_host, service) = start();
    let engine = ScriptEngineClient::new(&service).expect("engine");
    match engine.execute("raise RuntimeError('boom')", Bindings::new()) {
        Err(DispatchError::Script(exception)) => {
            assert_eq!(exception.message, "Python exception: RuntimeError('boom')");
            assert_eq!(exception.file_name, "scripting-python");
            assert_eq!(exception.line_number, Some(1));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    // The engine survives a failing script.
    assert_eq!(engine.eval("'ok'", Bindings::new()).map(|v| v.is_null()).ok(), Some(false));
}

#[test]
fn engines_do_not_share_namespaces() {
    let (_host, service) = start();
    let first = ScriptEngineClient::new(&service).expect("first engine");
    let second = ScriptEngineClient::new(&service).expect("second engine");
    first.execute("secret = 42", Bindings::new()).expect("define");
    assert_eq!(first.eval("secret", Bindings::new()).expect("eval"), HostValue::Int(42));
    match second.eval("secret", Bindings::new()) {
        Err(DispatchError::Script(exception)) => {
            assert!(exception.message.starts_with("Python exception: NameError("));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn close_engine_sends_nothing_back() {
    let (_host, service) = start();
    let queues = service.new_engine().expect("engine");
    assert_eq!(service.engine_count(), 1);
    queues.request.put(Message::bare(Command::CloseEngine));
    assert!(wait_for(|| service.engine_count() == 0));

    queues.request.put(Message::execute("x = 1", Bindings::new()));
    let reply = queues
        .response
        .take_timeout(Duration::from_millis(50))
        .expect("queue still open");
    assert!(reply.is_none(), "closed engine replied: {reply:?}");
}

#[test]
fn unknown_commands_are_reported_and_survived() {
    let (_host, service) = start();
    let reply = service.request(Message::bare(Command::Execution)).expect("reply");
    assert_eq!(reply.command, Command::Exception);
    assert_eq!(
        reply.error().map(|e| e.message.as_str()),
        Some("Unknown command: EXECUTION")
    );

    let queues = service.new_engine().expect("service still serving");
    queues.request.put(Message::bare(Command::CloseService));
    let reply = queues.response.take().expect("engine reply");
    assert_eq!(
        reply.error().map(|e| e.message.as_str()),
        Some("Unknown command: CLOSE_SERVICE")
    );
    queues.request.put(Message::evaluate("1", Bindings::new()));
    assert_eq!(queues.response.take().expect("reply").value(), Some(HostValue::Int(1)));
    queues.request.put(Message::bare(Command::CloseEngine));
}

#[test]
fn context_file_name_is_reported() {
    let (host, service) = start();
    let engine = ScriptEngineClient::new(&service).expect("engine");
    let name = host.new_string("nightly.py").expect("string");
    let mut bindings = Bindings::new();
    bindings.insert(
        service.config().filename_key.clone(),
        HostValue::Object(name),
    );
    let script = "a = 1\nb = 2\nc = a / 0";
    match engine.execute(script, bindings) {
        Err(DispatchError::Script(exception)) => {
            assert_eq!(exception.file_name, "nightly.py");
            assert_eq!(exception.line_number, Some(3));
            assert!(exception.message.contains("ZeroDivisionError"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn concurrent_clients_get_their_own_engines() {
    let (host, service) = start();
    let service = Arc::new(service);
    let workers: Vec<_> = (0..4)
        .map(|n| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let engine = ScriptEngineClient::new(&service).expect("engine");
                let mut bindings = Bindings::new();
                bindings.insert("n".to_string(), HostValue::Int(n));
                engine.execute("mine = n * 10", bindings).expect("execute");
                engine.eval("mine + 1", Bindings::new()).expect("eval")
            })
        })
        .collect();
    let mut results: Vec<HostValue> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker thread"))
        .collect();
    results.sort_by_key(|value| value.as_i64());
    assert_eq!(
        results,
        vec![HostValue::Int(1), HostValue::Int(11), HostValue::Int(21), HostValue::Int(31)]
    );

    assert!(wait_for(|| service.engine_count() == 0));
    service.stop();
    assert!(wait_for(|| host.attached_threads() == 0));
    assert_eq!(host.attach_events(), host.detach_events());
}

#[test]
fn stopped_service_leaves_running_engines_alone() {
    let (_host, service) = start();
    let engine = ScriptEngineClient::new(&service).expect("engine");
    service.stop();
    assert!(!service.is_running());
    assert_eq!(engine.eval("6 * 7", Bindings::new()).expect("eval"), HostValue::Int(42));
}

//=====================================================
// End of file
//=====================================================
