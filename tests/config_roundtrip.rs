//=====================================================
// File: tests/config_roundtrip.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Configuration persistence checks
// Objective: Save and reload bridge configuration and confirm the loaded
//            names drive the dispatcher threads
//=====================================================

use solvra_pybridge::host::HostRuntime;
use solvra_pybridge::{Bindings, BridgeConfig, InMemoryHost, ScriptEngineClient, Service};

#[test]
fn saved_configuration_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bridge.toml");
    let config = BridgeConfig {
        engine_thread_name: "py-worker".to_string(),
        default_script_name: "batch".to_string(),
        max_recursion_depth: 64,
        ..BridgeConfig::default()
    };
    config.save(&path).expect("save");
    let loaded = BridgeConfig::load(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn malformed_file_reports_its_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "engine_thread_name = [").expect("write");
    let err = BridgeConfig::load(&path).expect_err("invalid toml");
    assert!(format!("{err:#}").contains("broken.toml"));
}

#[test]
fn loaded_names_reach_engines() {
    let config = BridgeConfig::from_toml_str(
        "engine_thread_name = \"py-worker\"\ndefault_script_name = \"batch\"\n",
    )
    .expect("parse");
    let host = InMemoryHost::shared();
    let service = Service::start(host.clone(), config).expect("service");
    let engine = ScriptEngineClient::new(&service).expect("engine");
    let records = service.engines();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].thread_name, "py-worker");

    let err = engine.execute("missing", Bindings::new()).expect_err("NameError");
    assert!(err.to_string().contains(" in batch at line number 1"));

    let text = engine.eval("'from ' + 'engine'", Bindings::new()).expect("eval");
    let handle = text.as_handle().expect("string handle");
    assert_eq!(host.read_string(handle).expect("read"), Some("from engine".to_string()));
}

//=====================================================
// End of file
//=====================================================
