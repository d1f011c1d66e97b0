//=====================================================
// File: config.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Bridge configuration loading and defaults
// Objective: Describe thread names, script naming, and logging defaults in
//            a TOML document that can be loaded and saved
//=====================================================

//! Configuration for the dispatcher, evaluator and logging layers.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Context key holding the logical script name.
pub const FILENAME_KEY: &str = "javax.scripting.filename";

/// Configuration model loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the service (engine requester) thread.
    pub service_thread_name: String,
    /// Name given to every engine worker thread.
    pub engine_thread_name: String,
    /// File name reported in exceptions when the context does not name the script.
    pub default_script_name: String,
    /// Context key that carries the script's file name.
    pub filename_key: String,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
    /// Maximum nested call depth inside the interpreter.
    pub max_recursion_depth: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            service_thread_name: "Scripting-Python Engine Requester".to_string(),
            engine_thread_name: "Scripting-PythonEngine".to_string(),
            default_script_name: "scripting-python".to_string(),
            filename_key: FILENAME_KEY.to_string(),
            log_filter: "info".to_string(),
            max_recursion_depth: 256,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(data: &str) -> anyhow::Result<Self> {
        toml::from_str(data).context("parsing bridge configuration")
    }

    /// Load configuration from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading configuration from {}", path.display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("parsing configuration {}", path.display()))
    }

    /// Persist the configuration back to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let serialized = toml::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let cfg = BridgeConfig::from_toml_str("engine_thread_name = \"worker\"\n")
            .expect("parse config");
        assert_eq!(cfg.engine_thread_name, "worker");
        assert_eq!(cfg.default_script_name, "scripting-python");
        assert_eq!(cfg.max_recursion_depth, 256);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = BridgeConfig::load(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(BridgeConfig::from_toml_str("max_recursion_depth = \"deep\"").is_err());
    }
}

//=====================================================
// End of file
//=====================================================
