//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: solvra-pybridge CLI entry point
// Objective: Run a script file through a script engine service on the
//            in-memory host and report the result or the exception
//=====================================================

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::json;

use solvra_pybridge::host::HostRuntime;
use solvra_pybridge::{
    logging, Bindings, BridgeConfig, DispatchError, HostValue, InMemoryHost, ScriptEngineClient,
    Service, SharedHost,
};

#[derive(Parser, Debug)]
#[command(name = "solvra-pybridge", about = "Python script engine bridge")]
pub struct Args {
    /// TOML configuration file.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a script for its side effects.
    Exec(ScriptArgs),
    /// Evaluate a script and print the value of its trailing expression.
    Eval(ScriptArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScriptArgs {
    /// Script file to run.
    pub script: PathBuf,

    /// Context binding, repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Print the outcome as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    logging::init("solvra-pybridge", &config.log_filter);

    let (script_args, evaluate) = match &args.command {
        Command::Exec(script_args) => (script_args, false),
        Command::Eval(script_args) => (script_args, true),
    };
    let source = fs::read_to_string(&script_args.script)
        .with_context(|| format!("reading script {}", script_args.script.display()))?;

    let host: SharedHost = InMemoryHost::shared();
    let mut bindings = parse_bindings(&host, &script_args.set)?;
    let file_name = script_args.script.display().to_string();
    let name_handle = host
        .new_string(&file_name)
        .map_err(|err| anyhow!("creating script name: {err}"))?;
    bindings
        .entry(config.filename_key.clone())
        .or_insert(HostValue::Object(name_handle));

    let service = Service::start(host.clone(), config).context("starting script engine service")?;
    let engine = ScriptEngineClient::new(&service).context("creating script engine")?;

    let outcome = if evaluate {
        engine.eval(&source, bindings).map(Some)
    } else {
        engine.execute(&source, bindings).map(|_| None)
    };
    drop(engine);
    service.stop();

    match outcome {
        Ok(value) => {
            let rendered = value.map(|value| render(&host, value)).transpose()?;
            if script_args.json {
                println!("{}", json!({ "status": "ok", "result": rendered }));
            } else if let Some(rendered) = rendered {
                println!("{rendered}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(DispatchError::Script(exception)) => {
            if script_args.json {
                println!(
                    "{}",
                    json!({
                        "status": "exception",
                        "message": exception.message,
                        "file": exception.file_name,
                        "line": exception.line_number,
                    })
                );
            } else {
                eprintln!("{exception}");
            }
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

/// `key=value` pairs; integers, floats and booleans keep their type, the rest become strings.
fn parse_bindings(host: &SharedHost, pairs: &[String]) -> Result<Bindings> {
    let mut bindings = Bindings::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("binding '{pair}' is not KEY=VALUE"))?;
        let value = if let Ok(int) = raw.parse::<i32>() {
            HostValue::Int(int)
        } else if let Ok(long) = raw.parse::<i64>() {
            HostValue::Long(long)
        } else if let Ok(float) = raw.parse::<f64>() {
            HostValue::Double(float)
        } else if let Ok(flag) = raw.parse::<bool>() {
            HostValue::Boolean(flag)
        } else {
            let handle = host
                .new_string(raw)
                .map_err(|err| anyhow!("creating string for '{key}': {err}"))?;
            HostValue::Object(handle)
        };
        bindings.insert(key.to_string(), value);
    }
    Ok(bindings)
}

fn render(host: &SharedHost, value: HostValue) -> Result<String> {
    Ok(match value {
        HostValue::Null => "null".to_string(),
        HostValue::Boolean(flag) => flag.to_string(),
        HostValue::Byte(n) => n.to_string(),
        HostValue::Short(n) => n.to_string(),
        HostValue::Int(n) => n.to_string(),
        HostValue::Long(n) => n.to_string(),
        HostValue::Float(x) => x.to_string(),
        HostValue::Double(x) => x.to_string(),
        HostValue::Char(c) => c.to_string(),
        HostValue::Object(handle) => host
            .to_display_string(handle)
            .map_err(|err| anyhow!("rendering result: {err}"))?,
    })
}

//=====================================================
// End of file
//=====================================================
