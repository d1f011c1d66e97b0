//=====================================================
// File: evaluator.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Execute and evaluate scripts for one engine
// Objective: Marshal the request context into the engine namespace, run the
//            script, and turn failures into host-visible exceptions
//=====================================================

use std::io::Write;

use tracing::{debug, info};

use crate::bridge::context::{self, Bindings};
use crate::config::BridgeConfig;
use crate::error::ScriptException;
use crate::host::{HostValue, SharedHost};
use crate::script::{Interpreter, ScriptError, Value};

/// Per-engine script runner. Lives on the engine's worker thread only.
pub struct ScriptEvaluator {
    host: SharedHost,
    config: BridgeConfig,
    interpreter: Interpreter,
}

impl ScriptEvaluator {
    pub fn new(host: SharedHost, config: &BridgeConfig) -> Self {
        Self {
            host,
            config: config.clone(),
            interpreter: Interpreter::new().with_max_depth(config.max_recursion_depth),
        }
    }

    /// Redirect `print` output.
    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.interpreter = self.interpreter.with_output(output);
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn execute(&mut self, script: &str, bindings: &Bindings) -> Result<(), ScriptException> {
        let file_name = self.script_name(bindings);
        debug!(file = %file_name, script, "executing script");
        self.prepare(bindings)
            .and_then(|_| self.interpreter.exec_source(script))
            .map_err(|err| self.exception(err, &file_name))
    }

    /// Run `script` and return the value of its trailing expression, or `None`.
    pub fn evaluate(&mut self, script: &str, bindings: &Bindings) -> Result<Value, ScriptException> {
        let file_name = self.script_name(bindings);
        debug!(file = %file_name, script, "evaluating script");
        self.prepare(bindings)
            .and_then(|_| self.interpreter.eval_source(script))
            .map_err(|err| self.exception(err, &file_name))
    }

    /// [`evaluate`](Self::evaluate) followed by conversion to a host value.
    pub fn evaluate_to_host(
        &mut self,
        script: &str,
        bindings: &Bindings,
    ) -> Result<HostValue, ScriptException> {
        let value = self.evaluate(script, bindings)?;
        context::to_host(&self.host, &value).map_err(|err| {
            let file_name = self.script_name(bindings);
            self.exception(ScriptError::from(err), &file_name)
        })
    }

    fn prepare(&mut self, bindings: &Bindings) -> Result<(), ScriptError> {
        context::marshal(&self.host, bindings, self.interpreter.globals_mut())
            .map_err(ScriptError::from)
    }

    fn script_name(&self, bindings: &Bindings) -> String {
        bindings
            .get(&self.config.filename_key)
            .and_then(HostValue::as_handle)
            .and_then(|handle| self.host.read_string(handle).ok().flatten())
            .unwrap_or_else(|| self.config.default_script_name.clone())
    }

    fn exception(&self, err: ScriptError, file_name: &str) -> ScriptException {
        let exception = ScriptException::new(
            format!("Python exception: {}", err.repr()),
            file_name,
            err.line(),
        );
        info!(code = err.code_str(), %exception, "script raised");
        exception
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::InMemoryHost;
    use crate::host::HostRuntime;
    use crate::script::OutputBuffer;

    fn evaluator() -> (ScriptEvaluator, SharedHost) {
        let host: SharedHost = InMemoryHost::shared();
        (ScriptEvaluator::new(host.clone(), &BridgeConfig::default()), host)
    }

    #[test]
    fn trailing_expression_is_the_result() {
        let (mut eval, _) = evaluator();
        let value = eval.evaluate("x = 1\nx + 1", &Bindings::new()).expect("evaluate");
        assert!(matches!(value, Value::Int(2)));
    }

    #[test]
    fn statement_only_scripts_evaluate_to_none() {
        let (mut eval, _) = evaluator();
        let value = eval.evaluate("y = 3", &Bindings::new()).expect("evaluate");
        assert!(matches!(value, Value::None));
    }

    #[test]
    fn namespace_persists_across_requests() {
        let (mut eval, _) = evaluator();
        eval.execute("counter = 41", &Bindings::new()).expect("execute");
        let value = eval.evaluate("counter + 1", &Bindings::new()).expect("evaluate");
        assert!(matches!(value, Value::Int(42)));
    }

    #[test]
    fn raised_exceptions_carry_message_and_line() {
        let (mut eval, _) = evaluator();
        let err = eval
            .execute("a = 1\nraise RuntimeError('boom')", &Bindings::new())
            .expect_err("should raise");
        assert_eq!(err.message, "Python exception: RuntimeError('boom')");
        assert_eq!(err.file_name, "scripting-python");
        assert_eq!(err.line_number, Some(2));
    }

    #[test]
    fn file_name_comes_from_the_context() {
        let (mut eval, host) = evaluator();
        let name = host.new_string("report.py").expect("string");
        let mut bindings = Bindings::new();
        bindings.insert(BridgeConfig::default().filename_key, HostValue::Object(name));
        let err = eval.execute("undefined_name", &bindings).expect_err("should raise");
        assert_eq!(err.file_name, "report.py");
        assert!(err.message.starts_with("Python exception: NameError("));
    }

    #[test]
    fn syntax_errors_become_exceptions() {
        let (mut eval, _) = evaluator();
        let err = eval.execute("def broken(:\n  pass", &Bindings::new()).expect_err("syntax");
        assert!(err.message.starts_with("Python exception: SyntaxError("));
        assert_eq!(err.line_number, Some(1));
    }

    #[test]
    fn context_values_are_visible_and_results_convert() {
        let (mut eval, host) = evaluator();
        let greeting = host.new_string("hello").expect("string");
        let mut bindings = Bindings::new();
        bindings.insert("greeting".to_string(), HostValue::Object(greeting));
        bindings.insert("count".to_string(), HostValue::Int(4));
        let result = eval
            .evaluate_to_host("greeting.upper() + str(count)", &bindings)
            .expect("evaluate");
        let handle = result.as_handle().expect("string handle");
        assert_eq!(host.read_string(handle).expect("read"), Some("HELLO4".to_string()));
    }

    #[test]
    fn print_goes_to_the_configured_output() {
        let host: SharedHost = InMemoryHost::shared();
        let buffer = OutputBuffer::new();
        let mut eval =
            ScriptEvaluator::new(host, &BridgeConfig::default()).with_output(buffer.clone());
        eval.execute("print('hi', 2)", &Bindings::new()).expect("execute");
        assert_eq!(buffer.contents(), "hi 2\n");
    }
}

//=====================================================
// End of file
//=====================================================
