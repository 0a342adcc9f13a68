//! Evaluation capability behind the `__PYTHON__` and `__SYSTEM__` pseudo-macros.
//!
//! Content files can run expressions and shell commands through these two
//! names. The capability is opt-in: the default evaluator refuses every
//! request and the host evaluator is only installed with `--allow-eval`.

use std::process::{Command, Stdio};

use crate::constants::{EVAL_MACRO, SYSTEM_MACRO};
use crate::error::{Error, Result};

/// Trait for evaluation backends.
pub trait Evaluator {
    /// Evaluates an expression and returns its textual value.
    fn evaluate(&self, expression: &str) -> Result<String>;

    /// Runs a shell command and returns its standard output.
    fn execute(&self, command: &str) -> Result<String>;
}

/// Evaluator used unless evaluation is explicitly allowed.
#[derive(Debug, Default)]
pub struct DisabledEvaluator;

impl Evaluator for DisabledEvaluator {
    fn evaluate(&self, _expression: &str) -> Result<String> {
        Err(Error::EvaluationDisabledError { name: EVAL_MACRO.to_string() })
    }

    fn execute(&self, _command: &str) -> Result<String> {
        Err(Error::EvaluationDisabledError { name: SYSTEM_MACRO.to_string() })
    }
}

/// Evaluates expressions with `evalexpr` and runs commands through `sh -c`.
#[derive(Debug, Default)]
pub struct HostEvaluator;

impl HostEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for HostEvaluator {
    fn evaluate(&self, expression: &str) -> Result<String> {
        let value =
            evalexpr::eval(expression).map_err(|e| Error::EvaluationError(e.to_string()))?;
        Ok(match value {
            evalexpr::Value::String(s) => s,
            evalexpr::Value::Empty => String::new(),
            other => other.to_string(),
        })
    }

    fn execute(&self, command: &str) -> Result<String> {
        log::debug!("Running command '{command}'");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(Error::IoError)?;

        if !output.status.success() {
            return Err(Error::CommandError(format!(
                "`{}` failed with status: {}",
                command, output.status
            )));
        }

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.ends_with('\n') {
            stdout.pop();
        }
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_evaluator_refuses() {
        let evaluator = DisabledEvaluator;
        assert!(matches!(
            evaluator.evaluate("1 + 1"),
            Err(Error::EvaluationDisabledError { .. })
        ));
        assert!(matches!(
            evaluator.execute("echo hi"),
            Err(Error::EvaluationDisabledError { .. })
        ));
    }

    #[test]
    fn test_host_evaluate() {
        let evaluator = HostEvaluator::new();
        assert_eq!(evaluator.evaluate("1 + 2 * 3").unwrap(), "7");
        assert_eq!(evaluator.evaluate("\"a\" + \"b\"").unwrap(), "ab");
        assert!(evaluator.evaluate("1 +").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_host_execute() {
        let evaluator = HostEvaluator::new();
        assert_eq!(evaluator.execute("echo hello").unwrap(), "hello");
        assert!(evaluator.execute("exit 3").is_err());
    }
}
