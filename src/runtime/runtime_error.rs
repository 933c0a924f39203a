use crate::lang::Value;

/// Broad classes of runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A process exhausted its instruction budget with work still pending.
    Runaway,
    StackUnderflow,
    TypeMismatch,
    /// Division by zero or integer overflow.
    Arithmetic,
    /// A number outside the range its command accepts.
    OutOfRange,
    /// A strict assignment found no existing binding.
    Unbound,
    /// The deferred-effect workers could not be started.
    Effects,
    /// A scheduler setting, such as the tempo, is out of range.
    Config,
}

#[derive(Debug)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub call_stack: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.message)?;

        if !self.call_stack.is_empty() {
            write!(f, "\n  call stack:")?;

            for (i, frame) in self.call_stack.iter().rev().enumerate() {
                write!(f, "\n    {}: {}", i, frame)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            call_stack: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.call_stack.push(context.to_string());
        self
    }

    pub fn is_runaway(&self) -> bool {
        self.kind == ErrorKind::Runaway
    }
}

pub fn runaway(budget: usize) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::Runaway,
        format!(
            "instruction limit reached ({}), probably an infinite loop",
            budget
        ),
    )
}

pub fn stack_underflow() -> RuntimeError {
    RuntimeError::new(ErrorKind::StackUnderflow, "stack underflow")
}

pub fn type_error(expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::TypeMismatch,
        format!("expected {}, got {} ({})", expected, got.type_name(), got),
    )
}

pub fn unbound(id: &str) -> RuntimeError {
    RuntimeError::new(ErrorKind::Unbound, format!("no binding for '{}'", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_call_stack() {
        let err = runaway(3).with_context("@loop").with_context("proc7");
        let text = err.to_string();
        assert!(text.starts_with("runtime error: instruction limit reached (3)"));
        assert!(text.contains("0: proc7"));
        assert!(text.contains("1: @loop"));
        assert!(err.is_runaway());
    }

    #[test]
    fn test_type_error_names_value() {
        let err = type_error("number", &Value::from("kick"));
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.message, "expected number, got string (kick)");
    }
}
