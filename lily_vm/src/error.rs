//! Runtime errors. All fatal: the VM unwinds to its caller and stops.

use std::fmt;

use backtrace::Backtrace;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Captured when `LILY_BACKTRACE` is set.
    pub backtrace: Option<Box<Backtrace>>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind) -> Self {
        let backtrace = if std::env::var_os("LILY_BACKTRACE").is_some() {
            Some(Box::new(Backtrace::new_unresolved()))
        } else {
            None
        };
        RuntimeError { kind, backtrace }
    }

    pub fn print_backtrace(&mut self) {
        if let Some(backtrace) = &mut self.backtrace {
            backtrace.resolve();
            log::error!("{backtrace:?}");
        }
    }
}

impl From<RuntimeErrorKind> for RuntimeError {
    fn from(kind: RuntimeErrorKind) -> Self {
        RuntimeError::new(kind)
    }
}

impl PartialEq for RuntimeError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack is empty")]
    StackEmpty,
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("integer overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("out of memory")]
    MemoryExhausted,
    /// `@sys.exit(code)` — a runtime stop, observable by the embedder
    /// instead of killing the process.
    #[error("process exited with code {0}")]
    Exit(i32),
}

/// Shorthand used throughout the interpreter.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

pub(crate) fn unreachable_inst(what: impl fmt::Display) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::Unreachable(what.to_string()))
}
