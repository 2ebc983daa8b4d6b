use std::cell::RefCell;

/// Non-fatal conditions a script run reports to its host.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("write to read-only member `{0}` ignored")]
    ReadOnlyWrite(String),

    #[error("export `{0}` not found")]
    MissingExport(String),

    #[error("timeline target not found")]
    TargetNotFound,

    #[error("array length {0} out of range, write ignored")]
    ArrayLengthOutOfRange(f64),

    #[error("script {script} halted: {message}")]
    ScriptFault { script: u32, message: String },
}

/// Output capability used by `Trace` and by warnings.
pub trait Host {
    fn trace(&self, message: &str);

    fn warn(&self, warning: &Warning);
}

/// Prints traces to stdout and forwards warnings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeHost;

impl Host for NativeHost {
    fn trace(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, warning: &Warning) {
        tracing::warn!(%warning, "script warning");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHost;

impl Host for NoOpHost {
    fn trace(&self, _message: &str) {}

    fn warn(&self, _warning: &Warning) {}
}

/// Records every trace and warning line.
#[derive(Debug, Default)]
pub struct LoggedHost {
    logs: RefCell<Vec<String>>,
}

impl LoggedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.logs.borrow().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.logs.borrow_mut())
    }
}

impl Host for LoggedHost {
    fn trace(&self, message: &str) {
        self.logs.borrow_mut().push(message.to_string());
    }

    fn warn(&self, warning: &Warning) {
        self.logs.borrow_mut().push(warning.to_string());
    }
}
