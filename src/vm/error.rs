/// Structural interpreter faults.
///
/// These halt the offending frame and propagate to the embedder. Coercion problems never
/// produce a fault; they degrade to dialect default values instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum VmFault {
    #[error("stack underflow in {op}: needs {needed}, has {available}")]
    StackUnderflow {
        op: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("jump target {target} outside code of length {len}")]
    InvalidJump { target: i64, len: usize },

    #[error("constant index {0} out of range")]
    InvalidConstant(u32),

    #[error("register {0} out of range")]
    InvalidRegister(u8),

    #[error("function index {0} out of range")]
    InvalidFunction(u32),

    #[error("missing byte-code image: {0}")]
    MissingImage(String),

    #[error("value is not callable: {0}")]
    NotCallable(String),

    #[error("call depth limit {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("halted by debugger at script {script} line {line}")]
    DebuggerBreak { script: u32, line: u32 },

    #[error("native error: {0}")]
    Native(String),
}

impl VmFault {
    pub fn native(msg: impl Into<String>) -> Self {
        Self::Native(msg.into())
    }
}
