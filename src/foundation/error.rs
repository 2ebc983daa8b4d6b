use crate::render::error::RenderError;
use crate::vm::error::VmFault;

/// Convenience result type used across marquee.
pub type MarqueeResult<T> = Result<T, MarqueeError>;

/// Top-level error taxonomy used by runtime entry points.
#[derive(thiserror::Error, Debug)]
pub enum MarqueeError {
    /// The movie description is malformed (bad references, missing byte-code images).
    #[error("load error: {0}")]
    Load(String),

    /// A script halted with a structural fault.
    #[error("vm fault: {0}")]
    Vm(#[from] VmFault),

    /// The renderer could not prepare or submit geometry.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Errors when serializing or deserializing movie descriptions and options.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarqueeError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for MarqueeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
