use std::str::Utf8Error;

/// Errors a mod callback can report back to the host.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModError {
    /// The callback ran but could not complete
    #[error("mod callback failed: {0}")]
    Failed(String),
    /// A string-with-length did not hold valid UTF-8
    #[error("invalid mod string: {0}")]
    InvalidString(#[from] Utf8Error),
    /// The callback panicked; the host caught it at the boundary
    #[error("mod panicked: {0}")]
    Panicked(String),
}

impl ModError {
    pub fn failed(message: impl Into<String>) -> Self {
        ModError::Failed(message.into())
    }

    /// Converts a caught panic payload into an error.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        ModError::Panicked(message)
    }
}
