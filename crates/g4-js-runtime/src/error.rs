//! Error types for the plugin sandbox.

/// Errors raised by the engine itself, never by plugin code.
///
/// Exceptions thrown by a plugin script or handler are not errors at this
/// level: they are captured into the plugin's console (see [`crate::Fault`]).
#[derive(Debug, thiserror::Error)]
pub enum JsError {
    #[error("Failed to create runtime: {0}")]
    RuntimeCreation(String),

    #[error("Failed to install plugin API: {0}")]
    Install(String),

    #[error("Type conversion error: {0}")]
    Conversion(String),
}

pub type JsResult<T> = Result<T, JsError>;
