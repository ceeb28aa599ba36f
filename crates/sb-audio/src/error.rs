//! Audio error types
//!
//! Failure classes are kept distinguishable so callers can react per
//! class: an activation failure and a port-connection failure both
//! leave the driver unusable, but only the latter is worth retrying
//! before falling back to the null driver.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio server unavailable: {0}")]
    ServerUnavailable(String),

    #[error("client activation failed: {0}")]
    ActivationFailed(String),

    #[error("output port registration failed: {0}")]
    PortRegistration(String),

    #[error("output port connection failed: {0}")]
    PortConnection(String),

    #[error("driver not initialized")]
    NotInitialized,

    #[error("render target error: {0}")]
    Render(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
