use std::fmt;

use thiserror::Error;

/// Why a single capture attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct CaptureError {
    pub kind: FailureKind,
    pub message: String,
}

impl CaptureError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Launch,
    Connection,
    Protocol,
    Context,
    Navigation,
    Timeout,
    Screenshot,
    Artifact,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Launch => write!(f, "browser launch failed"),
            FailureKind::Connection => write!(f, "browser connection lost"),
            FailureKind::Protocol => write!(f, "protocol error"),
            FailureKind::Context => write!(f, "could not open rendering context"),
            FailureKind::Navigation => write!(f, "navigation failed"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Screenshot => write!(f, "screenshot failed"),
            FailureKind::Artifact => write!(f, "could not write image"),
        }
    }
}
