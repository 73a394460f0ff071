//! Error types for Synheart Readiness

use thiserror::Error;

/// Errors that can occur while running or scoring a readiness test
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("Subject identifier is required to start a readiness test")]
    MissingSubject,

    #[error("No session id available at finalization")]
    MissingSession,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Session already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("Event belongs to session {found}, expected {expected}")]
    ForeignEvent { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse payload: {0}")]
    ParseError(String),
}
