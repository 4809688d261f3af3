//! Scanner Engine Error Types

use crate::scanner::types::ScanResult;

/// Fatal engine errors
///
/// Per-file problems never show up here; they are folded into the
/// [`ScanResult`] as `Verdict::ScanError` entries. Only conditions that stop a
/// run (or prevent one from starting) are represented.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid configuration or no usable scanner, raised before any work starts
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The worker pool could not make progress; carries what was completed
    #[error("Worker pool failure: {reason}")]
    PoolFailure {
        reason: String,
        partial: Box<ScanResult>,
    },

    /// IO operation failed outside any single file's scan
    #[error("IO error: {message}")]
    Io { message: String },
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration {
            message: message.into(),
        }
    }

    /// Partial result of an aborted run, if the error carries one
    pub fn partial_result(&self) -> Option<&ScanResult> {
        match self {
            EngineError::PoolFailure { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

impl crate::core::error_handling::ContextualError for EngineError {
    fn is_user_actionable(&self) -> bool {
        match self {
            EngineError::Configuration { .. } => true, // User can fix config issues
            EngineError::PoolFailure { .. } => false,  // Scanner/system issues
            EngineError::Io { .. } => false,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            EngineError::Configuration { message } => Some(message),
            _ => None,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
