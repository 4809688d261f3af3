//! Fatal error reporting shared by the CLI and the engine
//!
//! Errors a user can fix (bad arguments, a missing scanner) are shown as
//! they are. Everything else is reported by the operation that failed, with
//! the error itself only at debug level.

/// Errors that know whether their message is fit for the user
///
/// `user_message` returns `Some` exactly when `is_user_actionable` is true.
pub trait ContextualError: std::error::Error {
    /// True for configuration and validation failures with a clear fix
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<&str>;
}

/// The line reported for `error` raised while doing `operation_context`
pub fn fatal_message<E: ContextualError>(error: &E, operation_context: &str) -> String {
    match error.user_message() {
        Some(message) if error.is_user_actionable() => format!("FATAL: {}", message),
        _ => format!("FATAL: {}", operation_context),
    }
}

/// Log a fatal error at ERROR, with its detail at DEBUG
///
/// ```rust,no_run
/// # use clamsweep::core::error_handling::log_error_with_context;
/// # use clamsweep::core::validation::ValidationError;
/// # use clamsweep::scanner::api::{EngineError, ScanResult};
/// // Logs "FATAL: Batch size must be greater than 0"
/// log_error_with_context(
///     &ValidationError::new("Batch size must be greater than 0"),
///     "Loading configuration",
/// );
///
/// // Logs "FATAL: Scanning files"; the reason goes to DEBUG
/// let pool_err = EngineError::PoolFailure {
///     reason: "scanner terminated by signal".to_string(),
///     partial: Box::new(ScanResult::empty(10)),
/// };
/// log_error_with_context(&pool_err, "Scanning files");
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    log::error!("{}", fatal_message(error, operation_context));
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
