//! Reporting of fatal errors
//!
//! Errors that a user can fix (bad configuration, missing queue) are printed
//! verbatim. Everything else gets a generic context line, with the full error
//! only at debug level.

/// Errors that know whether their message is meant for the user
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<&str>;
}

/// Log `error` as fatal, choosing between its own message and `operation_context`
///
/// # Examples
/// ```rust,no_run
/// use msgpipe::core::error_handling::log_error_with_context;
/// use msgpipe::consumer::ConsumerError;
///
/// let error = ConsumerError::not_initialized("queue");
/// log_error_with_context(&error, "Starting consumer");
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
