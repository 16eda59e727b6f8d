//! Fatal error reporting for the command-line front end

/// Errors that know whether their message is meant for the user
///
/// A user-actionable error (bad flag, invalid configuration value) carries a
/// message that tells the user what to fix, and `user_message` returns it.
/// Anything else (I/O failure, cancelled run) returns `None` and is reported
/// with the operation context only.
pub trait ContextualError: std::error::Error {
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<&str>;
}

/// The line logged at `error` level for `error` while performing `operation_context`
pub fn fatal_message<E: ContextualError>(error: &E, operation_context: &str) -> String {
    match error.user_message() {
        Some(message) if error.is_user_actionable() => format!("FATAL: {}", message),
        _ => format!("FATAL: {}", operation_context),
    }
}

/// Log `error` as fatal; details go to the debug level
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    log::error!("{}", fatal_message(error, operation_context));
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
