use thiserror::Error;

/// Errors raised while building or applying the guard.
///
/// `Configuration` is fatal at activation time.  `MalformedMessage` never
/// leaves a sanitizer: the offending field is left untouched, the event is
/// logged and the transport-level hook remains the backstop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}
