//! Error types for decoding values that cross the plugin boundary

use thiserror::Error;

/// Errors raised while decoding data handed over by a plugin
///
/// These never describe a "not a plugin" condition; they mean a module that
/// already passed probing returned malformed data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("string is not valid UTF-16")]
    InvalidUtf16,

    #[error("string is not NUL-terminated within {0} code units")]
    UnterminatedString(usize),

    #[error("timestamp tick count {0} is outside the representable range")]
    TicksOutOfRange(u64),

    #[error("local time {0} does not exist in the host time zone")]
    NonexistentLocalTime(String),
}
