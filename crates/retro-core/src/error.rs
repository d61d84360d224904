//! Error types for the core room logic.
//!
//! Room operations themselves are infallible: denials and stale requests
//! are no-ops. Errors only arise when parsing identifiers coming from the
//! outside world (wire payloads, configuration).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The category identifier is not one of the three known columns.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// The duplicate-username policy name is not recognized.
    #[error("unknown duplicate-username policy: {0} (expected \"takeover\" or \"reject\")")]
    UnknownPolicy(String),
}
