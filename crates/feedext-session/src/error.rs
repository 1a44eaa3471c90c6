//! Error type for the session-data extension.

use thiserror::Error;

/// Local session data exceeded the 256-byte wire ceiling.
///
/// Raised only on the local set path. Oversize payloads *received* from
/// peers are truncated instead of rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("session data can not exceed 256 bytes in length (got {len})")]
pub struct SessionDataTooLarge {
    /// Byte length of the rejected payload.
    pub len: usize,
}
