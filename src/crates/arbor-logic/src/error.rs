//! Errors for the relation wire format.

use thiserror::Error;

/// Failures decoding a serialised relation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The buffer cannot even hold the header.
    #[error("relation buffer too small ({len} bytes, need at least 16)")]
    ShortBuffer { len: usize },

    /// The magic prefix did not match.
    #[error("bad relation magic")]
    BadMagic,

    /// The declared tuple count does not fit in the buffer.
    #[error("relation data truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
}
