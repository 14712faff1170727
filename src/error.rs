//! # Error Types
//!
//! This module provides the error types used throughout the tsio library.
//! It defines a central error type `TsError` that encapsulates all failures
//! that can occur while parsing or serializing transport stream data.
//!
//! ## Example Usage
//!
//! ```rust
//! use tsio::error::{Result, TsError};
//!
//! fn check_sync(data: &[u8]) -> Result<()> {
//!     if data.first() != Some(&0x47) {
//!         return Err(TsError::MissingSyncByte);
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Primary error type for the tsio library
#[derive(Error, Debug)]
pub enum TsError {
    /// The underlying byte sink rejected a write; the writer latches this
    /// error and ignores all subsequent writes
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A reader was asked for more bytes than remain in its buffer
    #[error("read past end of data")]
    BufferUnderrun,

    /// A packet candidate did not start with the 0x47 sync byte
    #[error("packet must start with a sync byte")]
    MissingSyncByte,

    /// A serialized packet would exceed the target packet size
    #[error("can't write {payload} bytes of payload: only {available} available")]
    PayloadOverflow {
        /// Payload length the caller asked to write
        payload: usize,
        /// Bytes left before the target packet size
        available: usize,
    },

    /// An inner parser failed; carries the name of the structure being parsed
    #[error("parsing {0} failed: {1}")]
    Parse(&'static str, #[source] Box<TsError>),

    /// The packet was rejected by a caller-supplied skip predicate.
    /// This is a sentinel, not a failure; callers filtering packets should
    /// test for it with [`TsError::is_skipped`]
    #[error("skipped packet")]
    SkippedPacket,

    /// Malformed or out-of-range input that fits no dedicated variant
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl TsError {
    /// Returns true if this error is the skipped-packet sentinel, possibly
    /// wrapped in parse context
    pub fn is_skipped(&self) -> bool {
        match self {
            TsError::SkippedPacket => true,
            TsError::Parse(_, inner) => inner.is_skipped(),
            _ => false,
        }
    }
}

/// A specialized Result type for tsio operations
pub type Result<T> = std::result::Result<T, TsError>;

/// Attaches the name of the structure being parsed to an error.
///
/// Mirrors the propagation policy of the parsers: the first error wins and
/// is wrapped with just enough context to name the failing structure.
pub(crate) trait ResultExt<T> {
    fn context(self, what: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, what: &'static str) -> Result<T> {
        self.map_err(|e| TsError::Parse(what, Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain() {
        let err: Result<()> = Err(TsError::BufferUnderrun);
        let err = err.context("AC3 descriptor").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parsing AC3 descriptor failed: read past end of data"
        );
    }

    #[test]
    fn test_is_skipped_through_context() {
        let err: Result<()> = Err(TsError::SkippedPacket);
        let err = err.context("packet").unwrap_err();
        assert!(err.is_skipped());
        assert!(!TsError::BufferUnderrun.is_skipped());
    }
}
