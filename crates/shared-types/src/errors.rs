//! # Error Types
//!
//! Errors raised while parsing ledger primitives.

use thiserror::Error;

/// Errors from parsing addresses, hashes and payload handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input decoded to the wrong number of bytes.
    #[error("Invalid {kind} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Type being parsed.
        kind: &'static str,
        /// Required width.
        expected: usize,
        /// Width received.
        actual: usize,
    },

    /// Input was not valid hex.
    #[error("Invalid {kind} hex: {reason}")]
    InvalidHex {
        /// Type being parsed.
        kind: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// Input was not valid base64.
    #[error("Invalid {kind} base64: {reason}")]
    InvalidBase64 {
        /// Type being parsed.
        kind: &'static str,
        /// Decoder message.
        reason: String,
    },
}
