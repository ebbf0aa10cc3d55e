//! Error types for LZW decompression.
//!
//! Short reads and short writes are suspension statuses, not errors. The
//! internal-error variant reports a decoder bug, never bad input;
//! [`LzwError::is_internal`] distinguishes it.

use thiserror::Error;

/// A fatal LZW decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LzwError {
    /// A code beyond the highest assigned dictionary entry.
    #[error("bad code: {code}")]
    BadCode {
        /// The offending code.
        code: u16,
    },

    /// A literal width outside 0..=8.
    #[error("bad literal width: {width}")]
    BadLiteralWidth {
        /// The rejected width.
        width: u8,
    },

    /// The input ended (closed, exhausted) without an end code.
    #[error("truncated input")]
    TruncatedInput,

    /// Internal error: the dictionary or bit accumulator is in an
    /// impossible configuration. A bug in this crate, not bad input.
    #[error("internal error: inconsistent decoder state")]
    InternalErrorInconsistentDecoderState,
}

impl LzwError {
    /// Whether this error reports a decoder bug rather than malformed input.
    pub fn is_internal(self) -> bool {
        matches!(self, LzwError::InternalErrorInconsistentDecoderState)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(LzwError::BadCode { code: 7 }.to_string(), "bad code: 7");
        assert_eq!(
            LzwError::BadLiteralWidth { width: 9 }.to_string(),
            "bad literal width: 9"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(LzwError::InternalErrorInconsistentDecoderState.is_internal());
        assert!(!LzwError::TruncatedInput.is_internal());
    }
}
