//! The resumable-decoder contract.
//!
//! Every long-running decode operation in Siphon is a resumable function: it
//! may return a suspension [`Status`] instead of completing, and the caller
//! is expected to supply the missing resource (input bytes or output space)
//! and call again. All progress state is saved in the decoder instance at
//! every suspension point, so resuming is indistinguishable from never having
//! suspended - a stream fed one byte at a time decodes identically to one fed
//! all at once.

use crate::io::{ByteReader, ByteWriter};

/// Outcome of a `transform` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// More input is needed to continue (short read). Not an error.
    NeedsInput,
    /// More output buffer space is needed (short write). Not an error.
    NeedsOutput,
    /// The stream decoded completely.
    Done,
}

impl Status {
    /// Whether this status is a suspension (the caller should loop).
    pub fn is_suspension(self) -> bool {
        !matches!(self, Status::Done)
    }
}

/// A streaming decoder that can suspend and resume.
///
/// Implementations borrow `dst` and `src` only for the duration of a single
/// call; between calls only byte counts and internal copies (history window,
/// dictionary, bit accumulator) survive. After a `transform` call returns an
/// error the instance is permanently disabled and every further call returns
/// that same error.
pub trait StreamDecoder {
    /// The fatal error type for this decoder.
    type Error;

    /// Decode from `src` into `dst` until done or suspended.
    fn transform(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, Self::Error>;

    /// The (minimum, maximum) scratch-buffer length this decoder asks its
    /// caller to provide. The default is no scratch space at all.
    fn workbuf_len(&self) -> (u64, u64) {
        (0, 0)
    }
}
