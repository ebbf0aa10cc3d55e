//! Error types for DEFLATE decompression.
//!
//! Errors split into two classes. *Structural* errors mean the compressed
//! stream itself is malformed and the blame lies with whoever produced it.
//! *Internal* errors mean the decoder caught its own state in an impossible
//! configuration; they indicate a bug in this crate, never bad input, and
//! [`DeflateError::is_internal`] distinguishes them. Short reads and short
//! writes are not errors at all - they surface as suspension statuses.
//!
//! All variants are `Copy` so a failed decoder can replay its error on every
//! subsequent call.

use thiserror::Error;

/// A fatal DEFLATE decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DeflateError {
    /// Reserved block type 3 in a block header.
    #[error("bad block type: {btype}")]
    BadBlockType {
        /// The 2-bit block type read from the stream.
        btype: u8,
    },

    /// A code that no symbol maps to was read from the bitstream.
    #[error("bad Huffman code")]
    BadHuffCode,

    /// The code length assignment over-subscribes the code space
    /// (the Kraft inequality sum exceeds one).
    #[error("bad Huffman code (over-subscribed)")]
    HuffCodeOverSubscribed,

    /// The code length assignment leaves part of the code space unused.
    #[error("bad Huffman code (under-subscribed)")]
    HuffCodeUnderSubscribed,

    /// The shortest code is too long to fit the primary decode table.
    #[error("bad Huffman minimum code length")]
    BadHuffMinimumCodeLength,

    /// Every code length in the alphabet is zero.
    #[error("no Huffman codes")]
    NoHuffCodes,

    /// HLIT declares more than 286 literal/length codes.
    #[error("bad literal/length code count: {count}")]
    BadLiteralLengthCodeCount {
        /// The declared code count.
        count: u16,
    },

    /// HDIST declares more than 30 distance codes.
    #[error("bad distance code count: {count}")]
    BadDistanceCodeCount {
        /// The declared code count.
        count: u16,
    },

    /// A repeat-previous code with no previous length to repeat.
    #[error("bad Huffman code length repetition")]
    BadHuffCodeLengthRepetition,

    /// The code length run-length encoding overflows the declared counts.
    #[error("bad Huffman code length count")]
    BadHuffCodeLengthCount,

    /// The literal/length alphabet assigns no code to end-of-block.
    #[error("missing end-of-block code")]
    MissingEndOfBlockCode,

    /// A stored block whose LEN and NLEN fields are not complements.
    #[error("inconsistent stored block length: len={len:#06x} nlen={nlen:#06x}")]
    InconsistentStoredBlockLength {
        /// The LEN field.
        len: u16,
        /// The NLEN field.
        nlen: u16,
    },

    /// A back-reference reaching before the start of available history.
    #[error("bad distance: {distance} exceeds {history} bytes of history")]
    BadDistance {
        /// The back-reference distance.
        distance: u32,
        /// Bytes of history available when the reference was decoded.
        history: u32,
    },

    /// The input ended (closed, exhausted) mid-stream.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Internal error: the bit accumulator count disagrees with the byte
    /// position. A bug in this crate, not bad input.
    #[error("internal error: inconsistent number of bits")]
    InternalErrorInconsistentNBits,

    /// Internal error: a Huffman table produced an entry kind that cannot
    /// occur for its alphabet. A bug in this crate, not bad input.
    #[error("internal error: inconsistent Huffman decoder state")]
    InternalErrorInconsistentDecoderState,

    /// Internal error: a back-reference passed validation but could not be
    /// resolved from history. A bug in this crate, not bad input.
    #[error("internal error: inconsistent distance")]
    InternalErrorInconsistentDistance,
}

impl DeflateError {
    /// Whether this error reports a decoder bug rather than malformed input.
    pub fn is_internal(self) -> bool {
        matches!(
            self,
            DeflateError::InternalErrorInconsistentNBits
                | DeflateError::InternalErrorInconsistentDecoderState
                | DeflateError::InternalErrorInconsistentDistance
        )
    }
}

/// A fatal error in the zlib wrapper (RFC 1950) around a deflate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ZlibError {
    /// The wrapped deflate stream failed.
    #[error(transparent)]
    Deflate(#[from] DeflateError),

    /// The CMF/FLG pair fails its check or asks for an oversized window.
    #[error("bad zlib header")]
    BadHeader,

    /// A compression method other than deflate.
    #[error("unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The method field of the CMF byte.
        method: u8,
    },

    /// The Adler-32 trailer does not match the decompressed output.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// The checksum stored in the stream trailer.
        stored: u32,
        /// The checksum computed over the output.
        computed: u32,
    },

    /// The stream requires a preset dictionary that was not supplied.
    #[error("preset dictionary required: id {id:#010x}")]
    MissingDictionary {
        /// Adler-32 of the dictionary the stream was compressed with.
        id: u32,
    },

    /// The supplied preset dictionary is not the one the stream names.
    #[error("preset dictionary does not match id {id:#010x}")]
    DictionaryMismatch {
        /// Adler-32 of the dictionary the stream was compressed with.
        id: u32,
    },

    /// The input ended (closed, exhausted) mid-stream.
    #[error("unexpected end of stream")]
    UnexpectedEof,
}
