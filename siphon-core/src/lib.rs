//! # Siphon Core
//!
//! Core components for the Siphon streaming-decompression library.
//!
//! This crate provides the fundamental building blocks shared by the codec
//! crates:
//!
//! - [`io`]: byte cursors over borrowed slices ([`ByteReader`]/[`ByteWriter`])
//! - [`ringbuffer`]: sliding window buffer for LZ77-style back-references
//! - [`traits`]: the resumable-decoder contract
//!
//! ## Architecture
//!
//! Siphon is designed as a layered stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Container callers                                   │
//! │     zlib/gzip/GIF framing, owned by format code         │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     DEFLATE (Huffman+LZ77), GIF-variant LZW             │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Runtime (this crate)                                │
//! │     ByteReader/ByteWriter, HistoryWindow, StreamDecoder │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The load-bearing contract is cooperative suspension: every decoder built
//! on these types can pause on short read or short write at byte granularity
//! and resume later with identical results, because all progress state lives
//! in the decoder instance rather than in the borrowed buffers.
//!
//! ## Example
//!
//! ```rust
//! use siphon_core::io::{ByteReader, ByteWriter};
//!
//! let src_bytes = [0xAB, 0xCD];
//! let mut src = ByteReader::new(&src_bytes, true);
//! assert_eq!(src.read_byte(), Some(0xAB));
//!
//! let mut dst_bytes = [0u8; 4];
//! let mut dst = ByteWriter::new(&mut dst_bytes);
//! assert!(dst.write_byte(0x12));
//! assert_eq!(dst.written(), &[0x12]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod io;
pub mod ringbuffer;
pub mod traits;

// Re-exports for convenience
pub use io::{ByteReader, ByteWriter};
pub use ringbuffer::HistoryWindow;
pub use traits::{Status, StreamDecoder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::io::{ByteReader, ByteWriter};
    pub use crate::ringbuffer::HistoryWindow;
    pub use crate::traits::{Status, StreamDecoder};
}
