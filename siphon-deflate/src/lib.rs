//! # Siphon DEFLATE
//!
//! Resumable DEFLATE decompression (RFC 1951) with a zlib wrapper
//! (RFC 1950).
//!
//! The decoders here are coroutine-shaped: a `transform` call decodes as
//! much as its borrowed input and output windows allow, then suspends with
//! [`Status::NeedsInput`](siphon_core::Status::NeedsInput) or
//! [`Status::NeedsOutput`](siphon_core::Status::NeedsOutput) rather than
//! failing. All progress lives in the decoder instance, so streams can be
//! fed in arbitrary slices - down to one byte at a time - with output
//! identical to a one-shot decode.
//!
//! ## Quick start
//!
//! ```rust
//! use siphon_deflate::{inflate, zlib_decompress};
//!
//! // A stored deflate block holding "Hello".
//! let raw = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
//! assert_eq!(inflate(&raw).unwrap(), b"Hello");
//!
//! // The zlib framing of the empty string.
//! let wrapped = [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];
//! assert_eq!(zlib_decompress(&wrapped).unwrap(), b"");
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use siphon_core::{ByteReader, ByteWriter, Status};
//! use siphon_deflate::Inflater;
//!
//! let raw = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
//! let mut inflater = Inflater::new();
//! let mut out = Vec::new();
//! let mut buf = [0u8; 2]; // deliberately tiny output window
//! let mut src = ByteReader::new(&raw, true);
//! loop {
//!     let mut dst = ByteWriter::new(&mut buf);
//!     let status = inflater.transform(&mut dst, &mut src).unwrap();
//!     out.extend_from_slice(dst.written());
//!     if status == Status::Done {
//!         break;
//!     }
//! }
//! assert_eq!(out, b"Hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod error;
pub mod huffman;
pub mod inflate;
pub mod tables;
pub mod zlib;

pub use error::{DeflateError, ZlibError};
pub use inflate::{Inflater, inflate};
pub use zlib::{Adler32, ZlibDecoder, zlib_decompress};
