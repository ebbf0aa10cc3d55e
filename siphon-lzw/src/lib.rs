//! # Siphon LZW
//!
//! Resumable decompression for the GIF variant of LZW: variable code
//! widths from `literal_width + 1` up to 12 bits, least significant bit
//! first, with in-band clear and end codes.
//!
//! Like the other Siphon codecs, [`LzwDecoder::transform`] suspends with a
//! [`Status`](siphon_core::Status) when input runs dry or output fills up,
//! and resumes byte-exactly; a GIF reader can hand it the contents of each
//! data sub-block as it arrives.
//!
//! ```rust
//! use siphon_core::{ByteReader, ByteWriter, Status};
//! use siphon_lzw::LzwDecoder;
//!
//! let data = [0x4C, 0x5C]; // width 2: clear, 1, 1, code 6, end
//! let mut decoder = LzwDecoder::new(2);
//! let mut buf = [0u8; 16];
//! let mut src = ByteReader::new(&data, true);
//! let mut dst = ByteWriter::new(&mut buf);
//! assert_eq!(decoder.transform(&mut dst, &mut src).unwrap(), Status::Done);
//! assert_eq!(dst.written(), &[1, 1, 1, 1]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod decoder;
pub mod error;

pub use decoder::LzwDecoder;
pub use error::LzwError;
