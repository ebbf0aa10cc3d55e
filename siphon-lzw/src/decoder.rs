//! Resumable decoder for the GIF variant of LZW.
//!
//! The variant is parameterized by a literal width `w` (0..=8): literals
//! are the codes below `1 << w`, followed by a clear code and an end code,
//! with dynamically assigned codes above those. Code width starts at
//! `w + 1` bits and grows just before the next assigned code would not
//! fit, capping at 12 bits (4096 codes). Codes arrive least significant
//! bit first.
//!
//! The dictionary is flat arrays rather than per-entry allocations. Each
//! entry stores its expansion's last `(length - 1) % 8 + 1` bytes in an
//! 8-byte suffix block plus a pointer to the entry holding the previous
//! block, so expanding a code walks whole blocks back-to-front instead of
//! byte-by-byte. Entries whose length is a multiple of 8 start a fresh
//! block; the others copy and extend their predecessor's.
//!
//! Decoded bytes go into an internal 8 KiB staging buffer that the
//! `transform` loop drains into the caller's window; decoding pauses while
//! more than 4095 bytes are staged so a maximal expansion (4096 bytes plus
//! the speculative first byte) always fits.

use siphon_core::io::{ByteReader, ByteWriter};
use siphon_core::traits::{Status, StreamDecoder};

use crate::error::LzwError;

/// 12-bit codes: the dictionary never exceeds 4096 entries.
const MAX_CODES: u16 = 4096;
const MAX_CODE_WIDTH: u8 = 12;
/// Stop decoding while more than this many bytes are staged.
const OUTPUT_THRESHOLD: usize = 4095;
const OUTPUT_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy)]
enum ReadOutcome {
    /// The staging buffer is too full to guarantee room for an expansion.
    OutputFull,
    /// Out of input mid-stream.
    NeedsInput,
    /// The end code was read.
    End,
}

/// A resumable GIF-flavor LZW decoder.
///
/// ```rust
/// use siphon_core::{ByteReader, ByteWriter, Status};
/// use siphon_lzw::LzwDecoder;
///
/// // Literal width 2: clear, literal 1, a self-referential code, end.
/// let data = [0x8C, 0x0B];
/// let mut decoder = LzwDecoder::new(2);
/// let mut buf = [0u8; 8];
/// let mut src = ByteReader::new(&data, true);
/// let mut dst = ByteWriter::new(&mut buf);
/// assert_eq!(decoder.transform(&mut dst, &mut src).unwrap(), Status::Done);
/// assert_eq!(dst.written(), &[1, 1, 1]);
/// ```
#[derive(Debug)]
pub struct LzwDecoder {
    literal_width: u8,
    width: u8,
    clear_code: u16,
    end_code: u16,
    /// The next code the dictionary will assign; saturates at 4096.
    next_code: u16,
    prev_code: Option<u16>,
    end_seen: bool,
    /// Bit accumulator, least significant bit is next in the stream.
    bits: u32,
    n_bits: u32,
    /// Expansion length minus one, per code.
    lengths_m1: Vec<u16>,
    /// Code owning the previous suffix block of each entry's expansion.
    prefixes: Vec<u16>,
    /// Last `(length - 1) % 8 + 1` bytes of each entry's expansion.
    suffixes: Vec<[u8; 8]>,
    output: Vec<u8>,
    output_ri: usize,
    output_wi: usize,
    failed: Option<LzwError>,
}

impl LzwDecoder {
    /// Create a decoder for streams with the given literal width.
    ///
    /// A width outside 0..=8 leaves the instance permanently failed: every
    /// `transform` call returns [`LzwError::BadLiteralWidth`].
    pub fn new(literal_width: u8) -> Self {
        let mut decoder = Self {
            literal_width: 0,
            width: 0,
            clear_code: 0,
            end_code: 0,
            next_code: 0,
            prev_code: None,
            end_seen: false,
            bits: 0,
            n_bits: 0,
            lengths_m1: vec![0; MAX_CODES as usize],
            prefixes: vec![0; MAX_CODES as usize],
            suffixes: vec![[0; 8]; MAX_CODES as usize],
            output: vec![0; OUTPUT_SIZE],
            output_ri: 0,
            output_wi: 0,
            failed: None,
        };
        decoder.set_literal_width(literal_width);
        decoder
    }

    /// Reset for a new stream with the given literal width.
    ///
    /// GIF gives every image frame its own width, so a decoder instance is
    /// reusable across frames. A width outside 0..=8 permanently fails the
    /// instance instead (until a valid width is set).
    pub fn set_literal_width(&mut self, width: u8) {
        if width > 8 {
            self.failed = Some(LzwError::BadLiteralWidth { width });
            return;
        }
        self.failed = None;
        self.literal_width = width;
        self.end_seen = false;
        self.bits = 0;
        self.n_bits = 0;
        self.output_ri = 0;
        self.output_wi = 0;
        self.reset_dictionary();
    }

    fn reset_dictionary(&mut self) {
        let clear = 1u16 << self.literal_width;
        self.clear_code = clear;
        self.end_code = clear + 1;
        self.next_code = clear + 2;
        self.prev_code = None;
        self.width = self.literal_width + 1;
        // Widths 0 and 1 still have to represent the end code.
        while (1u16 << self.width) <= self.end_code {
            self.width += 1;
        }
        for code in 0..clear as usize {
            self.lengths_m1[code] = 0;
            self.prefixes[code] = 0;
            self.suffixes[code][0] = code as u8;
        }
    }

    /// Decode from `src` into `dst` until the end code or a resource runs
    /// out.
    ///
    /// Returns [`Status::Done`] once the end code has been read and all
    /// staged output delivered. On error the decoder is permanently
    /// disabled (until [`set_literal_width`](Self::set_literal_width)) and
    /// every further call returns the same error.
    ///
    /// A [`Status::NeedsInput`] return may leave `src` entirely unconsumed
    /// when the window holds fewer whole bytes than the current code width
    /// spans. The caller must re-present the unconsumed bytes together with
    /// more input, not the same window again.
    pub fn transform(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, LzwError> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        let result = self
            .run(dst, src)
            .and_then(|status| self.rewind_whole_bytes(src).map(|()| status));
        if let Err(err) = result {
            self.failed = Some(err);
        }
        result
    }

    fn run(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, LzwError> {
        loop {
            if self.output_ri < self.output_wi {
                let n = dst.write_slice(&self.output[self.output_ri..self.output_wi]);
                self.output_ri += n;
                if self.output_ri < self.output_wi {
                    return Ok(Status::NeedsOutput);
                }
                self.output_ri = 0;
                self.output_wi = 0;
            }
            if self.end_seen {
                return Ok(Status::Done);
            }
            match self.read_from(src)? {
                ReadOutcome::OutputFull | ReadOutcome::End => {}
                ReadOutcome::NeedsInput => {
                    if self.output_ri < self.output_wi {
                        continue;
                    }
                    if src.is_closed() && src.available() == 0 {
                        return Err(LzwError::TruncatedInput);
                    }
                    return Ok(Status::NeedsInput);
                }
            }
        }
    }

    /// Decode codes into the staging buffer until it passes the threshold,
    /// the input runs dry, or the end code arrives.
    fn read_from(&mut self, src: &mut ByteReader<'_>) -> Result<ReadOutcome, LzwError> {
        loop {
            if self.output_wi > OUTPUT_THRESHOLD {
                return Ok(ReadOutcome::OutputFull);
            }
            while self.n_bits < u32::from(self.width) {
                let Some(byte) = src.read_byte() else {
                    return Ok(ReadOutcome::NeedsInput);
                };
                if self.n_bits >= 24 {
                    return Err(LzwError::InternalErrorInconsistentDecoderState);
                }
                self.bits |= u32::from(byte) << self.n_bits;
                self.n_bits += 8;
            }
            let code = (self.bits & ((1u32 << self.width) - 1)) as u16;
            self.bits >>= self.width;
            self.n_bits -= u32::from(self.width);

            if code < self.clear_code {
                self.output[self.output_wi] = code as u8;
                self.output_wi += 1;
                if let Some(prev) = self.prev_code {
                    self.add_entry(prev, code as u8);
                }
                self.prev_code = Some(code);
            } else if code == self.clear_code {
                self.reset_dictionary();
            } else if code == self.end_code {
                self.end_seen = true;
                return Ok(ReadOutcome::End);
            } else if code < self.next_code {
                let first = self.emit_expansion(code)?;
                if let Some(prev) = self.prev_code {
                    self.add_entry(prev, first);
                }
                self.prev_code = Some(code);
            } else if code == self.next_code && self.next_code < MAX_CODES {
                // The one-ahead case: the code being defined right now.
                // Its expansion is the previous expansion plus that
                // expansion's own first byte.
                let Some(prev) = self.prev_code else {
                    return Err(LzwError::BadCode { code });
                };
                let first = self.emit_expansion(prev)?;
                self.output[self.output_wi] = first;
                self.output_wi += 1;
                self.add_entry(prev, first);
                self.prev_code = Some(code);
            } else {
                return Err(LzwError::BadCode { code });
            }
        }
    }

    /// Assign the next code as `prev`'s expansion extended by `byte`.
    /// Silently stops once the dictionary is full; decoding continues with
    /// the codes assigned so far, as GIF decoders conventionally allow.
    fn add_entry(&mut self, prev: u16, byte: u8) {
        if self.next_code >= MAX_CODES {
            return;
        }
        let code = self.next_code as usize;
        let prev = prev as usize;
        let length_m1 = self.lengths_m1[prev].wrapping_add(1);
        self.lengths_m1[code] = length_m1;
        let block_index = (length_m1 % 8) as usize;
        if block_index == 0 {
            // First byte of a fresh suffix block; the whole previous
            // expansion becomes this entry's prefix chain.
            self.prefixes[code] = prev as u16;
            self.suffixes[code][0] = byte;
        } else {
            self.prefixes[code] = self.prefixes[prev];
            self.suffixes[code] = self.suffixes[prev];
            self.suffixes[code][block_index] = byte;
        }
        self.next_code += 1;
        if self.next_code >= (1u16 << self.width) && self.width < MAX_CODE_WIDTH {
            self.width += 1;
        }
    }

    /// Write `code`'s full expansion into the staging buffer, back to
    /// front, one suffix block at a time. Returns the expansion's first
    /// byte (needed to extend the dictionary).
    fn emit_expansion(&mut self, code: u16) -> Result<u8, LzwError> {
        let start = self.output_wi;
        let end = start + self.lengths_m1[code as usize] as usize + 1;
        if end > self.output.len() {
            return Err(LzwError::InternalErrorInconsistentDecoderState);
        }
        let mut code = code as usize;
        let mut pos = end;
        loop {
            let n = (self.lengths_m1[code] % 8) as usize + 1;
            if n > pos - start {
                return Err(LzwError::InternalErrorInconsistentDecoderState);
            }
            pos -= n;
            self.output[pos..pos + n].copy_from_slice(&self.suffixes[code][..n]);
            if pos == start {
                break;
            }
            code = self.prefixes[code] as usize;
        }
        self.output_wi = end;
        Ok(self.output[start])
    }

    /// Take whatever decoded bytes are staged, clearing the staging
    /// buffer. Lets a caller recover buffered output when a stream stops
    /// without an end code, as GIF image data sometimes does.
    pub fn flush(&mut self) -> &[u8] {
        let (ri, wi) = (self.output_ri, self.output_wi);
        self.output_ri = 0;
        self.output_wi = 0;
        &self.output[ri..wi]
    }

    /// Return whole unconsumed accumulator bytes to the reader, keeping
    /// the cursor byte-exact at suspension points and at the end code so a
    /// container caller can find its framing.
    fn rewind_whole_bytes(&mut self, src: &mut ByteReader<'_>) -> Result<(), LzwError> {
        let whole = (self.n_bits / 8) as usize;
        if whole > 0 {
            if !src.unread(whole) {
                return Err(LzwError::InternalErrorInconsistentDecoderState);
            }
            self.n_bits -= whole as u32 * 8;
            self.bits &= (1u32 << self.n_bits) - 1;
        }
        Ok(())
    }
}

impl StreamDecoder for LzwDecoder {
    type Error = LzwError;

    fn transform(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, LzwError> {
        LzwDecoder::transform(self, dst, src)
    }
}
