//! Resumable DEFLATE decompression (RFC 1951).
//!
//! [`Inflater`] decodes a raw deflate stream - block headers, stored blocks,
//! fixed and dynamic Huffman blocks - and can suspend at any byte boundary.
//! When the input runs dry or the output fills up, `transform` returns a
//! suspension [`Status`] with every piece of progress (bit accumulator,
//! block state, partially read header fields, mid-copy position) saved in
//! the instance; the caller supplies the missing resource and calls again.
//! Feeding a stream one byte at a time produces exactly the same output as
//! feeding it whole.
//!
//! Two decode loops share the Huffman machinery. The slow loop steps one
//! phase at a time and can suspend between any two of them. The fast loop
//! runs only while at least 258 output bytes and 12 input bytes remain - a
//! whole symbol then always fits, so it skips every suspension check and
//! batches accumulator refills two bytes at a time, returning surplus whole
//! bytes to the reader when it exits.
//!
//! Output bytes are also written through to a 32 KiB [`HistoryWindow`], and
//! back-reference copies always read from it. That one invariant handles
//! overlapping copies (distance smaller than length), references reaching
//! into earlier `transform` calls, and preset dictionaries alike.

use siphon_core::io::{ByteReader, ByteWriter};
use siphon_core::ringbuffer::HistoryWindow;
use siphon_core::traits::{Status, StreamDecoder};

use crate::error::DeflateError;
use crate::huffman::{
    Entry, HuffmanTable, TableKind, fixed_distance_table, fixed_litlen_table,
};
use crate::tables::CODE_LENGTH_ORDER;

/// The fast loop needs room for a maximal 258-byte match per iteration.
const FAST_DST_MARGIN: usize = 258;
/// And at most 48 bits of refill per iteration, with slack.
const FAST_SRC_MARGIN: usize = 12;

const MAX_LITLEN_CODES: u16 = 286;
const MAX_DISTANCE_CODES: u16 = 30;

#[inline]
fn mask(n: u32) -> u32 {
    ((1u64 << n) - 1) as u32
}

/// Pending run-length op in a dynamic block's code length sequence.
#[derive(Debug, Clone, Copy)]
enum RepeatOp {
    /// Code 16: repeat the previous length 3..=6 times (2 extra bits).
    Previous,
    /// Code 17: 3..=10 zero lengths (3 extra bits).
    ZeroShort,
    /// Code 18: 11..=138 zero lengths (7 extra bits).
    ZeroLong,
}

/// Where we are inside a Huffman-coded block.
#[derive(Debug, Clone, Copy)]
enum Phase {
    LitLen,
    LengthExtra { base: u16, extra: u8 },
    DistanceSym { length: u16 },
    DistanceExtra { length: u16, base: u16, extra: u8 },
    Copy { length: u16, distance: u16 },
}

/// Where we are inside the stream.
#[derive(Debug, Clone, Copy)]
enum State {
    BlockHeader,
    StoredLength,
    StoredCopy {
        remaining: u16,
    },
    DynamicCounts,
    DynamicClcl {
        n_lit: u16,
        n_dist: u16,
        n_clen: u8,
        index: u8,
    },
    DynamicLengths {
        n_lit: u16,
        n_dist: u16,
        index: u16,
        repeat: Option<RepeatOp>,
    },
    Symbols(Phase),
    Done,
}

/// Which decode table a symbol comes from.
#[derive(Debug, Clone, Copy)]
enum Which {
    LitLen,
    Distance,
    CodeLength,
}

/// A resumable raw-deflate decoder.
///
/// ```rust
/// use siphon_deflate::inflate;
///
/// // BFINAL=1, BTYPE=fixed, end-of-block: the empty stream.
/// assert_eq!(inflate(&[0x03, 0x00]).unwrap(), b"");
/// ```
#[derive(Debug)]
pub struct Inflater {
    state: State,
    final_block: bool,
    /// Set by the fast loop when it decodes end-of-block.
    end_of_block: bool,
    /// Bit accumulator, least significant bit is next in the stream.
    bits: u32,
    n_bits: u32,
    history: HistoryWindow,
    litlen_table: HuffmanTable,
    distance_table: HuffmanTable,
    clen_table: HuffmanTable,
    /// Scratch: literal/length then distance code lengths of a dynamic block.
    code_lengths: [u8; 320],
    /// Scratch: the code length code's own lengths.
    clen_lengths: [u8; 19],
    failed: Option<DeflateError>,
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Inflater {
    /// Create a decoder positioned at the start of a stream.
    pub fn new() -> Self {
        Self {
            state: State::BlockHeader,
            final_block: false,
            end_of_block: false,
            bits: 0,
            n_bits: 0,
            history: HistoryWindow::deflate(),
            litlen_table: HuffmanTable::default(),
            distance_table: HuffmanTable::default(),
            clen_table: HuffmanTable::default(),
            code_lengths: [0; 320],
            clen_lengths: [0; 19],
            failed: None,
        }
    }

    /// Reset to the start-of-stream state, clearing history and any error.
    pub fn reset(&mut self) {
        self.state = State::BlockHeader;
        self.final_block = false;
        self.end_of_block = false;
        self.bits = 0;
        self.n_bits = 0;
        self.history.clear();
        self.failed = None;
    }

    /// Preload back-reference history without producing output.
    ///
    /// Used for preset dictionaries (zlib FDICT): after this call, matches
    /// may reach `dictionary.len()` bytes (up to the 32 KiB window) before
    /// the first byte the stream itself produces. May be called again
    /// between `transform` calls to append further history.
    pub fn add_history(&mut self, dictionary: &[u8]) {
        self.history.preload(dictionary);
    }

    /// Decode from `src` into `dst` until the stream ends or a resource
    /// runs out.
    ///
    /// Returns [`Status::Done`] exactly once per stream; after that it is
    /// idempotent. On error the decoder is permanently disabled and every
    /// further call returns the same error.
    ///
    /// A [`Status::NeedsInput`] return may leave `src` entirely unconsumed
    /// when the window is too small to complete the pending read (the
    /// stored-block length is the widest at four bytes). The caller must
    /// re-present the unconsumed bytes together with more input, not the
    /// same window again.
    pub fn transform(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, DeflateError> {
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
    ) -> Result<Status, DeflateError> {
        loop {
            match self.state {
                State::Done => return Ok(Status::Done),

                State::BlockHeader => {
                    let Some(header) = self.try_read_bits(src, 3)? else {
                        return self.short_read(src);
                    };
                    self.final_block = header & 1 != 0;
                    match header >> 1 {
                        0 => {
                            // Realign to the byte boundary.
                            let pad = self.n_bits & 7;
                            self.bits >>= pad;
                            self.n_bits -= pad;
                            self.state = State::StoredLength;
                        }
                        1 => {
                            self.litlen_table = fixed_litlen_table().clone();
                            self.distance_table = fixed_distance_table().clone();
                            self.state = State::Symbols(Phase::LitLen);
                        }
                        2 => self.state = State::DynamicCounts,
                        btype => {
                            return Err(DeflateError::BadBlockType {
                                btype: btype as u8,
                            });
                        }
                    }
                }

                State::StoredLength => {
                    let Some(value) = self.try_read_bits(src, 32)? else {
                        return self.short_read(src);
                    };
                    let len = (value & 0xFFFF) as u16;
                    let nlen = (value >> 16) as u16;
                    if len != !nlen {
                        return Err(DeflateError::InconsistentStoredBlockLength { len, nlen });
                    }
                    self.state = State::StoredCopy { remaining: len };
                }

                State::StoredCopy { remaining } => {
                    // The length read left us byte-aligned with an empty
                    // accumulator; stored data is copied straight through.
                    if self.n_bits != 0 {
                        return Err(DeflateError::InternalErrorInconsistentNBits);
                    }
                    let mut remaining = remaining as usize;
                    while remaining > 0 {
                        let n = remaining.min(src.available()).min(dst.remaining());
                        if n == 0 {
                            self.state = State::StoredCopy {
                                remaining: remaining as u16,
                            };
                            return if dst.remaining() == 0 {
                                Ok(Status::NeedsOutput)
                            } else {
                                self.short_read(src)
                            };
                        }
                        let chunk = src.read_slice(n);
                        dst.write_slice(chunk);
                        self.history.extend(chunk);
                        remaining -= n;
                    }
                    self.finish_block();
                }

                State::DynamicCounts => {
                    let Some(value) = self.try_read_bits(src, 14)? else {
                        return self.short_read(src);
                    };
                    let n_lit = (value & 0x1F) as u16 + 257;
                    let n_dist = ((value >> 5) & 0x1F) as u16 + 1;
                    let n_clen = ((value >> 10) & 0xF) as u8 + 4;
                    if n_lit > MAX_LITLEN_CODES {
                        return Err(DeflateError::BadLiteralLengthCodeCount { count: n_lit });
                    }
                    if n_dist > MAX_DISTANCE_CODES {
                        return Err(DeflateError::BadDistanceCodeCount { count: n_dist });
                    }
                    self.clen_lengths = [0; 19];
                    self.state = State::DynamicClcl {
                        n_lit,
                        n_dist,
                        n_clen,
                        index: 0,
                    };
                }

                State::DynamicClcl {
                    n_lit,
                    n_dist,
                    n_clen,
                    index,
                } => {
                    let mut index = index;
                    while index < n_clen {
                        let Some(value) = self.try_read_bits(src, 3)? else {
                            self.state = State::DynamicClcl {
                                n_lit,
                                n_dist,
                                n_clen,
                                index,
                            };
                            return self.short_read(src);
                        };
                        self.clen_lengths[CODE_LENGTH_ORDER[index as usize]] = value as u8;
                        index += 1;
                    }
                    self.clen_table =
                        HuffmanTable::build(&self.clen_lengths, TableKind::CodeLength)?;
                    self.code_lengths[..(n_lit + n_dist) as usize].fill(0);
                    self.state = State::DynamicLengths {
                        n_lit,
                        n_dist,
                        index: 0,
                        repeat: None,
                    };
                }

                State::DynamicLengths {
                    n_lit,
                    n_dist,
                    index,
                    repeat,
                } => {
                    let total = n_lit + n_dist;
                    let mut index = index;
                    let mut repeat = repeat;
                    loop {
                        if let Some(op) = repeat {
                            let extra = match op {
                                RepeatOp::Previous => 2,
                                RepeatOp::ZeroShort => 3,
                                RepeatOp::ZeroLong => 7,
                            };
                            let Some(value) = self.try_read_bits(src, extra)? else {
                                self.state = State::DynamicLengths {
                                    n_lit,
                                    n_dist,
                                    index,
                                    repeat,
                                };
                                return self.short_read(src);
                            };
                            let (count, length) = match op {
                                RepeatOp::Previous => {
                                    (value as u16 + 3, self.code_lengths[index as usize - 1])
                                }
                                RepeatOp::ZeroShort => (value as u16 + 3, 0),
                                RepeatOp::ZeroLong => (value as u16 + 11, 0),
                            };
                            if index + count > total {
                                return Err(DeflateError::BadHuffCodeLengthCount);
                            }
                            for _ in 0..count {
                                self.code_lengths[index as usize] = length;
                                index += 1;
                            }
                            repeat = None;
                            continue;
                        }
                        if index == total {
                            break;
                        }
                        let Some(entry) = self.decode_symbol(src, Which::CodeLength)? else {
                            self.state = State::DynamicLengths {
                                n_lit,
                                n_dist,
                                index,
                                repeat,
                            };
                            return self.short_read(src);
                        };
                        let Entry::Literal { byte, .. } = entry else {
                            return Err(DeflateError::InternalErrorInconsistentDecoderState);
                        };
                        match byte {
                            0..=15 => {
                                self.code_lengths[index as usize] = byte;
                                index += 1;
                            }
                            16 => {
                                if index == 0 {
                                    return Err(DeflateError::BadHuffCodeLengthRepetition);
                                }
                                repeat = Some(RepeatOp::Previous);
                            }
                            17 => repeat = Some(RepeatOp::ZeroShort),
                            18 => repeat = Some(RepeatOp::ZeroLong),
                            _ => return Err(DeflateError::InternalErrorInconsistentDecoderState),
                        }
                    }
                    if self.code_lengths[256] == 0 {
                        return Err(DeflateError::MissingEndOfBlockCode);
                    }
                    let litlen = HuffmanTable::build(
                        &self.code_lengths[..n_lit as usize],
                        TableKind::LitLen,
                    )?;
                    let distance = HuffmanTable::build(
                        &self.code_lengths[n_lit as usize..total as usize],
                        TableKind::Distance,
                    )?;
                    self.litlen_table = litlen;
                    self.distance_table = distance;
                    self.state = State::Symbols(Phase::LitLen);
                }

                State::Symbols(phase) => {
                    if matches!(phase, Phase::LitLen)
                        && dst.remaining() >= FAST_DST_MARGIN
                        && src.available() >= FAST_SRC_MARGIN
                    {
                        self.decode_huffman_fast(dst, src)?;
                        if self.end_of_block {
                            self.end_of_block = false;
                            self.finish_block();
                        }
                        continue;
                    }
                    if let Some(status) = self.decode_huffman_slow(dst, src, phase)? {
                        return Ok(status);
                    }
                }
            }
        }
    }

    /// One suspendable step of the symbol decode loop. `Ok(None)` means the
    /// step completed and the state machine should keep going.
    fn decode_huffman_slow(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
        phase: Phase,
    ) -> Result<Option<Status>, DeflateError> {
        match phase {
            Phase::LitLen => {
                // A literal needs one output byte; reserve it up front so
                // the symbol is never decoded twice.
                if dst.remaining() == 0 {
                    return Ok(Some(Status::NeedsOutput));
                }
                let Some(entry) = self.decode_symbol(src, Which::LitLen)? else {
                    return self.short_read(src).map(Some);
                };
                match entry {
                    Entry::Literal { byte, .. } => {
                        dst.write_byte(byte);
                        self.history.write_byte(byte);
                    }
                    Entry::EndOfBlock { .. } => self.finish_block(),
                    Entry::Length { base, extra, .. } => {
                        self.state = State::Symbols(if extra == 0 {
                            Phase::DistanceSym { length: base }
                        } else {
                            Phase::LengthExtra { base, extra }
                        });
                    }
                    _ => return Err(DeflateError::InternalErrorInconsistentDecoderState),
                }
            }
            Phase::LengthExtra { base, extra } => {
                let Some(value) = self.try_read_bits(src, u32::from(extra))? else {
                    return self.short_read(src).map(Some);
                };
                self.state = State::Symbols(Phase::DistanceSym {
                    length: base + value as u16,
                });
            }
            Phase::DistanceSym { length } => {
                let Some(entry) = self.decode_symbol(src, Which::Distance)? else {
                    return self.short_read(src).map(Some);
                };
                let Entry::Distance { base, extra, .. } = entry else {
                    return Err(DeflateError::InternalErrorInconsistentDecoderState);
                };
                self.state = State::Symbols(if extra == 0 {
                    Phase::Copy {
                        length,
                        distance: base,
                    }
                } else {
                    Phase::DistanceExtra {
                        length,
                        base,
                        extra,
                    }
                });
            }
            Phase::DistanceExtra {
                length,
                base,
                extra,
            } => {
                let Some(value) = self.try_read_bits(src, u32::from(extra))? else {
                    return self.short_read(src).map(Some);
                };
                self.state = State::Symbols(Phase::Copy {
                    length,
                    distance: base + value as u16,
                });
            }
            Phase::Copy { length, distance } => {
                if distance as usize > self.history.len() {
                    return Err(DeflateError::BadDistance {
                        distance: u32::from(distance),
                        history: self.history.len() as u32,
                    });
                }
                let mut length = length;
                while length > 0 {
                    let Some(byte) = self.history.read_at_distance(distance as usize) else {
                        return Err(DeflateError::InternalErrorInconsistentDistance);
                    };
                    if !dst.write_byte(byte) {
                        self.state = State::Symbols(Phase::Copy { length, distance });
                        return Ok(Some(Status::NeedsOutput));
                    }
                    self.history.write_byte(byte);
                    length -= 1;
                }
                self.state = State::Symbols(Phase::LitLen);
            }
        }
        Ok(None)
    }

    /// The unsuspendable inner loop. Runs only while a whole symbol's worth
    /// of input and output is guaranteed, so no per-bit checks are needed;
    /// whole bytes left in the accumulator on exit are returned to `src`.
    fn decode_huffman_fast(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<(), DeflateError> {
        let src_slice = src.remaining_slice();
        let s_limit = src_slice.len() - FAST_SRC_MARGIN;
        let mut s = 0usize;

        let mut bits = self.bits;
        let mut n_bits = self.n_bits;

        let mut d = 0usize;
        let mut end_of_block = false;
        let mut error = None;

        {
            let dst_slice = dst.unfilled();
            let d_limit = dst_slice.len() - FAST_DST_MARGIN;

            'symbols: while d <= d_limit && s <= s_limit {
                if n_bits < 15 {
                    bits |= u32::from(src_slice[s]) << n_bits;
                    s += 1;
                    n_bits += 8;
                    bits |= u32::from(src_slice[s]) << n_bits;
                    s += 1;
                    n_bits += 8;
                }

                let mut entry = self.litlen_table.lookup(bits);
                let (length_base, length_extra);
                loop {
                    match entry {
                        Entry::Literal { byte, bits: n } => {
                            bits >>= n;
                            n_bits -= u32::from(n);
                            dst_slice[d] = byte;
                            d += 1;
                            self.history.write_byte(byte);
                            continue 'symbols;
                        }
                        Entry::EndOfBlock { bits: n } => {
                            bits >>= n;
                            n_bits -= u32::from(n);
                            end_of_block = true;
                            break 'symbols;
                        }
                        Entry::Length {
                            base,
                            extra,
                            bits: n,
                        } => {
                            bits >>= n;
                            n_bits -= u32::from(n);
                            length_base = base;
                            length_extra = extra;
                            break;
                        }
                        Entry::Redirect {
                            offset,
                            index_bits,
                            bits: n,
                        } => {
                            bits >>= n;
                            n_bits -= u32::from(n);
                            entry = self
                                .litlen_table
                                .lookup_sub(offset, bits & mask(u32::from(index_bits)));
                        }
                        Entry::Invalid { .. } => {
                            error = Some(DeflateError::BadHuffCode);
                            break 'symbols;
                        }
                        Entry::Distance { .. } => {
                            error = Some(DeflateError::InternalErrorInconsistentDecoderState);
                            break 'symbols;
                        }
                    }
                }

                let mut length = u32::from(length_base);
                if length_extra > 0 {
                    if n_bits < u32::from(length_extra) {
                        bits |= u32::from(src_slice[s]) << n_bits;
                        s += 1;
                        n_bits += 8;
                    }
                    length += bits & mask(u32::from(length_extra));
                    bits >>= length_extra;
                    n_bits -= u32::from(length_extra);
                }

                if n_bits < 15 {
                    bits |= u32::from(src_slice[s]) << n_bits;
                    s += 1;
                    n_bits += 8;
                    bits |= u32::from(src_slice[s]) << n_bits;
                    s += 1;
                    n_bits += 8;
                }

                let mut entry = self.distance_table.lookup(bits);
                let (distance_base, distance_extra);
                loop {
                    match entry {
                        Entry::Distance {
                            base,
                            extra,
                            bits: n,
                        } => {
                            bits >>= n;
                            n_bits -= u32::from(n);
                            distance_base = base;
                            distance_extra = extra;
                            break;
                        }
                        Entry::Redirect {
                            offset,
                            index_bits,
                            bits: n,
                        } => {
                            bits >>= n;
                            n_bits -= u32::from(n);
                            entry = self
                                .distance_table
                                .lookup_sub(offset, bits & mask(u32::from(index_bits)));
                        }
                        Entry::Invalid { .. } => {
                            error = Some(DeflateError::BadHuffCode);
                            break 'symbols;
                        }
                        _ => {
                            error = Some(DeflateError::InternalErrorInconsistentDecoderState);
                            break 'symbols;
                        }
                    }
                }

                let mut distance = u32::from(distance_base);
                if distance_extra > 0 {
                    if n_bits < u32::from(distance_extra) {
                        bits |= u32::from(src_slice[s]) << n_bits;
                        s += 1;
                        n_bits += 8;
                        bits |= u32::from(src_slice[s]) << n_bits;
                        s += 1;
                        n_bits += 8;
                    }
                    distance += bits & mask(u32::from(distance_extra));
                    bits >>= distance_extra;
                    n_bits -= u32::from(distance_extra);
                }

                if distance as usize > self.history.len() {
                    error = Some(DeflateError::BadDistance {
                        distance,
                        history: self.history.len() as u32,
                    });
                    break 'symbols;
                }
                for _ in 0..length {
                    // Write-through: each copied byte enters the window
                    // immediately, so an overlapping copy sees it.
                    let Some(byte) = self.history.read_at_distance(distance as usize) else {
                        error = Some(DeflateError::InternalErrorInconsistentDistance);
                        break 'symbols;
                    };
                    dst_slice[d] = byte;
                    d += 1;
                    self.history.write_byte(byte);
                }
            }
        }

        // Return unconsumed whole bytes to the reader. Bytes loaded before
        // this call entered (s would go negative) stay in the accumulator.
        while n_bits >= 8 && s > 0 {
            s -= 1;
            n_bits -= 8;
        }
        bits &= mask(n_bits);

        src.skip(s);
        dst.advance(d);
        self.bits = bits;
        self.n_bits = n_bits;
        self.end_of_block = end_of_block;

        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Decode one symbol, suspending cleanly mid-code.
    ///
    /// A table entry is only acted on once its recorded code length fits the
    /// bits actually loaded; until then the lookup may be wrong (the index's
    /// upper bits are zero padding) and another byte is pulled instead.
    /// `Ok(None)` is a short read with nothing consumed beyond the
    /// accumulator.
    fn decode_symbol(
        &mut self,
        src: &mut ByteReader<'_>,
        which: Which,
    ) -> Result<Option<Entry>, DeflateError> {
        loop {
            let (entry, total_bits) = {
                let table = match which {
                    Which::LitLen => &self.litlen_table,
                    Which::Distance => &self.distance_table,
                    Which::CodeLength => &self.clen_table,
                };
                match table.lookup(self.bits) {
                    Entry::Redirect {
                        offset,
                        index_bits,
                        bits,
                    } => {
                        let sub = table
                            .lookup_sub(offset, (self.bits >> bits) & mask(u32::from(index_bits)));
                        (sub, u32::from(bits) + u32::from(sub.bits()))
                    }
                    entry => (entry, u32::from(entry.bits())),
                }
            };
            if total_bits <= self.n_bits {
                if let Entry::Invalid { .. } = entry {
                    return Err(DeflateError::BadHuffCode);
                }
                self.bits >>= total_bits;
                self.n_bits -= total_bits;
                return Ok(Some(entry));
            }
            let Some(byte) = src.read_byte() else {
                return Ok(None);
            };
            if self.n_bits >= 24 {
                return Err(DeflateError::InternalErrorInconsistentNBits);
            }
            self.bits |= u32::from(byte) << self.n_bits;
            self.n_bits += 8;
        }
    }

    /// Read `n` bits, loading whole bytes as needed. `Ok(None)` is a short
    /// read; the loaded bytes stay in the accumulator for the retry.
    fn try_read_bits(
        &mut self,
        src: &mut ByteReader<'_>,
        n: u32,
    ) -> Result<Option<u32>, DeflateError> {
        debug_assert!(n <= 32);
        while self.n_bits < n {
            let Some(byte) = src.read_byte() else {
                return Ok(None);
            };
            if self.n_bits >= 32 {
                return Err(DeflateError::InternalErrorInconsistentNBits);
            }
            self.bits |= u32::from(byte) << self.n_bits;
            self.n_bits += 8;
        }
        let value = self.bits & mask(n);
        if n == 32 {
            self.bits = 0;
        } else {
            self.bits >>= n;
        }
        self.n_bits -= n;
        Ok(Some(value))
    }

    /// Return whole unconsumed accumulator bytes to the reader, so the
    /// cursor position at a suspension point is byte-exact. Keeps the
    /// accumulator under eight bits between calls.
    fn rewind_whole_bytes(&mut self, src: &mut ByteReader<'_>) -> Result<(), DeflateError> {
        let whole = (self.n_bits / 8) as usize;
        if whole > 0 {
            if !src.unread(whole) {
                return Err(DeflateError::InternalErrorInconsistentNBits);
            }
            self.n_bits -= whole as u32 * 8;
            self.bits &= mask(self.n_bits);
        }
        Ok(())
    }

    fn short_read(&self, src: &ByteReader<'_>) -> Result<Status, DeflateError> {
        if src.is_closed() && src.available() == 0 {
            Err(DeflateError::UnexpectedEof)
        } else {
            Ok(Status::NeedsInput)
        }
    }

    fn finish_block(&mut self) {
        self.state = if self.final_block {
            State::Done
        } else {
            State::BlockHeader
        };
    }
}

impl StreamDecoder for Inflater {
    type Error = DeflateError;

    fn transform(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, DeflateError> {
        Inflater::transform(self, dst, src)
    }

    fn workbuf_len(&self) -> (u64, u64) {
        (1, 1)
    }
}

/// Decompress a complete raw deflate stream into a `Vec`.
///
/// Bytes after the final block are left untouched.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, DeflateError> {
    let mut inflater = Inflater::new();
    let mut out = Vec::new();
    let mut src = ByteReader::new(data, true);
    let mut buf = [0u8; 4096];
    loop {
        let mut dst = ByteWriter::new(&mut buf);
        let status = inflater.transform(&mut dst, &mut src)?;
        out.extend_from_slice(dst.written());
        match status {
            Status::Done => return Ok(out),
            Status::NeedsOutput => {}
            Status::NeedsInput => return Err(DeflateError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::reverse_bits;
    use crate::tables::{DISTANCE_BASE, DISTANCE_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS};

    /// Fixed-Huffman "abcabcabc": literals a, b, c then a match of length 6
    /// at distance 3, then end-of-block.
    const ABC_X3: [u8; 7] = [0x4B, 0x4C, 0x4A, 0x4E, 0x04, 0x23, 0x00];

    /// Literal 'a' then a match of length 3 at distance 4: reaches one byte
    /// before the start of history.
    const DISTANCE_TOO_FAR: [u8; 3] = [0x4B, 0x04, 0x62];

    /// Dynamic-Huffman "aaaaa": one-bit codes for 'a' and end-of-block, a
    /// degenerate single-code distance tree, lengths sent via the 16/17/18
    /// run-length codes.
    const DYNAMIC_AAAAA: [u8; 13] = [
        0x05, 0xC0, 0x81, 0x00, 0x00, 0x00, 0x00, 0x00, 0x90, 0x56, 0xFF, 0x13, 0x80,
    ];

    /// A stored block holding "Hello".
    const STORED_HELLO: [u8; 10] =
        [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];

    // -- test-side fixed-Huffman encoder -------------------------------

    struct BitSink {
        bytes: Vec<u8>,
        bits: u32,
        n: u32,
    }

    impl BitSink {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                bits: 0,
                n: 0,
            }
        }

        fn push_lsb(&mut self, value: u32, n: u32) {
            self.bits |= value << self.n;
            self.n += n;
            while self.n >= 8 {
                self.bytes.push(self.bits as u8);
                self.bits >>= 8;
                self.n -= 8;
            }
        }

        /// Huffman codes go out most significant bit first.
        fn push_code(&mut self, code: u32, n: u32) {
            let reversed = reverse_bits(code, n as u8);
            self.push_lsb(reversed, n);
        }

        fn finish(mut self) -> Vec<u8> {
            if self.n > 0 {
                self.bytes.push(self.bits as u8);
            }
            self.bytes
        }
    }

    fn fixed_literal(sink: &mut BitSink, byte: u8) {
        let sym = u32::from(byte);
        if sym < 144 {
            sink.push_code(0x30 + sym, 8);
        } else {
            sink.push_code(0x190 + sym - 144, 9);
        }
    }

    fn fixed_match(sink: &mut BitSink, length: u16, distance: u16) {
        let (index, &base) = LENGTH_BASE
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &base)| base <= length)
            .unwrap();
        let sym = 257 + index as u32;
        if sym <= 279 {
            sink.push_code(sym - 256, 7);
        } else {
            sink.push_code(0xC0 + sym - 280, 8);
        }
        sink.push_lsb(u32::from(length - base), u32::from(LENGTH_EXTRA_BITS[index]));

        let (index, &base) = DISTANCE_BASE
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &base)| base <= distance)
            .unwrap();
        sink.push_code(index as u32, 5);
        sink.push_lsb(
            u32::from(distance - base),
            u32::from(DISTANCE_EXTRA_BITS[index]),
        );
    }

    /// Ops for building a stream and its expected output together.
    enum Op {
        Lit(u8),
        Match(u16, u16),
    }

    fn build_fixed_stream(ops: &[Op]) -> (Vec<u8>, Vec<u8>) {
        let mut sink = BitSink::new();
        sink.push_lsb(1, 1); // final
        sink.push_lsb(1, 2); // fixed Huffman
        let mut expected: Vec<u8> = Vec::new();
        for op in ops {
            match *op {
                Op::Lit(byte) => {
                    fixed_literal(&mut sink, byte);
                    expected.push(byte);
                }
                Op::Match(length, distance) => {
                    fixed_match(&mut sink, length, distance);
                    for _ in 0..length {
                        let byte = expected[expected.len() - distance as usize];
                        expected.push(byte);
                    }
                }
            }
        }
        sink.push_code(0, 7); // end of block
        (sink.finish(), expected)
    }

    fn decode_chunked(
        data: &[u8],
        src_chunk: usize,
        dst_cap: usize,
    ) -> Result<Vec<u8>, DeflateError> {
        let mut inflater = Inflater::new();
        let mut out = Vec::new();
        let mut buf = vec![0u8; dst_cap];
        let mut offset = 0;
        let mut window = src_chunk;
        for _ in 0..1_000_000 {
            let end = (offset + window).min(data.len());
            let closed = end == data.len();
            let mut src = ByteReader::new(&data[offset..end], closed);
            let mut dst = ByteWriter::new(&mut buf);
            let status = inflater.transform(&mut dst, &mut src)?;
            out.extend_from_slice(dst.written());
            let consumed = src.position();
            offset += consumed;
            // The suspension contract: unconsumed bytes are re-presented
            // together with more input, so a pending multi-byte read can
            // complete.
            window = if consumed == 0 {
                window + src_chunk
            } else {
                src_chunk
            };
            if status == Status::Done {
                return Ok(out);
            }
        }
        panic!("decoder made no progress");
    }

    // -- decoding ------------------------------------------------------

    #[test]
    fn test_fixed_block_with_match() {
        assert_eq!(inflate(&ABC_X3).unwrap(), b"abcabcabc");
    }

    #[test]
    fn test_empty_fixed_block() {
        // Just a final fixed block header and end-of-block.
        assert_eq!(inflate(&[0x03, 0x00]).unwrap(), b"");
    }

    #[test]
    fn test_stored_block() {
        assert_eq!(inflate(&STORED_HELLO).unwrap(), b"Hello");
    }

    #[test]
    fn test_empty_stored_block() {
        assert_eq!(inflate(&[0x01, 0x00, 0x00, 0xFF, 0xFF]).unwrap(), b"");
    }

    #[test]
    fn test_stored_then_fixed_block() {
        // Non-final stored "hi", then a final fixed block that is just
        // end-of-block.
        let data = [0x00, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i', 0x03, 0x00];
        assert_eq!(inflate(&data).unwrap(), b"hi");
    }

    #[test]
    fn test_dynamic_block() {
        assert_eq!(inflate(&DYNAMIC_AAAAA).unwrap(), b"aaaaa");
    }

    #[test]
    fn test_dynamic_block_long_codes() {
        // A literal/length alphabet that needs the second table level:
        // lengths 1..=9 on symbols 0..=8, 10-bit codes for symbol 9 and
        // end-of-block, and a single 1-bit distance code. Canonical codes:
        // symbol k (k <= 8) is k ones then a zero; symbol 9 is 1111111110
        // and end-of-block 1111111111.
        fn clen(sink: &mut BitSink, sym: u32) {
            match sym {
                1..=4 => sink.push_code(sym - 1, 3),
                18 => sink.push_code(4, 3),
                5..=10 => sink.push_code(sym + 5, 4),
                _ => unreachable!(),
            }
        }
        fn literal(sink: &mut BitSink, sym: u32) {
            match sym {
                0..=8 => sink.push_code((1u32 << (sym + 1)) - 2, sym + 1),
                9 => sink.push_code(0b11_1111_1110, 10),
                _ => unreachable!(),
            }
        }

        let mut sink = BitSink::new();
        sink.push_lsb(1, 1); // final
        sink.push_lsb(2, 2); // dynamic Huffman
        sink.push_lsb(0, 5); // HLIT: 257 codes
        sink.push_lsb(0, 5); // HDIST: 1 code
        sink.push_lsb(14, 4); // HCLEN: 18 entries

        // Code length code: 3 bits for symbols 1..=4 and 18, 4 bits for
        // 5..=10 (Kraft-exact: 5/8 + 6/16).
        for &sym in CODE_LENGTH_ORDER.iter().take(18) {
            let len = match sym {
                1..=4 | 18 => 3,
                5..=10 => 4,
                _ => 0,
            };
            sink.push_lsb(len, 3);
        }
        for sym in 1..=10 {
            clen(&mut sink, sym); // lengths 1..=10 for symbols 0..=9
        }
        clen(&mut sink, 18);
        sink.push_lsb(127, 7); // 138 zero lengths
        clen(&mut sink, 18);
        sink.push_lsb(97, 7); // 108 more: symbols 10..=255 stay codeless
        clen(&mut sink, 10); // end-of-block: 10 bits
        clen(&mut sink, 1); // the lone distance code

        let mut expected = Vec::new();
        for _ in 0..40 {
            for sym in [0u32, 9, 1, 9, 2] {
                literal(&mut sink, sym);
                expected.push(sym as u8);
            }
        }
        sink.push_code(0b11_1111_1111, 10); // end of block
        let data = sink.finish();

        // Long enough that the one-shot decode runs the margin-gated loop
        // over the 10-bit codes.
        assert_eq!(inflate(&data).unwrap(), expected);
        // And byte-at-a-time through the suspendable loop.
        assert_eq!(decode_chunked(&data, 1, 1).unwrap(), expected);
    }

    #[test]
    fn test_overlapping_copy() {
        // 'x' then length 10 at distance 1: run-length expansion.
        let (data, expected) = build_fixed_stream(&[Op::Lit(b'x'), Op::Match(10, 1)]);
        assert_eq!(expected, b"xxxxxxxxxxx");
        assert_eq!(inflate(&data).unwrap(), expected);
    }

    #[test]
    fn test_long_stream_fast_path() {
        // Big enough that the margin-gated fast loop does the bulk of the
        // work, with 9-bit literals and maximal matches in the mix.
        let mut ops = Vec::new();
        for i in 0..2000u32 {
            ops.push(Op::Lit((i * 7 + 3) as u8));
        }
        ops.push(Op::Match(258, 1));
        ops.push(Op::Match(258, 1500));
        ops.push(Op::Match(3, 2459));
        for i in 0..100u32 {
            ops.push(Op::Lit((i * 13 + 150) as u8));
        }
        let (data, expected) = build_fixed_stream(&ops);
        assert_eq!(inflate(&data).unwrap(), expected);
    }

    // -- suspension ----------------------------------------------------

    #[test]
    fn test_chunked_equivalence() {
        let mut ops = Vec::new();
        for i in 0..600u32 {
            ops.push(Op::Lit((i * 11 + 5) as u8));
        }
        ops.push(Op::Match(100, 37));
        ops.push(Op::Match(258, 258));
        let (data, expected) = build_fixed_stream(&ops);

        assert_eq!(inflate(&data).unwrap(), expected);
        for src_chunk in [1, 2, 3, 7, 64] {
            for dst_cap in [1, 9, 4096] {
                assert_eq!(
                    decode_chunked(&data, src_chunk, dst_cap).unwrap(),
                    expected,
                    "src_chunk={src_chunk} dst_cap={dst_cap}"
                );
            }
        }
    }

    #[test]
    fn test_chunked_dynamic_block() {
        // One byte at a time through the dynamic header machinery.
        assert_eq!(decode_chunked(&DYNAMIC_AAAAA, 1, 1).unwrap(), b"aaaaa");
    }

    #[test]
    fn test_chunked_stored_block() {
        assert_eq!(decode_chunked(&STORED_HELLO, 1, 2).unwrap(), b"Hello");
    }

    #[test]
    fn test_zero_size_buffers_are_noops() {
        let mut inflater = Inflater::new();

        // Mid-stream: feed the first two bytes only.
        let mut buf = [0u8; 16];
        let mut src = ByteReader::new(&ABC_X3[..2], false);
        let mut dst = ByteWriter::new(&mut buf);
        let status = inflater.transform(&mut dst, &mut src).unwrap();
        assert_eq!(status, Status::NeedsInput);
        let produced = dst.written().to_vec();

        // Empty input: suspends again, changes nothing.
        let mut src = ByteReader::new(&[], false);
        let mut dst = ByteWriter::new(&mut buf[produced.len()..]);
        assert_eq!(
            inflater.transform(&mut dst, &mut src).unwrap(),
            Status::NeedsInput
        );
        assert_eq!(dst.position(), 0);

        // Empty output with input waiting: needs output space.
        let mut src = ByteReader::new(&ABC_X3[2..], true);
        let mut dst = ByteWriter::new(&mut []);
        assert_eq!(
            inflater.transform(&mut dst, &mut src).unwrap(),
            Status::NeedsOutput
        );
        assert_eq!(src.position(), 0);

        // Then finish normally.
        let mut dst = ByteWriter::new(&mut buf[produced.len()..]);
        assert_eq!(
            inflater.transform(&mut dst, &mut src).unwrap(),
            Status::Done
        );
        let mut out = produced;
        out.extend_from_slice(dst.written());
        assert_eq!(out, b"abcabcabc");
    }

    // -- history -------------------------------------------------------

    #[test]
    fn test_distance_beyond_history() {
        let err = inflate(&DISTANCE_TOO_FAR).unwrap_err();
        assert_eq!(
            err,
            DeflateError::BadDistance {
                distance: 4,
                history: 1
            }
        );
    }

    #[test]
    fn test_preset_history_satisfies_distance() {
        let mut inflater = Inflater::new();
        inflater.add_history(b"xyz");

        let mut buf = [0u8; 16];
        let mut src = ByteReader::new(&DISTANCE_TOO_FAR, false);
        let mut dst = ByteWriter::new(&mut buf);
        // The same match now resolves into the preset bytes: distance 4
        // reaches back through 'a' into "xyz".
        let status = inflater.transform(&mut dst, &mut src).unwrap();
        assert_eq!(status, Status::NeedsInput);
        assert_eq!(dst.written(), b"axyz");
    }

    #[test]
    fn test_match_across_transform_calls() {
        // The match in ABC_X3 must resolve even when the literals it copies
        // were produced by an earlier call.
        assert_eq!(decode_chunked(&ABC_X3, 1, 1).unwrap(), b"abcabcabc");
    }

    // -- errors --------------------------------------------------------

    #[test]
    fn test_bad_block_type() {
        // BFINAL=1, BTYPE=11.
        assert_eq!(
            inflate(&[0x07, 0x00]).unwrap_err(),
            DeflateError::BadBlockType { btype: 3 }
        );
    }

    #[test]
    fn test_stored_length_mismatch() {
        assert_eq!(
            inflate(&[0x01, 0x00, 0x00, 0x00, 0x00]).unwrap_err(),
            DeflateError::InconsistentStoredBlockLength { len: 0, nlen: 0 }
        );
    }

    #[test]
    fn test_truncated_stream() {
        assert_eq!(
            inflate(&ABC_X3[..3]).unwrap_err(),
            DeflateError::UnexpectedEof
        );
        assert_eq!(
            inflate(&STORED_HELLO[..7]).unwrap_err(),
            DeflateError::UnexpectedEof
        );
    }

    #[test]
    fn test_error_is_sticky() {
        let mut inflater = Inflater::new();
        let mut buf = [0u8; 16];

        let mut src = ByteReader::new(&DISTANCE_TOO_FAR, true);
        let mut dst = ByteWriter::new(&mut buf);
        let err = inflater.transform(&mut dst, &mut src).unwrap_err();
        assert_eq!(
            err,
            DeflateError::BadDistance {
                distance: 4,
                history: 1
            }
        );

        // Same error again, even with fresh, valid input.
        let mut src = ByteReader::new(&ABC_X3, true);
        let mut dst = ByteWriter::new(&mut buf);
        assert_eq!(inflater.transform(&mut dst, &mut src).unwrap_err(), err);

        // reset() clears it.
        inflater.reset();
        let mut src = ByteReader::new(&ABC_X3, true);
        let mut dst = ByteWriter::new(&mut buf);
        assert_eq!(
            inflater.transform(&mut dst, &mut src).unwrap(),
            Status::Done
        );
        assert_eq!(dst.written(), b"abcabcabc");
    }

    #[test]
    fn test_done_is_idempotent() {
        let mut inflater = Inflater::new();
        let mut buf = [0u8; 16];
        let mut src = ByteReader::new(&[0x03, 0x00], true);
        let mut dst = ByteWriter::new(&mut buf);
        assert_eq!(
            inflater.transform(&mut dst, &mut src).unwrap(),
            Status::Done
        );
        let mut src = ByteReader::new(&[], true);
        let mut dst = ByteWriter::new(&mut buf);
        assert_eq!(
            inflater.transform(&mut dst, &mut src).unwrap(),
            Status::Done
        );
    }

    #[test]
    fn test_workbuf_len() {
        assert_eq!(StreamDecoder::workbuf_len(&Inflater::new()), (1, 1));
    }
}
