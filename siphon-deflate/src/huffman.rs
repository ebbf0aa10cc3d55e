//! Canonical Huffman decode tables.
//!
//! A table maps the next bits of the stream to a decoded symbol in one or
//! two array lookups. The primary table is directly indexed by the low
//! [`index_bits`](HuffmanTable::index_bits) bits of the accumulator (at most
//! 9); a code shorter than that is replicated across every index sharing its
//! low bits, so any index it matches yields the same entry. Codes longer
//! than the primary width land on a [`Entry::Redirect`] that points at a
//! sub-table indexed by the code's remaining bits.
//!
//! Every entry records how many accumulator bits it consumes. An entry is
//! only trustworthy when that count does not exceed the bits actually
//! loaded; the decoder checks this before consuming, which is what lets a
//! symbol decode suspend cleanly in the middle of a code.
//!
//! Code length assignments are validated against the Kraft inequality
//! before table construction: an over-full assignment is always rejected,
//! and an under-full one is rejected except for the classic deflate
//! degeneracy of a distance alphabet with a single 1-bit code.

use crate::error::DeflateError;
use crate::tables::{
    DISTANCE_BASE, DISTANCE_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS, fixed_distance_lengths,
    fixed_litlen_lengths,
};
use std::sync::OnceLock;

/// Longest code length deflate allows.
pub const MAX_CODE_LENGTH: usize = 15;

/// Width of the primary (directly indexed) table, in bits.
pub const PRIMARY_INDEX_BITS: u8 = 9;

/// Which alphabet a table decodes. Determines how symbol numbers map to
/// [`Entry`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The 19-symbol code length alphabet of a dynamic block header.
    CodeLength,
    /// The literal/length alphabet (symbols 0..=287).
    LitLen,
    /// The distance alphabet (symbols 0..=31).
    Distance,
}

/// A decoded table entry.
///
/// The `bits` field of each variant is the number of accumulator bits the
/// entry consumes: the full code length for a primary entry, the length
/// beyond the primary width for a sub-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// No symbol maps to this code.
    Invalid {
        /// Code length, so the validity rule applies before erroring.
        bits: u8,
    },
    /// A literal byte (or a raw code length value 0..=18 in a
    /// [`TableKind::CodeLength`] table).
    Literal {
        /// The decoded byte.
        byte: u8,
        /// Bits consumed.
        bits: u8,
    },
    /// The end-of-block symbol (256).
    EndOfBlock {
        /// Bits consumed.
        bits: u8,
    },
    /// A match length code.
    Length {
        /// Base match length.
        base: u16,
        /// Extra bits to read and add to `base`.
        extra: u8,
        /// Bits consumed.
        bits: u8,
    },
    /// A match distance code.
    Distance {
        /// Base distance.
        base: u16,
        /// Extra bits to read and add to `base`.
        extra: u8,
        /// Bits consumed.
        bits: u8,
    },
    /// The code is longer than the primary width; continue in the sub-table
    /// at `offset`, indexed by the next `index_bits` accumulator bits.
    Redirect {
        /// Sub-table start within the entry array.
        offset: u16,
        /// Width of the sub-table index.
        index_bits: u8,
        /// Bits consumed by the primary lookup.
        bits: u8,
    },
}

impl Entry {
    /// Accumulator bits this entry consumes.
    #[inline]
    pub fn bits(self) -> u8 {
        match self {
            Entry::Invalid { bits }
            | Entry::Literal { bits, .. }
            | Entry::EndOfBlock { bits }
            | Entry::Length { bits, .. }
            | Entry::Distance { bits, .. }
            | Entry::Redirect { bits, .. } => bits,
        }
    }
}

/// A two-level Huffman decode table.
#[derive(Debug, Clone, PartialEq)]
pub struct HuffmanTable {
    /// Primary table followed by the sub-tables it redirects into.
    entries: Vec<Entry>,
    index_bits: u8,
}

impl Default for HuffmanTable {
    /// An empty table whose every lookup is invalid. A placeholder for
    /// decoder states in which no table has been built yet.
    fn default() -> Self {
        Self {
            entries: vec![Entry::Invalid { bits: 0 }],
            index_bits: 0,
        }
    }
}

impl HuffmanTable {
    /// Build a decode table from a code length assignment.
    ///
    /// `lengths[symbol]` is the code length of `symbol`, zero meaning the
    /// symbol has no code.
    pub fn build(lengths: &[u8], kind: TableKind) -> Result<Self, DeflateError> {
        debug_assert!(lengths.iter().all(|&l| l as usize <= MAX_CODE_LENGTH));

        let mut counts = [0u32; MAX_CODE_LENGTH + 1];
        let mut n_codes = 0usize;
        for &len in lengths {
            if len > 0 {
                counts[len as usize] += 1;
                n_codes += 1;
            }
        }
        if n_codes == 0 {
            return Err(DeflateError::NoHuffCodes);
        }

        // Kraft inequality: the assignment must fill the code space exactly.
        let mut remaining = 1i64;
        for &count in counts.iter().skip(1) {
            remaining <<= 1;
            remaining -= i64::from(count);
            if remaining < 0 {
                return Err(DeflateError::HuffCodeOverSubscribed);
            }
        }
        if remaining > 0 {
            if kind == TableKind::Distance && n_codes == 1 && counts[1] == 1 {
                return Self::build_degenerate(lengths);
            }
            return Err(DeflateError::HuffCodeUnderSubscribed);
        }

        let max_len = (1..=MAX_CODE_LENGTH)
            .rev()
            .find(|&l| counts[l] > 0)
            .unwrap_or(0) as u8;
        let min_len = (1..=MAX_CODE_LENGTH).find(|&l| counts[l] > 0).unwrap_or(0) as u8;
        let index_bits = max_len.min(PRIMARY_INDEX_BITS);
        if min_len > index_bits {
            return Err(DeflateError::BadHuffMinimumCodeLength);
        }

        // Canonical code numbering: codes of each length start where the
        // previous length's codes end, shifted left one bit.
        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        for len in 1..=MAX_CODE_LENGTH {
            code = (code + counts[len - 1]) << 1;
            next_code[len] = code;
        }

        // Symbols in canonical order: by length, then by symbol number.
        let mut order: Vec<(u8, u16)> = Vec::with_capacity(n_codes);
        for len in 1..=max_len {
            for (sym, &l) in lengths.iter().enumerate() {
                if l == len {
                    order.push((len, sym as u16));
                }
            }
        }

        let primary_size = 1usize << index_bits;
        let primary_mask = primary_size - 1;

        // First pass over the long codes: each 9-bit prefix that hosts any
        // long code gets a sub-table wide enough for the longest remainder
        // sharing that prefix.
        let mut sub_bits = vec![0u8; primary_size];
        {
            let mut codes = next_code;
            for &(len, _) in order.iter().filter(|&&(len, _)| len > index_bits) {
                let code = codes[len as usize];
                codes[len as usize] += 1;
                let prefix = reverse_bits(code, len) as usize & primary_mask;
                sub_bits[prefix] = sub_bits[prefix].max(len - index_bits);
            }
        }

        let mut entries = vec![Entry::Invalid { bits: 0 }; primary_size];
        let mut sub_offset = vec![0u16; primary_size];
        for prefix in 0..primary_size {
            if sub_bits[prefix] > 0 {
                let offset = entries.len() as u16;
                sub_offset[prefix] = offset;
                entries[prefix] = Entry::Redirect {
                    offset,
                    index_bits: sub_bits[prefix],
                    bits: index_bits,
                };
                entries.resize(
                    entries.len() + (1usize << sub_bits[prefix]),
                    Entry::Invalid { bits: 0 },
                );
            }
        }

        // Second pass: place every symbol, replicated across all indices
        // whose low bits match its (bit-reversed) code.
        let mut codes = next_code;
        for &(len, sym) in &order {
            let code = codes[len as usize];
            codes[len as usize] += 1;
            let reversed = reverse_bits(code, len) as usize;

            if len <= index_bits {
                let entry = make_entry(kind, sym, len);
                let step = 1usize << len;
                let mut index = reversed;
                while index < primary_size {
                    entries[index] = entry;
                    index += step;
                }
            } else {
                let prefix = reversed & primary_mask;
                let width = sub_bits[prefix];
                let offset = sub_offset[prefix] as usize;
                let entry = make_entry(kind, sym, len - index_bits);
                let step = 1usize << (len - index_bits);
                let mut index = reversed >> index_bits;
                while index < (1usize << width) {
                    entries[offset + index] = entry;
                    index += step;
                }
            }
        }

        Ok(Self {
            entries,
            index_bits,
        })
    }

    /// The single-code distance tree: one 1-bit code for one distance
    /// symbol. Historically produced by some encoders, tolerated by every
    /// mainstream decoder, so tolerated here.
    fn build_degenerate(lengths: &[u8]) -> Result<Self, DeflateError> {
        for (sym, &len) in lengths.iter().enumerate() {
            if len == 1 {
                return Ok(Self {
                    entries: vec![
                        make_entry(TableKind::Distance, sym as u16, 1),
                        Entry::Invalid { bits: 1 },
                    ],
                    index_bits: 1,
                });
            }
        }
        Err(DeflateError::InternalErrorInconsistentDecoderState)
    }

    /// Width of the primary index, in bits.
    #[inline]
    pub fn index_bits(&self) -> u8 {
        self.index_bits
    }

    /// Primary lookup on the low `index_bits` bits of `bits`.
    #[inline]
    pub fn lookup(&self, bits: u32) -> Entry {
        self.entries[bits as usize & ((1usize << self.index_bits) - 1)]
    }

    /// Sub-table lookup for a [`Entry::Redirect`].
    #[inline]
    pub fn lookup_sub(&self, offset: u16, index: u32) -> Entry {
        self.entries[offset as usize + index as usize]
    }
}

fn make_entry(kind: TableKind, symbol: u16, bits: u8) -> Entry {
    match kind {
        TableKind::CodeLength => Entry::Literal {
            byte: symbol as u8,
            bits,
        },
        TableKind::LitLen => match symbol {
            0..=255 => Entry::Literal {
                byte: symbol as u8,
                bits,
            },
            256 => Entry::EndOfBlock { bits },
            257..=285 => Entry::Length {
                base: LENGTH_BASE[symbol as usize - 257],
                extra: LENGTH_EXTRA_BITS[symbol as usize - 257],
                bits,
            },
            // 286 and 287 take part in the fixed tree but are unused.
            _ => Entry::Invalid { bits },
        },
        TableKind::Distance => match symbol {
            0..=29 => Entry::Distance {
                base: DISTANCE_BASE[symbol as usize],
                extra: DISTANCE_EXTRA_BITS[symbol as usize],
                bits,
            },
            _ => Entry::Invalid { bits },
        },
    }
}

/// Reverse the low `n` bits of `code`. Deflate transmits Huffman codes most
/// significant bit first into a least-significant-bit-first stream.
#[inline]
pub(crate) fn reverse_bits(code: u32, n: u8) -> u32 {
    code.reverse_bits() >> (32 - n as u32)
}

static FIXED_LITLEN: OnceLock<HuffmanTable> = OnceLock::new();
static FIXED_DISTANCE: OnceLock<HuffmanTable> = OnceLock::new();

/// The fixed literal/length decode table (block type 1).
pub fn fixed_litlen_table() -> &'static HuffmanTable {
    FIXED_LITLEN.get_or_init(|| {
        HuffmanTable::build(&fixed_litlen_lengths(), TableKind::LitLen)
            .expect("fixed literal/length tree is well-formed")
    })
}

/// The fixed distance decode table (block type 1).
pub fn fixed_distance_table() -> &'static HuffmanTable {
    FIXED_DISTANCE.get_or_init(|| {
        HuffmanTable::build(&fixed_distance_lengths(), TableKind::Distance)
            .expect("fixed distance tree is well-formed")
    })
}
