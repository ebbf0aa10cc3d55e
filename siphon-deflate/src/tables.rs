//! Constant tables from RFC 1951.
//!
//! Base values and extra-bit counts for the length and distance alphabets,
//! the scrambled transmission order of code length code lengths, and the
//! code length assignment of the fixed Huffman trees.

/// Base match length for length codes 257..=285.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

/// Extra bits for length codes 257..=285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base distance for distance codes 0..=29.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits for distance codes 0..=29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of the code length code lengths in a dynamic block
/// header (RFC 1951 section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Code lengths of the fixed literal/length tree (RFC 1951 section 3.2.6).
///
/// Symbols 0..=143 use 8 bits, 144..=255 use 9 bits, 256..=279 use 7 bits
/// and 280..=287 use 8 bits. Symbols 286 and 287 participate in code
/// construction but never appear in a valid stream.
pub fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [8u8; 288];
    for length in lengths.iter_mut().take(256).skip(144) {
        *length = 9;
    }
    for length in lengths.iter_mut().take(280).skip(256) {
        *length = 7;
    }
    lengths
}

/// Code lengths of the fixed distance tree: 5 bits for all 30 codes, plus
/// the two reserved codes 30 and 31.
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}
