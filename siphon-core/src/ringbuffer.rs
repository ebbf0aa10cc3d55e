//! History window (sliding window) for LZ77-style back-references.
//!
//! This module provides a circular buffer holding the most recent output
//! bytes of a decode stream. Back-references may reach before the start of
//! the current call's output window - for example when a single logical
//! stream is decoded across many `transform` calls - in which case the bytes
//! are resolved from here instead of from the caller's buffer.
//!
//! DEFLATE uses a 32 KiB window; the buffer capacity must be a power of two
//! so wraparound is a mask rather than a modulo.

/// Common window sizes.
pub mod sizes {
    /// Window size for DEFLATE (32 KiB).
    pub const DEFLATE: usize = 32768;
}

/// A fixed-capacity ring buffer of recently produced bytes.
///
/// The window only ever grows up to `capacity` and is then overwritten
/// cyclically; it is never shrunk. Distance 1 is the most recently written
/// byte.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    buffer: Vec<u8>,
    /// Next write position.
    position: usize,
    /// Bytes available for back-references (saturates at capacity).
    size: usize,
    mask: usize,
}

impl HistoryWindow {
    /// Create a new window with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or not a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");
        assert!(
            capacity.is_power_of_two(),
            "Capacity must be a power of 2, got {}",
            capacity
        );

        Self {
            buffer: vec![0; capacity],
            position: 0,
            size: 0,
            mask: capacity - 1,
        }
    }

    /// Create a window sized for DEFLATE (32 KiB).
    pub fn deflate() -> Self {
        Self::new(sizes::DEFLATE)
    }

    /// Capacity of the window.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes currently available for back-references.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether no bytes have been written yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reset to the initial empty state.
    pub fn clear(&mut self) {
        self.position = 0;
        self.size = 0;
        self.buffer.fill(0);
    }

    /// Append a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        if self.size < self.buffer.len() {
            self.size += 1;
        }
    }

    /// Append multiple bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Read the byte `distance` positions back from the write position.
    ///
    /// Distance is 1-based; `None` when the distance is zero or reaches
    /// before the oldest available byte. Bounds policy (which error to raise)
    /// is left to the caller.
    #[inline]
    pub fn read_at_distance(&self, distance: usize) -> Option<u8> {
        if distance == 0 || distance > self.size {
            return None;
        }
        let index = self.position.wrapping_sub(distance) & self.mask;
        Some(self.buffer[index])
    }

    /// Preload the window with dictionary data.
    ///
    /// Used for preset dictionaries (zlib FDICT): the dictionary becomes
    /// back-reference history without being part of the output. If the
    /// dictionary is larger than the capacity only the trailing `capacity`
    /// bytes are kept, per the zlib convention.
    pub fn preload(&mut self, dictionary: &[u8]) {
        let tail = if dictionary.len() > self.buffer.len() {
            &dictionary[dictionary.len() - self.buffer.len()..]
        } else {
            dictionary
        };
        self.extend(tail);
    }
}
