//! Byte cursors for resumable decoders.
//!
//! A decoder call operates on two borrowed windows: a [`ByteReader`] over the
//! compressed input and a [`ByteWriter`] over the output buffer. Both are
//! plain index cursors; a decoder advances the indices and never keeps a
//! reference to either across calls.
//!
//! The reader additionally carries a `closed` flag. The distinction matters
//! for suspension: "0 bytes available, not closed" means the caller will
//! supply more input later (short read), while "0 bytes available, closed"
//! means no byte will ever arrive, which is a hard error whenever the format
//! structurally requires more data.

/// A read cursor over a borrowed byte slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    closed: bool,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader over `data`.
    ///
    /// `closed` should be true when `data` ends the logical stream, i.e. no
    /// further bytes will ever be supplied after this window is exhausted.
    pub fn new(data: &'a [u8], closed: bool) -> Self {
        Self {
            data,
            pos: 0,
            closed,
        }
    }

    /// Number of unread bytes remaining in this window.
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the logical stream ends with this window.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of bytes consumed so far from this window.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Look at the next byte without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Consume and return the next byte, or `None` when the window is empty.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume up to `n` bytes, returning the slice actually available.
    ///
    /// The returned slice may be shorter than `n`; an empty slice signals a
    /// short read.
    pub fn read_slice(&mut self, n: usize) -> &'a [u8] {
        let n = n.min(self.available());
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    /// Skip up to `n` bytes, returning how many were skipped.
    pub fn skip(&mut self, n: usize) -> usize {
        let n = n.min(self.available());
        self.pos += n;
        n
    }

    /// Step the cursor back over the last `n` consumed bytes.
    ///
    /// Returns false (and moves nothing) when fewer than `n` bytes have been
    /// consumed from this window. Decoders that batch whole bytes into a bit
    /// accumulator use this to return unconsumed bytes at a suspension point,
    /// keeping the cursor position byte-exact for the caller.
    #[inline]
    pub fn unread(&mut self, n: usize) -> bool {
        if self.pos >= n {
            self.pos -= n;
            true
        } else {
            false
        }
    }

    /// The unread remainder of this window, without consuming it.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

/// A write cursor over a borrowed byte slice.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Create a new writer over `data`.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of writable bytes remaining in this window.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Number of bytes written so far to this window.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Append one byte. Returns false (a short write) when the window is full.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> bool {
        if self.pos < self.data.len() {
            self.data[self.pos] = byte;
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Append as much of `bytes` as fits, returning how many were written.
    pub fn write_slice(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.data[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
        n
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.data[..self.pos]
    }

    /// The writable remainder of this window.
    ///
    /// Paired with [`advance`](Self::advance) this allows a decoder's inner
    /// loop to fill the window directly instead of going through
    /// [`write_byte`](Self::write_byte).
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.data[self.pos..]
    }

    /// Mark `n` bytes of the unfilled region as written.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the remaining space.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.remaining(), "advance past end of output window");
        self.pos += n;
    }
}
