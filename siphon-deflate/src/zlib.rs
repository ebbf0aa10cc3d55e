//! The zlib wrapper (RFC 1950): a two-byte header, an optional preset
//! dictionary id, a deflate body, and an Adler-32 trailer.
//!
//! [`ZlibDecoder`] is resumable with the same contract as the inner
//! [`Inflater`]: header bytes, the dictionary id and the trailer can all
//! arrive split across calls. The deflate layer returns any whole bytes it
//! over-read at end of stream, so the trailer is picked up at the exact
//! byte the body ends on.

use siphon_core::io::{ByteReader, ByteWriter};
use siphon_core::traits::{Status, StreamDecoder};

use crate::error::ZlibError;
use crate::inflate::Inflater;

const METHOD_DEFLATE: u8 = 8;

/// Rolling Adler-32 checksum (RFC 1950 section 9).
#[derive(Debug, Clone)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    const MODULUS: u32 = 65521;
    /// Largest run of 0xFF bytes before `b` can overflow a u32.
    const CHUNK: usize = 5552;

    /// A checksum over nothing, which is 1.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Fold `data` into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(Self::CHUNK) {
            for &byte in chunk {
                self.a += u32::from(byte);
                self.b += self.a;
            }
            self.a %= Self::MODULUS;
            self.b %= Self::MODULUS;
        }
    }

    /// The checksum of everything folded in so far.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// One-shot checksum of `data`.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Header { got: u8 },
    DictId { got: u8 },
    Body,
    Trailer { got: u8 },
    Done,
}

/// A resumable zlib stream decoder.
///
/// Streams compressed with a preset dictionary (FDICT) need
/// [`set_dictionary`](Self::set_dictionary) called before decoding reaches
/// the body; without it, `transform` fails with
/// [`ZlibError::MissingDictionary`] carrying the dictionary's Adler-32 id,
/// which is also available from [`dictionary_id`](Self::dictionary_id).
#[derive(Debug)]
pub struct ZlibDecoder {
    state: State,
    inflater: Inflater,
    adler: Adler32,
    /// CMF/FLG, then reused for the dictionary id and the trailer.
    scratch: [u8; 4],
    dict_id: Option<u32>,
    dict_checksum: Option<u32>,
    failed: Option<ZlibError>,
}

impl Default for ZlibDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZlibDecoder {
    /// Create a decoder positioned at the start of a stream.
    pub fn new() -> Self {
        Self {
            state: State::Header { got: 0 },
            inflater: Inflater::new(),
            adler: Adler32::new(),
            scratch: [0; 4],
            dict_id: None,
            dict_checksum: None,
            failed: None,
        }
    }

    /// Supply the preset dictionary for an FDICT stream.
    ///
    /// The dictionary becomes back-reference history and its Adler-32 is
    /// checked against the id the stream names.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.dict_checksum = Some(Adler32::checksum(dictionary));
        self.inflater.add_history(dictionary);
    }

    /// The dictionary id the stream names, once it has been read.
    pub fn dictionary_id(&self) -> Option<u32> {
        self.dict_id
    }

    /// Decode from `src` into `dst` until the stream ends or a resource
    /// runs out. Same contract as [`Inflater::transform`].
    pub fn transform(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, ZlibError> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        let result = self.run(dst, src);
        if let Err(err) = result {
            self.failed = Some(err);
        }
        result
    }

    fn run(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, ZlibError> {
        loop {
            match self.state {
                State::Header { got } => {
                    if self.fill_scratch(src, got, 2).is_none() {
                        return self.short_read(src);
                    }
                    let cmf = self.scratch[0];
                    let flg = self.scratch[1];
                    if cmf & 0x0F != METHOD_DEFLATE {
                        return Err(ZlibError::UnsupportedMethod {
                            method: cmf & 0x0F,
                        });
                    }
                    // CINFO beyond 7 would mean a window over 32 KiB.
                    if cmf >> 4 > 7 {
                        return Err(ZlibError::BadHeader);
                    }
                    if (u32::from(cmf) * 256 + u32::from(flg)) % 31 != 0 {
                        return Err(ZlibError::BadHeader);
                    }
                    self.state = if flg & 0x20 != 0 {
                        State::DictId { got: 0 }
                    } else {
                        State::Body
                    };
                }

                State::DictId { got } => {
                    if self.fill_scratch(src, got, 4).is_none() {
                        return self.short_read(src);
                    }
                    let id = u32::from_be_bytes(self.scratch);
                    self.dict_id = Some(id);
                    match self.dict_checksum {
                        None => return Err(ZlibError::MissingDictionary { id }),
                        Some(checksum) if checksum != id => {
                            return Err(ZlibError::DictionaryMismatch { id });
                        }
                        Some(_) => self.state = State::Body,
                    }
                }

                State::Body => {
                    let before = dst.position();
                    let status = self.inflater.transform(dst, src)?;
                    self.adler.update(&dst.written()[before..]);
                    match status {
                        Status::Done => self.state = State::Trailer { got: 0 },
                        suspension => return Ok(suspension),
                    }
                }

                State::Trailer { got } => {
                    if self.fill_scratch(src, got, 4).is_none() {
                        return self.short_read(src);
                    }
                    let stored = u32::from_be_bytes(self.scratch);
                    let computed = self.adler.finish();
                    if stored != computed {
                        return Err(ZlibError::ChecksumMismatch { stored, computed });
                    }
                    self.state = State::Done;
                }

                State::Done => return Ok(Status::Done),
            }
        }
    }

    /// Accumulate bytes into `scratch[..want]` across calls. `None` is a
    /// short read with the partial count saved back into the state.
    fn fill_scratch(&mut self, src: &mut ByteReader<'_>, got: u8, want: u8) -> Option<u8> {
        let mut got = got;
        while got < want {
            let Some(byte) = src.read_byte() else {
                self.state = match self.state {
                    State::Header { .. } => State::Header { got },
                    State::DictId { .. } => State::DictId { got },
                    State::Trailer { .. } => State::Trailer { got },
                    other => other,
                };
                return None;
            };
            self.scratch[got as usize] = byte;
            got += 1;
        }
        Some(got)
    }

    fn short_read(&self, src: &ByteReader<'_>) -> Result<Status, ZlibError> {
        if src.is_closed() && src.available() == 0 {
            Err(ZlibError::UnexpectedEof)
        } else {
            Ok(Status::NeedsInput)
        }
    }
}

impl StreamDecoder for ZlibDecoder {
    type Error = ZlibError;

    fn transform(
        &mut self,
        dst: &mut ByteWriter<'_>,
        src: &mut ByteReader<'_>,
    ) -> Result<Status, ZlibError> {
        ZlibDecoder::transform(self, dst, src)
    }

    fn workbuf_len(&self) -> (u64, u64) {
        self.inflater.workbuf_len()
    }
}

/// Decompress a complete zlib stream into a `Vec`, verifying the trailer.
pub fn zlib_decompress(data: &[u8]) -> Result<Vec<u8>, ZlibError> {
    let mut decoder = ZlibDecoder::new();
    let mut out = Vec::new();
    let mut src = ByteReader::new(data, true);
    let mut buf = [0u8; 4096];
    loop {
        let mut dst = ByteWriter::new(&mut buf);
        let status = decoder.transform(&mut dst, &mut src)?;
        out.extend_from_slice(dst.written());
        match status {
            Status::Done => return Ok(out),
            Status::NeedsOutput => {}
            Status::NeedsInput => return Err(ZlibError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeflateError;

    /// zlib compression of the empty string.
    const ZLIB_EMPTY: [u8; 8] = [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];

    /// zlib compression of "a".
    const ZLIB_A: [u8; 9] = [0x78, 0x9C, 0x4B, 0x04, 0x00, 0x00, 0x62, 0x00, 0x62];

    /// FDICT stream: dictionary "abc", body is a single match of length 3
    /// at distance 3 reaching entirely into the dictionary.
    const ZLIB_DICT_ABC: [u8; 13] = [
        0x78, 0x20, // CMF/FLG with FDICT set
        0x02, 0x4D, 0x01, 0x27, // DICTID = adler32("abc")
        0x03, 0x22, 0x00, // deflate body
        0x02, 0x4D, 0x01, 0x27, // trailer, also adler32("abc")
    ];

    #[test]
    fn test_adler32() {
        assert_eq!(Adler32::checksum(b""), 1);
        assert_eq!(Adler32::checksum(b"a"), 0x0062_0062);
        assert_eq!(Adler32::checksum(b"abc"), 0x024D_0127);
        // RFC 1950 example value.
        assert_eq!(Adler32::checksum(b"Wikipedia"), 0x11E6_0398);

        // Incremental equals one-shot.
        let mut hasher = Adler32::new();
        hasher.update(b"Wiki");
        hasher.update(b"pedia");
        assert_eq!(hasher.finish(), 0x11E6_0398);
    }

    #[test]
    fn test_decompress_empty() {
        assert_eq!(zlib_decompress(&ZLIB_EMPTY).unwrap(), b"");
    }

    #[test]
    fn test_decompress_single_byte() {
        assert_eq!(zlib_decompress(&ZLIB_A).unwrap(), b"a");
    }

    #[test]
    fn test_chunked_trailer_handoff() {
        // One byte per call: the body/trailer boundary must land exactly.
        let mut decoder = ZlibDecoder::new();
        let mut out = Vec::new();
        let mut buf = [0u8; 16];
        let mut offset = 0;
        loop {
            let end = (offset + 1).min(ZLIB_A.len());
            let mut src = ByteReader::new(&ZLIB_A[offset..end], end == ZLIB_A.len());
            let mut dst = ByteWriter::new(&mut buf);
            let status = decoder.transform(&mut dst, &mut src).unwrap();
            out.extend_from_slice(dst.written());
            offset += src.position();
            if status == Status::Done {
                break;
            }
        }
        assert_eq!(out, b"a");
        assert_eq!(offset, ZLIB_A.len());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut data = ZLIB_A;
        *data.last_mut().unwrap() ^= 0xFF;
        assert_eq!(
            zlib_decompress(&data).unwrap_err(),
            ZlibError::ChecksumMismatch {
                stored: 0x0062_009D,
                computed: 0x0062_0062
            }
        );
    }

    #[test]
    fn test_bad_header() {
        // FCHECK off by one.
        assert!(matches!(
            zlib_decompress(&[0x78, 0x9D, 0x03, 0x00]).unwrap_err(),
            ZlibError::BadHeader
        ));
        // Method 7 is not deflate.
        assert_eq!(
            zlib_decompress(&[0x77, 0x00]).unwrap_err(),
            ZlibError::UnsupportedMethod { method: 7 }
        );
        // CINFO 8: a 64 KiB window.
        assert!(matches!(
            zlib_decompress(&[0x88, 0x00]).unwrap_err(),
            ZlibError::BadHeader
        ));
    }

    #[test]
    fn test_preset_dictionary() {
        let mut decoder = ZlibDecoder::new();
        decoder.set_dictionary(b"abc");

        let mut buf = [0u8; 16];
        let mut src = ByteReader::new(&ZLIB_DICT_ABC, true);
        let mut dst = ByteWriter::new(&mut buf);
        assert_eq!(
            decoder.transform(&mut dst, &mut src).unwrap(),
            Status::Done
        );
        assert_eq!(dst.written(), b"abc");
        assert_eq!(decoder.dictionary_id(), Some(0x024D_0127));
    }

    #[test]
    fn test_missing_dictionary() {
        let err = zlib_decompress(&ZLIB_DICT_ABC).unwrap_err();
        assert_eq!(err, ZlibError::MissingDictionary { id: 0x024D_0127 });
    }

    #[test]
    fn test_wrong_dictionary() {
        let mut decoder = ZlibDecoder::new();
        decoder.set_dictionary(b"xyz");

        let mut buf = [0u8; 16];
        let mut src = ByteReader::new(&ZLIB_DICT_ABC, true);
        let mut dst = ByteWriter::new(&mut buf);
        assert_eq!(
            decoder.transform(&mut dst, &mut src).unwrap_err(),
            ZlibError::DictionaryMismatch { id: 0x024D_0127 }
        );
    }

    #[test]
    fn test_body_error_passes_through() {
        // Valid header, then a reserved block type.
        let err = zlib_decompress(&[0x78, 0x9C, 0x07, 0x00]).unwrap_err();
        assert_eq!(
            err,
            ZlibError::Deflate(DeflateError::BadBlockType { btype: 3 })
        );
    }

    #[test]
    fn test_truncated() {
        // Cut inside the deflate body.
        assert_eq!(
            zlib_decompress(&ZLIB_A[..4]).unwrap_err(),
            ZlibError::Deflate(DeflateError::UnexpectedEof)
        );
        // Cut inside the trailer.
        assert_eq!(
            zlib_decompress(&ZLIB_A[..7]).unwrap_err(),
            ZlibError::UnexpectedEof
        );
        // Cut inside the header.
        assert_eq!(
            zlib_decompress(&ZLIB_A[..1]).unwrap_err(),
            ZlibError::UnexpectedEof
        );
    }
}
