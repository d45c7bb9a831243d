// SampleDecoder - raw PCM byte stream to normalized f32 samples
//
// The decoding process delivers a canonical WAV stream: a 44-byte container
// header followed by 16-bit signed little-endian mono samples. The decoder
// skips the header exactly once (buffering partial header bytes across chunk
// boundaries), then converts each sample pair to a float in [-1.0, 1.0].
// A byte left dangling at a chunk boundary is carried into the next chunk;
// a byte left dangling at end-of-stream is a DecodeError.

use crate::config::WAV_HEADER_LEN;
use crate::error::DecodeError;

/// Incremental PCM decoder for one audio stream.
///
/// Samples are produced strictly in arrival order. The decoder is
/// append-only: feed chunks with [`decode_chunk`](Self::decode_chunk) and
/// call [`finish`](Self::finish) once the source signals end-of-stream.
#[derive(Debug)]
pub struct SampleDecoder {
    /// Header bytes still to be skipped; 0 once the header is complete
    header_remaining: usize,
    /// Low byte of a sample split across a chunk boundary
    pending: Option<u8>,
}

impl SampleDecoder {
    pub fn new() -> Self {
        Self {
            header_remaining: WAV_HEADER_LEN,
            pending: None,
        }
    }

    /// Decoder for a headerless stream of raw samples.
    pub fn raw() -> Self {
        Self {
            header_remaining: 0,
            pending: None,
        }
    }

    /// Decode one chunk of bytes, appending produced samples to `out`.
    ///
    /// Returns the number of samples produced from this chunk.
    pub fn decode_chunk(&mut self, chunk: &[u8], out: &mut Vec<f32>) -> usize {
        let mut data = chunk;

        // Consume the container header exactly once, possibly across
        // several chunks.
        if self.header_remaining > 0 {
            let skip = self.header_remaining.min(data.len());
            self.header_remaining -= skip;
            data = &data[skip..];
            if data.is_empty() {
                return 0;
            }
        }

        let before = out.len();
        let mut iter = data.iter().copied();

        // Pair a byte held over from the previous chunk with the first
        // byte of this one.
        if let Some(low) = self.pending.take() {
            if let Some(high) = iter.next() {
                out.push(Self::to_sample(low, high));
            } else {
                self.pending = Some(low);
                return 0;
            }
        }

        loop {
            match (iter.next(), iter.next()) {
                (Some(low), Some(high)) => out.push(Self::to_sample(low, high)),
                (Some(low), None) => {
                    self.pending = Some(low);
                    break;
                }
                _ => break,
            }
        }

        out.len() - before
    }

    /// Signal end-of-stream.
    ///
    /// Fails if the stream terminated mid-sample or inside the header.
    /// The dangling byte is discarded either way; the caller drops the
    /// fragment and continues.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if self.header_remaining > 0 {
            let got = WAV_HEADER_LEN - self.header_remaining;
            self.header_remaining = 0;
            return Err(DecodeError::TruncatedHeader {
                got,
                expected: WAV_HEADER_LEN,
            });
        }
        if self.pending.take().is_some() {
            return Err(DecodeError::TrailingByte);
        }
        Ok(())
    }

    /// Convert a 16-bit signed little-endian pair to a normalized float.
    #[inline]
    fn to_sample(low: u8, high: u8) -> f32 {
        i16::from_le_bytes([low, high]) as f32 / 32768.0
    }
}

impl Default for SampleDecoder {
    fn default() -> Self {
        Self::new()
    }
}
