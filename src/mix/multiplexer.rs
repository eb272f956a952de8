//! Sums any number of s16le stereo streams into one.
//!
//! A read of K bytes pulls K bytes from every constituent stream and adds the
//! samples position by position; the streams are never concatenated. A
//! stream that comes up short contributes silence for the rest of the read.
//! Only whole frames are mixed, and sums are folded back to 16 bits with the
//! configured [`OverflowMode`].

use std::io::{self, ErrorKind, Read};

use tracing::warn;

use crate::config::OverflowMode;
use crate::io::pcm::{self, PcmFormat};

pub struct StreamMultiplexer {
    format: PcmFormat,
    overflow: OverflowMode,
    streams: Vec<Box<dyn Read + Send>>,
    scratch: Vec<u8>,
    acc: Vec<i32>,
}

impl StreamMultiplexer {
    pub fn new(format: PcmFormat, overflow: OverflowMode) -> Self {
        Self {
            format,
            overflow,
            streams: Vec::new(),
            scratch: Vec::new(),
            acc: Vec::new(),
        }
    }

    /// Add an externally rendered stream (file, pipe, device capture...).
    pub fn add_stream(&mut self, stream: Box<dyn Read + Send>) {
        self.streams.push(stream);
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn overflow(&self) -> OverflowMode {
        self.overflow
    }

    pub fn set_overflow(&mut self, overflow: OverflowMode) {
        self.overflow = overflow;
    }

    /// Mix `internal` streams and every owned stream into `out`.
    ///
    /// Returns the byte length of the longest contribution (whole frames),
    /// so 0 means every stream was exhausted. Bytes of `out` past that
    /// length are left untouched.
    pub fn read_mixed<R: Read>(&mut self, internal: &mut [R], out: &mut [u8]) -> io::Result<usize> {
        let frame = self.format.bytes_per_frame();
        let len = out.len() - out.len() % frame;
        let sample_bytes = self.format.bytes_per_sample();

        self.acc.clear();
        self.acc.resize(len / sample_bytes, 0);
        self.scratch.resize(len.max(self.scratch.len()), 0);

        let mut longest = 0;
        for stream in internal.iter_mut() {
            let got = read_frames(stream, &mut self.scratch[..len], frame)?;
            accumulate(&mut self.acc, &self.scratch[..got]);
            longest = longest.max(got);
        }
        for (index, stream) in self.streams.iter_mut().enumerate() {
            // one bad external stream must not take the whole mix down
            let got = match read_frames(stream, &mut self.scratch[..len], frame) {
                Ok(got) => got,
                Err(err) => {
                    warn!(index, error = %err, "external stream read failed, treating as silence");
                    0
                }
            };
            accumulate(&mut self.acc, &self.scratch[..got]);
            longest = longest.max(got);
        }

        for (bytes, sum) in out[..longest]
            .chunks_exact_mut(sample_bytes)
            .zip(&self.acc)
        {
            bytes.copy_from_slice(&pcm::fold(*sum, self.overflow).to_le_bytes());
        }
        Ok(longest)
    }
}

impl Read for StreamMultiplexer {
    /// Mix the owned streams only.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_mixed::<io::Empty>(&mut [], buf)
    }
}

/// Fill `buf` from `stream` until it is full or the stream ends, then round
/// down to whole frames.
fn read_frames<R: Read + ?Sized>(stream: &mut R, buf: &mut [u8], frame: usize) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled - filled % frame)
}

#[inline]
fn accumulate(acc: &mut [i32], bytes: &[u8]) {
    for (sum, sample) in acc.iter_mut().zip(bytes.chunks_exact(2)) {
        *sum += pcm::read_sample(sample) as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn samples(bytes: &[u8]) -> Vec<i16> {
        bytes.chunks_exact(2).map(pcm::read_sample).collect()
    }

    #[test]
    fn sums_instead_of_concatenating() {
        let mut mux = StreamMultiplexer::new(PcmFormat::CD, OverflowMode::Wrap);
        let mut internal = vec![
            Cursor::new(pcm_bytes(&[100, -100, 5, 5])),
            Cursor::new(pcm_bytes(&[1, 2, 3, 4])),
        ];

        let mut out = [0u8; 8];
        let n = mux.read_mixed(&mut internal, &mut out).unwrap();
        assert_eq!(n, 8);
        assert_eq!(samples(&out), vec![101, -98, 8, 9]);
    }

    #[test]
    fn short_streams_contribute_silence() {
        let mut mux = StreamMultiplexer::new(PcmFormat::CD, OverflowMode::Wrap);
        mux.add_stream(Box::new(Cursor::new(pcm_bytes(&[10, 10]))));
        // half a frame is dropped
        mux.add_stream(Box::new(Cursor::new(pcm_bytes(&[1, 1, 1, 1, 7]))));

        let mut out = [0u8; 12];
        let n = mux.read(&mut out).unwrap();
        assert_eq!(n, 8);
        assert_eq!(samples(&out[..n]), vec![11, 11, 1, 1]);
    }

    #[test]
    fn exhausted_streams_read_zero() {
        let mut mux = StreamMultiplexer::new(PcmFormat::CD, OverflowMode::Wrap);
        mux.add_stream(Box::new(Cursor::new(pcm_bytes(&[1, 2]))));

        let mut out = [0u8; 4];
        assert_eq!(mux.read(&mut out).unwrap(), 4);
        assert_eq!(mux.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn overflowing_sums_follow_the_mode() {
        let loud = pcm_bytes(&[30_000, -30_000]);

        let mut wrap = StreamMultiplexer::new(PcmFormat::CD, OverflowMode::Wrap);
        let mut out = [0u8; 4];
        wrap.read_mixed(&mut [Cursor::new(loud.clone()), Cursor::new(loud.clone())], &mut out)
            .unwrap();
        assert_eq!(samples(&out), vec![60_000i32 as i16, -60_000i32 as i16]);

        let mut saturate = StreamMultiplexer::new(PcmFormat::CD, OverflowMode::Saturate);
        saturate
            .read_mixed(&mut [Cursor::new(loud.clone()), Cursor::new(loud)], &mut out)
            .unwrap();
        assert_eq!(samples(&out), vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn single_stream_passes_through() {
        let data = pcm_bytes(&[1, -1, i16::MAX, i16::MIN]);
        let mut mux = StreamMultiplexer::new(PcmFormat::CD, OverflowMode::Wrap);
        let mut out = [0u8; 8];
        mux.read_mixed(&mut [Cursor::new(data.clone())], &mut out).unwrap();
        assert_eq!(out.to_vec(), data);
    }
}
