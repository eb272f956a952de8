/*
WAV container
=============

The render loop captures raw PCM while it runs and only knows the payload
length once it stops, so the container is written afterwards in one pass:

  offset  size  field
  ------  ----  -----------------------------------------------
       0     4  "RIFF"
       4     4  chunk size = 36 + data_len
       8     4  "WAVE"
      12     4  "fmt "
      16     4  subchunk 1 size = 16
      20     2  audio format = 1 (PCM)
      22     2  channels
      24     4  sample rate
      28     4  byte rate = sample_rate * channels * bits / 8
      32     2  block align = channels * bits / 8
      34     2  bits per sample
      36     4  "data"
      40     4  data_len
      44     …  raw PCM payload, verbatim

All integers little-endian.
*/

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::pcm::PcmFormat;

pub const HEADER_LEN: usize = 44;

/// Write the 44-byte RIFF/WAVE header for a `data_len` byte payload.
pub fn write_header<W: Write>(out: &mut W, format: &PcmFormat, data_len: u32) -> io::Result<()> {
    let chunk_size = data_len.checked_add(36).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "PCM payload too large for RIFF")
    })?;

    out.write_all(b"RIFF")?;
    out.write_all(&chunk_size.to_le_bytes())?;
    out.write_all(b"WAVE")?;
    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?;
    out.write_all(&format.channels.to_le_bytes())?;
    out.write_all(&format.sample_rate.to_le_bytes())?;
    out.write_all(&format.byte_rate().to_le_bytes())?;
    out.write_all(&format.block_align().to_le_bytes())?;
    out.write_all(&format.bits_per_sample.to_le_bytes())?;
    out.write_all(b"data")?;
    out.write_all(&data_len.to_le_bytes())?;
    Ok(())
}

/// Wrap a raw payload read from `raw` into a WAV written to `out`.
pub fn write_wav<R: Read, W: Write>(
    raw: &mut R,
    data_len: u32,
    format: &PcmFormat,
    out: &mut W,
) -> io::Result<()> {
    write_header(out, format, data_len)?;
    let copied = io::copy(&mut raw.take(data_len as u64), out)?;
    if copied != data_len as u64 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("raw capture shrank: expected {data_len} bytes, copied {copied}"),
        ));
    }
    out.flush()
}

/// Rewrite the raw capture at `raw_path` into a WAV file at `wav_path`.
///
/// Returns the payload length in bytes.
pub fn raw_to_wav(raw_path: &Path, wav_path: &Path, format: &PcmFormat) -> io::Result<u32> {
    let raw = File::open(raw_path)?;
    let len = raw.metadata()?.len();
    let data_len = u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("raw capture of {len} bytes does not fit a WAV container"),
        )
    })?;

    let mut reader = BufReader::new(raw);
    let mut writer = BufWriter::new(File::create(wav_path)?);
    write_wav(&mut reader, data_len, format, &mut writer)?;
    Ok(data_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn header_layout_matches_riff() {
        let mut out = Vec::new();
        write_header(&mut out, &PcmFormat::CD, 8192).unwrap();

        assert_eq!(out.len(), HEADER_LEN);
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(u32_at(&out, 4), 36 + 8192);
        assert_eq!(&out[8..12], b"WAVE");
        assert_eq!(&out[12..16], b"fmt ");
        assert_eq!(u32_at(&out, 16), 16);
        assert_eq!(u16_at(&out, 20), 1);
        assert_eq!(u16_at(&out, 22), 2);
        assert_eq!(u32_at(&out, 24), 44_100);
        assert_eq!(u32_at(&out, 28), 176_400);
        assert_eq!(u16_at(&out, 32), 4);
        assert_eq!(u16_at(&out, 34), 16);
        assert_eq!(&out[36..40], b"data");
        assert_eq!(u32_at(&out, 40), 8192);
    }

    #[test]
    fn payload_is_copied_verbatim() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut out = Vec::new();
        write_wav(&mut payload.as_slice(), 1000, &PcmFormat::CD, &mut out).unwrap();

        assert_eq!(out.len(), HEADER_LEN + 1000);
        assert_eq!(&out[HEADER_LEN..], payload.as_slice());
    }

    #[test]
    fn short_payload_is_an_error() {
        let payload = [0u8; 10];
        let mut out = Vec::new();
        let err = write_wav(&mut payload.as_slice(), 20, &PcmFormat::CD, &mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn empty_capture_gives_header_only() {
        let mut out = Vec::new();
        write_wav(&mut io::empty(), 0, &PcmFormat::CD, &mut out).unwrap();
        assert_eq!(out.len(), HEADER_LEN);
        assert_eq!(u32_at(&out, 4), 36);
    }
}
