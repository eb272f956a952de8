use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::io::pcm::PcmFormat;
use crate::io::wav;

/// What [`OutputSink::finalize`] left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    /// `None` once the raw capture has been removed.
    pub raw_path: Option<PathBuf>,
    pub wav_path: PathBuf,
    /// Payload bytes in the WAV `data` chunk.
    pub data_len: u32,
}

/// Append-only raw PCM capture, rewritten as a WAV container when closed.
#[derive(Debug)]
pub struct OutputSink {
    raw: Option<BufWriter<File>>,
    raw_path: PathBuf,
    wav_path: PathBuf,
    keep_raw: bool,
    format: PcmFormat,
    bytes: u64,
    failures: u64,
}

impl OutputSink {
    /// Create (or truncate) the raw capture file.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let path = config.raw_capture_path.clone();
        let file = File::create(&path).map_err(|source| EngineError::Capture {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "raw capture opened");

        Ok(Self {
            raw: Some(BufWriter::new(file)),
            raw_path: path,
            wav_path: config.wav_path.clone(),
            keep_raw: config.keep_raw_capture,
            format: PcmFormat::CD,
            bytes: 0,
            failures: 0,
        })
    }

    /// Append one block. Failures are logged and the block is dropped from
    /// the capture; they never interrupt rendering.
    pub fn capture(&mut self, block: &[u8]) {
        let Some(raw) = self.raw.as_mut() else {
            return;
        };
        match raw.write_all(block) {
            Ok(()) => self.bytes += block.len() as u64,
            Err(err) => {
                self.failures += 1;
                if self.failures == 1 {
                    error!(path = %self.raw_path.display(), error = %err, "raw capture write failed");
                } else {
                    debug!(failures = self.failures, error = %err, "raw capture write failed again");
                }
            }
        }
    }

    /// Bytes accepted by the capture so far.
    pub fn bytes_captured(&self) -> u64 {
        self.bytes
    }

    /// Flush and close the raw file, then write the WAV container.
    pub fn finalize(mut self) -> Result<CaptureSummary> {
        if let Some(mut raw) = self.raw.take() {
            raw.flush().map_err(|source| EngineError::Capture {
                path: self.raw_path.clone(),
                source,
            })?;
        }
        if self.failures > 0 {
            warn!(failures = self.failures, "capture is missing blocks");
        }

        let data_len = wav::raw_to_wav(&self.raw_path, &self.wav_path, &self.format).map_err(
            |source| EngineError::Finalize {
                path: self.wav_path.clone(),
                source,
            },
        )?;
        info!(path = %self.wav_path.display(), data_len, "wav written");

        let raw_path = if self.keep_raw {
            Some(self.raw_path.clone())
        } else {
            if let Err(err) = fs::remove_file(&self.raw_path) {
                warn!(path = %self.raw_path.display(), error = %err, "could not remove raw capture");
            }
            None
        };

        Ok(CaptureSummary {
            raw_path,
            wav_path: self.wav_path.clone(),
            data_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &tempfile::TempDir) -> EngineConfig {
        EngineConfig::default().capture_paths(dir.path().join("out.raw"), dir.path().join("out.wav"))
    }

    #[test]
    fn finalize_wraps_captured_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = OutputSink::open(&config(&dir)).unwrap();
        sink.capture(&[1u8; 8192]);
        sink.capture(&[2u8; 8192]);
        assert_eq!(sink.bytes_captured(), 16384);

        let summary = sink.finalize().unwrap();
        assert_eq!(summary.data_len, 16384);
        let wav = fs::read(&summary.wav_path).unwrap();
        assert_eq!(wav.len(), 44 + 16384);
        assert_eq!(&wav[44..48], &[1, 1, 1, 1]);
        assert_eq!(wav[wav.len() - 1], 2);
        assert!(summary.raw_path.unwrap().exists());
    }

    #[test]
    fn raw_capture_can_be_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = OutputSink::open(&config(&dir).keep_raw_capture(false)).unwrap();
        sink.capture(&[0u8; 64]);
        let summary = sink.finalize().unwrap();
        assert!(summary.raw_path.is_none());
        assert!(!dir.path().join("out.raw").exists());
        assert!(summary.wav_path.exists());
    }

    #[test]
    fn empty_capture_still_produces_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = OutputSink::open(&config(&dir)).unwrap();
        let summary = sink.finalize().unwrap();
        assert_eq!(summary.data_len, 0);
        assert_eq!(fs::read(summary.wav_path).unwrap().len(), 44);
    }

    #[test]
    fn unwritable_capture_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default()
            .capture_paths(dir.path().join("missing/out.raw"), dir.path().join("out.wav"));
        assert!(matches!(
            OutputSink::open(&config),
            Err(EngineError::Capture { .. })
        ));
    }

    #[test]
    fn unwritable_wav_path_fails_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default()
            .capture_paths(dir.path().join("out.raw"), dir.path().join("missing/out.wav"));
        let sink = OutputSink::open(&config).unwrap();
        assert!(matches!(sink.finalize(), Err(EngineError::Finalize { .. })));
    }
}
