//! Headerless PCM file sink

use bridge_traits::{
    error::{BridgeError, Result},
    playback::{PcmFormat, PcmSink},
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends every chunk verbatim to a file.
///
/// The output is raw interleaved S16LE with no header; the format is only
/// available from [`format`](Self::format) after `start`.
pub struct RawPcmFileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    format: Option<PcmFormat>,
    bytes_written: u64,
}

impl RawPcmFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            format: None,
            bytes_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Option<PcmFormat> {
        self.format
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl PcmSink for RawPcmFileSink {
    fn start(&mut self, format: &PcmFormat) -> Result<()> {
        let file = File::create(&self.path)?;
        debug!(path = ?self.path, "Created raw PCM file");

        self.writer = Some(BufWriter::new(file));
        self.format = Some(*format);
        Ok(())
    }

    fn deliver(&mut self, chunk: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            BridgeError::OperationFailed("raw sink received PCM before start".to_string())
        })?;

        writer.write_all(chunk)?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(path = ?self.path, bytes = self.bytes_written, "Closed raw PCM file");
        }
        Ok(())
    }
}
