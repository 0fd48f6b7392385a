//! WAV file sink using `hound`

use bridge_traits::{
    error::{BridgeError, Result},
    playback::{PcmFormat, PcmSink, BYTES_PER_SAMPLE},
};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes delivered PCM into a 16-bit integer WAV file.
///
/// The file is created in `start`, once the output format is known, and the
/// header is finalized in `finish`. A sink dropped without `finish` still
/// leaves a readable file: hound finalizes on drop.
pub struct WavFileSink {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    samples_written: u64,
}

impl WavFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            samples_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Individual 16-bit samples written so far, all channels counted.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    fn map_hound_error(e: hound::Error) -> BridgeError {
        match e {
            hound::Error::IoError(io) => BridgeError::Io(io),
            other => BridgeError::OperationFailed(format!("WAV write failed: {}", other)),
        }
    }
}

impl PcmSink for WavFileSink {
    fn start(&mut self, format: &PcmFormat) -> Result<()> {
        if self.writer.is_some() {
            return Err(BridgeError::OperationFailed(
                "WAV sink already started".to_string(),
            ));
        }

        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample(),
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&self.path, spec).map_err(Self::map_hound_error)?;
        debug!(path = ?self.path, rate = format.sample_rate, channels = format.channels, "Created WAV file");

        self.writer = Some(writer);
        Ok(())
    }

    fn deliver(&mut self, chunk: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            BridgeError::OperationFailed("WAV sink received PCM before start".to_string())
        })?;

        if chunk.len() % BYTES_PER_SAMPLE != 0 {
            return Err(BridgeError::OperationFailed(format!(
                "chunk of {} bytes is not whole 16-bit samples",
                chunk.len()
            )));
        }

        for sample in chunk.chunks_exact(BYTES_PER_SAMPLE) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .map_err(Self::map_hound_error)?;
        }
        self.samples_written += (chunk.len() / BYTES_PER_SAMPLE) as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => {
                writer.finalize().map_err(Self::map_hound_error)?;
                debug!(path = ?self.path, samples = self.samples_written, "Finalized WAV file");
                Ok(())
            }
            None => {
                warn!(path = ?self.path, "WAV sink finished without being started");
                Ok(())
            }
        }
    }
}
