//! Playback bridge traits and supporting audio types.
//!
//! The core decode session pushes interleaved PCM to the host through
//! [`PcmSink`]. Hosts implement the trait for whatever consumes audio on their
//! side: a Java callback on Android, a WAV writer on desktop, a channel in
//! tests.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Width in bytes of one signed 16-bit sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Supported audio codec identifiers.
///
/// Use [`AudioCodec::Other`] for codecs not explicitly listed here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCodec {
    Mp3,
    Aac,
    Flac,
    Vorbis,
    Opus,
    Pcm,
    Alac,
    Ape,
    /// Codec is unknown or not yet mapped to a dedicated variant.
    Unknown,
    /// Vendor- or platform-specific codec.
    Other(String),
}

impl AudioCodec {
    /// Stable numeric code handed to hosts that cannot carry the enum itself.
    pub fn code(&self) -> u32 {
        match self {
            AudioCodec::Unknown => 0,
            AudioCodec::Mp3 => 1,
            AudioCodec::Aac => 2,
            AudioCodec::Flac => 3,
            AudioCodec::Vorbis => 4,
            AudioCodec::Opus => 5,
            AudioCodec::Pcm => 6,
            AudioCodec::Alac => 7,
            AudioCodec::Ape => 8,
            AudioCodec::Other(_) => 255,
        }
    }
}

/// Layout of the PCM a sink receives.
///
/// Samples are always signed 16-bit little-endian and interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        (BYTES_PER_SAMPLE * 8) as u16
    }

    /// Bytes occupied by one sample across all channels.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    /// Exact length of a chunk holding `samples` samples per channel.
    pub fn chunk_len(&self, samples: usize) -> usize {
        samples * self.frame_bytes()
    }
}

/// Receiver of decoded PCM chunks.
///
/// `deliver` is called synchronously from the decode loop with a slice that is
/// only valid for the duration of the call; implementations copy what they
/// need. Chunks arrive in decode order and are never empty.
pub trait PcmSink {
    /// Called once before the first chunk.
    fn start(&mut self, format: &PcmFormat) -> Result<()> {
        let _ = format;
        Ok(())
    }

    /// Consume one chunk of interleaved S16LE samples.
    fn deliver(&mut self, chunk: &[u8]) -> Result<()>;

    /// Called once after the last chunk, on success and failure alike.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapts a closure into a [`PcmSink`] that only handles `deliver`.
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    pub fn new(deliver: F) -> Self {
        Self(deliver)
    }
}

impl<F> PcmSink for FnSink<F>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    fn deliver(&mut self, chunk: &[u8]) -> Result<()> {
        (self.0)(chunk)
    }
}

impl<S: PcmSink + ?Sized> PcmSink for &mut S {
    fn start(&mut self, format: &PcmFormat) -> Result<()> {
        (**self).start(format)
    }

    fn deliver(&mut self, chunk: &[u8]) -> Result<()> {
        (**self).deliver(chunk)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

impl<S: PcmSink + ?Sized> PcmSink for Box<S> {
    fn start(&mut self, format: &PcmFormat) -> Result<()> {
        (**self).start(format)
    }

    fn deliver(&mut self, chunk: &[u8]) -> Result<()> {
        (**self).deliver(chunk)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
