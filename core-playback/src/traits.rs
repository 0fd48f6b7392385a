//! # Core Playback Traits
//!
//! Backend seam between the decode session and the library that actually
//! parses containers, decodes packets and converts sample rates.
//!
//! ## Architecture
//!
//! A [`MediaBackend`] hands out three owned handles, acquired in order and
//! released in reverse:
//!
//! ```text
//! MediaContainer ──read_packet──▶ FrameDecoder ──DecodedFrame──▶ FrameResampler ──S16LE──▶ PcmSink
//! ```
//!
//! Every handle releases its native resources in `Drop`, so a session that
//! simply drops them in the right order has torn down completely.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_playback::{DecodeSession, SessionConfig, SymphoniaBackend};
//! use bridge_traits::FnSink;
//!
//! # fn example() -> core_playback::Result<()> {
//! let mut session = DecodeSession::open(
//!     &SymphoniaBackend::new(),
//!     "/sdcard/Music/song.flac",
//!     SessionConfig::default(),
//! )?;
//! let summary = session.run(&mut FnSink::new(|chunk: &[u8]| {
//!     println!("{} bytes", chunk.len());
//!     Ok(())
//! }))?;
//! println!("delivered {} chunks", summary.chunks_delivered);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use bridge_traits::playback::{AudioCodec, PcmFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Stream Description
// ============================================================================

/// Kind of media carried by a container stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
    Subtitle,
    Other,
}

/// One stream as enumerated by the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Position of the stream in container order.
    pub index: usize,
    /// What the stream carries.
    pub kind: MediaKind,
    /// Codec of the compressed stream.
    pub codec: AudioCodec,
    /// Native sample rate in Hz, when the container reports it.
    pub sample_rate: Option<u32>,
    /// Native channel count, when the container reports it.
    pub channels: Option<u16>,
    /// Total number of frames, when known.
    pub frames: Option<u64>,
}

impl StreamInfo {
    pub fn is_audio(&self) -> bool {
        self.kind == MediaKind::Audio
    }

    /// Stream duration derived from frame count and sample rate.
    pub fn duration(&self) -> Option<Duration> {
        match (self.frames, self.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => {
                Some(Duration::from_secs_f64(frames as f64 / rate as f64))
            }
            _ => None,
        }
    }
}

/// Select the stream a session decodes: the first audio stream in container
/// order.
pub fn select_audio_stream(streams: &[StreamInfo]) -> Option<&StreamInfo> {
    streams.iter().find(|stream| stream.is_audio())
}

/// Native sample layout of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Parameters for opening a resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplerSpec {
    /// Layout produced by the decoder.
    pub input: SampleSpec,
    /// Layout the sink receives.
    pub output: PcmFormat,
}

// ============================================================================
// Decoded Frames
// ============================================================================

/// Planar `f32` samples produced by one decode call.
///
/// The session keeps a single instance and the decoder overwrites it on every
/// call, so plane allocations are reused across the whole stream.
#[derive(Debug, Clone, Default)]
pub struct DecodedFrame {
    planes: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from complete planes. All planes must have equal length.
    pub fn from_planes(planes: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        debug_assert!(planes.windows(2).all(|w| w[0].len() == w[1].len()));
        Self {
            planes,
            sample_rate,
        }
    }

    /// Clear the frame and size it for `channels` planes, keeping capacity.
    pub fn reset(&mut self, channels: usize, sample_rate: u32) {
        self.planes.resize_with(channels, Vec::new);
        for plane in &mut self.planes {
            plane.clear();
        }
        self.sample_rate = sample_rate;
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel.
    pub fn samples(&self) -> usize {
        self.planes.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.samples() == 0
    }

    pub fn planes(&self) -> &[Vec<f32>] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.planes
    }
}

// ============================================================================
// Backend Traits
// ============================================================================

/// Compressed packet read from a container.
pub trait EncodedPacket {
    /// Index of the stream this packet belongs to, in container order.
    fn stream_index(&self) -> usize;
}

/// Opened container (demuxer).
pub trait MediaContainer {
    type Packet: EncodedPacket;

    /// Enumerate every stream in container order.
    ///
    /// # Errors
    ///
    /// `StreamProbe` when stream parameters cannot be determined.
    fn probe_streams(&mut self) -> Result<Vec<StreamInfo>>;

    /// Read the next packet of any stream. `Ok(None)` marks end of stream.
    fn read_packet(&mut self) -> Result<Option<Self::Packet>>;
}

/// Opened decoder bound to one stream.
pub trait FrameDecoder<P: EncodedPacket> {
    /// Native layout of the frames this decoder produces.
    fn sample_spec(&self) -> SampleSpec;

    /// Decode one packet into `frame`.
    ///
    /// Returns `Ok(false)` when the decoder needs more input before it can
    /// emit a frame. That is not an error.
    fn decode(&mut self, packet: &P, frame: &mut DecodedFrame) -> Result<bool>;
}

/// Converter from decoded frames to interleaved S16LE at the output format.
pub trait FrameResampler {
    /// Convert one frame, replacing the contents of `out`.
    ///
    /// Returns the number of samples per channel written. Every input sample
    /// of `frame` is consumed by this call; nothing is queued for later frames.
    fn convert(&mut self, frame: &DecodedFrame, out: &mut Vec<u8>) -> Result<usize>;

    /// Append samples still held at end of stream to `out`.
    ///
    /// Returns the number of samples per channel appended.
    fn flush(&mut self, _out: &mut Vec<u8>) -> Result<usize> {
        Ok(0)
    }
}

/// Factory for the three handles a session owns.
pub trait MediaBackend {
    type Container: MediaContainer;
    type Decoder: FrameDecoder<<Self::Container as MediaContainer>::Packet>;
    type Resampler: FrameResampler;

    /// Open and parse the container at `path`.
    ///
    /// # Errors
    ///
    /// `ContainerOpen` when the file is missing, unreadable or unparseable.
    fn open_container(&self, path: &Path) -> Result<Self::Container>;

    /// Open a decoder for `stream`.
    ///
    /// # Errors
    ///
    /// `UnsupportedCodec` when no decoder exists for the codec, `DecoderOpen`
    /// when one exists but rejects the stream parameters.
    fn open_decoder(&self, container: &Self::Container, stream: &StreamInfo)
        -> Result<Self::Decoder>;

    /// Open a resampler converting `spec.input` into `spec.output`.
    ///
    /// # Errors
    ///
    /// `ResamplerInit` on invalid parameters.
    fn open_resampler(&self, spec: &ResamplerSpec) -> Result<Self::Resampler>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(index: usize, kind: MediaKind) -> StreamInfo {
        StreamInfo {
            index,
            kind,
            codec: AudioCodec::Unknown,
            sample_rate: Some(44_100),
            channels: Some(2),
            frames: None,
        }
    }

    #[test]
    fn selects_first_audio_stream_in_container_order() {
        let streams = vec![
            stream(0, MediaKind::Video),
            stream(1, MediaKind::Audio),
            stream(2, MediaKind::Audio),
        ];
        assert_eq!(select_audio_stream(&streams).map(|s| s.index), Some(1));
    }

    #[test]
    fn no_audio_stream_selects_nothing() {
        let streams = vec![stream(0, MediaKind::Video), stream(1, MediaKind::Subtitle)];
        assert!(select_audio_stream(&streams).is_none());
        assert!(select_audio_stream(&[]).is_none());
    }

    #[test]
    fn duration_needs_frames_and_rate() {
        let mut info = stream(0, MediaKind::Audio);
        assert_eq!(info.duration(), None);
        info.frames = Some(88_200);
        assert_eq!(info.duration(), Some(Duration::from_secs(2)));
        info.sample_rate = None;
        assert_eq!(info.duration(), None);
    }

    #[test]
    fn frame_reset_keeps_plane_count_in_sync() {
        let mut frame = DecodedFrame::from_planes(vec![vec![0.5; 4], vec![-0.5; 4]], 8_000);
        assert_eq!(frame.channels(), 2);
        assert_eq!(frame.samples(), 4);

        frame.reset(1, 16_000);
        assert_eq!(frame.channels(), 1);
        assert!(frame.is_empty());
        assert_eq!(frame.sample_rate(), 16_000);
    }
}
