//! Scripted in-memory backend shared by the session and service tests.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{AudioCodec, PcmFormat, PcmSink};
use core_playback::error::{PlaybackError, Result};
use core_playback::traits::{
    DecodedFrame, EncodedPacket, FrameDecoder, FrameResampler, MediaBackend, MediaContainer,
    MediaKind, ResamplerSpec, SampleSpec, StreamInfo,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

pub const SOURCE_RATE: u32 = 44_100;

/// Byte pattern of converted frames.
pub const FRAME_BYTE: u8 = 0x5A;
/// Byte pattern of the flushed tail.
pub const TAIL_BYTE: u8 = 0xA5;

/// Lifecycle events recorded by the fake handles.
pub type Events = Arc<Mutex<Vec<&'static str>>>;

/// Where the backend should refuse to acquire a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Container,
    UnsupportedCodec,
    Decoder,
    Resampler,
}

/// One scripted container read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Packet for `stream` that decodes to `samples` samples per channel.
    Packet { stream: usize, samples: usize },
    /// Packet whose decode fails.
    Corrupt { stream: usize },
    /// Read failure.
    ReadError,
}

pub fn audio(stream: usize, samples: usize) -> Step {
    Step::Packet { stream, samples }
}

pub fn stream(index: usize, kind: MediaKind) -> StreamInfo {
    StreamInfo {
        index,
        kind,
        codec: if kind == MediaKind::Audio {
            AudioCodec::Flac
        } else {
            AudioCodec::Unknown
        },
        sample_rate: (kind == MediaKind::Audio).then_some(SOURCE_RATE),
        channels: (kind == MediaKind::Audio).then_some(2),
        frames: None,
    }
}

#[derive(Clone)]
pub struct FakeBackend {
    pub streams: Vec<StreamInfo>,
    pub steps: Vec<Step>,
    pub fail_at: Option<FailAt>,
    /// Samples per channel the resampler still holds at end of stream.
    pub flush_tail: usize,
    pub events: Events,
}

impl FakeBackend {
    /// One stereo audio stream with the given packets.
    pub fn with_steps(steps: Vec<Step>) -> Self {
        Self {
            streams: vec![stream(0, MediaKind::Audio)],
            steps,
            fail_at: None,
            flush_tail: 0,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_at(mut self, fail_at: FailAt) -> Self {
        self.fail_at = Some(fail_at);
        self
    }

    pub fn with_streams(mut self, streams: Vec<StreamInfo>) -> Self {
        self.streams = streams;
        self
    }

    pub fn with_flush_tail(mut self, samples: usize) -> Self {
        self.flush_tail = samples;
        self
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }

    /// Every acquired handle has been released exactly once.
    pub fn balanced(&self) -> bool {
        ["container", "decoder", "resampler"].iter().all(|handle| {
            let opened = self.count(&format!("open {}", handle));
            let released = self.count(&format!("release {}", handle));
            opened == released
        })
    }

    fn record(&self, event: &'static str) {
        self.events.lock().push(event);
    }
}

pub struct FakePacket {
    stream_index: usize,
    samples: usize,
    corrupt: bool,
}

impl EncodedPacket for FakePacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }
}

pub struct FakeContainer {
    streams: Vec<StreamInfo>,
    steps: VecDeque<Step>,
    events: Events,
}

impl MediaContainer for FakeContainer {
    type Packet = FakePacket;

    fn probe_streams(&mut self) -> Result<Vec<StreamInfo>> {
        Ok(self.streams.clone())
    }

    fn read_packet(&mut self) -> Result<Option<FakePacket>> {
        match self.steps.pop_front() {
            None => Ok(None),
            Some(Step::Packet { stream, samples }) => Ok(Some(FakePacket {
                stream_index: stream,
                samples,
                corrupt: false,
            })),
            Some(Step::Corrupt { stream }) => Ok(Some(FakePacket {
                stream_index: stream,
                samples: 0,
                corrupt: true,
            })),
            Some(Step::ReadError) => Err(PlaybackError::Decode("read failed".to_string())),
        }
    }
}

impl Drop for FakeContainer {
    fn drop(&mut self) {
        self.events.lock().push("release container");
    }
}

pub struct FakeDecoder {
    spec: SampleSpec,
    events: Events,
}

impl FrameDecoder<FakePacket> for FakeDecoder {
    fn sample_spec(&self) -> SampleSpec {
        self.spec
    }

    fn decode(&mut self, packet: &FakePacket, frame: &mut DecodedFrame) -> Result<bool> {
        if packet.corrupt {
            return Err(PlaybackError::Decode("corrupt packet".to_string()));
        }
        if packet.samples == 0 {
            return Ok(false);
        }

        frame.reset(self.spec.channels as usize, self.spec.sample_rate);
        for plane in frame.planes_mut() {
            plane.resize(packet.samples, 0.25);
        }
        Ok(true)
    }
}

impl Drop for FakeDecoder {
    fn drop(&mut self) {
        self.events.lock().push("release decoder");
    }
}

/// Writes a fixed byte pattern, one output frame per input sample.
pub struct FakeResampler {
    output: PcmFormat,
    flush_tail: usize,
    events: Events,
}

impl FakeResampler {
    fn fill(&self, samples: usize, out: &mut Vec<u8>) -> usize {
        out.clear();
        out.resize(self.output.chunk_len(samples), FRAME_BYTE);
        samples
    }
}

impl FrameResampler for FakeResampler {
    fn convert(&mut self, frame: &DecodedFrame, out: &mut Vec<u8>) -> Result<usize> {
        Ok(self.fill(frame.samples(), out))
    }

    /// Appends the configured tail in a second pattern so callers can see
    /// where it landed.
    fn flush(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let tail = std::mem::take(&mut self.flush_tail);
        out.resize(out.len() + self.output.chunk_len(tail), TAIL_BYTE);
        Ok(tail)
    }
}

impl Drop for FakeResampler {
    fn drop(&mut self) {
        self.events.lock().push("release resampler");
    }
}

impl MediaBackend for FakeBackend {
    type Container = FakeContainer;
    type Decoder = FakeDecoder;
    type Resampler = FakeResampler;

    fn open_container(&self, path: &Path) -> Result<FakeContainer> {
        if self.fail_at == Some(FailAt::Container) {
            return Err(PlaybackError::ContainerOpen {
                path: path.display().to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        self.record("open container");
        Ok(FakeContainer {
            streams: self.streams.clone(),
            steps: self.steps.iter().copied().collect(),
            events: Arc::clone(&self.events),
        })
    }

    fn open_decoder(&self, _container: &FakeContainer, stream: &StreamInfo) -> Result<FakeDecoder> {
        match self.fail_at {
            Some(FailAt::UnsupportedCodec) => {
                return Err(PlaybackError::UnsupportedCodec("ape".to_string()))
            }
            Some(FailAt::Decoder) => {
                return Err(PlaybackError::DecoderOpen("bad extradata".to_string()))
            }
            _ => {}
        }
        self.record("open decoder");
        Ok(FakeDecoder {
            spec: SampleSpec {
                sample_rate: stream.sample_rate.unwrap_or(SOURCE_RATE),
                channels: stream.channels.unwrap_or(2),
            },
            events: Arc::clone(&self.events),
        })
    }

    fn open_resampler(&self, spec: &ResamplerSpec) -> Result<FakeResampler> {
        if self.fail_at == Some(FailAt::Resampler) {
            return Err(PlaybackError::ResamplerInit("rejected".to_string()));
        }
        self.record("open resampler");
        Ok(FakeResampler {
            output: spec.output,
            flush_tail: self.flush_tail,
            events: Arc::clone(&self.events),
        })
    }
}

/// Sink that keeps every call.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub format: Option<PcmFormat>,
    pub chunks: Vec<Vec<u8>>,
    pub finished: bool,
}

impl RecordingSink {
    pub fn lengths(&self) -> Vec<usize> {
        self.chunks.iter().map(Vec::len).collect()
    }
}

impl PcmSink for RecordingSink {
    fn start(&mut self, format: &PcmFormat) -> BridgeResult<()> {
        self.format = Some(*format);
        Ok(())
    }

    fn deliver(&mut self, chunk: &[u8]) -> BridgeResult<()> {
        self.chunks.push(chunk.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> BridgeResult<()> {
        self.finished = true;
        Ok(())
    }
}
