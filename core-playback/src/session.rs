//! # Decode Session
//!
//! One file, one audio stream, one sink. A session acquires its container,
//! decoder, resampler and scratch buffer in [`DecodeSession::open`], pushes
//! PCM through [`DecodeSession::run`], and releases everything in reverse
//! order when the loop ends for any reason.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──open──▶ Opened ──run──▶ Decoding ──▶ Completed ─┐
//!                                        │                   ├──close──▶ Closed
//!                                        └─────▶ Failed ─────┘
//! ```
//!
//! `run` closes the session itself. `close` is idempotent and also runs on
//! drop, so a session that is opened but never run still releases its
//! handles.

use crate::config::{SessionConfig, SessionState};
use crate::error::{PlaybackError, Result};
use crate::traits::{
    select_audio_stream, DecodedFrame, EncodedPacket, FrameDecoder, FrameResampler,
    MediaBackend, MediaContainer, ResamplerSpec, StreamInfo,
};
use bridge_traits::playback::{PcmFormat, PcmSink};
use core_runtime::logging::strip_path;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

/// How a decode loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunOutcome {
    /// End of stream reached and every buffered sample delivered.
    #[default]
    Completed,
    /// The stop token was cancelled between iterations.
    Stopped,
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Packets read from the container, any stream.
    pub packets_read: u64,
    /// Packets dropped because they belong to another stream.
    pub packets_skipped: u64,
    /// Decode calls that produced a frame.
    pub frames_decoded: u64,
    /// Chunks handed to the sink.
    pub chunks_delivered: u64,
    /// Total bytes handed to the sink.
    pub bytes_delivered: u64,
    /// Samples per channel handed to the sink.
    pub samples_delivered: u64,
    /// Wall time spent in the loop.
    pub elapsed: Duration,
}

/// Streaming decode session for a single file.
pub struct DecodeSession<B: MediaBackend> {
    path: PathBuf,
    config: SessionConfig,
    stream: StreamInfo,
    format: PcmFormat,
    state: SessionState,
    summary: RunSummary,

    // Handles, released in this order by `close`.
    scratch: Option<Vec<u8>>,
    resampler: Option<B::Resampler>,
    decoder: Option<B::Decoder>,
    container: Option<B::Container>,

    _backend: PhantomData<fn() -> B>,
}

impl<B: MediaBackend> DecodeSession<B> {
    /// Open `path` and acquire every handle needed to decode it.
    ///
    /// On failure only the handles acquired so far are released, in reverse
    /// order, and no PCM has been produced.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `config` fails validation
    /// - `ContainerOpen` if the file cannot be opened or parsed
    /// - `StreamProbe` if stream parameters are missing
    /// - `NoAudioStream` if the container holds no audio
    /// - `UnsupportedCodec` / `DecoderOpen` if the decoder cannot be created
    /// - `ResamplerInit` if the conversion parameters are rejected
    #[instrument(skip_all, fields(file = %strip_path(&path.as_ref().to_string_lossy())))]
    pub fn open(backend: &B, path: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        // Step 1: Open container
        let mut container = backend.open_container(path)?;

        // Step 2: Probe streams
        let streams = container.probe_streams()?;
        debug!("Container lists {} stream(s)", streams.len());

        // Step 3: Select the first audio stream
        let stream = select_audio_stream(&streams).cloned().ok_or_else(|| {
            warn!("No audio stream among {} stream(s)", streams.len());
            PlaybackError::NoAudioStream(path.display().to_string())
        })?;
        let source_rate = stream.sample_rate.filter(|rate| *rate > 0).ok_or_else(|| {
            PlaybackError::StreamProbe(format!("stream {} has no sample rate", stream.index))
        })?;
        info!(
            "Selected stream {} ({:?}, {}Hz)",
            stream.index, stream.codec, source_rate
        );

        // Step 4: Open decoder
        let decoder = backend.open_decoder(&container, &stream)?;

        // Step 5: Open resampler from the decoder's native layout
        let mut input = decoder.sample_spec();
        if input.sample_rate == 0 {
            input.sample_rate = source_rate;
        }
        let format = config.output.resolve(input.sample_rate);
        let resampler = backend.open_resampler(&ResamplerSpec {
            input,
            output: format,
        })?;

        // Step 6: Allocate scratch buffer
        let scratch = Vec::with_capacity(config.scratch_capacity);

        debug!(
            "Session opened: {}Hz/{}ch -> {}Hz/{}ch S16LE",
            input.sample_rate, input.channels, format.sample_rate, format.channels
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            stream,
            format,
            state: SessionState::Opened,
            summary: RunSummary::default(),
            scratch: Some(scratch),
            resampler: Some(resampler),
            decoder: Some(decoder),
            container: Some(container),
            _backend: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The audio stream being decoded.
    pub fn stream(&self) -> &StreamInfo {
        &self.stream
    }

    /// Format of every chunk the sink receives.
    pub fn output_format(&self) -> PcmFormat {
        self.format
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Counters of the last run. Populated on failure too, so callers can
    /// tell how much PCM was delivered before the error.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Decode to end of stream, delivering every chunk to `sink`.
    pub fn run<S: PcmSink + ?Sized>(&mut self, sink: &mut S) -> Result<RunSummary> {
        self.run_until(sink, &CancellationToken::new())
    }

    /// Decode until end of stream or until `stop` is cancelled.
    ///
    /// The token is checked once per loop iteration, so a stop takes effect
    /// after at most one more chunk. Every decoded frame yields exactly one
    /// chunk, delivered one frame late; the chunk still held when the loop
    /// stops is delivered before returning. Stopping is not an error: the
    /// summary reports [`RunOutcome::Stopped`]. The session is closed on return.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the session is not freshly opened
    /// - `Decode` if reading, decoding or resampling fails mid-stream
    /// - `SinkDelivery` if the sink rejects a chunk
    #[instrument(skip_all, fields(file = %strip_path(&self.path.to_string_lossy()), stream = self.stream.index))]
    pub fn run_until<S: PcmSink + ?Sized>(
        &mut self,
        sink: &mut S,
        stop: &CancellationToken,
    ) -> Result<RunSummary> {
        if self.state != SessionState::Opened {
            return Err(PlaybackError::InvalidState(format!(
                "cannot run a session in state {:?}",
                self.state
            )));
        }

        self.state = SessionState::Decoding;
        info!("Starting decode");

        let started = Instant::now();
        let mut summary = RunSummary::default();

        let result = sink
            .start(&self.format)
            .map_err(|e| PlaybackError::SinkDelivery(format!("sink refused to start: {}", e)))
            .and_then(|()| self.decode_loop(sink, stop, &mut summary));

        let result = match (result, sink.finish()) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(PlaybackError::SinkDelivery(format!(
                "sink failed to finish: {}",
                e
            ))),
            (Err(e), Err(finish_err)) => {
                warn!("Sink finish failed after error: {}", finish_err);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        };

        summary.elapsed = started.elapsed();
        self.summary = summary.clone();

        match &result {
            Ok(()) => {
                self.state = SessionState::Completed;
                info!(
                    "Decode {:?}: {} chunks, {} bytes in {:.2}s",
                    summary.outcome,
                    summary.chunks_delivered,
                    summary.bytes_delivered,
                    summary.elapsed.as_secs_f64()
                );
            }
            Err(e) => {
                self.state = SessionState::Failed;
                error!(
                    kind = e.kind(),
                    "Decode failed after {} chunks: {}", summary.chunks_delivered, e
                );
            }
        }

        self.close();
        result.map(|()| summary)
    }

    fn decode_loop<S: PcmSink + ?Sized>(
        &mut self,
        sink: &mut S,
        stop: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let (Some(container), Some(decoder), Some(resampler), Some(scratch)) = (
            self.container.as_mut(),
            self.decoder.as_mut(),
            self.resampler.as_mut(),
            self.scratch.as_mut(),
        ) else {
            return Err(PlaybackError::InvalidState(
                "session handles already released".to_string(),
            ));
        };

        let stream_index = self.stream.index;
        let delivery = Delivery {
            format: self.format,
            pacing: self.config.pacing(),
        };
        let mut frame = DecodedFrame::new();
        // Samples of the latest frame's chunk, still in `scratch`. Each chunk is
        // held back until the next frame arrives so the end-of-stream tail can
        // join the last frame's chunk.
        let mut held = 0;

        let ended: Result<RunOutcome> = loop {
            if stop.is_cancelled() {
                info!("Decode stopped by caller");
                break Ok(RunOutcome::Stopped);
            }

            let packet = match container.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => break Ok(RunOutcome::Completed),
                Err(e) => break Err(e),
            };
            summary.packets_read += 1;

            // Skip packets not belonging to the selected stream
            if packet.stream_index() != stream_index {
                trace!("Skipping packet for stream {}", packet.stream_index());
                summary.packets_skipped += 1;
                continue;
            }

            let decoded = decoder.decode(&packet, &mut frame);
            drop(packet);
            match decoded {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => break Err(e),
            }
            summary.frames_decoded += 1;

            delivery.deliver(sink, scratch, held, summary)?;
            held = resampler.convert(&frame, scratch)?;
        };

        match ended {
            Ok(RunOutcome::Completed) => {
                // End of stream: the resampler's delayed tail joins the last chunk
                held += resampler.flush(scratch)?;
                delivery.deliver(sink, scratch, held, summary)?;
                summary.outcome = RunOutcome::Completed;
                Ok(())
            }
            Ok(RunOutcome::Stopped) => {
                delivery.deliver(sink, scratch, held, summary)?;
                summary.outcome = RunOutcome::Stopped;
                Ok(())
            }
            Err(e) => {
                // Frames decoded before the failure still reach the sink
                if let Err(sink_err) = delivery.deliver(sink, scratch, held, summary) {
                    warn!("Dropping held chunk after decode failure: {}", sink_err);
                }
                Err(e)
            }
        }
    }

    /// Release every handle in reverse acquisition order.
    ///
    /// Safe to call any number of times; only the first call releases.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        drop(self.scratch.take());
        drop(self.resampler.take());
        drop(self.decoder.take());
        drop(self.container.take());

        debug!("Session closed from state {:?}", self.state);
        self.state = SessionState::Closed;
    }
}

impl<B: MediaBackend> Drop for DecodeSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Per-run delivery settings.
struct Delivery {
    format: PcmFormat,
    pacing: Option<Duration>,
}

impl Delivery {
    /// Hand the first `samples` samples of `scratch` to the sink.
    ///
    /// The chunk length comes from the produced sample count, never from the
    /// buffer's capacity. Empty chunks are not delivered.
    fn deliver<S: PcmSink + ?Sized>(
        &self,
        sink: &mut S,
        scratch: &[u8],
        samples: usize,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if samples == 0 {
            return Ok(());
        }

        let len = self.format.chunk_len(samples);
        let chunk = scratch.get(..len).ok_or_else(|| {
            PlaybackError::Internal(format!(
                "resampler reported {} samples but wrote {} bytes",
                samples,
                scratch.len()
            ))
        })?;

        sink.deliver(chunk).map_err(|e| {
            warn!("Sink rejected chunk {}: {}", summary.chunks_delivered, e);
            PlaybackError::SinkDelivery(e.to_string())
        })?;

        summary.chunks_delivered += 1;
        summary.bytes_delivered += len as u64;
        summary.samples_delivered += samples as u64;

        if let Some(delay) = self.pacing {
            std::thread::sleep(delay);
        }

        Ok(())
    }
}

/// Open `path`, decode it completely into `sink`, and close.
pub fn decode_file<B, S>(
    backend: &B,
    path: impl AsRef<Path>,
    config: SessionConfig,
    sink: &mut S,
) -> Result<RunSummary>
where
    B: MediaBackend,
    S: PcmSink + ?Sized,
{
    DecodeSession::open(backend, path, config)?.run(sink)
}
