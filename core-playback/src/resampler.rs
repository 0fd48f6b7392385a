//! # PCM Resampler
//!
//! Converts decoded planar `f32` frames into interleaved S16LE at the session's
//! output rate and channel count, using rubato for rate conversion.
//!
//! Channels are remixed before resampling so rubato always runs at the output
//! channel count:
//!
//! | Input → Output | Policy |
//! |----------------|--------|
//! | equal | copied |
//! | mono → N | duplicated to every channel |
//! | N → mono | averaged |
//! | more → fewer | first channels kept |
//! | fewer → more | channel `c` takes input `c % inputs` |

use crate::error::{PlaybackError, Result};
use crate::traits::{DecodedFrame, FrameResampler, ResamplerSpec};
use bridge_traits::playback::{PcmFormat, BYTES_PER_SAMPLE};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::{debug, trace};

/// Input frames the engine advances per pass.
///
/// Rubato's fixed-input resampler consumes a fixed number of frames per pass,
/// while decoders emit frames of arbitrary size. Advancing one frame at a time
/// lets every decoded frame be converted in full by its own `convert` call.
const PASS_FRAMES: usize = 1;

/// Extra silent passes allowed when draining the engine at end of stream.
const FLUSH_SLACK_PASSES: usize = 32;

/// Frame-by-frame resampler.
///
/// Each call to [`FrameResampler::convert`] returns the output for exactly the
/// frame it was given. The engine's interpolation delay is removed from the
/// start of the stream and released again by [`FrameResampler::flush`], so the
/// total output is `round(input_frames × ratio)`.
pub struct PcmResampler {
    output: PcmFormat,
    /// `None` when input and output rates match.
    engine: Option<FastFixedIn<f32>>,
    ratio: f64,
    /// Remixed input of the current frame, one plane per output channel.
    remixed: Vec<Vec<f32>>,
    pass_in: Vec<Vec<f32>>,
    pass_out: Vec<Vec<f32>>,
    /// Resampled output collected during one call.
    produced: Vec<Vec<f32>>,
    /// Leading output frames still to discard.
    warmup: usize,
    frames_in: u64,
    frames_out: u64,
}

impl PcmResampler {
    /// Create a resampler for `spec`.
    ///
    /// # Errors
    ///
    /// `ResamplerInit` when any rate or channel count is zero or rubato
    /// rejects the ratio.
    pub fn new(spec: &ResamplerSpec) -> Result<Self> {
        let input = spec.input;
        let output = spec.output;

        if input.sample_rate == 0 || output.sample_rate == 0 {
            return Err(PlaybackError::ResamplerInit(format!(
                "sample rates must be non-zero ({}Hz -> {}Hz)",
                input.sample_rate, output.sample_rate
            )));
        }

        if input.channels == 0 || output.channels == 0 {
            return Err(PlaybackError::ResamplerInit(format!(
                "channel counts must be non-zero ({} -> {})",
                input.channels, output.channels
            )));
        }

        let ratio = output.sample_rate as f64 / input.sample_rate as f64;
        let channels = output.channels as usize;

        let engine = if input.sample_rate == output.sample_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output.sample_rate);
            None
        } else {
            debug!(
                "Resampling from {}Hz to {}Hz ({} -> {} channels)",
                input.sample_rate, output.sample_rate, input.channels, output.channels
            );
            let engine = FastFixedIn::<f32>::new(
                ratio,
                1.0, // max_relative_ratio (no runtime changes)
                PolynomialDegree::Cubic,
                PASS_FRAMES,
                channels,
            )
            .map_err(|e| PlaybackError::ResamplerInit(format!("Failed to create resampler: {}", e)))?;
            Some(engine)
        };

        let (warmup, pass_out_len) = engine
            .as_ref()
            .map_or((0, 0), |engine| (engine.output_delay(), engine.output_frames_max()));

        Ok(Self {
            output,
            engine,
            ratio,
            remixed: vec![Vec::new(); channels],
            pass_in: vec![vec![0.0; PASS_FRAMES]; channels],
            pass_out: vec![vec![0.0; pass_out_len]; channels],
            produced: vec![Vec::new(); channels],
            warmup,
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Output format this resampler produces.
    pub fn output_format(&self) -> PcmFormat {
        self.output
    }

    /// Returns `true` when no rate conversion takes place.
    pub fn is_passthrough(&self) -> bool {
        self.engine.is_none()
    }

    /// Output frames the engine still owes for input already converted.
    pub fn owed_frames(&self) -> usize {
        if self.engine.is_none() {
            return 0;
        }
        let expected = (self.frames_in as f64 * self.ratio).round() as u64;
        expected.saturating_sub(self.frames_out) as usize
    }

    /// Advance the engine by one pass over `pass_in`.
    fn run_pass(&mut self) -> Result<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };

        let (_, written) = engine
            .process_into_buffer(&self.pass_in, &mut self.pass_out, None)
            .map_err(|e| PlaybackError::Decode(format!("Resampling failed: {}", e)))?;

        let skip = self.warmup.min(written);
        self.warmup -= skip;
        for (target, plane) in self.produced.iter_mut().zip(&self.pass_out) {
            target.extend_from_slice(&plane[skip..written]);
        }

        Ok(())
    }

    /// Append collected output to `out`, returning samples per channel.
    fn emit(&mut self, out: &mut Vec<u8>, limit: Option<usize>) -> usize {
        let available = self.produced.first().map_or(0, Vec::len);
        let frames = limit.map_or(available, |limit| limit.min(available));

        pack_s16le(&self.produced, frames, out);
        for plane in &mut self.produced {
            plane.clear();
        }

        self.frames_out += frames as u64;
        frames
    }
}

impl FrameResampler for PcmResampler {
    fn convert(&mut self, frame: &DecodedFrame, out: &mut Vec<u8>) -> Result<usize> {
        out.clear();
        if frame.is_empty() {
            return Ok(0);
        }

        if frame.channels() == 0 {
            return Err(PlaybackError::Decode("frame has no channels".to_string()));
        }

        for plane in &mut self.remixed {
            plane.clear();
        }
        remix_into(frame, &mut self.remixed);

        if self.engine.is_none() {
            std::mem::swap(&mut self.remixed, &mut self.produced);
            return Ok(self.emit(out, None));
        }

        for index in 0..frame.samples() {
            for (pass, plane) in self.pass_in.iter_mut().zip(&self.remixed) {
                pass[0] = plane[index];
            }
            self.run_pass()?;
        }
        self.frames_in += frame.samples() as u64;

        let frames = self.emit(out, None);
        trace!(
            "Converted {} input frames into {} output frames",
            frame.samples(),
            frames
        );

        Ok(frames)
    }

    fn flush(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let owed = self.owed_frames();
        if owed == 0 {
            return Ok(0);
        }

        // Silence pushes the delayed tail out of the interpolation window
        for pass in &mut self.pass_in {
            pass.fill(0.0);
        }
        let max_passes =
            ((owed + self.warmup) as f64 / self.ratio).ceil() as usize + FLUSH_SLACK_PASSES;
        let mut passes = 0;
        while self.produced.first().map_or(0, Vec::len) < owed && passes < max_passes {
            self.run_pass()?;
            passes += 1;
        }

        let frames = self.emit(out, Some(owed));
        debug!("Flushed {} delayed output frames in {} passes", frames, passes);
        Ok(frames)
    }
}

/// Append `frame` to `targets`, remixing to `targets.len()` channels.
fn remix_into(frame: &DecodedFrame, targets: &mut [Vec<f32>]) {
    let planes = frame.planes();
    let inputs = planes.len();
    let outputs = targets.len();

    if inputs == outputs {
        for (target, plane) in targets.iter_mut().zip(planes) {
            target.extend_from_slice(plane);
        }
    } else if inputs == 1 {
        for target in targets.iter_mut() {
            target.extend_from_slice(&planes[0]);
        }
    } else if outputs == 1 {
        let scale = 1.0 / inputs as f32;
        targets[0].extend(
            (0..frame.samples()).map(|i| planes.iter().map(|plane| plane[i]).sum::<f32>() * scale),
        );
    } else {
        for (channel, target) in targets.iter_mut().enumerate() {
            target.extend_from_slice(&planes[channel % inputs]);
        }
    }
}

/// Convert one normalized sample to signed 16-bit, clamping out-of-range input.
pub fn f32_to_s16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Append the first `frames` samples of every plane to `out` as interleaved S16LE.
fn pack_s16le(planes: &[Vec<f32>], frames: usize, out: &mut Vec<u8>) {
    out.reserve(frames * planes.len() * BYTES_PER_SAMPLE);

    for frame_idx in 0..frames {
        for plane in planes {
            out.extend_from_slice(&f32_to_s16(plane[frame_idx]).to_le_bytes());
        }
    }
}
