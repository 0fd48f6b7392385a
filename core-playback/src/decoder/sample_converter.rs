//! # Sample Format Converter
//!
//! Copies decoded symphonia buffers into the session's planar `f32` frame.

use crate::traits::DecodedFrame;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;
use tracing::warn;

/// Sample converter that normalizes audio to planar f32.
///
/// Symphonia outputs audio in various sample formats (u8 through f64). The
/// resampler works on planar `f32` in the range [-1.0, 1.0], so every decoded
/// buffer passes through here once.
pub struct SampleConverter;

impl SampleConverter {
    /// Copy a symphonia buffer into `frame`, replacing its contents.
    ///
    /// The frame is resized to the buffer's channel count and takes over its
    /// sample rate. Plane allocations are reused.
    pub fn copy_to_frame(buffer: &AudioBufferRef<'_>, frame: &mut DecodedFrame) {
        match buffer {
            AudioBufferRef::F32(buf) => Self::copy_planes(&**buf, frame, |sample: f32| sample),
            AudioBufferRef::F64(buf) => {
                Self::copy_planes(&**buf, frame, |sample: f64| sample.into_sample())
            }
            AudioBufferRef::S32(buf) => {
                Self::copy_planes(&**buf, frame, |sample: i32| sample.into_sample())
            }
            AudioBufferRef::S24(buf) => {
                Self::copy_planes(&**buf, frame, |sample| IntoSample::into_sample(sample))
            }
            AudioBufferRef::S16(buf) => {
                Self::copy_planes(&**buf, frame, |sample: i16| sample.into_sample())
            }
            AudioBufferRef::S8(buf) => {
                Self::copy_planes(&**buf, frame, |sample: i8| sample.into_sample())
            }
            AudioBufferRef::U32(buf) => {
                Self::copy_planes(&**buf, frame, |sample: u32| sample.into_sample())
            }
            AudioBufferRef::U24(buf) => {
                Self::copy_planes(&**buf, frame, |sample| IntoSample::into_sample(sample))
            }
            AudioBufferRef::U16(buf) => {
                Self::copy_planes(&**buf, frame, |sample: u16| sample.into_sample())
            }
            AudioBufferRef::U8(buf) => {
                Self::copy_planes(&**buf, frame, |sample: u8| sample.into_sample())
            }
        }
    }

    fn copy_planes<T>(buf: &AudioBuffer<T>, frame: &mut DecodedFrame, convert: fn(T) -> f32)
    where
        T: Sample + Copy,
    {
        let spec = buf.spec();
        frame.reset(spec.channels.count(), spec.rate);

        for (chan_idx, plane) in frame.planes_mut().iter_mut().enumerate() {
            plane.extend(buf.chan(chan_idx).iter().map(|&sample| convert(sample)));
        }
    }

    /// Count samples outside [-1.0, 1.0], warning when any are found.
    ///
    /// Float sources may legitimately exceed full scale; the S16 packer
    /// clamps them, so this only reports.
    pub fn count_clipped(frame: &DecodedFrame) -> usize {
        let total = frame.samples() * frame.channels();
        let clipped = frame
            .planes()
            .iter()
            .flatten()
            .filter(|&&s| !(-1.0..=1.0).contains(&s))
            .count();

        if clipped > 0 {
            warn!(
                "Detected {} clipped samples ({:.2}% of frame)",
                clipped,
                (clipped as f64 / total.max(1) as f64) * 100.0
            );
        }

        clipped
    }
}
