//! # Playback Decode Module
//!
//! Turns a media file into a stream of interleaved S16LE PCM chunks.
//!
//! ## Overview
//!
//! This module handles:
//! - Opening a container and selecting its first audio stream
//! - Decoding packets with a pluggable [`MediaBackend`](traits::MediaBackend)
//!   (symphonia by default, feature-gated)
//! - Converting to the requested output layout with [`PcmResampler`]
//! - Delivering exact-length chunks to a [`PcmSink`](bridge_traits::PcmSink)
//! - Running sessions on tokio's blocking pool via [`DecodeService`]
//!
//! ## Resource lifecycle
//!
//! A [`DecodeSession`] owns its container, decoder, resampler and scratch
//! buffer. They are acquired in that order and released in reverse on every
//! path, including failures part-way through `open`.

pub mod config;
pub mod error;
pub mod probe;
pub mod service;
pub mod session;
pub mod traits;

#[cfg(feature = "symphonia-backend")]
pub mod decoder;

#[cfg(feature = "symphonia-backend")]
pub mod resampler;

pub use config::{OutputSpec, SessionConfig, SessionState};
pub use error::{PlaybackError, Result};
pub use probe::{probe_file, ProbeReport};
pub use service::{ChannelSink, DecodeHandle, DecodeService, PcmEvent};
pub use session::{decode_file, DecodeSession, RunOutcome, RunSummary};
pub use traits::{
    DecodedFrame, MediaBackend, MediaKind, ResamplerSpec, SampleSpec, StreamInfo,
};

#[cfg(feature = "symphonia-backend")]
pub use decoder::SymphoniaBackend;

#[cfg(feature = "symphonia-backend")]
pub use resampler::PcmResampler;
