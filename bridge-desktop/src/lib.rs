//! # Desktop Bridge Implementations
//!
//! [`PcmSink`](bridge_traits::PcmSink) implementations for desktop hosts
//! (macOS, Windows, Linux) and for tests that need decoded audio on disk.
//!
//! ## Overview
//!
//! - `WavFileSink` writes a 16-bit WAV file using `hound`
//! - `RawPcmFileSink` writes headerless interleaved S16LE
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::WavFileSink;
//! use core_playback::{decode_file, SessionConfig, SymphoniaBackend};
//!
//! let mut sink = WavFileSink::new("/tmp/decoded.wav");
//! decode_file(&SymphoniaBackend::new(), "song.flac", SessionConfig::default(), &mut sink)?;
//! ```

mod raw;
mod wav;

pub use raw::RawPcmFileSink;
pub use wav::WavFileSink;
