//! Workspace facade crate.
//!
//! Re-exports the decode session and, with `desktop-sinks`, the file sinks,
//! so desktop hosts can depend on `pcm-bridge` alone. Android hosts load the
//! `bridge-android` cdylib directly.

pub use core_playback::*;

#[cfg(feature = "desktop-sinks")]
pub use bridge_desktop::{RawPcmFileSink, WavFileSink};
