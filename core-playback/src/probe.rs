//! # Stream Probe
//!
//! Answers "can this file be decoded, and what is in it" without starting a
//! session. The container is opened, its streams listed, and closed again
//! before the report is returned.

use crate::error::{PlaybackError, Result};
use crate::traits::{MediaBackend, MediaContainer, StreamInfo};
use core_runtime::logging::strip_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Result of probing one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub path: PathBuf,
    /// Every stream in container order.
    pub streams: Vec<StreamInfo>,
    /// Position in `streams` of the stream a session would decode: the first
    /// audio stream.
    pub audio_stream: usize,
}

impl ProbeReport {
    /// The stream a session would decode.
    pub fn selected(&self) -> &StreamInfo {
        &self.streams[self.audio_stream]
    }

    pub fn duration(&self) -> Option<Duration> {
        self.selected().duration()
    }
}

/// Probe `path` with `backend`.
///
/// # Errors
///
/// `ContainerOpen`, `StreamProbe` or `NoAudioStream`, exactly as
/// [`DecodeSession::open`](crate::DecodeSession::open) would report them.
#[instrument(skip_all, fields(file = %strip_path(&path.to_string_lossy())))]
pub fn probe_file<B: MediaBackend>(backend: &B, path: &Path) -> Result<ProbeReport> {
    let mut container = backend.open_container(path)?;
    let streams = container.probe_streams()?;
    drop(container);

    let position = streams
        .iter()
        .position(StreamInfo::is_audio)
        .ok_or_else(|| PlaybackError::NoAudioStream(path.display().to_string()))?;

    if streams[position].sample_rate.unwrap_or(0) == 0 {
        return Err(PlaybackError::StreamProbe(format!(
            "stream {} has no sample rate",
            streams[position].index
        )));
    }

    debug!(
        "Probed {} stream(s), audio stream {} ({:?})",
        streams.len(),
        streams[position].index,
        streams[position].codec
    );

    Ok(ProbeReport {
        path: path.to_path_buf(),
        streams,
        audio_stream: position,
    })
}
