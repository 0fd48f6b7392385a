//! # Playback Error Types
//!
//! Error types for decode sessions. Every variant maps to one stage of the
//! open → decode → deliver pipeline so hosts can tell a missing file from a
//! codec gap or a sink that went away.

use thiserror::Error;

/// Errors that can occur while opening or running a decode session.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Open Errors
    // ========================================================================
    /// File is missing, unreadable, or not a container the backend can parse.
    #[error("Failed to open container {path}: {reason}")]
    ContainerOpen { path: String, reason: String },

    /// Stream information could not be determined after opening.
    #[error("Failed to probe stream info: {0}")]
    StreamProbe(String),

    /// The container holds no audio stream.
    #[error("No audio stream found in {0}")]
    NoAudioStream(String),

    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// No decoder is registered for the stream's codec.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// A decoder exists but could not be opened with the stream parameters.
    #[error("Failed to open decoder: {0}")]
    DecoderOpen(String),

    /// The resampler rejected the input or output parameters.
    #[error("Failed to initialize resampler: {0}")]
    ResamplerInit(String),

    // ========================================================================
    // Loop Errors
    // ========================================================================
    /// Reading or decoding a packet failed mid-stream.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// The PCM sink rejected a chunk.
    #[error("PCM sink delivery failed: {0}")]
    SinkDelivery(String),

    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Session configuration failed validation.
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    /// Operation not allowed in the session's current state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Another session is already decoding this path.
    #[error("A session is already active for {0}")]
    PathBusy(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Stable, machine-readable code for this error.
    ///
    /// Hosts use it as the prefix of the exception message they raise.
    pub fn kind(&self) -> &'static str {
        match self {
            PlaybackError::ContainerOpen { .. } => "container_open",
            PlaybackError::StreamProbe(_) => "stream_probe",
            PlaybackError::NoAudioStream(_) => "no_audio_stream",
            PlaybackError::UnsupportedCodec(_) => "unsupported_codec",
            PlaybackError::DecoderOpen(_) => "decoder_open",
            PlaybackError::ResamplerInit(_) => "resampler_init",
            PlaybackError::Decode(_) => "decode",
            PlaybackError::SinkDelivery(_) => "sink_delivery",
            PlaybackError::InvalidConfig(_) => "invalid_config",
            PlaybackError::InvalidState(_) => "invalid_state",
            PlaybackError::PathBusy(_) => "path_busy",
            PlaybackError::Internal(_) => "internal",
        }
    }

    /// Returns `true` if the session failed before any PCM was produced.
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::ContainerOpen { .. }
                | PlaybackError::StreamProbe(_)
                | PlaybackError::NoAudioStream(_)
                | PlaybackError::UnsupportedCodec(_)
                | PlaybackError::DecoderOpen(_)
                | PlaybackError::ResamplerInit(_)
        )
    }

    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::StreamProbe(_)
                | PlaybackError::NoAudioStream(_)
                | PlaybackError::UnsupportedCodec(_)
        )
    }

    /// Returns `true` if the caller may retry later without changing anything.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::PathBusy(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
