//! # Session Configuration
//!
//! Configuration types for decode sessions: the PCM format handed to sinks,
//! optional pacing between deliveries, and the sizes of the buffers a session
//! allocates up front.

use bridge_traits::playback::PcmFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest channel count a session will produce.
pub const MAX_OUTPUT_CHANNELS: u16 = 8;

/// Target PCM layout.
///
/// Samples are always signed 16-bit little-endian, interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Output sample rate in hertz. `None` keeps the source rate and skips
    /// resampling entirely.
    ///
    /// Default: 44100.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: Option<u32>,

    /// Number of interleaved output channels.
    ///
    /// Default: 2 (stereo).
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}

impl OutputSpec {
    /// Resolve the concrete output format for a source running at `source_rate`.
    pub fn resolve(&self, source_rate: u32) -> PcmFormat {
        PcmFormat::new(self.sample_rate.unwrap_or(source_rate), self.channels)
    }
}

/// Decode session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Output PCM layout.
    #[serde(default)]
    pub output: OutputSpec,

    /// Delay between chunk deliveries in milliseconds.
    ///
    /// Sinks that apply their own back-pressure do not need this. Hosts that
    /// push every chunk straight into an unbounded queue can use it to keep
    /// the producer near real time.
    ///
    /// Default: none.
    #[serde(default)]
    pub pacing_ms: Option<u64>,

    /// Initial capacity of the output scratch buffer in bytes.
    ///
    /// The buffer grows when a frame converts to more bytes than this.
    ///
    /// Default: 192000 (one second of 48 kHz stereo S16).
    #[serde(default = "default_scratch_capacity")]
    pub scratch_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output: OutputSpec::default(),
            pacing_ms: None,
            scratch_capacity: default_scratch_capacity(),
        }
    }
}

impl SessionConfig {
    /// Configuration that sleeps 16 ms after each delivered chunk, for hosts
    /// that write every chunk straight to an audio track without buffering.
    pub fn realtime() -> Self {
        Self {
            pacing_ms: Some(16),
            ..Default::default()
        }
    }

    /// Configuration that keeps the source sample rate.
    pub fn passthrough_rate() -> Self {
        Self {
            output: OutputSpec {
                sample_rate: None,
                ..OutputSpec::default()
            },
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("invalid session config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Pacing delay, if any.
    pub fn pacing(&self) -> Option<Duration> {
        self.pacing_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.output.channels == 0 {
            return Err("output.channels must be > 0".to_string());
        }

        if self.output.channels > MAX_OUTPUT_CHANNELS {
            return Err(format!(
                "output.channels must be <= {}",
                MAX_OUTPUT_CHANNELS
            ));
        }

        if self.output.sample_rate == Some(0) {
            return Err("output.sample_rate must be > 0".to_string());
        }

        if self.scratch_capacity == 0 {
            return Err("scratch_capacity must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_sample_rate() -> Option<u32> {
    Some(44_100)
}

fn default_channels() -> u16 {
    2
}

fn default_scratch_capacity() -> usize {
    48_000 * 4 // 1s of 48 kHz stereo S16
}

// ============================================================================
// Session State
// ============================================================================

/// Lifecycle of a decode session.
///
/// `Created → Opened → Decoding → {Completed | Failed} → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handles are being acquired.
    Created,
    /// Every handle is held, nothing decoded yet.
    Opened,
    /// The decode loop is running.
    Decoding,
    /// The loop reached end of stream or was stopped.
    Completed,
    /// The loop aborted with an error.
    Failed,
    /// All handles released.
    Closed,
}

impl SessionState {
    /// Returns `true` if the session still holds its handles.
    pub fn holds_resources(&self) -> bool {
        matches!(self, Self::Opened | Self::Decoding | Self::Completed | Self::Failed)
    }

    /// Returns `true` if the session can no longer decode.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.sample_rate, Some(44_100));
        assert_eq!(config.output.channels, 2);
        assert_eq!(config.scratch_capacity, 192_000);
        assert!(config.pacing().is_none());
    }

    #[test]
    fn test_realtime_config() {
        let config = SessionConfig::realtime();
        assert!(config.validate().is_ok());
        assert_eq!(config.pacing(), Some(Duration::from_millis(16)));
    }

    #[test]
    fn test_passthrough_rate_resolves_to_source() {
        let config = SessionConfig::passthrough_rate();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.resolve(22_050), PcmFormat::new(22_050, 2));
        assert_eq!(
            SessionConfig::default().output.resolve(22_050),
            PcmFormat::new(44_100, 2)
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = SessionConfig::default();

        // Invalid: zero channels
        config.output.channels = 0;
        assert!(config.validate().is_err());
        config.output.channels = 9;
        assert!(config.validate().is_err());
        config.output.channels = 2;

        // Invalid: zero rate
        config.output.sample_rate = Some(0);
        assert!(config.validate().is_err());
        config.output.sample_rate = Some(48_000);

        // Invalid: zero scratch buffer
        config.scratch_capacity = 0;
        assert!(config.validate().is_err());
        config.scratch_capacity = 4096;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_pacing_means_none() {
        let config = SessionConfig {
            pacing_ms: Some(0),
            ..Default::default()
        };
        assert!(config.pacing().is_none());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SessionConfig::from_json(r#"{"output": {"channels": 1}, "pacing_ms": 5}"#)
            .unwrap();
        assert_eq!(config.output.channels, 1);
        assert_eq!(config.output.sample_rate, Some(44_100));
        assert_eq!(config.pacing(), Some(Duration::from_millis(5)));
        assert_eq!(config.scratch_capacity, 192_000);

        let config = SessionConfig::from_json(r#"{"output": {"sample_rate": null}}"#).unwrap();
        assert_eq!(config.output.sample_rate, None);

        assert!(SessionConfig::from_json(r#"{"output": {"channels": 0}}"#).is_err());
        assert!(SessionConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_session_state() {
        assert!(SessionState::Opened.holds_resources());
        assert!(SessionState::Failed.holds_resources());
        assert!(!SessionState::Closed.holds_resources());
        assert!(!SessionState::Created.holds_resources());

        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Closed.is_terminal());
        assert!(!SessionState::Decoding.is_terminal());
    }
}
