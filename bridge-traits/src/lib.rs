//! # Host Bridge Traits
//!
//! Contract between the decode core and the host that consumes its output.
//!
//! ## Overview
//!
//! The core decodes audio files into interleaved 16-bit PCM and hands every
//! chunk to a host-provided sink. Anything that differs per platform (how PCM
//! reaches the audio stack, where logs go) sits behind a trait in this crate so
//! the core never depends on JNI, files, or a particular logging backend.
//!
//! ## Traits
//!
//! - [`PcmSink`](playback::PcmSink) - Synchronous receiver of PCM chunks
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Sinks |
//! |----------|---------------------|-------|
//! | Desktop  | `bridge-desktop`    | WAV file, raw PCM file |
//! | Android  | `bridge-android`    | Java `pcm(byte[])` callback |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and keep the message actionable (file path, failing call, exception class).
//! A failure returned from [`PcmSink::deliver`](playback::PcmSink::deliver)
//! stops the decode loop.
//!
//! ## Examples
//!
//! ### Implementing PcmSink
//!
//! ```ignore
//! use bridge_traits::error::Result;
//! use bridge_traits::playback::{PcmFormat, PcmSink};
//!
//! struct ByteCounter {
//!     total: usize,
//! }
//!
//! impl PcmSink for ByteCounter {
//!     fn deliver(&mut self, chunk: &[u8]) -> Result<()> {
//!         self.total += chunk.len();
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
pub mod logging;
pub mod platform;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{AudioCodec, FnSink, PcmFormat, PcmSink, BYTES_PER_SAMPLE};
