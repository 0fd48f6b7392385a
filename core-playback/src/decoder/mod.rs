//! # Symphonia Backend
//!
//! [`MediaBackend`](crate::traits::MediaBackend) implementation on top of the
//! Symphonia pure-Rust decoding library.
//!
//! ## Supported Formats
//!
//! | Format | Codec | Notes |
//! |--------|-------|-------|
//! | MP3 | MPEG-1/2 Audio Layer III | |
//! | FLAC | Free Lossless Audio Codec | |
//! | Vorbis | Ogg Vorbis | |
//! | AAC | Advanced Audio Coding | MP4/ADTS |
//! | WAV | PCM | |
//! | ALAC | Apple Lossless | MP4 |
//!
//! Anything Symphonia cannot instantiate a decoder for (APE among them) is
//! reported as `UnsupportedCodec` rather than a probe failure.
//!
//! ## Pipeline
//!
//! ```text
//! File → MediaSourceStream → FormatReader → Decoder → DecodedFrame → PcmResampler
//! ```

mod format_detector;
mod sample_converter;
mod symphonia;

pub use self::symphonia::{
    SymphoniaBackend, SymphoniaContainer, SymphoniaFrameDecoder, SymphoniaPacket,
};
pub use format_detector::FormatDetector;
pub use sample_converter::SampleConverter;
