//! # Format Detection Module
//!
//! Maps file paths and symphonia codec types onto the crate's own stream
//! descriptions.

use crate::traits::MediaKind;
use bridge_traits::playback::AudioCodec;
use std::path::Path;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Format detector for audio containers.
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from file path.
    ///
    /// The extension narrows symphonia's probe to matching readers first. A
    /// missing or wrong extension still falls back to content sniffing.
    pub fn hint_from_path(path: &Path) -> Hint {
        let mut hint = Hint::new();

        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            debug!("Setting probe hint extension: {}", extension);
            hint.with_extension(extension);
        } else {
            debug!("No file extension found, probe will auto-detect");
        }

        hint
    }

    /// Classify a track by its codec type.
    ///
    /// Symphonia only demuxes audio, but tracks it cannot identify carry
    /// `CODEC_TYPE_NULL` and are treated as non-audio so they are never
    /// selected.
    pub fn media_kind(codec_type: CodecType) -> MediaKind {
        if codec_type == symphonia::core::codecs::CODEC_TYPE_NULL {
            MediaKind::Other
        } else {
            MediaKind::Audio
        }
    }

    /// Detect audio codec from Symphonia codec type.
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_NULL {
            AudioCodec::Unknown
        } else if codec_type == CODEC_TYPE_MP3 {
            AudioCodec::Mp3
        } else if codec_type == CODEC_TYPE_AAC {
            AudioCodec::Aac
        } else if codec_type == CODEC_TYPE_FLAC {
            AudioCodec::Flac
        } else if codec_type == CODEC_TYPE_VORBIS {
            AudioCodec::Vorbis
        } else if codec_type == CODEC_TYPE_OPUS {
            AudioCodec::Opus
        } else if codec_type == CODEC_TYPE_ALAC {
            AudioCodec::Alac
        } else if codec_type == CODEC_TYPE_PCM_S16LE
            || codec_type == CODEC_TYPE_PCM_S16BE
            || codec_type == CODEC_TYPE_PCM_S24LE
            || codec_type == CODEC_TYPE_PCM_S24BE
            || codec_type == CODEC_TYPE_PCM_S32LE
            || codec_type == CODEC_TYPE_PCM_S32BE
            || codec_type == CODEC_TYPE_PCM_U8
            || codec_type == CODEC_TYPE_PCM_F32LE
            || codec_type == CODEC_TYPE_PCM_F32BE
            || codec_type == CODEC_TYPE_PCM_F64LE
            || codec_type == CODEC_TYPE_PCM_F64BE
        {
            AudioCodec::Pcm
        } else {
            let name = symphonia::default::get_codecs()
                .get_codec(codec_type)
                .map(|descriptor| descriptor.short_name.to_string())
                .unwrap_or_else(|| format!("{:?}", codec_type));
            debug!("Codec without dedicated variant: {}", name);
            AudioCodec::Other(name)
        }
    }
}
