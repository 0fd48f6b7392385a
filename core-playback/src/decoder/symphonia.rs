//! # Symphonia Backend
//!
//! [`MediaBackend`] implementation backed by symphonia's default probe and
//! codec registries, with [`PcmResampler`] for rate and layout conversion.

use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{PlaybackError, Result};
use crate::resampler::PcmResampler;
use crate::traits::{
    DecodedFrame, EncodedPacket, FrameDecoder, MediaBackend, MediaContainer, ResamplerSpec,
    SampleSpec, StreamInfo,
};
use core_runtime::logging::strip_path;
use std::path::Path;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use tracing::{debug, error, info, instrument, trace, warn, Level};

/// Channel count assumed when neither the container nor the decoder reports
/// one. Corrected from the first decoded frame.
const FALLBACK_CHANNELS: u16 = 2;

/// Backend that opens files with symphonia.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaBackend {
    enable_gapless: bool,
}

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim encoder delay and padding for formats that record it.
    pub fn with_gapless(mut self, enable: bool) -> Self {
        self.enable_gapless = enable;
        self
    }
}

/// Opened container. Owns the file through its media source stream.
pub struct SymphoniaContainer {
    reader: Box<dyn FormatReader>,
    /// Symphonia track ids in container order.
    track_ids: Vec<u32>,
    source: String,
}

/// Packet tagged with its stream's container index.
pub struct SymphoniaPacket {
    stream_index: usize,
    packet: Packet,
}

impl EncodedPacket for SymphoniaPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }
}

/// Opened codec decoder for one stream.
pub struct SymphoniaFrameDecoder {
    decoder: Box<dyn Decoder>,
    spec: SampleSpec,
}

impl MediaBackend for SymphoniaBackend {
    type Container = SymphoniaContainer;
    type Decoder = SymphoniaFrameDecoder;
    type Resampler = PcmResampler;

    #[instrument(skip(self, path), fields(file = %strip_path(&path.to_string_lossy())))]
    fn open_container(&self, path: &Path) -> Result<SymphoniaContainer> {
        let source = path.display().to_string();
        let container_error = |reason: String| PlaybackError::ContainerOpen {
            path: source.clone(),
            reason,
        };

        // Step 1: Open the file
        let file = std::fs::File::open(path).map_err(|e| {
            warn!("Failed to open file: {}", e);
            container_error(e.to_string())
        })?;

        let hint = FormatDetector::hint_from_path(path);
        let media_source = Box::new(file) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());

        // Step 2: Probe the container format
        let format_options = FormatOptions {
            enable_gapless: self.enable_gapless,
            ..Default::default()
        };
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_options, &MetadataOptions::default())
            .map_err(|e| {
                warn!("Format probe failed: {}", e);
                container_error(format!("unrecognized container: {}", e))
            })?;

        let reader = probed.format;
        let track_ids = reader.tracks().iter().map(|track| track.id).collect::<Vec<_>>();
        debug!("Container opened with {} track(s)", track_ids.len());

        Ok(SymphoniaContainer {
            reader,
            track_ids,
            source,
        })
    }

    fn open_decoder(
        &self,
        container: &SymphoniaContainer,
        stream: &StreamInfo,
    ) -> Result<SymphoniaFrameDecoder> {
        let track = container.reader.tracks().get(stream.index).ok_or_else(|| {
            PlaybackError::Internal(format!("stream {} vanished from container", stream.index))
        })?;
        let params = &track.codec_params;

        if params.codec == CODEC_TYPE_NULL {
            return Err(PlaybackError::UnsupportedCodec(format!("{:?}", stream.codec)));
        }

        let descriptor = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .ok_or_else(|| {
                warn!("No decoder registered for {:?}", stream.codec);
                PlaybackError::UnsupportedCodec(format!("{:?}", stream.codec))
            })?;

        let decoder = (descriptor.inst_func)(params, &DecoderOptions::default()).map_err(|e| {
            error!("Failed to create decoder {}: {}", descriptor.short_name, e);
            PlaybackError::DecoderOpen(format!("{}: {}", descriptor.short_name, e))
        })?;

        // Channels might not be available until first decode (especially for AAC/M4A)
        let decoder_params = decoder.codec_params();
        let sample_rate = decoder_params
            .sample_rate
            .or(stream.sample_rate)
            .unwrap_or_default();
        let channels = decoder_params
            .channels
            .map(|ch| ch.count() as u16)
            .or(stream.channels)
            .unwrap_or_else(|| {
                debug!("Channel count unknown, assuming {}", FALLBACK_CHANNELS);
                FALLBACK_CHANNELS
            });

        info!(
            "Opened {} decoder: {}Hz, {} channel(s)",
            descriptor.short_name, sample_rate, channels
        );

        Ok(SymphoniaFrameDecoder {
            decoder,
            spec: SampleSpec {
                sample_rate,
                channels,
            },
        })
    }

    fn open_resampler(&self, spec: &ResamplerSpec) -> Result<PcmResampler> {
        PcmResampler::new(spec)
    }
}

impl MediaContainer for SymphoniaContainer {
    type Packet = SymphoniaPacket;

    fn probe_streams(&mut self) -> Result<Vec<StreamInfo>> {
        let streams = self
            .reader
            .tracks()
            .iter()
            .enumerate()
            .map(|(index, track)| {
                let params = &track.codec_params;
                StreamInfo {
                    index,
                    kind: FormatDetector::media_kind(params.codec),
                    codec: FormatDetector::detect_codec(params.codec),
                    sample_rate: params.sample_rate,
                    channels: params.channels.map(|ch| ch.count() as u16),
                    frames: params.n_frames,
                }
            })
            .collect::<Vec<_>>();

        for stream in &streams {
            debug!(
                "Stream {}: {:?} {:?} {:?}Hz {:?}ch",
                stream.index, stream.kind, stream.codec, stream.sample_rate, stream.channels
            );
        }

        Ok(streams)
    }

    fn read_packet(&mut self) -> Result<Option<SymphoniaPacket>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    // Normal end of stream
                    debug!("Reached end of stream in {}", strip_path(&self.source));
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Track list changed mid-stream");
                    return Err(PlaybackError::Decode(
                        "Track list changed, reset required".to_string(),
                    ));
                }
                Err(e) => {
                    error!("Failed to read packet: {}", e);
                    return Err(PlaybackError::Decode(format!("Failed to read packet: {}", e)));
                }
            };

            // Consume any new metadata that was read with this packet
            while !self.reader.metadata().is_latest() {
                self.reader.metadata().pop();
            }

            match self.track_ids.iter().position(|&id| id == packet.track_id()) {
                Some(stream_index) => {
                    return Ok(Some(SymphoniaPacket {
                        stream_index,
                        packet,
                    }))
                }
                None => trace!("Dropping packet for unlisted track {}", packet.track_id()),
            }
        }
    }
}

impl FrameDecoder<SymphoniaPacket> for SymphoniaFrameDecoder {
    fn sample_spec(&self) -> SampleSpec {
        self.spec
    }

    fn decode(&mut self, packet: &SymphoniaPacket, frame: &mut DecodedFrame) -> Result<bool> {
        let decoded = self.decoder.decode(&packet.packet).map_err(|e| {
            error!("Failed to decode packet: {}", e);
            PlaybackError::Decode(format!("Failed to decode packet: {}", e))
        })?;

        if decoded.frames() == 0 {
            trace!("Decoder produced no frames yet");
            return Ok(false);
        }

        SampleConverter::copy_to_frame(&decoded, frame);

        if tracing::enabled!(Level::TRACE) {
            SampleConverter::count_clipped(frame);
        }

        Ok(true)
    }
}
