//! # Decode Session Example
//!
//! Probes a file, decodes it to S16LE stereo at 44.1 kHz and prints what the
//! sink received.
//!
//! Run with:
//! ```bash
//! cargo run --example decode_demo --package core-playback -- song.flac
//!
//! # Keep the source sample rate
//! cargo run --example decode_demo --package core-playback -- song.flac passthrough
//! ```

use bridge_traits::playback::FnSink;
use bridge_traits::LogLevel;
use core_playback::{probe_file, DecodeSession, SessionConfig, SymphoniaBackend};
use core_runtime::logging::{init_logging, LoggingConfig};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1).map(PathBuf::from) else {
        eprintln!("usage: decode_demo <file> [passthrough]");
        return ExitCode::FAILURE;
    };

    let config = match args.get(2).map(String::as_str) {
        Some("passthrough") => SessionConfig::passthrough_rate(),
        _ => SessionConfig::default(),
    };

    if let Err(e) = init_logging(
        LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .with_stderr(true),
    ) {
        eprintln!("logging unavailable: {}", e);
    }

    let backend = SymphoniaBackend::new();

    match probe_file(&backend, &path) {
        Ok(report) => {
            for stream in &report.streams {
                info!(
                    "stream {}: {:?} {:?} {:?}Hz {:?}ch",
                    stream.index, stream.kind, stream.codec, stream.sample_rate, stream.channels
                );
            }
            info!("duration: {:?}", report.duration());
        }
        Err(e) => {
            error!(kind = e.kind(), "probe failed: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let mut session = match DecodeSession::open(&backend, &path, config) {
        Ok(session) => session,
        Err(e) => {
            error!(kind = e.kind(), "open failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let format = session.output_format();

    let mut peak: i16 = 0;
    let mut sink = FnSink::new(|chunk: &[u8]| {
        for sample in chunk.chunks_exact(2) {
            let value = i16::from_le_bytes([sample[0], sample[1]]).saturating_abs();
            peak = peak.max(value);
        }
        Ok(())
    });

    let result = session.run(&mut sink);
    drop(sink);

    match result {
        Ok(summary) => {
            println!(
                "{}Hz/{}ch: {} chunks, {} bytes, {:.2}s of audio in {:.2}s, peak {}",
                format.sample_rate,
                format.channels,
                summary.chunks_delivered,
                summary.bytes_delivered,
                summary.samples_delivered as f64 / format.sample_rate as f64,
                summary.elapsed.as_secs_f64(),
                peak
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = e.kind(), "decode failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
