mod common;

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::playback::{FnSink, PcmFormat, PcmSink};
use common::{audio, stream, FailAt, FakeBackend, RecordingSink, Step, FRAME_BYTE, TAIL_BYTE};
use core_playback::traits::MediaKind;
use core_playback::{
    decode_file, DecodeSession, OutputSpec, PlaybackError, RunOutcome, SessionConfig,
    SessionState,
};
use mockall::mock;
use tokio_util::sync::CancellationToken;

const PATH: &str = "/music/track.flac";

mock! {
    pub Sink {}

    impl PcmSink for Sink {
        fn start(&mut self, format: &PcmFormat) -> BridgeResult<()>;
        fn deliver(&mut self, chunk: &[u8]) -> BridgeResult<()>;
        fn finish(&mut self) -> BridgeResult<()>;
    }
}

const FULL_LIFECYCLE: [&str; 6] = [
    "open container",
    "open decoder",
    "open resampler",
    "release resampler",
    "release decoder",
    "release container",
];

#[test]
fn test_delivers_one_exact_chunk_per_frame() {
    let backend = FakeBackend::with_steps(vec![audio(0, 1152), audio(0, 1152), audio(0, 576)]);
    let mut sink = RecordingSink::default();

    let summary = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap();

    // S16LE stereo: 4 bytes per sample frame
    assert_eq!(sink.lengths(), vec![4608, 4608, 2304]);
    assert_eq!(sink.format, Some(PcmFormat::new(44_100, 2)));
    assert!(sink.finished);
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.chunks_delivered, 3);
    assert_eq!(summary.bytes_delivered, 4608 + 4608 + 2304);
    assert_eq!(summary.samples_delivered, 1152 + 1152 + 576);
}

#[test]
fn test_chunk_length_follows_output_channels() {
    let backend = FakeBackend::with_steps(vec![audio(0, 100)]);
    let config = SessionConfig {
        output: OutputSpec {
            sample_rate: Some(48_000),
            channels: 1,
        },
        ..SessionConfig::default()
    };
    let mut sink = RecordingSink::default();

    decode_file(&backend, PATH, config, &mut sink).unwrap();

    assert_eq!(sink.format, Some(PcmFormat::new(48_000, 1)));
    assert_eq!(sink.lengths(), vec![200]);
}

#[test]
fn test_releases_in_reverse_order_after_completion() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]);
    let mut sink = RecordingSink::default();

    decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap();

    assert_eq!(backend.events(), FULL_LIFECYCLE);
}

#[test]
fn test_missing_file_fails_before_any_acquisition() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]).failing_at(FailAt::Container);
    let mut sink = MockSink::new();
    sink.expect_start().never();
    sink.expect_deliver().never();
    sink.expect_finish().never();

    let err = decode_file(&backend, "/missing.mp3", SessionConfig::default(), &mut sink)
        .unwrap_err();

    assert!(matches!(err, PlaybackError::ContainerOpen { .. }));
    assert!(err.is_open_error());
    assert!(backend.events().is_empty());
}

#[test]
fn test_no_audio_stream_releases_container_only() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]).with_streams(vec![
        stream(0, MediaKind::Video),
        stream(1, MediaKind::Subtitle),
    ]);

    let err = DecodeSession::open(&backend, PATH, SessionConfig::default())
        .err()
        .unwrap();

    assert!(matches!(err, PlaybackError::NoAudioStream(_)));
    assert_eq!(backend.count("open decoder"), 0);
    assert_eq!(backend.count("open resampler"), 0);
    assert_eq!(backend.events(), vec!["open container", "release container"]);
}

#[test]
fn test_unsupported_codec_releases_container() {
    let backend = FakeBackend::with_steps(vec![]).failing_at(FailAt::UnsupportedCodec);

    let err = DecodeSession::open(&backend, PATH, SessionConfig::default())
        .err()
        .unwrap();

    assert!(matches!(err, PlaybackError::UnsupportedCodec(_)));
    assert_eq!(backend.events(), vec!["open container", "release container"]);
}

#[test]
fn test_decoder_open_failure_releases_container() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]).failing_at(FailAt::Decoder);

    let err = DecodeSession::open(&backend, PATH, SessionConfig::default())
        .err()
        .unwrap();

    assert!(matches!(err, PlaybackError::DecoderOpen(_)));
    assert!(err.is_open_error());
    assert_eq!(backend.count("open resampler"), 0);
    assert_eq!(backend.events(), vec!["open container", "release container"]);
}

#[test]
fn test_audio_stream_without_rate_fails_open() {
    let mut rateless = stream(0, MediaKind::Audio);
    rateless.sample_rate = None;
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]).with_streams(vec![rateless]);

    let err = DecodeSession::open(&backend, PATH, SessionConfig::default())
        .err()
        .unwrap();

    assert!(matches!(err, PlaybackError::StreamProbe(ref msg) if msg.contains("stream 0")));
    assert_eq!(backend.count("open decoder"), 0);
    assert_eq!(backend.events(), vec!["open container", "release container"]);
}

#[test]
fn test_resampler_failure_releases_decoder_then_container() {
    let backend = FakeBackend::with_steps(vec![]).failing_at(FailAt::Resampler);

    let err = DecodeSession::open(&backend, PATH, SessionConfig::default())
        .err()
        .unwrap();

    assert!(matches!(err, PlaybackError::ResamplerInit(_)));
    assert_eq!(
        backend.events(),
        vec![
            "open container",
            "open decoder",
            "release decoder",
            "release container"
        ]
    );
}

#[test]
fn test_invalid_config_acquires_nothing() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]);
    let config = SessionConfig {
        output: OutputSpec {
            sample_rate: Some(44_100),
            channels: 0,
        },
        ..SessionConfig::default()
    };

    let err = DecodeSession::open(&backend, PATH, config).err().unwrap();

    assert!(matches!(err, PlaybackError::InvalidConfig(_)));
    assert!(backend.events().is_empty());
}

#[test]
fn test_close_is_idempotent() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]);
    let mut session = DecodeSession::open(&backend, PATH, SessionConfig::default()).unwrap();
    assert_eq!(session.state(), SessionState::Opened);

    session.close();
    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    drop(session);

    assert_eq!(backend.events(), FULL_LIFECYCLE);
}

#[test]
fn test_drop_without_run_releases_everything() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]);
    {
        let _session = DecodeSession::open(&backend, PATH, SessionConfig::default()).unwrap();
    }
    assert!(backend.balanced());
    assert_eq!(backend.count("release container"), 1);
}

#[test]
fn test_run_after_close_is_invalid_state() {
    let backend = FakeBackend::with_steps(vec![audio(0, 64)]);
    let mut session = DecodeSession::open(&backend, PATH, SessionConfig::default()).unwrap();
    let mut sink = RecordingSink::default();

    session.run(&mut sink).unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    let err = session.run(&mut sink).unwrap_err();
    assert!(matches!(err, PlaybackError::InvalidState(_)));
    assert_eq!(sink.chunks.len(), 1);
    assert_eq!(backend.events(), FULL_LIFECYCLE);
}

#[test]
fn test_decode_error_after_partial_output() {
    let backend = FakeBackend::with_steps(vec![
        audio(0, 100),
        audio(0, 100),
        Step::Corrupt { stream: 0 },
        audio(0, 100),
    ]);
    let mut session = DecodeSession::open(&backend, PATH, SessionConfig::default()).unwrap();
    let mut sink = RecordingSink::default();

    let err = session.run(&mut sink).unwrap_err();

    assert!(matches!(err, PlaybackError::Decode(_)));
    assert_eq!(sink.lengths(), vec![400, 400]);
    assert!(sink.finished);
    assert_eq!(session.summary().chunks_delivered, 2);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(backend.events(), FULL_LIFECYCLE);
}

#[test]
fn test_read_error_is_decode_error() {
    let backend = FakeBackend::with_steps(vec![audio(0, 100), Step::ReadError]);
    let mut sink = RecordingSink::default();

    let err = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap_err();

    assert_eq!(err.kind(), "decode");
    assert_eq!(sink.chunks.len(), 1);
    assert!(backend.balanced());
}

#[test]
fn test_sink_failure_stops_delivery() {
    let backend = FakeBackend::with_steps(vec![audio(0, 100), audio(0, 100), audio(0, 100)]);
    let mut sink = MockSink::new();
    sink.expect_start()
        .withf(|format| *format == PcmFormat::new(44_100, 2))
        .times(1)
        .returning(|_| Ok(()));
    sink.expect_deliver()
        .withf(|chunk| chunk.len() == 400)
        .times(1)
        .returning(|_| Err(BridgeError::HostException("java.lang.IllegalStateException".into())));
    sink.expect_finish().times(1).returning(|| Ok(()));

    let err = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap_err();

    assert!(matches!(err, PlaybackError::SinkDelivery(ref msg) if msg.contains("IllegalStateException")));
    assert_eq!(backend.events(), FULL_LIFECYCLE);
}

#[test]
fn test_sink_start_failure_delivers_nothing() {
    let backend = FakeBackend::with_steps(vec![audio(0, 100)]);
    let mut sink = MockSink::new();
    sink.expect_start()
        .times(1)
        .returning(|_| Err(BridgeError::NotAvailable("audio track".into())));
    sink.expect_deliver().never();
    sink.expect_finish().times(1).returning(|| Ok(()));

    let err = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap_err();

    assert_eq!(err.kind(), "sink_delivery");
    assert!(backend.balanced());
}

#[test]
fn test_cancelled_token_stops_before_first_chunk() {
    let backend = FakeBackend::with_steps(vec![audio(0, 100), audio(0, 100)]);
    let mut session = DecodeSession::open(&backend, PATH, SessionConfig::default()).unwrap();
    let stop = CancellationToken::new();
    stop.cancel();
    let mut sink = RecordingSink::default();

    let summary = session.run_until(&mut sink, &stop).unwrap();

    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert_eq!(summary.chunks_delivered, 0);
    assert!(sink.finished);
    assert!(backend.balanced());
}

#[test]
fn test_stop_from_sink_takes_effect_next_iteration() {
    let backend = FakeBackend::with_steps(vec![audio(0, 100), audio(0, 100), audio(0, 100)]);
    let mut session = DecodeSession::open(&backend, PATH, SessionConfig::default()).unwrap();
    let stop = CancellationToken::new();
    let trigger = stop.clone();
    let mut delivered = 0;
    let mut sink = FnSink::new(|_chunk: &[u8]| {
        delivered += 1;
        trigger.cancel();
        Ok(())
    });

    let summary = session.run_until(&mut sink, &stop).unwrap();
    drop(sink);

    // The first delivery happens when the second frame arrives; the loop then
    // stops and hands over the chunk it was holding.
    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert_eq!(summary.frames_decoded, 2);
    assert_eq!(summary.chunks_delivered, 2);
    assert_eq!(summary.packets_read, 2);
    assert_eq!(delivered, 2);
    assert_eq!(backend.events(), FULL_LIFECYCLE);
}

#[test]
fn test_packets_of_other_streams_are_skipped() {
    let backend = FakeBackend::with_steps(vec![
        audio(0, 10),
        audio(1, 100),
        audio(0, 10),
        audio(1, 100),
        audio(2, 5),
    ])
    .with_streams(vec![
        stream(0, MediaKind::Video),
        stream(1, MediaKind::Audio),
        stream(2, MediaKind::Audio),
    ]);
    let mut sink = RecordingSink::default();

    let summary = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap();

    assert_eq!(sink.lengths(), vec![400, 400]);
    assert_eq!(summary.packets_read, 5);
    assert_eq!(summary.packets_skipped, 3);
}

#[test]
fn test_empty_decode_and_flush_tail() {
    let backend = FakeBackend::with_steps(vec![audio(0, 0), audio(0, 100), audio(0, 0)])
        .with_flush_tail(25);
    let mut sink = RecordingSink::default();

    let summary = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap();

    // Packets needing more input produce no chunk; the flushed tail joins the
    // last frame's chunk
    assert_eq!(sink.lengths(), vec![500]);
    assert_eq!(summary.frames_decoded, 1);
    assert_eq!(summary.chunks_delivered, summary.frames_decoded);
    assert_eq!(summary.samples_delivered, 125);
}

#[test]
fn test_flush_tail_is_appended_to_last_chunk() {
    let backend = FakeBackend::with_steps(vec![audio(0, 200), audio(0, 100), audio(0, 50)])
        .with_flush_tail(10);
    let mut sink = RecordingSink::default();

    let summary = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap();

    assert_eq!(sink.lengths(), vec![800, 400, 240]);
    assert_eq!(summary.chunks_delivered, 3);
    assert_eq!(summary.frames_decoded, 3);
    assert!(sink.chunks[..2]
        .iter()
        .all(|chunk| chunk.iter().all(|byte| *byte == FRAME_BYTE)));
    let last = &sink.chunks[2];
    assert!(last[..200].iter().all(|byte| *byte == FRAME_BYTE));
    assert!(last[200..].iter().all(|byte| *byte == TAIL_BYTE));
}

#[test]
fn test_empty_stream_completes_without_chunks() {
    let backend = FakeBackend::with_steps(vec![]);
    let mut sink = RecordingSink::default();

    let summary = decode_file(&backend, PATH, SessionConfig::default(), &mut sink).unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert!(sink.chunks.is_empty());
    assert!(sink.format.is_some());
    assert!(sink.finished);
    assert_eq!(backend.events(), FULL_LIFECYCLE);
}

#[test]
fn test_passthrough_rate_uses_source_rate() {
    let backend = FakeBackend::with_steps(vec![audio(0, 10)]);
    let session = DecodeSession::open(&backend, PATH, SessionConfig::passthrough_rate()).unwrap();

    assert_eq!(session.output_format().sample_rate, common::SOURCE_RATE);
    assert_eq!(session.stream().index, 0);
}
