//! Integration tests for chunk delivery.
//!
//! These tests drive the bridge through the host lifecycle with mock
//! collaborators and check what reaches the output channels: event order,
//! fragment sizes, discontinuity flags and the download gate.

mod common;

use aamp_bridge::event::{FlushStopEvent, SegmentEvent};
use aamp_bridge::prelude::*;
use aamp_bridge::testing::Recorded;
use bytes::BytesMut;
use common::{Fixture, names};

const KIB: usize = 1024;

// ============================================================================
// Fragmentation
// ============================================================================

/// Test the 400 KiB chunk with a 192 KiB limit after a flush.
#[test]
fn test_flush_then_large_chunk() {
    let fx = Fixture::ready(BridgeConfig::default().with_max_fragment_size(192 * KIB));
    let video = fx.video();

    // Introduce the stream first.
    fx.send(MediaType::Video, &[0u8; 188], 9.0);
    video.clear();

    fx.bridge.sink().flush(12.5, 1.0);
    let data = vec![0x47u8; 400 * KIB];
    let outcome = fx.send(MediaType::Video, &data, 12.5);

    assert_eq!(outcome.fragments_pushed, 3);
    assert_eq!(outcome.bytes_pushed, 400 * KIB);
    assert!(outcome.discontinuity);
    assert!(outcome.is_complete());

    let items = video.items();
    assert_eq!(items.len(), 6);
    assert_eq!(items[0], Recorded::Event(Event::FlushStart));
    assert_eq!(
        items[1],
        Recorded::Event(Event::FlushStop(FlushStopEvent::new(false)))
    );
    assert_eq!(
        items[2],
        Recorded::Event(Event::Segment(SegmentEvent::new_time(
            ClockTime::from_millis(12_500)
        )))
    );

    let buffers = video.buffers();
    let sizes: Vec<_> = buffers.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, [192 * KIB, 192 * KIB, 16 * KIB]);
    let discont: Vec<_> = buffers.iter().map(|b| b.is_discont()).collect();
    assert_eq!(discont, [true, false, false]);
    assert!(buffers.iter().all(|b| b.pts() == ClockTime::from_millis(12_500)));
}

/// Test that fragment count is ceil(len / max) and lengths sum to len.
#[test]
fn test_fragment_count_property() {
    let max = 1000;
    let fx = Fixture::ready(BridgeConfig::default().with_max_fragment_size(max));
    let video = fx.video();

    for len in [1, 999, 1000, 1001, 2500, 10_000] {
        video.clear();
        let data = vec![1u8; len];
        let outcome = fx.send(MediaType::Video, &data, 0.0);

        let buffers = video.buffers();
        assert_eq!(buffers.len(), len.div_ceil(max), "len {}", len);
        assert_eq!(buffers.iter().map(|b| b.len()).sum::<usize>(), len);
        assert_eq!(outcome.fragments_pushed, buffers.len());
        assert!(buffers.iter().skip(1).all(|b| !b.is_discont()));
    }
}

/// Test that the default limit is a whole number of transport packets.
#[test]
fn test_default_limit_is_packet_aligned() {
    let fx = Fixture::ready(BridgeConfig::default());
    let data = vec![0u8; 188 * 2048];
    fx.send(MediaType::Video, &data, 0.0);

    let sizes: Vec<_> = fx.video().buffers().iter().map(|b| b.len()).collect();
    assert_eq!(sizes, [188 * 1024, 188 * 1024]);
    assert!(sizes.iter().all(|s| s % 188 == 0));
}

/// Test that the transferred form leaves the caller's buffer empty.
#[test]
fn test_transferred_chunk() {
    let fx = Fixture::ready(BridgeConfig::default().with_max_fragment_size(100));
    let mut buf = BytesMut::from(&vec![9u8; 250][..]);

    let outcome = fx
        .bridge
        .sink()
        .send(MediaChunk::transferred(MediaType::Audio, &mut buf, 1.0, 1.0, 0.02));

    assert_eq!(outcome.fragments_pushed, 3);
    assert!(buf.is_empty());
    assert_eq!(fx.audio().buffers().len(), 3);
}

// ============================================================================
// Download gate
// ============================================================================

/// Test closing the gate after the first of three fragments.
#[test]
fn test_gate_closed_mid_chunk() {
    let fx = Fixture::ready(BridgeConfig::default().with_max_fragment_size(64));
    fx.engine.disable_downloads_after(1);

    let data = [0u8; 192];
    let outcome = fx.send(MediaType::Video, &data, 0.0);

    assert_eq!(outcome.fragments_pushed, 1);
    assert_eq!(outcome.dropped, Some(DropReason::DownloadsDisabled));
    assert_eq!(fx.video().buffers().len(), 1);
    assert_eq!(fx.bridge.state(), PipelineState::Ready);
}

/// Test that a closed gate still lets pending events through.
#[test]
fn test_gate_closed_before_chunk() {
    let fx = Fixture::ready(BridgeConfig::default());
    fx.engine.set_downloads_enabled(false);

    let outcome = fx.send(MediaType::Video, &[0u8; 10], 3.0);

    assert_eq!(outcome.fragments_pushed, 0);
    assert_eq!(outcome.dropped, Some(DropReason::DownloadsDisabled));
    assert_eq!(
        names(&fx.video().events()),
        ["stream-start", "caps", "segment"]
    );
}

// ============================================================================
// Pending events
// ============================================================================

/// Test the first chunk on each track introduces the stream.
#[test]
fn test_first_chunk_introduces_stream() {
    let fx = Fixture::ready(BridgeConfig::default());
    let outcome = fx.send(MediaType::Video, &[0u8; 188], 2.0);
    assert!(outcome.discontinuity);

    let events = fx.video().events();
    assert_eq!(names(&events), ["stream-start", "caps", "segment"]);
    match &events[0] {
        Event::StreamStart(start) => assert_eq!(start.stream_id, "aamp/video_01"),
        other => panic!("expected stream-start, got {:?}", other),
    }
    match &events[1] {
        Event::Caps(caps) => assert_eq!(
            caps.to_string(),
            "video/mpegts, systemstream=(boolean)true, packetsize=(int)188"
        ),
        other => panic!("expected caps, got {:?}", other),
    }

    // Nothing pending on the next chunk.
    let outcome = fx.send(MediaType::Video, &[0u8; 188], 2.04);
    assert!(!outcome.discontinuity);
    assert_eq!(fx.video().events().len(), 3);
    assert!(!fx.video().buffers()[1].is_discont());
}

/// Test stream-start always precedes a flush in the same batch.
#[test]
fn test_stream_start_before_flush() {
    let fx = Fixture::ready(BridgeConfig::default());
    fx.bridge.sink().flush(0.0, 1.0);
    fx.send(MediaType::Audio, &[0u8; 32], 0.0);

    assert_eq!(
        names(&fx.audio().events()),
        ["stream-start", "caps", "flush-start", "flush-stop", "segment"]
    );
}

/// Test that flushing twice before a chunk applies one batch.
#[test]
fn test_double_flush_applies_once() {
    let fx = Fixture::ready(BridgeConfig::default());
    fx.send(MediaType::Video, &[0u8; 8], 0.0);
    fx.video().clear();

    fx.bridge.sink().flush(5.0, 1.0);
    fx.bridge.sink().flush(5.0, 1.0);
    fx.send(MediaType::Video, &[0u8; 8], 5.0);
    fx.send(MediaType::Video, &[0u8; 8], 5.04);

    assert_eq!(
        names(&fx.video().events()),
        ["flush-start", "flush-stop", "segment"]
    );
}

/// Test a discontinuity on one track leaves the other alone.
#[test]
fn test_discontinuity_single_track() {
    let fx = Fixture::ready(BridgeConfig::default());
    fx.send(MediaType::Video, &[0u8; 8], 0.0);
    fx.send(MediaType::Audio, &[0u8; 8], 0.0);
    fx.video().clear();
    fx.audio().clear();

    fx.bridge.sink().discontinuity(MediaType::Audio);
    let video = fx.send(MediaType::Video, &[0u8; 8], 1.0);
    let audio = fx.send(MediaType::Audio, &[0u8; 8], 1.0);

    assert!(!video.discontinuity);
    assert!(audio.discontinuity);
    assert!(fx.video().events().is_empty());
    assert_eq!(names(&fx.audio().events()), ["segment"]);
}

/// Test the segment carries the current rate as applied rate.
#[test]
fn test_segment_applied_rate() {
    let fx = Fixture::ready(BridgeConfig::default());
    fx.send(MediaType::Video, &[0u8; 8], 0.0);
    fx.video().clear();

    assert!(fx.bridge.handle_seek(&SeekEvent::rate_only(4.0)));
    fx.send(MediaType::Video, &[0u8; 8], 20.0);

    let segment = fx
        .video()
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Segment(seg) => Some(seg),
            _ => None,
        })
        .expect("segment");
    assert_eq!(segment.applied_rate, 4.0);
    assert_eq!(segment.start, ClockTime::from_secs(20));
}

// ============================================================================
// Failures and structural absence
// ============================================================================

/// Test a chunk cut short by the gate does not affect the next one.
#[test]
fn test_gate_reopens_for_next_chunk() {
    let fx = Fixture::ready(BridgeConfig::default().with_max_fragment_size(10));

    fx.engine.disable_downloads_after(2);
    let first = fx.send(MediaType::Video, &[0u8; 50], 0.0);
    assert_eq!(first.fragments_pushed, 2);
    assert_eq!(first.bytes_pushed, 20);

    fx.engine.set_downloads_enabled(true);
    let second = fx.send(MediaType::Video, &[0u8; 50], 0.1);
    assert_eq!(second.fragments_pushed, 5);
    assert!(second.is_complete());
    assert_eq!(fx.bridge.state(), PipelineState::Ready);
}

/// Test chunks for a track without a channel are dropped silently.
#[test]
fn test_absent_track_dropped() {
    common::init_tracing();
    let engine = std::sync::Arc::new(
        aamp_bridge::testing::MockEngine::new()
            .with_formats(OutputFormat::MpegTs, OutputFormat::None),
    );
    let host = std::sync::Arc::new(aamp_bridge::testing::MockHost::new().with_uri(common::URI));
    let bridge = AampBridge::new(BridgeConfig::default(), host.clone(), engine, None);
    bridge.change_state(HostTransition::NullToReady);
    bridge.change_state(HostTransition::ReadyToPaused);

    let outcome = bridge
        .sink()
        .send(MediaChunk::borrowed(MediaType::Audio, &[0u8; 16], 0.0, 0.0, 0.0));
    assert_eq!(outcome.dropped, Some(DropReason::NoChannel));
    assert_eq!(host.created(), ["video_01"]);
    assert_eq!(bridge.state(), PipelineState::Ready);
}

/// Test audio is dropped when configured to discard it.
#[test]
fn test_discard_audio_config() {
    let fx = Fixture::ready(BridgeConfig::default().with_discard_audio(true));
    let outcome = fx.send(MediaType::Audio, &[0u8; 16], 0.0);
    assert_eq!(outcome.dropped, Some(DropReason::AudioDiscarded));
    assert!(fx.audio().items().is_empty());
}
