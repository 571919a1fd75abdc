//! Integration tests for seeks and trick-play rates.

mod common;

use aamp_bridge::event::{FlushStopEvent, SeekFormat};
use aamp_bridge::prelude::*;
use aamp_bridge::testing::EngineCall;
use common::{Fixture, names};

fn started(fx: &Fixture) {
    fx.send(MediaType::Video, &[0u8; 8], 0.0);
    fx.send(MediaType::Audio, &[0u8; 8], 0.0);
    fx.video().clear();
    fx.audio().clear();
}

// ============================================================================
// Seeks
// ============================================================================

/// Test a flushing seek to an absolute position.
#[test]
fn test_flushing_seek() {
    let fx = Fixture::ready(BridgeConfig::default());
    started(&fx);

    let seek = SeekEvent::new_time(ClockTime::from_secs(30));
    assert!(fx.bridge.handle_seek(&seek));

    assert_eq!(fx.engine.seeks(), [(1.0, 30.0)]);
    assert_eq!(
        fx.video().events(),
        [
            Event::FlushStart,
            Event::FlushStop(FlushStopEvent::new(true))
        ]
    );

    // The engine's post-seek data is preceded by a flush batch.
    fx.send(MediaType::Video, &[0u8; 8], 30.0);
    assert_eq!(
        names(&fx.video().events()),
        ["flush-start", "flush-stop", "flush-start", "flush-stop", "segment"]
    );
}

/// Test a reverse seek targets the stop position.
#[test]
fn test_reverse_seek_uses_stop() {
    let fx = Fixture::ready(BridgeConfig::default());
    let seek = SeekEvent::new_time(ClockTime::ZERO)
        .with_rate(-4.0)
        .with_stop(SeekType::Set, ClockTime::from_secs(90).nanos() as i64);

    assert!(fx.bridge.handle_seek(&seek));
    assert_eq!(fx.engine.seeks(), [(-4.0, 90.0)]);
    assert_eq!(fx.bridge.rate(), -4.0);
}

/// Test a rate-only seek keeps the position.
#[test]
fn test_rate_only_seek() {
    let fx = Fixture::ready(BridgeConfig::default());
    started(&fx);

    assert!(fx.bridge.handle_seek(&SeekEvent::rate_only(2.0)));
    assert!(fx.engine.seeks().is_empty());
    assert!(fx.engine.calls().contains(&EngineCall::SetRate(2.0)));
    // Not flushing, so nothing is pushed immediately.
    assert!(fx.video().events().is_empty());
}

/// Test seeks are refused before Ready and in other formats.
#[test]
fn test_seek_refused() {
    let fx = Fixture::tuned(BridgeConfig::default());
    assert!(!fx.bridge.handle_seek(&SeekEvent::new_time(ClockTime::from_secs(5))));

    fx.bridge.change_state(HostTransition::ReadyToPaused);
    let bytes = SeekEvent::new_time(ClockTime::from_secs(5)).with_format(SeekFormat::Bytes);
    assert!(!fx.bridge.handle_seek(&bytes));
    assert!(fx.engine.seeks().is_empty());

    assert!(fx.bridge.handle_seek(&SeekEvent::new_time(ClockTime::from_secs(5))));
}

// ============================================================================
// Trick-play audio
// ============================================================================

/// Test audio is detached at 4x and restored at 1x.
#[test]
fn test_audio_toggled_by_rate() {
    let fx = Fixture::ready(BridgeConfig::default());
    started(&fx);
    assert!(fx.bridge.audio_enabled());

    assert!(fx.bridge.handle_seek(&SeekEvent::rate_only(4.0)));
    assert!(!fx.bridge.audio_enabled());
    assert_eq!(fx.host.detached(), ["audio_01"]);
    assert!(!fx.audio().is_active());

    let outcome = fx.send(MediaType::Audio, &[0u8; 8], 10.0);
    assert_eq!(outcome.dropped, Some(DropReason::TrackDisabled));
    assert!(fx.audio().items().is_empty());

    // Video keeps flowing.
    let outcome = fx.send(MediaType::Video, &[0u8; 8], 10.0);
    assert!(outcome.is_complete());

    assert!(fx.bridge.handle_seek(&SeekEvent::rate_only(1.0)));
    assert!(fx.bridge.audio_enabled());
    assert_eq!(fx.host.attached(), ["video_01", "audio_01", "audio_01"]);

    let outcome = fx.send(MediaType::Audio, &[0u8; 8], 12.0);
    assert!(outcome.is_complete());
    assert_eq!(
        names(&fx.audio().events()),
        ["stream-start", "caps", "flush-start", "flush-stop", "segment"]
    );
}

/// Test repeated trick-play rates detach audio only once.
#[test]
fn test_repeated_trick_rates() {
    let fx = Fixture::ready(BridgeConfig::default());
    for rate in [2.0, 4.0, 16.0, -2.0] {
        assert!(fx.bridge.handle_seek(&SeekEvent::rate_only(rate)));
    }
    assert_eq!(fx.host.detached(), ["audio_01"]);
    assert_eq!(fx.bridge.rate(), -2.0);
}

/// Test flushing all tracks twice before data yields one batch per track.
#[test]
fn test_flush_all_idempotent() {
    let fx = Fixture::ready(BridgeConfig::default());
    started(&fx);

    let sink = fx.bridge.sink();
    sink.flush(3.0, 1.0);
    sink.flush(3.0, 1.0);
    fx.send(MediaType::Video, &[0u8; 8], 3.0);
    fx.send(MediaType::Audio, &[0u8; 8], 3.0);

    for channel in [fx.video(), fx.audio()] {
        assert_eq!(
            names(&channel.events()),
            ["flush-start", "flush-stop", "segment"]
        );
    }
}

/// Test the segment after a flush is based at the next chunk's pts.
#[test]
fn test_flush_segment_uses_chunk_pts() {
    let fx = Fixture::ready(BridgeConfig::default());
    started(&fx);

    fx.bridge.sink().flush(3.0, 2.0);
    fx.send(MediaType::Video, &[0u8; 8], 7.0);

    let segment = fx
        .video()
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Segment(seg) => Some(seg),
            _ => None,
        })
        .expect("segment");
    assert_eq!(segment.start, ClockTime::from_secs(7));
    assert_eq!(segment.applied_rate, 1.0);
    assert_eq!(fx.bridge.rate(), 1.0);
}
