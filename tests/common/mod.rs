//! Shared helpers for the integration tests.

#![allow(dead_code)]

use aamp_bridge::prelude::*;
use aamp_bridge::testing::{MockEngine, MockHost, RecordingChannel};
use std::sync::{Arc, Once};
use std::thread;
use std::time::{Duration, Instant};

pub const URI: &str = "http://example.com/content/master.m3u8";

static TRACING: Once = Once::new();

/// Route bridge logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A bridge taken through `NullToReady` and `ReadyToPaused`.
pub struct Fixture {
    pub bridge: AampBridge,
    pub engine: Arc<MockEngine>,
    pub host: Arc<MockHost>,
}

impl Fixture {
    /// Video and audio negotiated, bridge `Ready`.
    pub fn ready(config: BridgeConfig) -> Self {
        Self::ready_with(config, MockEngine::new(), MockHost::new())
    }

    /// Like [`Fixture::ready`] with custom doubles.
    pub fn ready_with(config: BridgeConfig, engine: MockEngine, host: MockHost) -> Self {
        let fixture = Self::tuned_with(config, engine, host);
        assert_eq!(
            fixture.bridge.change_state(HostTransition::ReadyToPaused),
            StateChangeReturn::Success
        );
        fixture
    }

    /// Bridge `Configured` but not yet exposed.
    pub fn tuned(config: BridgeConfig) -> Self {
        Self::tuned_with(config, MockEngine::new(), MockHost::new())
    }

    fn tuned_with(config: BridgeConfig, engine: MockEngine, host: MockHost) -> Self {
        init_tracing();
        let engine = Arc::new(engine.with_formats(OutputFormat::MpegTs, OutputFormat::AudioAac));
        let host = Arc::new(host.with_uri(URI));
        let bridge = AampBridge::new(config, host.clone(), engine.clone(), None);
        assert_eq!(
            bridge.change_state(HostTransition::NullToReady),
            StateChangeReturn::Success
        );
        Self {
            bridge,
            engine,
            host,
        }
    }

    pub fn video(&self) -> Arc<RecordingChannel> {
        self.host.channel("video_01").expect("video channel")
    }

    pub fn audio(&self) -> Arc<RecordingChannel> {
        self.host.channel("audio_01").expect("audio channel")
    }

    /// Send a borrowed chunk.
    pub fn send(&self, media_type: MediaType, data: &[u8], pts: f64) -> DispatchOutcome {
        self.bridge
            .sink()
            .send(MediaChunk::borrowed(media_type, data, pts, pts, 0.04))
    }
}

/// Poll `cond` for up to five seconds.
pub fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        if Instant::now() > deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

/// Event names in order.
pub fn names(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(|e| e.name()).collect()
}
