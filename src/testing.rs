//! Test doubles for the bridge's collaborators.
//!
//! [`RecordingChannel`] records everything pushed on it, [`MockEngine`]
//! stands in for the playback engine, [`MockHost`] for the host pipeline and
//! [`MockCaptions`] for the caption renderer. All are thread-safe and meant
//! to be shared through `Arc`.

use crate::bridge::BridgeSink;
use crate::buffer::Buffer;
use crate::captions::ClosedCaptions;
use crate::engine::{EngineEvent, PlaybackEngine};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::format::{MediaType, OutputFormat};
use crate::pad::{ChannelHandle, DecoderHandle, FlowError, Host, OutputChannel, PadTemplate};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// RecordingChannel
// ============================================================================

/// Something pushed on a [`RecordingChannel`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    /// A control event.
    Event(Event),
    /// A data buffer.
    Buffer(Buffer),
}

/// Output channel that records every event and buffer.
pub struct RecordingChannel {
    name: String,
    items: Mutex<Vec<Recorded>>,
    pushes: AtomicUsize,
    fail_after: Option<usize>,
    reject_events: bool,
    decoder: Option<DecoderHandle>,
    active: AtomicBool,
}

impl RecordingChannel {
    /// Create a channel accepting everything.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(Vec::new()),
            pushes: AtomicUsize::new(0),
            fail_after: None,
            reject_events: false,
            decoder: None,
            active: AtomicBool::new(false),
        }
    }

    /// Reject every buffer push after the first `n` with `Flushing`.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Reject every event.
    pub fn reject_events(mut self) -> Self {
        self.reject_events = true;
        self
    }

    /// Answer decoder handle queries with `handle`.
    pub fn with_decoder(mut self, handle: DecoderHandle) -> Self {
        self.decoder = Some(handle);
        self
    }

    /// Everything recorded so far.
    pub fn items(&self) -> Vec<Recorded> {
        lock(&self.items).clone()
    }

    /// Recorded events.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.items)
            .iter()
            .filter_map(|item| match item {
                Recorded::Event(e) => Some(e.clone()),
                Recorded::Buffer(_) => None,
            })
            .collect()
    }

    /// Recorded buffers.
    pub fn buffers(&self) -> Vec<Buffer> {
        lock(&self.items)
            .iter()
            .filter_map(|item| match item {
                Recorded::Buffer(b) => Some(b.clone()),
                Recorded::Event(_) => None,
            })
            .collect()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        lock(&self.items).clear();
    }

    /// Whether the channel was last activated.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl OutputChannel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn push_event(&self, event: Event) -> bool {
        if self.reject_events {
            return false;
        }
        lock(&self.items).push(Recorded::Event(event));
        true
    }

    fn push(&self, buffer: Buffer) -> std::result::Result<(), FlowError> {
        let n = self.pushes.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| n >= limit) {
            return Err(FlowError::Flushing);
        }
        lock(&self.items).push(Recorded::Buffer(buffer));
        Ok(())
    }

    fn set_active(&self, active: bool) -> bool {
        self.active.store(active, Ordering::SeqCst);
        true
    }

    fn peer_decoder_handle(&self) -> Option<DecoderHandle> {
        self.decoder
    }
}

// ============================================================================
// MockEngine
// ============================================================================

/// A call made on a [`MockEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `register_sink`, with whether a sink was given.
    RegisterSink(bool),
    /// `tune`.
    Tune(String),
    /// `set_rate`.
    SetRate(f64),
    /// `set_rate_and_seek`.
    SetRateAndSeek(f64, f64),
    /// `stop`.
    Stop,
    /// `resume_track_downloads`.
    ResumeDownloads(MediaType),
    /// `log_tune_complete`.
    TuneComplete,
}

/// Scriptable playback engine.
///
/// On `tune` it either reports the configured formats through the
/// registered sink, reports a tune failure, or does nothing.
pub struct MockEngine {
    sink: Mutex<Option<BridgeSink>>,
    calls: Mutex<Vec<EngineCall>>,
    downloads: [AtomicBool; 2],
    gate_budget: Mutex<Option<usize>>,
    position_ms: AtomicI64,
    duration_ms: AtomicI64,
    formats: Option<(OutputFormat, OutputFormat)>,
    fail_tune: bool,
    live: bool,
}

impl MockEngine {
    /// Engine with downloads enabled that does nothing on tune.
    pub fn new() -> Self {
        Self {
            sink: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            downloads: [AtomicBool::new(true), AtomicBool::new(true)],
            gate_budget: Mutex::new(None),
            position_ms: AtomicI64::new(0),
            duration_ms: AtomicI64::new(0),
            formats: None,
            fail_tune: false,
            live: false,
        }
    }

    /// Report these formats when tuned.
    pub fn with_formats(mut self, video: OutputFormat, audio: OutputFormat) -> Self {
        self.formats = Some((video, audio));
        self
    }

    /// Report a tune failure when tuned.
    pub fn failing_tune(mut self) -> Self {
        self.fail_tune = true;
        self
    }

    /// Report live content.
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    /// Open or close the download gate for both tracks.
    pub fn set_downloads_enabled(&self, enabled: bool) {
        for gate in &self.downloads {
            gate.store(enabled, Ordering::SeqCst);
        }
    }

    /// Close the gate after it has answered `true` `n` more times.
    pub fn disable_downloads_after(&self, n: usize) {
        *lock(&self.gate_budget) = Some(n);
    }

    /// Set the reported position.
    pub fn set_position_ms(&self, ms: i64) {
        self.position_ms.store(ms, Ordering::SeqCst);
    }

    /// Set the reported duration.
    pub fn set_duration_ms(&self, ms: i64) {
        self.duration_ms.store(ms, Ordering::SeqCst);
    }

    /// The sink registered by the bridge.
    pub fn registered_sink(&self) -> Option<BridgeSink> {
        lock(&self.sink).clone()
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    /// `(rate, position_secs)` of every `set_rate_and_seek` call.
    pub fn seeks(&self) -> Vec<(f64, f64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::SetRateAndSeek(rate, pos) => Some((rate, pos)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        lock(&self.calls).push(call);
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine for MockEngine {
    fn register_sink(&self, sink: Option<BridgeSink>) {
        self.record(EngineCall::RegisterSink(sink.is_some()));
        *lock(&self.sink) = sink;
    }

    fn tune(&self, uri: &str) {
        self.record(EngineCall::Tune(uri.to_string()));
        let Some(sink) = self.registered_sink() else {
            return;
        };
        if self.fail_tune {
            sink.on_event(EngineEvent::TuneFailed {
                reason: "mock tune failure".into(),
            });
        } else if let Some((video, audio)) = self.formats {
            if let Err(e) = sink.configure(video, audio) {
                tracing::warn!(error = %e, "mock engine configure failed");
            }
            sink.on_event(EngineEvent::Tuned);
        }
    }

    fn set_rate(&self, rate: f64) {
        self.record(EngineCall::SetRate(rate));
    }

    fn set_rate_and_seek(&self, rate: f64, position_secs: f64) {
        self.record(EngineCall::SetRateAndSeek(rate, position_secs));
    }

    fn stop(&self) {
        self.record(EngineCall::Stop);
    }

    fn downloads_enabled(&self, media_type: MediaType) -> bool {
        let mut budget = lock(&self.gate_budget);
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                self.set_downloads_enabled(false);
                *budget = None;
            } else {
                *remaining -= 1;
            }
        }
        self.downloads[media_type.index()].load(Ordering::SeqCst)
    }

    fn resume_track_downloads(&self, media_type: MediaType) {
        self.record(EngineCall::ResumeDownloads(media_type));
        self.downloads[media_type.index()].store(true, Ordering::SeqCst);
    }

    fn position_ms(&self) -> i64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    fn duration_ms(&self) -> i64 {
        self.duration_ms.load(Ordering::SeqCst)
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn log_tune_complete(&self) {
        self.record(EngineCall::TuneComplete);
    }
}

// ============================================================================
// MockHost
// ============================================================================

#[derive(Default)]
struct HostLog {
    created: Vec<String>,
    attached: Vec<String>,
    detached: Vec<String>,
    released: Vec<String>,
    no_more_channels: usize,
}

/// Host pipeline that creates [`RecordingChannel`]s and records attachment.
pub struct MockHost {
    uri: Option<String>,
    decoder: Option<DecoderHandle>,
    channels: Mutex<Vec<Arc<RecordingChannel>>>,
    log: Mutex<HostLog>,
}

impl MockHost {
    /// Host without a URI.
    pub fn new() -> Self {
        Self {
            uri: None,
            decoder: None,
            channels: Mutex::new(Vec::new()),
            log: Mutex::new(HostLog::default()),
        }
    }

    /// Answer URI queries with `uri`.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Give every created channel a decoder behind it.
    pub fn with_decoder(mut self, handle: DecoderHandle) -> Self {
        self.decoder = Some(handle);
        self
    }

    /// A channel created by this host, by name.
    pub fn channel(&self, name: &str) -> Option<Arc<RecordingChannel>> {
        lock(&self.channels)
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Names of created channels.
    pub fn created(&self) -> Vec<String> {
        lock(&self.log).created.clone()
    }

    /// Names of attached channels, one entry per attach.
    pub fn attached(&self) -> Vec<String> {
        lock(&self.log).attached.clone()
    }

    /// Names of detached channels, one entry per detach.
    pub fn detached(&self) -> Vec<String> {
        lock(&self.log).detached.clone()
    }

    /// Names of channels released at teardown.
    pub fn released(&self) -> Vec<String> {
        lock(&self.log).released.clone()
    }

    /// How many times no-more-channels was announced.
    pub fn no_more_channels_count(&self) -> usize {
        lock(&self.log).no_more_channels
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MockHost {
    fn query_uri(&self) -> Option<String> {
        self.uri.clone()
    }

    fn create_channel(&self, _template: &PadTemplate, name: &str) -> Option<ChannelHandle> {
        let mut channel = RecordingChannel::new(name);
        if let Some(handle) = self.decoder {
            channel = channel.with_decoder(handle);
        }
        let channel = Arc::new(channel);
        lock(&self.channels).push(Arc::clone(&channel));
        lock(&self.log).created.push(name.to_string());
        Some(channel)
    }

    fn add_channel(&self, channel: &ChannelHandle) -> bool {
        lock(&self.log).attached.push(channel.name().to_string());
        true
    }

    fn remove_channel(&self, channel: &ChannelHandle) -> bool {
        lock(&self.log).detached.push(channel.name().to_string());
        true
    }

    fn no_more_channels(&self) {
        lock(&self.log).no_more_channels += 1;
    }

    fn release_channel(&self, channel: ChannelHandle) {
        lock(&self.log).released.push(channel.name().to_string());
    }
}

// ============================================================================
// MockCaptions
// ============================================================================

/// A call made on [`MockCaptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionCall {
    /// `start`.
    Start(DecoderHandle),
    /// `show`.
    Show,
    /// `hide`.
    Hide,
    /// `stop`.
    Stop,
}

/// Caption renderer that records calls.
#[derive(Default)]
pub struct MockCaptions {
    calls: Mutex<Vec<CaptionCall>>,
    fail_start: bool,
}

impl MockCaptions {
    /// Renderer that starts successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `start`.
    pub fn failing(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<CaptionCall> {
        lock(&self.calls).clone()
    }
}

impl ClosedCaptions for MockCaptions {
    fn start(&self, decoder: DecoderHandle) -> Result<()> {
        lock(&self.calls).push(CaptionCall::Start(decoder));
        if self.fail_start {
            return Err(Error::CaptionStart("mock failure".into()));
        }
        Ok(())
    }

    fn show(&self) {
        lock(&self.calls).push(CaptionCall::Show);
    }

    fn hide(&self) {
        lock(&self.calls).push(CaptionCall::Hide);
    }

    fn stop(&self) {
        lock(&self.calls).push(CaptionCall::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_channel_fail_after() {
        let channel = RecordingChannel::new("video_01").fail_after(2);
        assert!(channel.push(Buffer::new(bytes::Bytes::from_static(b"a"), Default::default())).is_ok());
        assert!(channel.push(Buffer::new(bytes::Bytes::from_static(b"b"), Default::default())).is_ok());
        assert_eq!(
            channel.push(Buffer::new(bytes::Bytes::from_static(b"c"), Default::default())),
            Err(FlowError::Flushing)
        );
        assert_eq!(channel.buffers().len(), 2);
    }

    #[test]
    fn test_mock_engine_gate_budget() {
        let engine = MockEngine::new();
        engine.disable_downloads_after(2);
        assert!(engine.downloads_enabled(MediaType::Video));
        assert!(engine.downloads_enabled(MediaType::Video));
        assert!(!engine.downloads_enabled(MediaType::Video));
        assert!(!engine.downloads_enabled(MediaType::Audio));

        engine.resume_track_downloads(MediaType::Video);
        assert!(engine.downloads_enabled(MediaType::Video));
    }
}
