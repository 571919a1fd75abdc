//! Engine-facing entry points.
//!
//! [`EventBridge`] reacts to asynchronous engine notifications and
//! [`BridgeSink`] is the handle the engine's threads call to deliver chunks,
//! report formats and schedule discontinuities.

use super::Core;
use super::dispatcher::{DispatchOutcome, DropReason};
use super::state::{LifecycleMonitor, PipelineState};
use crate::buffer::{ChunkPayload, MediaChunk};
use crate::captions::CaptionController;
use crate::engine::EngineEvent;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::format::{MediaType, OutputFormat};
use crate::pad::ChannelHandle;
use bytes::BytesMut;
use std::fmt;
use std::sync::{Arc, Weak};

// ============================================================================
// EventBridge
// ============================================================================

/// Applies engine notifications to the shared state and channels.
pub struct EventBridge {
    element: String,
    monitor: Arc<LifecycleMonitor>,
    captions: Option<Arc<CaptionController>>,
}

impl EventBridge {
    /// Create an event bridge over the shared state.
    pub fn new(
        element: impl Into<String>,
        monitor: Arc<LifecycleMonitor>,
        captions: Option<Arc<CaptionController>>,
    ) -> Self {
        Self {
            element: element.into(),
            monitor,
            captions,
        }
    }

    /// Handle one engine notification.
    pub fn on_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Tuned => {
                tracing::info!(element = %self.element, "tuned");
            }
            EngineEvent::TuneFailed { reason } => {
                tracing::error!(element = %self.element, reason = %reason, "tune failed");
                self.monitor.transition(PipelineState::Error);
            }
            EngineEvent::Eos => self.eos(),
            EngineEvent::SpeedChanged { rate } => {
                tracing::info!(element = %self.element, rate, "speed changed");
                if let Some(captions) = &self.captions {
                    captions.on_speed_changed(rate);
                }
            }
            EngineEvent::PlaylistIndexed => {
                tracing::info!(element = %self.element, "playlist indexed");
            }
            EngineEvent::Progress {
                position_ms,
                duration_ms,
            } => {
                tracing::info!(element = %self.element, position_ms, duration_ms, "progress");
            }
            EngineEvent::TimedMetadata { name, content } => {
                tracing::info!(element = %self.element, name = %name, content = %content, "timed metadata");
            }
            EngineEvent::Unknown(code) => {
                tracing::debug!(element = %self.element, code, "unknown engine event");
            }
        }
    }

    /// End of stream on every enabled track.
    pub fn eos(&self) {
        let channels: Vec<ChannelHandle> = {
            let state = self.monitor.lock();
            state
                .tracks
                .iter()
                .filter_map(|track| track.active_channel().cloned())
                .collect()
        };
        for channel in channels {
            self.push_eos(&channel);
        }
    }

    /// End of stream on one track.
    pub fn end_of_stream_reached(&self, media_type: MediaType) {
        let channel = self.monitor.lock().tracks[media_type].active_channel().cloned();
        if let Some(channel) = channel {
            self.push_eos(&channel);
        }
    }

    fn push_eos(&self, channel: &ChannelHandle) {
        if !channel.push_event(Event::Eos) {
            tracing::error!(element = %self.element, channel = %channel.name(), "send EOS failed");
        }
    }
}

// ============================================================================
// BridgeSink
// ============================================================================

/// Handle registered with the engine.
///
/// Cheap to clone and safe to call from any engine thread. It does not keep
/// the bridge alive: once the bridge is dropped every call is a no-op.
#[derive(Clone)]
pub struct BridgeSink {
    core: Weak<Core>,
}

impl BridgeSink {
    pub(super) fn new(core: Weak<Core>) -> Self {
        Self { core }
    }

    /// Whether the bridge behind this handle still exists.
    pub fn is_attached(&self) -> bool {
        self.core.strong_count() > 0
    }

    /// Report the negotiated output formats.
    ///
    /// The first call creates the channels and moves the bridge to
    /// `Configured`; later calls only re-evaluate audio attachment.
    pub fn configure(&self, video: OutputFormat, audio: OutputFormat) -> Result<()> {
        match self.core.upgrade() {
            Some(core) => core.configure(video, audio),
            None => Err(Error::NotConfigured),
        }
    }

    /// Deliver a chunk.
    pub fn send(&self, chunk: MediaChunk<'_>) -> DispatchOutcome {
        match self.core.upgrade() {
            Some(core) => core.dispatcher.dispatch(chunk),
            None => {
                if let ChunkPayload::Transferred(buf) = chunk.payload {
                    *buf = BytesMut::new();
                }
                DispatchOutcome {
                    dropped: Some(DropReason::Terminal),
                    ..DispatchOutcome::default()
                }
            }
        }
    }

    /// Schedule a position reset on one track.
    pub fn discontinuity(&self, media_type: MediaType) {
        if let Some(core) = self.core.upgrade() {
            core.monitor.lock().tracks[media_type]
                .pending
                .mark_position_reset();
        }
    }

    /// Schedule a flush and position reset on every track.
    pub fn flush(&self, position_secs: f64, rate: f64) {
        if let Some(core) = self.core.upgrade() {
            core.rate.flush_all(position_secs, rate);
        }
    }

    /// End of stream on one track.
    pub fn end_of_stream_reached(&self, media_type: MediaType) {
        if let Some(core) = self.core.upgrade() {
            core.events.end_of_stream_reached(media_type);
        }
    }

    /// End of stream on every enabled track.
    pub fn eos(&self) {
        if let Some(core) = self.core.upgrade() {
            core.events.eos();
        }
    }

    /// Deliver an engine notification.
    pub fn on_event(&self, event: EngineEvent) {
        if let Some(core) = self.core.upgrade() {
            core.events.on_event(event);
        }
    }
}

impl fmt::Debug for BridgeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}
