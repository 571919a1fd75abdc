//! The delivery bridge between the playback engine and the host pipeline.
//!
//! [`AampBridge`] is driven from the host's control thread (state changes,
//! seeks, queries). The engine's own threads talk to it through the
//! [`BridgeSink`] it registers with the engine. All shared state lives in one
//! [`LifecycleMonitor`]; no host or engine call is made while holding it.
//!
//! # Example
//!
//! ```rust
//! use aamp_bridge::prelude::*;
//! use aamp_bridge::testing::{MockEngine, MockHost};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(MockEngine::new().with_formats(OutputFormat::MpegTs, OutputFormat::None));
//! let host = Arc::new(MockHost::new().with_uri("http://example.com/master.m3u8"));
//! let bridge = AampBridge::new(BridgeConfig::default(), host.clone(), engine.clone(), None);
//!
//! assert_eq!(bridge.change_state(HostTransition::NullToReady), StateChangeReturn::Success);
//! assert_eq!(bridge.change_state(HostTransition::ReadyToPaused), StateChangeReturn::Success);
//! assert_eq!(bridge.state(), PipelineState::Ready);
//!
//! let data = vec![0u8; 4096];
//! let outcome = bridge.sink().send(MediaChunk::borrowed(MediaType::Video, &data, 0.0, 0.0, 0.04));
//! assert_eq!(outcome.fragments_pushed, 1);
//! ```

mod dispatcher;
mod listener;
mod rate;
mod scheduler;
mod state;
mod track;

pub use dispatcher::{BufferDispatcher, DispatchOutcome, DropReason};
pub use listener::{BridgeSink, EventBridge};
pub use rate::{AudioToggle, RateController};
pub use scheduler::EventScheduler;
pub use state::{BridgeState, LifecycleMonitor, PipelineState};
pub use track::{PendingEvents, Track, Tracks};

use crate::captions::{CaptionController, ClosedCaptions};
use crate::config::BridgeConfig;
use crate::engine::PlaybackEngine;
use crate::error::{Error, Result};
use crate::event::{Event, FlushStopEvent, SeekEvent, SeekFormat, SeekFlags, SeekType};
use crate::format::{Caps, MediaType, OutputFormat};
use crate::observability::span_bridge;
use crate::pad::{ChannelHandle, Host, PadTemplate};
use crate::query::{self, Query, QueryResponse};
use std::sync::Arc;

// ============================================================================
// Host lifecycle
// ============================================================================

/// State change requested by the host pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostTransition {
    /// Register with the engine and tune.
    NullToReady,
    /// Expose channels downstream.
    ReadyToPaused,
    /// Start playback.
    PausedToPlaying,
    /// Pause playback.
    PlayingToPaused,
    /// Stop the engine.
    PausedToReady,
    /// Unregister from the engine.
    ReadyToNull,
}

/// Result of a host state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChangeReturn {
    /// Transition completed.
    Success,
    /// Transition completed; live content cannot preroll.
    NoPreroll,
    /// Transition failed.
    Failure,
}

// ============================================================================
// Core
// ============================================================================

/// State and components shared by the control side and the engine sink.
pub(crate) struct Core {
    config: BridgeConfig,
    monitor: Arc<LifecycleMonitor>,
    engine: Arc<dyn PlaybackEngine>,
    host: Arc<dyn Host>,
    dispatcher: BufferDispatcher,
    rate: RateController,
    events: EventBridge,
    captions: Option<Arc<CaptionController>>,
}

impl Core {
    fn configure(&self, video: OutputFormat, audio: OutputFormat) -> Result<()> {
        let _span = span_bridge(&self.config.name).entered();
        let current = self.monitor.state();
        if current.is_terminal() {
            return Err(Error::InvalidState {
                from: current,
                to: PipelineState::Configured,
            });
        }
        if current.reached(PipelineState::Configured) {
            self.rate.update_audio();
            return Ok(());
        }
        tracing::info!(element = %self.config.name, video = ?video, audio = ?audio, "configure");

        let mut created: Vec<(MediaType, OutputFormat, Caps, ChannelHandle)> = Vec::new();
        for (media_type, format) in [(MediaType::Video, video), (MediaType::Audio, audio)] {
            let caps = match Caps::for_format(format) {
                Ok(caps) => caps,
                Err(e) => {
                    tracing::debug!(element = %self.config.name, media = %media_type, error = %e, "track stays inert");
                    continue;
                }
            };
            let template = PadTemplate::for_track(media_type);
            let name = template.instance_name(1);
            match self.host.create_channel(&template, &name) {
                Some(channel) => created.push((media_type, format, caps, channel)),
                None => {
                    tracing::warn!(element = %self.config.name, channel = %name, "host refused to create channel");
                }
            }
        }

        let mut state = self.monitor.lock();
        if state.lifecycle.is_terminal() {
            let from = state.lifecycle;
            drop(state);
            for (_, _, _, channel) in created {
                self.host.release_channel(channel);
            }
            return Err(Error::InvalidState {
                from,
                to: PipelineState::Configured,
            });
        }

        let stream_name = created
            .first()
            .map(|(_, _, _, channel)| channel.name().to_string());
        for (media_type, format, caps, channel) in created {
            tracing::debug!(element = %self.config.name, channel = %channel.name(), caps = %caps, "channel created");
            let track = &mut state.tracks[media_type];
            track.format = format;
            track.caps = Some(caps);
            track.channel = Some(channel);
        }
        state.stream_id = match stream_name {
            Some(channel) => format!("{}/{}", self.config.name, channel),
            None => self.config.name.clone(),
        };
        self.monitor
            .transition_locked(&mut state, PipelineState::Configured);
        Ok(())
    }
}

// ============================================================================
// AampBridge
// ============================================================================

/// The delivery bridge element.
pub struct AampBridge {
    core: Arc<Core>,
    sink: BridgeSink,
}

impl AampBridge {
    /// Create a bridge in `Uninitialized`.
    ///
    /// Both tracks start with a position reset pending so the first chunk on
    /// each carries a segment.
    pub fn new(
        config: BridgeConfig,
        host: Arc<dyn Host>,
        engine: Arc<dyn PlaybackEngine>,
        captions: Option<Arc<dyn ClosedCaptions>>,
    ) -> Self {
        let monitor = Arc::new(LifecycleMonitor::new(config.name.clone()));
        {
            let mut state = monitor.lock();
            for track in state.tracks.iter_mut() {
                track.pending.mark_position_reset();
            }
        }

        let captions = captions.map(|c| Arc::new(CaptionController::new(config.name.clone(), c)));
        let core = Arc::new(Core {
            dispatcher: BufferDispatcher::new(&config, Arc::clone(&monitor), Arc::clone(&engine)),
            rate: RateController::new(config.name.clone(), Arc::clone(&monitor), Arc::clone(&host)),
            events: EventBridge::new(config.name.clone(), Arc::clone(&monitor), captions.clone()),
            config,
            monitor,
            engine,
            host,
            captions,
        });
        let sink = BridgeSink::new(Arc::downgrade(&core));
        Self { core, sink }
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.core.config.name
    }

    /// Configuration in use.
    pub fn config(&self) -> &BridgeConfig {
        &self.core.config
    }

    /// Template of the input pad.
    pub fn sink_template(&self) -> PadTemplate {
        self.core.config.sink_template()
    }

    /// Handle for the engine's threads.
    pub fn sink(&self) -> BridgeSink {
        self.sink.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.core.monitor.state()
    }

    /// The shared state monitor.
    pub fn monitor(&self) -> &Arc<LifecycleMonitor> {
        &self.core.monitor
    }

    /// Current playback rate.
    pub fn rate(&self) -> f64 {
        self.core.rate.rate()
    }

    /// Whether the audio channel is attached downstream.
    pub fn audio_enabled(&self) -> bool {
        self.core.monitor.lock().tracks[MediaType::Audio].enabled
    }

    /// Apply a host state change.
    pub fn change_state(&self, transition: HostTransition) -> StateChangeReturn {
        let core = &self.core;
        let _span = span_bridge(&core.config.name).entered();
        tracing::debug!(element = %core.config.name, transition = ?transition, "change state");

        match transition {
            HostTransition::NullToReady => self.start(),
            HostTransition::ReadyToPaused => self.expose_channels(),
            HostTransition::PausedToPlaying => {
                self.start_captions();
                let report = {
                    let mut state = core.monitor.lock();
                    !std::mem::replace(&mut state.tune_reported, true)
                };
                if report {
                    core.engine.log_tune_complete();
                }
                StateChangeReturn::Success
            }
            HostTransition::PlayingToPaused => StateChangeReturn::Success,
            HostTransition::PausedToReady => {
                core.monitor.transition(PipelineState::ShuttingDown);
                core.engine.stop();
                if let Some(captions) = &core.captions {
                    captions.stop();
                }
                StateChangeReturn::Success
            }
            HostTransition::ReadyToNull => {
                core.engine.register_sink(None);
                StateChangeReturn::Success
            }
        }
    }

    fn start(&self) -> StateChangeReturn {
        let core = &self.core;
        let current = core.monitor.state();
        if current.is_terminal() {
            tracing::error!(element = %core.config.name, state = %current, "cannot tune from a terminal state");
            return StateChangeReturn::Failure;
        }
        core.engine.register_sink(Some(self.sink()));

        let Some(uri) = core.host.query_uri() else {
            tracing::error!(element = %core.config.name, error = %Error::NoUri, "cannot tune");
            return StateChangeReturn::Failure;
        };
        if !core.monitor.transition(PipelineState::Tuning) {
            return StateChangeReturn::Failure;
        }
        tracing::info!(element = %core.config.name, uri = %uri, "tuning");
        core.engine.tune(&uri);
        for media_type in MediaType::ALL {
            core.engine.resume_track_downloads(media_type);
        }

        let reached = core.monitor.wait_while(PipelineState::Tuning);
        if reached.reached(PipelineState::Configured) {
            StateChangeReturn::Success
        } else {
            tracing::error!(element = %core.config.name, state = %reached, error = %Error::NotConfigured, "tune did not configure");
            StateChangeReturn::Failure
        }
    }

    fn expose_channels(&self) -> StateChangeReturn {
        let core = &self.core;
        let video = {
            let state = core.monitor.lock();
            let track = &state.tracks[MediaType::Video];
            if track.enabled { None } else { track.channel.clone() }
        };

        if let Some(channel) = video {
            if !channel.set_active(true) {
                tracing::warn!(element = %core.config.name, channel = %channel.name(), "failed to activate channel");
            }
            if core.host.add_channel(&channel) {
                let mut state = core.monitor.lock();
                let track = &mut state.tracks[MediaType::Video];
                track.enabled = true;
                track.pending.mark_stream_start();
            } else {
                tracing::warn!(element = %core.config.name, channel = %channel.name(), "failed to attach channel");
            }
        }
        core.rate.update_audio();

        if !core.monitor.transition(PipelineState::Ready) {
            return StateChangeReturn::Failure;
        }
        core.host.no_more_channels();

        if core.engine.is_live() {
            StateChangeReturn::NoPreroll
        } else {
            StateChangeReturn::Success
        }
    }

    fn start_captions(&self) {
        let core = &self.core;
        let Some(captions) = &core.captions else {
            return;
        };
        if !core.config.captions_enabled {
            tracing::debug!(element = %core.config.name, "captions disabled");
            return;
        }
        let video = core.monitor.lock().tracks[MediaType::Video].channel.clone();
        if let Some(video) = video {
            captions.start(video);
        }
    }

    /// Handle an upstream seek.
    ///
    /// Only time-format seeks are handled, and only once the bridge is
    /// `Ready`. Returns `false` when the seek was not handled.
    pub fn handle_seek(&self, seek: &SeekEvent) -> bool {
        let core = &self.core;
        let _span = span_bridge(&core.config.name).entered();
        if seek.format != SeekFormat::Time {
            tracing::warn!(element = %core.config.name, format = ?seek.format, "seek format not supported");
            return false;
        }

        let channels: Vec<ChannelHandle> = {
            let state = core.monitor.lock();
            if state.lifecycle != PipelineState::Ready {
                tracing::warn!(element = %core.config.name, state = %state.lifecycle, "seek while not ready");
                return false;
            }
            state
                .tracks
                .iter()
                .filter_map(|track| track.active_channel().cloned())
                .collect()
        };
        tracing::info!(element = %core.config.name, rate = seek.rate, start = seek.start, "seek");

        if seek.flags.contains(SeekFlags::FLUSH) {
            for channel in &channels {
                channel.push_event(Event::FlushStart);
                channel.push_event(Event::FlushStop(FlushStopEvent::new(true)));
            }
        }

        core.rate.set_rate(seek.rate);

        match seek.start_type {
            SeekType::None => core.engine.set_rate(seek.rate),
            SeekType::Set => core.engine.set_rate_and_seek(seek.rate, seek.target_secs()),
            SeekType::End => {
                tracing::warn!(element = %core.config.name, "seek type not supported");
            }
        }

        let position = match seek.start_type {
            SeekType::Set => seek.target_secs(),
            _ => core.engine.position_ms() as f64 / 1000.0,
        };
        core.rate.flush_all(position, seek.rate);
        true
    }

    /// Answer a query arriving on an output channel.
    pub fn query(&self, query: &Query) -> Option<QueryResponse> {
        let core = &self.core;
        query::answer(query, &core.engine, |media_type| {
            core.monitor.lock().tracks[media_type].caps.clone()
        })
    }
}

impl Drop for AampBridge {
    fn drop(&mut self) {
        let core = &self.core;
        if let Some(captions) = &core.captions {
            captions.stop();
        }
        let channels: Vec<(bool, ChannelHandle)> = {
            let mut state = core.monitor.lock();
            state
                .tracks
                .iter_mut()
                .filter_map(|track| {
                    let enabled = std::mem::replace(&mut track.enabled, false);
                    track.channel.take().map(|channel| (enabled, channel))
                })
                .collect()
        };
        for (attached, channel) in channels {
            if attached {
                channel.set_active(false);
                core.host.remove_channel(&channel);
            }
            core.host.release_channel(channel);
        }
        core.engine.register_sink(None);
        core.monitor.transition(PipelineState::ShuttingDown);
    }
}
