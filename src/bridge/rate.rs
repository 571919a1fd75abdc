//! Playback rate, trick-play audio policy and cross-track flushing.
//!
//! Audio is attached downstream only while the rate is exactly 1.0.
//! Detaching keeps the track's channel and caps, so re-enabling needs no
//! renegotiation; it only re-announces the stream.

use super::state::LifecycleMonitor;
use crate::format::MediaType;
use crate::pad::Host;
use std::sync::{Arc, Mutex, PoisonError};

/// A change of audio attachment made by the rate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioToggle {
    /// Audio channel attached, stream-start pending.
    Enabled,
    /// Audio channel detached.
    Disabled,
}

/// Sole writer of the playback rate.
pub struct RateController {
    element: String,
    monitor: Arc<LifecycleMonitor>,
    host: Arc<dyn Host>,
    // Serializes attach/detach so the host calls run outside the shared lock.
    control: Mutex<()>,
}

impl RateController {
    /// Create a controller over the shared state.
    pub fn new(element: impl Into<String>, monitor: Arc<LifecycleMonitor>, host: Arc<dyn Host>) -> Self {
        Self {
            element: element.into(),
            monitor,
            host,
            control: Mutex::new(()),
        }
    }

    /// Current playback rate.
    pub fn rate(&self) -> f64 {
        self.monitor.lock().rate
    }

    /// Record a new playback rate and re-evaluate audio.
    ///
    /// Returns `false` if the rate was unchanged.
    pub fn set_rate(&self, rate: f64) -> bool {
        let _control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.monitor.lock();
            if state.rate == rate {
                return false;
            }
            tracing::info!(element = %self.element, from = state.rate, to = rate, "playback rate changed");
            state.rate = rate;
        }
        self.apply_audio_policy();
        true
    }

    /// Re-evaluate audio attachment at the current rate.
    pub fn update_audio(&self) -> Option<AudioToggle> {
        let _control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        self.apply_audio_policy()
    }

    /// Schedule a flush and a position reset on every track.
    ///
    /// Idempotent until the next chunk on each track consumes it.
    /// `position_secs` and `rate` are only logged: the segment is based at the
    /// pts of that next chunk and carries the rate current at dispatch.
    pub fn flush_all(&self, position_secs: f64, rate: f64) {
        tracing::debug!(element = %self.element, position_secs, rate, "flush scheduled on all tracks");
        let mut state = self.monitor.lock();
        for track in state.tracks.iter_mut() {
            track.pending.mark_flush();
            track.pending.mark_position_reset();
        }
    }

    fn apply_audio_policy(&self) -> Option<AudioToggle> {
        let (channel, enable) = {
            let mut state = self.monitor.lock();
            let enable = state.rate == 1.0;
            let track = &mut state.tracks[MediaType::Audio];
            let channel = track.channel.clone()?;
            if track.enabled == enable {
                return None;
            }
            // Stop dispatch before the channel leaves the host.
            if !enable {
                track.enabled = false;
            }
            (channel, enable)
        };

        if enable {
            if !channel.set_active(true) {
                tracing::warn!(element = %self.element, channel = %channel.name(), "failed to activate channel");
            }
            if !self.host.add_channel(&channel) {
                tracing::warn!(element = %self.element, channel = %channel.name(), "failed to attach channel");
                channel.set_active(false);
                return None;
            }
            let mut state = self.monitor.lock();
            let track = &mut state.tracks[MediaType::Audio];
            track.enabled = true;
            track.pending.mark_stream_start();
            tracing::info!(element = %self.element, channel = %channel.name(), "audio enabled");
            Some(AudioToggle::Enabled)
        } else {
            if !channel.set_active(false) {
                tracing::warn!(element = %self.element, channel = %channel.name(), "failed to deactivate channel");
            }
            if !self.host.remove_channel(&channel) {
                tracing::warn!(element = %self.element, channel = %channel.name(), "failed to detach channel");
            }
            tracing::info!(element = %self.element, channel = %channel.name(), "audio disabled for trick-play");
            Some(AudioToggle::Disabled)
        }
    }
}
