//! The adaptive playback engine, consumed at its interface.
//!
//! The engine downloads, decrypts and demuxes on its own threads. The bridge
//! only drives it (tune, rate, seek, stop), polls its download gate, and
//! receives chunks and notifications through a registered
//! [`BridgeSink`](crate::bridge::BridgeSink).

use crate::bridge::BridgeSink;
use crate::format::MediaType;

/// Asynchronous notifications raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Tune completed.
    Tuned,
    /// Tune failed; no format will be negotiated.
    TuneFailed {
        /// Engine-provided description.
        reason: String,
    },
    /// All tracks reached end of stream.
    Eos,
    /// Playback speed changed.
    SpeedChanged {
        /// New playback rate.
        rate: f64,
    },
    /// The playlist was indexed.
    PlaylistIndexed,
    /// Periodic progress report.
    Progress {
        /// Current position in milliseconds.
        position_ms: i64,
        /// Duration in milliseconds.
        duration_ms: i64,
    },
    /// Timed metadata found in the stream.
    TimedMetadata {
        /// Metadata tag name.
        name: String,
        /// Metadata content.
        content: String,
    },
    /// An event code this bridge does not know about.
    Unknown(u32),
}

impl EngineEvent {
    /// Get a human-readable name for this event type.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Tuned => "tuned",
            EngineEvent::TuneFailed { .. } => "tune-failed",
            EngineEvent::Eos => "eos",
            EngineEvent::SpeedChanged { .. } => "speed-changed",
            EngineEvent::PlaylistIndexed => "playlist-indexed",
            EngineEvent::Progress { .. } => "progress",
            EngineEvent::TimedMetadata { .. } => "timed-metadata",
            EngineEvent::Unknown(_) => "unknown",
        }
    }
}

/// Control surface of the playback engine.
pub trait PlaybackEngine: Send + Sync {
    /// Register (or with `None`, unregister) the sink receiving chunks and
    /// notifications.
    fn register_sink(&self, sink: Option<BridgeSink>);

    /// Start tuning to `uri`. Completion is reported asynchronously.
    fn tune(&self, uri: &str);

    /// Change playback rate at the current position.
    fn set_rate(&self, rate: f64);

    /// Change playback rate and seek.
    fn set_rate_and_seek(&self, rate: f64, position_secs: f64);

    /// Stop playback and downloads.
    fn stop(&self);

    /// Download gate for one track; dispatch only forwards while open.
    fn downloads_enabled(&self, media_type: MediaType) -> bool;

    /// Re-open the download gate for a track.
    fn resume_track_downloads(&self, media_type: MediaType);

    /// Current position in milliseconds.
    fn position_ms(&self) -> i64;

    /// Duration in milliseconds.
    fn duration_ms(&self) -> i64;

    /// Whether the content is live.
    fn is_live(&self) -> bool;

    /// Tune has completed and the pipeline is playing.
    fn log_tune_complete(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(EngineEvent::Tuned.name(), "tuned");
        assert_eq!(
            EngineEvent::TuneFailed {
                reason: "404".into()
            }
            .name(),
            "tune-failed"
        );
        assert_eq!(EngineEvent::SpeedChanged { rate: 2.0 }.name(), "speed-changed");
        assert_eq!(EngineEvent::Unknown(99).name(), "unknown");
    }
}
