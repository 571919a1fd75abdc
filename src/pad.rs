//! Output channels and the host that owns them.
//!
//! An output channel is the downstream-facing connection point for one
//! track, the equivalent of a source pad. The bridge never assumes a host
//! object model: channels are opaque [`OutputChannel`] trait objects created
//! and attached through the [`Host`] collaborator.

use crate::buffer::Buffer;
use crate::event::Event;
use crate::format::{Caps, MediaType, audio_template_caps, video_template_caps};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared handle to an output channel.
pub type ChannelHandle = Arc<dyn OutputChannel>;

/// Opaque handle to the video decoder behind a channel's peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderHandle(pub u64);

/// Reason a push on an output channel was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The channel is flushing or inactive.
    #[error("flushing")]
    Flushing,
    /// The channel has no downstream peer.
    #[error("not-linked")]
    NotLinked,
    /// Downstream already reached end of stream.
    #[error("eos")]
    Eos,
    /// Downstream reported an error.
    #[error("error: {0}")]
    Error(String),
}

/// Downstream-facing output channel for one track.
///
/// Implementations must be safe to call from the engine's delivery threads
/// and the host's control thread concurrently.
pub trait OutputChannel: Send + Sync {
    /// Channel name (e.g. `video_01`).
    fn name(&self) -> &str;

    /// Push a control event. Returns `false` if downstream rejected it.
    fn push_event(&self, event: Event) -> bool;

    /// Push a data buffer.
    fn push(&self, buffer: Buffer) -> Result<(), FlowError>;

    /// Activate or deactivate the channel. Returns `false` on failure.
    fn set_active(&self, active: bool) -> bool;

    /// Ask the downstream peer for its video decoder handle.
    fn peer_decoder_handle(&self) -> Option<DecoderHandle> {
        None
    }
}

/// The pipeline that hosts the bridge.
///
/// Owns attachment of output channels and answers upstream URI discovery.
pub trait Host: Send + Sync {
    /// URI of the content to play, discovered from upstream.
    fn query_uri(&self) -> Option<String>;

    /// Create a channel from a template once a format is known.
    fn create_channel(&self, template: &PadTemplate, name: &str) -> Option<ChannelHandle>;

    /// Expose a channel to downstream. Returns `false` on failure.
    fn add_channel(&self, channel: &ChannelHandle) -> bool;

    /// Withdraw a channel from downstream. Returns `false` on failure.
    fn remove_channel(&self, channel: &ChannelHandle) -> bool;

    /// No further channels will be added for this presentation.
    fn no_more_channels(&self);

    /// Hand a channel back at teardown.
    fn release_channel(&self, _channel: ChannelHandle) {}
}

/// Direction of a pad (input or output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// An input pad (receives data from upstream).
    Input,
    /// An output pad (sends data downstream).
    Output,
}

/// Whether a pad is always present or created dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadPresence {
    /// Pad is always present on the element.
    Always,
    /// Pad is created once the stream format is known.
    Sometimes,
}

/// Template for creating pads.
#[derive(Debug, Clone)]
pub struct PadTemplate {
    /// Name pattern for this pad (e.g. `video_%02x`).
    pub name: String,
    /// Direction of this pad.
    pub direction: PadDirection,
    /// Whether this pad is always present or created on demand.
    pub presence: PadPresence,
    /// Caps the pad may carry.
    pub caps: Vec<Caps>,
}

impl PadTemplate {
    /// Create a new pad template.
    pub fn new(
        name: impl Into<String>,
        direction: PadDirection,
        presence: PadPresence,
        caps: Vec<Caps>,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            presence,
            caps,
        }
    }

    /// Template for the always-present input pad.
    pub fn sink(caps: Vec<Caps>) -> Self {
        Self::new("sink", PadDirection::Input, PadPresence::Always, caps)
    }

    /// Template for the dynamically created output pad of a track.
    pub fn for_track(media_type: MediaType) -> Self {
        match media_type {
            MediaType::Video => Self::new(
                "video_%02x",
                PadDirection::Output,
                PadPresence::Sometimes,
                video_template_caps(),
            ),
            MediaType::Audio => Self::new(
                "audio_%02x",
                PadDirection::Output,
                PadPresence::Sometimes,
                audio_template_caps(),
            ),
        }
    }

    /// Expand the name pattern for instance `index`.
    pub fn instance_name(&self, index: u32) -> String {
        match self.name.strip_suffix("%02x") {
            Some(prefix) => format!("{}{:02x}", prefix, index),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for PadTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.direction, self.presence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_templates() {
        let video = PadTemplate::for_track(MediaType::Video);
        assert_eq!(video.direction, PadDirection::Output);
        assert_eq!(video.presence, PadPresence::Sometimes);
        assert_eq!(video.instance_name(1), "video_01");
        assert_eq!(video.caps[0].media_type(), "video/mpegts");

        let audio = PadTemplate::for_track(MediaType::Audio);
        assert_eq!(audio.instance_name(0x1a), "audio_1a");
        assert_eq!(audio.caps.len(), 4);
    }

    #[test]
    fn test_sink_template() {
        let sink = PadTemplate::sink(vec![Caps::new("application/x-aamp")]);
        assert_eq!(sink.direction, PadDirection::Input);
        assert_eq!(sink.presence, PadPresence::Always);
        assert_eq!(sink.instance_name(1), "sink");
    }

    #[test]
    fn test_flow_error_display() {
        assert_eq!(FlowError::Flushing.to_string(), "flushing");
        assert_eq!(FlowError::Error("boom".into()).to_string(), "error: boom");
    }
}
