//! Per-track state: output channel, negotiated caps and pending events.

use crate::format::{Caps, MediaType, OutputFormat};
use crate::pad::ChannelHandle;
use std::fmt;
use std::ops::{Index, IndexMut};

// ============================================================================
// PendingEvents
// ============================================================================

/// Control notifications deferred until the next chunk on a track.
///
/// Every setter is idempotent. The set is consumed as a whole through
/// [`take`](Self::take) so a partially applied batch is never observed as
/// still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingEvents {
    /// Stream-start (followed by caps) must be announced.
    pub stream_start: bool,
    /// A flush-start/flush-stop pair must be sent.
    pub flush: bool,
    /// A new segment must be sent at the next chunk's pts.
    pub position_reset: bool,
    /// At least one of the above is set.
    pub pending: bool,
}

impl PendingEvents {
    /// Schedule a stream-start announcement.
    pub fn mark_stream_start(&mut self) {
        self.stream_start = true;
        self.pending = true;
    }

    /// Schedule a flush.
    pub fn mark_flush(&mut self) {
        self.flush = true;
        self.pending = true;
    }

    /// Schedule a position reset.
    pub fn mark_position_reset(&mut self) {
        self.position_reset = true;
        self.pending = true;
    }

    /// Whether anything is pending.
    pub fn any_pending(&self) -> bool {
        self.pending
    }

    /// Snapshot the set and clear it.
    pub fn take(&mut self) -> PendingEvents {
        std::mem::take(self)
    }
}

// ============================================================================
// Track
// ============================================================================

/// One elementary stream and its output channel.
///
/// A track whose format was never negotiated has no channel and stays inert.
pub struct Track {
    media_type: MediaType,
    /// Negotiated output format.
    pub format: OutputFormat,
    /// Caps derived from the format.
    pub caps: Option<Caps>,
    /// Channel owned by this track until teardown.
    pub channel: Option<ChannelHandle>,
    /// Whether the channel is attached downstream.
    pub enabled: bool,
    /// Deferred control notifications.
    pub pending: PendingEvents,
}

impl Track {
    /// Create an inert track.
    pub fn new(media_type: MediaType) -> Self {
        Self {
            media_type,
            format: OutputFormat::None,
            caps: None,
            channel: None,
            enabled: false,
            pending: PendingEvents::default(),
        }
    }

    /// Media type carried by this track.
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Whether the track owns a channel.
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Channel to push on, if the track is attached downstream.
    pub fn active_channel(&self) -> Option<&ChannelHandle> {
        if self.enabled { self.channel.as_ref() } else { None }
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("media_type", &self.media_type)
            .field("format", &self.format)
            .field("channel", &self.channel.as_ref().map(|c| c.name().to_string()))
            .field("enabled", &self.enabled)
            .field("pending", &self.pending)
            .finish()
    }
}

/// The video and audio tracks, indexed by [`MediaType`].
#[derive(Debug)]
pub struct Tracks([Track; 2]);

impl Tracks {
    /// Both tracks inert.
    pub fn new() -> Self {
        Self([Track::new(MediaType::Video), Track::new(MediaType::Audio)])
    }

    /// Iterate over both tracks in media-type order.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.0.iter()
    }

    /// Iterate mutably over both tracks.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.0.iter_mut()
    }
}

impl Default for Tracks {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<MediaType> for Tracks {
    type Output = Track;

    fn index(&self, media_type: MediaType) -> &Track {
        &self.0[media_type.index()]
    }
}

impl IndexMut<MediaType> for Tracks {
    fn index_mut(&mut self, media_type: MediaType) -> &mut Track {
        &mut self.0[media_type.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_idempotent() {
        let mut pending = PendingEvents::default();
        assert!(!pending.any_pending());

        pending.mark_flush();
        pending.mark_flush();
        pending.mark_position_reset();
        assert!(pending.any_pending());

        let taken = pending.take();
        assert!(taken.flush);
        assert!(taken.position_reset);
        assert!(!taken.stream_start);
        assert_eq!(pending, PendingEvents::default());
    }

    #[test]
    fn test_tracks_indexing() {
        let mut tracks = Tracks::new();
        assert_eq!(tracks[MediaType::Video].media_type(), MediaType::Video);
        assert_eq!(tracks[MediaType::Audio].media_type(), MediaType::Audio);

        tracks[MediaType::Audio].pending.mark_stream_start();
        assert!(tracks[MediaType::Audio].pending.stream_start);
        assert!(!tracks[MediaType::Video].pending.any_pending());
        assert_eq!(tracks.iter().count(), 2);
    }

    #[test]
    fn test_inert_track() {
        let track = Track::new(MediaType::Video);
        assert!(!track.has_channel());
        assert!(track.active_channel().is_none());
        assert_eq!(track.format, OutputFormat::None);
    }
}
