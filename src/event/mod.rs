//! Control events exchanged with the downstream pipeline.
//!
//! Downstream events travel on an output channel alongside buffers and are
//! what the bridge emits when it applies deferred notifications. Upstream,
//! the host sends [`SeekEvent`]s to reposition or change rate.
//!
//! Stream-start, caps, segment and EOS travel in order with buffers;
//! flush-start and flush-stop overtake them.
//!
//! ```rust
//! use aamp_bridge::clock::ClockTime;
//! use aamp_bridge::event::{Event, SegmentEvent};
//!
//! let event = Event::Segment(SegmentEvent::new_time(ClockTime::from_secs(10)).with_applied_rate(2.0));
//! assert!(event.is_serialized());
//! assert_eq!(event.name(), "segment");
//! ```

use crate::clock::ClockTime;
use crate::format::Caps;

// ============================================================================
// Downstream events
// ============================================================================

/// Events pushed on an output channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Introduces a track downstream.
    StreamStart(StreamStartEvent),

    /// Format of the data that follows.
    Caps(Caps),

    /// New timeline base, sent on a position reset.
    Segment(SegmentEvent),

    /// No more chunks will follow on this channel.
    Eos,

    /// Downstream drops everything queued.
    FlushStart,

    /// Ends a flush.
    FlushStop(FlushStopEvent),
}

impl Event {
    /// Whether the event is ordered with buffers on the channel.
    pub fn is_serialized(&self) -> bool {
        !matches!(self, Event::FlushStart | Event::FlushStop(_))
    }

    /// Flush-start or flush-stop.
    pub fn is_flush(&self) -> bool {
        matches!(self, Event::FlushStart | Event::FlushStop(_))
    }

    /// Short name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StreamStart(_) => "stream-start",
            Event::Caps(_) => "caps",
            Event::Segment(_) => "segment",
            Event::Eos => "eos",
            Event::FlushStart => "flush-start",
            Event::FlushStop(_) => "flush-stop",
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Payload of [`Event::StreamStart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStartEvent {
    /// Identifier shared by every track of the presentation.
    pub stream_id: String,
}

impl StreamStartEvent {
    /// Stream-start for `stream_id`.
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
        }
    }
}

/// Payload of [`Event::Segment`].
///
/// The bridge only emits time segments whose start is the pts of the chunk
/// that follows, with the position reset to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEvent {
    /// Base time, the pts of the next chunk.
    pub start: ClockTime,
    /// Always `NONE` here.
    pub stop: ClockTime,
    /// Reset to zero.
    pub position: ClockTime,
    /// Rate downstream should play at; the engine already applied trick-play.
    pub rate: f64,
    /// Playback rate the engine produced the data at.
    pub applied_rate: f64,
}

impl SegmentEvent {
    /// Time segment based at `start`.
    pub fn new_time(start: ClockTime) -> Self {
        Self {
            start,
            stop: ClockTime::NONE,
            position: ClockTime::ZERO,
            rate: 1.0,
            applied_rate: 1.0,
        }
    }

    /// With the engine's playback rate.
    pub fn with_applied_rate(mut self, applied_rate: f64) -> Self {
        self.applied_rate = applied_rate;
        self
    }
}

impl Default for SegmentEvent {
    fn default() -> Self {
        Self::new_time(ClockTime::ZERO)
    }
}

/// Payload of [`Event::FlushStop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushStopEvent {
    /// Whether downstream restarts its running time. Seeks set it, deferred
    /// flushes do not.
    pub reset_time: bool,
}

impl FlushStopEvent {
    /// Flush-stop, restarting running time if `reset_time`.
    pub fn new(reset_time: bool) -> Self {
        Self { reset_time }
    }
}

impl Default for FlushStopEvent {
    fn default() -> Self {
        Self { reset_time: true }
    }
}

// ============================================================================
// Upstream seek
// ============================================================================

/// Reposition or rate change requested by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekEvent {
    /// Requested playback rate; negative for reverse.
    pub rate: f64,
    /// Unit of `start` and `stop`. Only time is handled.
    pub format: SeekFormat,
    /// Only [`SeekFlags::FLUSH`] changes behavior.
    pub flags: SeekFlags,
    /// How `start` is interpreted.
    pub start_type: SeekType,
    /// Start position (nanoseconds for time seeks).
    pub start: i64,
    /// How `stop` is interpreted.
    pub stop_type: SeekType,
    /// Stop position (nanoseconds for time seeks, -1 for none).
    pub stop: i64,
}

impl SeekEvent {
    /// Create a flushing time seek to an absolute position.
    pub fn new_time(position: ClockTime) -> Self {
        Self {
            rate: 1.0,
            format: SeekFormat::Time,
            flags: SeekFlags::FLUSH,
            start_type: SeekType::Set,
            start: position.nanos() as i64,
            stop_type: SeekType::None,
            stop: -1,
        }
    }

    /// Create a rate change that keeps the current position.
    pub fn rate_only(rate: f64) -> Self {
        Self {
            rate,
            format: SeekFormat::Time,
            flags: SeekFlags::NONE,
            start_type: SeekType::None,
            start: 0,
            stop_type: SeekType::None,
            stop: -1,
        }
    }

    /// With a rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// With flags.
    pub fn with_flags(mut self, flags: SeekFlags) -> Self {
        self.flags = flags;
        self
    }

    /// With a stop position, the target of reverse seeks.
    pub fn with_stop(mut self, stop_type: SeekType, stop: i64) -> Self {
        self.stop_type = stop_type;
        self.stop = stop;
        self
    }

    /// With a position unit.
    pub fn with_format(mut self, format: SeekFormat) -> Self {
        self.format = format;
        self
    }

    /// Target position in seconds for a `Set` seek.
    ///
    /// Reverse playback seeks toward the stop position.
    pub fn target_secs(&self) -> f64 {
        let ns = if self.rate < 0.0 { self.stop } else { self.start };
        ns as f64 / ClockTime::SECOND as f64
    }
}

/// Unit of seek positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeekFormat {
    /// Nanoseconds.
    #[default]
    Time,
    /// Bytes.
    Bytes,
    /// Host default unit.
    Default,
}

/// How a seek position is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeekType {
    /// Keep the current position.
    #[default]
    None,
    /// Absolute.
    Set,
    /// From the end; not supported by the engine.
    End,
}

/// Seek flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeekFlags(u32);

impl SeekFlags {
    /// None.
    pub const NONE: Self = Self(0);
    /// Flush downstream before repositioning.
    pub const FLUSH: Self = Self(1 << 0);
    /// Exact position.
    pub const ACCURATE: Self = Self(1 << 1);
    /// Nearest keyframe.
    pub const KEY_UNIT: Self = Self(1 << 2);

    /// No flag set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Every flag of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Both sets combined.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}
