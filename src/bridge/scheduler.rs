//! Application of deferred control events ahead of a chunk.
//!
//! The order is fixed: stream-start, caps, flush-start, flush-stop, segment.
//! A flush never reaches a channel before the stream it belongs to has been
//! introduced, and a position reset always follows the flush of its batch.

use super::track::PendingEvents;
use crate::clock::ClockTime;
use crate::event::{Event, FlushStopEvent, SegmentEvent, StreamStartEvent};
use crate::format::Caps;
use crate::observability::{record_event_applied, trace_event_applied};
use crate::pad::OutputChannel;

/// Emits a snapshot of [`PendingEvents`] on an output channel.
///
/// Called outside the shared lock; the snapshot was already cleared from the
/// track, so a concurrent flush lands in the next batch instead of being lost.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    element: String,
}

impl EventScheduler {
    /// Create a scheduler logging under `element`.
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
        }
    }

    /// Apply `pending` on `channel`.
    ///
    /// `position` becomes the segment start and `rate` its applied rate.
    /// Returns whether anything was applied, in which case the next fragment
    /// must carry the discontinuity flag. Rejected events are logged and
    /// never escalated.
    pub fn apply(
        &self,
        channel: &dyn OutputChannel,
        pending: PendingEvents,
        caps: Option<&Caps>,
        stream_id: &str,
        position: ClockTime,
        rate: f64,
    ) -> bool {
        if !pending.any_pending() {
            return false;
        }

        if pending.stream_start {
            self.emit(channel, Event::StreamStart(StreamStartEvent::new(stream_id)));
            if let Some(caps) = caps {
                self.emit(channel, Event::Caps(caps.clone()));
            }
        }

        if pending.flush {
            self.emit(channel, Event::FlushStart);
            self.emit(channel, Event::FlushStop(FlushStopEvent::new(false)));
        }

        if pending.position_reset {
            self.emit(
                channel,
                Event::Segment(SegmentEvent::new_time(position).with_applied_rate(rate)),
            );
        }

        true
    }

    fn emit(&self, channel: &dyn OutputChannel, event: Event) {
        let name = event.name();
        if channel.push_event(event) {
            trace_event_applied(&self.element, channel.name(), name);
            record_event_applied(&self.element, name);
        } else {
            tracing::error!(
                element = %self.element,
                channel = %channel.name(),
                event = name,
                "downstream rejected event"
            );
        }
    }
}
