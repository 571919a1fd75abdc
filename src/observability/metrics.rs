//! Metrics collection using metrics-rs.

use metrics::{Counter, Unit, counter};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const FRAGMENTS_PUSHED: &str = "aamp_bridge_fragments_pushed";
const BYTES_PUSHED: &str = "aamp_bridge_bytes_pushed";
const CHUNKS_DROPPED: &str = "aamp_bridge_chunks_dropped";
const PUSH_FAILURES: &str = "aamp_bridge_push_failures";
const EVENTS_APPLIED: &str = "aamp_bridge_events_applied";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        FRAGMENTS_PUSHED,
        Unit::Count,
        "Total number of fragments forwarded on output channels"
    );
    metrics::describe_counter!(BYTES_PUSHED, Unit::Bytes, "Total bytes forwarded");
    metrics::describe_counter!(
        CHUNKS_DROPPED,
        Unit::Count,
        "Chunks not forwarded, labelled by reason"
    );
    metrics::describe_counter!(
        PUSH_FAILURES,
        Unit::Count,
        "Fragment pushes rejected by downstream"
    );
    metrics::describe_counter!(
        EVENTS_APPLIED,
        Unit::Count,
        "Deferred control events applied, labelled by event"
    );
}

/// Record a chunk that was not (fully) forwarded.
#[inline]
pub fn record_chunk_dropped(element: &str, media_type: &str, reason: &'static str) {
    counter!(
        CHUNKS_DROPPED,
        "element" => element.to_string(),
        "media" => media_type.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Record a deferred control event applied on a channel.
#[inline]
pub fn record_event_applied(element: &str, event: &'static str) {
    counter!(EVENTS_APPLIED, "element" => element.to_string(), "event" => event).increment(1);
}

/// Counters for one track, with labels resolved once.
#[derive(Clone)]
pub struct TrackMetrics {
    media_type: String,
    fragments: Counter,
    bytes: Counter,
    push_failures: Counter,
}

impl TrackMetrics {
    /// Create counters for `media_type` on `element`.
    pub fn new(element: &str, media_type: &str) -> Self {
        Self {
            media_type: media_type.to_string(),
            fragments: counter!(
                FRAGMENTS_PUSHED,
                "element" => element.to_string(),
                "media" => media_type.to_string()
            ),
            bytes: counter!(
                BYTES_PUSHED,
                "element" => element.to_string(),
                "media" => media_type.to_string()
            ),
            push_failures: counter!(
                PUSH_FAILURES,
                "element" => element.to_string(),
                "media" => media_type.to_string()
            ),
        }
    }

    /// Record a forwarded fragment.
    #[inline]
    pub fn record_fragment(&self, bytes: usize) {
        self.fragments.increment(1);
        self.bytes.increment(bytes as u64);
    }

    /// Record a rejected push.
    #[inline]
    pub fn record_push_failure(&self) {
        self.push_failures.increment(1);
    }

    /// Media type label.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_track_metrics() {
        let metrics = TrackMetrics::new("aamp", "video");
        metrics.record_fragment(188);
        metrics.record_push_failure();
        assert_eq!(metrics.media_type(), "video");
    }

    #[test]
    fn test_global_recording_functions() {
        // No recorder installed; must not panic.
        record_chunk_dropped("aamp", "audio", "no-channel");
        record_event_applied("aamp", "segment");
    }
}
