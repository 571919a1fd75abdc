//! Tracing integration for structured logging and spans.

use crate::pad::FlowError;
use tracing::{Level, Span, span};

/// Create a span covering one bridge instance's control operations.
///
/// # Example
///
/// ```rust
/// use aamp_bridge::observability::span_bridge;
///
/// let span = span_bridge("aamp0");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_bridge(name: &str) -> Span {
    span!(Level::INFO, "bridge", name = %name)
}

/// Create a span for dispatching one chunk.
#[inline]
pub fn span_dispatch(element: &str, media_type: &str, size: usize) -> Span {
    span!(
        Level::TRACE,
        "dispatch",
        element = %element,
        media = %media_type,
        size = size
    )
}

/// Log a lifecycle state change.
#[inline]
pub fn trace_state_change(element: &str, from: &str, to: &str) {
    tracing::info!(
        element = %element,
        from = %from,
        to = %to,
        "bridge state changed"
    );
}

/// Log a fragment push rejected by downstream.
#[inline]
pub fn trace_push_failed(element: &str, channel: &str, sequence: u64, error: &FlowError) {
    tracing::warn!(
        element = %element,
        channel = %channel,
        sequence = sequence,
        error = %error,
        "push failed, dropping rest of chunk"
    );
}

/// Log a deferred control event applied on a channel.
#[inline]
pub fn trace_event_applied(element: &str, channel: &str, event: &str) {
    tracing::debug!(
        element = %element,
        channel = %channel,
        event = %event,
        "pending event applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let _span = span_bridge("aamp");
        let _span = span_dispatch("aamp", "video", 1024);
    }

    #[test]
    fn test_trace_functions() {
        // No subscriber installed; must not panic.
        trace_state_change("aamp", "tuning", "configured");
        trace_push_failed("aamp", "video_01", 2, &FlowError::Flushing);
        trace_event_applied("aamp", "video_01", "segment");
    }
}
