//! Observability features: metrics and tracing.
//!
//! - **Metrics**: counters via `metrics-rs`
//! - **Tracing**: structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `aamp_bridge_fragments_pushed` | Counter | element, media | Fragments forwarded |
//! | `aamp_bridge_bytes_pushed` | Counter | element, media | Bytes forwarded |
//! | `aamp_bridge_chunks_dropped` | Counter | element, media, reason | Chunks not forwarded |
//! | `aamp_bridge_push_failures` | Counter | element, media | Pushes rejected downstream |
//! | `aamp_bridge_events_applied` | Counter | element, event | Deferred events applied |
//!
//! ## Example
//!
//! ```rust
//! use aamp_bridge::observability::init_metrics;
//!
//! // Describe metrics once; install any metrics-rs exporter to collect them.
//! init_metrics();
//! ```

mod metrics;
mod tracing_support;

pub use self::metrics::{TrackMetrics, init_metrics, record_chunk_dropped, record_event_applied};
pub use tracing_support::{
    span_bridge, span_dispatch, trace_event_applied, trace_push_failed, trace_state_change,
};
