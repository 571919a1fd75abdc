//! Chunk delivery: readiness gating, pending events and fragmentation.
//!
//! Both payload forms run through one fragmentation loop. The download gate
//! is polled before every fragment, so closing it mid-chunk stops further
//! pushes. Borrowed payloads are copied fragment by fragment; transferred
//! payloads are frozen once and split without copying. The shared lock is
//! released before any event or buffer is pushed.

use super::scheduler::EventScheduler;
use super::state::{LifecycleMonitor, PipelineState};
use crate::buffer::{Buffer, ChunkPayload, MediaChunk};
use crate::config::BridgeConfig;
use crate::engine::PlaybackEngine;
use crate::format::MediaType;
use crate::metadata::Metadata;
use crate::observability::{TrackMetrics, record_chunk_dropped, span_dispatch, trace_push_failed};
use crate::pad::FlowError;
use bytes::Bytes;
use std::sync::Arc;

// ============================================================================
// Outcome
// ============================================================================

/// Why a chunk, or the tail of one, was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Chunk arrived before the bridge was ready and blocking is disabled.
    NotReady,
    /// The bridge is in `Error` or `ShuttingDown`.
    Terminal,
    /// The track has no output channel.
    NoChannel,
    /// The track's channel is detached (audio during trick-play).
    TrackDisabled,
    /// The engine closed the download gate.
    DownloadsDisabled,
    /// Downstream rejected a fragment.
    PushFailed(FlowError),
    /// Audio is configured to be discarded.
    AudioDiscarded,
}

impl DropReason {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NotReady => "not-ready",
            DropReason::Terminal => "terminal",
            DropReason::NoChannel => "no-channel",
            DropReason::TrackDisabled => "track-disabled",
            DropReason::DownloadsDisabled => "downloads-disabled",
            DropReason::PushFailed(_) => "push-failed",
            DropReason::AudioDiscarded => "audio-discarded",
        }
    }
}

/// Result of dispatching one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Fragments accepted downstream.
    pub fragments_pushed: usize,
    /// Payload bytes accepted downstream.
    pub bytes_pushed: usize,
    /// Pending events were applied ahead of this chunk.
    pub discontinuity: bool,
    /// Set when the chunk (or its tail) was dropped.
    pub dropped: Option<DropReason>,
}

impl DispatchOutcome {
    fn dropped(reason: DropReason) -> Self {
        Self {
            dropped: Some(reason),
            ..Self::default()
        }
    }

    /// Whether every byte of the chunk was forwarded.
    pub fn is_complete(&self) -> bool {
        self.dropped.is_none()
    }
}

// ============================================================================
// BufferDispatcher
// ============================================================================

enum Source<'a> {
    Borrowed(&'a [u8]),
    Owned(Bytes),
}

impl Source<'_> {
    fn len(&self) -> usize {
        match self {
            Source::Borrowed(data) => data.len(),
            Source::Owned(data) => data.len(),
        }
    }

    fn next_fragment(&mut self, offset: usize, len: usize) -> Bytes {
        match self {
            Source::Borrowed(data) => Bytes::copy_from_slice(&data[offset..offset + len]),
            Source::Owned(data) => data.split_to(len),
        }
    }
}

/// Forwards engine chunks to the output channel of their track.
pub struct BufferDispatcher {
    element: String,
    monitor: Arc<LifecycleMonitor>,
    engine: Arc<dyn PlaybackEngine>,
    scheduler: EventScheduler,
    max_fragment_size: usize,
    discard_audio: bool,
    block_until_ready: bool,
    metrics: [TrackMetrics; 2],
}

impl BufferDispatcher {
    /// Create a dispatcher over the shared state.
    pub fn new(
        config: &BridgeConfig,
        monitor: Arc<LifecycleMonitor>,
        engine: Arc<dyn PlaybackEngine>,
    ) -> Self {
        Self {
            element: config.name.clone(),
            monitor,
            engine,
            scheduler: EventScheduler::new(config.name.clone()),
            max_fragment_size: config.max_fragment_size.max(1),
            discard_audio: config.discard_audio,
            block_until_ready: config.block_until_ready,
            metrics: [
                TrackMetrics::new(&config.name, MediaType::Video.name()),
                TrackMetrics::new(&config.name, MediaType::Audio.name()),
            ],
        }
    }

    /// Maximum bytes per forwarded fragment.
    pub fn max_fragment_size(&self) -> usize {
        self.max_fragment_size
    }

    /// Forward `chunk` to its track.
    ///
    /// The first chunk accepted overall waits until the bridge is `Ready`
    /// (or drops, when blocking is disabled). A transferred payload is always
    /// taken, leaving the caller's buffer empty whatever the outcome.
    pub fn dispatch(&self, chunk: MediaChunk<'_>) -> DispatchOutcome {
        let media_type = chunk.media_type;
        let span = span_dispatch(&self.element, media_type.name(), chunk.payload.len());
        let _guard = span.enter();

        let pts = chunk.pts_time();
        let dts = chunk.dts_time();
        let duration = chunk.duration_time();
        let mut source = match chunk.payload {
            ChunkPayload::Borrowed(data) => Source::Borrowed(data),
            ChunkPayload::Transferred(buf) => Source::Owned(std::mem::take(buf).freeze()),
        };

        if self.discard_audio && media_type == MediaType::Audio {
            return self.drop_chunk(media_type, DropReason::AudioDiscarded);
        }

        let mut state = self.monitor.lock();
        if !state.ready_to_send {
            if self.block_until_ready {
                state = self
                    .monitor
                    .wait_until_at_least_locked(state, PipelineState::Ready);
            }
            if state.lifecycle != PipelineState::Ready {
                let reason = if state.lifecycle.is_terminal() {
                    DropReason::Terminal
                } else {
                    DropReason::NotReady
                };
                drop(state);
                tracing::warn!(element = %self.element, media = %media_type, "not ready to consume data");
                return self.drop_chunk(media_type, reason);
            }
            state.ready_to_send = true;
        }
        if state.lifecycle.is_terminal() {
            drop(state);
            return self.drop_chunk(media_type, DropReason::Terminal);
        }

        let rate = state.rate;
        let stream_id = state.stream_id.clone();
        let track = &mut state.tracks[media_type];
        let Some(channel) = track.channel.clone() else {
            drop(state);
            tracing::trace!(element = %self.element, media = %media_type, "no channel for track");
            return self.drop_chunk(media_type, DropReason::NoChannel);
        };
        if !track.enabled {
            drop(state);
            return self.drop_chunk(media_type, DropReason::TrackDisabled);
        }
        let pending = track.pending.take();
        let caps = if pending.stream_start {
            track.caps.clone()
        } else {
            None
        };
        drop(state);

        let discontinuity =
            self.scheduler
                .apply(channel.as_ref(), pending, caps.as_ref(), &stream_id, pts, rate);

        let mut outcome = DispatchOutcome {
            discontinuity,
            ..DispatchOutcome::default()
        };
        let metrics = &self.metrics[media_type.index()];
        let total = source.len();
        let single = total <= self.max_fragment_size;
        let mut offset = 0;
        let mut sequence = 0u64;

        while offset < total {
            if !self.engine.downloads_enabled(media_type) {
                tracing::debug!(
                    element = %self.element,
                    media = %media_type,
                    remaining = total - offset,
                    "downloads disabled, dropping rest of chunk"
                );
                outcome.dropped = Some(DropReason::DownloadsDisabled);
                break;
            }

            let len = self.max_fragment_size.min(total - offset);
            let data = source.next_fragment(offset, len);
            offset += len;

            let mut metadata = Metadata::new()
                .with_timestamps(pts, dts)
                .with_sequence(sequence);
            if single {
                metadata = metadata.with_duration(duration);
            }
            if discontinuity && sequence == 0 {
                metadata = metadata.with_discont();
            }

            match channel.push(Buffer::new(data, metadata)) {
                Ok(()) => {
                    metrics.record_fragment(len);
                    outcome.fragments_pushed += 1;
                    outcome.bytes_pushed += len;
                }
                Err(err) => {
                    trace_push_failed(&self.element, channel.name(), sequence, &err);
                    metrics.record_push_failure();
                    outcome.dropped = Some(DropReason::PushFailed(err));
                    break;
                }
            }
            sequence += 1;
        }

        if let Some(reason) = &outcome.dropped {
            record_chunk_dropped(&self.element, media_type.name(), reason.as_str());
        }
        outcome
    }

    fn drop_chunk(&self, media_type: MediaType, reason: DropReason) -> DispatchOutcome {
        record_chunk_dropped(&self.element, media_type.name(), reason.as_str());
        DispatchOutcome::dropped(reason)
    }
}
