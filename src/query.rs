//! Queries answered on output channels.
//!
//! Position and duration come from the engine in milliseconds and are
//! answered on the nanosecond time base. Only time-format position and
//! duration queries are handled.

use crate::clock::ClockTime;
use crate::engine::PlaybackEngine;
use crate::event::SeekFormat;
use crate::format::{Caps, MediaType};
use std::fmt;
use std::sync::Arc;

/// Name of the custom query returning the engine instance.
pub const ENGINE_INSTANCE_QUERY: &str = "get_aamp_instance";

/// A query arriving on an output channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Current playback position.
    Position(SeekFormat),
    /// Presentation duration.
    Duration(SeekFormat),
    /// Scheduling capabilities.
    Scheduling,
    /// Caps of the track's channel.
    Caps(MediaType),
    /// Named custom query.
    Custom(String),
}

/// Answer to a handled [`Query`].
#[derive(Clone)]
pub enum QueryResponse {
    /// Current position.
    Position(ClockTime),
    /// Duration.
    Duration(ClockTime),
    /// Scheduling capabilities.
    Scheduling {
        /// Whether seeking is supported.
        seekable: bool,
        /// Minimum buffer count.
        min: i32,
        /// Maximum buffer count, -1 for unlimited.
        max: i32,
        /// Buffer alignment.
        align: i32,
    },
    /// Negotiated caps, `None` if the track has none.
    Caps(Option<Caps>),
    /// Handle to the underlying engine.
    EngineInstance(Arc<dyn PlaybackEngine>),
}

impl fmt::Debug for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResponse::Position(t) => f.debug_tuple("Position").field(t).finish(),
            QueryResponse::Duration(t) => f.debug_tuple("Duration").field(t).finish(),
            QueryResponse::Scheduling {
                seekable,
                min,
                max,
                align,
            } => f
                .debug_struct("Scheduling")
                .field("seekable", seekable)
                .field("min", min)
                .field("max", max)
                .field("align", align)
                .finish(),
            QueryResponse::Caps(caps) => f.debug_tuple("Caps").field(caps).finish(),
            QueryResponse::EngineInstance(_) => f.write_str("EngineInstance(..)"),
        }
    }
}

/// Answer `query` from the engine and the track's negotiated caps.
///
/// Returns `None` for anything not handled.
pub fn answer(
    query: &Query,
    engine: &Arc<dyn PlaybackEngine>,
    caps: impl FnOnce(MediaType) -> Option<Caps>,
) -> Option<QueryResponse> {
    match query {
        Query::Position(SeekFormat::Time) => {
            let ms = engine.position_ms();
            tracing::trace!(position_ms = ms, "position query");
            Some(QueryResponse::Position(ClockTime::from_engine_millis(ms)))
        }
        Query::Duration(SeekFormat::Time) => {
            let ms = engine.duration_ms();
            tracing::trace!(duration_ms = ms, "duration query");
            Some(QueryResponse::Duration(ClockTime::from_engine_millis(ms)))
        }
        Query::Position(format) | Query::Duration(format) => {
            tracing::warn!(format = ?format, "unsupported query format");
            None
        }
        Query::Scheduling => Some(QueryResponse::Scheduling {
            seekable: true,
            min: 1,
            max: -1,
            align: 0,
        }),
        Query::Caps(media_type) => Some(QueryResponse::Caps(caps(*media_type))),
        Query::Custom(name) if name == ENGINE_INSTANCE_QUERY => {
            Some(QueryResponse::EngineInstance(Arc::clone(engine)))
        }
        Query::Custom(name) => {
            tracing::debug!(query = %name, "unhandled custom query");
            None
        }
    }
}
