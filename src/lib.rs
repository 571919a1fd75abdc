//! # aamp-bridge
//!
//! Delivery bridge between an adaptive media-playback engine and a
//! downstream pipeline that consumes typed output channels.
//!
//! The engine produces media chunks on its own threads at its own pace. The
//! bridge turns that into an ordered per-channel protocol: control events
//! (stream-start, caps, flush, segment) always precede the data they apply
//! to, chunks are cut into bounded fragments, and nothing flows before the
//! channels exist.
//!
//! ## Features
//!
//! - **Lifecycle monitor**: one mutex plus condition variable, blocking
//!   readiness waits released by terminal states
//! - **Deferred events**: idempotent per-track pending set, applied in a
//!   fixed order ahead of the next chunk
//! - **Fragmentation**: borrowed payloads are copied per fragment,
//!   transferred payloads are split without copying
//! - **Trick-play**: audio detached while the rate is not 1.0
//!
//! ## Quick Start
//!
//! ```rust
//! use aamp_bridge::prelude::*;
//! use aamp_bridge::testing::{MockEngine, MockHost};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(MockEngine::new().with_formats(OutputFormat::MpegTs, OutputFormat::AudioAac));
//! let host = Arc::new(MockHost::new().with_uri("http://example.com/master.m3u8"));
//! let bridge = AampBridge::new(BridgeConfig::from_env(), host.clone(), engine, None);
//!
//! bridge.change_state(HostTransition::NullToReady);
//! bridge.change_state(HostTransition::ReadyToPaused);
//!
//! let payload = vec![0u8; 188 * 10];
//! let outcome = bridge.sink().send(MediaChunk::borrowed(MediaType::Video, &payload, 0.0, 0.0, 0.04));
//! assert!(outcome.discontinuity);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod buffer;
pub mod captions;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod format;
pub mod metadata;
pub mod observability;
pub mod pad;
pub mod query;
pub mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bridge::{
        AampBridge, BridgeSink, DispatchOutcome, DropReason, HostTransition, PipelineState,
        StateChangeReturn,
    };
    pub use crate::buffer::{Buffer, ChunkPayload, MediaChunk};
    pub use crate::captions::ClosedCaptions;
    pub use crate::clock::ClockTime;
    pub use crate::config::BridgeConfig;
    pub use crate::engine::{EngineEvent, PlaybackEngine};
    pub use crate::error::{Error, Result};
    pub use crate::event::{Event, SeekEvent, SeekFlags, SeekType};
    pub use crate::format::{Caps, MediaType, OutputFormat};
    pub use crate::metadata::Metadata;
    pub use crate::pad::{ChannelHandle, FlowError, Host, OutputChannel};
    pub use crate::query::{Query, QueryResponse};
}

pub use error::{Error, Result};
