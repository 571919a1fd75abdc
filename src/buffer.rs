//! Incoming media chunks and outgoing buffers.
//!
//! The engine hands the bridge a [`MediaChunk`] whose payload is either a
//! read-only view it keeps ownership of, or a growable buffer it wants
//! consumed. Both forms go through the same dispatch path; see
//! [`ChunkPayload`].

use crate::clock::ClockTime;
use crate::format::MediaType;
use crate::metadata::Metadata;
use bytes::{Bytes, BytesMut};

/// Payload of a media chunk, tagged by ownership.
#[derive(Debug)]
pub enum ChunkPayload<'a> {
    /// Caller keeps ownership; each fragment is copied out.
    Borrowed(&'a [u8]),
    /// Ownership moves to the bridge. The caller's buffer is left empty
    /// after dispatch, however many fragments were forwarded.
    Transferred(&'a mut BytesMut),
}

impl ChunkPayload<'_> {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            ChunkPayload::Borrowed(data) => data.len(),
            ChunkPayload::Transferred(buf) => buf.len(),
        }
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether ownership moves to the bridge.
    pub fn is_transferred(&self) -> bool {
        matches!(self, ChunkPayload::Transferred(_))
    }
}

/// One unit of media produced by the engine.
///
/// Timestamps are seconds, as the engine reports them.
#[derive(Debug)]
pub struct MediaChunk<'a> {
    /// Track this chunk belongs to.
    pub media_type: MediaType,
    /// Payload bytes.
    pub payload: ChunkPayload<'a>,
    /// Presentation timestamp in seconds.
    pub pts: f64,
    /// Decode timestamp in seconds.
    pub dts: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl<'a> MediaChunk<'a> {
    /// Chunk over a borrowed byte view.
    pub fn borrowed(media_type: MediaType, data: &'a [u8], pts: f64, dts: f64, duration: f64) -> Self {
        Self {
            media_type,
            payload: ChunkPayload::Borrowed(data),
            pts,
            dts,
            duration,
        }
    }

    /// Chunk whose buffer is handed over to the bridge.
    pub fn transferred(
        media_type: MediaType,
        buffer: &'a mut BytesMut,
        pts: f64,
        dts: f64,
        duration: f64,
    ) -> Self {
        Self {
            media_type,
            payload: ChunkPayload::Transferred(buffer),
            pts,
            dts,
            duration,
        }
    }

    /// Presentation timestamp on the downstream time base.
    pub fn pts_time(&self) -> ClockTime {
        ClockTime::from_secs_f64(self.pts)
    }

    /// Decode timestamp on the downstream time base.
    pub fn dts_time(&self) -> ClockTime {
        ClockTime::from_secs_f64(self.dts)
    }

    /// Duration on the downstream time base.
    pub fn duration_time(&self) -> ClockTime {
        ClockTime::from_secs_f64(self.duration)
    }
}

/// A buffer forwarded on an output channel.
///
/// Cheap to clone; the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    data: Bytes,
    metadata: Metadata,
}

impl Buffer {
    /// Create a new buffer.
    pub fn new(data: Bytes, metadata: Metadata) -> Self {
        Self { data, metadata }
    }

    /// Payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Buffer metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Presentation timestamp.
    pub fn pts(&self) -> ClockTime {
        self.metadata.pts
    }

    /// Decode timestamp.
    pub fn dts(&self) -> ClockTime {
        self.metadata.dts
    }

    /// Whether this buffer starts after a discontinuity.
    pub fn is_discont(&self) -> bool {
        self.metadata.flags.discont
    }

    /// Split into payload and metadata.
    pub fn into_parts(self) -> (Bytes, Metadata) {
        (self.data, self.metadata)
    }
}
