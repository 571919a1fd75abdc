//! Buffer metadata types.

use crate::clock::ClockTime;

/// Flags indicating buffer properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferFlags {
    /// Timestamps do not continue from the previous buffer on this channel.
    pub discont: bool,
}

impl BufferFlags {
    /// Set the discontinuity flag.
    pub fn set_discont(&mut self, value: bool) {
        self.discont = value;
    }

    /// Check if the discontinuity flag is set.
    pub fn is_discont(&self) -> bool {
        self.discont
    }
}

/// Metadata associated with an outgoing buffer.
///
/// Every fragment of a chunk carries the chunk's pts/dts; only the sequence
/// number and flags differ between fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Presentation timestamp.
    pub pts: ClockTime,

    /// Decode timestamp.
    pub dts: ClockTime,

    /// Duration of this buffer's content, `NONE` when unknown.
    pub duration: ClockTime,

    /// Fragment index within the originating chunk.
    pub sequence: u64,

    /// Buffer flags.
    pub flags: BufferFlags,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            pts: ClockTime::NONE,
            dts: ClockTime::NONE,
            duration: ClockTime::NONE,
            sequence: 0,
            flags: BufferFlags::default(),
        }
    }
}

impl Metadata {
    /// Create metadata with unset timestamps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set presentation and decode timestamps.
    pub fn with_timestamps(mut self, pts: ClockTime, dts: ClockTime) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    /// Set the duration.
    pub fn with_duration(mut self, duration: ClockTime) -> Self {
        self.duration = duration;
        self
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Mark as a discontinuity.
    pub fn with_discont(mut self) -> Self {
        self.flags.discont = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = Metadata::new()
            .with_timestamps(ClockTime::from_millis(100), ClockTime::from_millis(90))
            .with_duration(ClockTime::from_millis(33))
            .with_sequence(2)
            .with_discont();

        assert_eq!(meta.pts.millis(), 100);
        assert_eq!(meta.dts.millis(), 90);
        assert_eq!(meta.duration.millis(), 33);
        assert_eq!(meta.sequence, 2);
        assert!(meta.flags.is_discont());
    }

    #[test]
    fn test_default_is_unset() {
        let meta = Metadata::default();
        assert!(meta.pts.is_none());
        assert!(meta.duration.is_none());
        assert!(!meta.flags.is_discont());
    }
}
