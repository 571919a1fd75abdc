//! Media types, negotiated output formats and their caps.
//!
//! The engine reports what it will produce as an [`OutputFormat`] per
//! elementary stream. Each supported format maps to a fixed [`Caps`]
//! description that is sent downstream right after stream-start.
//!
//! ```rust
//! use aamp_bridge::format::{Caps, OutputFormat};
//!
//! let caps = Caps::for_format(OutputFormat::MpegTs).unwrap();
//! assert_eq!(caps.to_string(), "video/mpegts, systemstream=(boolean)true, packetsize=(int)188");
//! ```

use crate::error::{Error, Result};
use std::fmt;

// ============================================================================
// MediaType
// ============================================================================

/// Elementary stream carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// Video (or a multiplexed transport stream).
    Video,
    /// Audio elementary stream.
    Audio,
}

impl MediaType {
    /// All media types, in track order.
    pub const ALL: [MediaType; 2] = [MediaType::Video, MediaType::Audio];

    /// Index of this media type's track.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            MediaType::Video => 0,
            MediaType::Audio => 1,
        }
    }

    /// Short name used in logs and metric labels.
    pub const fn name(self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// OutputFormat
// ============================================================================

/// Output format negotiated by the engine for one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// The engine could not determine a format.
    Invalid,
    /// The track does not exist in this presentation.
    #[default]
    None,
    /// MPEG transport stream (188-byte packets).
    MpegTs,
    /// ISO base media file format (fragmented MP4).
    IsoBmff,
    /// AAC audio in ADTS framing.
    AudioAac,
    /// AC-3 audio.
    AudioAc3,
    /// Enhanced AC-3 audio.
    AudioEac3,
    /// H.264 video elementary stream.
    VideoH264,
    /// HEVC video elementary stream.
    VideoHevc,
    /// MPEG-2 video elementary stream.
    VideoMpeg2,
}

impl OutputFormat {
    /// Whether this format yields a track with an output channel.
    pub fn is_supported(self) -> bool {
        !matches!(self, OutputFormat::Invalid | OutputFormat::None)
    }
}

// ============================================================================
// Caps
// ============================================================================

/// A typed field value inside a caps structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsField {
    /// Boolean field.
    Bool(bool),
    /// Integer field.
    Int(i32),
    /// String field.
    Str(String),
}

impl fmt::Display for CapsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapsField::Bool(v) => write!(f, "(boolean){}", v),
            CapsField::Int(v) => write!(f, "(int){}", v),
            CapsField::Str(v) => write!(f, "(string){}", v),
        }
    }
}

/// Description of the data carried on an output channel.
///
/// A media type name plus ordered fields, rendered in the same textual form
/// the downstream pipeline uses for its caps strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    media_type: String,
    fields: Vec<(String, CapsField)>,
}

impl Caps {
    /// Create caps with no fields.
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, name: impl Into<String>, value: CapsField) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Media type name (e.g. `video/mpegts`).
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&CapsField> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Fixed caps for a negotiated output format.
    ///
    /// Returns [`Error::UnsupportedFormat`] for `Invalid` and `None`.
    pub fn for_format(format: OutputFormat) -> Result<Self> {
        let caps = match format {
            OutputFormat::MpegTs => Caps::new("video/mpegts")
                .with_field("systemstream", CapsField::Bool(true))
                .with_field("packetsize", CapsField::Int(188)),
            OutputFormat::IsoBmff => Caps::new("video/quicktime"),
            OutputFormat::AudioAac => Caps::new("audio/mpeg")
                .with_field("mpegversion", CapsField::Int(2))
                .with_field("stream-format", CapsField::Str("adts".into())),
            OutputFormat::AudioAc3 => Caps::new("audio/ac3"),
            OutputFormat::AudioEac3 => Caps::new("audio/x-eac3"),
            OutputFormat::VideoH264 => Caps::new("video/x-h264"),
            OutputFormat::VideoHevc => Caps::new("video/x-h265"),
            OutputFormat::VideoMpeg2 => Caps::new("video/mpeg")
                .with_field("mpegversion", CapsField::Int(2))
                .with_field("systemstream", CapsField::Bool(false)),
            OutputFormat::Invalid | OutputFormat::None => {
                return Err(Error::UnsupportedFormat(format));
            }
        };
        Ok(caps)
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type)?;
        for (name, value) in &self.fields {
            write!(f, ", {}={}", name, value)?;
        }
        Ok(())
    }
}

// ============================================================================
// Template caps tables
// ============================================================================

/// Caps accepted on the input side of the bridge.
///
/// `application/x-hls` is only advertised when the capability flag is set,
/// so that generic HLS URIs are not routed to the bridge by default.
pub fn sink_template_caps(expose_hls: bool) -> Vec<Caps> {
    let mut caps = Vec::with_capacity(2);
    if expose_hls {
        caps.push(Caps::new("application/x-hls"));
    }
    caps.push(Caps::new("application/x-aamp"));
    caps
}

/// Caps that may appear on a video output channel.
pub fn video_template_caps() -> Vec<Caps> {
    vec![
        Caps::new("video/mpegts")
            .with_field("systemstream", CapsField::Bool(true))
            .with_field("packetsize", CapsField::Int(188)),
    ]
}

/// Caps that may appear on an audio output channel.
pub fn audio_template_caps() -> Vec<Caps> {
    vec![
        Caps::new("audio/mpeg").with_field("mpegversion", CapsField::Int(1)),
        Caps::new("audio/mpeg")
            .with_field("mpegversion", CapsField::Int(2))
            .with_field("stream-format", CapsField::Str("adts".into())),
        Caps::new("audio/x-ac3"),
        Caps::new("audio/x-eac3"),
    ]
}
