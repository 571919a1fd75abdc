//! Bridge configuration.
//!
//! Capability flags are read once when the configuration is built and then
//! travel with the bridge; nothing is kept in process-global state.
//!
//! # Example
//!
//! ```rust
//! use aamp_bridge::config::BridgeConfig;
//!
//! let config = BridgeConfig::default()
//!     .with_name("aamp0")
//!     .with_max_fragment_size(64 * 1024)
//!     .with_captions(true);
//! assert_eq!(config.max_fragment_size, 64 * 1024);
//! ```

use crate::format::{Caps, sink_template_caps};
use crate::pad::PadTemplate;

/// Default maximum bytes per forwarded fragment (a whole number of
/// transport-stream packets).
pub const DEFAULT_MAX_FRAGMENT_SIZE: usize = 188 * 1024;

/// Environment variable that advertises `application/x-hls` input caps.
pub const EXPOSE_HLS_CAPS_ENV: &str = "GST_AAMP_EXPOSE_HLS_CAPS";

/// Environment variable that drops every audio chunk.
pub const DISCARD_AUDIO_ENV: &str = "AAMP_DISCARD_AUDIO_TRACK";

/// Configuration for an [`AampBridge`](crate::bridge::AampBridge).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Element name, used in stream ids and log fields.
    pub name: String,
    /// Maximum bytes per forwarded fragment.
    pub max_fragment_size: usize,
    /// Advertise `application/x-hls` on the input template.
    pub expose_hls_caps: bool,
    /// Start the closed-caption collaborator when playing.
    pub captions_enabled: bool,
    /// Drop every audio chunk.
    pub discard_audio: bool,
    /// Block the first chunk until the bridge is ready. When `false`,
    /// chunks arriving before that are dropped.
    pub block_until_ready: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: "aamp".to_string(),
            max_fragment_size: DEFAULT_MAX_FRAGMENT_SIZE,
            expose_hls_caps: false,
            captions_enabled: false,
            discard_audio: false,
            block_until_ready: true,
        }
    }
}

impl BridgeConfig {
    /// Defaults, with capability flags taken from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).is_some())
    }

    /// Defaults, with capability flags answered by `is_set`.
    pub fn from_lookup(is_set: impl Fn(&str) -> bool) -> Self {
        Self {
            expose_hls_caps: is_set(EXPOSE_HLS_CAPS_ENV),
            discard_audio: is_set(DISCARD_AUDIO_ENV),
            ..Self::default()
        }
    }

    /// Set the element name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the maximum fragment size. Zero is raised to one byte.
    pub fn with_max_fragment_size(mut self, size: usize) -> Self {
        self.max_fragment_size = size.max(1);
        self
    }

    /// Advertise HLS input caps.
    pub fn with_hls_caps(mut self, enabled: bool) -> Self {
        self.expose_hls_caps = enabled;
        self
    }

    /// Enable closed captions.
    pub fn with_captions(mut self, enabled: bool) -> Self {
        self.captions_enabled = enabled;
        self
    }

    /// Drop every audio chunk.
    pub fn with_discard_audio(mut self, discard: bool) -> Self {
        self.discard_audio = discard;
        self
    }

    /// Choose between blocking and dropping before the bridge is ready.
    pub fn with_block_until_ready(mut self, block: bool) -> Self {
        self.block_until_ready = block;
        self
    }

    /// Caps advertised on the input side.
    pub fn sink_caps(&self) -> Vec<Caps> {
        sink_template_caps(self.expose_hls_caps)
    }

    /// Template of the input pad.
    pub fn sink_template(&self) -> PadTemplate {
        PadTemplate::sink(self.sink_caps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.name, "aamp");
        assert_eq!(config.max_fragment_size, 192_512);
        assert!(!config.expose_hls_caps);
        assert!(config.block_until_ready);
        assert_eq!(config.sink_caps().len(), 1);
    }

    #[test]
    fn test_from_lookup() {
        let config = BridgeConfig::from_lookup(|key| key == EXPOSE_HLS_CAPS_ENV);
        assert!(config.expose_hls_caps);
        assert!(!config.discard_audio);
        assert_eq!(config.sink_template().caps[0].media_type(), "application/x-hls");

        let config = BridgeConfig::from_lookup(|key| key == DISCARD_AUDIO_ENV);
        assert!(config.discard_audio);
    }

    #[test]
    fn test_zero_fragment_size_clamped() {
        let config = BridgeConfig::default().with_max_fragment_size(0);
        assert_eq!(config.max_fragment_size, 1);
    }
}
