//! Error types for the bridge.

use crate::bridge::PipelineState;
use crate::format::OutputFormat;
use thiserror::Error;

/// Result type alias using the bridge's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bridge operations.
///
/// Failures local to a single chunk or event are not represented here; they
/// surface as [`crate::pad::FlowError`] or as a drop reason on the dispatch
/// outcome and never reach the lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    /// The engine never reported a negotiated output format.
    #[error("bridge is not configured")]
    NotConfigured,

    /// A lifecycle transition was refused.
    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidState {
        /// State the bridge was in.
        from: PipelineState,
        /// State that was requested.
        to: PipelineState,
    },

    /// The host did not provide a URI to tune to.
    #[error("no URI available from upstream")]
    NoUri,

    /// The engine reported an output format that has no caps mapping.
    #[error("unsupported output format: {0:?}")]
    UnsupportedFormat(OutputFormat),

    /// The closed-caption collaborator failed to start.
    #[error("closed captions failed to start: {0}")]
    CaptionStart(String),
}
