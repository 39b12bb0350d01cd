//! Pipeline error taxonomy: client input, generator format, synthesis, merge.

use thiserror::Error;

/// Errors surfaced by the podcast pipeline.
///
/// `InvalidRequest` is the only client-side variant; everything else maps to
/// a generic server failure at the HTTP boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or empty required request fields.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Script generator call failed (network, quota, malformed response).
    #[error("script generation failed: {0}")]
    Generator(String),

    /// Generator output was not a JSON array of dialogue lines.
    #[error("script output is not valid JSON: {0}")]
    ScriptFormat(String),

    /// Cloud credential material could not be decoded or parsed.
    #[error("cloud credentials unusable: {0}")]
    Credentials(String),

    /// Per-line synthesis failed (TTS service, voice engine, or transcode).
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Clip concatenation failed.
    #[error("merge failed: {0}")]
    Merge(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors caused by the caller's input rather than the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidRequest(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
