//! Error taxonomy for set analysis
//!
//! Per-offset failures (`SegmentExtractionError`, most `RecognitionError`s)
//! are absorbed by the analyzer. Only `AnalyzeError` reaches the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to cut one clip out of the source recording
#[derive(Debug, Error)]
pub enum SegmentExtractionError {
    #[error("source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("offset {offset}s is past the end of the source ({duration}s)")]
    OffsetBeyondEnd { offset: u64, duration: u64 },

    #[error("failed to create temporary clip: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code:?}: {stderr}")]
    DecoderFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} did not finish within {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("decoder produced an empty clip at {offset}s")]
    EmptyClip { offset: u64 },

    #[error("{tool} not found (install ffmpeg or set [media] ffmpeg)")]
    DecoderMissing { tool: String },
}

/// Failure of a single recognition request
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("missing credentials for {backend}: {hint}")]
    MissingCredentials { backend: String, hint: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("unrecognized response: {0}")]
    MalformedResponse(String),

    #[error("service error {code}: {message}")]
    Service { code: i64, message: String },

    #[error("{tool} not found ({hint})")]
    ToolMissing { tool: String, hint: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecognitionError {
    /// Errors that mean every further request will fail the same way
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RecognitionError::MissingCredentials { .. }
                | RecognitionError::Auth(_)
                | RecognitionError::ToolMissing { .. }
        )
    }
}

/// The source duration could not be determined
#[derive(Debug, Error)]
pub enum DurationProbeError {
    #[error("source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("could not probe duration: {0}")]
    ProbeFailed(String),

    #[error("source reports a zero duration")]
    ZeroDuration,
}

/// Errors that terminate an analysis run
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("invalid sampling policy: {0}")]
    InvalidPolicy(String),

    #[error(transparent)]
    DurationProbe(#[from] DurationProbeError),

    #[error("media decoder unusable: {0}")]
    Extraction(#[source] SegmentExtractionError),

    #[error("recognition backend misconfigured: {0}")]
    Recognition(#[source] RecognitionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_recognition_errors() {
        assert!(RecognitionError::Auth("bad token".into()).is_fatal());
        assert!(RecognitionError::ToolMissing {
            tool: "fpcalc".into(),
            hint: "install chromaprint".into(),
        }
        .is_fatal());
        assert!(RecognitionError::MissingCredentials {
            backend: "audd".into(),
            hint: "set AUDD_API_KEY".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_transient_recognition_errors() {
        assert!(!RecognitionError::Network("reset".into()).is_fatal());
        assert!(!RecognitionError::Quota("limit".into()).is_fatal());
        assert!(!RecognitionError::Timeout(30).is_fatal());
        assert!(!RecognitionError::MalformedResponse("{}".into()).is_fatal());
    }
}
