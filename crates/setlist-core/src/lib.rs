//! Setlist Core - DJ set tracklist identification
//!
//! Samples a long mix at a fixed interval, identifies each short clip with
//! a remote recognition service and merges consecutive identical answers
//! into timestamped track intervals.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod media;
pub mod recognition;
pub mod report;
pub mod tracklist;

pub use analyzer::{
    AnalysisStats, SampleOutcome, SampleStatus, SetAnalysis, SetAnalyzer, TrackMerger,
};
pub use config::{Backend, BackendPolicy, SetlistConfig};
pub use error::{AnalyzeError, DurationProbeError, RecognitionError, SegmentExtractionError};
pub use media::{AudioClip, FfmpegExtractor, SegmentExtractor};
pub use recognition::{build_recognizer, RecognitionResult, Recognizer};
pub use report::SetReport;
pub use tracklist::{format_timestamp, format_tracklist, TrackInterval};

use std::path::Path;
use std::time::Duration;

/// Analyze a set with the configured tools for `backend`.
///
/// `policy` is usually `config.policy(backend)`, optionally adjusted by
/// the caller (e.g. a command-line interval). Its timeout bounds every
/// recognition call.
pub fn analyze_set(
    source: &Path,
    backend: Backend,
    policy: BackendPolicy,
    config: &SetlistConfig,
    progress: &mut dyn FnMut(&SampleOutcome),
) -> Result<SetAnalysis, AnalyzeError> {
    if !source.exists() {
        return Err(AnalyzeError::SourceNotFound(source.to_path_buf()));
    }

    let recognizer =
        build_recognizer(backend, config, policy.timeout).map_err(AnalyzeError::Recognition)?;
    let extractor = FfmpegExtractor::new(&config.media.ffmpeg, policy.encoding.clone())
        .with_timeout(Duration::from_secs(config.media.timeout_seconds));

    SetAnalyzer::new(&extractor, recognizer.as_ref(), policy)
        .with_ffprobe(&config.media.ffprobe)
        .analyze_with_progress(source, progress)
}
