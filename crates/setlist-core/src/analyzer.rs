//! Set analysis: sampling loop and interval merging
//!
//! The set is sampled every `interval_seconds` from 0 up to (not including)
//! its duration. Each sample is cut, recognized and fed to a [`TrackMerger`],
//! which run-length-encodes the labels into [`TrackInterval`]s.

use crate::config::BackendPolicy;
use crate::error::AnalyzeError;
use crate::media::{probe_duration_with, SegmentExtractor};
use crate::recognition::{label_key, RecognitionResult, Recognizer};
use crate::tracklist::TrackInterval;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};


/// The run currently being extended
#[derive(Debug, Clone)]
struct OpenRun {
    label: String,
    key: String,
    start_seconds: u64,
}

/// Streaming run-length merge of sampled labels
///
/// A sample without a label never closes the open run; only a different
/// label does. On a change the previous interval is closed one second
/// before the sample that revealed the new label. That boundary is an
/// approximation: the real transition lies somewhere in the preceding gap.
#[derive(Debug, Default)]
pub struct TrackMerger {
    current: Option<OpenRun>,
    intervals: Vec<TrackInterval>,
}

impl TrackMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample. Returns true when it opened a new interval.
    pub fn observe(&mut self, offset_seconds: u64, result: Option<&RecognitionResult>) -> bool {
        let label = result.map(RecognitionResult::label);
        self.observe_label(offset_seconds, label.as_deref())
    }

    /// Same as [`observe`](Self::observe) for an already rendered label
    pub fn observe_label(&mut self, offset_seconds: u64, label: Option<&str>) -> bool {
        let Some(label) = label else {
            return false;
        };

        let key = label_key(label);
        if self.current.as_ref().map(|run| run.key == key).unwrap_or(false) {
            return false;
        }

        if let Some(run) = self.current.take() {
            self.intervals.push(TrackInterval::new(
                run.start_seconds,
                offset_seconds.saturating_sub(1).max(run.start_seconds),
                run.label,
            ));
        }

        self.current = Some(OpenRun {
            label: label.split_whitespace().collect::<Vec<_>>().join(" "),
            key,
            start_seconds: offset_seconds,
        });
        true
    }

    /// Label of the open interval, if any
    pub fn current_label(&self) -> Option<&str> {
        self.current.as_ref().map(|run| run.label.as_str())
    }

    /// Intervals closed so far
    pub fn closed(&self) -> &[TrackInterval] {
        &self.intervals
    }

    /// Close the open interval at `duration_seconds` and return all intervals
    pub fn finish(mut self, duration_seconds: u64) -> Vec<TrackInterval> {
        if let Some(run) = self.current.take() {
            self.intervals.push(TrackInterval::new(
                run.start_seconds,
                duration_seconds.max(run.start_seconds),
                run.label,
            ));
        }
        self.intervals
    }
}

/// Sample offsets `0, I, 2I, ...` strictly below `duration_seconds`
pub fn sample_offsets(duration_seconds: u64, interval_seconds: u64) -> impl Iterator<Item = u64> {
    let step = interval_seconds.max(1);
    (0..duration_seconds).step_by(step as usize)
}

/// Merge a complete timeline of `(offset, result)` samples
pub fn merge_timeline<I>(timeline: I, duration_seconds: u64) -> Vec<TrackInterval>
where
    I: IntoIterator<Item = (u64, Option<RecognitionResult>)>,
{
    let mut merger = TrackMerger::new();
    for (offset, result) in timeline {
        merger.observe(offset, result.as_ref());
    }
    merger.finish(duration_seconds)
}

/// What happened at one sample offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SampleStatus {
    Matched {
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    NoMatch,
    ExtractionFailed { reason: String },
    RecognitionFailed { reason: String },
}

/// Progress event, one per sample offset
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub offset_seconds: u64,
    pub duration_seconds: u64,
    /// Whether this sample opened a new interval
    pub new_track: bool,
    pub status: SampleStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub samples: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub extraction_failures: usize,
    pub recognition_failures: usize,
}

/// Result of analyzing one set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAnalysis {
    pub source: PathBuf,
    pub backend: String,
    pub duration_seconds: u64,
    pub interval_seconds: u64,
    pub intervals: Vec<TrackInterval>,
    pub stats: AnalysisStats,
}

/// Drives extraction and recognition over a whole set
pub struct SetAnalyzer<'a> {
    extractor: &'a dyn SegmentExtractor,
    recognizer: &'a dyn Recognizer,
    policy: BackendPolicy,
    ffprobe: String,
}

impl<'a> SetAnalyzer<'a> {
    pub fn new(
        extractor: &'a dyn SegmentExtractor,
        recognizer: &'a dyn Recognizer,
        policy: BackendPolicy,
    ) -> Self {
        Self {
            extractor,
            recognizer,
            policy,
            ffprobe: "ffprobe".to_string(),
        }
    }

    pub fn with_ffprobe(mut self, ffprobe: impl Into<String>) -> Self {
        self.ffprobe = ffprobe.into();
        self
    }

    /// Analyze `source`, probing its duration first
    pub fn analyze(&self, source: &Path) -> Result<SetAnalysis, AnalyzeError> {
        self.analyze_with_progress(source, &mut |_| {})
    }

    pub fn analyze_with_progress(
        &self,
        source: &Path,
        progress: &mut dyn FnMut(&SampleOutcome),
    ) -> Result<SetAnalysis, AnalyzeError> {
        if !source.exists() {
            return Err(AnalyzeError::SourceNotFound(source.to_path_buf()));
        }
        self.preflight()?;

        let duration_seconds = probe_duration_with(source, &self.ffprobe)?;
        self.sample(source, duration_seconds, progress)
    }

    /// Analyze `source` with an already known duration
    pub fn analyze_with_duration(
        &self,
        source: &Path,
        duration_seconds: u64,
        progress: &mut dyn FnMut(&SampleOutcome),
    ) -> Result<SetAnalysis, AnalyzeError> {
        self.preflight()?;
        self.sample(source, duration_seconds, progress)
    }

    /// Policy, decoder and backend configuration checks, once per run
    fn preflight(&self) -> Result<(), AnalyzeError> {
        self.policy
            .validate()
            .map_err(|e| AnalyzeError::InvalidPolicy(e.to_string()))?;
        self.extractor.validate().map_err(|e| {
            log::error!("Cannot extract clips: {}", e);
            AnalyzeError::Extraction(e)
        })?;
        self.recognizer.validate().map_err(|e| {
            log::error!("{} backend is not usable: {}", self.recognizer.name(), e);
            AnalyzeError::Recognition(e)
        })
    }

    fn sample(
        &self,
        source: &Path,
        duration_seconds: u64,
        progress: &mut dyn FnMut(&SampleOutcome),
    ) -> Result<SetAnalysis, AnalyzeError> {
        let interval = self.policy.interval_seconds;
        let mut merger = TrackMerger::new();
        let mut stats = AnalysisStats::default();
        let mut first_call = true;

        log::info!(
            "Analyzing {}s of audio with {} every {}s",
            duration_seconds,
            self.recognizer.name(),
            interval
        );

        for offset in sample_offsets(duration_seconds, interval) {
            log::info!("Analyzing at {}s / {}s", offset, duration_seconds);
            stats.samples += 1;

            let mut new_track = false;
            let status = match self.extractor.extract(source, offset, self.policy.clip_seconds) {
                Err(e) => {
                    log::warn!("Skipping {}s: {}", offset, e);
                    stats.extraction_failures += 1;
                    SampleStatus::ExtractionFailed {
                        reason: e.to_string(),
                    }
                }
                Ok(clip) => {
                    let outcome = self.recognizer.recognize(&clip);
                    // Remove the clip before the next offset is extracted
                    drop(clip);
                    let was_first = std::mem::replace(&mut first_call, false);

                    let status = match outcome {
                        Ok(Some(result)) => {
                            stats.matched += 1;
                            new_track = merger.observe(offset, Some(&result));
                            SampleStatus::Matched {
                                label: result.label(),
                                confidence: result.confidence,
                            }
                        }
                        Ok(None) => {
                            stats.unmatched += 1;
                            SampleStatus::NoMatch
                        }
                        Err(e) if was_first && e.is_fatal() => {
                            log::error!("First recognition call failed: {}", e);
                            return Err(AnalyzeError::Recognition(e));
                        }
                        Err(e) => {
                            log::warn!("Recognition failed at {}s: {}", offset, e);
                            stats.recognition_failures += 1;
                            SampleStatus::RecognitionFailed {
                                reason: e.to_string(),
                            }
                        }
                    };

                    if !self.policy.request_gap.is_zero() {
                        std::thread::sleep(self.policy.request_gap);
                    }
                    status
                }
            };

            if let SampleStatus::Matched { label, .. } = &status {
                log::info!("  {}s: {}", offset, label);
            }

            progress(&SampleOutcome {
                offset_seconds: offset,
                duration_seconds,
                new_track,
                status,
            });
        }

        let intervals = merger.finish(duration_seconds);
        log::info!(
            "Identified {} tracks from {} samples ({} matched)",
            intervals.len(),
            stats.samples,
            stats.matched
        );

        Ok(SetAnalysis {
            source: source.to_path_buf(),
            backend: self.recognizer.name().to_string(),
            duration_seconds,
            interval_seconds: interval,
            intervals,
            stats,
        })
    }
}
