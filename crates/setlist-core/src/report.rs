//! JSON report format
//!
//! Machine-readable companion to the text tracklist: run metadata, sample
//! statistics and the merged intervals.

use crate::analyzer::{AnalysisStats, SetAnalysis};
use crate::tracklist::{format_tracklist, TrackInterval};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const REPORT_VERSION: &str = "1.0";

/// Complete JSON report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetReport {
    pub version: String,
    pub metadata: ReportMetadata,
    pub stats: AnalysisStats,
    /// Rendered text tracklist, identical to the `.txt` output
    pub tracklist: String,
    pub intervals: Vec<TrackInterval>,
}

/// Information about the analyzed set and the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub source_path: String,
    pub filename: String,
    pub backend: String,
    pub interval_seconds: u64,
    pub duration_seconds: u64,
    pub created_at: String,
}

impl SetReport {
    pub fn from_analysis(analysis: &SetAnalysis) -> Self {
        let filename = analysis
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            version: REPORT_VERSION.to_string(),
            metadata: ReportMetadata {
                source_path: analysis.source.display().to_string(),
                filename,
                backend: analysis.backend.clone(),
                interval_seconds: analysis.interval_seconds,
                duration_seconds: analysis.duration_seconds,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            stats: analysis.stats.clone(),
            tracklist: format_tracklist(&analysis.intervals),
            intervals: analysis.intervals.clone(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        let report: SetReport = serde_json::from_str(&json_str)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn analysis() -> SetAnalysis {
        SetAnalysis {
            source: PathBuf::from("/music/sets/warehouse.mp3"),
            backend: "shazam".to_string(),
            duration_seconds: 125,
            interval_seconds: 45,
            intervals: vec![
                TrackInterval::new(0, 44, "X - One"),
                TrackInterval::new(45, 125, "Y - Two"),
            ],
            stats: AnalysisStats {
                samples: 3,
                matched: 3,
                ..AnalysisStats::default()
            },
        }
    }

    #[test]
    fn test_report_from_analysis() {
        let report = SetReport::from_analysis(&analysis());
        assert_eq!(report.version, REPORT_VERSION);
        assert_eq!(report.metadata.filename, "warehouse.mp3");
        assert_eq!(report.metadata.backend, "shazam");
        assert_eq!(report.intervals.len(), 2);
        assert!(report.tracklist.contains("0:45 - 2:05 - Y - Two"));
        assert!(chrono::DateTime::parse_from_rfc3339(&report.metadata.created_at).is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warehouse_tracklist.json");

        let report = SetReport::from_analysis(&analysis());
        report.save(&path).unwrap();

        let loaded = SetReport::load(&path).unwrap();
        assert_eq!(loaded.intervals, report.intervals);
        assert_eq!(loaded.stats, report.stats);
        assert_eq!(loaded.metadata.created_at, report.metadata.created_at);
    }

    #[test]
    fn test_json_field_names() {
        let json = SetReport::from_analysis(&analysis()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["intervals"][1]["start_seconds"], 45);
        assert_eq!(value["metadata"]["duration_seconds"], 125);
        assert_eq!(value["stats"]["matched"], 3);
    }
}
