//! Tracklist and JSON output

use anyhow::Context;
use setlist_core::analyzer::{SampleOutcome, SampleStatus};
use setlist_core::tracklist::format_timestamp;
use setlist_core::SetReport;
use std::path::{Path, PathBuf};

/// Printed after an empty tracklist
pub const EMPTY_HINT: &str = "Tip: DJ sets often contain unreleased tracks, edits and bootlegs \
that recognition services do not know. Try another backend or a shorter --interval.";

/// `<dir>/<stem>_tracklist.<ext>` next to the source recording
pub fn default_output_path(source: &Path, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "set".to_string());
    let name = format!("{}_tracklist.{}", stem, extension);
    match source.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

pub fn default_tracklist_path(source: &Path) -> PathBuf {
    default_output_path(source, "txt")
}

/// Write the rendered tracklist text to `path`
pub fn save_tracklist(text: &str, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write tracklist: {}", path.display()))
}

/// Print report as JSON
pub fn print_json_report(report: &SetReport) {
    match report.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing report: {}", e),
    }
}

/// One progress line per sample, e.g. `[ 2:15 / 61:40] Artist - Title (new)`
pub fn progress_line(outcome: &SampleOutcome) -> String {
    let position = format!(
        "[{:>5} / {}]",
        format_timestamp(outcome.offset_seconds),
        format_timestamp(outcome.duration_seconds)
    );
    let detail = match &outcome.status {
        SampleStatus::Matched { label, .. } if outcome.new_track => format!("{} (new)", label),
        SampleStatus::Matched { label, .. } => label.clone(),
        SampleStatus::NoMatch => "no match".to_string(),
        SampleStatus::ExtractionFailed { reason } => format!("skipped: {}", reason),
        SampleStatus::RecognitionFailed { reason } => format!("failed: {}", reason),
    };
    format!("{} {}", position, detail)
}
