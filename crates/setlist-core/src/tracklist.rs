//! Track intervals and their text rendering

use serde::{Deserialize, Serialize};

pub const TRACKLIST_HEADER: &str = "TIMESTAMPS:";

/// Shown in place of the interval lines when nothing was identified
pub const NO_SONGS_MESSAGE: &str =
    "(No songs identified - tracks may not be in the recognition service's catalogue)";

/// A contiguous span of the set attributed to one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInterval {
    pub start_seconds: u64,
    pub end_seconds: u64,
    /// `"artist - title"`
    pub label: String,
}

impl TrackInterval {
    pub fn new(start_seconds: u64, end_seconds: u64, label: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            label: label.into(),
        }
    }
}

/// `M:SS`; minutes are not wrapped into hours
pub fn format_timestamp(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// One `start - end - label` line per interval, in the order given
pub fn format_tracklist(intervals: &[TrackInterval]) -> String {
    let mut output = format!("{}\n\n", TRACKLIST_HEADER);

    if intervals.is_empty() {
        output.push_str(NO_SONGS_MESSAGE);
        output.push('\n');
        return output;
    }

    for interval in intervals {
        output.push_str(&format!(
            "{} - {} - {}\n",
            format_timestamp(interval.start_seconds),
            format_timestamp(interval.end_seconds),
            interval.label
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "0:00");
        assert_eq!(format_timestamp(44), "0:44");
        assert_eq!(format_timestamp(125), "2:05");
        // Minutes keep counting past the hour
        assert_eq!(format_timestamp(3725), "62:05");
    }

    #[test]
    fn test_format_tracklist() {
        let intervals = vec![
            TrackInterval::new(0, 44, "X - One"),
            TrackInterval::new(45, 125, "Y - Two"),
        ];
        assert_eq!(
            format_tracklist(&intervals),
            "TIMESTAMPS:\n\n0:00 - 0:44 - X - One\n0:45 - 2:05 - Y - Two\n"
        );
    }

    #[test]
    fn test_empty_tracklist_has_message() {
        let text = format_tracklist(&[]);
        assert!(text.starts_with("TIMESTAMPS:\n\n"));
        assert!(text.contains("No songs identified"));
        assert_ne!(text.trim(), TRACKLIST_HEADER);
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let intervals = vec![
            TrackInterval::new(0, 89, "A - B"),
            TrackInterval::new(90, 3600, "C - D"),
        ];
        assert_eq!(format_tracklist(&intervals), format_tracklist(&intervals));
    }

    #[test]
    fn test_no_reordering() {
        let intervals = vec![
            TrackInterval::new(90, 120, "Late"),
            TrackInterval::new(0, 30, "Early"),
        ];
        let text = format_tracklist(&intervals);
        assert!(text.find("Late").unwrap() < text.find("Early").unwrap());
    }
}
