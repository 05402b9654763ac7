//! Media access through external tools
//!
//! Duration probing uses ffprobe with a Symphonia fallback; clips are cut
//! and re-encoded by ffmpeg into scoped temporary files.

mod extract;
mod probe;
mod process;

pub use extract::{AudioClip, FfmpegExtractor, SegmentExtractor};
pub use probe::{probe_duration, probe_duration_with, probe_duration_symphonia};
pub use process::{run_with_timeout, tool_available, TimedOutput};
