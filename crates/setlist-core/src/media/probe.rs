//! Source duration probing

use super::process::run_with_timeout;
use crate::error::DurationProbeError;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Duration of `path` in whole seconds, using `ffprobe` from `PATH`
pub fn probe_duration(path: &Path) -> Result<u64, DurationProbeError> {
    probe_duration_with(path, "ffprobe")
}

/// Duration of `path` in whole seconds (fractional part truncated).
///
/// Asks `ffprobe` first and falls back to reading the container headers
/// with Symphonia. A zero duration is reported as an error.
pub fn probe_duration_with(path: &Path, ffprobe: &str) -> Result<u64, DurationProbeError> {
    if !path.exists() {
        return Err(DurationProbeError::SourceNotFound(path.to_path_buf()));
    }

    let seconds = match probe_ffprobe(path, ffprobe) {
        Ok(seconds) => seconds,
        Err(e) => {
            log::warn!("ffprobe failed ({}), reading container headers instead", e);
            probe_duration_symphonia(path)?
        }
    };

    if seconds == 0 {
        return Err(DurationProbeError::ZeroDuration);
    }
    Ok(seconds)
}

fn probe_ffprobe(path: &Path, ffprobe: &str) -> Result<u64, DurationProbeError> {
    let mut cmd = Command::new(ffprobe);
    cmd.arg("-i")
        .arg(path)
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-v")
        .arg("quiet")
        .arg("-of")
        .arg("csv=p=0");

    log::debug!("Running ffprobe: {:?}", cmd);

    let output = run_with_timeout(&mut cmd, PROBE_TIMEOUT)
        .map_err(|e| DurationProbeError::ProbeFailed(format!("failed to run {}: {}", ffprobe, e)))?;

    if output.timed_out() {
        return Err(DurationProbeError::ProbeFailed(format!(
            "{} timed out",
            ffprobe
        )));
    }
    if !output.success() {
        return Err(DurationProbeError::ProbeFailed(format!(
            "{} exited with {:?}",
            ffprobe, output.status
        )));
    }

    parse_ffprobe_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the `csv=p=0` duration line, e.g. `3671.245000`
fn parse_ffprobe_duration(stdout: &str) -> Result<u64, DurationProbeError> {
    let line = stdout.trim();
    let seconds: f64 = line.parse().map_err(|_| {
        DurationProbeError::ProbeFailed(format!("unexpected ffprobe output: '{}'", line))
    })?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(DurationProbeError::ProbeFailed(format!(
            "invalid duration: {}",
            seconds
        )));
    }
    Ok(seconds.trunc() as u64)
}

/// Duration from container headers (frame count / sample rate)
pub fn probe_duration_symphonia(path: &Path) -> Result<u64, DurationProbeError> {
    let file = std::fs::File::open(path).map_err(|e| {
        DurationProbeError::ProbeFailed(format!("failed to open {}: {}", path.display(), e))
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DurationProbeError::ProbeFailed(format!("unsupported container: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DurationProbeError::ProbeFailed("no audio track found".to_string()))?;

    let params = &track.codec_params;
    match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Ok(frames / rate as u64),
        _ => Err(DurationProbeError::ProbeFailed(
            "container does not declare its length".to_string(),
        )),
    }
}
