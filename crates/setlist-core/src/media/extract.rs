//! Clip extraction via ffmpeg

use super::process::{run_with_timeout, tool_available};
use crate::config::ClipEncoding;
use crate::error::SegmentExtractionError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::NamedTempFile;

/// A short encoded excerpt of the source recording.
///
/// Owns its temporary file: the file is deleted when the clip is dropped,
/// whichever way the caller leaves scope.
#[derive(Debug)]
pub struct AudioClip {
    file: NamedTempFile,
    /// Offset in the source, seconds
    pub start_seconds: u64,
    /// Requested clip length, seconds
    pub duration_seconds: u64,
}

impl AudioClip {
    pub fn new(file: NamedTempFile, start_seconds: u64, duration_seconds: u64) -> Self {
        Self {
            file,
            start_seconds,
            duration_seconds,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the encoded clip in bytes
    pub fn len(&self) -> u64 {
        std::fs::metadata(self.path()).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cuts clips out of a source recording
pub trait SegmentExtractor {
    /// One-time check that the decoder can run at all
    fn validate(&self) -> Result<(), SegmentExtractionError> {
        Ok(())
    }

    fn extract(
        &self,
        source: &Path,
        start_seconds: u64,
        clip_seconds: u64,
    ) -> Result<AudioClip, SegmentExtractionError>;
}

/// Extractor backed by an `ffmpeg` subprocess, re-encoding to MP3
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg: String,
    encoding: ClipEncoding,
    timeout: Duration,
    /// Known source length; offsets at or past it fail without spawning ffmpeg
    source_duration: Option<u64>,
    temp_dir: Option<PathBuf>,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg: impl Into<String>, encoding: ClipEncoding) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            encoding,
            timeout: Duration::from_secs(120),
            source_duration: None,
            temp_dir: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_source_duration(mut self, seconds: u64) -> Self {
        self.source_duration = Some(seconds);
        self
    }

    /// Place temporary clips in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// ffmpeg arguments for one clip
    fn build_args(
        &self,
        source: &Path,
        start_seconds: u64,
        clip_seconds: u64,
        output: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            // Input seeking: fast on long sets
            "-ss".to_string(),
            start_seconds.to_string(),
            "-i".to_string(),
            source.display().to_string(),
            "-t".to_string(),
            clip_seconds.to_string(),
            "-vn".to_string(),
            "-acodec".to_string(),
            "libmp3lame".to_string(),
        ];

        if let Some(rate) = self.encoding.sample_rate {
            args.push("-ar".to_string());
            args.push(rate.to_string());
        }
        if let Some(channels) = self.encoding.channels {
            args.push("-ac".to_string());
            args.push(channels.to_string());
        }
        if let Some(kbps) = self.encoding.bitrate_kbps {
            args.push("-b:a".to_string());
            args.push(format!("{}k", kbps));
        }

        args.push("-f".to_string());
        args.push("mp3".to_string());
        args.push("-y".to_string());
        args.push(output.display().to_string());
        args
    }

    fn temp_clip(&self, start_seconds: u64) -> Result<NamedTempFile, SegmentExtractionError> {
        let prefix = format!("setlist_segment_{}_", start_seconds);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".mp3");
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(SegmentExtractionError::TempFile)
    }
}

impl SegmentExtractor for FfmpegExtractor {
    fn validate(&self) -> Result<(), SegmentExtractionError> {
        if !tool_available(&self.ffmpeg, "-version") {
            return Err(SegmentExtractionError::DecoderMissing {
                tool: self.ffmpeg.clone(),
            });
        }
        Ok(())
    }

    fn extract(
        &self,
        source: &Path,
        start_seconds: u64,
        clip_seconds: u64,
    ) -> Result<AudioClip, SegmentExtractionError> {
        if !source.exists() {
            return Err(SegmentExtractionError::SourceNotFound(source.to_path_buf()));
        }
        if let Some(duration) = self.source_duration {
            if start_seconds >= duration {
                return Err(SegmentExtractionError::OffsetBeyondEnd {
                    offset: start_seconds,
                    duration,
                });
            }
        }

        let file = self.temp_clip(start_seconds)?;
        let args = self.build_args(source, start_seconds, clip_seconds, file.path());

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(&args);
        log::debug!("Running ffmpeg: {:?}", cmd);

        let output =
            run_with_timeout(&mut cmd, self.timeout).map_err(|e| SegmentExtractionError::Spawn {
                tool: self.ffmpeg.clone(),
                source: e,
            })?;

        if output.timed_out() {
            return Err(SegmentExtractionError::Timeout {
                tool: self.ffmpeg.clone(),
                seconds: self.timeout.as_secs(),
            });
        }
        if !output.success() {
            return Err(SegmentExtractionError::DecoderFailed {
                tool: self.ffmpeg.clone(),
                code: output.status.and_then(|s| s.code()),
                stderr: output.stderr_tail(),
            });
        }

        let clip = AudioClip::new(file, start_seconds, clip_seconds);
        if clip.is_empty() {
            // ffmpeg exits cleanly when seeking past the end
            return Err(SegmentExtractionError::EmptyClip {
                offset: start_seconds,
            });
        }

        log::debug!(
            "Extracted {}s clip at {}s ({} bytes)",
            clip_seconds,
            start_seconds,
            clip.len()
        );
        Ok(clip)
    }
}
