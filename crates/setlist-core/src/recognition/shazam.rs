//! Shazam recognition through the `songrec` command-line client
//!
//! songrec computes the Shazam signature for the clip and performs the
//! lookup; its stdout is the raw Shazam JSON response.

use super::{RecognitionResult, Recognizer};
use crate::error::RecognitionError;
use crate::media::{run_with_timeout, tool_available, AudioClip};
use std::process::Command;
use std::time::Duration;

const INSTALL_HINT: &str = "install songrec: https://github.com/marin-m/SongRec";

pub struct ShazamRecognizer {
    command: String,
    timeout: Duration,
}

impl ShazamRecognizer {
    pub fn new(command: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            timeout,
        }
    }
}

impl Recognizer for ShazamRecognizer {
    fn name(&self) -> &str {
        "shazam"
    }

    fn validate(&self) -> Result<(), RecognitionError> {
        if !tool_available(&self.command, "--version") {
            return Err(RecognitionError::ToolMissing {
                tool: self.command.clone(),
                hint: INSTALL_HINT.to_string(),
            });
        }
        Ok(())
    }

    fn recognize(&self, clip: &AudioClip) -> Result<Option<RecognitionResult>, RecognitionError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("audio-file-to-recognized-song").arg(clip.path());

        let output = run_with_timeout(&mut cmd, self.timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RecognitionError::ToolMissing {
                    tool: self.command.clone(),
                    hint: INSTALL_HINT.to_string(),
                }
            } else {
                RecognitionError::Io(e)
            }
        })?;

        if output.timed_out() {
            return Err(RecognitionError::Timeout(self.timeout.as_secs()));
        }
        if !output.success() {
            return Err(RecognitionError::ToolFailed {
                tool: self.command.clone(),
                message: output.stderr_tail(),
            });
        }

        let body = String::from_utf8_lossy(&output.stdout);
        log::debug!("Shazam response at {}s: {}", clip.start_seconds, body);
        interpret_response(&body)
    }
}

/// A response carrying `track` is a match: `subtitle` is the artist.
fn interpret_response(body: &str) -> Result<Option<RecognitionResult>, RecognitionError> {
    let json: serde_json::Value = serde_json::from_str(body.trim())
        .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

    if !json.is_object() {
        return Err(RecognitionError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }

    let Some(track) = json.get("track") else {
        return Ok(None);
    };

    let title = track.get("title").and_then(|v| v.as_str());
    let artist = track.get("subtitle").and_then(|v| v.as_str());
    Ok(Some(RecognitionResult::new(artist, title)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match() {
        let body = r#"{
            "matches": [{"id": "1", "offset": 31.4}],
            "track": {
                "key": "551234",
                "title": "Finally",
                "subtitle": "Kings Of Tomorrow",
                "images": {"coverart": "https://example.invalid/a.jpg"}
            },
            "tagid": "E1C2"
        }"#;
        let result = interpret_response(body).unwrap().unwrap();
        assert_eq!(result.artist, "Kings Of Tomorrow");
        assert_eq!(result.title, "Finally");
    }

    #[test]
    fn test_no_match() {
        let body = r#"{"matches": [], "tagid": "E1C2", "retryms": 12000}"#;
        assert!(interpret_response(body).unwrap().is_none());
    }

    #[test]
    fn test_track_without_subtitle() {
        let body = r#"{"track": {"title": "ID"}}"#;
        let result = interpret_response(body).unwrap().unwrap();
        assert_eq!(result.artist, super::super::UNKNOWN_ARTIST);
    }

    #[test]
    fn test_garbage_output() {
        assert!(matches!(
            interpret_response("Error: no audio").unwrap_err(),
            RecognitionError::MalformedResponse(_)
        ));
    }

    #[test]
    fn test_missing_tool_is_fatal() {
        let recognizer = ShazamRecognizer::new("setlist-missing-songrec", Duration::from_secs(5));
        let err = recognizer.validate().unwrap_err();
        assert!(err.is_fatal());
    }
}
