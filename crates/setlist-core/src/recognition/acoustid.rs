//! AcoustID lookup client
//!
//! The clip is fingerprinted by Chromaprint's `fpcalc`, then the
//! fingerprint is looked up against the AcoustID web service.

use super::{http_client, http_error, RecognitionResult, Recognizer};
use crate::error::RecognitionError;
use crate::media::{run_with_timeout, tool_available, AudioClip};
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;

const INSTALL_HINT: &str = "install chromaprint (provides fpcalc)";

/// `fpcalc -json` output
#[derive(Debug, Deserialize)]
struct FpcalcOutput {
    duration: f64,
    fingerprint: String,
}

/// AcoustID lookup response
#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    #[serde(default)]
    results: Vec<LookupResult>,
    #[serde(default)]
    error: Option<LookupError>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    score: f64,
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    title: Option<String>,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
    joinphrase: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupError {
    code: i64,
    #[serde(default)]
    message: String,
}

pub struct AcoustIdRecognizer {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    fpcalc: String,
    min_score: f64,
    timeout: Duration,
}

impl AcoustIdRecognizer {
    pub fn new(
        api_key: &str,
        endpoint: &str,
        fpcalc: &str,
        min_score: f64,
        timeout: Duration,
    ) -> Result<Self, RecognitionError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            fpcalc: fpcalc.to_string(),
            min_score,
            timeout,
        })
    }

    fn fingerprint(&self, clip: &AudioClip) -> Result<FpcalcOutput, RecognitionError> {
        let mut cmd = Command::new(&self.fpcalc);
        cmd.arg("-json").arg(clip.path());

        let output = run_with_timeout(&mut cmd, self.timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RecognitionError::ToolMissing {
                    tool: self.fpcalc.clone(),
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
                tool: self.fpcalc.clone(),
                message: output.stderr_tail(),
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| RecognitionError::ToolFailed {
                tool: self.fpcalc.clone(),
                message: format!("unreadable output: {}", e),
            })
    }
}

impl Recognizer for AcoustIdRecognizer {
    fn name(&self) -> &str {
        "acoustid"
    }

    fn validate(&self) -> Result<(), RecognitionError> {
        if self.api_key.is_empty() {
            return Err(RecognitionError::MissingCredentials {
                backend: "acoustid".to_string(),
                hint: "set ACOUSTID_API_KEY".to_string(),
            });
        }
        if !tool_available(&self.fpcalc, "-version") {
            return Err(RecognitionError::ToolMissing {
                tool: self.fpcalc.clone(),
                hint: INSTALL_HINT.to_string(),
            });
        }
        Ok(())
    }

    fn recognize(&self, clip: &AudioClip) -> Result<Option<RecognitionResult>, RecognitionError> {
        let fp = self.fingerprint(clip)?;
        let duration = (fp.duration.round() as u64).max(1).to_string();

        let params = [
            ("client", self.api_key.as_str()),
            ("meta", "recordings"),
            ("format", "json"),
            ("duration", duration.as_str()),
            ("fingerprint", fp.fingerprint.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .map_err(|e| http_error(e, self.timeout))?;

        let body = response.text().map_err(|e| http_error(e, self.timeout))?;
        log::debug!("AcoustID response at {}s: {}", clip.start_seconds, body);
        interpret_response(&body, self.min_score)
    }
}

/// First recording of the first result scoring above `min_score`.
///
/// Error codes: 4 invalid application key, 6 invalid user key,
/// 14 too many requests.
fn interpret_response(
    body: &str,
    min_score: f64,
) -> Result<Option<RecognitionResult>, RecognitionError> {
    let response: LookupResponse = serde_json::from_str(body)
        .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

    if response.status != "ok" {
        let error = response.error.ok_or_else(|| {
            RecognitionError::MalformedResponse(format!(
                "status '{}' without error body",
                response.status
            ))
        })?;
        return Err(match error.code {
            4 | 6 => RecognitionError::Auth(error.message),
            14 => RecognitionError::Quota(error.message),
            code => RecognitionError::Service {
                code,
                message: error.message,
            },
        });
    }

    for result in response.results.iter().filter(|r| r.score > min_score) {
        for recording in &result.recordings {
            if let Some(title) = recording.title.as_deref() {
                let artist = join_artists(&recording.artists);
                let artist = (!artist.is_empty()).then_some(artist);
                let matched = RecognitionResult::new(artist.as_deref(), Some(title));
                return Ok(Some(matched.with_confidence(result.score)));
            }
        }
    }
    Ok(None)
}

/// Artist credit as MusicBrainz prints it, e.g. "Daft Punk feat. Romanthony"
fn join_artists(artists: &[Artist]) -> String {
    let mut credit = String::new();
    for (i, artist) in artists.iter().enumerate() {
        credit.push_str(&artist.name);
        match &artist.joinphrase {
            Some(phrase) => credit.push_str(phrase),
            None if i + 1 < artists.len() => credit.push_str("; "),
            None => {}
        }
    }
    credit.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_best_match() {
        let body = r#"{
            "status": "ok",
            "results": [
                {"id": "low", "score": 0.31, "recordings": [{"id": "r0", "title": "Wrong"}]},
                {
                    "id": "9ff43b6a",
                    "score": 0.93,
                    "recordings": [{
                        "id": "cd2e7c47",
                        "title": "One More Time",
                        "artists": [
                            {"id": "a1", "name": "Daft Punk", "joinphrase": " feat. "},
                            {"id": "a2", "name": "Romanthony"}
                        ]
                    }]
                }
            ]
        }"#;
        let result = interpret_response(body, 0.5).unwrap().unwrap();
        assert_eq!(result.artist, "Daft Punk feat. Romanthony");
        assert_eq!(result.title, "One More Time");
        assert_relative_eq!(result.confidence.unwrap(), 0.93);
    }

    #[test]
    fn test_scores_below_threshold() {
        let body = r#"{
            "status": "ok",
            "results": [{"id": "x", "score": 0.42, "recordings": [{"id": "r", "title": "Maybe"}]}]
        }"#;
        assert!(interpret_response(body, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_result_without_recordings() {
        let body = r#"{"status": "ok", "results": [{"id": "x", "score": 0.99}]}"#;
        assert!(interpret_response(body, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_invalid_key() {
        let body = r#"{"status": "error", "error": {"code": 4, "message": "invalid API key"}}"#;
        let err = interpret_response(body, 0.5).unwrap_err();
        assert!(matches!(err, RecognitionError::Auth(_)));
    }

    #[test]
    fn test_rate_limited() {
        let body =
            r#"{"status": "error", "error": {"code": 14, "message": "rate limit exceeded"}}"#;
        assert!(matches!(
            interpret_response(body, 0.5).unwrap_err(),
            RecognitionError::Quota(_)
        ));
    }

    #[test]
    fn test_join_artists_without_phrases() {
        let artists = vec![
            Artist { name: "Bicep".into(), joinphrase: None },
            Artist { name: "Hammer".into(), joinphrase: None },
        ];
        assert_eq!(join_artists(&artists), "Bicep; Hammer");
    }
}
