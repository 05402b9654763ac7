//! AudD music recognition API client

use super::{http_client, http_error, RecognitionResult, Recognizer};
use crate::error::RecognitionError;
use crate::media::AudioClip;
use reqwest::blocking::multipart::Form;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// AudD response envelope
#[derive(Debug, Deserialize)]
struct AuddResponse {
    status: String,
    #[serde(default)]
    result: Option<AuddTrack>,
    #[serde(default)]
    error: Option<AuddError>,
}

#[derive(Debug, Deserialize)]
struct AuddTrack {
    artist: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuddError {
    error_code: i64,
    #[serde(default)]
    error_message: String,
}

pub struct AuddRecognizer {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl AuddRecognizer {
    pub fn new(api_key: &str, endpoint: &str, timeout: Duration) -> Result<Self, RecognitionError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            timeout,
        })
    }
}

impl Recognizer for AuddRecognizer {
    fn name(&self) -> &str {
        "audd"
    }

    fn validate(&self) -> Result<(), RecognitionError> {
        if self.api_key.is_empty() {
            return Err(RecognitionError::MissingCredentials {
                backend: "audd".to_string(),
                hint: "set AUDD_API_KEY".to_string(),
            });
        }
        Ok(())
    }

    fn recognize(&self, clip: &AudioClip) -> Result<Option<RecognitionResult>, RecognitionError> {
        let form = Form::new()
            .text("api_token", self.api_key.clone())
            .file("file", clip.path())?;

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| http_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body = response.text().map_err(|e| http_error(e, self.timeout))?;
        log::debug!("AudD response at {}s: {}", clip.start_seconds, body);
        interpret_response(&body)
    }
}

/// Error for a non-success HTTP status
fn status_error(status: StatusCode, body: String) -> RecognitionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RecognitionError::Auth(format!("HTTP {}", status))
        }
        StatusCode::TOO_MANY_REQUESTS => RecognitionError::Quota(format!("HTTP {}", status)),
        _ => RecognitionError::Service {
            code: status.as_u16() as i64,
            message: body,
        },
    }
}

/// Map an AudD JSON body to a result.
///
/// Error codes: 900 invalid token, 901/902 request limit reached.
fn interpret_response(body: &str) -> Result<Option<RecognitionResult>, RecognitionError> {
    let response: AuddResponse =
        serde_json::from_str(body).map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

    match response.status.as_str() {
        "success" => Ok(response
            .result
            .map(|track| RecognitionResult::new(track.artist.as_deref(), track.title.as_deref()))),
        "error" => {
            let error = response.error.ok_or_else(|| {
                RecognitionError::MalformedResponse("error status without error body".to_string())
            })?;
            Err(match error.error_code {
                900 => RecognitionError::Auth(error.error_message),
                901 | 902 => RecognitionError::Quota(error.error_message),
                code => RecognitionError::Service {
                    code,
                    message: error.error_message,
                },
            })
        }
        other => Err(RecognitionError::MalformedResponse(format!(
            "unexpected status '{}'",
            other
        ))),
    }
}
