//! Recognition backends
//!
//! Every backend answers one question per clip: which track is this, if
//! any. The services differ; the contract does not.

mod acoustid;
mod audd;
mod shazam;

pub use acoustid::AcoustIdRecognizer;
pub use audd::AuddRecognizer;
pub use shazam::ShazamRecognizer;

use crate::config::{Backend, SetlistConfig};
use crate::error::RecognitionError;
use crate::media::AudioClip;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

const USER_AGENT: &str = concat!("setlist/", env!("CARGO_PKG_VERSION"));

/// One identified track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub artist: String,
    pub title: String,
    /// Backend match score in 0.0..=1.0, when the service reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl RecognitionResult {
    /// Build a result, substituting placeholders for missing fields
    pub fn new(artist: Option<&str>, title: Option<&str>) -> Self {
        let pick = |value: Option<&str>, fallback: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            artist: pick(artist, UNKNOWN_ARTIST),
            title: pick(title, UNKNOWN_TITLE),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Display label `"artist - title"` with whitespace runs collapsed
    pub fn label(&self) -> String {
        canonical_label(&self.artist, &self.title)
    }
}

/// `"artist - title"`, trimmed, internal whitespace collapsed
pub fn canonical_label(artist: &str, title: &str) -> String {
    collapse_whitespace(&format!("{} - {}", artist.trim(), title.trim()))
}

/// Key used to decide whether two labels name the same track
pub fn label_key(label: &str) -> String {
    collapse_whitespace(label).to_lowercase()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A remote recognition service
pub trait Recognizer {
    fn name(&self) -> &str;

    /// One-time configuration check, run before sampling starts
    fn validate(&self) -> Result<(), RecognitionError>;

    /// Identify `clip`; `Ok(None)` means the service found no match
    fn recognize(&self, clip: &AudioClip) -> Result<Option<RecognitionResult>, RecognitionError>;
}

/// Construct the recognizer selected by `backend`, bounding each call by
/// `timeout` (normally `config.policy(backend).timeout`).
///
/// Missing credentials are reported here, before any sampling.
pub fn build_recognizer(
    backend: Backend,
    config: &SetlistConfig,
    timeout: Duration,
) -> Result<Box<dyn Recognizer>, RecognitionError> {
    let recognizer: Box<dyn Recognizer> = match backend {
        Backend::Audd => {
            let api_key = config
                .audd
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| RecognitionError::MissingCredentials {
                    backend: backend.to_string(),
                    hint: "set AUDD_API_KEY or [audd] api_key; get one at https://audd.io/"
                        .to_string(),
                })?;
            Box::new(AuddRecognizer::new(api_key, &config.audd.endpoint, timeout)?)
        }
        Backend::Shazam => Box::new(ShazamRecognizer::new(&config.shazam.command, timeout)),
        Backend::Acoustid => {
            if config.acoustid.api_key.trim().is_empty() {
                return Err(RecognitionError::MissingCredentials {
                    backend: backend.to_string(),
                    hint: "set ACOUSTID_API_KEY or [acoustid] api_key".to_string(),
                });
            }
            Box::new(AcoustIdRecognizer::new(
                config.acoustid.api_key.trim(),
                &config.acoustid.endpoint,
                &config.acoustid.fpcalc,
                config.acoustid.min_score,
                timeout,
            )?)
        }
    };
    Ok(recognizer)
}

/// Blocking HTTP client shared by the web backends
fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, RecognitionError> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| RecognitionError::Network(e.to_string()))
}

fn http_error(e: reqwest::Error, timeout: Duration) -> RecognitionError {
    if e.is_timeout() {
        RecognitionError::Timeout(timeout.as_secs())
    } else if e.is_decode() {
        RecognitionError::MalformedResponse(e.to_string())
    } else {
        RecognitionError::Network(e.to_string())
    }
}
