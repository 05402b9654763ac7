//! Configuration for set analysis
//!
//! TOML-based configuration selecting the recognition backend and the
//! per-backend sampling, rate-limit and encoding parameters. Every section
//! is optional; missing values fall back to the backend's defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Public AcoustID application key (non-commercial use)
pub const DEFAULT_ACOUSTID_KEY: &str = "8XaBELgH";

/// Recognition backend
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Audd,
    #[default]
    Shazam,
    Acoustid,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Audd => "audd",
            Backend::Shazam => "shazam",
            Backend::Acoustid => "acoustid",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audd" => Ok(Backend::Audd),
            "shazam" => Ok(Backend::Shazam),
            "acoustid" => Ok(Backend::Acoustid),
            other => Err(format!(
                "unknown backend '{}' (expected audd, shazam or acoustid)",
                other
            )),
        }
    }
}

/// Encoder knobs for the extracted clip. `None` leaves the encoder default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipEncoding {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bitrate_kbps: Option<u32>,
}

/// Sampling and rate-limit policy for one backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendPolicy {
    /// Seconds between sample offsets
    pub interval_seconds: u64,
    /// Length of each extracted clip
    pub clip_seconds: u64,
    /// Pause after every recognition call
    pub request_gap: Duration,
    /// Upper bound on one recognition call
    pub timeout: Duration,
    pub encoding: ClipEncoding,
}

impl BackendPolicy {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_seconds == 0 {
            anyhow::bail!("interval_seconds must be > 0");
        }
        if self.clip_seconds == 0 {
            anyhow::bail!("clip_seconds must be > 0");
        }
        if self.timeout.is_zero() {
            anyhow::bail!("timeout must be > 0");
        }
        Ok(())
    }

    /// Same policy with a different sampling interval
    pub fn with_interval(mut self, interval_seconds: u64) -> Self {
        self.interval_seconds = interval_seconds;
        self
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SetlistConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub audd: AuddConfig,
    #[serde(default)]
    pub shazam: ShazamConfig,
    #[serde(default)]
    pub acoustid: AcoustIdConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub backend: Backend,
}

/// External decoder settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub timeout_seconds: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Sampling knobs accepted in every backend section. Unset values keep
/// the backend's default policy.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SamplingOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_gap_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
}

impl SamplingOverrides {
    pub fn apply(&self, mut policy: BackendPolicy) -> BackendPolicy {
        if let Some(interval) = self.interval_seconds {
            policy.interval_seconds = interval;
        }
        if let Some(clip) = self.clip_seconds {
            policy.clip_seconds = clip;
        }
        if let Some(gap) = self.request_gap_ms {
            policy.request_gap = Duration::from_millis(gap);
        }
        if let Some(timeout) = self.timeout_seconds {
            policy.timeout = Duration::from_secs(timeout);
        }
        if self.sample_rate.is_some() {
            policy.encoding.sample_rate = self.sample_rate;
        }
        if self.channels.is_some() {
            policy.encoding.channels = self.channels;
        }
        if self.bitrate_kbps.is_some() {
            policy.encoding.bitrate_kbps = self.bitrate_kbps;
        }
        policy
    }
}

impl Backend {
    /// Built-in sampling policy
    pub fn default_policy(&self) -> BackendPolicy {
        match self {
            // Free tier allows one request per second
            Backend::Audd => BackendPolicy {
                interval_seconds: 30,
                clip_seconds: 10,
                request_gap: Duration::from_millis(1000),
                timeout: Duration::from_secs(30),
                encoding: ClipEncoding::default(),
            },
            Backend::Shazam => BackendPolicy {
                interval_seconds: 45,
                clip_seconds: 12,
                request_gap: Duration::ZERO,
                timeout: Duration::from_secs(30),
                encoding: ClipEncoding {
                    sample_rate: Some(44100),
                    channels: Some(1),
                    bitrate_kbps: Some(128),
                },
            },
            Backend::Acoustid => BackendPolicy {
                interval_seconds: 30,
                clip_seconds: 10,
                request_gap: Duration::from_millis(500),
                timeout: Duration::from_secs(30),
                encoding: ClipEncoding::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuddConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    #[serde(flatten)]
    pub sampling: SamplingOverrides,
}

impl Default for AuddConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.audd.io/".to_string(),
            sampling: SamplingOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShazamConfig {
    /// songrec binary used for signature generation and lookup
    pub command: String,
    #[serde(flatten)]
    pub sampling: SamplingOverrides,
}

impl Default for ShazamConfig {
    fn default() -> Self {
        Self {
            command: "songrec".to_string(),
            sampling: SamplingOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcoustIdConfig {
    pub api_key: String,
    pub endpoint: String,
    /// Chromaprint fingerprint calculator
    pub fpcalc: String,
    pub min_score: f64,
    #[serde(flatten)]
    pub sampling: SamplingOverrides,
}

impl Default for AcoustIdConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_ACOUSTID_KEY.to_string(),
            endpoint: "https://api.acoustid.org/v2/lookup".to_string(),
            fpcalc: "fpcalc".to_string(),
            min_score: 0.5,
            sampling: SamplingOverrides::default(),
        }
    }
}

impl SetlistConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: SetlistConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Sampling policy for `backend`
    pub fn policy(&self, backend: Backend) -> BackendPolicy {
        match backend {
            Backend::Audd => self.audd.sampling.apply(backend.default_policy()),
            Backend::Shazam => self.shazam.sampling.apply(backend.default_policy()),
            Backend::Acoustid => self.acoustid.sampling.apply(backend.default_policy()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.media.timeout_seconds == 0 {
            anyhow::bail!("media.timeout_seconds must be > 0");
        }
        for backend in [Backend::Audd, Backend::Shazam, Backend::Acoustid] {
            self.policy(backend)
                .validate()
                .map_err(|e| anyhow::anyhow!("[{}] {}", backend, e))?;
        }
        if !(0.0..=1.0).contains(&self.acoustid.min_score) {
            anyhow::bail!("acoustid.min_score must be within 0.0..=1.0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        let config = SetlistConfig::default();

        let audd = config.policy(Backend::Audd);
        assert_eq!(audd.interval_seconds, 30);
        assert_eq!(audd.clip_seconds, 10);
        assert_eq!(audd.request_gap, Duration::from_secs(1));

        let shazam = config.policy(Backend::Shazam);
        assert_eq!(shazam.interval_seconds, 45);
        assert_eq!(shazam.clip_seconds, 12);
        assert_eq!(shazam.encoding.sample_rate, Some(44100));
        assert_eq!(shazam.encoding.channels, Some(1));

        let acoustid = config.policy(Backend::Acoustid);
        assert_eq!(acoustid.request_gap, Duration::from_millis(500));
        assert_eq!(config.acoustid.api_key, DEFAULT_ACOUSTID_KEY);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [analysis]
            backend = "audd"

            [audd]
            api_key = "secret"
            interval_seconds = 20
        "#;

        let config: SetlistConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.analysis.backend, Backend::Audd);
        assert_eq!(config.audd.api_key.as_deref(), Some("secret"));

        let policy = config.policy(Backend::Audd);
        assert_eq!(policy.interval_seconds, 20);
        // Unspecified fields keep the section defaults
        assert_eq!(policy.request_gap, Duration::from_secs(1));
        assert_eq!(config.media.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_parse_empty_toml() {
        let config: SetlistConfig = toml::from_str("").unwrap();
        assert_eq!(config.analysis.backend, Backend::Shazam);
        assert_eq!(config.shazam.command, "songrec");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let toml_str = r#"
            [shazam]
            interval_seconds = 0
        "#;
        let config: SetlistConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("AudD".parse::<Backend>().unwrap(), Backend::Audd);
        assert_eq!(" acoustid ".parse::<Backend>().unwrap(), Backend::Acoustid);
        assert!("acrcloud".parse::<Backend>().is_err());
    }
}
