//! Shared helpers for the setlist binaries

pub mod output;

use anyhow::Result;
use setlist_core::{Backend, SetlistConfig};
use std::path::Path;

/// Initialize logger
///
/// Default: warnings only, so per-sample failures stay visible.
/// Verbose: Info level progress from the library.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Load the config file (if any) and apply command-line overrides.
///
/// `api_key` is asked for the key of the finally selected backend.
pub fn load_config(
    path: Option<&Path>,
    backend: Option<Backend>,
    api_key: impl FnOnce(Backend) -> Option<String>,
) -> Result<(SetlistConfig, Backend)> {
    let mut config = SetlistConfig::load_or_default(path)?;
    let backend = backend.unwrap_or(config.analysis.backend);

    if let Some(key) = api_key(backend).filter(|k| !k.trim().is_empty()) {
        match backend {
            Backend::Audd => config.audd.api_key = Some(key),
            Backend::Acoustid => config.acoustid.api_key = key,
            Backend::Shazam => log::warn!("--api-key is ignored by the shazam backend"),
        }
    }

    Ok((config, backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_override() {
        let (config, backend) =
            load_config(None, Some(Backend::Audd), |_| Some("k1".into())).unwrap();
        assert_eq!(backend, Backend::Audd);
        assert_eq!(config.audd.api_key.as_deref(), Some("k1"));

        let (config, _) =
            load_config(None, Some(Backend::Acoustid), |_| Some("k2".into())).unwrap();
        assert_eq!(config.acoustid.api_key, "k2");
    }

    #[test]
    fn test_backend_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setlist.toml");
        std::fs::write(&path, "[analysis]\nbackend = \"acoustid\"\n").unwrap();

        let (_, backend) = load_config(Some(&path), None, |_| None).unwrap();
        assert_eq!(backend, Backend::Acoustid);

        let (_, backend) = load_config(Some(&path), Some(Backend::Audd), |_| None).unwrap();
        assert_eq!(backend, Backend::Audd);
    }

    #[test]
    fn test_blank_api_key_ignored() {
        let (config, _) = load_config(None, Some(Backend::Audd), |_| Some("  ".into())).unwrap();
        assert!(config.audd.api_key.is_none());
    }
}
