//! setlist-identify - Recognize a single clip of a recording
//!
//! Usage: setlist-identify [--at SECONDS] [--backend B] <audio>
//!
//! Useful to check credentials and tool installation before analyzing a
//! whole set.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use setlist_cli::{init_logging, load_config};
use setlist_core::media::probe_duration_with;
use setlist_core::{build_recognizer, Backend, FfmpegExtractor, RecognitionResult, SegmentExtractor};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "setlist-identify")]
#[command(about = "Identify the track playing at one offset", long_about = None)]
struct Args {
    /// Audio or video file
    input: PathBuf,

    /// Offset of the clip in seconds
    #[arg(short, long, default_value_t = 0)]
    at: u64,

    /// Recognition backend: audd, shazam or acoustid
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API key for the selected backend
    #[arg(long)]
    api_key: Option<String>,

    #[arg(long, env = "AUDD_API_KEY", hide = true, hide_env_values = true)]
    audd_api_key: Option<String>,

    #[arg(long, env = "ACOUSTID_API_KEY", hide = true, hide_env_values = true)]
    acoustid_api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct IdentifyOutput {
    source_path: String,
    backend: String,
    offset_seconds: u64,
    clip_seconds: u64,
    duration_seconds: u64,
    result: Option<RecognitionResult>,
    label: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let (config, backend) = load_config(args.config.as_deref(), args.backend, |backend| {
        args.api_key.clone().or_else(|| match backend {
            Backend::Audd => args.audd_api_key.clone(),
            Backend::Acoustid => args.acoustid_api_key.clone(),
            Backend::Shazam => None,
        })
    })
    .context("Failed to load configuration")?;
    let policy = config.policy(backend);

    let recognizer = build_recognizer(backend, &config, policy.timeout)?;
    recognizer.validate()?;

    let duration_seconds = probe_duration_with(&args.input, &config.media.ffprobe)?;
    if args.at >= duration_seconds {
        anyhow::bail!(
            "Offset {}s is past the end of {} ({}s)",
            args.at,
            args.input.display(),
            duration_seconds
        );
    }

    let extractor = FfmpegExtractor::new(&config.media.ffmpeg, policy.encoding.clone())
        .with_timeout(Duration::from_secs(config.media.timeout_seconds))
        .with_source_duration(duration_seconds);

    extractor.validate()?;
    log::info!("Extracting {}s clip at {}s", policy.clip_seconds, args.at);
    let clip = extractor.extract(&args.input, args.at, policy.clip_seconds)?;

    let start = std::time::Instant::now();
    let result = recognizer.recognize(&clip)?;
    log::info!("{} answered in {:.2}s", recognizer.name(), start.elapsed().as_secs_f64());

    let output = IdentifyOutput {
        source_path: args.input.display().to_string(),
        backend: backend.to_string(),
        offset_seconds: args.at,
        clip_seconds: policy.clip_seconds,
        duration_seconds,
        label: result.as_ref().map(RecognitionResult::label),
        result,
    };

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }

    Ok(())
}
