//! setlist - Identify the tracks of a DJ set
//!
//! Usage:
//!   setlist <audio>                              # Shazam, every 45s
//!   setlist --backend audd --interval 20 <audio>
//!   setlist --config setlist.toml --json <audio>

use anyhow::{Context, Result};
use clap::Parser;
use setlist_cli::output::{
    default_tracklist_path, print_json_report, progress_line, save_tracklist, EMPTY_HINT,
};
use setlist_cli::{init_logging, load_config};
use setlist_core::{analyze_set, format_tracklist, Backend, SampleOutcome, SetReport};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setlist")]
#[command(about = "Generate a timestamped tracklist for a DJ set", long_about = None)]
struct Args {
    /// Audio or video file of the set
    input: PathBuf,

    /// Seconds between samples (defaults to the backend's interval)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Recognition backend: audd, shazam or acoustid
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tracklist file (defaults to <input stem>_tracklist.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the full JSON report instead of the text tracklist
    #[arg(long)]
    json: bool,

    /// API key for the selected backend
    #[arg(long)]
    api_key: Option<String>,

    #[arg(long, env = "AUDD_API_KEY", hide = true, hide_env_values = true)]
    audd_api_key: Option<String>,

    #[arg(long, env = "ACOUSTID_API_KEY", hide = true, hide_env_values = true)]
    acoustid_api_key: Option<String>,

    /// Suppress per-sample progress
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Explicit --api-key first, then the backend's environment variable
    fn api_key_for(&self, backend: Backend) -> Option<String> {
        self.api_key.clone().or_else(|| match backend {
            Backend::Audd => self.audd_api_key.clone(),
            Backend::Acoustid => self.acoustid_api_key.clone(),
            Backend::Shazam => None,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let (config, backend) = load_config(args.config.as_deref(), args.backend, |backend| {
        args.api_key_for(backend)
    })
    .context("Failed to load configuration")?;

    let mut policy = config.policy(backend);
    if let Some(interval) = args.interval {
        policy = policy.with_interval(interval);
    }
    policy.validate().context("Invalid sampling settings")?;

    if !args.quiet && !args.json {
        eprintln!(
            "Analyzing {} with {} (every {}s, {}s clips)",
            args.input.display(),
            backend,
            policy.interval_seconds,
            policy.clip_seconds
        );
    }

    let start = std::time::Instant::now();
    let show_progress = !args.quiet && !args.json;
    let mut on_sample = |outcome: &SampleOutcome| {
        if show_progress {
            eprintln!("{}", progress_line(outcome));
        }
    };
    let analysis = analyze_set(&args.input, backend, policy, &config, &mut on_sample)
        .with_context(|| format!("Failed to analyze {}", args.input.display()))?;

    log::info!(
        "Analysis completed in {:.1}s: {} samples, {} matched, {} failed",
        start.elapsed().as_secs_f64(),
        analysis.stats.samples,
        analysis.stats.matched,
        analysis.stats.extraction_failures + analysis.stats.recognition_failures
    );

    let text = format_tracklist(&analysis.intervals);
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_tracklist_path(&args.input));
    save_tracklist(&text, &output_path)?;

    if args.json {
        print_json_report(&SetReport::from_analysis(&analysis));
        return Ok(());
    }

    println!("{}", text);
    if analysis.intervals.is_empty() {
        println!("{}", EMPTY_HINT);
    }
    eprintln!("Tracklist saved to {}", output_path.display());

    Ok(())
}
