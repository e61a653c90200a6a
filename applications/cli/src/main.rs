//! Refrain command line interface
//!
//! Scans directories for audio files, fingerprints them in parallel, and
//! reports groups of near-duplicate files.

mod report;
mod scanner;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use refrain_audio::{Fingerprinter, FingerprinterConfig, PreprocessConfig};
use refrain_core::{Fingerprint, MatchConfig};
use refrain_index::DuplicateIndex;
use report::ScanReport;
use scanner::FileScanner;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Find duplicate audio files by acoustic fingerprint
#[derive(Debug, Parser)]
#[command(name = "refrain", version, about)]
struct Args {
    /// Directories or audio files to scan
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Minimum similarity for a duplicate verdict (0.0 to 1.0)
    #[arg(long, default_value_t = 0.85)]
    threshold: f64,

    /// Maximum bit error rate for a duplicate verdict (0.0 to 1.0)
    #[arg(long, default_value_t = 0.15)]
    bit_error_threshold: f64,

    /// Minimum distinct hash hits before a file becomes a candidate
    #[arg(long, default_value_t = 5)]
    min_hash_hits: usize,

    /// Worker threads (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Compare exactly two files segment-by-segment instead of scanning
    #[arg(long)]
    sliding_window: bool,

    /// Skip silence trimming before fingerprinting
    #[arg(long)]
    no_trim: bool,

    /// Skip volume normalization before fingerprinting
    #[arg(long)]
    no_normalize: bool,

    /// Follow symbolic links while scanning
    #[arg(long)]
    follow_links: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to size the worker pool")?;
    }

    let files = FileScanner::new().follow_links(args.follow_links).scan(&args.paths);
    if files.is_empty() {
        bail!("no audio files found under the given paths");
    }
    tracing::info!(count = files.len(), "found audio files");

    // Fingerprint in parallel; a failed file is logged and excluded, the
    // scan keeps going.
    let fingerprinter = Fingerprinter::new(FingerprinterConfig {
        preprocess: PreprocessConfig {
            trim_silence: !args.no_trim,
            normalize_volume: !args.no_normalize,
            ..PreprocessConfig::default()
        },
        ..FingerprinterConfig::default()
    });

    let progress = ProgressBar::new(files.len() as u64).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .expect("static progress template"),
    );
    progress.set_message("fingerprinting");

    let fingerprints: Vec<(String, Fingerprint)> = files
        .par_iter()
        .filter_map(|path| {
            let result = fingerprinter.fingerprint_file(path);
            progress.inc(1);
            match result {
                Ok(fingerprint) => Some((path.display().to_string(), fingerprint)),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping file");
                    None
                }
            }
        })
        .collect();
    progress.finish_and_clear();

    if fingerprints.is_empty() {
        bail!("none of the scanned files could be fingerprinted");
    }

    let config = MatchConfig {
        similarity_threshold: args.threshold,
        bit_error_threshold: args.bit_error_threshold,
        hash_threshold: args.min_hash_hits,
        ..MatchConfig::default()
    };
    config.validate().context("invalid matching options")?;

    if args.sliding_window {
        return compare_pair(&fingerprints, config, args.format);
    }

    let index = DuplicateIndex::with_config(config).context("invalid matching options")?;
    index.add_files_batch(fingerprints)?;

    tracing::info!(files = index.file_count(), postings = index.posting_count(), "index built");
    let groups = index.find_all_duplicates_parallel(None);

    let scan_report = ScanReport::new(&index, files.len(), &groups);
    match args.format {
        OutputFormat::Text => print!("{}", scan_report.to_text()),
        OutputFormat::Json => println!("{}", scan_report.to_json()?),
    }

    Ok(())
}

/// Report one segment-by-segment comparison of exactly two files
fn compare_pair(
    fingerprints: &[(String, Fingerprint)],
    config: MatchConfig,
    format: OutputFormat,
) -> Result<()> {
    if fingerprints.len() != 2 {
        bail!(
            "--sliding-window needs exactly two decodable audio files, got {}",
            fingerprints.len()
        );
    }
    let (left_path, left) = &fingerprints[0];
    let (right_path, right) = &fingerprints[1];

    let comparator = refrain_match::FingerprintComparator::new(config);
    let result = comparator.compare_sliding_window(left, right);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!("{left_path}\n{right_path}");
            println!(
                "similarity {:.1}%  bit errors {:.2}%  coverage {:.0}%  offset {} words",
                result.similarity_score * 100.0,
                result.bit_error_rate * 100.0,
                result.coverage_ratio * 100.0,
                result.best_offset
            );
            println!(
                "{} matching segment(s): {}",
                result.matched_segments,
                if result.is_duplicate {
                    "DUPLICATE"
                } else {
                    "not a duplicate"
                }
            );
        }
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
