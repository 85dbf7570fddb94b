use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use mood_merge::config::{DEFAULT_CONFIG_FILE, PipelineConfig};
use mood_merge::pipeline::{Pipeline, PipelineReport};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    match run(&config_path) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &Path) -> Result<PipelineReport> {
    let config = PipelineConfig::load(config_path)?;
    Pipeline::new(config).run()
}

fn print_report(report: &PipelineReport) {
    let counts = &report.unified.counts;
    println!(
        "Unified: {} records ({} bimodal, {} audio only, {} lyrics only)",
        report.unified.rows, counts.bimodal, counts.audio_only, counts.lyrics_only
    );
    for (modality, stats) in &report.scores {
        println!(
            "Scores {modality}: {}/{} with arousal, {}/{} with valence",
            stats.with_arousal, stats.rows, stats.with_valence, stats.rows
        );
    }
    for split in &report.splits {
        println!(
            "Splits {} {}: {} records -> {} ({} overlapping, {} cells with orphan ids)",
            split.modality,
            split.ratio,
            split.rows,
            split.path.display(),
            split.overlaps,
            split.orphans.len()
        );
    }
    let balanced = &report.balanced;
    println!(
        "Balanced: audio={}, lyrics={}, bimodal={}",
        balanced.audio, balanced.lyrics, balanced.bimodal
    );
}
