use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use playback_events::api::{analyze_all, discover, AnalyzerError, EventFormat, PlaybackAnalyzer};
use playback_events::event_detector::AnalyzerConfig;

/// Detect playback events in screen recordings of a video player
#[derive(Parser, Debug)]
#[command(name = "playback-events")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recording: an image-sequence directory, an .mp4 file, or a directory of recordings
    input: PathBuf,

    /// Output directory, one subdirectory per recording
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// JSON5 config file overriding detector parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event log format
    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    format: EventFormat,

    /// Nominal frame rate of image sequences
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Recordings analyzed in parallel (defaults to the number of CPUs)
    #[arg(long)]
    jobs: Option<usize>,
}

fn run(cli: Cli) -> Result<bool, AnalyzerError> {
    let config = match &cli.config {
        Some(path) => AnalyzerConfig::from_json5_file(path)?,
        None => AnalyzerConfig::default(),
    };
    let entries = discover(&cli.input)?;
    let analyzer = PlaybackAnalyzer::create(&cli.output, config, cli.format);

    let results = analyze_all(&analyzer, &entries, cli.fps, cli.jobs)?;
    let mut all_ok = true;
    for (name, result) in results {
        match result {
            Ok(summary) => {
                println!("{}", serde_json::to_string(&summary)?);
                for event in &summary.events {
                    info!("[{}] {}", name, event.to_line());
                }
            }
            Err(e) => {
                error!("❌ {}: {}", name, e);
                all_ok = false;
            }
        }
    }

    let stats = analyzer.stats();
    info!(
        "✅ {} recordings, {} frames, {} events, {} clips",
        stats.runs, stats.frames, stats.events, stats.clips_written
    );
    Ok(all_ok)
}

fn main() -> ExitCode {
    playback_events::init_logging();
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
