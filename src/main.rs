use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use issuecast::audio::AudioSynthesizer;
use issuecast::backends;
use issuecast::config_loader::Settings;
use issuecast::gitlab::IssueFetcher;
use issuecast::report::ReportFormatter;

/// Generate podcast audio from GitLab issues
#[derive(Parser, Debug)]
#[command(name = "issuecast")]
#[command(version)]
#[command(about = "Generate podcast audio from GitLab issues", long_about = None)]
struct Args {
    /// Number of days to backtrack for issues/comments
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args.days) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(days: u32) -> issuecast::Result<()> {
    let settings = Settings::new()?;

    let fetcher = IssueFetcher::new(settings.tracker_config());
    let issues = fetcher.fetch_recent_issues(days)?;
    if issues.is_empty() {
        info!("No issues with comments in the last {} day(s)", days);
        return Ok(());
    }

    let formatter = ReportFormatter::new(settings.report_dir());
    let Some(report_path) = formatter.write(&issues, days)? else {
        return Ok(());
    };

    info!("Converting report to audio...");
    let backend = backends::from_settings(&settings)?;
    let synthesizer = AudioSynthesizer::new(backend, settings.audio_dir(), settings.scratch_dir());
    let audio_path = synthesizer.synthesize(&report_path, None, &settings.language)?;
    info!("Audio file generated: {}", audio_path.display());

    Ok(())
}
