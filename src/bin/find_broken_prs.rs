use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use prmigrate::github::RateLimiter;
use prmigrate::{BrokenPrScanner, Config, GitHubClient, LogLevel, ScanConfig, Selection};

#[derive(Parser, Debug)]
#[command(name = "find-broken-prs")]
#[command(version)]
#[command(about = "Find pull requests that report no commits and have no diff")]
#[command(after_help = "Examples:
  find-broken-prs --start 1 --end 1000 --dry-run
      check PRs 1 to 999 without creating state files
  find-broken-prs --pr 18057 32559 32599 --dry-run
      check a handful of PRs by number
  find-broken-prs --start 1 --end 40000 --resume
      continue a range after the last PR recorded in the state directory")]
struct Args {
    /// Start value for the range of PRs to check (inclusive)
    #[arg(long)]
    start: Option<u64>,

    /// End value for the range of PRs to check (exclusive)
    #[arg(long)]
    end: Option<u64>,

    /// PR numbers to check
    #[arg(short, long, num_args = 1..)]
    pr: Option<Vec<u64>>,

    /// Skip the part of the range up to the saved resume marker
    #[arg(long)]
    resume: bool,

    /// Directory to store state files
    #[arg(long, default_value = "data")]
    state_dir: PathBuf,

    /// Log what would be written without touching the state directory
    #[arg(long)]
    dry_run: bool,

    /// Log level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, default_value = "INFO")]
    log_level: String,

    /// Repository to check PRs for
    #[arg(long, default_value = "miroapp-dev/server")]
    repo: String,

    /// Soft cap on GitHub requests per minute
    #[arg(long)]
    max_requests_per_minute: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let log_level: LogLevel = args.log_level.parse()?;
    let progress = prmigrate::logging::init(log_level, "find_broken_prs")?;

    // Load environment variables
    tracing::info!("Loading environment variables");
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let selection = Selection::from_args(args.pr.clone(), args.start, args.end)?;

    let github = GitHubClient::new(
        &config.github_token,
        &config.github_api_url,
        RateLimiter::new(args.max_requests_per_minute),
    )?;

    let scan_config = ScanConfig {
        repository: args.repo.clone(),
        state_dir: args.state_dir.clone(),
        dry_run: args.dry_run,
    };
    let scanner = BrokenPrScanner::new(Arc::new(github), scan_config)?.with_progress(progress);

    let selection = if args.resume {
        let marker = scanner.state().read_resume_marker()?;
        match marker {
            Some(marker) => tracing::info!("Resuming after PR {}", marker),
            None => tracing::info!(
                "No resume marker in {}, starting from the beginning",
                args.state_dir.display()
            ),
        }
        selection.resume_after(marker)?
    } else {
        selection
    };

    let summary = scanner.run(selection.iter()).await;

    tracing::info!("Done! {}", summary);
    if let Some(last) = summary.last_visited {
        tracing::info!("Last checked PR: {}", last);
    }

    Ok(())
}
