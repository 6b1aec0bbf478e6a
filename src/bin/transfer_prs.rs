use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use prmigrate::bitbucket::SourceHost;
use prmigrate::selection::parse_id_lines;
use prmigrate::{
    BitbucketClient, BitbucketCredentials, Config, GitMirror, LogLevel, MirrorCredentials,
    PrTransfer, Selection, TransferConfig,
};

#[derive(Parser, Debug)]
#[command(name = "transfer-prs")]
#[command(version)]
#[command(about = "Transfer PRs from Bitbucket to GitHub")]
#[command(long_about = "Transfer PRs from Bitbucket to GitHub.

Tags the latest commit of each Bitbucket PR as dig-pr_<id>, fetches the tags \
into a local mirror and pushes them to the GitHub repository. PR ids come from \
--pr-ids, --start/--end, or newline separated on stdin.")]
struct Args {
    /// Bitbucket repository URL
    #[arg(long, default_value = "https://code.devrtb.com/scm/rtb/server.git")]
    bb_repo_url: String,

    /// Bitbucket API URL
    #[arg(long, default_value = "https://code.devrtb.com")]
    bb_api_url: String,

    /// GitHub repository URL
    #[arg(long, default_value = "https://github.com/miroapp-dev/server")]
    gh_repo_url: String,

    /// List of PR IDs to tag
    #[arg(long, num_args = 1..)]
    pr_ids: Option<Vec<u64>>,

    /// Start of a range of PR IDs to tag (inclusive)
    #[arg(long)]
    start: Option<u64>,

    /// End of a range of PR IDs to tag (exclusive)
    #[arg(long)]
    end: Option<u64>,

    /// Log intended tags and pushes without creating or pushing anything
    #[arg(long)]
    dry_run: bool,

    /// Log level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, default_value = "INFO")]
    log_level: String,

    /// Directory to store the git mirror
    #[arg(long, default_value = "git-repo")]
    repo_dir: PathBuf,

    /// Bitbucket project key
    #[arg(long, default_value = "RTB")]
    bb_project: String,

    /// Bitbucket repository slug
    #[arg(long, default_value = "server")]
    bb_repo_slug: String,

    /// Clone and fetch depth for the mirror
    #[arg(long, default_value = "1")]
    depth: i32,
}

fn resolve_selection(args: &Args) -> anyhow::Result<Selection> {
    if args.pr_ids.is_some() || args.start.is_some() || args.end.is_some() {
        return Ok(Selection::from_args(
            args.pr_ids.clone(),
            args.start,
            args.end,
        )?);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        anyhow::bail!("Please provide either --pr-ids, --start and --end, or input data via stdin");
    }

    tracing::info!("Reading PR IDs from stdin");
    let input = io::read_to_string(stdin)?;
    Ok(Selection::List(parse_id_lines(&input)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let log_level: LogLevel = args.log_level.parse()?;
    let progress = prmigrate::logging::init(log_level, "transfer_prs")?;

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let bitbucket_credentials = BitbucketCredentials::from_env()?;

    let selection = resolve_selection(&args)?;

    let transfer_config = TransferConfig {
        bitbucket_project: args.bb_project.clone(),
        bitbucket_repo_slug: args.bb_repo_slug.clone(),
        bitbucket_repo_url: args.bb_repo_url.clone(),
        github_repo_url: args.gh_repo_url.clone(),
        repo_dir: args.repo_dir.clone(),
        dry_run: args.dry_run,
    };

    tracing::info!("Bitbucket repository URL: {}", transfer_config.bitbucket_repo_url);

    // Prepare the mirror
    let mirror_credentials = MirrorCredentials {
        source_username: bitbucket_credentials.username.clone(),
        source_token: bitbucket_credentials.token.clone(),
        destination_token: config.github_token.clone(),
    };
    let mirror = GitMirror::open_or_clone(
        &transfer_config.bitbucket_repo_url,
        &transfer_config.repo_dir,
        mirror_credentials,
        Some(args.depth),
        progress.clone(),
    )
    .await?;
    mirror
        .ensure_destination(&transfer_config.github_repo_url)
        .await?;

    // Fail fast on bad Bitbucket credentials
    tracing::info!("Checking Bitbucket API");
    let bitbucket = BitbucketClient::new(&args.bb_api_url, bitbucket_credentials)?;
    bitbucket.check_access().await?;

    let transfer = PrTransfer::new(Arc::new(bitbucket), Arc::new(mirror), transfer_config)
        .with_progress(progress);
    let summary = transfer.run(selection.iter()).await;

    tracing::info!("Done! {}", summary);

    Ok(())
}
