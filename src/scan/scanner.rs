use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::config::ScanConfig;
use crate::error::Result;
use crate::github::PullRequestHost;
use crate::models::{DiffStatus, PullRequest};
use crate::scan::outcome::{Outcome, ScanSummary};
use crate::storage::{LogKind, StateDir};

/// Decides whether a pull request deserves a diff fetch.
pub type SuspicionPredicate = fn(&PullRequest) -> bool;

/// Default heuristic: a pull request reporting zero commits.
pub fn has_no_commits(pull: &PullRequest) -> bool {
    pull.commits == 0
}

/// Walks pull request numbers one at a time and sorts them into the state
/// directory's outcome logs.
pub struct BrokenPrScanner {
    host: Arc<dyn PullRequestHost>,
    state: StateDir,
    config: ScanConfig,
    is_suspicious: SuspicionPredicate,
    progress: MultiProgress,
}

impl BrokenPrScanner {
    pub fn new(host: Arc<dyn PullRequestHost>, config: ScanConfig) -> Result<Self> {
        let state = StateDir::new(&config.state_dir, config.dry_run)?;
        Ok(Self {
            host,
            state,
            config,
            is_suspicious: has_no_commits,
            progress: MultiProgress::new(),
        })
    }

    pub fn with_predicate(mut self, is_suspicious: SuspicionPredicate) -> Self {
        self.is_suspicious = is_suspicious;
        self
    }

    /// Draws the scan's progress bar inside `progress`, the set the logger
    /// suspends around each line.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &StateDir {
        &self.state
    }

    /// Visits every item. Per-item failures land in the exceptions log and
    /// the resume marker advances after each item whatever its outcome.
    pub async fn run<I>(&self, pr_numbers: I) -> ScanSummary
    where
        I: IntoIterator<Item = u64>,
    {
        let pr_numbers = pr_numbers.into_iter();
        let total = pr_numbers.size_hint().0;
        tracing::info!(
            "Scanning {} for broken PRs, total PRs: {}",
            self.config.repository,
            total
        );

        let pb = self.progress.add(ProgressBar::new(total as u64));
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} PRs",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);

        let mut summary = ScanSummary::default();

        for pr_number in pr_numbers {
            tracing::info!("Checking PR number: {}", pr_number);

            let outcome = match self.classify(pr_number).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Exception occurred for PR number {}: {}", pr_number, e);
                    if let Err(e) = self.state.append(LogKind::Exception, pr_number) {
                        tracing::error!("Could not record exception for PR {}: {}", pr_number, e);
                    }
                    Outcome::Error
                }
            };
            summary.record(pr_number, outcome);

            if let Err(e) = self.state.write_resume_marker(pr_number) {
                tracing::error!("Could not advance resume marker to {}: {}", pr_number, e);
            }
            pb.inc(1);
        }

        pb.finish_with_message("Scan complete");
        summary
    }

    async fn classify(&self, pr_number: u64) -> Result<Outcome> {
        let pull = match self.host.get_pull(&self.config.repository, pr_number).await {
            Ok(pull) => pull,
            Err(e) if e.is_not_found() => {
                tracing::info!("PR number: {} not found", pr_number);
                self.state.append(LogKind::NotFound, pr_number)?;
                return Ok(Outcome::NotFound);
            }
            Err(e) => return Err(e),
        };

        if !(self.is_suspicious)(&pull) {
            tracing::debug!("PR number: {} has {} commits", pr_number, pull.commits);
            return Ok(Outcome::Healthy);
        }

        tracing::info!("PR number: {} looks suspiciously empty", pr_number);
        match self.host.fetch_diff(&pull).await? {
            DiffStatus::Missing => {
                tracing::info!("PR number: {} has no diff, marking as broken", pr_number);
                self.state.append(LogKind::Broken, pr_number)?;
                Ok(Outcome::Broken)
            }
            DiffStatus::Present => {
                tracing::warn!(
                    "PR number: {} reports no commits but serves a diff, leaving unclassified",
                    pr_number
                );
                Ok(Outcome::Unclassified)
            }
            DiffStatus::Unavailable(status) => {
                tracing::warn!(
                    "PR number: {} reports no commits and its diff answered {}, leaving unclassified",
                    pr_number,
                    status
                );
                Ok(Outcome::Unclassified)
            }
        }
    }
}
