use std::fmt;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::bitbucket::SourceHost;
use crate::config::TransferConfig;
use crate::error::Result;
use crate::mirror::TagMirror;
use crate::models::{pr_tag_name, TagOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub requested: usize,
    pub tagged: usize,
    pub already_tagged: usize,
    pub not_found: usize,
    pub without_commit: usize,
    pub failed: usize,
    pub pushed: usize,
    pub push_failed: usize,
    /// Tags handed to the push phase, in pull request order.
    pub tags: Vec<String>,
}

impl fmt::Display for TransferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} PRs: {} tagged, {} already tagged, {} not found, {} without commits, {} failed; {} tags pushed, {} pushes failed",
            self.requested,
            self.tagged,
            self.already_tagged,
            self.not_found,
            self.without_commit,
            self.failed,
            self.pushed,
            self.push_failed
        )
    }
}

enum TagStep {
    Tagged(String, TagOutcome),
    WouldTag(String),
    NotFound,
    NoCommit,
}

/// Tags each pull request's head commit on the source host, then relays
/// those tags through the local mirror to the destination.
pub struct PrTransfer {
    source: Arc<dyn SourceHost>,
    mirror: Arc<dyn TagMirror>,
    config: TransferConfig,
    progress: MultiProgress,
}

fn progress_bar(progress: &MultiProgress, len: usize, unit: &str) -> ProgressBar {
    let pb = progress.add(ProgressBar::new(len as u64));
    let template = format!(
        "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {}",
        unit
    );
    let style = ProgressStyle::with_template(&template)
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

impl PrTransfer {
    pub fn new(
        source: Arc<dyn SourceHost>,
        mirror: Arc<dyn TagMirror>,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            mirror,
            config,
            progress: MultiProgress::new(),
        }
    }

    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Runs both phases over `pr_ids`. Failures for one pull request or one
    /// tag are logged and never stop the others.
    pub async fn run<I>(&self, pr_ids: I) -> TransferSummary
    where
        I: IntoIterator<Item = u64>,
    {
        let pr_ids = pr_ids.into_iter();
        let total = pr_ids.size_hint().0;
        let mut summary = TransferSummary::default();

        tracing::info!(
            "Scanning PRs for project: {}, repo: {}, total PRs: {}",
            self.config.bitbucket_project,
            self.config.bitbucket_repo_slug,
            total
        );

        let pb = progress_bar(&self.progress, total, "PRs");
        for pr_id in pr_ids {
            summary.requested += 1;
            tracing::info!("Processing PR: {}", pr_id);
            match self.tag_pull_request(pr_id).await {
                Ok(TagStep::Tagged(tag, TagOutcome::Created)) => {
                    summary.tagged += 1;
                    summary.tags.push(tag);
                }
                Ok(TagStep::Tagged(tag, TagOutcome::AlreadyExists)) => {
                    summary.already_tagged += 1;
                    summary.tags.push(tag);
                }
                Ok(TagStep::WouldTag(tag)) => summary.tags.push(tag),
                Ok(TagStep::NotFound) => summary.not_found += 1,
                Ok(TagStep::NoCommit) => summary.without_commit += 1,
                Err(e) => {
                    tracing::error!("Bitbucket API error for PR {}: {}", pr_id, e);
                    summary.failed += 1;
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("Done tagging PRs");
        tracing::info!("Done tagging PRs");

        // Tags created above only exist on the source host until fetched.
        if let Err(e) = self.mirror.fetch_tags().await {
            tracing::error!("Failed to fetch tags into the mirror: {}", e);
        }

        let pb = progress_bar(&self.progress, summary.tags.len(), "tags");
        for tag in &summary.tags {
            pb.inc(1);
            if self.config.dry_run {
                tracing::info!("[dry run] would push tag {} to GitHub", tag);
                continue;
            }

            tracing::info!("Pushing tag {} to GitHub", tag);
            match self.mirror.push_tag(tag).await {
                Ok(()) => summary.pushed += 1,
                Err(e) => {
                    tracing::error!("Error pushing tag {} to GitHub: {}", tag, e);
                    summary.push_failed += 1;
                }
            }
        }
        pb.finish_with_message("Done pushing tags");

        summary
    }

    async fn tag_pull_request(&self, pr_id: u64) -> Result<TagStep> {
        let pull = match self
            .source
            .get_pull_request(
                &self.config.bitbucket_project,
                &self.config.bitbucket_repo_slug,
                pr_id,
            )
            .await
        {
            Ok(pull) => pull,
            Err(e) if e.is_not_found() => {
                tracing::warn!("PR {} not found", pr_id);
                return Ok(TagStep::NotFound);
            }
            Err(e) => return Err(e),
        };
        tracing::debug!("PR: {:?}", pull);

        let Some(commit) = pull.latest_commit() else {
            tracing::warn!("PR {} has no commits", pr_id);
            return Ok(TagStep::NoCommit);
        };

        let tag = pr_tag_name(pull.id);
        tracing::info!("Tagging commit {} with tag {}", commit, tag);

        if self.config.dry_run {
            tracing::info!("[dry run] would create tag {} at {}", tag, commit);
            return Ok(TagStep::WouldTag(tag));
        }

        let outcome = self
            .source
            .create_tag(
                &self.config.bitbucket_project,
                &self.config.bitbucket_repo_slug,
                &tag,
                commit,
            )
            .await?;
        if outcome == TagOutcome::AlreadyExists {
            tracing::info!("Tag {} already exists", tag);
        }

        Ok(TagStep::Tagged(tag, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{BitbucketPullRequest, BitbucketRef};
    use crate::test_support::CapturedLogs;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    struct FakeSource {
        commits: HashMap<u64, Option<String>>,
        broken: HashSet<u64>,
        existing_tags: Mutex<HashSet<String>>,
        events: Events,
    }

    #[async_trait]
    impl SourceHost for FakeSource {
        async fn check_access(&self) -> Result<()> {
            Ok(())
        }

        async fn get_pull_request(
            &self,
            _project: &str,
            _repo_slug: &str,
            id: u64,
        ) -> Result<BitbucketPullRequest> {
            if self.broken.contains(&id) {
                return Err(Error::BitbucketApi("500 Internal Server Error".to_string()));
            }
            let commit = self
                .commits
                .get(&id)
                .ok_or(Error::PullRequestNotFound(id))?;
            Ok(BitbucketPullRequest {
                id,
                title: None,
                state: None,
                from_ref: BitbucketRef {
                    id: format!("refs/heads/pr-{}", id),
                    display_id: None,
                    latest_commit: commit.clone(),
                },
            })
        }

        async fn create_tag(
            &self,
            _project: &str,
            _repo_slug: &str,
            tag_name: &str,
            commit: &str,
        ) -> Result<TagOutcome> {
            self.events
                .lock()
                .unwrap()
                .push(format!("create {} {}", tag_name, commit));
            if commit == "bad" {
                return Err(Error::BitbucketApi("400 Bad Request".to_string()));
            }
            if self.existing_tags.lock().unwrap().insert(tag_name.to_string()) {
                Ok(TagOutcome::Created)
            } else {
                Ok(TagOutcome::AlreadyExists)
            }
        }
    }

    #[derive(Default)]
    struct FakeMirror {
        rejected: HashSet<String>,
        events: Events,
    }

    #[async_trait]
    impl TagMirror for FakeMirror {
        async fn fetch_tags(&self) -> Result<()> {
            self.events.lock().unwrap().push("fetch".to_string());
            Ok(())
        }

        async fn push_tag(&self, tag_name: &str) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("push refs/tags/{}", tag_name));
            if self.rejected.contains(tag_name) {
                return Err(Error::Git(format!("Push rejected for {}", tag_name)));
            }
            Ok(())
        }
    }

    fn config(dry_run: bool) -> TransferConfig {
        TransferConfig {
            bitbucket_project: "RTB".to_string(),
            bitbucket_repo_slug: "server".to_string(),
            bitbucket_repo_url: "https://bitbucket.example.com/scm/rtb/server.git".to_string(),
            github_repo_url: "https://github.com/acme/server".to_string(),
            repo_dir: PathBuf::from("git-repo"),
            dry_run,
        }
    }

    fn fakes(commits: &[(u64, Option<&str>)]) -> (FakeSource, FakeMirror, Events) {
        let events = Events::default();
        let source = FakeSource {
            commits: commits
                .iter()
                .map(|(id, commit)| (*id, commit.map(str::to_string)))
                .collect(),
            events: events.clone(),
            ..Default::default()
        };
        let mirror = FakeMirror {
            events: events.clone(),
            ..Default::default()
        };
        (source, mirror, events)
    }

    fn recorded(events: &Events) -> Vec<String> {
        events.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_tags_then_fetches_then_pushes() {
        let (source, mirror, events) = fakes(&[(42, Some("abc123"))]);
        let transfer = PrTransfer::new(Arc::new(source), Arc::new(mirror), config(false));

        let summary = transfer.run([42]).await;

        assert_eq!(
            recorded(&events),
            vec![
                "create dig-pr_42 abc123",
                "fetch",
                "push refs/tags/dig-pr_42",
            ]
        );
        assert_eq!(summary.tagged, 1);
        assert_eq!(summary.pushed, 1);
        assert_eq!(summary.tags, vec!["dig-pr_42"]);
    }

    #[tokio::test]
    async fn test_second_run_treats_existing_tag_as_success() {
        let (source, mirror, _events) = fakes(&[(42, Some("abc123"))]);
        let transfer = PrTransfer::new(Arc::new(source), Arc::new(mirror), config(false));

        let first = transfer.run([42]).await;
        let second = transfer.run([42]).await;

        assert_eq!(first.tagged, 1);
        assert_eq!(second.tagged, 0);
        assert_eq!(second.already_tagged, 1);
        assert_eq!(second.failed, 0);
        assert_eq!(second.pushed, 1);
    }

    #[tokio::test]
    async fn test_skipped_prs_do_not_block_later_ones() {
        let (mut source, mirror, events) = fakes(&[
            (1, None),
            (3, Some("bad")),
            (5, Some("fff000")),
        ]);
        source.broken.insert(4);
        let transfer = PrTransfer::new(Arc::new(source), Arc::new(mirror), config(false));

        // 2 is missing, 4 errors on lookup
        let summary = transfer.run([1, 2, 3, 4, 5]).await;

        assert_eq!(summary.without_commit, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.tagged, 1);
        assert_eq!(summary.tags, vec!["dig-pr_5"]);
        assert_eq!(
            recorded(&events),
            vec![
                "create dig-pr_3 bad",
                "create dig-pr_5 fff000",
                "fetch",
                "push refs/tags/dig-pr_5",
            ]
        );
    }

    #[tokio::test]
    async fn test_push_failure_does_not_block_other_pushes() {
        let (source, mut mirror, events) = fakes(&[(10, Some("aaa")), (11, Some("bbb"))]);
        mirror.rejected.insert("dig-pr_10".to_string());
        let transfer = PrTransfer::new(Arc::new(source), Arc::new(mirror), config(false));

        let summary = transfer.run([10, 11]).await;

        assert_eq!(summary.push_failed, 1);
        assert_eq!(summary.pushed, 1);
        assert!(recorded(&events).contains(&"push refs/tags/dig-pr_11".to_string()));
    }

    #[tokio::test]
    async fn test_dry_run_creates_and_pushes_nothing() {
        let (source, mirror, events) = fakes(&[(42, Some("abc123"))]);
        let transfer = PrTransfer::new(Arc::new(source), Arc::new(mirror), config(true));

        let summary = transfer.run([42]).await;

        assert_eq!(recorded(&events), vec!["fetch"]);
        assert_eq!(summary.tags, vec!["dig-pr_42"]);
        assert_eq!(summary.tagged, 0);
        assert_eq!(summary.pushed, 0);
    }

    #[test]
    fn test_dry_run_logs_intended_tag_and_push() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (source, mirror, _events) = fakes(&[(42, Some("abc123"))]);
        let transfer = PrTransfer::new(Arc::new(source), Arc::new(mirror), config(true));

        let summary =
            tracing::subscriber::with_default(subscriber, || rt.block_on(transfer.run([42])));

        let output = logs.contents();
        assert!(
            output.contains("[dry run] would create tag dig-pr_42 at abc123"),
            "{}",
            output
        );
        assert!(
            output.contains("[dry run] would push tag dig-pr_42 to GitHub"),
            "{}",
            output
        );
        assert_eq!(summary.requested, 1);
    }

    #[tokio::test]
    async fn test_requested_counts_lazy_input() {
        let (source, mirror, _events) = fakes(&[(3, Some("ccc"))]);
        let transfer = PrTransfer::new(Arc::new(source), Arc::new(mirror), config(false));

        let summary = transfer.run((1..5).filter(|id| id % 2 == 1)).await;

        assert_eq!(summary.requested, 2);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.tagged, 1);
    }
}
