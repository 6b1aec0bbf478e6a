use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BitbucketPullRequest, TagOutcome};

/// The hosting service pull requests are transferred from.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Cheap authenticated request used to fail fast on bad credentials.
    async fn check_access(&self) -> Result<()>;

    /// Fails with `Error::PullRequestNotFound` when the id does not exist.
    async fn get_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        id: u64,
    ) -> Result<BitbucketPullRequest>;

    /// Creating a tag that already exists reports `TagOutcome::AlreadyExists`.
    async fn create_tag(
        &self,
        project: &str,
        repo_slug: &str,
        tag_name: &str,
        commit: &str,
    ) -> Result<TagOutcome>;
}
