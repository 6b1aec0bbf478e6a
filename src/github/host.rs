use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DiffStatus, PullRequest};

/// Read access to pull requests on the hosting service being scanned.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Fails with `Error::PullRequestNotFound` when the number does not exist.
    async fn get_pull(&self, repository: &str, number: u64) -> Result<PullRequest>;

    async fn fetch_diff(&self, pull: &PullRequest) -> Result<DiffStatus>;
}
