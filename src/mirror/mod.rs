pub mod git;

use async_trait::async_trait;

use crate::error::Result;

pub use git::{GitMirror, MirrorCredentials, DESTINATION_REMOTE, SOURCE_REMOTE};

/// Local copy of the source repository that tags are relayed through.
#[async_trait]
pub trait TagMirror: Send + Sync {
    /// Refreshes every tag from the source remote.
    async fn fetch_tags(&self) -> Result<()>;

    /// Pushes `refs/tags/<tag_name>` to the destination remote.
    async fn push_tag(&self, tag_name: &str) -> Result<()>;
}
