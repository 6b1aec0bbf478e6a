use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketRef {
    pub id: String,
    #[serde(default)]
    pub display_id: Option<String>,
    #[serde(default)]
    pub latest_commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketPullRequest {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub from_ref: BitbucketRef,
}

impl BitbucketPullRequest {
    /// Head commit of the source branch, if Bitbucket recorded one.
    pub fn latest_commit(&self) -> Option<&str> {
        self.from_ref
            .latest_commit
            .as_deref()
            .filter(|hash| !hash.is_empty())
    }
}

/// Name of the tag that marks a pull request's head commit.
pub fn pr_tag_name(pr_id: u64) -> String {
    format!("dig-pr_{}", pr_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    Created,
    AlreadyExists,
}
