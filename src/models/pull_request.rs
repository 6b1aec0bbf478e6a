use serde::{Deserialize, Serialize};

/// The slice of a GitHub pull request the scanner needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub commits: u32,
    pub diff_url: String,
}

/// Result of requesting a pull request's raw diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Present,
    /// The diff endpoint answered 404 or 422.
    Missing,
    /// Any other answer, e.g. 406 for a diff too large to render. Says
    /// nothing either way about the pull request.
    Unavailable(u16),
}
