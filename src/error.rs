use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Bitbucket API error: {0}")]
    BitbucketApi(String),

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pull request not found: {0}")]
    PullRequestNotFound(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl From<git2::Error> for Error {
    fn from(e: git2::Error) -> Self {
        Error::Git(e.message().to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Expected absence of a pull request, as opposed to a failed lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PullRequestNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguished() {
        assert!(Error::PullRequestNotFound(7).is_not_found());
        assert!(!Error::GitHubApi("boom".to_string()).is_not_found());
    }

    #[test]
    fn test_git_error_message_is_kept() {
        let err: Error = git2::Error::from_str("remote rejected").into();
        assert_eq!(err.to_string(), "Git operation failed: remote rejected");
    }
}
