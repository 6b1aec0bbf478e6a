pub mod client;
pub mod host;
pub mod rate_limiter;

pub use client::GitHubClient;
pub use host::PullRequestHost;
pub use rate_limiter::RateLimiter;
