pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod selection;
pub mod storage;
pub mod github;
pub mod bitbucket;
pub mod mirror;
pub mod scan;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{BitbucketCredentials, Config, LogLevel, ScanConfig, TransferConfig};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use bitbucket::BitbucketClient;
pub use mirror::{GitMirror, MirrorCredentials};
pub use scan::BrokenPrScanner;
pub use selection::Selection;
pub use storage::StateDir;
pub use transfer::PrTransfer;
