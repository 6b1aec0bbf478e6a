pub mod client;
pub mod host;

pub use client::BitbucketClient;
pub use host::SourceHost;
