pub mod pull_request;
pub mod bitbucket;

pub use pull_request::*;
pub use bitbucket::*;
