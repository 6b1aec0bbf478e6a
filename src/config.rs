use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub github_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let github_token = var("GITHUB_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("GITHUB_TOKEN environment variable not set".to_string()))?;

        let github_api_url = var("GITHUB_API_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

        Ok(Self {
            github_token,
            github_api_url,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BitbucketCredentials {
    pub username: String,
    pub token: String,
}

impl BitbucketCredentials {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = var("BB_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("BB_TOKEN environment variable not set".to_string()))?;

        let username = var("BB_USER")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("BB_USER environment variable not set".to_string()))?;

        Ok(Self { username, token })
    }
}

/// Accepted `--log-level` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `tracing` has no level above error, so critical collapses onto it.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(Error::Config(format!(
                "Invalid log level {}. Expected one of DEBUG, INFO, WARNING, ERROR, CRITICAL",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// `owner/name` of the repository whose pull requests are scanned.
    pub repository: String,
    pub state_dir: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub bitbucket_project: String,
    pub bitbucket_repo_slug: String,
    pub bitbucket_repo_url: String,
    pub github_repo_url: String,
    pub repo_dir: PathBuf,
    pub dry_run: bool,
}
