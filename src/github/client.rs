use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

use crate::error::{Error, Result};
use crate::github::host::PullRequestHost;
use crate::github::rate_limiter::RateLimiter;
use crate::models::{DiffStatus, PullRequest};

pub struct GitHubClient {
    client: Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: &str, base_url: &str, rate_limiter: RateLimiter) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("prmigrate/0.1"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            rate_limiter,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_pull_request(&self, repository: &str, number: u64) -> Result<PullRequest> {
        self.rate_limiter.wait().await;
        let url = format!("{}/repos/{}/pulls/{}", self.base_url, repository, number);
        tracing::debug!("Fetching pull request: {}#{}", repository, number);

        let response = self.client.get(&url).send().await?;
        self.rate_limiter.update_from_response(&response).await;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::PullRequestNotFound(number));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GitHubApi(format!(
                "Failed to fetch pull request {}: {} - {}",
                number, status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Requests the raw diff. 404 and 422 both mean GitHub has no diff to
    /// serve for the pull request. Only transport failures are errors.
    pub async fn get_diff_status(&self, diff_url: &str) -> Result<DiffStatus> {
        self.rate_limiter.wait().await;
        tracing::debug!("Fetching diff: {}", diff_url);

        let response = self
            .client
            .get(diff_url)
            .header(header::ACCEPT, "application/vnd.github.diff")
            .send()
            .await?;
        self.rate_limiter.update_from_response(&response).await;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => Ok(DiffStatus::Missing),
            status if status.is_success() => Ok(DiffStatus::Present),
            status => {
                tracing::debug!("Diff {} answered {}", diff_url, status);
                Ok(DiffStatus::Unavailable(status.as_u16()))
            }
        }
    }
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    async fn get_pull(&self, repository: &str, number: u64) -> Result<PullRequest> {
        self.get_pull_request(repository, number).await
    }

    async fn fetch_diff(&self, pull: &PullRequest) -> Result<DiffStatus> {
        self.get_diff_status(&pull.diff_url).await
    }
}
