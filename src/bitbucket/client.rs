use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

use crate::bitbucket::host::SourceHost;
use crate::config::BitbucketCredentials;
use crate::error::{Error, Result};
use crate::models::{BitbucketPullRequest, TagOutcome};

/// Bitbucket Server REST client authenticated with a user/token pair.
pub struct BitbucketClient {
    client: Client,
    credentials: BitbucketCredentials,
    base_url: String,
}

impl BitbucketClient {
    pub fn new(base_url: &str, credentials: BitbucketCredentials) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("prmigrate/0.1"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, api_root: &str, project: &str, repo_slug: &str) -> String {
        format!(
            "{}/{}/projects/{}/repos/{}",
            self.base_url, api_root, project, repo_slug
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.token))
    }

    async fn api_error(context: String, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Error::BitbucketApi(format!("{}: {} - {}", context, status, body))
    }
}

#[async_trait]
impl SourceHost for BitbucketClient {
    async fn check_access(&self) -> Result<()> {
        let url = format!("{}/rest/api/1.0/projects?limit=1", self.base_url);
        let response = self.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::api_error("Failed to list projects".to_string(), response).await);
        }

        let body: serde_json::Value = response.json().await?;
        tracing::debug!("Bitbucket project listing: {}", body);
        Ok(())
    }

    async fn get_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        id: u64,
    ) -> Result<BitbucketPullRequest> {
        let url = format!(
            "{}/pull-requests/{}",
            self.repo_url("rest/api/1.0", project, repo_slug),
            id
        );
        let response = self.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::PullRequestNotFound(id));
        }

        if !response.status().is_success() {
            return Err(
                Self::api_error(format!("Failed to fetch pull request {}", id), response).await,
            );
        }

        Ok(response.json().await?)
    }

    async fn create_tag(
        &self,
        project: &str,
        repo_slug: &str,
        tag_name: &str,
        commit: &str,
    ) -> Result<TagOutcome> {
        let url = format!("{}/tags", self.repo_url("rest/git/1.0", project, repo_slug));
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.token))
            .json(&serde_json::json!({
                "name": tag_name,
                "startPoint": commit,
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(TagOutcome::AlreadyExists),
            status if status.is_success() => Ok(TagOutcome::Created),
            _ => Err(Self::api_error(format!("Failed to create tag {}", tag_name), response).await),
        }
    }
}
