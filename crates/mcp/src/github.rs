//! Minimal GitHub REST client used by the pull-request tool.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Connection settings for the GitHub upstream
#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Repositories API root; `{owner}/{repo}/pulls` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value of the `X-GitHub-Api-Version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Bearer credential; requests go out unauthenticated when empty
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.github.com/repos".to_string()
}

fn default_api_version() -> String {
    "2022-11-28".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Failures talking to the GitHub upstream
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("GitHub API error {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("GitHub API request timed out after {0}s")]
    Timeout(u64),

    #[error("GitHub API request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to decode GitHub API response: {0}")]
    Decode(String),

    #[error("Invalid GitHub client configuration: {0}")]
    Config(String),
}

/// Pull request as returned by the GitHub API (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
struct GitHubPullRequest {
    number: u64,
    title: String,
    state: String,
    user: Option<GitHubUser>,
    created_at: String,
    html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubUser {
    login: String,
}

/// Projected pull request record handed to tool callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    pub created_at: String,
    pub url: String,
}

impl From<GitHubPullRequest> for PullRequestSummary {
    fn from(pr: GitHubPullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            state: pr.state,
            // GitHub nulls the user of deleted accounts
            author: pr.user.map(|u| u.login).unwrap_or_else(|| "ghost".to_string()),
            created_at: pr.created_at,
            url: pr.html_url,
        }
    }
}

/// GitHub REST client bound to one repository
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    pulls_url: Url,
    timeout_secs: u64,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, UpstreamError> {
        if config.owner.trim().is_empty() || config.repo.trim().is_empty() {
            return Err(UpstreamError::Config(
                "owner and repo must both be set".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            header::HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_str(&config.api_version)
                .map_err(|_| UpstreamError::Config("Invalid API version format".to_string()))?,
        );

        if !config.token.is_empty() {
            let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|_| UpstreamError::Config("Invalid bearer token format".to_string()))?;
            auth.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth);
        }

        let http = Client::builder()
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::Config(e.to_string()))?;

        let pulls_url = pulls_url(&config.base_url, &config.owner, &config.repo)?;

        Ok(Self {
            http,
            pulls_url,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn pulls_url(&self) -> &Url {
        &self.pulls_url
    }

    /// Fetch pull requests in the given state and project them to summaries
    pub async fn list_pull_requests(
        &self,
        state: &str,
    ) -> Result<Vec<PullRequestSummary>, UpstreamError> {
        tracing::debug!(url = %self.pulls_url, state, "Fetching pull requests");

        let response = self
            .http
            .get(self.pulls_url.clone())
            .query(&[("state", state)])
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "GitHub API error");
            return Err(UpstreamError::Status { status, body });
        }

        let pulls: Vec<GitHubPullRequest> = response
            .json()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if pulls.is_empty() {
            tracing::info!(state, "No pull requests found");
        }

        Ok(pulls.into_iter().map(PullRequestSummary::from).collect())
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout_secs)
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err)
        }
    }
}

fn pulls_url(base: &str, owner: &str, repo: &str) -> Result<Url, UpstreamError> {
    let mut url = Url::parse(base)
        .map_err(|e| UpstreamError::Config(format!("Invalid base URL {}: {}", base, e)))?;

    url.path_segments_mut()
        .map_err(|_| UpstreamError::Config(format!("Base URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .push(owner.trim())
        .push(repo.trim())
        .push("pulls");

    Ok(url)
}
