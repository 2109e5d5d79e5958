// Pull request listing backed by the GitHub upstream

use crate::github::GitHubClient;
use crate::protocol::{ParamType, ParameterDescriptor, ToolDescriptor};
use crate::tools::Tool;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const PULL_REQUESTS_TOOL: &str = "getAllPullRequests";

pub const DEFAULT_STATE: &str = "open";

/// Lists pull requests of the configured repository
pub struct PullRequestsTool {
    client: Arc<GitHubClient>,
}

impl PullRequestsTool {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for PullRequestsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: PULL_REQUESTS_TOOL.to_string(),
            description: "Retrieves all pull requests from the GitHub repository. \
                Returns PR number, title, state, author, and creation date for each pull request. \
                State parameter can be: 'open', 'closed', or 'all'. Defaults to 'open' if not specified."
                .to_string(),
            parameters: vec![ParameterDescriptor::optional(
                "state",
                ParamType::String,
                "Filter pull requests by state: 'open', 'closed', or 'all'",
            )
            .with_default(DEFAULT_STATE)
            .with_allowed(&["open", "closed", "all"])],
        }
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value> {
        let state = arguments
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_STATE);

        tracing::info!(state, "Listing pull requests");

        let pulls = self
            .client
            .list_pull_requests(state)
            .await
            .context("Failed to retrieve pull requests")?;

        tracing::info!(count = pulls.len(), "Retrieved pull requests");

        Ok(serde_json::to_value(pulls)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ToolDispatcher;
    use crate::github::GitHubConfig;
    use crate::protocol::{ToolInvocation, ToolResult};
    use crate::tools::ToolRegistry;
    use serde_json::json;
    use std::time::Duration;
    use toolgate_core::Identity;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn dispatcher_for(server: &MockServer) -> ToolDispatcher {
        let config = GitHubConfig {
            base_url: format!("{}/repos", server.uri()),
            owner: "octo".to_string(),
            repo: "widgets".to_string(),
            ..GitHubConfig::default()
        };
        let client = Arc::new(GitHubClient::new(&config).unwrap());
        let registry = ToolRegistry::builder()
            .register(Arc::new(PullRequestsTool::new(client)))
            .unwrap()
            .build();

        ToolDispatcher::new(Arc::new(registry), Duration::from_secs(35))
    }

    fn pr(number: u64) -> Value {
        json!({
            "number": number,
            "title": "Fix things",
            "state": "open",
            "user": {"login": "hubot"},
            "created_at": "2024-01-02T03:04:05Z",
            "html_url": format!("https://github.com/octo/widgets/pull/{}", number)
        })
    }

    #[tokio::test]
    async fn test_omitted_state_behaves_like_open() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([pr(3)])))
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server).await;
        let caller = Identity::new("tester");

        let omitted = dispatcher
            .invoke(&caller, ToolInvocation::new(PULL_REQUESTS_TOOL))
            .await;
        let explicit = dispatcher
            .invoke(
                &caller,
                ToolInvocation::new(PULL_REQUESTS_TOOL).with_argument("state", "open"),
            )
            .await;

        assert!(omitted.is_success());
        assert_eq!(omitted, explicit);
    }

    #[tokio::test]
    async fn test_upstream_500_is_failure_with_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server exploded"))
            .mount(&server)
            .await;

        let result = dispatcher_for(&server)
            .await
            .invoke(&Identity::new("tester"), ToolInvocation::new(PULL_REQUESTS_TOOL))
            .await;

        match result {
            ToolResult::Failure { message } => {
                assert!(message.starts_with("Failed to retrieve pull requests"));
                assert!(message.contains("500"));
                assert!(message.contains("server exploded"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_upstream_is_empty_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .and(query_param("state", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let result = dispatcher_for(&server)
            .await
            .invoke(
                &Identity::new("tester"),
                ToolInvocation::new(PULL_REQUESTS_TOOL).with_argument("state", "ALL"),
            )
            .await;

        assert_eq!(result, ToolResult::success(json!([])));
    }
}
