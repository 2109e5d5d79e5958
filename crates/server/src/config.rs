use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use toolgate_core::{AuthConfig, TokenService};
use toolgate_mcp::tools::{AddTool, EchoTool, PullRequestsTool, ToolRegistry};
use toolgate_mcp::{GitHubClient, GitHubConfig, ToolDispatcher};

/// Slack added on top of the upstream timeout before the dispatcher gives up
const DISPATCH_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Seconds between heartbeat frames on `/mcp/sse`
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    30
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Overlay secrets and repository coordinates from the environment
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                tracing::debug!("Using {} from environment", key);
                *target = value;
            }
        };

        set(&mut self.auth.api_key, "TOOLGATE_API_KEY");
        set(&mut self.auth.jwt_secret, "TOOLGATE_JWT_SECRET");
        set(&mut self.github.token, "GITHUB_TOKEN");
        set(&mut self.github.owner, "GITHUB_OWNER");
        set(&mut self.github.repo, "GITHUB_REPO");
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.api_key.is_empty() {
            bail!("auth.api_key must be set (or TOOLGATE_API_KEY)");
        }
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must be set (or TOOLGATE_JWT_SECRET); generate one with `toolgate keygen`");
        }
        if self.stream.heartbeat_secs == 0 {
            bail!("stream.heartbeat_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.stream.heartbeat_secs)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<TokenService>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub api_key: String,
    pub client_subject: String,
    pub heartbeat_interval: Duration,
    /// Cancelled on server shutdown; ends open event streams
    pub shutdown: CancellationToken,
    /// Number of open `/mcp/sse` connections
    pub open_streams: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let token_service =
            Arc::new(TokenService::new(&config.auth).context("Failed to create token service")?);

        let github = Arc::new(
            GitHubClient::new(&config.github).context("Failed to create GitHub client")?,
        );

        let registry = ToolRegistry::builder()
            .register(Arc::new(PullRequestsTool::new(github)))?
            .register(Arc::new(EchoTool))?
            .register(Arc::new(AddTool))?
            .build();

        tracing::info!("Registered {} tools: {:?}", registry.len(), registry.names());

        let dispatcher = Arc::new(ToolDispatcher::new(
            Arc::new(registry),
            config.github.timeout() + DISPATCH_TIMEOUT_MARGIN,
        ));

        Ok(Self {
            token_service,
            dispatcher,
            api_key: config.auth.api_key.clone(),
            client_subject: config.auth.client_subject.clone(),
            heartbeat_interval: config.heartbeat_interval(),
            shutdown: CancellationToken::new(),
            open_streams: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOML: &str = r#"
[auth]
api_key = "file-key"
jwt_secret = "file-secret-file-secret-file-secret!!"
token_ttl_secs = 1800

[github]
owner = "octo"
repo = "widgets"

[stream]
heartbeat_secs = 10
"#;

    #[test]
    fn test_parse_toml_with_defaults() {
        let config: ServerConfig = toml::from_str(TOML).unwrap();

        assert_eq!(config.auth.api_key, "file-key");
        assert_eq!(config.auth.token_ttl_secs, 1800);
        assert_eq!(config.auth.refresh_window_secs, 300);
        assert_eq!(config.github.base_url, "https://api.github.com/repos");
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config: ServerConfig = toml::from_str(TOML).unwrap();
        let env: HashMap<&str, &str> = [
            ("TOOLGATE_API_KEY", "env-key"),
            ("GITHUB_TOKEN", "ghp_env"),
            ("GITHUB_REPO", ""),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.auth.api_key, "env-key");
        assert_eq!(config.github.token, "ghp_env");
        // Empty values do not clobber the file
        assert_eq!(config.github.repo, "widgets");
        assert_eq!(config.auth.jwt_secret, "file-secret-file-secret-file-secret!!");
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        let config = ServerConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_state_registers_tools() {
        let config: ServerConfig = toml::from_str(TOML).unwrap();
        let state = AppState::new(&config).unwrap();

        assert_eq!(
            state.dispatcher.registry().names(),
            vec!["getAllPullRequests", "echo", "add"]
        );
        assert_eq!(state.heartbeat_interval, Duration::from_secs(10));
    }
}
