use serde::{Deserialize, Serialize};

/// Authentication settings for token issuance and validation
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Key expected in the `X-API-KEY` header of token requests
    #[serde(default)]
    pub api_key: String,

    /// Shared HS256 signing secret
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Subject stamped into tokens issued by the token endpoint
    #[serde(default = "default_client_subject")]
    pub client_subject: String,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,

    #[serde(default = "default_refresh_window_secs")]
    pub refresh_window_secs: i64,
}

fn default_issuer() -> String {
    "toolgate".to_string()
}

fn default_client_subject() -> String {
    "mcp-client".to_string()
}

fn default_token_ttl_secs() -> i64 {
    3600
}

fn default_refresh_window_secs() -> i64 {
    300
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            jwt_secret: String::new(),
            issuer: default_issuer(),
            client_subject: default_client_subject(),
            token_ttl_secs: default_token_ttl_secs(),
            refresh_window_secs: default_refresh_window_secs(),
        }
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("client_subject", &self.client_subject)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("refresh_window_secs", &self.refresh_window_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let cfg: AuthConfig = serde_json::from_str(r#"{"api_key": "k"}"#).unwrap();

        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.issuer, "toolgate");
        assert_eq!(cfg.client_subject, "mcp-client");
        assert_eq!(cfg.token_ttl_secs, 3600);
        assert_eq!(cfg.refresh_window_secs, 300);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cfg = AuthConfig {
            api_key: "super-secret-key".to_string(),
            jwt_secret: "super-secret-jwt".to_string(),
            ..AuthConfig::default()
        };

        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
