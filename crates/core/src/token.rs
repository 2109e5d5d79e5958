//! Bearer token issuance and validation with a sliding-refresh window.

use crate::config::AuthConfig;
use crate::identity::Identity;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Minimum shared secret length for HS256 (256 bits)
pub const MIN_SECRET_BYTES: usize = 32;

/// Longest accepted token lifetime (30 days)
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Errors produced while building, issuing or validating tokens
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature does not verify")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Failed to encode token: {0}")]
    Encoding(String),

    #[error("Signing secret must be at least 32 bytes, got {0}")]
    WeakSecret(usize),

    #[error("Invalid token policy: {0}")]
    InvalidPolicy(String),
}

/// Decoded token body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Caller identity
    pub sub: String,
    pub iss: String,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

impl Claims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Request-scoped identity carried by these claims
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub.clone())
    }
}

/// A freshly issued token together with its claims
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues and validates HS256 bearer tokens against a single shared secret.
///
/// The service is built once at startup and shared read-only afterwards.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
    refresh_window: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("refresh_window", &self.refresh_window)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a token service from auth configuration
    pub fn new(config: &AuthConfig) -> Result<Self, TokenError> {
        let secret = config.jwt_secret.as_bytes();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret(secret.len()));
        }

        if config.token_ttl_secs <= 0 || config.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(TokenError::InvalidPolicy(format!(
                "token TTL must be between 1s and {}s, got {}s",
                MAX_TOKEN_TTL_SECS, config.token_ttl_secs
            )));
        }

        if config.refresh_window_secs < 0 || config.refresh_window_secs >= config.token_ttl_secs {
            return Err(TokenError::InvalidPolicy(format!(
                "refresh window ({}s) must be non-negative and shorter than the TTL ({}s)",
                config.refresh_window_secs, config.token_ttl_secs
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            ttl: Duration::seconds(config.token_ttl_secs),
            refresh_window: Duration::seconds(config.refresh_window_secs),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn refresh_window(&self) -> Duration {
        self.refresh_window
    }

    /// Issue a token for `subject`, valid from now for the configured TTL
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))?;

        tracing::debug!(subject = %claims.sub, exp = claims.exp, "Issued token");

        Ok(IssuedToken { token, claims })
    }

    /// Validate a token's signature and expiry
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`.
    ///
    /// The signature is checked first, so a forged token is reported as
    /// `InvalidSignature` even when it has also expired.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the supplied clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        let claims = data.claims;
        if claims.exp <= claims.iat {
            return Err(TokenError::Malformed(
                "expiry is not after issued-at".to_string(),
            ));
        }

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Whether the token is inside its refresh window and should be re-issued
    pub fn should_refresh(&self, claims: &Claims) -> bool {
        self.should_refresh_at(claims, Utc::now())
    }

    /// Refresh check against an explicit clock. The window edge counts as inside.
    pub fn should_refresh_at(&self, claims: &Claims, now: DateTime<Utc>) -> bool {
        now.timestamp() >= claims.exp - self.refresh_window.num_seconds()
    }
}

/// Generate a random 256-bit signing secret, base64-encoded
pub fn generate_secret() -> String {
    let mut key = [0u8; MIN_SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}
