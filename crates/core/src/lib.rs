// Core types for the Toolgate token-gated tool gateway

pub mod config;
pub mod identity;
pub mod token;

pub use config::AuthConfig;
pub use identity::Identity;
pub use token::{generate_secret, Claims, IssuedToken, TokenError, TokenService};
