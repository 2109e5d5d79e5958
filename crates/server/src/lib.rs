// HTTP surface of the Toolgate gateway: auth gate, tool protocol and event stream

pub mod api;
pub mod config;
pub mod middleware;
pub mod sse;

pub use api::{create_router, serve};
pub use config::{AppState, ServerConfig};
