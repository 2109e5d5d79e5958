pub mod builtin;
pub mod pulls;
mod registry;

pub use builtin::{AddTool, EchoTool};
pub use pulls::{PullRequestsTool, PULL_REQUESTS_TOOL};
pub use registry::{RegisteredTool, RegistryError, Tool, ToolRegistry, ToolRegistryBuilder};
