// Tool registry, dispatch and the GitHub-backed tools exposed by the gateway

pub mod dispatch;
pub mod github;
pub mod protocol;
pub mod tools;

pub use dispatch::{DispatchError, ToolDispatcher};
pub use github::{GitHubClient, GitHubConfig, PullRequestSummary, UpstreamError};
pub use protocol::{ToolDescriptor, ToolInvocation, ToolResult};
pub use tools::{Tool, ToolRegistry};
