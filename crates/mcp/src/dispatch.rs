//! Routes named invocations to registered tools and shapes every outcome
//! into a [`ToolResult`].

use crate::protocol::{ParamType, ParameterDescriptor, ToolDescriptor, ToolInvocation, ToolResult};
use crate::tools::ToolRegistry;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use toolgate_core::Identity;

/// Reasons a dispatch ends in failure
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Tool '{0}' failed unexpectedly")]
    Panicked(String),

    #[error("{0:#}")]
    Handler(anyhow::Error),
}

/// Dispatches tool invocations against a frozen registry
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Invoke a tool on behalf of `caller`. Never fails: every error becomes
    /// a `Failure` result.
    pub async fn invoke(&self, caller: &Identity, invocation: ToolInvocation) -> ToolResult {
        let tool = invocation.name.clone();
        let args = serde_json::Value::Object(invocation.arguments.clone());
        tracing::info!(caller = %caller, tool = %tool, args = %args, "Calling tool");

        match self.try_invoke(invocation).await {
            Ok(payload) => {
                tracing::info!(caller = %caller, tool = %tool, "Tool executed successfully");
                ToolResult::success(payload)
            }
            Err(e) => {
                tracing::error!(caller = %caller, tool = %tool, error = %e, "Error calling tool");
                ToolResult::failure(e.to_string())
            }
        }
    }

    async fn try_invoke(&self, invocation: ToolInvocation) -> Result<Value, DispatchError> {
        let registered = self
            .registry
            .resolve(&invocation.name)
            .ok_or_else(|| DispatchError::UnknownTool(invocation.name.clone()))?;

        let arguments = normalize_arguments(registered.descriptor(), invocation.arguments)?;
        let tool = registered.tool();

        let handle = tokio::spawn(async move { tool.execute(arguments).await });
        let abort = handle.abort_handle();

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(Ok(payload))) => Ok(payload),
            Ok(Ok(Err(e))) => Err(DispatchError::Handler(e)),
            Ok(Err(join_err)) => {
                tracing::error!(tool = %invocation.name, error = %join_err, "Tool task aborted");
                Err(DispatchError::Panicked(invocation.name))
            }
            Err(_) => {
                abort.abort();
                Err(DispatchError::Timeout {
                    tool: invocation.name,
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

/// Fill defaults, normalize and type-check arguments against the descriptor.
///
/// Null counts as absent. Blank strings fall back to the default only for
/// optional parameters. Undeclared arguments are dropped.
pub fn normalize_arguments(
    descriptor: &ToolDescriptor,
    mut arguments: Map<String, Value>,
) -> Result<Map<String, Value>, DispatchError> {
    let mut normalized = Map::new();

    for param in &descriptor.parameters {
        match arguments.remove(&param.name).filter(|v| !v.is_null()) {
            Some(value) if param.required || !is_blank(&value) => {
                normalized.insert(param.name.clone(), normalize_value(param, value)?);
            }
            _ => {
                if let Some(default) = &param.default {
                    normalized.insert(param.name.clone(), default.clone());
                } else if param.required {
                    return Err(DispatchError::MissingArgument(param.name.clone()));
                }
            }
        }
    }

    Ok(normalized)
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.trim().is_empty())
}

fn normalize_value(param: &ParameterDescriptor, value: Value) -> Result<Value, DispatchError> {
    let invalid = |reason: String| DispatchError::InvalidArgument {
        name: param.name.clone(),
        reason,
    };

    let type_matches = match param.param_type {
        ParamType::String => value.is_string(),
        ParamType::Integer => value.is_i64() || value.is_u64(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
    };
    if !type_matches {
        return Err(invalid(format!(
            "expected {}, got {}",
            param.param_type.as_str(),
            json_type_name(&value)
        )));
    }

    let Some(allowed) = &param.allowed else {
        return Ok(value);
    };

    let candidate = match &value {
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string(),
    };

    if allowed.iter().any(|a| a.eq_ignore_ascii_case(&candidate)) {
        Ok(Value::String(candidate))
    } else {
        Err(invalid(format!(
            "'{}' is not one of: {}",
            candidate,
            allowed.join(", ")
        )))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
