// Tool protocol types shared by the registry, dispatcher and HTTP surface

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }
}

/// One declared tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Closed set of accepted values, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

impl ParameterDescriptor {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
            allowed: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Catalog entry describing an invocable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterDescriptor>,
}

/// A named invocation with its raw arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a dispatch: exactly one of success or failure.
///
/// Serializes as `{"status":"success","result":…}` or
/// `{"status":"error","error":"…"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ToolResult {
    #[serde(rename = "success")]
    Success {
        #[serde(rename = "result")]
        payload: Value,
    },
    #[serde(rename = "error")]
    Failure {
        #[serde(rename = "error")]
        message: String,
    },
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Response body of `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResponse {
    pub tools: Vec<ToolDescriptor>,
    pub count: usize,
}

impl ListToolsResponse {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        let count = tools.len();
        Self { tools, count }
    }
}

/// Static descriptor of the gateway served by `/mcp/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol: String,
    pub endpoint: String,
    pub tool_count: usize,
    pub tools: Vec<String>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_envelope_shape() {
        let ok = serde_json::to_value(ToolResult::success(json!([1, 2]))).unwrap();
        assert_eq!(ok, json!({"status": "success", "result": [1, 2]}));

        let err = serde_json::to_value(ToolResult::failure("Unknown tool: nope")).unwrap();
        assert_eq!(err, json!({"status": "error", "error": "Unknown tool: nope"}));
    }

    #[test]
    fn test_invocation_arguments_default_to_empty() {
        let invocation: ToolInvocation =
            serde_json::from_value(json!({"name": "getAllPullRequests"})).unwrap();

        assert_eq!(invocation.name, "getAllPullRequests");
        assert!(invocation.arguments.is_empty());
    }

    #[test]
    fn test_parameter_descriptor_wire_shape() {
        let param = ParameterDescriptor::optional("state", ParamType::String, "PR state")
            .with_default("open")
            .with_allowed(&["open", "closed", "all"]);

        let value = serde_json::to_value(&param).unwrap();
        assert_eq!(value["name"], "state");
        assert_eq!(value["type"], "string");
        assert_eq!(value["required"], false);
        assert_eq!(value["default"], "open");
        assert_eq!(value["allowed"], json!(["open", "closed", "all"]));

        let bare = serde_json::to_value(ParameterDescriptor::required(
            "input",
            ParamType::String,
            "text",
        ))
        .unwrap();
        assert!(bare.get("default").is_none());
    }

    #[test]
    fn test_server_info_is_camel_case() {
        let info = ServerInfo {
            name: "toolgate".to_string(),
            version: "0.1.0".to_string(),
            protocol: "SSE".to_string(),
            endpoint: "/mcp/sse".to_string(),
            tool_count: 1,
            tools: vec!["getAllPullRequests".to_string()],
            status: "running".to_string(),
        };

        let value = serde_json::to_value(info).unwrap();
        assert_eq!(value["toolCount"], 1);
        assert_eq!(value["endpoint"], "/mcp/sse");
    }
}
