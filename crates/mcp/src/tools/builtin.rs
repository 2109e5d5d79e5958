// Small self-contained tools, handy for probing a deployment

use crate::protocol::{ParamType, ParameterDescriptor, ToolDescriptor};
use crate::tools::Tool;
use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

/// Echoes its input back
pub struct EchoTool;

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".to_string(),
            description: "Echoes the given input back to the caller.".to_string(),
            parameters: vec![ParameterDescriptor::required(
                "input",
                ParamType::String,
                "Text to echo",
            )],
        }
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value> {
        let input = arguments
            .get("input")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("input must be a string"))?;

        Ok(Value::String(format!("Echo: {}", input)))
    }
}

/// Adds two integers
pub struct AddTool;

#[async_trait::async_trait]
impl Tool for AddTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "add".to_string(),
            description: "Adds two integers and returns the sum.".to_string(),
            parameters: vec![
                ParameterDescriptor::required("a", ParamType::Integer, "First operand"),
                ParameterDescriptor::required("b", ParamType::Integer, "Second operand"),
            ],
        }
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value> {
        let operand = |name: &str| {
            arguments
                .get(name)
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow!("{} must be an integer", name))
        };

        let a = operand("a")?;
        let b = operand("b")?;
        let sum = a
            .checked_add(b)
            .ok_or_else(|| anyhow!("Integer overflow adding {} and {}", a, b))?;

        Ok(Value::from(sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_echo() {
        let out = EchoTool.execute(args(json!({"input": "hi"}))).await.unwrap();
        assert_eq!(out, json!("Echo: hi"));
    }

    #[tokio::test]
    async fn test_add() {
        let out = AddTool.execute(args(json!({"a": 2, "b": -5}))).await.unwrap();
        assert_eq!(out, json!(-3));
    }

    #[tokio::test]
    async fn test_add_overflow_is_error() {
        let err = AddTool
            .execute(args(json!({"a": i64::MAX, "b": 1})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }
}
