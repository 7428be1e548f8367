use serde::{Deserialize, Serialize};

/// Definition of a tool the model can call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type (currently always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function specification
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Function tool with no description or parameter schema
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            tool_type: "function".to_owned(),
            function: FunctionDefinition {
                name: name.into(),
                description: None,
                parameters: None,
            },
        }
    }
}

/// Specification of a callable function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the function parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}
