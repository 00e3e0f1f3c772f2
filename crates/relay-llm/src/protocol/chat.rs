//! `OpenAI` chat completions wire format types, as served by Azure `OpenAI`

use serde::{Deserialize, Serialize};

// -- Request types --

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (the deployment in the URL takes precedence)
    pub model: String,
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Maximum completion tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool>,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role ("system", "user", "assistant", "tool")
    pub role: String,
    /// Text content, null for assistant turns that only call tools
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ChatToolCall>,
    /// Tool call ID this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool call in a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatToolCall {
    /// Call identifier
    #[serde(default)]
    pub id: String,
    /// Call type (always "function")
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /// Function invocation
    pub function: ChatFunctionCall,
}

/// Function name and arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON string
    #[serde(default)]
    pub arguments: String,
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTool {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition
    pub function: ChatFunction,
}

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFunction {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    pub parameters: serde_json::Value,
}

pub(crate) fn function_type() -> String {
    "function".to_owned()
}

// -- Response types --

/// Chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response identifier
    #[serde(default)]
    pub id: String,
    /// Completion choices
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// Completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Generated message
    pub message: ChatChoiceMessage,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message in a completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoiceMessage {
    /// Role (always "assistant")
    #[serde(default)]
    pub role: Option<String>,
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

/// Chat completion token usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChatUsage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Completion tokens
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u32,
}
