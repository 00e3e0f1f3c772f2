//! `OpenAI` Responses API wire format types, as served by the Codex backend

use serde::{Deserialize, Serialize};

// -- Request types --

/// Responses API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    /// Model identifier
    pub model: String,
    /// System instructions (required by the Codex backend)
    pub instructions: String,
    /// Ordered conversation items
    pub input: Vec<ResponsesInputItem>,
    /// Whether the backend may retain the response
    pub store: bool,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ResponsesTool>,
}

/// One conversation item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesInputItem {
    /// User or assistant text
    Message {
        /// Role ("user" or "assistant")
        role: String,
        /// Text content
        content: String,
    },
    /// Tool invocation previously emitted by the assistant
    FunctionCall {
        /// Call identifier echoed by the matching output
        call_id: String,
        /// Tool name
        name: String,
        /// Arguments as a JSON object string
        arguments: String,
    },
    /// Result of a tool invocation
    FunctionCallOutput {
        /// Call identifier this output answers
        call_id: String,
        /// Tool output
        output: String,
    },
}

/// Function tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesTool {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    pub parameters: serde_json::Value,
    /// Whether the backend enforces the schema strictly
    pub strict: bool,
}

// -- Response types --

/// Responses API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesResponse {
    /// Response identifier
    #[serde(default)]
    pub id: String,
    /// Completion status ("completed", "incomplete", "failed")
    #[serde(default)]
    pub status: Option<String>,
    /// Output items in emission order
    #[serde(default)]
    pub output: Vec<ResponsesOutputItem>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<ResponsesUsage>,
}

/// Output item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesOutputItem {
    /// Assistant message
    Message {
        /// Content parts
        #[serde(default)]
        content: Vec<ResponsesOutputContent>,
    },
    /// Tool invocation
    FunctionCall {
        /// Item identifier
        #[serde(default)]
        id: Option<String>,
        /// Call identifier
        #[serde(default)]
        call_id: Option<String>,
        /// Tool name
        name: String,
        /// Arguments as a JSON string
        #[serde(default)]
        arguments: String,
    },
    /// Reasoning and other items that carry no answer text
    #[serde(other)]
    Other,
}

/// Content part of an output message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesOutputContent {
    /// Generated text
    OutputText {
        /// The text string
        text: String,
    },
    /// Refusals and other parts
    #[serde(other)]
    Other,
}

/// Responses API token usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResponsesUsage {
    /// Input tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Output tokens
    #[serde(default)]
    pub output_tokens: u32,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u32,
}
