use serde::{Deserialize, Serialize};

use super::message::ToolCall;

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation, also used for unknown backend reasons
    Stop,
    /// Model decided to call a tool
    ToolCalls,
    /// Hit the output token limit
    Length,
    /// Backend produced no usable answer
    Error,
}

impl FinishReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::ToolCalls => "tool_calls",
            Self::Length => "length",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion)
    pub total_tokens: u32,
}

impl Usage {
    /// Usage when the backend reported any tokens, `None` otherwise
    pub const fn reported(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Option<Self> {
        if total_tokens == 0 {
            return None;
        }
        Some(Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        })
    }
}

/// Canonical result of one `chat` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// All text segments concatenated in emission order
    pub content: String,
    /// Tool invocations in emission order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    /// Absent when the backend reported no usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}
