//! Conversion between canonical types and Anthropic wire format

use serde_json::Value;

use super::{Translator, arguments_from_value, description, fill_missing_call_ids, object_schema};
use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse, AnthropicResponseBlock,
    AnthropicTool,
};
use crate::types::{ChatRequest, FinishReason, LlmResponse, Message, Role, ToolCall, ToolDefinition, Usage};

/// Default max tokens when not specified (Anthropic requires this field)
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Messages API translator
#[derive(Debug, Clone)]
pub struct AnthropicTranslator {
    supports_temperature: bool,
}

impl AnthropicTranslator {
    pub const fn new(supports_temperature: bool) -> Self {
        Self { supports_temperature }
    }
}

impl Default for AnthropicTranslator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Translator for AnthropicTranslator {
    type Request = AnthropicRequest;
    type Response = AnthropicResponse;

    fn build(&self, request: &ChatRequest, model: &str) -> AnthropicRequest {
        let system = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System && !m.content.is_empty())
            .map(|m| AnthropicContentBlock::Text { text: m.content.clone() })
            .collect();

        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(message_to_anthropic)
            .collect();

        AnthropicRequest {
            model: model.to_owned(),
            max_tokens: request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: request.options.temperature.filter(|_| self.supports_temperature),
            tools: request.tools.iter().map(tool_to_anthropic).collect(),
        }
    }

    fn parse(&self, response: &AnthropicResponse) -> LlmResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in &response.content {
            match block {
                AnthropicResponseBlock::Text { text } => content.push_str(text),
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id.clone(), name.clone(), arguments_from_value(input)));
                }
                AnthropicResponseBlock::Other => {}
            }
        }

        fill_missing_call_ids(&mut tool_calls);

        let usage = response.usage.and_then(|u| {
            Usage::reported(
                u.input_tokens,
                u.output_tokens,
                u.input_tokens.saturating_add(u.output_tokens),
            )
        });

        LlmResponse {
            content,
            tool_calls,
            finish_reason: finish_reason(response.stop_reason.as_deref()),
            usage,
        }
    }
}

// -- Outbound: canonical types -> Anthropic wire format --

fn message_to_anthropic(message: &Message) -> AnthropicMessage {
    if let Some(tool_use_id) = message.tool_result_id() {
        return AnthropicMessage {
            role: "user".to_owned(),
            content: vec![AnthropicContentBlock::ToolResult {
                tool_use_id: tool_use_id.to_owned(),
                content: message.content.clone(),
            }],
        };
    }

    match message.role {
        Role::Assistant if !message.tool_calls.is_empty() => {
            let text = (!message.content.is_empty()).then(|| AnthropicContentBlock::Text {
                text: message.content.clone(),
            });
            let tool_uses = message.tool_calls.iter().map(|call| AnthropicContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: Value::Object(call.arguments.clone()),
            });

            AnthropicMessage {
                role: "assistant".to_owned(),
                content: text.into_iter().chain(tool_uses).collect(),
            }
        }
        Role::Assistant => text_message("assistant", &message.content),
        Role::Tool => {
            tracing::warn!("tool message without tool_call_id sent as user text");
            text_message("user", &message.content)
        }
        Role::User | Role::System => text_message("user", &message.content),
    }
}

fn text_message(role: &str, text: &str) -> AnthropicMessage {
    AnthropicMessage {
        role: role.to_owned(),
        content: vec![AnthropicContentBlock::Text { text: text.to_owned() }],
    }
}

fn tool_to_anthropic(tool: &ToolDefinition) -> AnthropicTool {
    AnthropicTool {
        name: tool.name.clone(),
        description: description(tool),
        input_schema: object_schema(tool),
    }
}

// -- Inbound: Anthropic wire format -> canonical types --

fn finish_reason(stop_reason: Option<&str>) -> FinishReason {
    match stop_reason {
        Some("tool_use") => FinishReason::ToolCalls,
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}
