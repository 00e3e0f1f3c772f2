//! Conversion between canonical types and Responses API wire format

use super::{Translator, description, fill_missing_call_ids, object_schema, parse_arguments, system_prompt};
use crate::protocol::responses::{
    ResponsesInputItem, ResponsesOutputContent, ResponsesOutputItem, ResponsesRequest, ResponsesResponse,
    ResponsesTool,
};
use crate::types::{ChatRequest, FinishReason, LlmResponse, Message, Role, ToolCall, ToolDefinition, Usage};

/// Instructions sent when the conversation has no system message
pub const DEFAULT_INSTRUCTIONS: &str = "You are Codex, a coding assistant.";

/// Responses API translator for the Codex backend
#[derive(Debug, Clone)]
pub struct ResponsesTranslator {
    supports_temperature: bool,
}

impl ResponsesTranslator {
    pub const fn new(supports_temperature: bool) -> Self {
        Self { supports_temperature }
    }
}

impl Default for ResponsesTranslator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Translator for ResponsesTranslator {
    type Request = ResponsesRequest;
    type Response = ResponsesResponse;

    fn build(&self, request: &ChatRequest, model: &str) -> ResponsesRequest {
        let instructions = system_prompt(&request.messages).unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_owned());

        let input = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .flat_map(message_to_items)
            .collect();

        ResponsesRequest {
            model: model.to_owned(),
            instructions,
            input,
            store: false,
            max_output_tokens: request.options.max_tokens,
            temperature: request.options.temperature.filter(|_| self.supports_temperature),
            tools: request.tools.iter().map(tool_to_responses).collect(),
        }
    }

    fn parse(&self, response: &ResponsesResponse) -> LlmResponse {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for item in &response.output {
            match item {
                ResponsesOutputItem::Message { content: parts } => {
                    for part in parts {
                        if let ResponsesOutputContent::OutputText { text } = part {
                            content.push_str(text);
                        }
                    }
                }
                ResponsesOutputItem::FunctionCall {
                    id,
                    call_id: wire_id,
                    name,
                    arguments,
                } => {
                    let id = [wire_id, id]
                        .into_iter()
                        .flatten()
                        .find(|candidate| !candidate.is_empty())
                        .cloned()
                        .unwrap_or_default();
                    tool_calls.push(ToolCall::new(id, name.clone(), parse_arguments(arguments)));
                }
                ResponsesOutputItem::Other => {}
            }
        }

        fill_missing_call_ids(&mut tool_calls);

        // A truncated response may end in a half-written function call
        let finish_reason = match response.status.as_deref() {
            Some("incomplete") => FinishReason::Length,
            Some("failed") => FinishReason::Error,
            _ if !tool_calls.is_empty() => FinishReason::ToolCalls,
            _ => FinishReason::Stop,
        };

        LlmResponse {
            content,
            tool_calls,
            finish_reason,
            usage: response
                .usage
                .and_then(|u| Usage::reported(u.input_tokens, u.output_tokens, u.total_tokens)),
        }
    }
}

// -- Outbound: canonical types -> Responses wire format --

fn message_to_items(message: &Message) -> Vec<ResponsesInputItem> {
    if let Some(id) = message.tool_result_id() {
        return vec![ResponsesInputItem::FunctionCallOutput {
            call_id: id.to_owned(),
            output: message.content.clone(),
        }];
    }

    let role = match message.role {
        Role::Assistant => "assistant",
        Role::User | Role::Tool | Role::System => "user",
    };

    let text = (!message.content.is_empty() || message.tool_calls.is_empty()).then(|| ResponsesInputItem::Message {
        role: role.to_owned(),
        content: message.content.clone(),
    });

    let calls = message.tool_calls.iter().map(|call| ResponsesInputItem::FunctionCall {
        call_id: call.id.clone(),
        name: call.name.clone(),
        arguments: call.arguments_json(),
    });

    text.into_iter().chain(calls).collect()
}

fn tool_to_responses(tool: &ToolDefinition) -> ResponsesTool {
    ResponsesTool {
        tool_type: "function".to_owned(),
        name: tool.name.clone(),
        description: description(tool),
        parameters: object_schema(tool),
        strict: false,
    }
}
