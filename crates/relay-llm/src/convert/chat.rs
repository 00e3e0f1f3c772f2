//! Conversion between canonical types and chat completions wire format

use super::{Translator, description, fill_missing_call_ids, object_schema, parse_arguments, system_prompt};
use crate::protocol::chat::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatFunction, ChatFunctionCall, ChatMessage, ChatTool,
    ChatToolCall, function_type,
};
use crate::types::{ChatRequest, FinishReason, LlmResponse, Message, Role, ToolCall, ToolDefinition, Usage};

/// Chat completions translator for Azure `OpenAI` deployments
#[derive(Debug, Clone, Default)]
pub struct ChatCompletionsTranslator {
    supports_temperature: bool,
}

impl ChatCompletionsTranslator {
    pub const fn new(supports_temperature: bool) -> Self {
        Self { supports_temperature }
    }
}

impl Translator for ChatCompletionsTranslator {
    type Request = ChatCompletionRequest;
    type Response = ChatCompletionResponse;

    fn build(&self, request: &ChatRequest, model: &str) -> ChatCompletionRequest {
        let system = system_prompt(&request.messages).map(|prompt| ChatMessage {
            role: "system".to_owned(),
            content: Some(prompt),
            tool_calls: Vec::new(),
            tool_call_id: None,
        });

        let messages = system
            .into_iter()
            .chain(
                request
                    .messages
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .map(message_to_chat),
            )
            .collect();

        ChatCompletionRequest {
            model: model.to_owned(),
            messages,
            max_completion_tokens: request.options.max_tokens,
            temperature: request.options.temperature.filter(|_| self.supports_temperature),
            tools: request.tools.iter().map(tool_to_chat).collect(),
        }
    }

    fn parse(&self, response: &ChatCompletionResponse) -> LlmResponse {
        let usage = response
            .usage
            .and_then(|u| Usage::reported(u.prompt_tokens, u.completion_tokens, u.total_tokens));

        let Some(choice) = response.choices.first() else {
            return LlmResponse {
                content: String::new(),
                tool_calls: Vec::new(),
                finish_reason: FinishReason::Error,
                usage,
            };
        };

        LlmResponse {
            content: choice.message.content.clone().unwrap_or_default(),
            tool_calls: tool_calls(choice),
            finish_reason: finish_reason(choice.finish_reason.as_deref()),
            usage,
        }
    }
}

// -- Outbound: canonical types -> chat completions wire format --

fn message_to_chat(message: &Message) -> ChatMessage {
    if let Some(id) = message.tool_result_id() {
        return ChatMessage {
            role: "tool".to_owned(),
            content: Some(message.content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: Some(id.to_owned()),
        };
    }

    match message.role {
        Role::Assistant => ChatMessage {
            role: "assistant".to_owned(),
            content: (!message.content.is_empty() || message.tool_calls.is_empty()).then(|| message.content.clone()),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| ChatToolCall {
                    id: call.id.clone(),
                    call_type: function_type(),
                    function: ChatFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments_json(),
                    },
                })
                .collect(),
            tool_call_id: None,
        },
        Role::User | Role::Tool | Role::System => ChatMessage {
            role: "user".to_owned(),
            content: Some(message.content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        },
    }
}

fn tool_to_chat(tool: &ToolDefinition) -> ChatTool {
    ChatTool {
        tool_type: function_type(),
        function: ChatFunction {
            name: tool.name.clone(),
            description: description(tool),
            parameters: object_schema(tool),
        },
    }
}

// -- Inbound: chat completions wire format -> canonical types --

fn tool_calls(choice: &ChatChoice) -> Vec<ToolCall> {
    let mut calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .iter()
        .flatten()
        .map(|call| {
            ToolCall::new(
                call.id.clone(),
                call.function.name.clone(),
                parse_arguments(&call.function.arguments),
            )
        })
        .collect();
    fill_missing_call_ids(&mut calls);
    calls
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("tool_calls" | "function_call") => FinishReason::ToolCalls,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::Error,
        _ => FinishReason::Stop,
    }
}
