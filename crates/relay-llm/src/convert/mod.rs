//! Translation between canonical types and backend wire formats
//!
//! Each submodule owns one backend protocol: building the outbound request
//! from a [`ChatRequest`] and normalizing the decoded response into an
//! [`LlmResponse`]. Parsing is pure, so parsing the same payload twice
//! yields identical results.

pub mod anthropic;
pub mod chat;
pub mod responses;

use std::collections::HashSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::types::{ChatRequest, LlmResponse, Message, Role, ToolCall, ToolDefinition};

pub use anthropic::AnthropicTranslator;
pub use chat::ChatCompletionsTranslator;
pub use responses::ResponsesTranslator;

/// Separator between system messages folded into a single prompt
const SYSTEM_SEPARATOR: &str = "\n\n";

/// Message translator and response normalizer for one backend protocol
pub trait Translator: Send + Sync {
    /// Outbound request body
    type Request: Serialize + Send + Sync;
    /// Decoded response body
    type Response: DeserializeOwned + Send;

    /// Build the wire request for `model`
    fn build(&self, request: &ChatRequest, model: &str) -> Self::Request;

    /// Normalize a decoded response
    fn parse(&self, response: &Self::Response) -> LlmResponse;
}

/// Decode tool arguments, wrapping anything that is not a JSON object
///
/// Empty input means no arguments. Malformed or non-object payloads become
/// `{"raw": <payload>}` so callers still see what the model produced.
pub fn parse_arguments(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => arguments,
        _ => raw_arguments(raw.to_owned()),
    }
}

/// Same as [`parse_arguments`] for backends that send arguments as JSON values
pub fn arguments_from_value(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(arguments) => arguments.clone(),
        Value::Null => Map::new(),
        Value::String(raw) => parse_arguments(raw),
        other => raw_arguments(other.to_string()),
    }
}

fn raw_arguments(raw: String) -> Map<String, Value> {
    let mut arguments = Map::new();
    arguments.insert("raw".to_owned(), Value::String(raw));
    arguments
}

/// Non-empty system message contents joined into one prompt
pub(crate) fn system_prompt(messages: &[Message]) -> Option<String> {
    let parts: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System && !m.content.is_empty())
        .map(|m| m.content.as_str())
        .collect();

    (!parts.is_empty()).then(|| parts.join(SYSTEM_SEPARATOR))
}

/// Object schema with the tool's properties and string-only `required`
pub(crate) fn object_schema(tool: &ToolDefinition) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_owned(), Value::String("object".to_owned()));
    schema.insert("properties".to_owned(), tool.properties());

    let required = tool.required();
    if !required.is_empty() {
        schema.insert(
            "required".to_owned(),
            Value::Array(required.into_iter().map(Value::String).collect()),
        );
    }
    Value::Object(schema)
}

/// Description, or `None` when empty
pub(crate) fn description(tool: &ToolDefinition) -> Option<String> {
    (!tool.description.is_empty()).then(|| tool.description.clone())
}

/// Give every call without a backend-supplied ID a positional one
///
/// Generated IDs are `relay_call_{position}`, suffixed further if the
/// backend already used that name, so parsing stays deterministic and IDs
/// stay unique within one response.
pub(crate) fn fill_missing_call_ids(calls: &mut [ToolCall]) {
    let mut taken: HashSet<String> = calls
        .iter()
        .filter(|call| !call.id.is_empty())
        .map(|call| call.id.clone())
        .collect();

    for (position, call) in calls.iter_mut().enumerate() {
        if !call.id.is_empty() {
            continue;
        }

        let base = format!("relay_call_{position}");
        let mut id = base.clone();
        let mut suffix = 1;
        while taken.contains(&id) {
            id = format!("{base}_{suffix}");
            suffix += 1;
        }

        taken.insert(id.clone());
        call.id = id;
    }
}
