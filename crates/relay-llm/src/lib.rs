//! Provider-agnostic LLM calls for relay
//!
//! A [`ProviderAdapter`] owns one backend (Anthropic Messages, Codex
//! Responses or Azure `OpenAI` chat completions) and a
//! [`relay_auth::CredentialResolver`]. Callers speak the canonical
//! [`types`]; translation to and from each wire format lives in [`convert`].

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod context;
pub mod convert;
mod error;
pub mod protocol;
pub mod provider;
pub mod types;

pub use context::ChatContext;
pub use convert::{Translator, parse_arguments};
pub use error::LlmError;
pub use provider::{Backend, ProviderAdapter};
pub use types::{ChatOptions, ChatRequest, FinishReason, LlmResponse, Message, Role, ToolCall, ToolDefinition, Usage};
