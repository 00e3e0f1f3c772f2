//! Canonical, provider-agnostic conversation types
//!
//! Every backend translator reads these and every normalizer produces them.

pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use message::{Message, Role, ToolCall};
pub use request::{ChatOptions, ChatRequest};
pub use response::{FinishReason, LlmResponse, Usage};
pub use tool::ToolDefinition;
