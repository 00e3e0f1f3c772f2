use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Relay LLM gateway
#[derive(Debug, Parser)]
#[command(name = "relay", about = "Send prompts to Anthropic, Codex or Azure OpenAI through one interface")]
pub struct Args {
    /// Path to configuration file; settings come from the environment when omitted
    #[arg(short, long, global = true, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Trace every credential source attempt
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one prompt and print the reply
    Chat(ChatArgs),
    /// Print the model used when a request does not name one
    Model,
}

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    /// Prompt text
    pub prompt: String,

    /// System instruction
    #[arg(short, long)]
    pub system: Option<String>,

    /// Model identifier, defaults to the backend's default model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature, ignored by backends that only accept the default
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Seconds to wait for the whole call
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Print the normalized response as JSON
    #[arg(long)]
    pub json: bool,
}
