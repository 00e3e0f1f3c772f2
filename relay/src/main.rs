#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::time::Duration;

use args::{Args, ChatArgs, Command};
use clap::Parser;
use relay_config::Config;
use relay_llm::{ChatContext, ChatOptions, ChatRequest, Message, ProviderAdapter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if args.verbose {
        config.auth.verbose = true;
    }

    relay_telemetry::init(&config.logging)?;

    let adapter = ProviderAdapter::from_config(&config)?;

    match args.command {
        Command::Model => println!("{}", adapter.default_model()),
        Command::Chat(chat) => run_chat(&adapter, chat).await?,
    }

    Ok(())
}

async fn run_chat(adapter: &ProviderAdapter, args: ChatArgs) -> anyhow::Result<()> {
    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));

    let request = ChatRequest::new(messages)
        .with_model(args.model.unwrap_or_default())
        .with_options(ChatOptions {
            max_tokens: args.max_tokens,
            temperature: args.temperature,
        });

    let ctx = ChatContext::new().with_timeout(Duration::from_secs(args.timeout));
    let cancel = ctx.cancellation_token().clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling request");
            cancel.cancel();
        }
    });

    let response = adapter.chat(&ctx, &request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if !response.content.is_empty() {
        println!("{}", response.content);
    }
    for call in &response.tool_calls {
        println!("[tool call {}] {} {}", call.id, call.name, call.arguments_json());
    }

    tracing::info!(
        finish_reason = %response.finish_reason,
        total_tokens = response.usage.map(|u| u.total_tokens),
        "chat completed"
    );

    Ok(())
}
