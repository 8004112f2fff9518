//! One-shot and streaming completion commands

use std::io::Write;

use colored::*;
use futures::StreamExt;
use relay_core::llm::FallbackChain;
use relay_core::{CompletionRequest, RelayConfig, StreamChunk};

use crate::args::PromptArgs;
use crate::console::CliConsole;
use crate::context;

fn build_request(args: &PromptArgs) -> CompletionRequest {
    let mut request = CompletionRequest::from_prompt(args.prompt.clone());
    if let Some(system) = &args.system {
        request = request.with_system(system.clone());
    }
    if let Some(max_tokens) = args.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = args.temperature {
        request = request.with_temperature(temperature);
    }
    request
}

fn print_fallbacks(console: &CliConsole, chain: &FallbackChain) {
    for event in chain.history() {
        console.warn(&format!("skipped {}: {}", event.from_adapter, event.reason));
    }
}

/// Run one completion and print the result
pub async fn run(config: &RelayConfig, args: &PromptArgs) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let registry = context::build_registry(config)?;
    let chain = context::build_chain(&registry, config, args.adapter.as_deref())?;
    let request = build_request(args);

    let result = chain.complete(&request).await;
    print_fallbacks(&console, &chain);
    let response = result?;

    println!("{}", response.content);
    for call in &response.tool_calls {
        println!("{} {}({})", "tool call".magenta(), call.name, call.arguments);
    }

    console.print_separator();
    console.field("Served by", format!("{} / {}", response.provider, response.model));
    console.field(
        "Tokens",
        format!(
            "{} prompt + {} completion = {}",
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            response.usage.total_tokens
        ),
    );
    console.field("Latency", format!("{} ms", response.latency_ms));
    console.field("Finish", &response.finish_reason);
    console.field(
        "Est. cost",
        format!("${:.6}", chain.estimate_cost(&response.usage)),
    );
    Ok(())
}

/// Stream a completion, printing chunks as they arrive
pub async fn stream(config: &RelayConfig, args: &PromptArgs) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let registry = context::build_registry(config)?;
    let chain = context::build_chain(&registry, config, args.adapter.as_deref())?;
    let request = build_request(args);

    let mut stdout = std::io::stdout();
    let mut chunks = chain.stream(&request);
    let mut failure = None;

    while let Some(chunk) = chunks.next().await {
        match chunk {
            StreamChunk::Content { text } => {
                print!("{}", text);
                stdout.flush()?;
            }
            StreamChunk::ToolCall { call } => {
                println!("\n{} {}({})", "tool call".magenta(), call.name, call.arguments);
            }
            StreamChunk::Reset {
                from_adapter,
                reason,
            } => {
                println!();
                console.warn(&format!(
                    "discarding partial output from {}: {}",
                    from_adapter, reason
                ));
            }
            StreamChunk::Done {
                usage,
                finish_reason,
            } => {
                println!();
                console.print_separator();
                if let Some(usage) = usage {
                    console.field(
                        "Tokens",
                        format!("{} prompt + {} completion", usage.prompt_tokens, usage.completion_tokens),
                    );
                }
                console.field("Finish", finish_reason);
            }
            StreamChunk::Error { message } => failure = Some(message),
        }
    }
    drop(chunks);

    print_fallbacks(&console, &chain);
    match failure {
        Some(message) => anyhow::bail!("stream failed: {}", message),
        None => Ok(()),
    }
}
