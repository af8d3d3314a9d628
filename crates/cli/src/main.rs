//! Researcher CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** — read credentials and provider settings from
//!    the environment (and `.env`) and validate them.
//! 2. **Wire observability** — configure `tracing-subscriber` and, when an
//!    OTLP endpoint is configured, an OpenTelemetry exporter.
//! 3. **Construct infrastructure** — create the `OpenAiGenerator` and
//!    `TavilySearch` adapters and inject them into the research pipeline.
//! 4. **Run once** — read one query, run the pipeline, print `FINAL ANSWER`
//!    and `REVIEW` to standard output.
//!
//! Any failure prints a single `error:` line to standard error and exits with
//! a non-zero status; no partial answer is printed.

mod config;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use llm::OpenAiGenerator;
use nodes::PipelineExecutor;
use pipeline::ResearchState;
use search::TavilySearch;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

/// Research a topic: search the web, summarise, draft an answer, review it.
#[derive(Debug, Parser)]
#[command(name = "researcher", version, about)]
struct Cli {
    /// Research topic or question. Prompted for on standard input when omitted.
    #[arg(short, long)]
    query: Option<String>,

    /// Print the final state as JSON instead of labelled sections.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = match telemetry::init(cli.verbose) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    info!(
        model = %config.openai.model,
        max_results = config.tavily.max_results,
        deadline_secs = config.deadline.map(|d| d.as_secs()),
        "configuration loaded"
    );

    let generator = Arc::new(OpenAiGenerator::new(config.openai)?);
    let search = Arc::new(TavilySearch::new(config.tavily)?);
    let pipeline = nodes::research_pipeline(generator, search)?;
    let mut executor = PipelineExecutor::new(pipeline);
    if let Some(deadline) = config.deadline {
        executor = executor.with_deadline(deadline);
    }

    let query = match cli.query {
        Some(query) => query,
        None => prompt_for_query().await?,
    };
    let initial = ResearchState::new(query)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling run");
            on_interrupt.cancel();
        }
    });

    let state = executor.invoke(initial, &cancel).await?;
    println!("{}", render_output(&state, cli.json)?);
    Ok(())
}

async fn prompt_for_query() -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Enter your research topic or question: ")
        .await
        .map_err(|e| anyhow!("failed to write prompt: {e}"))?;
    stdout
        .flush()
        .await
        .map_err(|e| anyhow!("failed to write prompt: {e}"))?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| anyhow!("failed to read query from standard input: {e}"))?;
    Ok(line)
}

fn render_output(state: &ResearchState, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(state)?);
    }
    Ok(format!(
        "\n===== FINAL ANSWER =====\n{}\n\n===== REVIEW =====\n{}",
        state.final_answer()?,
        state.review()?
    ))
}
