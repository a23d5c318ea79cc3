use anyhow::{Context, Result};
use clap::Parser;
use learn_sandbox::{EngineHandle, ExecutionBridge, LineKind, ProcessEngine, SandboxConfig, Session, SessionStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Interactive sandbox terminal backed by a local Python interpreter
#[derive(Debug, Parser)]
#[command(name = "learn-sandbox", version)]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// File whose content becomes the entry file's starter code
    #[arg(long)]
    starter: Option<PathBuf>,

    /// Print a JSON session snapshot after every command
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SandboxConfig::from_json_file(path)?,
        None => SandboxConfig::default(),
    };
    if let Some(path) = &cli.starter {
        config.starter_code = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read starter file: {}", path.display()))?;
    }

    let engine = Arc::new(EngineHandle::new());
    let status = engine.initialize(|| ProcessEngine::initialize(&config)).await;
    let mut session = Session::new(config, ExecutionBridge::new(engine))?;

    let current = session.status();
    if let SessionStatus::Failed(message) = &current {
        eprintln!("{}: {message}", current.label());
    } else {
        tracing::info!(?status, "sandbox ready");
    }

    let mut printed = flush(&session, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }
        session.exec_command(&line).await;

        // `clear` shrinks the transcript; start over from its first line.
        if session.transcript().len() < printed {
            printed = 0;
        }
        printed = flush(&session, printed);
        if cli.json {
            println!("{}", serde_json::to_string(&session.snapshot())?);
        }
    }
    Ok(())
}

/// Print transcript lines from `from` onward; returns the new high-water mark
fn flush(session: &Session, from: usize) -> usize {
    for line in &session.transcript()[from..] {
        match line.kind {
            LineKind::Error => eprintln!("{}", line.text),
            LineKind::Command => {}
            _ => println!("{}", line.text),
        }
    }
    session.transcript().len()
}
