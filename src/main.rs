//! Comment spam detection harness for Zentinel
//!
//! Reads comments as JSON lines and writes one detection result per line.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zentinel_comment_spam::{Comment, DetectionEngine, DetectionReason, DetectionResult, SpamGuardConfig};

#[derive(Parser, Debug)]
#[command(name = "zentinel-comment-spam")]
#[command(author, version, about = "Comment spam detection for Zentinel")]
struct Args {
    /// Path to configuration file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON-lines comment file (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print engine statistics to stderr when done
    #[arg(long)]
    stats: bool,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(json: bool, level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::from_default_env()
        .add_directive(level.into());

    // stdout carries results
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: &Path) -> Result<SpamGuardConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.json_logs, &args.log_level);

    // Load configuration
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SpamGuardConfig::recommended(),
    };

    let enabled = config.enabled;
    if !enabled {
        warn!("Spam detection disabled in configuration; passing comments through");
    }

    let engine = DetectionEngine::new(config);

    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open input {}", path.display()))?;
            process(&engine, enabled, file).await?;
        }
        None => process(&engine, enabled, tokio::io::stdin()).await?,
    }

    if args.stats {
        let stats = engine.statistics()?;
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}

/// Analyze each JSON line from `input`, writing results to stdout.
async fn process<R: AsyncRead + Unpin>(engine: &DetectionEngine, enabled: bool, input: R) -> Result<()> {
    let mut lines = BufReader::new(input).lines();
    let mut stdout = tokio::io::stdout();
    let mut line_no = 0usize;
    let mut spam = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let comment: Comment = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed comment");
                continue;
            }
        };

        let result = if enabled {
            engine.analyze(&comment)
        } else {
            DetectionResult::not_spam(DetectionReason::NoPatternsDetected)
        };
        if result.is_spam {
            spam += 1;
        }

        let mut out = serde_json::to_vec(&result)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
    }

    stdout.flush().await?;
    info!(lines = line_no, spam, "Finished processing comments");
    Ok(())
}
