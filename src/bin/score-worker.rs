//! Stdio host for the bridge: one JSON command per stdin line in, one JSON
//! event message per stdout line out. Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use scorecanvas::InlineBridge;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "score-worker", version)]
struct Cli {
    /// Log filter in `RUST_LOG` syntax; falls back to `RUST_LOG`, then `warn`.
    #[arg(long)]
    log: Option<String>,

    /// Settings JSON file; sends `initialize` with it before reading stdin.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.log.as_deref())?)
        .with_writer(io::stderr)
        .init();

    let mut bridge = InlineBridge::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(path) = &cli.settings {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings '{}'", path.display()))?;
        let settings: serde_json::Value =
            serde_json::from_str(&text).with_context(|| format!("invalid JSON in '{}'", path.display()))?;
        let events = bridge.post(json!({ "cmd": "initialize", "settings": settings }));
        write_events(&mut out, &events)?;
    }

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let events = bridge.post_text(&line);
        write_events(&mut out, &events)?;
    }

    tracing::info!(dropped = bridge.dropped_messages(), "stdin closed");
    Ok(())
}

/// `--log` wins; otherwise `RUST_LOG` if it is set, otherwise `warn`.
fn log_filter(flag: Option<&str>) -> anyhow::Result<EnvFilter> {
    match flag {
        Some(filter) => EnvFilter::try_new(filter).context("invalid --log filter"),
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::new("warn")),
        },
    }
}

fn write_events(out: &mut impl Write, events: &[scorecanvas::EventMessage]) -> anyhow::Result<()> {
    for event in events {
        serde_json::to_writer(&mut *out, event)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_flag_is_optional() {
        let cli = Cli::try_parse_from(["score-worker"]).unwrap();
        assert_eq!(cli.log, None);
        let cli = Cli::try_parse_from(["score-worker", "--log", "scorecanvas=debug"]).unwrap();
        assert_eq!(cli.log.as_deref(), Some("scorecanvas=debug"));
    }

    #[test]
    fn explicit_log_filter_wins() {
        assert!(log_filter(Some("scorecanvas=trace")).is_ok());
        assert!(log_filter(Some("scorecanvas=loudest")).is_err());
    }
}
