//! `warren watch`: run a signal processor in the foreground.
//!
//! Stdout carries one JSON object per line: a `ready` line once the
//! subscription is live, then one line per dispatched batch. Logs go to stderr.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use warren_signals::{Batch, ProcessorConfig, SignalKind, SignalProcessor};

/// Arguments for `warren watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Processor config file (default: `<config dir>/warren/signals.yaml` if present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start with dispatch held and release it after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub hold_for: Option<u64>,

    /// Stop watching once a batch contains this signal (repeatable).
    /// Defaults to `terminate-request` and `interrupt`.
    #[arg(long = "exit-on", value_name = "KIND")]
    pub exit_on: Vec<SignalKind>,
}

#[derive(Serialize)]
struct BatchLine<'a> {
    received_at: DateTime<Utc>,
    signals: &'a [SignalKind],
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        init_tracing();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;
        runtime.block_on(self.watch())
    }

    async fn watch(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => ProcessorConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ProcessorConfig::load_default().context("failed to load default config")?,
        };

        let exit_on: BTreeSet<SignalKind> = if self.exit_on.is_empty() {
            [SignalKind::TerminateRequest, SignalKind::Interrupt].into()
        } else {
            self.exit_on.iter().copied().collect()
        };
        for kind in exit_on.iter().filter(|kind| !config.signals.contains(**kind)) {
            tracing::warn!(signal = %kind, "exit signal is not subscribed and will never arrive");
        }

        let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<Batch>();
        let processor = SignalProcessor::start_with_config(
            move |batch: Batch| {
                let _ = batch_tx.send(batch);
            },
            config,
        )
        .context("failed to start signal processor")?;

        let hold_for = self.hold_for.map(Duration::from_secs);
        if hold_for.is_some() {
            processor.hold_signals();
        }
        emit(&json!({ "ready": true, "pid": std::process::id() }))?;

        let release = async move {
            match hold_for {
                Some(delay) => tokio::time::sleep(delay).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(release);
        let mut released = hold_for.is_none();

        loop {
            tokio::select! {
                _ = &mut release, if !released => {
                    released = true;
                    processor.stop_holding_signals();
                    tracing::info!(pending = processor.pending_signals(), "released signal hold");
                }
                batch = batch_rx.recv() => {
                    let Some(batch) = batch else { break };
                    emit(&BatchLine {
                        received_at: Utc::now(),
                        signals: &batch,
                    })?;
                    if batch.iter().any(|kind| exit_on.contains(kind)) {
                        tracing::info!("exit signal received, shutting down");
                        break;
                    }
                }
            }
        }

        processor.shut_down().await;
        Ok(())
    }
}

fn emit<T: Serialize>(line: &T) -> Result<()> {
    let payload = serde_json::to_string(line).context("failed to render JSON line")?;
    println!("{payload}");
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
