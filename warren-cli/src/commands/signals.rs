//! `warren signals`: the subscribable signal allow-list.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use warren_signals::SignalKind;

/// Arguments for `warren signals`.
#[derive(Args, Debug)]
pub struct SignalsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SignalJson {
    label: &'static str,
    name: &'static str,
    number: i32,
}

#[derive(Tabled)]
struct SignalTableRow {
    #[tabled(rename = "label")]
    label: &'static str,
    #[tabled(rename = "name")]
    name: &'static str,
    #[tabled(rename = "number")]
    number: i32,
}

impl SignalsArgs {
    pub fn run(self) -> Result<()> {
        if self.json {
            let payload: Vec<SignalJson> = SignalKind::ALL
                .iter()
                .map(|kind| SignalJson {
                    label: kind.label(),
                    name: kind.os_name(),
                    number: kind.raw(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render signals JSON")?
            );
            return Ok(());
        }

        let rows = SignalKind::ALL.iter().map(|kind| SignalTableRow {
            label: kind.label(),
            name: kind.os_name(),
            number: kind.raw(),
        });
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!(
            "{} subscribable signals (SIGKILL, SIGSTOP and fault signals are never caught)",
            SignalKind::ALL.len().to_string().bold()
        );
        Ok(())
    }
}
