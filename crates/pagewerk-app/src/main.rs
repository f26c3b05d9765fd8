// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk — split scanned order packets into per-line-item PDFs.
//
// Entry point. Initialises logging, parses the command line, and reports
// failures as operator-facing messages.

mod cli;
mod commands;
mod job;
mod services;

use std::process::ExitCode;

use clap::Parser;
use pagewerk_core::human_errors::humanize_error;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "Pagewerk starting");

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, kind = ?err.kind(), "Command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n  {}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}
