// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Split scanned order packets into per-line-item PDFs with burned-in redactions.
#[derive(Debug, Parser)]
#[command(name = "pagewerk", version, about)]
pub struct Cli {
    /// Engine config file (JSON). Defaults to the user config directory.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show page count, page sizes, and fingerprint of a PDF.
    Inspect {
        pdf: PathBuf,
    },

    /// Export one PDF per assigned line item into a folder.
    Split {
        pdf: PathBuf,
        /// Masks and page assignments to apply.
        #[arg(long, value_name = "FILE")]
        job: Option<PathBuf>,
        /// Record catalog (JSON array of records).
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
        /// Output folder. Defaults to the folder holding the source.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Propose assignments by OCR before applying the job.
        #[arg(long)]
        auto_match: bool,
    },

    /// Burn the job's masks into the PDF, replacing the file.
    Redact {
        pdf: PathBuf,
        #[arg(long, value_name = "FILE")]
        job: PathBuf,
    },

    /// OCR every page and print the proposed assignments as JSON.
    Match {
        pdf: PathBuf,
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_split_with_global_config() {
        let cli = Cli::try_parse_from([
            "pagewerk",
            "split",
            "packet.pdf",
            "--job",
            "job.json",
            "--auto-match",
            "--config",
            "engine.json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("engine.json")));
        match cli.command {
            Command::Split {
                pdf,
                job,
                catalog,
                out,
                auto_match,
            } => {
                assert_eq!(pdf, PathBuf::from("packet.pdf"));
                assert_eq!(job, Some(PathBuf::from("job.json")));
                assert!(catalog.is_none());
                assert!(out.is_none());
                assert!(auto_match);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn redact_requires_a_job() {
        assert!(Cli::try_parse_from(["pagewerk", "redact", "packet.pdf"]).is_err());
    }
}
