// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations. Each drives one `EditSession` from load to
// export and prints its result on stdout.

use std::path::{Path, PathBuf};

use pagewerk_core::config::EngineConfig;
use pagewerk_core::error::Result;
use pagewerk_core::types::{AutoMatchSummary, DocumentSource, ExportedFile};
use pagewerk_session::EditSession;
use tracing::{info, instrument, warn};

use crate::cli::{Cli, Command};
use crate::job::Job;
use crate::services::capabilities::{DesktopOptions, desktop_capabilities, parent_dir};
use crate::services::data_dir::load_config;

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Inspect { pdf } => inspect(config, &pdf).await,
        Command::Split {
            pdf,
            job,
            catalog,
            out,
            auto_match,
        } => {
            let out = out.unwrap_or_else(|| parent_dir(&pdf));
            split(config, &pdf, job.as_deref(), catalog, out, auto_match).await
        }
        Command::Redact { pdf, job } => redact(config, &pdf, &job).await,
        Command::Match { pdf, catalog } => match_pages(config, &pdf, catalog).await,
    }
}

fn reference(pdf: &Path) -> DocumentSource {
    DocumentSource::Reference(pdf.to_string_lossy().into_owned())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[instrument(skip_all, fields(pdf = %pdf.display()))]
async fn inspect(mut config: EngineConfig, pdf: &Path) -> Result<()> {
    config.auto_match_on_load = false;
    let session = EditSession::new(config, desktop_capabilities(&DesktopOptions::default()));
    let outcome = session.load(reference(pdf), None).await?;
    print_json(&outcome.info)
}

#[instrument(skip_all, fields(pdf = %pdf.display(), out = %out.display()))]
async fn split(
    mut config: EngineConfig,
    pdf: &Path,
    job: Option<&Path>,
    catalog: Option<PathBuf>,
    out: PathBuf,
    auto_match: bool,
) -> Result<()> {
    let job = job.map(Job::load).transpose()?;
    config.auto_match_on_load = auto_match;
    let capabilities = desktop_capabilities(&DesktopOptions {
        catalog,
        export_dir: Some(out.clone()),
        ocr: auto_match,
    });
    let session = EditSession::new(config, capabilities);

    let outcome = session.load(reference(pdf), None).await?;
    if let Some(summary) = &outcome.auto_match {
        report_summary(summary);
    }
    if let Some(job) = &job {
        job.apply_to(&session, true)?;
    }

    let files = session.export_and_persist().await?;
    for file in &files {
        println!("{}", describe(&out, file));
    }
    info!(files = files.len(), "Split complete");
    Ok(())
}

#[instrument(skip_all, fields(pdf = %pdf.display()))]
async fn redact(mut config: EngineConfig, pdf: &Path, job: &Path) -> Result<()> {
    let job = Job::load(job)?;
    config.auto_match_on_load = false;
    let session = EditSession::new(config, desktop_capabilities(&DesktopOptions::default()));

    session.load(reference(pdf), Some(pdf.to_path_buf())).await?;
    let applied = job.apply_to(&session, false)?;
    let written = session.overwrite_original().await?;
    println!("{} ({} masks)", written.display(), applied.masks);
    Ok(())
}

#[instrument(skip_all, fields(pdf = %pdf.display()))]
async fn match_pages(mut config: EngineConfig, pdf: &Path, catalog: PathBuf) -> Result<()> {
    config.auto_match_on_load = false;
    let capabilities = desktop_capabilities(&DesktopOptions {
        catalog: Some(catalog),
        export_dir: None,
        ocr: true,
    });
    let session = EditSession::new(config, capabilities);

    session.load(reference(pdf), None).await?;
    let summary = session.run_auto_match(false).await?;
    report_summary(&summary);
    print_json(&summary)
}

fn report_summary(summary: &AutoMatchSummary) {
    for failure in &summary.failures {
        warn!(page = failure.page.get(), reason = %failure.reason, "Page not matched");
    }
    if summary.no_matches() {
        warn!(examined = summary.examined_pages, "No pages matched a catalog record");
    } else {
        info!(
            matched = summary.matched_count,
            examined = summary.examined_pages,
            "Pages matched"
        );
    }
}

fn describe(out: &Path, file: &ExportedFile) -> String {
    let pages: Vec<String> = file.pages.iter().map(|page| page.get().to_string()).collect();
    let mut line = format!(
        "{}  record {}  pages {}",
        out.join(&file.file_name).display(),
        file.record_id,
        pages.join(",")
    );
    if file.used_fallback_name {
        line.push_str("  (fallback name)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_document::SourcePdf;
    use pagewerk_document::pdf::fixtures::sample_pdf;

    fn cli(args: &[&str]) -> Cli {
        use clap::Parser;
        Cli::try_parse_from(std::iter::once("pagewerk").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn split_writes_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("packet.pdf");
        std::fs::write(&pdf, sample_pdf(&[792.0, 792.0, 500.0])).unwrap();
        let catalog = dir.path().join("catalog.json");
        std::fs::write(&catalog, r#"[{ "id": "A", "primary_code": "BR-100" }]"#).unwrap();
        let job = dir.path().join("job.json");
        std::fs::write(
            &job,
            r#"{
                "masks": [{ "page": 3, "x": 10, "y": 10, "w": 60, "h": 20 }],
                "assignments": [
                    { "page": 1, "record": "A" },
                    { "page": 3, "record": "A" },
                    { "page": 2, "record": "Z" }
                ]
            }"#,
        )
        .unwrap();
        let out = dir.path().join("out");

        run(cli(&[
            "split",
            pdf.to_str().unwrap(),
            "--job",
            job.to_str().unwrap(),
            "--catalog",
            catalog.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ]))
        .await
        .unwrap();

        let first = SourcePdf::open(out.join("BR-100.pdf")).unwrap();
        assert_eq!(first.page_count(), 2);
        let fallback = SourcePdf::open(out.join("document.pdf")).unwrap();
        assert_eq!(fallback.page_count(), 1);
    }

    #[tokio::test]
    async fn split_without_assignments_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("packet.pdf");
        std::fs::write(&pdf, sample_pdf(&[792.0])).unwrap();

        let err = run(cli(&["split", pdf.to_str().unwrap()])).await.unwrap_err();
        assert!(matches!(err, pagewerk_core::error::PagewerkError::NoAssignments));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn redact_replaces_the_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("po-7.pdf");
        let original = sample_pdf(&[792.0, 600.0]);
        std::fs::write(&pdf, &original).unwrap();
        let job = dir.path().join("job.json");
        std::fs::write(&job, r#"{ "masks": [{ "page": 2, "x": 0, "y": 0, "w": 100, "h": 50 }] }"#)
            .unwrap();

        run(cli(&["redact", pdf.to_str().unwrap(), "--job", job.to_str().unwrap()]))
            .await
            .unwrap();

        let rewritten = std::fs::read(&pdf).unwrap();
        assert_ne!(rewritten, original);
        let reloaded = SourcePdf::from_bytes(&rewritten).unwrap();
        assert_eq!(reloaded.page_count(), 2);
        assert_eq!(reloaded.page_sizes()[1].height, 600.0);
    }

    #[tokio::test]
    async fn inspect_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.pdf");
        let err = run(cli(&["inspect", missing.to_str().unwrap()])).await.unwrap_err();
        assert!(matches!(err, pagewerk_core::error::PagewerkError::Io(_)));
    }

    #[test]
    fn describe_flags_fallback_names() {
        let file = ExportedFile {
            bytes: Vec::new(),
            file_name: "document.pdf".into(),
            record_id: pagewerk_core::types::RecordId::new("Z"),
            pages: vec![pagewerk_core::types::PageIndex(2), pagewerk_core::types::PageIndex(4)],
            used_fallback_name: true,
        };
        assert_eq!(
            describe(Path::new("out"), &file),
            format!("{}  record Z  pages 2,4  (fallback name)", Path::new("out").join("document.pdf").display())
        );
    }
}
