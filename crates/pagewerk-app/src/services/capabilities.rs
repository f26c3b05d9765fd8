// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop capability wiring for the command-line front end.
//
// Files and folders come from the local filesystem, pages are rendered by
// `pdftoppm`, and text is recognised by `ocrs` when built with the `ocr`
// feature. Anything unavailable stays on the stub and reports `Unsupported`
// when used.

use std::path::{Path, PathBuf};

use pagewerk_bridge::Capabilities;
use pagewerk_bridge::desktop::{
    DirectoryExportSink, FsDocumentFetcher, JsonCatalogFile, LocalFileWriter, PdftoppmRasterizer,
};
use pagewerk_bridge::memory::StaticCatalog;
use tracing::{info, warn};

/// What a command needs from the outside world.
#[derive(Debug, Default)]
pub struct DesktopOptions {
    /// JSON record catalog. Without one the catalog is empty.
    pub catalog: Option<PathBuf>,
    /// Folder exported files are persisted into.
    pub export_dir: Option<PathBuf>,
    /// Set up page rendering and text recognition.
    pub ocr: bool,
}

/// Build the capability set for a desktop run.
pub fn desktop_capabilities(options: &DesktopOptions) -> Capabilities {
    let mut capabilities = Capabilities::stub()
        .with_fetcher(FsDocumentFetcher)
        .with_file_writer(LocalFileWriter)
        .with_rasterizer(PdftoppmRasterizer::default());

    capabilities = match &options.catalog {
        Some(path) => capabilities.with_catalog(JsonCatalogFile::new(path)),
        None => capabilities.with_catalog(StaticCatalog::new(Vec::new())),
    };
    if let Some(dir) = &options.export_dir {
        capabilities = capabilities.with_export_sink(DirectoryExportSink::new(dir));
    }
    if options.ocr {
        capabilities = with_recognizer(capabilities);
    }
    info!(
        catalog = options.catalog.is_some(),
        export_dir = options.export_dir.is_some(),
        ocr = options.ocr,
        "Desktop capabilities ready"
    );
    capabilities
}

#[cfg(feature = "ocr")]
fn with_recognizer(capabilities: Capabilities) -> Capabilities {
    match pagewerk_document::OcrsRecognizer::with_defaults() {
        Ok(recognizer) => {
            capabilities.with_recognizer(recognizer)
        }
        Err(err) => {
            warn!(%err, "OCR models unavailable, pages will not be matched");
            capabilities
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn with_recognizer(capabilities: Capabilities) -> Capabilities {
    warn!("Built without the `ocr` feature, pages will not be matched");
    capabilities
}

/// Directory a file lives in, `.` for a bare name.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_core::error::PagewerkError;

    #[test]
    fn missing_catalog_is_empty_not_an_error() {
        let capabilities = desktop_capabilities(&DesktopOptions::default());
        assert!(capabilities.catalog.fetch_record_catalog().unwrap().is_empty());
    }

    #[test]
    fn catalog_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{ "id": "A", "primary_code": "BR-100" }, { "id": "B", "display_name": "Hinge" }]"#,
        )
        .unwrap();

        let capabilities = desktop_capabilities(&DesktopOptions {
            catalog: Some(path),
            ..DesktopOptions::default()
        });
        let records = capabilities.catalog.fetch_record_catalog().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].primary_code.as_deref(), Some("BR-100"));
    }

    #[test]
    fn unconfigured_capabilities_are_unsupported() {
        let capabilities = desktop_capabilities(&DesktopOptions::default());
        assert!(matches!(
            capabilities.export_sink.persist_exported_files(&[]),
            Err(PagewerkError::Unsupported { .. })
        ));
        assert!(matches!(
            capabilities.fetcher.fetch_document("/definitely/not/here.pdf"),
            Err(PagewerkError::Io(_))
        ));
    }

    #[test]
    fn parent_dir_of_bare_name_is_current_dir() {
        assert_eq!(parent_dir(Path::new("po-7.pdf")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/orders/po-7.pdf")), PathBuf::from("/orders"));
    }
}
