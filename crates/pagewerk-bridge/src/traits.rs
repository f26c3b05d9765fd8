// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait definitions for the capabilities the engine consumes.
//
// Every trait is `Send + Sync` so implementations can be shared with blocking
// worker tasks through `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use pagewerk_core::error::Result;
use pagewerk_core::types::{ExportedFile, PageIndex, Record};

use crate::stub::StubBridge;

/// Supplies the list of records pages can be assigned to.
pub trait RecordCatalogSource: Send + Sync {
    /// Fetch the full catalog. Order matters: OCR matching is first-match-wins.
    fn fetch_record_catalog(&self) -> Result<Vec<Record>>;
}

/// Resolves a document reference (path, storage key) into PDF bytes.
pub trait DocumentFetcher: Send + Sync {
    fn fetch_document(&self, reference: &str) -> Result<Vec<u8>>;
}

/// Renders one page of a PDF to a raster image.
pub trait PageRasterizer: Send + Sync {
    /// Render `page` (1-based) at `scale` × native resolution, where 1.0 means
    /// one pixel per PDF point.
    fn rasterize(&self, pdf: &[u8], page: PageIndex, scale: f32) -> Result<DynamicImage>;
}

/// Recognises text in a page image.
pub trait TextRecognizer: Send + Sync {
    fn recognize_text(&self, image: &DynamicImage, language_hints: &[String]) -> Result<String>;
}

/// Persists the documents produced by a split export.
///
/// The implementation decides storage location and how each file is linked to
/// its record.
pub trait ExportSink: Send + Sync {
    fn persist_exported_files(&self, files: &[ExportedFile]) -> Result<()>;
}

/// Writes raw bytes to a named file in a directory, replacing any existing file.
pub trait FileWriter: Send + Sync {
    /// Returns the full path of the written file.
    fn write_file(&self, bytes: &[u8], file_name: &str, directory: &Path) -> Result<PathBuf>;
}

/// The full set of capabilities handed to a session at construction.
///
/// Capabilities that are not available in an environment are filled with
/// [`StubBridge`], which reports `PagewerkError::Unsupported`.
#[derive(Clone)]
pub struct Capabilities {
    pub catalog: Arc<dyn RecordCatalogSource>,
    pub fetcher: Arc<dyn DocumentFetcher>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub export_sink: Arc<dyn ExportSink>,
    pub file_writer: Arc<dyn FileWriter>,
}

impl Capabilities {
    /// Every capability unavailable.
    pub fn stub() -> Self {
        let stub = Arc::new(StubBridge);
        Self {
            catalog: stub.clone(),
            fetcher: stub.clone(),
            rasterizer: stub.clone(),
            recognizer: stub.clone(),
            export_sink: stub.clone(),
            file_writer: stub,
        }
    }

    pub fn with_catalog(mut self, catalog: impl RecordCatalogSource + 'static) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl DocumentFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: impl PageRasterizer + 'static) -> Self {
        self.rasterizer = Arc::new(rasterizer);
        self
    }

    pub fn with_recognizer(mut self, recognizer: impl TextRecognizer + 'static) -> Self {
        self.recognizer = Arc::new(recognizer);
        self
    }

    pub fn with_export_sink(mut self, sink: impl ExportSink + 'static) -> Self {
        self.export_sink = Arc::new(sink);
        self
    }

    pub fn with_file_writer(mut self, writer: impl FileWriter + 'static) -> Self {
        self.file_writer = Arc::new(writer);
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::stub()
    }
}
