// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for environments where a capability is not wired up.
//
// Every trait method returns `Unsupported` so callers degrade gracefully
// instead of crashing.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{ExportedFile, PageIndex, Record};

use crate::traits::*;

/// No-op bridge standing in for any missing capability.
pub struct StubBridge;

impl RecordCatalogSource for StubBridge {
    fn fetch_record_catalog(&self) -> Result<Vec<Record>> {
        tracing::warn!("RecordCatalogSource::fetch_record_catalog called on stub bridge");
        Err(PagewerkError::Unsupported {
            capability: "record catalog",
        })
    }
}

impl DocumentFetcher for StubBridge {
    fn fetch_document(&self, _reference: &str) -> Result<Vec<u8>> {
        tracing::warn!("DocumentFetcher::fetch_document called on stub bridge");
        Err(PagewerkError::Unsupported {
            capability: "document fetching",
        })
    }
}

impl PageRasterizer for StubBridge {
    fn rasterize(&self, _pdf: &[u8], _page: PageIndex, _scale: f32) -> Result<DynamicImage> {
        Err(PagewerkError::Unsupported {
            capability: "page rendering",
        })
    }
}

impl TextRecognizer for StubBridge {
    fn recognize_text(&self, _image: &DynamicImage, _language_hints: &[String]) -> Result<String> {
        Err(PagewerkError::Unsupported {
            capability: "text recognition",
        })
    }
}

impl ExportSink for StubBridge {
    fn persist_exported_files(&self, _files: &[ExportedFile]) -> Result<()> {
        tracing::warn!("ExportSink::persist_exported_files called on stub bridge");
        Err(PagewerkError::Unsupported {
            capability: "export persistence",
        })
    }
}

impl FileWriter for StubBridge {
    fn write_file(&self, _bytes: &[u8], _file_name: &str, _directory: &Path) -> Result<PathBuf> {
        tracing::warn!("FileWriter::write_file called on stub bridge");
        Err(PagewerkError::Unsupported {
            capability: "file writing",
        })
    }
}
