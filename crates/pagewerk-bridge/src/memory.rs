// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory capability implementations.
//
// Used by tests across the workspace and by embedders that already hold the
// catalog and want exported files handed back in memory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{ExportedFile, PageIndex, Record};

use crate::traits::*;

/// A catalog fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: Vec<Record>,
}

impl StaticCatalog {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl RecordCatalogSource for StaticCatalog {
    fn fetch_record_catalog(&self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}

/// Documents keyed by reference string.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.documents.insert(reference.into(), bytes);
        self
    }
}

impl DocumentFetcher for MemoryFetcher {
    fn fetch_document(&self, reference: &str) -> Result<Vec<u8>> {
        self.documents
            .get(reference)
            .cloned()
            .ok_or_else(|| PagewerkError::Storage(format!("no document stored under {reference}")))
    }
}

/// Rasteriser that encodes the page number in the image width.
///
/// Produces a 1-pixel-high grey strip `page` pixels wide, which
/// [`ScriptedRecognizer`] decodes back into the page number. Pages listed in
/// `failing` return a raster error instead.
#[derive(Debug, Default)]
pub struct PageTaggingRasterizer {
    failing: HashSet<u32>,
    calls: AtomicUsize,
    scales: Mutex<Vec<f32>>,
}

impl PageTaggingRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(pages: impl IntoIterator<Item = u32>) -> Self {
        Self {
            failing: pages.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Number of rasterise calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every scale factor requested so far.
    pub fn requested_scales(&self) -> Vec<f32> {
        self.scales.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PageRasterizer for PageTaggingRasterizer {
    fn rasterize(&self, _pdf: &[u8], page: PageIndex, scale: f32) -> Result<DynamicImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut scales) = self.scales.lock() {
            scales.push(scale);
        }
        if self.failing.contains(&page.get()) {
            return Err(PagewerkError::RasterError(format!("page {page} unreadable")));
        }
        Ok(DynamicImage::new_luma8(page.get().max(1), 1))
    }
}

/// Recogniser returning canned text per page, keyed by the image width that
/// [`PageTaggingRasterizer`] produces.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    texts: HashMap<u32, String>,
    failing: HashSet<u32>,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, text: impl Into<String>) -> Self {
        self.texts.insert(page, text.into());
        self
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize_text(&self, image: &DynamicImage, _language_hints: &[String]) -> Result<String> {
        let page = image.width();
        if self.failing.contains(&page) {
            return Err(PagewerkError::OcrError(format!("no text detected on page {page}")));
        }
        Ok(self.texts.get(&page).cloned().unwrap_or_default())
    }
}

/// Collects persisted exports in memory.
#[derive(Debug, Default)]
pub struct MemoryExportSink {
    files: Mutex<Vec<ExportedFile>>,
    reject: bool,
}

impl MemoryExportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every request, for exercising retry paths.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn files(&self) -> Vec<ExportedFile> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl ExportSink for MemoryExportSink {
    fn persist_exported_files(&self, files: &[ExportedFile]) -> Result<()> {
        if self.reject {
            return Err(PagewerkError::Storage("export store rejected the upload".into()));
        }
        let mut stored = self
            .files
            .lock()
            .map_err(|_| PagewerkError::Storage("export store lock poisoned".into()))?;
        stored.extend_from_slice(files);
        Ok(())
    }
}

/// One file recorded by [`MemoryFileWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub directory: PathBuf,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Records writes instead of touching the disk.
#[derive(Debug, Default)]
pub struct MemoryFileWriter {
    written: Mutex<Vec<WrittenFile>>,
    reject: bool,
}

impl MemoryFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<WrittenFile> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl FileWriter for MemoryFileWriter {
    fn write_file(&self, bytes: &[u8], file_name: &str, directory: &Path) -> Result<PathBuf> {
        if self.reject {
            return Err(PagewerkError::Storage(format!(
                "write to {} refused",
                directory.join(file_name).display()
            )));
        }
        let mut written = self
            .written
            .lock()
            .map_err(|_| PagewerkError::Storage("writer lock poisoned".into()))?;
        written.push(WrittenFile {
            directory: directory.to_path_buf(),
            file_name: file_name.to_owned(),
            bytes: bytes.to_vec(),
        });
        Ok(directory.join(file_name))
    }
}
