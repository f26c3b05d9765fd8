// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewerk split/redact engine.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an editing session (appears in every log span).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-based page number within the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIndex(pub u32);

impl PageIndex {
    /// Whether this page exists in a document of `page_count` pages.
    pub fn is_within(self, page_count: u32) -> bool {
        self.0 >= 1 && self.0 <= page_count
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for PageIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a catalog record (an order line item in the backend store).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the externally supplied record catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Part number / line-item code printed on the paperwork.
    #[serde(default)]
    pub primary_code: Option<String>,
    /// Human-readable name of the line item.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        primary_code: Option<&str>,
        display_name: Option<&str>,
    ) -> Self {
        Self {
            id: RecordId::new(id),
            primary_code: primary_code.map(str::to_owned),
            display_name: display_name.map(str::to_owned),
        }
    }
}

/// A rectangular redaction region on one page.
///
/// Coordinates are document-space points with a top-left origin: already
/// divided by the zoom factor that was active when the rectangle was drawn,
/// but not yet flipped into PDF's bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    pub page: PageIndex,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Mask {
    pub fn new(page: impl Into<PageIndex>, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            page: page.into(),
            x,
            y,
            w,
            h,
        }
    }
}

/// Partial page → record mapping. Pages without an entry are unassigned.
pub type Assignments = BTreeMap<PageIndex, RecordId>;

/// How OCR results are folded into existing assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// A newly matched page replaces whatever it was assigned to before.
    #[default]
    Overwrite,
    /// Pages that already carry an assignment are left untouched.
    KeepExisting,
}

/// What the session produces when the operator is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditTarget {
    /// One fresh PDF per record, containing only that record's pages.
    NewDocuments,
    /// Masks burned into the original file, page order and count preserved.
    OverwriteInPlace { original: PathBuf },
}

impl EditTarget {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NewDocuments => "new-documents",
            Self::OverwriteInPlace { .. } => "overwrite-in-place",
        }
    }
}

/// Where the session's PDF bytes come from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Bytes already in memory (upload, drag-and-drop).
    Bytes { bytes: Vec<u8>, name: Option<String> },
    /// A reference resolved through the document fetcher capability.
    Reference(String),
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Read-only facts about the loaded source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: Option<String>,
    pub page_count: u32,
    pub page_sizes: Vec<PageSize>,
    /// SHA-256 of the source bytes, lowercase hex.
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

/// One output document produced by a split export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub record_id: RecordId,
    /// Source pages included, in output order.
    pub pages: Vec<PageIndex>,
    /// The record had neither code nor name (or was missing from the catalog).
    pub used_fallback_name: bool,
}

/// A page that could not be processed during an OCR batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFailure {
    pub page: PageIndex,
    pub reason: String,
}

/// Outcome of one OCR matching run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoMatchSummary {
    pub matched_count: usize,
    pub examined_pages: usize,
    pub matches: Assignments,
    pub failures: Vec<PageFailure>,
}

impl AutoMatchSummary {
    pub fn no_matches(&self) -> bool {
        self.matched_count == 0
    }
}
