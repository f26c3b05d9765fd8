// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document — the document side of the split/redact engine.
//
// Provides the geometry mapper, source PDF loading, page copying with burned-in
// redactions, the mask/assignment store, the two export strategies, and OCR
// matching against the record catalog.

pub mod export;
pub mod geometry;
pub mod ocr;
pub mod pdf;
pub mod store;

// Re-export the primary types so callers can use `pagewerk_document::SourcePdf` etc.
pub use export::{
    ExportGroup, ExportPlan, ExportSettings, export_as_new_documents, redact_in_place,
    sanitize_file_name,
};
pub use geometry::{DragRect, PageBox, Point, flip_y, to_document_space, to_interaction_space};
pub use ocr::{CatalogIndex, PageMatcher};
pub use pdf::SourcePdf;
pub use store::MaskStore;

#[cfg(feature = "ocr")]
pub use ocr::engine::{OcrModelPaths, OcrsRecognizer};
