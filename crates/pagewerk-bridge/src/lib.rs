// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk — external capability abstractions.
//
// The engine never reaches for ambient globals: the record catalog, page
// rasteriser, OCR engine, export persistence, and file writing are all
// injected as trait objects bundled in `Capabilities`.

pub mod desktop;
pub mod memory;
pub mod stub;
pub mod traits;

pub use traits::{
    Capabilities, DocumentFetcher, ExportSink, FileWriter, PageRasterizer, RecordCatalogSource,
    TextRecognizer,
};
