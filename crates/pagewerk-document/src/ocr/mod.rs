// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR: catalog matching over injected raster and recognition capabilities,
// plus an optional local `ocrs` recogniser.

pub mod matcher;

#[cfg(feature = "ocr")]
pub mod engine;

pub use matcher::{CatalogIndex, PageMatcher, normalize, summarize};
