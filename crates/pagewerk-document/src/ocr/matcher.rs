// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR matcher: propose page → record assignments from recognised page text.
//
// Page text and catalog labels are normalised by dropping all whitespace and
// lower-casing. Catalog entries are tried in catalog order, code before name,
// and the first entry whose label occurs in the page text wins. When one
// entry's label is a substring of another's, catalog order decides.

use std::sync::Arc;

use pagewerk_bridge::{PageRasterizer, TextRecognizer};
use pagewerk_core::config::EngineConfig;
use pagewerk_core::error::Result;
use pagewerk_core::types::{AutoMatchSummary, PageFailure, PageIndex, Record, RecordId};
use tracing::{debug, info, instrument, warn};

/// Strip every whitespace character and lower-case the rest.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
struct IndexedRecord {
    id: RecordId,
    code: Option<String>,
    name: Option<String>,
}

/// The catalog with every label normalised once up front.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<IndexedRecord>,
}

impl CatalogIndex {
    pub fn new(records: &[Record]) -> Self {
        let label = |value: &Option<String>| {
            value
                .as_deref()
                .map(normalize)
                .filter(|normalized| !normalized.is_empty())
        };
        Self {
            entries: records
                .iter()
                .map(|record| IndexedRecord {
                    id: record.id.clone(),
                    code: label(&record.primary_code),
                    name: label(&record.display_name),
                })
                .collect(),
        }
    }

    /// True when no entry has a usable code or name.
    pub fn is_empty(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.code.is_none() && entry.name.is_none())
    }

    /// First catalog entry whose code, or else name, occurs in `page_text`.
    pub fn find(&self, page_text: &str) -> Option<&RecordId> {
        let haystack = normalize(page_text);
        if haystack.is_empty() {
            return None;
        }
        self.entries.iter().find_map(|entry| {
            let hit = [&entry.code, &entry.name]
                .into_iter()
                .flatten()
                .any(|label| haystack.contains(label.as_str()));
            hit.then_some(&entry.id)
        })
    }
}

/// Renders and recognises single pages, then matches them against a catalog.
#[derive(Clone)]
pub struct PageMatcher {
    rasterizer: Arc<dyn PageRasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
    scale: f32,
    language_hints: Vec<String>,
}

impl PageMatcher {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            rasterizer,
            recognizer,
            scale: config.effective_ocr_scale(),
            language_hints: config.ocr_language_hints.clone(),
        }
    }

    /// Raster scale used for OCR input, never below the accuracy floor.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Recognise `page` of `pdf` and look it up in `index`.
    ///
    /// Blocking. Errors are the page's own raster or OCR failure.
    #[instrument(skip_all, fields(page = page.get()))]
    pub fn match_page(
        &self,
        pdf: &[u8],
        page: PageIndex,
        index: &CatalogIndex,
    ) -> Result<Option<RecordId>> {
        let image = self.rasterizer.rasterize(pdf, page, self.scale)?;
        let text = self.recognizer.recognize_text(&image, &self.language_hints)?;
        let found = index.find(&text).cloned();
        debug!(
            chars = text.len(),
            matched = found.as_ref().map(RecordId::as_str),
            "Page recognised"
        );
        Ok(found)
    }

    /// Match pages `1..=page_count` one after another.
    pub fn match_all(&self, pdf: &[u8], page_count: u32, index: &CatalogIndex) -> AutoMatchSummary {
        if index.is_empty() {
            info!("Catalog has no matchable entries, skipping OCR");
            return AutoMatchSummary::default();
        }
        summarize((1..=page_count).map(|n| {
            let page = PageIndex(n);
            (page, self.match_page(pdf, page, index))
        }))
    }
}

/// Fold per-page outcomes into one summary.
///
/// Failed pages are logged and recorded; they never fail the batch. Outcomes
/// may arrive in any order.
pub fn summarize(
    outcomes: impl IntoIterator<Item = (PageIndex, Result<Option<RecordId>>)>,
) -> AutoMatchSummary {
    let mut summary = AutoMatchSummary::default();
    for (page, outcome) in outcomes {
        summary.examined_pages += 1;
        match outcome {
            Ok(Some(record_id)) => {
                summary.matches.insert(page, record_id);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(page = page.get(), %err, "Page skipped during auto-match");
                summary.failures.push(PageFailure {
                    page,
                    reason: err.to_string(),
                });
            }
        }
    }
    summary.matched_count = summary.matches.len();
    summary.failures.sort_by_key(|failure| failure.page);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewerk_bridge::memory::{PageTaggingRasterizer, ScriptedRecognizer};
    use pagewerk_core::error::PagewerkError;

    fn catalog() -> Vec<Record> {
        vec![
            Record::new("1", Some("BR-100"), Some("Bracket")),
            Record::new("2", Some("HG 220"), Some("Hinge")),
            Record::new("3", None, Some("Steel Plate")),
        ]
    }

    #[test]
    fn normalize_drops_whitespace_and_case() {
        assert_eq!(normalize("  Part No:\tBR - 100\n"), "partno:br-100");
        assert_eq!(normalize(" \t\n"), "");
    }

    #[test]
    fn code_matches_across_spacing_and_case() {
        let index = CatalogIndex::new(&catalog());
        assert_eq!(index.find("ORDER hg220 qty 4"), Some(&RecordId::new("2")));
        assert_eq!(index.find("Item: STEEL\nPLATE 3mm"), Some(&RecordId::new("3")));
        assert_eq!(index.find("nothing relevant"), None);
    }

    #[test]
    fn first_catalog_entry_wins() {
        // Page mentions both records; catalog order decides.
        let index = CatalogIndex::new(&catalog());
        assert_eq!(index.find("hinge for bracket"), Some(&RecordId::new("1")));
    }

    #[test]
    fn substring_codes_resolve_by_catalog_order() {
        let records = vec![
            Record::new("short", Some("A1"), None),
            Record::new("long", Some("A12"), None),
        ];
        let index = CatalogIndex::new(&records);
        assert_eq!(index.find("code A12"), Some(&RecordId::new("short")));
    }

    #[test]
    fn blank_labels_never_match() {
        let records = vec![Record::new("blank", Some("  "), Some("")), Record::new("x", None, Some("X9"))];
        let index = CatalogIndex::new(&records);
        assert!(!index.is_empty());
        assert_eq!(index.find("anything x9"), Some(&RecordId::new("x")));
        assert!(CatalogIndex::new(&records[..1]).is_empty());
    }

    #[test]
    fn empty_catalog_yields_no_matches_without_ocr() {
        let rasterizer = Arc::new(PageTaggingRasterizer::new());
        let matcher = PageMatcher::new(
            rasterizer.clone(),
            Arc::new(ScriptedRecognizer::new()),
            &EngineConfig::default(),
        );
        let summary = matcher.match_all(b"", 3, &CatalogIndex::new(&[]));
        assert!(summary.no_matches());
        assert_eq!(summary.examined_pages, 0);
        assert_eq!(rasterizer.calls(), 0);
    }

    #[test]
    fn failed_pages_are_recorded_and_batch_continues() {
        let rasterizer = Arc::new(PageTaggingRasterizer::failing_on([2]));
        let recognizer = ScriptedRecognizer::new()
            .with_page(1, "BR-100")
            .with_page(3, "Hinge")
            .failing_on(4);
        let matcher = PageMatcher::new(rasterizer.clone(), Arc::new(recognizer), &EngineConfig::default());

        let summary = matcher.match_all(b"", 5, &CatalogIndex::new(&catalog()));

        assert_eq!(summary.examined_pages, 5);
        assert_eq!(summary.matched_count, 2);
        assert_eq!(summary.matches.get(&PageIndex(1)), Some(&RecordId::new("1")));
        assert_eq!(summary.matches.get(&PageIndex(3)), Some(&RecordId::new("2")));
        let failed: Vec<u32> = summary.failures.iter().map(|f| f.page.get()).collect();
        assert_eq!(failed, vec![2, 4]);
    }

    #[test]
    fn ocr_scale_never_drops_below_floor() {
        let rasterizer = Arc::new(PageTaggingRasterizer::new());
        let config = EngineConfig {
            ocr_scale: 0.5,
            ..EngineConfig::default()
        };
        let matcher = PageMatcher::new(rasterizer.clone(), Arc::new(ScriptedRecognizer::new()), &config);
        matcher
            .match_page(b"", PageIndex(1), &CatalogIndex::new(&catalog()))
            .unwrap();
        assert_eq!(rasterizer.requested_scales(), vec![2.0]);
    }

    #[test]
    fn summarize_accepts_out_of_order_outcomes() {
        let summary = summarize(vec![
            (PageIndex(3), Err(PagewerkError::OcrError("blurred".into()))),
            (PageIndex(2), Ok(Some(RecordId::new("b")))),
            (PageIndex(1), Err(PagewerkError::RasterError("bad".into()))),
        ]);
        assert_eq!(summary.matched_count, 1);
        assert_eq!(summary.failures[0].page, PageIndex(1));
    }
}
