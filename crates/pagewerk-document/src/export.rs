// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Segmentation and export: turn assignments and masks into output PDFs.
//
// Two strategies share the same burn-in rule:
// - new documents: one fresh PDF per record holding only its pages;
// - in place: the whole source with masks burned in, pages untouched.

use std::collections::{HashMap, HashSet};

use lopdf::Document;
use pagewerk_core::config::EngineConfig;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{Assignments, ExportedFile, Mask, PageIndex, Record, RecordId};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{PdfRect, redaction_rect};
use crate::pdf::SourcePdf;
use crate::pdf::copy::{PageCopier, empty_document, finish_page_tree};
use crate::pdf::reader::page_box_of;
use crate::pdf::redact::burn_in;

/// Characters not allowed in exported file names.
const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Export knobs taken from [`EngineConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub redaction_color: [f32; 3],
    pub fallback_file_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ExportSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            redaction_color: config.redaction_color,
            fallback_file_name: config.fallback_file_name.clone(),
        }
    }
}

// -- Plan -----------------------------------------------------------------------

/// The pages going into one record's document, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportGroup {
    pub record_id: RecordId,
    pub pages: Vec<PageIndex>,
}

/// Assigned pages grouped by record, ordered by each record's first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    groups: Vec<ExportGroup>,
}

impl ExportPlan {
    /// Group `assignments` by record. Fails with `NoAssignments` when empty.
    pub fn from_assignments(assignments: &Assignments) -> Result<Self> {
        if assignments.is_empty() {
            return Err(PagewerkError::NoAssignments);
        }

        let mut groups: Vec<ExportGroup> = Vec::new();
        let mut slot: HashMap<&RecordId, usize> = HashMap::new();
        // BTreeMap iteration is by ascending page, so each group ascends too.
        for (page, record_id) in assignments {
            match slot.get(record_id) {
                Some(index) => groups[*index].pages.push(*page),
                None => {
                    slot.insert(record_id, groups.len());
                    groups.push(ExportGroup {
                        record_id: record_id.clone(),
                        pages: vec![*page],
                    });
                }
            }
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[ExportGroup] {
        &self.groups
    }

    /// Number of output documents.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// -- File names -----------------------------------------------------------------

/// Replace every forbidden or control character with `_` and trim whitespace.
pub fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Hands out unique `.pdf` names for one export run.
struct FileNamer<'a> {
    catalog: HashMap<&'a RecordId, &'a Record>,
    fallback: String,
    taken: HashSet<String>,
}

impl<'a> FileNamer<'a> {
    fn new(catalog: &'a [Record], fallback: &str) -> Self {
        let fallback = sanitize_file_name(fallback);
        Self {
            catalog: catalog.iter().map(|record| (&record.id, record)).collect(),
            fallback: if fallback.is_empty() {
                "document".to_owned()
            } else {
                fallback
            },
            taken: HashSet::new(),
        }
    }

    /// The record's code, else its name, else the fallback. Returns the file
    /// name and whether the fallback was used.
    fn name_for(&mut self, record_id: &RecordId) -> (String, bool) {
        let chosen = self.catalog.get(record_id).and_then(|record| {
            [&record.primary_code, &record.display_name]
                .into_iter()
                .flatten()
                .map(|label| sanitize_file_name(label))
                .find(|label| !label.is_empty())
        });

        let used_fallback = chosen.is_none();
        if used_fallback {
            warn!(%record_id, fallback = %self.fallback, "Record has no usable name, using fallback");
        }
        let stem = chosen.unwrap_or_else(|| self.fallback.clone());
        (self.unique(&stem), used_fallback)
    }

    /// `stem.pdf`, or `stem-2.pdf`, `stem-3.pdf`, … if already handed out.
    /// Comparison ignores case.
    fn unique(&mut self, stem: &str) -> String {
        let mut candidate = format!("{stem}.pdf");
        let mut n = 2;
        while !self.taken.insert(candidate.to_lowercase()) {
            candidate = format!("{stem}-{n}.pdf");
            n += 1;
        }
        candidate
    }
}

// -- Export ---------------------------------------------------------------------

/// Build one PDF per group of `plan`, each holding that record's pages in
/// ascending order with `masks` burned in.
///
/// Nothing is written anywhere; the caller decides where the bytes go.
#[instrument(skip_all, fields(records = plan.len(), masks = masks.len()))]
pub fn export_as_new_documents(
    source: &SourcePdf,
    plan: &ExportPlan,
    masks: &[Mask],
    catalog: &[Record],
    settings: &ExportSettings,
) -> Result<Vec<ExportedFile>> {
    let mut namer = FileNamer::new(catalog, &settings.fallback_file_name);
    let mut files = Vec::with_capacity(plan.len());

    for group in plan.groups() {
        let bytes = build_record_document(source, &group.pages, masks, settings)?;
        let (file_name, used_fallback_name) = namer.name_for(&group.record_id);
        debug!(
            record_id = %group.record_id,
            pages = group.pages.len(),
            bytes = bytes.len(),
            %file_name,
            "Record document built"
        );
        files.push(ExportedFile {
            bytes,
            file_name,
            record_id: group.record_id.clone(),
            pages: group.pages.clone(),
            used_fallback_name,
        });
    }

    info!(files = files.len(), "Export complete");
    Ok(files)
}

fn build_record_document(
    source: &SourcePdf,
    pages: &[PageIndex],
    masks: &[Mask],
    settings: &ExportSettings,
) -> Result<Vec<u8>> {
    let page_ids = pages
        .iter()
        .map(|page| source.page_id(*page))
        .collect::<Result<Vec<_>>>()?;

    let (mut target, pages_id) = empty_document(source.version());
    let mut copier = PageCopier::new(source.document(), page_ids.iter().copied());
    let mut kids = Vec::with_capacity(pages.len());

    for (page, source_id) in pages.iter().zip(&page_ids) {
        let new_id = copier.copy_page(&mut target, *source_id, pages_id)?;
        // Flip within the source page's own box, not the output's first page.
        let page_box = source.page_box(*page)?;
        let rects: Vec<PdfRect> = masks
            .iter()
            .filter(|mask| mask.page == *page)
            .map(|mask| redaction_rect(mask, &page_box))
            .collect();
        burn_in(&mut target, new_id, &rects, settings.redaction_color)?;
        kids.push(new_id);
    }
    finish_page_tree(&mut target, pages_id, &kids);

    serialize(&mut target)
}

/// The whole source with `masks` burned in. Page count and order are unchanged.
#[instrument(skip_all, fields(pages = source.page_count(), masks = masks.len()))]
pub fn redact_in_place(
    source: &SourcePdf,
    masks: &[Mask],
    settings: &ExportSettings,
) -> Result<Vec<u8>> {
    for mask in masks {
        source.page_id(mask.page)?;
    }

    let mut document = source.document().clone();
    for (page_no, page_id) in document.get_pages() {
        let page = PageIndex(page_no);
        let page_box = page_box_of(&document, page_id);
        let rects: Vec<PdfRect> = masks
            .iter()
            .filter(|mask| mask.page == page)
            .map(|mask| redaction_rect(mask, &page_box))
            .collect();
        burn_in(&mut document, page_id, &rects, settings.redaction_color)?;
    }

    let bytes = serialize(&mut document)?;
    info!(bytes = bytes.len(), "Source redacted in place");
    Ok(bytes)
}

fn serialize(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document.save_to(&mut output).map_err(|err| {
        PagewerkError::PdfError(format!("failed to serialise PDF: {}", err))
    })?;
    Ok(output)
}
