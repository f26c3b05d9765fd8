// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source PDF: the loaded document an editing session works from, with page
// lookup and page-tree attribute inheritance on top of `lopdf`.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{PageIndex, PageSize};
use tracing::{debug, info, instrument, warn};

use crate::geometry::PageBox;

/// Guard against malformed page trees whose /Parent chain loops.
const MAX_TREE_DEPTH: usize = 64;

/// A parsed source document. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourcePdf {
    document: Document,
    /// Page number (1-based) to page object, in page-tree order.
    pages: BTreeMap<u32, ObjectId>,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl SourcePdf {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            PagewerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        let mut source = Self::from_document(document)?;
        source.source_path = Some(path_ref.display().to_string());
        Ok(source)
    }

    /// Parse PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PagewerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        Self::from_document(document)
    }

    fn from_document(document: Document) -> Result<Self> {
        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(PagewerkError::PdfError("document has no pages".into()));
        }
        debug!(pages = pages.len(), version = %document.version, "PDF loaded");
        Ok(Self {
            document,
            pages,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Return the source path if created via [`SourcePdf::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// Object id of `page`, or `PageOutOfRange`.
    pub fn page_id(&self, page: PageIndex) -> Result<ObjectId> {
        self.pages
            .get(&page.get())
            .copied()
            .ok_or(PagewerkError::PageOutOfRange {
                page: page.get(),
                page_count: self.page_count(),
            })
    }

    /// Effective MediaBox of `page`, inherited through the page tree.
    pub fn page_box(&self, page: PageIndex) -> Result<PageBox> {
        let page_id = self.page_id(page)?;
        Ok(page_box_of(&self.document, page_id))
    }

    /// Size of every page, in page order.
    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.pages
            .values()
            .map(|id| page_box_of(&self.document, *id).size())
            .collect()
    }
}

/// Effective MediaBox of the page object `page_id` in `document`.
pub(crate) fn page_box_of(document: &Document, page_id: ObjectId) -> PageBox {
    let corners = inherited_attribute(document, page_id, b"MediaBox")
        .and_then(|object| resolve(document, object).as_array().ok())
        .and_then(|items| {
            let numbers: Vec<f64> = items
                .iter()
                .filter_map(|item| number(resolve(document, item)))
                .collect();
            match numbers.as_slice() {
                [a, b, c, d] => Some(PageBox::from_corners(*a, *b, *c, *d)),
                _ => None,
            }
        });

    corners.unwrap_or_else(|| {
        warn!(?page_id, "Page has no usable MediaBox, assuming US Letter");
        PageBox::LETTER
    })
}

/// Look up `key` on the page dictionary, then on each /Parent in turn.
///
/// Only meaningful for inheritable attributes (MediaBox, CropBox, Resources,
/// Rotate).
pub(crate) fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    warn!(?page_id, "Page tree deeper than {MAX_TREE_DEPTH} levels");
    None
}

/// Follow a single indirect reference; anything else is returned as is.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}
