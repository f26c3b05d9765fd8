// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mask and assignment store for one loaded document.
//
// Masks are kept in one flat list in insertion order; a mask is addressed by
// its page plus its position among that page's masks. Assignments map pages
// to at most one record.

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{Assignments, Mask, MergePolicy, PageIndex, RecordId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Masks and page assignments for a document of `page_count` pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskStore {
    page_count: u32,
    min_size: f64,
    masks: Vec<Mask>,
    assignments: Assignments,
}

impl MaskStore {
    pub fn new(page_count: u32, min_size: f64) -> Self {
        Self {
            page_count,
            min_size,
            masks: Vec::new(),
            assignments: Assignments::new(),
        }
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    fn check_page(&self, page: PageIndex) -> Result<()> {
        if page.is_within(self.page_count) {
            Ok(())
        } else {
            Err(PagewerkError::PageOutOfRange {
                page: page.get(),
                page_count: self.page_count,
            })
        }
    }

    // -- Masks ----------------------------------------------------------------

    /// Store `mask`, returning its position among its page's masks.
    ///
    /// Returns `Ok(None)` when the rectangle is smaller than the minimum size
    /// in either dimension: an accidental click, silently dropped.
    pub fn add_mask(&mut self, mask: Mask) -> Result<Option<usize>> {
        self.check_page(mask.page)?;
        let coords = [mask.x, mask.y, mask.w, mask.h];
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(PagewerkError::InvalidMask(format!(
                "non-finite coordinates on page {}",
                mask.page
            )));
        }
        if mask.w < 0.0 || mask.h < 0.0 {
            return Err(PagewerkError::InvalidMask(format!(
                "negative size {}x{} on page {}",
                mask.w, mask.h, mask.page
            )));
        }
        if mask.w < self.min_size || mask.h < self.min_size {
            debug!(page = %mask.page, w = mask.w, h = mask.h, "Ignoring stray click");
            return Ok(None);
        }

        let position = self.masks_on_page(mask.page).count();
        self.masks.push(mask);
        Ok(Some(position))
    }

    /// Remove the `local_index`-th mask of `page`.
    pub fn remove_mask(&mut self, page: PageIndex, local_index: usize) -> Result<Mask> {
        let global = self
            .masks
            .iter()
            .enumerate()
            .filter(|(_, mask)| mask.page == page)
            .nth(local_index)
            .map(|(index, _)| index)
            .ok_or(PagewerkError::MaskNotFound {
                page: page.get(),
                index: local_index,
            })?;
        Ok(self.masks.remove(global))
    }

    /// Masks on `page`, in the order they were drawn.
    pub fn masks_on_page(&self, page: PageIndex) -> impl Iterator<Item = &Mask> {
        self.masks.iter().filter(move |mask| mask.page == page)
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    // -- Assignments ----------------------------------------------------------

    /// Assign `page` to `record`, or clear it with `None`. Returns the
    /// previous assignment.
    pub fn set_assignment(
        &mut self,
        page: PageIndex,
        record: Option<RecordId>,
    ) -> Result<Option<RecordId>> {
        self.check_page(page)?;
        Ok(match record {
            Some(record) => self.assignments.insert(page, record),
            None => self.assignments.remove(&page),
        })
    }

    /// Fold a batch of assignments in. Pages absent from `incoming` keep
    /// their current record. Returns how many entries changed.
    ///
    /// The batch is validated as a whole before anything is applied.
    pub fn merge_assignments(&mut self, incoming: &Assignments, policy: MergePolicy) -> Result<usize> {
        for page in incoming.keys() {
            self.check_page(*page)?;
        }

        let mut changed = 0;
        for (page, record) in incoming {
            let keep = policy == MergePolicy::KeepExisting && self.assignments.contains_key(page);
            if keep || self.assignments.get(page) == Some(record) {
                continue;
            }
            self.assignments.insert(*page, record.clone());
            changed += 1;
        }
        Ok(changed)
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn assignment(&self, page: PageIndex) -> Option<&RecordId> {
        self.assignments.get(&page)
    }

    /// Drop every mask and assignment.
    pub fn clear(&mut self) {
        self.masks.clear();
        self.assignments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MaskStore {
        MaskStore::new(5, 5.0)
    }

    #[test]
    fn tiny_masks_are_ignored() {
        let mut store = store();
        assert_eq!(store.add_mask(Mask::new(1, 10.0, 10.0, 4.9, 40.0)).unwrap(), None);
        assert_eq!(store.add_mask(Mask::new(1, 10.0, 10.0, 40.0, 2.0)).unwrap(), None);
        assert!(store.masks().is_empty());
        assert_eq!(store.add_mask(Mask::new(1, 10.0, 10.0, 5.0, 5.0)).unwrap(), Some(0));
    }

    #[test]
    fn masks_outside_document_are_rejected() {
        let mut store = store();
        assert!(matches!(
            store.add_mask(Mask::new(6, 0.0, 0.0, 50.0, 50.0)),
            Err(PagewerkError::PageOutOfRange { page: 6, page_count: 5 })
        ));
        assert!(store.add_mask(Mask::new(0, 0.0, 0.0, 50.0, 50.0)).is_err());
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let mut store = store();
        assert!(matches!(
            store.add_mask(Mask::new(1, f64::NAN, 0.0, 50.0, 50.0)),
            Err(PagewerkError::InvalidMask(_))
        ));
        assert!(matches!(
            store.add_mask(Mask::new(1, 0.0, 0.0, -50.0, 50.0)),
            Err(PagewerkError::InvalidMask(_))
        ));
    }

    #[test]
    fn remove_uses_position_within_page() {
        let mut store = store();
        store.add_mask(Mask::new(1, 0.0, 0.0, 10.0, 10.0)).unwrap();
        store.add_mask(Mask::new(2, 0.0, 0.0, 20.0, 20.0)).unwrap();
        assert_eq!(store.add_mask(Mask::new(1, 5.0, 5.0, 30.0, 30.0)).unwrap(), Some(1));

        let removed = store.remove_mask(PageIndex(1), 1).unwrap();
        assert_eq!(removed, Mask::new(1, 5.0, 5.0, 30.0, 30.0));
        assert_eq!(store.masks().len(), 2);
        assert_eq!(store.masks_on_page(PageIndex(2)).count(), 1);

        assert!(matches!(
            store.remove_mask(PageIndex(1), 1),
            Err(PagewerkError::MaskNotFound { page: 1, index: 1 })
        ));
    }

    #[test]
    fn set_assignment_replaces_and_clears() {
        let mut store = store();
        assert_eq!(store.set_assignment(PageIndex(2), Some(RecordId::new("a"))).unwrap(), None);
        assert_eq!(
            store.set_assignment(PageIndex(2), Some(RecordId::new("b"))).unwrap(),
            Some(RecordId::new("a"))
        );
        assert_eq!(store.set_assignment(PageIndex(2), None).unwrap(), Some(RecordId::new("b")));
        assert!(store.assignments().is_empty());
        assert!(store.set_assignment(PageIndex(9), None).is_err());
    }

    #[test]
    fn merge_overwrites_matched_pages_only() {
        let mut store = store();
        store.set_assignment(PageIndex(1), Some(RecordId::new("manual"))).unwrap();
        store.set_assignment(PageIndex(4), Some(RecordId::new("manual"))).unwrap();

        let mut incoming = Assignments::new();
        incoming.insert(PageIndex(1), RecordId::new("ocr"));
        incoming.insert(PageIndex(2), RecordId::new("ocr"));

        let changed = store.merge_assignments(&incoming, MergePolicy::Overwrite).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(store.assignment(PageIndex(1)), Some(&RecordId::new("ocr")));
        assert_eq!(store.assignment(PageIndex(2)), Some(&RecordId::new("ocr")));
        // Page 4 was not examined, so it keeps its record.
        assert_eq!(store.assignment(PageIndex(4)), Some(&RecordId::new("manual")));
    }

    #[test]
    fn merge_keep_existing_preserves_manual_work() {
        let mut store = store();
        store.set_assignment(PageIndex(1), Some(RecordId::new("manual"))).unwrap();

        let mut incoming = Assignments::new();
        incoming.insert(PageIndex(1), RecordId::new("ocr"));
        incoming.insert(PageIndex(3), RecordId::new("ocr"));

        let changed = store.merge_assignments(&incoming, MergePolicy::KeepExisting).unwrap();
        assert_eq!(changed, 1);
        assert_eq!(store.assignment(PageIndex(1)), Some(&RecordId::new("manual")));
    }

    #[test]
    fn merge_with_bad_page_applies_nothing() {
        let mut store = store();
        let mut incoming = Assignments::new();
        incoming.insert(PageIndex(1), RecordId::new("ocr"));
        incoming.insert(PageIndex(8), RecordId::new("ocr"));
        assert!(store.merge_assignments(&incoming, MergePolicy::Overwrite).is_err());
        assert!(store.assignments().is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut store = store();
        store.add_mask(Mask::new(1, 0.0, 0.0, 10.0, 10.0)).unwrap();
        store.set_assignment(PageIndex(1), Some(RecordId::new("a"))).unwrap();
        store.clear();
        assert!(store.masks().is_empty());
        assert!(store.assignments().is_empty());
        assert_eq!(store.page_count(), 5);
    }
}
