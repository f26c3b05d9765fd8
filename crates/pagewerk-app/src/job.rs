// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch job files: the masks and page assignments a command applies to a
// freshly loaded session before exporting.
//
//   {
//     "masks": [{ "page": 1, "x": 36, "y": 40, "w": 200, "h": 24 }],
//     "assignments": [{ "page": 1, "record": "A" }]
//   }
//
// Mask coordinates are document-space points, top-left origin.

use std::path::Path;

use pagewerk_core::error::Result;
use pagewerk_core::types::{Mask, PageIndex, RecordId};
use pagewerk_session::EditSession;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub masks: Vec<Mask>,
    pub assignments: Vec<JobAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAssignment {
    pub page: u32,
    pub record: String,
}

/// Counts of what a job changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub masks: usize,
    pub ignored_masks: usize,
    pub assignments: usize,
}

impl Job {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Apply masks, then assignments. Job assignments overwrite whatever
    /// auto-matching proposed for the same page.
    ///
    /// Stops at the first invalid entry; earlier entries stay applied.
    pub fn apply_to(&self, session: &EditSession, with_assignments: bool) -> Result<Applied> {
        let mut applied = Applied::default();
        for mask in &self.masks {
            match session.add_mask(*mask)? {
                Some(_) => applied.masks += 1,
                None => applied.ignored_masks += 1,
            }
        }
        if with_assignments {
            for assignment in &self.assignments {
                session.set_assignment(
                    PageIndex(assignment.page),
                    Some(RecordId::new(assignment.record.as_str())),
                )?;
                applied.assignments += 1;
            }
        } else if !self.assignments.is_empty() {
            warn!(
                count = self.assignments.len(),
                "Assignments ignored when redacting in place"
            );
        }

        if applied.ignored_masks > 0 {
            warn!(count = applied.ignored_masks, "Masks below the minimum size were dropped");
        }
        info!(
            masks = applied.masks,
            assignments = applied.assignments,
            "Job applied"
        );
        Ok(applied)
    }
}
