// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading the source, copying pages, and burning in redactions.

pub(crate) mod copy;
pub(crate) mod redact;
pub mod reader;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use reader::SourcePdf;
