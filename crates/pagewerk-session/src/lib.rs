// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-session — the editing session a front end drives: load one source
// document, auto-match pages against the catalog, edit masks and assignments,
// and export.

pub mod controller;
pub mod state;

pub use controller::{EditSession, LoadOutcome, SessionSnapshot, ViewState};
pub use state::{SessionEvent, SessionPhase};
