// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session lifecycle.
//
//   Empty → Loaded → [AutoMatching] → Interactive ⇄ Exporting → Exported | Failed
//
// Every phase change goes through `SessionPhase::apply`, so an illegal
// transition is reported the same way wherever it is attempted.

use pagewerk_core::error::{PagewerkError, Result};
use serde::{Deserialize, Serialize};

/// Where an editing session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No source document.
    #[default]
    Empty,
    /// Source parsed; the load has not finished yet.
    Loaded,
    /// The automatic post-load OCR pass is running.
    AutoMatching,
    /// Masks and assignments may be edited.
    Interactive,
    /// An export is producing output.
    Exporting,
    /// The last export succeeded.
    Exported,
    /// The last export failed; edits are intact and export may be retried.
    Failed,
}

/// Something that moves a session between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SourceLoaded,
    AutoMatchStarted,
    Ready,
    Edited,
    ExportStarted,
    ExportSucceeded,
    ExportFailed,
    Reset,
}

impl SessionEvent {
    /// Verb phrase used in `InvalidTransition` errors.
    pub fn action(self) -> &'static str {
        match self {
            Self::SourceLoaded => "load a document",
            Self::AutoMatchStarted => "start auto-matching",
            Self::Ready => "finish loading",
            Self::Edited => "edit masks or assignments",
            Self::ExportStarted => "export",
            Self::ExportSucceeded | Self::ExportFailed => "finish an export",
            Self::Reset => "reset",
        }
    }
}

impl SessionPhase {
    /// The phase `event` leads to, or `None` if it is not allowed here.
    pub fn next(self, event: SessionEvent) -> Option<SessionPhase> {
        use SessionEvent as E;
        use SessionPhase::*;

        match (self, event) {
            (_, E::Reset) => Some(Empty),
            (Empty, E::SourceLoaded) => Some(Loaded),
            (Loaded, E::AutoMatchStarted) => Some(AutoMatching),
            (Loaded | AutoMatching, E::Ready) => Some(Interactive),
            (Interactive | Exported | Failed, E::Edited) => Some(Interactive),
            (Interactive | Exported | Failed, E::ExportStarted) => Some(Exporting),
            (Exporting, E::ExportSucceeded) => Some(Exported),
            (Exporting, E::ExportFailed) => Some(Failed),
            _ => None,
        }
    }

    /// Like [`next`](Self::next), but reports a refused event as an error.
    pub fn apply(self, event: SessionEvent) -> Result<SessionPhase> {
        self.next(event).ok_or_else(|| PagewerkError::InvalidTransition {
            action: event.action(),
            phase: self.to_string(),
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loaded => "loaded",
            Self::AutoMatching => "auto-matching",
            Self::Interactive => "interactive",
            Self::Exporting => "exporting",
            Self::Exported => "exported",
            Self::Failed => "failed",
        }
    }

    /// Masks and assignments may change in this phase.
    pub fn is_editable(self) -> bool {
        self.next(SessionEvent::Edited).is_some()
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionEvent as E;
    use SessionPhase::*;

    #[test]
    fn fresh_load_path() {
        let phase = Empty.apply(E::SourceLoaded).unwrap();
        let phase = phase.apply(E::AutoMatchStarted).unwrap();
        assert_eq!(phase.apply(E::Ready).unwrap(), Interactive);
        assert_eq!(Loaded.apply(E::Ready).unwrap(), Interactive);
    }

    #[test]
    fn export_round_trip() {
        let exporting = Interactive.apply(E::ExportStarted).unwrap();
        assert_eq!(exporting.apply(E::ExportSucceeded).unwrap(), Exported);
        assert_eq!(exporting.apply(E::ExportFailed).unwrap(), Failed);
        // Retry after failure, or edit and come back.
        assert_eq!(Failed.apply(E::ExportStarted).unwrap(), Exporting);
        assert_eq!(Exported.apply(E::Edited).unwrap(), Interactive);
    }

    #[test]
    fn reset_is_always_allowed() {
        for phase in [Empty, Loaded, AutoMatching, Interactive, Exporting, Exported, Failed] {
            assert_eq!(phase.apply(E::Reset).unwrap(), Empty);
        }
    }

    #[test]
    fn illegal_events_name_action_and_phase() {
        let err = Exporting.apply(E::Edited).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot edit masks or assignments while the session is exporting"
        );
        assert!(Interactive.apply(E::SourceLoaded).is_err());
        assert!(Empty.apply(E::ExportStarted).is_err());
        assert!(AutoMatching.apply(E::ExportStarted).is_err());
    }

    #[test]
    fn editable_phases() {
        let editable: Vec<SessionPhase> = [Empty, Loaded, AutoMatching, Interactive, Exporting, Exported, Failed]
            .into_iter()
            .filter(|p| p.is_editable())
            .collect();
        assert_eq!(editable, vec![Interactive, Exported, Failed]);
    }
}
