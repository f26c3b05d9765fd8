// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the front end presents it.

use crate::error::PagewerkError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary condition; trying again may work.
    Transient,
    /// The operator has to do something first (load a file, assign a page).
    ActionRequired,
    /// Retrying will not help: damaged file, missing capability.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the operator should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same operation could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, retriable: bool, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable,
            severity,
        }
    }
}

/// Convert a `PagewerkError` into a `HumanError` an operator can act on.
pub fn humanize_error(err: &PagewerkError) -> HumanError {
    match err {
        // -- Validation --
        PagewerkError::NoSourceLoaded => HumanError::new(
            "No document is open.",
            "Open the scanned PDF first.",
            false,
            Severity::ActionRequired,
        ),

        PagewerkError::NoAssignments => HumanError::new(
            "No pages are assigned to a line item.",
            "Assign at least one page to a line item (or run auto-match), then export again.",
            false,
            Severity::ActionRequired,
        ),

        PagewerkError::PageOutOfRange { page, page_count } => HumanError::new(
            "That page doesn't exist in this document.",
            format!("Pick a page between 1 and {page_count} (got {page})."),
            false,
            Severity::ActionRequired,
        ),

        PagewerkError::InvalidMask(detail) => HumanError::new(
            "That redaction box couldn't be added.",
            format!("Drag a larger box over the area to hide. ({detail})"),
            false,
            Severity::ActionRequired,
        ),

        PagewerkError::InvalidZoom(_) => HumanError::new(
            "That zoom level isn't possible.",
            "Pick a zoom level above 0%.",
            false,
            Severity::ActionRequired,
        ),

        PagewerkError::MaskNotFound { .. } => HumanError::new(
            "That redaction box no longer exists.",
            "Refresh the page view and select the box again.",
            false,
            Severity::ActionRequired,
        ),

        PagewerkError::InvalidTransition { action, phase } => HumanError::new(
            "That step isn't possible right now.",
            format!("You can't {action} while the document is {phase}."),
            false,
            Severity::ActionRequired,
        ),

        PagewerkError::Busy => HumanError::new(
            "Still working on the previous step.",
            "Wait for the current operation to finish, then try again.",
            true,
            Severity::Transient,
        ),

        PagewerkError::WrongEditTarget { expected } => HumanError::new(
            "This document was opened for a different kind of edit.",
            format!("Reopen the document in {expected} mode."),
            false,
            Severity::ActionRequired,
        ),

        // -- Page processing --
        PagewerkError::RasterError(_) => HumanError::new(
            "A page couldn't be rendered.",
            "The page may be damaged. Assign it by hand instead.",
            true,
            Severity::Transient,
        ),

        PagewerkError::OcrError(_) => HumanError::new(
            "Text recognition didn't work on this page.",
            "Assign the page by hand, or rescan it with the text clear and in focus.",
            true,
            Severity::Transient,
        ),

        // -- Document --
        PagewerkError::PdfError(_) => HumanError::new(
            "There's a problem with this PDF file.",
            "The file may be damaged. Try opening it in a PDF viewer to check it works, or rescan the paperwork.",
            false,
            Severity::Permanent,
        ),

        PagewerkError::ImageError(_) => HumanError::new(
            "A page image couldn't be processed.",
            "Try again. If this keeps happening, rescan the document.",
            true,
            Severity::Transient,
        ),

        PagewerkError::TaskFailed(_) => HumanError::new(
            "The operation stopped unexpectedly.",
            "Try again. Your boxes and page assignments are unchanged.",
            true,
            Severity::Transient,
        ),

        PagewerkError::Serialization(_) => HumanError::new(
            "A settings or job file couldn't be read.",
            "Check the file is valid JSON in the expected format.",
            false,
            Severity::ActionRequired,
        ),

        // -- Storage --
        PagewerkError::Catalog(_) => HumanError::new(
            "The list of line items couldn't be loaded.",
            "Check the connection to the order system, then open the document again.",
            true,
            Severity::Transient,
        ),

        PagewerkError::Storage(_) => HumanError::new(
            "The files couldn't be saved.",
            "Try again. Your boxes and page assignments are unchanged.",
            true,
            Severity::Transient,
        ),

        PagewerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "The file couldn't be found.",
                "It may have been moved or deleted. Try choosing the file again.",
                false,
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "Pagewerk doesn't have permission to use that file or folder.",
                "Check the permissions, or choose a different folder.",
                false,
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, the disk may be full.",
                true,
                Severity::Transient,
            ),
        },

        PagewerkError::Unsupported { capability } => HumanError::new(
            "This feature isn't available here.",
            format!("{capability} is not set up in this environment."),
            false,
            Severity::Permanent,
        ),
    }
}
