// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewerk.

use thiserror::Error;

/// Top-level error type for all Pagewerk operations.
#[derive(Debug, Error)]
pub enum PagewerkError {
    // -- Validation errors --
    #[error("no source document loaded")]
    NoSourceLoaded,

    #[error("no pages are assigned to a record")]
    NoAssignments,

    #[error("page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("mask rejected: {0}")]
    InvalidMask(String),

    #[error("zoom factor {0} must be a positive number")]
    InvalidZoom(f64),

    #[error("no mask #{index} on page {page}")]
    MaskNotFound { page: u32, index: usize },

    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition { action: &'static str, phase: String },

    #[error("another operation is still in progress")]
    Busy,

    #[error("operation requires {expected} mode")]
    WrongEditTarget { expected: &'static str },

    // -- Page processing errors --
    #[error("page rasterisation failed: {0}")]
    RasterError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("background task failed: {0}")]
    TaskFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Storage / external capabilities --
    #[error("record catalog unavailable: {0}")]
    Catalog(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{capability} is not available in this environment")]
    Unsupported { capability: &'static str },
}

/// Coarse error taxonomy that decides how callers react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied something invalid; reported synchronously, never retried.
    Validation,
    /// One page failed to rasterise or recognise; recovered inside a batch.
    PageProcessing,
    /// Source could not be parsed or output could not be produced.
    DocumentIo,
    /// An external capability is missing or rejected the request.
    Storage,
}

impl PagewerkError {
    /// Classify this error for retry/rollback decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoSourceLoaded
            | Self::NoAssignments
            | Self::PageOutOfRange { .. }
            | Self::InvalidMask(_)
            | Self::InvalidZoom(_)
            | Self::MaskNotFound { .. }
            | Self::InvalidTransition { .. }
            | Self::Busy
            | Self::WrongEditTarget { .. } => ErrorKind::Validation,

            Self::RasterError(_) | Self::OcrError(_) => ErrorKind::PageProcessing,

            Self::PdfError(_)
            | Self::ImageError(_)
            | Self::TaskFailed(_)
            | Self::Serialization(_) => ErrorKind::DocumentIo,

            Self::Catalog(_) | Self::Storage(_) | Self::Io(_) | Self::Unsupported { .. } => {
                ErrorKind::Storage
            }
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagewerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert_eq!(PagewerkError::NoAssignments.kind(), ErrorKind::Validation);
        assert_eq!(PagewerkError::Busy.kind(), ErrorKind::Validation);
        assert_eq!(
            PagewerkError::PageOutOfRange {
                page: 9,
                page_count: 3
            }
            .kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn page_and_storage_errors_are_classified() {
        assert_eq!(
            PagewerkError::OcrError("blurry".into()).kind(),
            ErrorKind::PageProcessing
        );
        assert_eq!(
            PagewerkError::Unsupported {
                capability: "file writing"
            }
            .kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            PagewerkError::PdfError("truncated xref".into()).kind(),
            ErrorKind::DocumentIo
        );
    }

    #[test]
    fn display_includes_detail() {
        let err = PagewerkError::PageOutOfRange {
            page: 7,
            page_count: 5,
        };
        assert_eq!(err.to_string(), "page 7 out of range (document has 5 pages)");
    }
}
