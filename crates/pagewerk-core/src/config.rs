// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::MergePolicy;

/// Raster scale below which OCR accuracy collapses.
pub const MIN_OCR_SCALE: f32 = 2.0;

/// Tunable engine settings, loadable from a JSON file.
///
/// Every field has a default, so a partial file (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Raster scale used for OCR input. Clamped to [`MIN_OCR_SCALE`].
    pub ocr_scale: f32,
    /// Language hints passed to the text recogniser.
    pub ocr_language_hints: Vec<String>,
    /// Upper bound on pages recognised concurrently.
    pub ocr_workers: usize,
    /// Run OCR matching automatically after a fresh (non-edit) load.
    pub auto_match_on_load: bool,
    /// How OCR results combine with assignments already present.
    pub auto_match_merge: MergePolicy,
    /// Masks narrower or shorter than this (in points) are treated as stray clicks.
    pub min_mask_size: f64,
    /// Fill colour for burned-in redactions, RGB components in 0.0..=1.0.
    pub redaction_color: [f32; 3],
    /// File stem used when a record has neither code nor name.
    pub fallback_file_name: String,
    /// Zoom factor of the interactive view when a document is first loaded.
    pub initial_zoom: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ocr_scale: MIN_OCR_SCALE,
            ocr_language_hints: vec!["eng".into()],
            ocr_workers: 4,
            auto_match_on_load: true,
            auto_match_merge: MergePolicy::Overwrite,
            min_mask_size: 5.0,
            redaction_color: [0.0, 0.0, 0.0],
            fallback_file_name: "document".into(),
            initial_zoom: 1.0,
        }
    }
}

impl EngineConfig {
    /// Load a config file, falling back to defaults for missing fields.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Persist the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// OCR raster scale with the accuracy floor applied.
    pub fn effective_ocr_scale(&self) -> f32 {
        if self.ocr_scale.is_finite() {
            self.ocr_scale.max(MIN_OCR_SCALE)
        } else {
            MIN_OCR_SCALE
        }
    }

    /// Worker count, never zero.
    pub fn effective_ocr_workers(&self) -> usize {
        self.ocr_workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"ocr_workers": 8, "auto_match_merge": "keep_existing"}"#)
                .unwrap();
        assert_eq!(config.ocr_workers, 8);
        assert_eq!(config.auto_match_merge, MergePolicy::KeepExisting);
        assert_eq!(config.min_mask_size, 5.0);
    }

    #[test]
    fn ocr_scale_is_clamped() {
        let config = EngineConfig {
            ocr_scale: 1.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_ocr_scale(), MIN_OCR_SCALE);

        let config = EngineConfig {
            ocr_scale: 3.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_ocr_scale(), 3.0);
    }

    #[test]
    fn zero_workers_becomes_one() {
        let config = EngineConfig {
            ocr_workers: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_ocr_workers(), 1);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagewerk.json");
        let config = EngineConfig {
            fallback_file_name: "unsorted".into(),
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }
}
