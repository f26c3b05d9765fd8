// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local text recogniser built on `ocrs`, a pure-Rust OCR engine running neural
// network models through `rten`.
//
// Only compiled with the `ocr` feature:
//
// ```toml
// pagewerk-document = { path = "crates/pagewerk-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// Two model files are needed:
//
// - `text-detection.rten` locates text regions in the image.
// - `text-recognition.rten` decodes characters from detected regions.
//
// Running `ocrs-cli` once downloads both into the cache directory:
//   ```sh
//   cargo install ocrs-cli
//   ocrs some-image.png  # downloads models to ~/.cache/ocrs/
//   ```
//
// The default cache directory is `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`).

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use pagewerk_bridge::TextRecognizer;
use pagewerk_core::error::{PagewerkError, Result};
use rten::Model;
use tracing::{debug, info, instrument};

/// Well-known filenames for the detection and recognition models.
const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModelPaths {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrModelPaths {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModelPaths {
    /// Both models in `dir` under their well-known names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Check both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (role, path) in [("detection", &self.detection), ("recognition", &self.recognition)] {
            if !path.exists() {
                return Err(PagewerkError::OcrError(format!(
                    "{role} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Recognises page text with locally loaded `ocrs` models.
///
/// Model loading is the expensive step; build one engine and share it (it is
/// `Send + Sync`) across every page of every session.
pub struct OcrsRecognizer {
    engine: OcrsEngine,
}

impl OcrsRecognizer {
    /// Load both models from `paths`.
    ///
    /// `ocrs` and `rten` are very slow in debug builds; build with `--release`
    /// for anything beyond a smoke test.
    #[instrument(skip_all, fields(
        detection = %paths.detection.display(),
        recognition = %paths.recognition.display(),
    ))]
    pub fn new(paths: &OcrModelPaths) -> Result<Self> {
        paths.validate()?;

        let load = |role: &str, path: &Path| {
            info!("Loading OCR {role} model");
            Model::load_file(path).map_err(|err| {
                PagewerkError::OcrError(format!(
                    "failed to load {role} model from {}: {}",
                    path.display(),
                    err
                ))
            })
        };
        let detection_model = load("detection", &paths.detection)?;
        let recognition_model = load("recognition", &paths.recognition)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| PagewerkError::OcrError(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    /// Load models from the default cache directory.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&OcrModelPaths::default())
    }
}

impl TextRecognizer for OcrsRecognizer {
    /// `ocrs` ships a single Latin-script model, so language hints only appear
    /// in the trace.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), hints = ?language_hints))]
    fn recognize_text(&self, image: &DynamicImage, language_hints: &[String]) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            PagewerkError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| PagewerkError::OcrError(format!("OCR preprocessing failed: {}", err)))?;

        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| PagewerkError::OcrError(format!("OCR text recognition failed: {}", err)))?;

        debug!(lines = text.lines().count(), chars = text.len(), "OCR complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_paths_from_dir() {
        let paths = OcrModelPaths::from_dir("/tmp/my-models");
        assert_eq!(paths.detection, PathBuf::from("/tmp/my-models/text-detection.rten"));
        assert_eq!(paths.recognition, PathBuf::from("/tmp/my-models/text-recognition.rten"));
    }

    #[test]
    fn default_paths_use_well_known_names() {
        let paths = OcrModelPaths::default();
        assert!(paths.detection.ends_with(DETECTION_MODEL_FILENAME));
        assert!(paths.recognition.ends_with(RECOGNITION_MODEL_FILENAME));
    }

    #[test]
    fn missing_models_are_ocr_errors() {
        let result = OcrsRecognizer::new(&OcrModelPaths::from_dir("/nonexistent/ocr-models"));
        assert!(matches!(result, Err(PagewerkError::OcrError(_))));
    }
}
