// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware config directory resolution.

use std::path::{Path, PathBuf};

use pagewerk_core::config::EngineConfig;
use pagewerk_core::error::Result;
use tracing::{debug, info};

/// Return the application config directory. Not created here.
pub fn config_dir() -> PathBuf {
    dirs_fallback().join("pagewerk")
}

/// The default config file location.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load the engine config.
///
/// An explicit path must exist. Without one, the default location is used if
/// present and built-in defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "Loading config");
        return EngineConfig::load(path);
    }
    let fallback = default_config_path();
    if fallback.is_file() {
        info!(path = %fallback.display(), "Loading config");
        EngineConfig::load(&fallback)
    } else {
        debug!(path = %fallback.display(), "No config file, using defaults");
        Ok(EngineConfig::default())
    }
}

fn dirs_fallback() -> PathBuf {
    // Try XDG config dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    // Last resort
    PathBuf::from(".")
}
