//! Sheet configuration
//!
//! Loaded from `DUALITY_*` environment variables with defaults for anything
//! missing or unparseable.
//!
//! # Environment Variables
//!
//! - `DUALITY_DEBOUNCE_MS` - Delay after the last change before saving (default: 1500, max: 60000)
//! - `DUALITY_BACKGROUND_SAVE_SECS` - Snapshot interval (default: 10)
//! - `DUALITY_HOPE_MIN_MAX` / `DUALITY_HOPE_MAX_MAX` - Allowed range of hope max (default: 0 / 10)
//! - `DUALITY_STORAGE_PATH` - Desktop storage file (default: platform config dir)
//! - `DUALITY_SCOPED_PREFIXES` - Comma-separated scoped key prefixes (default: `theme-,color-`)

use std::path::PathBuf;

use chrono::Duration;
use duality_domain::HopeBounds;
use serde::{Deserialize, Serialize};

use crate::application::services::autosave::{
    AutosaveSettings, DEFAULT_BACKGROUND_SECS, DEFAULT_DEBOUNCE_MS, MAX_DEBOUNCE_MS,
};
use crate::application::services::scoped_keys::{ScopePolicy, DEFAULT_SCOPED_PREFIXES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub debounce_ms: u64,
    pub background_save_secs: u64,
    pub hope_min_max: i32,
    pub hope_max_max: i32,
    pub storage_path: Option<PathBuf>,
    pub scoped_prefixes: Vec<String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        let hope = HopeBounds::default();
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS as u64,
            background_save_secs: DEFAULT_BACKGROUND_SECS as u64,
            hope_min_max: hope.min_max,
            hope_max_max: hope.max_max,
            storage_path: None,
            scoped_prefixes: DEFAULT_SCOPED_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl SheetConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let env_or = |key: &str, default| -> u64 {
            lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        };
        let env_or_i32 = |key: &str, default| -> i32 {
            lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        };

        Self {
            debounce_ms: env_or("DUALITY_DEBOUNCE_MS", defaults.debounce_ms),
            background_save_secs: env_or("DUALITY_BACKGROUND_SAVE_SECS", defaults.background_save_secs),
            hope_min_max: env_or_i32("DUALITY_HOPE_MIN_MAX", defaults.hope_min_max),
            hope_max_max: env_or_i32("DUALITY_HOPE_MAX_MAX", defaults.hope_max_max),
            storage_path: lookup("DUALITY_STORAGE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            scoped_prefixes: lookup("DUALITY_SCOPED_PREFIXES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.scoped_prefixes),
        }
    }

    /// Hope bounds, falling back to the defaults when the range is invalid.
    pub fn hope_bounds(&self) -> HopeBounds {
        HopeBounds::new(self.hope_min_max, self.hope_max_max).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid hope bounds configured, using defaults");
            HopeBounds::default()
        })
    }

    pub fn autosave_settings(&self) -> AutosaveSettings {
        AutosaveSettings {
            debounce: Duration::milliseconds(self.debounce_ms.min(MAX_DEBOUNCE_MS as u64) as i64),
            background_interval: Duration::seconds(
                self.background_save_secs.clamp(1, 86_400) as i64,
            ),
        }
    }

    pub fn scope_policy(&self) -> ScopePolicy {
        ScopePolicy::with_prefixes(self.scoped_prefixes.iter().cloned())
    }
}
