//! Reconciler settings
//!
//! All tunable parameters of the effect-application phase in one place.
//! Loaded from TOML at startup, falls back to defaults if no file exists.

use crate::error::{Error, Result};
use crate::types::FieldPath;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level reconciler settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Patching, sleeping and touching.
    pub effects: EffectsSettings,
    /// Error backoff for repeatedly failing cycles.
    pub batching: BatchingSettings,
    /// Where the bookkeeping marker lives in the object.
    pub persistence: PersistenceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsSettings {
    /// Longest single sleep, so long waits show liveness in the logs.
    pub keepalive_secs: u64,
    /// Fields that the store removes entirely when patched to an empty value.
    pub known_inconsistencies: Vec<FieldPath>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingSettings {
    /// Backoff sequence in seconds; the last value repeats once exhausted.
    pub error_delays: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStorageKind {
    Status,
    Annotations,
    Smart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub progress_storage: ProgressStorageKind,
    /// Key under `status` that holds the marker.
    pub status_name: String,
    /// Annotation prefix; the marker is `<prefix>/touch-dummy`.
    pub annotations_prefix: String,
}

impl Default for EffectsSettings {
    fn default() -> Self {
        Self {
            keepalive_secs: 10 * 60,
            known_inconsistencies: vec![
                FieldPath::parse("metadata.annotations"),
                FieldPath::parse("metadata.finalizers"),
                FieldPath::parse("metadata.labels"),
            ],
        }
    }
}

impl Default for BatchingSettings {
    fn default() -> Self {
        Self {
            error_delays: vec![
                1.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0, 55.0, 89.0, 144.0, 233.0, 377.0,
                610.0,
            ],
        }
    }
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            progress_storage: ProgressStorageKind::Status,
            status_name: "reconciler".into(),
            annotations_prefix: "reconciler.dev".into(),
        }
    }
}

impl EffectsSettings {
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

impl BatchingSettings {
    /// The backoff sequence as durations; negative entries saturate to zero.
    pub fn error_delays(&self) -> Vec<Duration> {
        self.error_delays
            .iter()
            .filter_map(|s| Duration::try_from_secs_f64(s.max(0.0)).ok())
            .collect()
    }
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let settings = toml::from_str(&content)
                    .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
                tracing::info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Render the current settings as TOML (for generating a default file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
