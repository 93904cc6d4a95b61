//! Job file serialization with versioning and migration.
//!
//! Uses JSON with a schema version field for forward-compatible persistence.

use crate::job::JobConfig;
use serde::{Deserialize, Serialize};
use shadereel_core::{Result, ShadeReelError};
use std::path::Path;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned job file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobFile {
    /// Schema version for migration.
    pub version: u32,
    /// Jobs to render, in order.
    pub jobs: Vec<JobConfig>,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl JobFile {
    pub fn new(jobs: Vec<JobConfig>) -> Self {
        Self {
            version: CURRENT_VERSION,
            jobs,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| ShadeReelError::Serialization(format!("Failed to serialize jobs: {e}")))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| ShadeReelError::Serialization(format!("Invalid JSON: {e}")))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        if version > CURRENT_VERSION {
            return Err(ShadeReelError::Serialization(format!(
                "Job file version {version} is newer than supported version {CURRENT_VERSION}"
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| ShadeReelError::Serialization(format!("Failed to parse jobs: {e}")))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 files were a single bare config or a bare list of them.
                let jobs = match data {
                    serde_json::Value::Array(items) => serde_json::Value::Array(items),
                    serde_json::Value::Object(map) => {
                        serde_json::Value::Array(vec![serde_json::Value::Object(map)])
                    }
                    other => {
                        return Err(ShadeReelError::Serialization(format!(
                            "Unrecognized v0 job file: {other}"
                        )));
                    }
                };
                data = serde_json::json!({
                    "version": 1,
                    "jobs": jobs,
                    "app_version": "0.1.0",
                });
                version = 1;
            }
            _ => {
                return Err(ShadeReelError::Serialization(format!(
                    "No migration path from version {version}"
                )));
            }
        }
    }

    Ok(data)
}
