//! Loading layered engine configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Merged engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Module names whose instrumentation registrations are dropped.
    pub disabled_instrumentations: Vec<String>,
    /// Destination of the JSONL audit log; `None` disables it.
    pub audit_log_path: Option<PathBuf>,
    /// Upper bound on enumerated binding names before the immutable path
    /// degrades to pass-through.
    pub capture_bindings_limit: Option<usize>,
}

/// Origin of a configuration layer, later layers override earlier ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConfigScope {
    HostDefault { name: String },
    Project { project_root: PathBuf },
    User { home: PathBuf },
}

/// Captures load metadata for a single configuration layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub scope: ConfigScope,
    pub path: PathBuf,
    pub checksum: String,
    pub applied_settings: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_settings: Vec<SkippedSetting>,
}

/// A setting dropped while merging a layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSetting {
    pub setting: String,
    pub details: String,
}

/// Errors surfaced while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to read configuration: {0}")]
    Io(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFileToml {
    schema_version: String,
    #[serde(default)]
    disabled_instrumentations: Vec<String>,
    #[serde(default)]
    audit_log_path: Option<PathBuf>,
    #[serde(default)]
    capture_bindings_limit: Option<usize>,
}

impl EngineConfig {
    /// Validate a configuration document represented as TOML text.
    pub fn validate_document(document: &str) -> Result<(), ConfigError> {
        let parsed: ConfigFileToml = toml::from_str(document)
            .map_err(|err| ConfigError::InvalidConfiguration(err.to_string()))?;
        if parsed.schema_version != "1.0" {
            return Err(ConfigError::InvalidConfiguration(
                "unsupported schemaVersion".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate configuration by reading from the provided path.
    pub fn validate_file<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let contents =
            fs::read_to_string(path.as_ref()).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::validate_document(&contents)
    }

    /// Merge configuration layers in precedence order, returning the merged
    /// settings and one summary per layer.
    pub fn load_layers(
        sources: Vec<(ConfigScope, PathBuf)>,
    ) -> Result<(EngineConfig, Vec<LayerSummary>), ConfigError> {
        let mut config = EngineConfig::default();
        let mut summaries = Vec::new();

        for (scope, path) in sources {
            let contents =
                fs::read_to_string(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
            let parsed: ConfigFileToml = toml::from_str(&contents)
                .map_err(|err| ConfigError::InvalidConfiguration(err.to_string()))?;
            if parsed.schema_version != "1.0" {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "unsupported schemaVersion in {}",
                    path.display()
                )));
            }

            let mut summary = LayerSummary {
                scope,
                path: path.clone(),
                checksum: checksum(&contents),
                applied_settings: 0,
                skipped_settings: Vec::new(),
            };

            for name in parsed.disabled_instrumentations {
                if name.trim().is_empty() {
                    summary.skipped_settings.push(SkippedSetting {
                        setting: "disabledInstrumentations".to_string(),
                        details: "module name must not be empty".to_string(),
                    });
                    continue;
                }
                if !config.disabled_instrumentations.contains(&name) {
                    config.disabled_instrumentations.push(name);
                }
                summary.applied_settings += 1;
            }

            if let Some(audit_log_path) = parsed.audit_log_path {
                config.audit_log_path = Some(audit_log_path);
                summary.applied_settings += 1;
            }
            if let Some(limit) = parsed.capture_bindings_limit {
                config.capture_bindings_limit = Some(limit);
                summary.applied_settings += 1;
            }

            summaries.push(summary);
        }

        Ok((config, summaries))
    }
}

fn checksum(contents: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(contents.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_unknown_schema_version() {
        let document = "schemaVersion = \"2.0\"\n";
        let err = EngineConfig::validate_document(document).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidConfiguration("unsupported schemaVersion".to_string())
        );
    }

    #[test]
    fn validate_accepts_minimal_document() {
        let document = "schemaVersion = \"1.0\"\n";
        assert!(EngineConfig::validate_document(document).is_ok());
    }
}
