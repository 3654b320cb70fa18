use std::fs;
use std::path::PathBuf;

use modtap_core::config::{ConfigScope, SkippedSetting};
use modtap_core::{ConfigError, EngineConfig};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn write_layer(dir: &std::path::Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write layer file");
    path
}

#[test]
fn layers_merge_in_precedence_order() {
    let dir = tempdir().expect("tempdir");
    let base = write_layer(
        dir.path(),
        "host.toml",
        "schemaVersion = \"1.0\"\n\
         disabledInstrumentations = [\"noisy\"]\n\
         captureBindingsLimit = 128\n",
    );
    let project = write_layer(
        dir.path(),
        "project.toml",
        "schemaVersion = \"1.0\"\n\
         disabledInstrumentations = [\"chatty\", \"noisy\"]\n\
         auditLogPath = \"/var/log/instrumentation.jsonl\"\n\
         captureBindingsLimit = 64\n",
    );

    let (config, summaries) = EngineConfig::load_layers(vec![
        (
            ConfigScope::HostDefault {
                name: "defaults".to_string(),
            },
            base,
        ),
        (
            ConfigScope::Project {
                project_root: dir.path().to_path_buf(),
            },
            project,
        ),
    ])
    .expect("layers load");

    assert_eq!(
        config.disabled_instrumentations,
        vec!["noisy".to_string(), "chatty".to_string()]
    );
    assert_eq!(
        config.audit_log_path,
        Some(PathBuf::from("/var/log/instrumentation.jsonl"))
    );
    assert_eq!(config.capture_bindings_limit, Some(64));

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].applied_settings, 2);
    // Both disabled names count in the later layer even when one is a repeat.
    assert_eq!(summaries[1].applied_settings, 4);
    for summary in &summaries {
        assert_eq!(summary.checksum.len(), 40);
        assert!(summary.checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[test]
fn empty_disabled_names_are_recorded_as_skipped() {
    let dir = tempdir().expect("tempdir");
    let layer = write_layer(
        dir.path(),
        "sloppy.toml",
        "schemaVersion = \"1.0\"\n\
         disabledInstrumentations = [\"ok\", \"  \"]\n",
    );

    let (config, summaries) = EngineConfig::load_layers(vec![(
        ConfigScope::User {
            home: dir.path().to_path_buf(),
        },
        layer,
    )])
    .expect("layer loads");

    assert_eq!(config.disabled_instrumentations, vec!["ok".to_string()]);
    assert_eq!(
        summaries[0].skipped_settings,
        vec![SkippedSetting {
            setting: "disabledInstrumentations".to_string(),
            details: "module name must not be empty".to_string(),
        }]
    );
}

#[test]
fn unknown_schema_version_fails_the_load() {
    let dir = tempdir().expect("tempdir");
    let layer = write_layer(dir.path(), "future.toml", "schemaVersion = \"9.9\"\n");

    let err = EngineConfig::load_layers(vec![(
        ConfigScope::HostDefault {
            name: "defaults".to_string(),
        },
        layer,
    )])
    .expect_err("load must fail");
    assert!(matches!(err, ConfigError::InvalidConfiguration(_)));
}

#[test]
fn missing_layer_file_is_an_io_error() {
    let err = EngineConfig::validate_file("/definitely/not/here.toml").expect_err("io failure");
    assert!(matches!(err, ConfigError::Io(_)));
}
