//! Config file loading tests.
//!
//! Covers defaults for omitted sections, full files, unknown field
//! rejection and the cross-encoder channel checks.

use qdec_common::config::{ConfigError, ConfigLoader, Mode, NotifyPolicy, QdecConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("qdec.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn empty_file_yields_default_wiring() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "");

    let config = QdecConfig::load_validated(&path).unwrap();
    assert_eq!(config.shared.service_name, "qdec");
    assert_eq!(config.decoder.mode, Mode::Detent);
    assert_eq!(config.decoder.noise_filter_us, 1000);
    assert_eq!(config.decoder.backend, "simulation");

    let pairs: Vec<_> = config
        .encoders
        .iter()
        .map(|e| (e.channel_a, e.channel_b))
        .collect();
    assert_eq!(pairs, vec![(23, 24), (17, 27)]);
}

#[test]
fn full_file_round_trips_every_section() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[shared]
log_level = "debug"
service_name = "bench-knobs"

[decoder]
mode = "raw"
noise_filter_us = 250
backend = "rppal"
run_seconds = 30

[decoder.notify]
policy = "deferred"
queue_capacity = 16

[[encoders]]
name = "volume"
channel_a = 5
channel_b = 6
topic = "knobs/volume"
"#,
    );

    let config = QdecConfig::load_validated(&path).unwrap();
    assert_eq!(config.decoder.mode, Mode::Raw);
    assert_eq!(config.decoder.noise_filter_us, 250);
    assert_eq!(config.decoder.run_seconds, 30);
    assert_eq!(config.decoder.notify.policy, NotifyPolicy::Deferred);
    assert_eq!(config.decoder.notify.queue_capacity, 16);
    assert_eq!(config.encoders.len(), 1);
    assert_eq!(config.encoders[0].topic(), "knobs/volume");
}

#[test]
fn unknown_fields_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[decoder]
mode = "detent"
glitch = 1000
"#,
    );

    let result = QdecConfig::load(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn negative_channel_rejected_at_parse() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[encoders]]
name = "bad"
channel_a = -1
channel_b = 24
"#,
    );

    assert!(matches!(
        QdecConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn duplicate_names_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[encoders]]
name = "knob"
channel_a = 5
channel_b = 6

[[encoders]]
name = "knob"
channel_a = 7
channel_b = 8
"#,
    );

    let err = QdecConfig::load_validated(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
    assert!(err.to_string().contains("Duplicate encoder name"));
}

#[test]
fn explicit_empty_encoder_list_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "encoders = []\n");

    let err = QdecConfig::load_validated(&path).unwrap_err();
    assert!(err.to_string().contains("at least one encoder"));
}

#[test]
fn missing_file_reported() {
    let result = QdecConfig::load_validated(Path::new("/nonexistent/qdec.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn shipped_config_matches_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/qdec.toml");
    let shipped = QdecConfig::load_validated(&path).unwrap();
    let defaults = QdecConfig::default();

    assert_eq!(shipped.decoder.mode, defaults.decoder.mode);
    assert_eq!(shipped.decoder.noise_filter_us, defaults.decoder.noise_filter_us);
    assert_eq!(shipped.decoder.notify, defaults.decoder.notify);
    // The shipped file spells out the topics the defaults derive from names.
    let topics: Vec<_> = shipped.encoders.iter().map(|e| e.topic()).collect();
    assert_eq!(topics, vec!["encoder_a", "encoder_b"]);
    for (file, default) in shipped.encoders.iter().zip(&defaults.encoders) {
        assert_eq!((file.channel_a, file.channel_b), (default.channel_a, default.channel_b));
        assert_eq!(file.topic(), default.topic());
    }
}
