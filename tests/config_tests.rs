mod common;

use lightning_frame::config::DEFAULT_PARALLEL_THRESHOLD;
use lightning_frame::{col, ErrorKind, FrameConfig, JoinConfig, JoinType};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const VARS: [&str; 4] = [
    "LIGHTNING_FRAME_PARALLEL",
    "LIGHTNING_FRAME_PARALLEL_THRESHOLD",
    "LIGHTNING_FRAME_WORKERS",
    "LIGHTNING_FRAME_JOIN_SUFFIX",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_env_defaults() {
    clear_env();
    let config = FrameConfig::from_env().unwrap();
    assert!(config.parallel.enabled);
    assert_eq!(config.parallel.threshold_rows, DEFAULT_PARALLEL_THRESHOLD);
    assert_eq!(config.join.suffix, "_right");
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    std::env::set_var("LIGHTNING_FRAME_PARALLEL", "off");
    std::env::set_var("LIGHTNING_FRAME_PARALLEL_THRESHOLD", "5000");
    std::env::set_var("LIGHTNING_FRAME_WORKERS", "3");
    std::env::set_var("LIGHTNING_FRAME_JOIN_SUFFIX", "_r");

    let config = FrameConfig::from_env().unwrap();
    clear_env();

    assert!(!config.parallel.enabled);
    assert_eq!(config.parallel.threshold_rows, 5000);
    assert_eq!(config.parallel.workers, 3);
    let join = JoinConfig::new(JoinType::Left, &config.join);
    assert_eq!(join.suffix, "_r");
    assert_eq!(join.how, JoinType::Left);
}

#[test]
#[serial]
fn test_env_rejects_bad_values() {
    clear_env();
    std::env::set_var("LIGHTNING_FRAME_WORKERS", "many");
    let err = FrameConfig::from_env().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    std::env::set_var("LIGHTNING_FRAME_WORKERS", "0");
    assert!(FrameConfig::from_env().is_err());

    clear_env();
    std::env::set_var("LIGHTNING_FRAME_PARALLEL", "maybe");
    assert!(FrameConfig::from_env().is_err());
    clear_env();
}

#[test]
fn test_json_file_round_trip() {
    let mut config = FrameConfig::default();
    config.parallel.workers = 2;
    config.parallel.threshold_rows = 10;
    config.join.suffix = "_other".to_string();

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(config.to_json_string().unwrap().as_bytes()).unwrap();
    let loaded = FrameConfig::from_json_file(file.path()).unwrap();
    assert_eq!(loaded.parallel.workers, 2);
    assert_eq!(loaded.parallel.threshold_rows, 10);
    assert_eq!(loaded.join.suffix, "_other");
}

#[test]
#[serial]
fn test_env_config_drives_parallel_aggregation() {
    clear_env();
    std::env::set_var("LIGHTNING_FRAME_PARALLEL_THRESHOLD", "0");
    std::env::set_var("LIGHTNING_FRAME_WORKERS", "2");
    let config = FrameConfig::from_env().unwrap();
    clear_env();

    let table = common::random_grouped_table(300, 6, 99);
    let grouped = table.group_by(&["key"]).unwrap();
    let aggs = [("total", col("units").sum()), ("avg", col("amount").mean())];
    let parallel = grouped.agg_parallel(&aggs, &config.parallel).unwrap();
    let sync = grouped.agg(&aggs).unwrap();
    common::assert_tables_close(&sync, &parallel);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FrameConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(err.error_code(), -9);
}
