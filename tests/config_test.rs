//! Integration tests for engine configuration files

mod common;

use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;
use visflow_rs::{
    config::{EngineConfig, CONFIG_ENV_VAR},
    pipeline::TaskQueue,
    SceneContext,
};

#[test]
fn test_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("engine.toml");

    let mut config = EngineConfig::default();
    config.evaluation.break_on_error = true;
    config.evaluation.wait_timeout_ms = 250;
    config.animation.ticks_per_frame = 160;
    config.logging.log_dir = Some(dir.path().join("logs"));
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::load_or_default(dir.path().join("absent.toml"));
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_invalid_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[evaluation]\nwait_timeout_ms = \"soon\"\n").unwrap();

    let err = EngineConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
    assert_eq!(EngineConfig::load_or_default(&path), EngineConfig::default());
}

#[test]
#[serial]
fn test_env_var_overrides_location() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::env::set_var(CONFIG_ENV_VAR, &path);
    assert_eq!(EngineConfig::default_path(), Some(path));
    std::env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    std::env::set_var(CONFIG_ENV_VAR, "");
    let path = EngineConfig::default_path();
    std::env::remove_var(CONFIG_ENV_VAR);
    if let Some(path) = path {
        assert!(path.ends_with("dev.visflow.visflow-rs/engine.toml"));
    }
}

#[test]
fn test_scene_context_applies_config() {
    let mut config = EngineConfig::default();
    config.animation.ticks_per_frame = 100;
    config.animation.start_frame = 3;
    config.evaluation.break_on_error = true;
    config.evaluation.wait_timeout_ms = 1500;

    let queue = TaskQueue::new();
    let context = SceneContext::with_config(queue.executor(), Arc::new(config));
    assert_eq!(context.animation().time(), 300);
    assert_eq!(context.animation().frame_to_time(5), 500);
    assert!(context.request_at(0).break_on_error());
    assert_eq!(context.wait_timeout().as_millis(), 1500);
}
