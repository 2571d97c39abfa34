use super::settings::{PartialSettings, PartialStreamSettings, Settings};
use super::load_config_from;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.stream.heartbeat_secs, 30);
    assert_eq!(settings.stream.channel_capacity, 64);
    assert_eq!(settings.stream.max_comment_len, 2000);
    assert_eq!(settings.log.level, "info");
}

#[test]
fn test_merge_rejects_zero_heartbeat_and_capacity() {
    let partial = PartialSettings {
        stream: Some(PartialStreamSettings {
            heartbeat_secs: Some(0),
            channel_capacity: Some(0),
            max_comment_len: Some(10),
        }),
        ..Default::default()
    };

    let settings = Settings::merged(partial);
    assert_eq!(settings.stream.heartbeat_secs, 30);
    assert_eq!(settings.stream.channel_capacity, 64);
    assert_eq!(settings.stream.max_comment_len, 10);
}

#[test]
#[serial]
fn test_load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let file = tmp.path().join("relay.toml");
    fs::write(
        &file,
        r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            jwt_secret = "file_secret"

            [stream]
            heartbeat_secs = 5
        "#,
    )
    .expect("write config file");

    let base = tmp.path().join("relay");
    let cfg = load_config_from(base.to_str().unwrap()).expect("load config");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.jwt_secret, "file_secret");
    assert_eq!(cfg.stream.heartbeat_secs, 5);
    assert_eq!(cfg.stream.channel_capacity, 64);
    assert_eq!(cfg.storage.path, "comment_relay_db");
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(tmp.path().join("relay.toml"), "[server]\nport = 9000\n").expect("write");
    let base = tmp.path().join("relay");

    temp_env::with_vars(
        [
            ("RELAY_SERVER__PORT", Some("9100")),
            ("RELAY_SERVER__JWT_SECRET", Some("env_secret")),
            ("RELAY_STREAM__CHANNEL_CAPACITY", Some("8")),
        ],
        || {
            let cfg = load_config_from(base.to_str().unwrap()).expect("load config");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.server.jwt_secret, "env_secret");
            assert_eq!(cfg.stream.channel_capacity, 8);
        },
    );
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let base = tmp.path().join("absent");
    let cfg = load_config_from(base.to_str().unwrap()).expect("load config");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.stream.heartbeat_secs, 30);
}
