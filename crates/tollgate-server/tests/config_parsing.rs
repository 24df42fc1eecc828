use std::io::Write;
use std::time::Duration;

use tollgate_server::config::StorageBackend;
use tollgate_server::config::loader::load_config;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn parses_full_config() {
    let file = write_config(
        r#"
        [server]
        host = "127.0.0.1"
        port = 9090

        [logging]
        level = "debug"

        [auth]
        issuer = "https://auth.example.com"
        access_token_lifetime = "10m"
        refresh_token_lifetime = "7d"
        max_sessions_per_owner = 5

        [auth.rotation]
        enabled = false

        [auth.cookies]
        secure = false

        [storage]
        backend = "memory"
        cleanup_interval = "15m"

        [[users]]
        username = "alice"
        password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaA"
        role = "admin"
        "#,
    );

    let cfg = load_config(file.path().to_str()).unwrap();

    assert_eq!(cfg.addr().to_string(), "127.0.0.1:9090");
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.auth.issuer, "https://auth.example.com");
    assert_eq!(cfg.auth.access_token_lifetime, Duration::from_secs(600));
    assert_eq!(cfg.auth.refresh_token_lifetime, Duration::from_secs(7 * 86400));
    assert_eq!(cfg.auth.max_sessions_per_owner, Some(5));
    assert!(!cfg.auth.rotation.enabled);
    assert!(!cfg.auth.cookies.secure);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.storage.cleanup_interval, Duration::from_secs(900));
    assert_eq!(cfg.users.len(), 1);
    assert_eq!(cfg.users[0].role, "admin");
}

#[test]
fn missing_file_uses_defaults() {
    let cfg = load_config(Some("/nonexistent/tollgate.toml")).unwrap();

    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.auth.access_token_lifetime, Duration::from_secs(900));
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert!(cfg.users.is_empty());
}

#[test]
fn rejects_postgres_without_url() {
    let file = write_config(
        r#"
        [storage]
        backend = "postgres"
        "#,
    );

    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("postgres_url"), "{err}");
}

#[test]
fn rejects_refresh_lifetime_not_above_access() {
    let file = write_config(
        r#"
        [auth]
        access_token_lifetime = "1h"
        refresh_token_lifetime = "30m"
        "#,
    );

    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.starts_with("auth config error"), "{err}");
}

#[test]
fn rejects_unknown_log_level() {
    let file = write_config(
        r#"
        [logging]
        level = "loud"
        "#,
    );

    assert!(load_config(file.path().to_str()).is_err());
}

#[test]
fn default_reuse_grace_outlasts_client_retry() {
    let auth = tollgate_auth::AuthConfig::default();
    let client = tollgate_client::ClientConfig::default();

    assert!(auth.rotation.reuse_grace > client.refresh_timeout + client.refresh_cooldown);
}
