// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests resolving configuration end to end.

mod common;

use cfgserver::prelude::*;
use cfgserver::service::PlaceholderExpander;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_helpers::MockStore;

fn repository() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    common::write_document(root, "main", "billing-prod.yml", "x: 1\ny: 2\n");
    common::write_document(root, "main", "billing.yml", "y: 3\nz: 4\n");
    common::write_document(
        root,
        "main",
        "application.yml",
        "db:\n  host: localhost\n  port: 5432\n  url: jdbc://${db.host}:${db.port}/billing\n",
    );
    common::write_document(root, "main", "application-prod.properties", "db.host=prod-db\n");
    common::write_document(root, "v2", "billing-prod.json", r#"{"x": 10}"#);
    dir
}

fn server(dir: &TempDir) -> ConfigServer {
    let store = FileSystemStore::new(dir.path()).unwrap();
    ConfigServer::builder()
        .with_store(Arc::new(store))
        .with_cache_ttl(Duration::ZERO)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_profile_document_wins_over_default() {
    let dir = repository();
    let env = server(&dir).resolve_config("billing", "prod", None).await.unwrap();

    assert_eq!(env.config.get("x"), Some(&ConfigValue::Integer(1)));
    assert_eq!(env.config.get("y"), Some(&ConfigValue::Integer(2)));
    assert_eq!(env.config.get("z"), Some(&ConfigValue::Integer(4)));
    assert_eq!(env.profiles, vec!["prod", "default"]);
    assert_eq!(env.version.as_deref(), Some("main"));
}

#[tokio::test]
async fn test_property_sources_in_precedence_order() {
    let dir = repository();
    let env = server(&dir).resolve_config("billing", "prod", None).await.unwrap();

    let names: Vec<&str> = env.config.sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "file:main:billing-prod.yml",
            "file:main:application-prod.properties",
            "file:main:billing.yml",
            "file:main:application.yml",
        ]
    );
}

#[tokio::test]
async fn test_placeholders_see_merged_values() {
    let dir = repository();
    let server = server(&dir);

    let prod = server.resolve_config("billing", "prod", None).await.unwrap();
    assert_eq!(
        prod.config.get("db.url"),
        Some(&ConfigValue::from("jdbc://prod-db:5432/billing"))
    );

    let dev = server.resolve_config("billing", "dev", None).await.unwrap();
    assert_eq!(
        dev.config.get("db.url"),
        Some(&ConfigValue::from("jdbc://localhost:5432/billing"))
    );
}

#[tokio::test]
async fn test_label_selects_reference() {
    let dir = repository();
    let env = server(&dir)
        .resolve_config("billing", "prod", Some("v2"))
        .await
        .unwrap();

    assert_eq!(env.config.get("x"), Some(&ConfigValue::Integer(10)));
    assert_eq!(env.config.get("y"), None);
    assert_eq!(env.label.as_deref(), Some("v2"));
    assert_eq!(env.version.as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_unknown_label_falls_back_to_default() {
    let dir = repository();
    let env = server(&dir)
        .resolve_config("billing", "prod", Some("no-such-branch"))
        .await
        .unwrap();

    assert_eq!(env.config.get("x"), Some(&ConfigValue::Integer(1)));
    assert_eq!(env.version.as_deref(), Some("main"));
}

#[tokio::test]
async fn test_unknown_application_gets_shared_documents_only() {
    let dir = repository();
    let env = server(&dir).resolve_config("inventory", "dev", None).await.unwrap();

    assert_eq!(env.config.get("x"), None);
    assert_eq!(env.config.get("db.port"), Some(&ConfigValue::Integer(5432)));
}

#[tokio::test]
async fn test_nothing_found_is_empty_environment() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("main")).unwrap();

    let env = server(&dir).resolve_config("ghost", "dev", None).await.unwrap();
    assert!(env.config.is_empty());
    assert!(env.config.sources.is_empty());
    assert_eq!(env.version, None);
}

#[tokio::test]
async fn test_path_traversal_rejected() {
    let dir = repository();
    let err = server(&dir)
        .resolve_config("..", "prod", None)
        .await
        .unwrap_err();
    assert!(matches!(err.error, ConfigError::InvalidRequest { .. }));
    assert_eq!(err.application, "..");
}

#[tokio::test]
async fn test_malformed_document_reported() {
    let dir = TempDir::new().unwrap();
    common::write_document(dir.path(), "main", "billing.yml", "- just\n- a list\n");

    let err = server(&dir)
        .resolve_config("billing", "default", None)
        .await
        .unwrap_err();
    match err.error {
        ConfigError::MalformedDocument { document, .. } => assert_eq!(document, "billing.yml"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_cycle_fails_in_either_mode() {
    let dir = TempDir::new().unwrap();
    common::write_document(dir.path(), "main", "billing.yml", "a: ${b}\nb: ${a}\n");

    for mode in [PlaceholderMode::Strict, PlaceholderMode::Lenient] {
        let store = FileSystemStore::new(dir.path()).unwrap();
        let server = ConfigServer::builder()
            .with_store(Arc::new(store))
            .with_placeholder_mode(mode)
            .build()
            .unwrap();
        let err = server
            .resolve_config("billing", "default", None)
            .await
            .unwrap_err();
        assert!(matches!(err.error, ConfigError::CyclicReference { .. }));
    }
}

#[tokio::test]
async fn test_strict_mode_rejects_missing_key() {
    let store = MockStore::new().with_document("main", "billing.yml", "url: http://${host}/\n");

    let server = ConfigServer::builder()
        .with_store(Arc::new(store))
        .with_expander(PlaceholderExpander::new(PlaceholderMode::Strict))
        .build()
        .unwrap();
    let err = server
        .resolve_config("billing", "default", None)
        .await
        .unwrap_err();
    assert!(matches!(err.error, ConfigError::UnresolvablePlaceholder { .. }));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let store = Arc::new(
        MockStore::new()
            .with_document("main", "billing.yml", "a: 1\n")
            .with_failures(2),
    );
    let server = ConfigServer::builder()
        .with_store(store.clone())
        .with_shared_application("")
        .with_retry_policy(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        })
        .build()
        .unwrap();

    let env = server.resolve_config("billing", "default", None).await.unwrap();
    assert_eq!(env.config.get("a"), Some(&ConfigValue::Integer(1)));
}

#[tokio::test]
async fn test_exhausted_retries_report_unavailable() {
    let store = MockStore::new()
        .with_document("main", "billing.yml", "a: 1\n")
        .with_failures(10);
    let server = ConfigServer::builder()
        .with_store(Arc::new(store))
        .with_retry_policy(RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        })
        .build()
        .unwrap();

    let err = server
        .resolve_config("billing", "default", None)
        .await
        .unwrap_err();
    assert!(err.error.is_retryable());
}

#[tokio::test]
async fn test_cache_serves_repeat_requests() {
    let store = Arc::new(MockStore::new().with_document("main", "billing.yml", "a: 1\n"));
    let server = ConfigServer::builder()
        .with_store(store.clone())
        .with_cache_ttl(Duration::from_secs(60))
        .build()
        .unwrap();

    server.resolve_config("billing", "default", None).await.unwrap();
    let reads = store.reads();
    server.resolve_config("billing", "default", None).await.unwrap();
    assert_eq!(store.reads(), reads);

    store.set_document("main", "billing.yml", "a: 2\n");
    server.invalidate_all();
    let env = server.resolve_config("billing", "default", None).await.unwrap();
    assert_eq!(env.config.get("a"), Some(&ConfigValue::Integer(2)));
}
