// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Redis store using Docker containers.

mod common;

#[cfg(feature = "redis")]
mod redis_tests {
    use cfgserver::adapters::{RedisStorageMode, RedisStore};
    use cfgserver::domain::ConfigValue;
    use cfgserver::ports::DocumentStore;
    use cfgserver::service::ConfigServer;
    use std::sync::Arc;
    use testcontainers::{core::WaitFor, runners::AsyncRunner, GenericImage, ImageExt};

    use crate::common as docker_helpers;

    /// Starts Redis, seeds documents in the given layout and opens a store.
    async fn setup_redis_test(
        storage_mode: RedisStorageMode,
    ) -> Option<(testcontainers::ContainerAsync<GenericImage>, String, RedisStore)> {
        if !docker_helpers::is_docker_available() {
            docker_helpers::print_docker_unavailable_warning("Redis integration test");
            return None;
        }

        let redis_image = GenericImage::new("redis", "7-alpine")
            .with_exposed_port(6379.into())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));

        let container = redis_image.start().await.ok()?;
        let port = container.get_host_port_ipv4(6379).await.ok()?;
        let url = format!("redis://127.0.0.1:{}", port);

        // Give Redis a moment to start up
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

        let client = redis::Client::open(url.as_str()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();

        let documents = [
            ("main", "billing-prod.yml", "db:\n  host: prod-db\n"),
            ("main", "application.yml", "db:\n  host: localhost\n  port: 5432\n"),
            ("v2", "billing-prod.yml", "db:\n  host: v2-db\n"),
        ];
        for (reference, path, content) in documents {
            let _: () = match storage_mode {
                RedisStorageMode::StringKeys => redis::cmd("SET")
                    .arg(format!("cfg:{}:{}", reference, path))
                    .arg(content)
                    .query_async(&mut conn)
                    .await
                    .unwrap(),
                RedisStorageMode::Hash => redis::cmd("HSET")
                    .arg(format!("cfg:{}", reference))
                    .arg(path)
                    .arg(content)
                    .query_async(&mut conn)
                    .await
                    .unwrap(),
            };
        }

        let store = RedisStore::new(&url, "cfg:", storage_mode).await.unwrap();
        Some((container, url, store))
    }

    #[tokio::test]
    async fn test_redis_string_keys_read() {
        let Some((_container, _, store)) = setup_redis_test(RedisStorageMode::StringKeys).await
        else {
            return;
        };

        let bytes = store.read("billing-prod.yml", "main").await.unwrap().unwrap();
        assert_eq!(bytes, b"db:\n  host: prod-db\n");
        assert!(store.read("missing.yml", "main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_hash_read() {
        let Some((_container, _, store)) = setup_redis_test(RedisStorageMode::Hash).await else {
            return;
        };

        let bytes = store.read("billing-prod.yml", "v2").await.unwrap().unwrap();
        assert_eq!(bytes, b"db:\n  host: v2-db\n");
        assert!(store.read("billing-prod.yml", "v3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_list_versions() {
        for mode in [RedisStorageMode::StringKeys, RedisStorageMode::Hash] {
            let Some((_container, _, store)) = setup_redis_test(mode).await else {
                return;
            };

            assert_eq!(store.list_versions("").await.unwrap(), vec!["main", "v2"]);
            assert_eq!(
                store.list_versions("billing-prod.yml").await.unwrap(),
                vec!["main", "v2"]
            );
            assert_eq!(store.list_versions("application.yml").await.unwrap(), vec!["main"]);
        }
    }

    #[tokio::test]
    async fn test_redis_resolve_config() {
        let Some((_container, _, store)) = setup_redis_test(RedisStorageMode::StringKeys).await
        else {
            return;
        };

        let server = ConfigServer::builder()
            .with_store(Arc::new(store))
            .build()
            .unwrap();

        let env = server.resolve_config("billing", "prod", None).await.unwrap();
        assert_eq!(env.config.get("db.host"), Some(&ConfigValue::from("prod-db")));
        assert_eq!(env.config.get("db.port"), Some(&ConfigValue::Integer(5432)));

        let env = server
            .resolve_config("billing", "prod", Some("v2"))
            .await
            .unwrap();
        assert_eq!(env.config.get("db.host"), Some(&ConfigValue::from("v2-db")));
        assert_eq!(env.config.get("db.port"), None);
    }

    #[tokio::test]
    async fn test_redis_sees_updates_without_cache() {
        let Some((_container, url, store)) = setup_redis_test(RedisStorageMode::Hash).await else {
            return;
        };
        let server = ConfigServer::builder()
            .with_store(Arc::new(store))
            .build()
            .unwrap();

        let client = redis::Client::open(url.as_str()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = redis::cmd("HSET")
            .arg("cfg:main")
            .arg("billing-prod.yml")
            .arg("db:\n  host: updated-db\n")
            .query_async(&mut conn)
            .await
            .unwrap();

        let env = server.resolve_config("billing", "prod", None).await.unwrap();
        assert_eq!(env.config.get("db.host"), Some(&ConfigValue::from("updated-db")));
    }

    async fn connected_clients(conn: &mut redis::aio::MultiplexedConnection) -> usize {
        let info: String = redis::cmd("INFO")
            .arg("clients")
            .query_async(conn)
            .await
            .unwrap();
        info.lines()
            .find_map(|line| line.strip_prefix("connected_clients:"))
            .and_then(|count| count.trim().parse().ok())
            .unwrap()
    }

    #[tokio::test]
    async fn test_redis_requests_share_one_connection() {
        let Some((_container, url, store)) = setup_redis_test(RedisStorageMode::StringKeys).await
        else {
            return;
        };

        let client = redis::Client::open(url.as_str()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let before = connected_clients(&mut conn).await;

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.read("billing-prod.yml", "main").await.unwrap();
                store.list_versions("billing-prod.yml").await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(connected_clients(&mut conn).await <= before);
    }

    #[tokio::test]
    async fn test_redis_invalid_namespace() {
        let result = RedisStore::new("redis://127.0.0.1:1", "cfg:*", RedisStorageMode::Hash).await;
        assert!(result.is_err());
    }
}
