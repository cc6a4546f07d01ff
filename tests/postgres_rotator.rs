//! PostgreSQL rotator against a real database.
//!
//! Requires Docker. Enable with: cargo test --features postgres_tests

#![cfg(feature = "postgres_tests")]

use std::sync::Arc;

use db_secret_rotator::config::EngineConfig;
use db_secret_rotator::engines::{EngineRotator, EngineRotatorRegistry, PostgresRotator};
use db_secret_rotator::{
    CredentialRecord, ErrorKind, InMemorySecretStore, PasswordPolicy, RotationRequest,
    RotationStep, SecretRotator, SecretString, VersionStage,
};
use sqlx::{Connection, Executor, PgConnection};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

const LOGIN: &str = "app_user";
const LOGIN_PASSWORD: &str = "initial-Passw0rd";

struct TestDatabase {
    host: String,
    port: u16,
    _container: ContainerAsync<Postgres>,
}

impl TestDatabase {
    /// Start a container and create a login that can change its own password
    async fn new() -> Self {
        let container = Postgres::default()
            .start()
            .await
            .unwrap_or_else(|e| panic!("Failed to start PostgreSQL container: {}", e));
        let host = container.get_host().await.expect("container host").to_string();
        let port = container.get_host_port_ipv4(5432).await.expect("container port");

        let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
        let mut admin = PgConnection::connect(&admin_url).await.expect("admin connection");
        admin
            .execute(format!("CREATE ROLE {} LOGIN PASSWORD '{}'", LOGIN, LOGIN_PASSWORD).as_str())
            .await
            .expect("create login");
        admin.close().await.expect("close admin connection");

        Self { host, port, _container: container }
    }

    fn credential(&self, password: &str) -> CredentialRecord {
        CredentialRecord {
            database_name: "postgres".to_string(),
            engine: "postgres".to_string(),
            host: self.host.clone(),
            instance: String::new(),
            password: SecretString::new(password),
            port: self.port.to_string(),
            username: LOGIN.to_string(),
        }
    }
}

fn engine_config() -> EngineConfig {
    // the stock container image does not serve TLS
    EngineConfig { postgres_ssl_mode: "disable".to_string(), ..Default::default() }
}

#[tokio::test]
async fn test_rotate_and_test_against_postgres() {
    let db = TestDatabase::new().await;
    let rotator = PostgresRotator::new(&engine_config());

    rotator.test(&db.credential(LOGIN_PASSWORD)).await.unwrap();

    let new_password = SecretString::new("n3w-Pa'ss\"word");
    rotator.rotate(&db.credential(LOGIN_PASSWORD), &new_password).await.unwrap();

    rotator.test(&db.credential(new_password.expose_secret())).await.unwrap();
    let err = rotator.test(&db.credential(LOGIN_PASSWORD)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_rotate_with_wrong_password_is_connection_error() {
    let db = TestDatabase::new().await;
    let rotator = PostgresRotator::new(&engine_config());

    let err = rotator
        .rotate(&db.credential("not-the-password"), &SecretString::new("whatever1A"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_full_rotation_against_postgres() {
    let db = TestDatabase::new().await;
    let store = Arc::new(InMemorySecretStore::new());
    let payload = db.credential(LOGIN_PASSWORD).to_json().unwrap();
    store.seed_version("db/app", "v1", Some(payload.as_str()), &[VersionStage::Current]).await;

    let rotator = SecretRotator::new(
        store.clone(),
        EngineRotatorRegistry::with_defaults(&engine_config()),
        PasswordPolicy::default(),
    );

    for step in RotationStep::ALL {
        rotator.handle(&RotationRequest::new("db/app", "attempt-1", step)).await.unwrap();
    }

    let value = store.payload_of("db/app", &"attempt-1".into()).await.unwrap();
    let current = CredentialRecord::from_json(value.expose_secret()).unwrap();
    PostgresRotator::new(&engine_config()).test(&current).await.unwrap();
}
