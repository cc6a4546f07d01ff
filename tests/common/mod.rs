//! Shared fixtures for rotation integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use db_secret_rotator::engines::{Engine, EngineRotator, EngineRotatorRegistry};
use db_secret_rotator::secrets::InMemorySecretStore;
use db_secret_rotator::{
    CredentialRecord, Error, PasswordPolicy, Result, SecretRotator, SecretString, VersionStage,
};

pub const SECRET_ID: &str = "prod/orders/app";
pub const OLD_PASSWORD: &str = "0ld-Passw0rd-value";

/// Calls observed by a [`FakeDatabase`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbCall {
    Rotate { username: String, login_password: String, new_password: String },
    Test { username: String, password: String },
}

#[derive(Debug)]
struct DbState {
    password: String,
    reachable: bool,
    calls: Vec<DbCall>,
}

/// Single-login database behind an [`EngineRotator`]
#[derive(Debug, Clone)]
pub struct FakeDatabase {
    engine: Engine,
    state: Arc<Mutex<DbState>>,
    rotate_delay: Option<Duration>,
}

impl FakeDatabase {
    pub fn new(engine: Engine, password: &str) -> Self {
        Self {
            engine,
            state: Arc::new(Mutex::new(DbState {
                password: password.to_string(),
                reachable: true,
                calls: Vec::new(),
            })),
            rotate_delay: None,
        }
    }

    pub fn with_rotate_delay(mut self, delay: Duration) -> Self {
        self.rotate_delay = Some(delay);
        self
    }

    pub fn password(&self) -> String {
        self.state.lock().unwrap().password.clone()
    }

    pub fn calls(&self) -> Vec<DbCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    fn login(&self, state: &DbState, credential: &CredentialRecord) -> Result<()> {
        if !state.reachable {
            return Err(Error::connection(self.engine.as_str(), "connection refused"));
        }
        if credential.password.expose_secret() != state.password {
            return Err(Error::connection(
                self.engine.as_str(),
                format!("password authentication failed for user \"{}\"", credential.username),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EngineRotator for FakeDatabase {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn rotate(&self, current: &CredentialRecord, new_password: &SecretString) -> Result<()> {
        if let Some(delay) = self.rotate_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(DbCall::Rotate {
            username: current.username.clone(),
            login_password: current.password.expose_secret().to_string(),
            new_password: new_password.expose_secret().to_string(),
        });
        self.login(&state, current)?;
        state.password = new_password.expose_secret().to_string();
        Ok(())
    }

    async fn test(&self, credential: &CredentialRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DbCall::Test {
            username: credential.username.clone(),
            password: credential.password.expose_secret().to_string(),
        });
        self.login(&state, credential)
    }
}

pub fn credential(engine: &str, password: &str) -> CredentialRecord {
    CredentialRecord {
        database_name: "orders".to_string(),
        engine: engine.to_string(),
        host: "orders.cluster.internal".to_string(),
        instance: String::new(),
        password: SecretString::new(password),
        port: "5432".to_string(),
        username: "app".to_string(),
    }
}

/// Store holding one CURRENT version `v1` of `record`
pub async fn store_with_current(record: &CredentialRecord) -> Arc<InMemorySecretStore> {
    let store = Arc::new(InMemorySecretStore::new());
    let payload = record.to_json().unwrap();
    store.seed_version(SECRET_ID, "v1", Some(payload.as_str()), &[VersionStage::Current]).await;
    store
}

pub fn rotator_with(store: Arc<InMemorySecretStore>, database: &FakeDatabase) -> SecretRotator {
    let mut registry = EngineRotatorRegistry::new();
    registry.register(Arc::new(database.clone()));
    SecretRotator::new(store, registry, PasswordPolicy::default())
}
