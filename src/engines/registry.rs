//! Engine rotator registry
//!
//! Read-only after construction. Built once and handed to the rotation
//! state machine.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::{Engine, EngineRotator, PostgresRotator, SqlServerRotator};
use crate::config::EngineConfig;
use crate::errors::{Error, Result};

/// Registry of engine rotators keyed by [`Engine`]
#[derive(Clone, Default)]
pub struct EngineRotatorRegistry {
    rotators: BTreeMap<Engine, Arc<dyn EngineRotator>>,
}

impl std::fmt::Debug for EngineRotatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRotatorRegistry")
            .field("engines", &self.registered_engines())
            .finish()
    }
}

impl EngineRotatorRegistry {
    /// Create a new registry with no rotators
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the Postgres and SQL Server rotators
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PostgresRotator::new(config)));
        registry.register(Arc::new(SqlServerRotator::new(config)));
        registry
    }

    /// Register a rotator, replacing any rotator for the same engine
    pub fn register(&mut self, rotator: Arc<dyn EngineRotator>) {
        let engine = rotator.engine();
        info!(engine = %engine, "Registering engine rotator");
        self.rotators.insert(engine, rotator);
    }

    /// Resolve the rotator for an engine identifier.
    ///
    /// # Errors
    ///
    /// - `UnsupportedEngine` if the identifier is unknown or not registered
    pub fn lookup(&self, engine_id: &str) -> Result<Arc<dyn EngineRotator>> {
        let engine: Engine = engine_id.parse()?;
        self.rotators.get(&engine).cloned().ok_or_else(|| Error::unsupported_engine(engine_id))
    }

    /// Get list of registered engines
    pub fn registered_engines(&self) -> Vec<Engine> {
        self.rotators.keys().copied().collect()
    }
}
