//! Engine factory backed by the reference adapters.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::engine::config::EngineConfig;
use crate::engine::python::WasmPythonEngine;
use crate::engine::sql::SqliteEngine;
use crate::engine::{EngineFactory, EngineHandle, Language};
use crate::error::Result;

/// Builds a fresh [`WasmPythonEngine`] or [`SqliteEngine`] per request.
#[derive(Debug, Clone, Default)]
pub struct DefaultEngineFactory {
    config: EngineConfig,
}

impl DefaultEngineFactory {
    /// Create a factory that bootstraps engines from `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The configuration handed to every engine.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[async_trait]
impl EngineFactory for DefaultEngineFactory {
    async fn load(&self, language: Language) -> Result<EngineHandle> {
        debug!(%language, "bootstrapping engine");
        match language {
            Language::Python => {
                let engine = WasmPythonEngine::load(self.config.clone()).await?;
                Ok(EngineHandle::Python(Arc::new(engine)))
            }
            Language::Sql => {
                let engine = SqliteEngine::open(&self.config.sql_locator).await?;
                Ok(EngineHandle::Sql(Arc::new(engine)))
            }
        }
    }
}
