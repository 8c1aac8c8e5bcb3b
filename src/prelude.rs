//! Prelude module for convenient imports.

pub use crate::engine::{
    config::EngineConfig, factory::DefaultEngineFactory, io::OutputSink, EngineFactory,
    EngineHandle, Language, PythonEngine, ResultSet, SqlEngine,
};
pub use crate::error::{PlaygroundError, Result};
pub use crate::playground::{
    config::PlaygroundConfig,
    controller::{EngineStatus, Playground},
    view::PlaygroundView,
};
