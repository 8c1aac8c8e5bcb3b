//! Language engine adapters consumed by the playground controller.
//!
//! The controller only sees the traits in this module. The submodules hold
//! the reference adapters: a RustPython interpreter running under Wasmtime
//! and an embedded SQLite database.

pub mod config;
pub mod factory;
pub mod io;
pub mod limits;
pub mod packages;
pub mod python;
pub mod sql;

use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PlaygroundError, Result};
use crate::engine::io::OutputSink;

/// Directory an engine keeps for itself; learner files may not live there.
pub const RESERVED_DIR: &str = ".playground";

/// The two engine kinds a playground can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// A Python interpreter.
    #[default]
    Python,
    /// A SQLite database.
    Sql,
}

impl Language {
    /// Name of the engine shown to learners.
    pub fn engine_name(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Sql => "SQLite",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => f.write_str("python"),
            Language::Sql => f.write_str("sql"),
        }
    }
}

/// Check a learner-supplied file name and return it relative to the engine root.
///
/// Names must be relative, must not climb out of the root and must not touch
/// [`RESERVED_DIR`]. A leading `/` is accepted and ignored.
pub fn relative_file_path(name: &str) -> Result<&Path> {
    let relative = Path::new(name.trim().trim_start_matches('/'));
    let plain = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if relative.as_os_str().is_empty() || !plain || relative.starts_with(RESERVED_DIR) {
        return Err(PlaygroundError::InvalidInput(format!(
            "'{}' is not a valid file name",
            name.trim()
        )));
    }
    Ok(relative)
}

/// One result set produced by a SQL statement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Row values rendered as display text.
    pub rows: Vec<Vec<String>>,
}

/// A loaded Python interpreter.
#[async_trait]
pub trait PythonEngine: Send + Sync {
    /// Redirect standard output of subsequent runs into `sink`.
    fn set_stdout(&self, sink: OutputSink);

    /// Execute setup source once; its definitions stay visible to later runs.
    async fn prepare(&self, setup: &str) -> Result<()>;

    /// Execute `source` as a single unit.
    ///
    /// Returns the display form of a trailing expression value, or `None`
    /// when there is none or it evaluated to `None`.
    async fn run_source(&self, source: &str) -> Result<Option<String>>;

    /// Fetch and install a package into this interpreter instance.
    async fn install_package(&self, name: &str) -> Result<()>;

    /// Write a file into the interpreter's addressable storage.
    async fn write_file(&self, name: &str, content: &str) -> Result<()>;
}

/// A loaded SQL database.
#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Execute a multi-statement script, discarding any rows.
    async fn execute_script(&self, script: &str) -> Result<()>;

    /// Execute a single statement and collect its result sets.
    async fn execute(&self, statement: &str) -> Result<Vec<ResultSet>>;
}

/// A ready-to-use engine owned by exactly one playground.
#[derive(Clone)]
pub enum EngineHandle {
    /// A Python interpreter.
    Python(Arc<dyn PythonEngine>),
    /// A SQL database.
    Sql(Arc<dyn SqlEngine>),
}

impl EngineHandle {
    /// The language this handle executes.
    pub fn language(&self) -> Language {
        match self {
            EngineHandle::Python(_) => Language::Python,
            EngineHandle::Sql(_) => Language::Sql,
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EngineHandle")
            .field(&self.language())
            .finish()
    }
}

/// Acquires engines for playgrounds.
///
/// Every call produces a fresh engine; engines are never pooled.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Load an engine for `language`.
    async fn load(&self, language: Language) -> Result<EngineHandle>;
}
