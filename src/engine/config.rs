//! Engine bootstrap configuration with builder pattern.

use std::path::PathBuf;
use std::time::Duration;

/// Default package index (PyPI JSON API).
pub const DEFAULT_PACKAGE_INDEX: &str = "https://pypi.org/pypi";

/// Locator that opens a private in-memory SQLite database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Configuration shared by the reference engine adapters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum execution time of a single Python run.
    pub timeout: Duration,
    /// Maximum linear memory of the Python interpreter in bytes.
    pub max_memory: u64,
    /// Maximum fuel (instruction count limit).
    pub max_fuel: Option<u64>,
    /// Location of the RustPython wasm distribution.
    pub interpreter_path: PathBuf,
    /// Epoch interruption interval for cooperative timeout.
    pub epoch_tick_interval: Duration,
    /// Capacity of the captured stdout/stderr pipes in bytes.
    pub output_capacity: usize,
    /// Base URL of the package index used by `install_package`.
    pub package_index_url: String,
    /// SQLite database locator.
    pub sql_locator: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_memory: 64 * 1024 * 1024, // 64MB
            max_fuel: None,
            interpreter_path: PathBuf::from("assets/rustpython.wasm"),
            epoch_tick_interval: Duration::from_millis(10),
            output_capacity: 1024 * 1024,
            package_index_url: DEFAULT_PACKAGE_INDEX.to_string(),
            sql_locator: IN_MEMORY_DATABASE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new builder for EngineConfig.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for creating EngineConfig instances.
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    timeout: Option<Duration>,
    max_memory: Option<u64>,
    max_fuel: Option<u64>,
    interpreter_path: Option<PathBuf>,
    epoch_tick_interval: Option<Duration>,
    output_capacity: Option<usize>,
    package_index_url: Option<String>,
    sql_locator: Option<String>,
}

impl EngineConfigBuilder {
    /// Set the maximum execution timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum memory limit in bytes.
    pub fn max_memory(mut self, bytes: u64) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    /// Set the maximum fuel (instruction count).
    pub fn max_fuel(mut self, fuel: u64) -> Self {
        self.max_fuel = Some(fuel);
        self
    }

    /// Set the path to the RustPython wasm interpreter.
    pub fn interpreter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.interpreter_path = Some(path.into());
        self
    }

    /// Set the epoch tick interval for timeout checking.
    pub fn epoch_tick_interval(mut self, interval: Duration) -> Self {
        self.epoch_tick_interval = Some(interval);
        self
    }

    /// Set the capacity of the captured output pipes.
    pub fn output_capacity(mut self, bytes: usize) -> Self {
        self.output_capacity = Some(bytes);
        self
    }

    /// Set the package index base URL.
    pub fn package_index_url(mut self, url: impl Into<String>) -> Self {
        self.package_index_url = Some(url.into());
        self
    }

    /// Set the SQLite database locator (a file path or `:memory:`).
    pub fn sql_locator(mut self, locator: impl Into<String>) -> Self {
        self.sql_locator = Some(locator.into());
        self
    }

    /// Build the EngineConfig.
    pub fn build(self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig {
            timeout: self.timeout.unwrap_or(default.timeout),
            max_memory: self.max_memory.unwrap_or(default.max_memory),
            max_fuel: self.max_fuel.or(default.max_fuel),
            interpreter_path: self.interpreter_path.unwrap_or(default.interpreter_path),
            epoch_tick_interval: self
                .epoch_tick_interval
                .unwrap_or(default.epoch_tick_interval),
            output_capacity: self.output_capacity.unwrap_or(default.output_capacity),
            package_index_url: self
                .package_index_url
                .unwrap_or(default.package_index_url),
            sql_locator: self.sql_locator.unwrap_or(default.sql_locator),
        }
    }
}
