//! # Code Playground
//!
//! Interactive Python and SQL playgrounds for lesson pages.
//!
//! A [`Playground`] is one mounted widget. It acquires exactly one language
//! engine through an [`EngineFactory`], runs the learner's source against it
//! and keeps the session state a lesson page renders:
//!
//! - **Engine lifecycle**: `Uninitialized → Loading → Ready | Failed`, once per mount
//! - **Python runs**: captured stdout plus the value of a trailing expression
//! - **SQL batches**: statements split on `;`, each rendered or failed on its own
//! - **Package installs**: pure-Python wheels fetched from a PyPI-compatible index
//! - **Virtual files**: an explorer of named buffers written into the interpreter
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wasm_code_playground_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PlaygroundConfig::builder(Language::Sql)
//!         .setup_source("CREATE TABLE users (id INTEGER, name TEXT);")
//!         .initial_source("INSERT INTO users VALUES (1, 'Ada'); SELECT * FROM users;")
//!         .build();
//!
//!     let factory = Arc::new(DefaultEngineFactory::new(EngineConfig::default()));
//!     let playground = Playground::new(config, factory);
//!
//!     playground.mount().await;
//!     playground.run().await;
//!     println!("{}", playground.output());
//! }
//! ```
//!
//! ## Engines
//!
//! The controller only depends on the traits in [`engine`]. The bundled
//! adapters are:
//!
//! 1. **Python**: RustPython compiled to WebAssembly, run under Wasmtime with
//!    memory, fuel and epoch-based time limits
//! 2. **SQL**: an embedded SQLite database, private to the playground

pub mod engine;
pub mod error;
pub mod playground;
pub mod prelude;
pub mod theme;

// Re-export main types at crate root for convenience
pub use engine::config::{EngineConfig, EngineConfigBuilder};
pub use engine::factory::DefaultEngineFactory;
pub use engine::io::OutputSink;
pub use engine::python::WasmPythonEngine;
pub use engine::sql::SqliteEngine;
pub use engine::{EngineFactory, EngineHandle, Language, PythonEngine, ResultSet, SqlEngine};
pub use error::{PlaygroundError, Result};
pub use playground::config::{PlaygroundConfig, PlaygroundConfigBuilder};
pub use playground::controller::{EngineState, EngineStatus, Playground};
pub use playground::files::{FileKind, VirtualFile};
pub use playground::view::{ExplorerEntry, InstallerView, PlaygroundView};
pub use theme::{Theme, ThemeChannel};
