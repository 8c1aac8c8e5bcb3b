//! Run dispatch against a ready engine.
//!
//! Every fault raised by the engine is converted to log text here; nothing
//! propagates past these functions.

use tracing::{debug, warn};

use crate::engine::io::OutputSink;
use crate::engine::{PythonEngine, SqlEngine};
use crate::error::Result;
use crate::playground::files::VirtualFile;
use crate::playground::render;

/// Run `source` on a Python engine and return the new log.
///
/// Files are written to the engine before the run, in their stored order.
pub async fn run_python(engine: &dyn PythonEngine, source: &str, files: &[VirtualFile]) -> String {
    let sink = OutputSink::new();
    match execute_python(engine, source, files, &sink).await {
        Ok(value) => render::python_success(&sink.contents(), value.as_deref()),
        Err(err) => {
            debug!(error = %err, "python run raised");
            render::python_failure(&sink.contents(), &err)
        }
    }
}

async fn execute_python(
    engine: &dyn PythonEngine,
    source: &str,
    files: &[VirtualFile],
    sink: &OutputSink,
) -> Result<Option<String>> {
    for file in files.iter().filter(|file| file.is_file()) {
        engine.write_file(&file.name, &file.content).await?;
    }
    engine.set_stdout(sink.clone());
    engine.run_source(source).await
}

/// Run a `;`-separated batch on a SQL engine and return the new log.
pub async fn run_sql(engine: &dyn SqlEngine, source: &str) -> String {
    match execute_batch(engine, source).await {
        Ok(text) if text.is_empty() => render::SQL_SUCCESS.to_string(),
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "sql batch aborted");
            render::batch_failure(&err)
        }
    }
}

async fn execute_batch(engine: &dyn SqlEngine, source: &str) -> Result<String> {
    let mut text = String::new();

    for (index, statement) in render::split_statements(source).into_iter().enumerate() {
        let number = index + 1;
        match engine.execute(statement).await {
            Ok(sets) if sets.is_empty() => text.push_str(&render::statement_executed(number)),
            Ok(sets) => {
                for set in &sets {
                    text.push_str(&render::result_set(number, set));
                }
            }
            Err(err) if err.is_statement_fault() => {
                debug!(statement = number, error = %err, "statement failed");
                text.push_str(&render::statement_failed(number, &err));
            }
            Err(err) => return Err(err),
        }
    }

    Ok(text)
}
