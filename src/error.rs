//! Error types for playground engines and controllers.

use thiserror::Error;

/// Errors that can occur while acquiring or driving a language engine.
#[derive(Error, Debug)]
pub enum PlaygroundError {
    /// The engine could not be bootstrapped.
    #[error("failed to load engine: {0}")]
    EngineLoad(String),

    /// The execution exceeded the configured timeout.
    #[error("execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The execution exceeded memory limits.
    #[error("memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),

    /// Failed to initialize the Wasm runtime.
    #[error("failed to initialize runtime: {0}")]
    RuntimeInit(#[source] anyhow::Error),

    /// Failed to load or instantiate the Python interpreter module.
    #[error("failed to load Python interpreter: {0}")]
    ModuleLoad(#[source] anyhow::Error),

    /// The Python interpreter wasm file was not found.
    #[error("Python interpreter wasm not found at: {0}")]
    InterpreterNotFound(String),

    /// The learner's code failed without a recognizable Python exception.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A Python exception was raised during execution.
    #[error("Python {exception_type}: {message}")]
    PythonException {
        /// The type of Python exception (e.g., "ValueError", "TypeError").
        exception_type: String,
        /// The exception message.
        message: String,
        /// The full Python traceback, if available.
        traceback: Option<String>,
    },

    /// A SQL statement was rejected by the database engine.
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Execution ran out of fuel (instruction limit).
    #[error("execution ran out of fuel after {consumed:?} instructions")]
    OutOfFuel {
        /// Number of instructions consumed before running out.
        consumed: Option<u64>,
    },

    /// A package could not be resolved or installed.
    #[error("failed to install {package}: {reason}")]
    PackageInstall {
        /// The requested package name.
        package: String,
        /// Why the install failed.
        reason: String,
    },

    /// Transport failure while talking to the package index.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine's worker task died outside of any single statement.
    #[error("engine worker failed: {0}")]
    Worker(String),

    /// The interpreter's driver sent a message the host could not read.
    #[error("malformed interpreter message: {0}")]
    Protocol(#[from] serde_json::Error),

    /// I/O error in the engine session directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Learner input was rejected before reaching an engine.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested feature is not enabled for this playground.
    #[error("{0} is not enabled for this playground")]
    FeatureDisabled(&'static str),

    /// No virtual file exists under the given name.
    #[error("no such file: {0}")]
    UnknownFile(String),

    /// A virtual file with the given name already exists.
    #[error("file already exists: {0}")]
    DuplicateFile(String),
}

impl PlaygroundError {
    /// Check if this error represents a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PlaygroundError::Timeout(_))
    }

    /// Check if this error represents a memory limit exceeded.
    pub fn is_memory_limit(&self) -> bool {
        matches!(self, PlaygroundError::MemoryLimitExceeded(_))
    }

    /// Check if this error represents a Python exception.
    pub fn is_python_exception(&self) -> bool {
        matches!(self, PlaygroundError::PythonException { .. })
    }

    /// Check if this error represents an out-of-fuel condition.
    pub fn is_out_of_fuel(&self) -> bool {
        matches!(self, PlaygroundError::OutOfFuel { .. })
    }

    /// Whether this fault is scoped to a single statement of a SQL batch.
    ///
    /// Statement faults are rendered inline and the batch continues; anything
    /// else aborts the batch.
    pub fn is_statement_fault(&self) -> bool {
        matches!(
            self,
            PlaygroundError::Sql(_)
                | PlaygroundError::ExecutionFailed(_)
                | PlaygroundError::PythonException { .. }
        )
    }

    /// The human-readable message shown to the learner in the output panel.
    pub fn fault_message(&self) -> String {
        match self {
            PlaygroundError::PythonException {
                traceback: Some(traceback),
                ..
            } => traceback.clone(),
            PlaygroundError::PythonException {
                exception_type,
                message,
                traceback: None,
            } => {
                if message.is_empty() {
                    exception_type.clone()
                } else {
                    format!("{}: {}", exception_type, message)
                }
            }
            PlaygroundError::Sql(e) => e.to_string(),
            PlaygroundError::ExecutionFailed(message) | PlaygroundError::EngineLoad(message) => {
                message.clone()
            }
            PlaygroundError::PackageInstall { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for playground operations.
pub type Result<T> = std::result::Result<T, PlaygroundError>;

/// Parse a Python exception from stderr output.
///
/// This attempts to extract the exception type, message, and traceback
/// from Python's standard error output format.
pub fn parse_python_exception(stderr: &str) -> Option<PlaygroundError> {
    if stderr.trim().is_empty() {
        return None;
    }

    let lines: Vec<&str> = stderr.lines().collect();

    // The exception line is the last unindented line that names an exception.
    let mut exception_line = None;
    let mut traceback_start = None;

    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("Traceback (most recent call last):") {
            traceback_start = Some(i);
        }
        if !line.starts_with(' ')
            && !line.is_empty()
            && !line.starts_with("Traceback")
            && looks_like_exception(line)
        {
            exception_line = Some((i, *line));
        }
    }

    let (line_idx, exception_str) = exception_line?;

    let (exception_type, message) = match exception_str.find(':') {
        Some(colon_pos) => (
            exception_str[..colon_pos].trim().to_string(),
            exception_str[colon_pos + 1..].trim().to_string(),
        ),
        None => (exception_str.trim().to_string(), String::new()),
    };

    let traceback = traceback_start.map(|start| lines[start..=line_idx].join("\n"));

    Some(PlaygroundError::PythonException {
        exception_type,
        message,
        traceback,
    })
}

/// Check if a line looks like a Python exception.
fn looks_like_exception(line: &str) -> bool {
    const EXCEPTION_SUFFIXES: [&str; 3] = ["Error", "Exception", "Warning"];
    const STANDALONE_EXCEPTIONS: [&str; 4] = [
        "KeyboardInterrupt",
        "SystemExit",
        "StopIteration",
        "GeneratorExit",
    ];

    if !line
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
    {
        return false;
    }

    let terminated_at = |after_idx: usize| {
        after_idx >= line.len() || matches!(line.as_bytes()[after_idx], b':' | b' ' | b'\n')
    };

    // The exception name is the leading dotted identifier, e.g. `json.decoder.JSONDecodeError`.
    let name_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(line.len());
    let name = &line[..name_end];

    if EXCEPTION_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix) && terminated_at(name_end))
    {
        return true;
    }

    STANDALONE_EXCEPTIONS
        .iter()
        .any(|exc| line.starts_with(exc) && terminated_at(exc.len()))
}
