//! RustPython interpreter running under Wasmtime.
//!
//! One interpreter instance lives for the whole session. It runs a small
//! driver loop that picks up requests from the session directory, executes
//! them against a namespace that persists between requests, and answers with
//! a reply file. Learner globals and setup definitions therefore survive from
//! one run to the next, and setup runs exactly once per interpreter.
//!
//! If a request is stopped by a limit the instance is gone with it. The next
//! request starts a fresh interpreter and replays the setup source before
//! running; globals defined by earlier runs are lost at that point.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};
use wasmtime::{Engine, Linker, Module, Store, Trap};
use wasmtime_wasi::pipe::MemoryOutputPipe;
use wasmtime_wasi::preview1;
use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

use crate::engine::config::EngineConfig;
use crate::engine::io::OutputSink;
use crate::engine::limits::{install_limits, Denial, RunClock, SessionState};
use crate::engine::packages::PackageIndex;
use crate::engine::{relative_file_path, PythonEngine, RESERVED_DIR};
use crate::error::{parse_python_exception, PlaygroundError, Result};

/// Session subdirectory holding installed wheels.
const SITE_PACKAGES_DIR: &str = "site-packages";

const REQUEST_FILE: &str = "request.json";
const PENDING_REQUEST_FILE: &str = "request.tmp";
const REPLY_FILE: &str = "reply.json";
const STDOUT_FILE: &str = "stdout";
const READY_FILE: &str = "ready";

/// How often the host looks for a reply.
const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How long a fresh interpreter may take to reach its request loop.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Extra wait past the deadline before a stuck interpreter is abandoned.
///
/// The epoch callback cannot fire while the guest is blocked in a host call
/// such as `time.sleep`.
const OVERRUN_GRACE: Duration = Duration::from_secs(1);

/// Bootstrap passed to the interpreter with `-c`.
///
/// `setup` requests run with stdout discarded. `run` requests stream stdout
/// to `/.playground/stdout` as it is written, and a trailing expression
/// statement is evaluated separately so its `str()` can be returned.
const DRIVER: &str = r#"
import ast, io, json, os, sys, time, traceback

_DIR = '/.playground'
_SOURCES = ('<playground>', '<setup>')
_ns = {'__name__': '__main__'}


class _Stream:
    def __init__(self, path):
        self._file = open(path, 'w')

    def write(self, text):
        self._file.write(text)
        self._file.flush()
        return len(text)

    def flush(self):
        self._file.flush()

    def close(self):
        self._file.close()


def _refresh_path():
    for wheel in sorted(os.listdir('/site-packages')):
        entry = '/site-packages/' + wheel
        if wheel.endswith('.whl') and entry not in sys.path:
            sys.path.insert(0, entry)


def _run(source):
    tree = ast.parse(source, '<playground>', 'exec')
    last = None
    if tree.body and isinstance(tree.body[-1], ast.Expr):
        last = ast.Expression(tree.body.pop().value)
    exec(compile(tree, '<playground>', 'exec'), _ns)
    if last is not None:
        value = eval(compile(last, '<playground>', 'eval'), _ns)
        if value is not None:
            return str(value)
    return None


def _describe(exc):
    tb = exc.__traceback__
    while tb is not None and tb.tb_frame.f_code.co_filename not in _SOURCES:
        tb = tb.tb_next
    return {
        'type': type(exc).__name__,
        'message': str(exc),
        'traceback': ''.join(traceback.format_exception(type(exc), exc, tb)),
    }


def _serve(request):
    reply = {'id': request['id'], 'result': None, 'error': None}
    running = request['kind'] == 'run'
    stream = _Stream(_DIR + '/stdout') if running else io.StringIO()
    saved = sys.stdout
    sys.stdout = stream
    try:
        if running:
            reply['result'] = _run(request['source'])
        else:
            exec(compile(request['source'], '<setup>', 'exec'), _ns)
    except BaseException as exc:
        reply['error'] = _describe(exc)
    finally:
        sys.stdout = saved
        stream.close()
    with open(_DIR + '/reply.tmp', 'w') as f:
        json.dump(reply, f)
    os.rename(_DIR + '/reply.tmp', _DIR + '/reply.json')


sys.path.insert(0, '/')
open(_DIR + '/ready', 'w').close()
while True:
    try:
        with open(_DIR + '/request.json') as f:
            request = json.load(f)
    except OSError:
        time.sleep(0.005)
        continue
    os.remove(_DIR + '/request.json')
    _refresh_path()
    _serve(request)
"#;

/// What the driver does with a request's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum RequestKind {
    Setup,
    Run,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    kind: RequestKind,
    source: &'a str,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    result: Option<String>,
    error: Option<RaisedException>,
}

impl Reply {
    fn into_outcome(self) -> Result<Option<String>> {
        match self.error {
            Some(raised) => Err(raised.into()),
            None => Ok(self.result),
        }
    }
}

/// An exception that escaped learner code, as described by the driver.
#[derive(Debug, Deserialize)]
struct RaisedException {
    #[serde(rename = "type")]
    exception_type: String,
    message: String,
    traceback: String,
}

impl From<RaisedException> for PlaygroundError {
    fn from(raised: RaisedException) -> Self {
        let traceback = raised.traceback.trim_end();
        PlaygroundError::PythonException {
            exception_type: raised.exception_type,
            message: raised.message,
            traceback: (!traceback.is_empty()).then(|| traceback.to_string()),
        }
    }
}

/// Everything one request produced.
#[derive(Debug)]
pub struct RunOutput {
    /// Text printed before the request finished or was stopped.
    pub stdout: String,
    /// The trailing expression value, or the fault that ended the request.
    pub outcome: Result<Option<String>>,
}

/// How an interpreter instance ended.
#[derive(Debug)]
pub enum InterpreterExit {
    /// The driver returned or called `exit`.
    Exited {
        /// Exit status.
        code: i32,
        /// Whatever the interpreter wrote to stderr.
        stderr: String,
    },
    /// The run clock stopped a request that overran its deadline.
    Interrupted,
    /// A refused growth request left the interpreter unable to continue.
    OutOfMemory(Denial),
    /// A request used up its fuel budget.
    OutOfFuel {
        /// The per-request budget.
        budget: Option<u64>,
    },
    /// Any other trap.
    Trapped(String),
}

impl InterpreterExit {
    /// The fault reported for the request that was in flight.
    pub fn into_fault(self, timeout: Duration) -> PlaygroundError {
        match self {
            InterpreterExit::Interrupted => PlaygroundError::Timeout(timeout),
            InterpreterExit::OutOfMemory(denial) => {
                PlaygroundError::MemoryLimitExceeded(denial.to_string())
            }
            InterpreterExit::OutOfFuel { budget } => PlaygroundError::OutOfFuel { consumed: budget },
            InterpreterExit::Trapped(message) => PlaygroundError::ExecutionFailed(message),
            InterpreterExit::Exited { code, stderr } => parse_python_exception(&stderr)
                .unwrap_or_else(|| {
                    let stderr = stderr.trim();
                    if stderr.is_empty() {
                        PlaygroundError::ExecutionFailed(format!(
                            "interpreter exited with status {}",
                            code
                        ))
                    } else {
                        PlaygroundError::ExecutionFailed(stderr.to_string())
                    }
                }),
        }
    }
}

/// A running interpreter instance.
struct Worker {
    handle: JoinHandle<Result<InterpreterExit>>,
    clock: Arc<RunClock>,
}

enum Waited {
    Replied(Reply),
    Exited(PlaygroundError),
    Overran,
}

/// A Python interpreter session backed by RustPython compiled to WebAssembly.
pub struct WasmPythonEngine {
    config: EngineConfig,
    engine: Engine,
    module: Module,
    session: TempDir,
    setup: Mutex<String>,
    stdout: Mutex<Option<OutputSink>>,
    index: PackageIndex,
    worker: AsyncMutex<Option<Worker>>,
    requests: AtomicU64,
    ticker: JoinHandle<()>,
}

impl std::fmt::Debug for WasmPythonEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmPythonEngine")
            .field("interpreter", &self.config.interpreter_path)
            .field("session", &self.session.path())
            .field("index", &self.index.base_url())
            .finish_non_exhaustive()
    }
}

impl WasmPythonEngine {
    /// Compile the interpreter, create a fresh session and boot the interpreter.
    pub async fn load(config: EngineConfig) -> Result<Self> {
        // Epoch interruption drives the per-request deadline
        let mut engine_config = wasmtime::Config::new();
        engine_config.epoch_interruption(true);
        engine_config.consume_fuel(config.max_fuel.is_some());

        let engine = Engine::new(&engine_config).map_err(|e| {
            PlaygroundError::RuntimeInit(anyhow::anyhow!("failed to create engine: {}", e))
        })?;

        let path = config.interpreter_path.clone();
        let compile_engine = engine.clone();
        let module = tokio::task::spawn_blocking(move || compile_interpreter(&compile_engine, &path))
            .await
            .map_err(|e| PlaygroundError::Worker(format!("interpreter compilation panicked: {}", e)))??;

        let session = tempfile::Builder::new().prefix("playground-").tempdir()?;
        std::fs::create_dir_all(session.path().join(RESERVED_DIR))?;
        std::fs::create_dir_all(session.path().join(SITE_PACKAGES_DIR))?;

        let ticker_engine = engine.clone();
        let period = config.epoch_tick_interval.max(Duration::from_millis(1));
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                ticker_engine.increment_epoch();
            }
        });

        let index = PackageIndex::new(config.package_index_url.clone());
        let python = Self {
            config,
            engine,
            module,
            session,
            setup: Mutex::new(String::new()),
            stdout: Mutex::new(None),
            index,
            worker: AsyncMutex::new(None),
            requests: AtomicU64::new(0),
            ticker,
        };

        {
            let mut slot = python.worker.lock().await;
            python.start_worker(&mut slot).await?;
        }

        info!(
            interpreter = %python.config.interpreter_path.display(),
            session = %python.session.path().display(),
            "Python engine loaded"
        );
        Ok(python)
    }

    /// Host directory mirrored at `/` inside the interpreter.
    pub fn session_dir(&self) -> &Path {
        self.session.path()
    }

    fn setup_source(&self) -> MutexGuard<'_, String> {
        self.setup.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_sink(&self) -> Option<OutputSink> {
        self.stdout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn runtime_path(&self, file: &str) -> PathBuf {
        self.session.path().join(RESERVED_DIR).join(file)
    }

    /// Boot an interpreter and wait until its driver loop is listening.
    async fn start_worker(&self, slot: &mut Option<Worker>) -> Result<()> {
        for stale in [READY_FILE, REQUEST_FILE, REPLY_FILE, STDOUT_FILE] {
            remove_if_present(&self.runtime_path(stale))?;
        }

        let clock = Arc::new(RunClock::default());
        let limits = SessionLimits {
            max_memory: self.config.max_memory,
            max_fuel: self.config.max_fuel,
            output_capacity: self.config.output_capacity,
        };
        let engine = self.engine.clone();
        let module = self.module.clone();
        let session_dir = self.session.path().to_path_buf();
        let worker_clock = Arc::clone(&clock);
        let mut handle = tokio::task::spawn_blocking(move || {
            run_interpreter(&engine, &module, &session_dir, &limits, worker_clock)
        });

        let ready = self.runtime_path(READY_FILE);
        let started = Instant::now();
        while !ready.exists() {
            if started.elapsed() > STARTUP_TIMEOUT {
                clock.close();
                return Err(PlaygroundError::EngineLoad(format!(
                    "interpreter did not start within {:?}",
                    STARTUP_TIMEOUT
                )));
            }
            tokio::select! {
                joined = &mut handle => {
                    let fault = exit_fault(joined, self.config.timeout);
                    return Err(PlaygroundError::EngineLoad(format!(
                        "interpreter exited during startup: {}",
                        fault.fault_message()
                    )));
                }
                _ = tokio::time::sleep(REPLY_POLL_INTERVAL) => {}
            }
        }

        debug!(elapsed = ?started.elapsed(), "interpreter listening");
        *slot = Some(Worker { handle, clock });
        Ok(())
    }

    /// Send one request, restarting the interpreter first if it has died.
    async fn dispatch(&self, kind: RequestKind, source: &str) -> Result<RunOutput> {
        let mut slot = self.worker.lock().await;
        if slot.as_ref().map_or(true, |worker| worker.handle.is_finished()) {
            info!("restarting interpreter");
            self.start_worker(&mut slot).await?;

            let setup = self.setup_source().clone();
            if kind == RequestKind::Run && !setup.trim().is_empty() {
                self.exchange(&mut slot, RequestKind::Setup, &setup)
                    .await?
                    .outcome?;
            }
        }
        self.exchange(&mut slot, kind, source).await
    }

    async fn exchange(
        &self,
        slot: &mut Option<Worker>,
        kind: RequestKind,
        source: &str,
    ) -> Result<RunOutput> {
        let timeout = self.config.timeout;
        let worker = slot
            .as_mut()
            .ok_or_else(|| PlaygroundError::Worker("interpreter is not running".to_string()))?;

        let id = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.post_request(&Request { id, kind, source })?;
        worker.clock.begin(timeout);
        let waited = self.await_reply(worker, id).await;
        worker.clock.finish();

        let waited = waited?;
        let stdout = self.read_stdout()?;
        let outcome = match waited {
            Waited::Replied(reply) => reply.into_outcome(),
            Waited::Exited(fault) => {
                *slot = None;
                Err(fault)
            }
            Waited::Overran => {
                if let Some(worker) = slot.take() {
                    worker.clock.close();
                }
                Err(PlaygroundError::Timeout(timeout))
            }
        };
        Ok(RunOutput { stdout, outcome })
    }

    async fn await_reply(&self, worker: &mut Worker, id: u64) -> Result<Waited> {
        let timeout = self.config.timeout;
        let started = Instant::now();
        loop {
            if let Some(reply) = self.take_reply(id)? {
                return Ok(Waited::Replied(reply));
            }
            if started.elapsed() > timeout + OVERRUN_GRACE {
                warn!(?timeout, "interpreter missed its deadline, abandoning it");
                return Ok(Waited::Overran);
            }
            tokio::select! {
                joined = &mut worker.handle => {
                    return Ok(Waited::Exited(exit_fault(joined, timeout)));
                }
                _ = tokio::time::sleep(REPLY_POLL_INTERVAL) => {}
            }
        }
    }

    fn post_request(&self, request: &Request<'_>) -> Result<()> {
        for stale in [REPLY_FILE, STDOUT_FILE] {
            remove_if_present(&self.runtime_path(stale))?;
        }
        let pending = self.runtime_path(PENDING_REQUEST_FILE);
        std::fs::write(&pending, serde_json::to_vec(request)?)?;
        std::fs::rename(&pending, self.runtime_path(REQUEST_FILE))?;
        Ok(())
    }

    fn take_reply(&self, id: u64) -> Result<Option<Reply>> {
        let path = self.runtime_path(REPLY_FILE);
        let body = match std::fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        std::fs::remove_file(&path)?;

        let reply: Reply = serde_json::from_slice(&body)?;
        if reply.id != id {
            debug!(expected = id, received = reply.id, "discarding stale reply");
            return Ok(None);
        }
        Ok(Some(reply))
    }

    fn read_stdout(&self) -> Result<String> {
        match std::fs::read(self.runtime_path(STDOUT_FILE)) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WasmPythonEngine {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.clock.close();
        }
        // One more tick so an idle interpreter notices the close
        self.engine.increment_epoch();
        self.ticker.abort();
    }
}

#[async_trait]
impl PythonEngine for WasmPythonEngine {
    fn set_stdout(&self, sink: OutputSink) {
        *self.stdout.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    async fn prepare(&self, setup: &str) -> Result<()> {
        self.dispatch(RequestKind::Setup, setup).await?.outcome?;
        *self.setup_source() = setup.to_string();
        debug!(bytes = setup.len(), "setup source installed");
        Ok(())
    }

    async fn run_source(&self, source: &str) -> Result<Option<String>> {
        let output = self.dispatch(RequestKind::Run, source).await?;
        if let Some(sink) = self.current_sink() {
            sink.push(output.stdout);
        }
        output.outcome
    }

    async fn install_package(&self, name: &str) -> Result<()> {
        let wheel = self.index.fetch_wheel(name).await?;
        let target = self
            .session
            .path()
            .join(SITE_PACKAGES_DIR)
            .join(&wheel.filename);
        std::fs::write(&target, &wheel.bytes)?;
        info!(package = name, wheel = %wheel.filename, "package installed");
        Ok(())
    }

    async fn write_file(&self, name: &str, content: &str) -> Result<()> {
        let path = self.session.path().join(relative_file_path(name)?);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(())
    }
}

/// Limits applied to one interpreter instance.
#[derive(Debug, Clone, Copy)]
struct SessionLimits {
    max_memory: u64,
    max_fuel: Option<u64>,
    output_capacity: usize,
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn exit_fault(
    joined: std::result::Result<Result<InterpreterExit>, JoinError>,
    timeout: Duration,
) -> PlaygroundError {
    match joined {
        Ok(Ok(exit)) => {
            debug!(?exit, "interpreter stopped");
            exit.into_fault(timeout)
        }
        Ok(Err(err)) => err,
        Err(e) => PlaygroundError::Worker(format!("interpreter task panicked: {}", e)),
    }
}

fn compile_interpreter(engine: &Engine, path: &Path) -> Result<Module> {
    let wasm_bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PlaygroundError::InterpreterNotFound(path.display().to_string())
        } else {
            PlaygroundError::Io(e)
        }
    })?;

    Module::new(engine, &wasm_bytes)
        .map_err(|e| PlaygroundError::ModuleLoad(anyhow::anyhow!("failed to compile module: {}", e)))
}

/// Run the driver until it stops (runs in a blocking task).
fn run_interpreter(
    engine: &Engine,
    module: &Module,
    session_dir: &Path,
    limits: &SessionLimits,
    clock: Arc<RunClock>,
) -> Result<InterpreterExit> {
    let stderr = MemoryOutputPipe::new(limits.output_capacity);

    // Only the session directory is visible; no network, no host environment
    let mut builder = WasiCtxBuilder::new();
    builder
        .args(&["python", "-c", DRIVER])
        .stderr(stderr.clone());
    builder
        .preopened_dir(session_dir, "/", DirPerms::all(), FilePerms::all())
        .map_err(|e| {
            PlaygroundError::RuntimeInit(anyhow::anyhow!("failed to preopen session: {}", e))
        })?;
    let wasi_ctx = builder.build_p1();

    let mut store = Store::new(engine, SessionState::new(limits.max_memory, wasi_ctx));
    install_limits(&mut store, Arc::clone(&clock), limits.max_fuel).map_err(|e| {
        PlaygroundError::RuntimeInit(anyhow::anyhow!("failed to install limits: {}", e))
    })?;

    let mut linker = Linker::new(engine);
    preview1::add_to_linker_sync(&mut linker, |state: &mut SessionState| &mut state.wasi)
        .map_err(|e| PlaygroundError::RuntimeInit(anyhow::anyhow!("failed to link WASI: {}", e)))?;

    let instance = linker.instantiate(&mut store, module).map_err(|e| {
        match store.data().limiter.denial() {
            Some(denial) => PlaygroundError::MemoryLimitExceeded(denial.to_string()),
            None => PlaygroundError::ModuleLoad(anyhow::anyhow!("failed to instantiate: {}", e)),
        }
    })?;

    let start = instance
        .get_typed_func::<(), ()>(&mut store, "_start")
        .map_err(|e| {
            PlaygroundError::ModuleLoad(anyhow::anyhow!("failed to get _start function: {}", e))
        })?;

    let outcome = start.call(&mut store, ());
    let limiter = &store.data().limiter;
    debug!(peak_memory = limiter.peak_memory(), "interpreter finished");
    let stderr = String::from_utf8_lossy(&stderr.contents()).into_owned();

    let exit = match outcome {
        Ok(()) => InterpreterExit::Exited { code: 0, stderr },
        Err(_) if clock.interrupted() => InterpreterExit::Interrupted,
        Err(e) => {
            if let Some(exit) = e.downcast_ref::<I32Exit>() {
                InterpreterExit::Exited {
                    code: exit.0,
                    stderr,
                }
            } else if matches!(e.downcast_ref::<Trap>(), Some(Trap::OutOfFuel)) {
                InterpreterExit::OutOfFuel {
                    budget: limits.max_fuel,
                }
            } else if let Some(denial) = limiter.denial() {
                InterpreterExit::OutOfMemory(denial)
            } else {
                InterpreterExit::Trapped(e.to_string())
            }
        }
    };
    Ok(exit)
}
