//! Scripted engines and factories shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use wasm_code_playground_rs::prelude::*;

/// A Python engine that replays scripted behaviour and records every call.
#[derive(Default)]
pub struct FakePython {
    calls: Mutex<Vec<String>>,
    written: Mutex<Vec<(String, String)>>,
    sink: Mutex<Option<OutputSink>>,
    stdout: Vec<String>,
    result: Option<String>,
    fault: Option<String>,
    timeout: Option<Duration>,
    setup_fault: Option<String>,
    failing_packages: Vec<String>,
    run_gate: Option<Arc<Notify>>,
}

impl FakePython {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn printing(mut self, chunks: &[&str]) -> Self {
        self.stdout = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn returning(mut self, value: &str) -> Self {
        self.result = Some(value.to_string());
        self
    }

    pub fn raising(mut self, message: &str) -> Self {
        self.fault = Some(message.to_string());
        self
    }

    /// Fail every run with a timeout after printing.
    pub fn timing_out(mut self, after: Duration) -> Self {
        self.timeout = Some(after);
        self
    }

    pub fn failing_setup(mut self, message: &str) -> Self {
        self.setup_fault = Some(message.to_string());
        self
    }

    pub fn failing_package(mut self, name: &str) -> Self {
        self.failing_packages.push(name.to_string());
        self
    }

    /// Block `run_source` until the returned handle is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.run_gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn written(&self) -> Vec<(String, String)> {
        self.written.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PythonEngine for FakePython {
    fn set_stdout(&self, sink: OutputSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    async fn prepare(&self, setup: &str) -> Result<()> {
        self.record(format!("prepare:{}", setup));
        match &self.setup_fault {
            Some(message) => Err(PlaygroundError::ExecutionFailed(message.clone())),
            None => Ok(()),
        }
    }

    async fn run_source(&self, source: &str) -> Result<Option<String>> {
        self.record(format!("run:{}", source));
        if let Some(gate) = &self.run_gate {
            gate.notified().await;
        }

        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            for chunk in &self.stdout {
                sink.push(chunk.clone());
            }
        }

        if let Some(after) = self.timeout {
            return Err(PlaygroundError::Timeout(after));
        }
        match &self.fault {
            Some(message) => Err(PlaygroundError::ExecutionFailed(message.clone())),
            None => Ok(self.result.clone()),
        }
    }

    async fn install_package(&self, name: &str) -> Result<()> {
        self.record(format!("install:{}", name));
        if self.failing_packages.iter().any(|p| p == name) {
            return Err(PlaygroundError::PackageInstall {
                package: name.to_string(),
                reason: format!("'{}' has no pure-Python wheel", name),
            });
        }
        Ok(())
    }

    async fn write_file(&self, name: &str, content: &str) -> Result<()> {
        self.record(format!("write:{}", name));
        self.written
            .lock()
            .unwrap()
            .push((name.to_string(), content.to_string()));
        Ok(())
    }
}

/// A SQL engine that fails every statement with a worker error.
pub struct BrokenSql;

#[async_trait]
impl SqlEngine for BrokenSql {
    async fn execute_script(&self, _script: &str) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, _statement: &str) -> Result<Vec<ResultSet>> {
        Err(PlaygroundError::Worker("connection lost".to_string()))
    }
}

/// Wraps a SQL engine and records every statement it receives.
pub struct RecordingSql<E> {
    inner: E,
    statements: Mutex<Vec<String>>,
}

impl<E: SqlEngine> RecordingSql<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl<E: SqlEngine> SqlEngine for RecordingSql<E> {
    async fn execute_script(&self, script: &str) -> Result<()> {
        self.inner.execute_script(script).await
    }

    async fn execute(&self, statement: &str) -> Result<Vec<ResultSet>> {
        self.statements.lock().unwrap().push(statement.to_string());
        self.inner.execute(statement).await
    }
}

/// What a [`ScriptedFactory`] hands out.
pub enum Outcome {
    Ready(EngineHandle),
    Fail(String),
}

/// A factory returning a prepared engine, optionally after a gate opens.
pub struct ScriptedFactory {
    outcome: Mutex<Option<Outcome>>,
    loads: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedFactory {
    pub fn ready(handle: EngineHandle) -> Self {
        Self::with(Outcome::Ready(handle))
    }

    pub fn python(engine: Arc<FakePython>) -> Self {
        Self::ready(EngineHandle::Python(engine))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Outcome::Fail(message.to_string()))
    }

    fn with(outcome: Outcome) -> Self {
        Self {
            outcome: Mutex::new(Some(outcome)),
            loads: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Hold `load` until the returned handle is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineFactory for ScriptedFactory {
    async fn load(&self, _language: Language) -> Result<EngineHandle> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let outcome = self.outcome.lock().unwrap().take();
        match outcome {
            Some(Outcome::Ready(handle)) => Ok(handle),
            Some(Outcome::Fail(message)) => Err(PlaygroundError::EngineLoad(message)),
            None => Err(PlaygroundError::EngineLoad("engine already handed out".to_string())),
        }
    }
}

/// Yield until `playground` reports `status`.
pub async fn wait_for_status(playground: &Playground, status: EngineStatus) {
    while playground.engine_status() != status {
        tokio::task::yield_now().await;
    }
}

/// Yield until a run is in flight.
pub async fn wait_for_running(playground: &Playground) {
    while !playground.is_running() {
        tokio::task::yield_now().await;
    }
}
