//! The playground controller: one widget's engine and session state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::engine::{EngineFactory, EngineHandle, Language};
use crate::error::{PlaygroundError, Result};
use crate::playground::config::PlaygroundConfig;
use crate::playground::dispatch;
use crate::playground::files::{FileSet, VirtualFile};
use crate::playground::render;

/// Lifecycle of the engine owned by one playground.
#[derive(Debug, Clone)]
pub enum EngineState {
    /// Nothing requested yet.
    Uninitialized,
    /// Acquisition is in flight.
    Loading,
    /// The engine accepts runs for the rest of the mount.
    Ready(EngineHandle),
    /// Acquisition failed; terminal for this mount.
    Failed(String),
}

impl EngineState {
    /// The state without its payload.
    pub fn status(&self) -> EngineStatus {
        match self {
            EngineState::Uninitialized => EngineStatus::Uninitialized,
            EngineState::Loading => EngineStatus::Loading,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Failed(_) => EngineStatus::Failed,
        }
    }
}

/// Payload-free view of [`EngineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Nothing requested yet.
    Uninitialized,
    /// Acquisition is in flight.
    Loading,
    /// Ready for runs.
    Ready,
    /// Acquisition failed.
    Failed,
}

/// Mutable state of one widget.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) engine: EngineState,
    pub(crate) source: String,
    pub(crate) log: String,
    pub(crate) running: bool,
    pub(crate) installing: bool,
    pub(crate) package_input: String,
    pub(crate) installed: Vec<String>,
    pub(crate) files: Option<FileSet>,
}

impl Session {
    fn new(config: &PlaygroundConfig) -> Self {
        Self {
            engine: EngineState::Uninitialized,
            source: config.initial_source.clone(),
            log: String::new(),
            running: false,
            installing: false,
            package_input: String::new(),
            installed: Vec::new(),
            files: config
                .file_system_enabled()
                .then(|| FileSet::seeded(&config.initial_source)),
        }
    }

    fn set_source(&mut self, source: String) {
        if let Some(files) = self.files.as_mut() {
            files.sync_active(&source);
        }
        self.source = source;
    }
}

/// One mounted code playground.
///
/// All operations take `&self`: state lives behind a mutex that is only held
/// between suspension points, so a shared `Arc<Playground>` can be rendered
/// while a run or install is in flight.
pub struct Playground {
    config: PlaygroundConfig,
    factory: Arc<dyn EngineFactory>,
    session: Mutex<Session>,
}

impl std::fmt::Debug for Playground {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playground")
            .field("config", &self.config)
            .field("session", &*self.session())
            .finish_non_exhaustive()
    }
}

impl Playground {
    /// Create an unmounted playground. The editor shows the initial source immediately.
    pub fn new(config: PlaygroundConfig, factory: Arc<dyn EngineFactory>) -> Self {
        let session = Session::new(&config);
        Self {
            config,
            factory,
            session: Mutex::new(session),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn with_session<R>(&self, read: impl FnOnce(&Session) -> R) -> R {
        read(&self.session())
    }

    /// The configuration this playground was mounted with.
    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    /// Current engine lifecycle status.
    pub fn engine_status(&self) -> EngineStatus {
        self.session().engine.status()
    }

    /// Why acquisition failed, if it did.
    pub fn failure_reason(&self) -> Option<String> {
        match &self.session().engine {
            EngineState::Failed(reason) => Some(reason.clone()),
            EngineState::Uninitialized | EngineState::Loading | EngineState::Ready(_) => None,
        }
    }

    /// Current editor source.
    pub fn source(&self) -> String {
        self.session().source.clone()
    }

    /// Current output log.
    pub fn output(&self) -> String {
        self.session().log.clone()
    }

    /// Whether a run is in flight.
    pub fn is_running(&self) -> bool {
        self.session().running
    }

    /// Whether a package install is in flight.
    pub fn is_installing(&self) -> bool {
        self.session().installing
    }

    /// Packages installed in this engine instance, in install order.
    pub fn installed_packages(&self) -> Vec<String> {
        self.session().installed.clone()
    }

    /// Current content of the package name field.
    pub fn package_input(&self) -> String {
        self.session().package_input.clone()
    }

    /// Virtual files in insertion order; empty unless the file system is enabled.
    pub fn files(&self) -> Vec<VirtualFile> {
        self.session()
            .files
            .as_ref()
            .map(|files| files.files().to_vec())
            .unwrap_or_default()
    }

    /// Name of the active virtual file.
    pub fn active_file(&self) -> Option<String> {
        self.session()
            .files
            .as_ref()
            .map(|files| files.active().to_string())
    }

    /// Acquire the engine. Only the first call does anything.
    pub async fn mount(&self) {
        {
            let mut session = self.session();
            if !matches!(session.engine, EngineState::Uninitialized) {
                debug!(status = ?session.engine.status(), "engine acquisition already requested");
                return;
            }
            session.engine = EngineState::Loading;
        }

        let language = self.config.language;
        info!(%language, "acquiring engine");

        let acquired = self.acquire().await;

        let mut session = self.session();
        match acquired {
            Ok(handle) => {
                info!(%language, "engine ready");
                session.engine = EngineState::Ready(handle);
                session.log = render::ready(language, self.config.package_install_enabled());
            }
            Err(err) => {
                warn!(%language, error = %err, "engine failed to load");
                session.log.push_str(&render::load_failed(language, &err));
                session.engine = EngineState::Failed(err.to_string());
            }
        }
    }

    async fn acquire(&self) -> Result<EngineHandle> {
        let handle = self.factory.load(self.config.language).await?;
        let setup = &self.config.setup_source;

        match (&handle, self.config.language) {
            (EngineHandle::Python(engine), Language::Python) => {
                if self.config.has_setup() {
                    engine.prepare(setup).await?;
                }
            }
            (EngineHandle::Sql(engine), Language::Sql) => {
                if self.config.has_setup() {
                    engine.execute_script(setup).await?;
                }
            }
            (EngineHandle::Python(_), Language::Sql) | (EngineHandle::Sql(_), Language::Python) => {
                return Err(PlaygroundError::EngineLoad(format!(
                    "factory returned a {} engine for a {} playground",
                    handle.language(),
                    self.config.language
                )));
            }
        }

        Ok(handle)
    }

    /// Replace the editor source; in file-system mode the active file follows.
    pub fn edit(&self, source: impl Into<String>) {
        self.session().set_source(source.into());
    }

    /// Replace the package name field.
    pub fn set_package_input(&self, name: impl Into<String>) {
        self.session().package_input = name.into();
    }

    /// Execute the current source and replace the log with its output.
    pub async fn run(&self) {
        let language = self.config.language;
        let (handle, source, files) = {
            let mut guard = self.session();
            let session = &mut *guard;
            if session.running {
                debug!("run ignored while another run is in flight");
                return;
            }
            let handle = match &session.engine {
                EngineState::Ready(handle) => handle.clone(),
                EngineState::Uninitialized | EngineState::Loading => {
                    session.log.push_str(&render::still_loading(language));
                    return;
                }
                EngineState::Failed(_) => {
                    session.log.push_str(&render::not_ready(language));
                    return;
                }
            };

            session.running = true;
            session.log = render::running(language).to_string();
            let files = session
                .files
                .as_ref()
                .map(|files| files.files().to_vec())
                .unwrap_or_default();
            (handle, session.source.clone(), files)
        };

        debug!(%language, bytes = source.len(), "dispatching run");
        let log = match &handle {
            EngineHandle::Python(engine) => dispatch::run_python(engine.as_ref(), &source, &files).await,
            EngineHandle::Sql(engine) => dispatch::run_sql(engine.as_ref(), &source).await,
        };

        let mut session = self.session();
        session.log = log;
        session.running = false;
    }

    /// Install the package named in the package field.
    pub async fn install_package(&self) {
        let (engine, package) = {
            let mut guard = self.session();
            let session = &mut *guard;
            if session.installing {
                debug!("install ignored while another install is in flight");
                return;
            }
            if !self.config.package_install_enabled() {
                session.log = render::PACKAGE_INSTALL_DISABLED.to_string();
                return;
            }

            let package = session.package_input.trim().to_string();
            let engine = match &session.engine {
                EngineState::Ready(EngineHandle::Python(engine)) => Arc::clone(engine),
                EngineState::Ready(EngineHandle::Sql(_)) => {
                    session.log = render::PACKAGE_INSTALL_DISABLED.to_string();
                    return;
                }
                EngineState::Uninitialized | EngineState::Loading => {
                    session.log = render::still_loading(Language::Python);
                    return;
                }
                EngineState::Failed(_) => {
                    session.log = render::not_ready(Language::Python);
                    return;
                }
            };
            if package.is_empty() {
                session.log = render::PACKAGE_NAME_REQUIRED.to_string();
                return;
            }

            session.installing = true;
            session.log = render::installing(&package);
            (engine, package)
        };

        info!(package = %package, "installing package");
        let outcome = engine.install_package(&package).await;

        let mut session = self.session();
        match outcome {
            Ok(()) => {
                session.log.push_str(&render::installed(&package));
                session.installed.push(package);
                session.package_input.clear();
            }
            Err(err) => {
                warn!(package = %package, error = %err, "package install failed");
                session.log.push_str(&render::install_failed(&package, &err));
            }
        }
        session.installing = false;
    }

    /// Add a virtual file and open it in the editor.
    pub fn create_file(&self, name: &str) -> Result<()> {
        let mut guard = self.session();
        let session = &mut *guard;
        let files = session
            .files
            .as_mut()
            .ok_or(PlaygroundError::FeatureDisabled("the file system"))?;

        let content = files.create(name)?.content.clone();
        debug!(file = name.trim(), "file created");
        session.source = content;
        Ok(())
    }

    /// Open an existing virtual file in the editor.
    pub fn switch_file(&self, name: &str) -> Result<()> {
        let mut guard = self.session();
        let session = &mut *guard;
        let files = session
            .files
            .as_mut()
            .ok_or(PlaygroundError::FeatureDisabled("the file system"))?;

        let content = files.switch(name)?.content.clone();
        session.source = content;
        Ok(())
    }

    /// Restore the initial source and clear the log.
    pub fn reset(&self) {
        let mut session = self.session();
        session.set_source(self.config.initial_source.clone());
        session.log.clear();
    }

    /// Clear the log.
    pub fn clear_output(&self) {
        self.session().log.clear();
    }
}
