//! Render model of a playground widget.
//!
//! A presentation layer draws these structs; they carry every label and
//! enabled flag so that the drawing code holds no rules of its own.

use crate::engine::Language;
use crate::playground::controller::{EngineStatus, Playground};
use crate::playground::files::FileKind;
use crate::playground::render::OUTPUT_PLACEHOLDER;

/// Everything needed to draw one playground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaygroundView {
    /// Heading.
    pub title: String,
    /// Prose under the heading, if any.
    pub description: Option<String>,
    /// Label of the run button.
    pub run_label: &'static str,
    /// Whether the run button accepts clicks.
    pub run_enabled: bool,
    /// Package installer section, when shown.
    pub installer: Option<InstallerView>,
    /// File explorer entries, when the file system is enabled.
    pub explorer: Option<Vec<ExplorerEntry>>,
    /// Name shown on the editor tab, when the file system is enabled.
    pub active_tab: Option<String>,
    /// Syntax mode of the editor.
    pub editor_language: Language,
    /// Height hint of the editor.
    pub editor_height: String,
    /// Editor content.
    pub source: String,
    /// Output panel text (the placeholder when the log is empty).
    pub output: String,
    /// Reference output, if the lesson provides one.
    pub expected_output: Option<String>,
}

/// The package installer row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerView {
    /// Content of the package name field.
    pub input: String,
    /// Whether the name field accepts edits.
    pub input_enabled: bool,
    /// Label of the install button.
    pub install_label: &'static str,
    /// Whether the install button accepts clicks.
    pub install_enabled: bool,
    /// Installed packages as badges.
    pub installed: Vec<String>,
}

/// One row of the file explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerEntry {
    /// Icon for the entry kind.
    pub icon: &'static str,
    /// File name.
    pub name: String,
    /// Whether this is the active file.
    pub active: bool,
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

impl Playground {
    /// Snapshot the widget for drawing.
    pub fn view(&self) -> PlaygroundView {
        let config = self.config();
        self.with_session(|session| {
            let ready = session.engine.status() == EngineStatus::Ready;

            let installer = (config.package_install_enabled() && ready).then(|| InstallerView {
                input: session.package_input.clone(),
                input_enabled: !session.installing,
                install_label: if session.installing {
                    "⏳ Installing..."
                } else {
                    "+ Install"
                },
                install_enabled: !session.installing && !session.package_input.trim().is_empty(),
                installed: session.installed.clone(),
            });

            let explorer = session.files.as_ref().map(|files| {
                files
                    .files()
                    .iter()
                    .map(|file| ExplorerEntry {
                        icon: match file.kind {
                            FileKind::File => "📄",
                            FileKind::Folder => "📁",
                        },
                        name: file.name.clone(),
                        active: file.name == files.active(),
                    })
                    .collect()
            });

            PlaygroundView {
                title: config.title.clone(),
                description: non_empty(&config.description),
                run_label: if session.running {
                    "⏳ Running..."
                } else {
                    "▶ Run Code"
                },
                run_enabled: ready && !session.running,
                installer,
                explorer,
                active_tab: session.files.as_ref().map(|files| files.active().to_string()),
                editor_language: config.language,
                editor_height: config.editor_height.clone(),
                source: session.source.clone(),
                output: if session.log.is_empty() {
                    OUTPUT_PLACEHOLDER.to_string()
                } else {
                    session.log.clone()
                },
                expected_output: non_empty(&config.expected_output),
            }
        })
    }
}
