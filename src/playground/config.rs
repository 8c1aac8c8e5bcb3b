//! Per-widget playground configuration with builder pattern.

use serde::{Deserialize, Serialize};

use crate::engine::Language;

/// Title used when a lesson does not name its playground.
pub const DEFAULT_TITLE: &str = "Interactive Code Editor";

/// Editor height used when a lesson does not set one.
pub const DEFAULT_EDITOR_HEIGHT: &str = "400px";

/// Immutable configuration of one mounted playground.
///
/// Lesson pages usually declare playgrounds as data, so the struct also
/// deserializes from camelCase JSON (`initialCode`/`setupCode` are accepted
/// as aliases of `initialSource`/`setupSource`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaygroundConfig {
    /// Which engine the playground drives.
    pub language: Language,
    /// Source shown in the editor at mount and after a reset.
    #[serde(alias = "initialCode")]
    pub initial_source: String,
    /// Source executed once when the engine becomes ready.
    #[serde(alias = "setupCode")]
    pub setup_source: String,
    /// Heading of the widget.
    pub title: String,
    /// Optional prose under the heading.
    pub description: String,
    /// Reference output displayed under the output panel.
    pub expected_output: String,
    /// Show the package installer (Python only).
    pub enable_package_install: bool,
    /// Show the file explorer (Python only).
    pub enable_file_system: bool,
    /// Display hint for the editor height.
    #[serde(alias = "height")]
    pub editor_height: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            language: Language::Python,
            initial_source: String::new(),
            setup_source: String::new(),
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            expected_output: String::new(),
            enable_package_install: false,
            enable_file_system: false,
            editor_height: DEFAULT_EDITOR_HEIGHT.to_string(),
        }
    }
}

impl PlaygroundConfig {
    /// Create a new builder for a playground of the given language.
    pub fn builder(language: Language) -> PlaygroundConfigBuilder {
        PlaygroundConfigBuilder {
            config: PlaygroundConfig {
                language,
                ..PlaygroundConfig::default()
            },
        }
    }

    /// Parse a configuration from lesson JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Whether the package installer is active. Always false for SQL.
    pub fn package_install_enabled(&self) -> bool {
        self.enable_package_install && self.language == Language::Python
    }

    /// Whether the virtual file set is active. Always false for SQL.
    pub fn file_system_enabled(&self) -> bool {
        self.enable_file_system && self.language == Language::Python
    }

    /// Whether a setup source must run before the engine is exposed.
    pub fn has_setup(&self) -> bool {
        !self.setup_source.trim().is_empty()
    }
}

/// Builder for creating PlaygroundConfig instances.
#[derive(Debug, Clone)]
pub struct PlaygroundConfigBuilder {
    config: PlaygroundConfig,
}

impl PlaygroundConfigBuilder {
    /// Set the initial editor source.
    pub fn initial_source(mut self, source: impl Into<String>) -> Self {
        self.config.initial_source = source.into();
        self
    }

    /// Set the setup source executed at engine readiness.
    pub fn setup_source(mut self, source: impl Into<String>) -> Self {
        self.config.setup_source = source.into();
        self
    }

    /// Set the widget title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Set the widget description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    /// Set the display-only expected output.
    pub fn expected_output(mut self, expected: impl Into<String>) -> Self {
        self.config.expected_output = expected.into();
        self
    }

    /// Enable or disable the package installer.
    pub fn package_install(mut self, enabled: bool) -> Self {
        self.config.enable_package_install = enabled;
        self
    }

    /// Enable or disable the virtual file set.
    pub fn file_system(mut self, enabled: bool) -> Self {
        self.config.enable_file_system = enabled;
        self
    }

    /// Set the editor height hint.
    pub fn editor_height(mut self, height: impl Into<String>) -> Self {
        self.config.editor_height = height.into();
        self
    }

    /// Build the PlaygroundConfig.
    pub fn build(self) -> PlaygroundConfig {
        self.config
    }
}
