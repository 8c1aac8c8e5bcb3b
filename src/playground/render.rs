//! Text shown in the output panel.

use crate::engine::{Language, ResultSet};
use crate::error::PlaygroundError;

/// Width of the rule around SQL column headers.
pub const RULE_WIDTH: usize = 60;

/// Shown when the output log is empty.
pub const OUTPUT_PLACEHOLDER: &str = "Click \"Run Code\" to see output here...";

/// Python run that printed nothing and returned nothing.
pub const PYTHON_NO_OUTPUT: &str = "✅ Code executed successfully (no output)";

/// SQL batch that produced no text.
pub const SQL_SUCCESS: &str = "✅ SQL executed successfully";

/// Hint appended to the Python ready notice when installs are enabled.
pub const PACKAGE_HINT: &str = "💡 Use the package installer to add Flask, requests, etc.\n";

/// Install requested with a blank package name.
pub const PACKAGE_NAME_REQUIRED: &str = "⚠️ Please enter a package name\n";

/// Install requested on a playground without the installer.
pub const PACKAGE_INSTALL_DISABLED: &str =
    "⚠️ Package installation is not enabled for this playground\n";

/// Notice written once the engine is ready.
pub fn ready(language: Language, package_install: bool) -> String {
    match language {
        Language::Python if package_install => {
            format!("✅ Python environment ready! You can start coding.\n{}", PACKAGE_HINT)
        }
        Language::Python => "✅ Python environment ready! You can start coding.\n".to_string(),
        Language::Sql => "✅ SQLite database ready! You can start querying.\n".to_string(),
    }
}

/// Diagnostic line appended when engine acquisition fails.
pub fn load_failed(language: Language, err: &PlaygroundError) -> String {
    format!(
        "❌ Error loading {}: {}\n",
        language.engine_name(),
        err.fault_message()
    )
}

/// Notice for requests made before the engine is ready.
pub fn still_loading(language: Language) -> String {
    format!(
        "⏳ {} is still loading, please wait...\n",
        language.engine_name()
    )
}

/// Notice for requests made after the engine failed to load.
pub fn not_ready(language: Language) -> String {
    format!(
        "⚠️ {} is not available; reopen the lesson to try again.\n",
        language.engine_name()
    )
}

/// Interim log content while a run is in flight.
pub fn running(language: Language) -> &'static str {
    match language {
        Language::Python => "🔄 Running Python code...\n",
        Language::Sql => "🔄 Executing SQL...\n",
    }
}

/// Log of a Python run that completed.
pub fn python_success(captured: &str, value: Option<&str>) -> String {
    let mut text = captured.to_string();
    if let Some(value) = value {
        text.push_str(&format!("\n▶ Result: {}", value));
    }
    if text.is_empty() {
        PYTHON_NO_OUTPUT.to_string()
    } else {
        text
    }
}

/// Log of a Python run that raised; output captured before the fault is kept.
pub fn python_failure(captured: &str, err: &PlaygroundError) -> String {
    format!("{}❌ Error:\n{}", captured, err.fault_message())
}

/// Log of a batch that failed outside any single statement.
pub fn batch_failure(err: &PlaygroundError) -> String {
    format!("❌ Error:\n{}", err.fault_message())
}

/// Block rendered for one SQL result set.
pub fn result_set(statement: usize, set: &ResultSet) -> String {
    let rule = "─".repeat(RULE_WIDTH);
    let mut text = format!("\n📊 Query {} Results:\n", statement);
    text.push_str(&rule);
    text.push('\n');
    text.push_str(&set.columns.join(" | "));
    text.push('\n');
    text.push_str(&rule);
    text.push('\n');

    if set.rows.is_empty() {
        text.push_str("(No rows returned)\n");
    } else {
        for row in &set.rows {
            text.push_str(&row.join(" | "));
            text.push('\n');
        }
    }

    text.push_str(&format!("\n✅ {} row(s) returned\n", set.rows.len()));
    text
}

/// Line rendered for a statement without result sets.
pub fn statement_executed(statement: usize) -> String {
    format!("\n✅ Statement {} executed successfully\n", statement)
}

/// Block rendered for a statement that failed.
pub fn statement_failed(statement: usize, err: &PlaygroundError) -> String {
    format!(
        "\n❌ Error in statement {}:\n{}\n",
        statement,
        err.fault_message()
    )
}

/// Package install progress line.
pub fn installing(package: &str) -> String {
    format!("📦 Installing {}...\n", package)
}

/// Package install success line.
pub fn installed(package: &str) -> String {
    format!("✅ Successfully installed {}\n", package)
}

/// Package install failure line.
pub fn install_failed(package: &str, err: &PlaygroundError) -> String {
    format!("❌ Error installing {}: {}\n", package, err.fault_message())
}

/// Split a SQL batch on `;`, dropping fragments that are blank after trimming.
///
/// Separators inside string literals are not recognised.
pub fn split_statements(source: &str) -> Vec<&str> {
    source
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .collect()
}
