//! Example of a Python lesson playground.
//!
//! This example shows how to:
//! - Configure the interpreter limits
//! - Run setup code once before the learner's code
//! - Install a pure-Python package from PyPI
//! - Read the render model a page would draw
//!
//! Run with: RUST_LOG=info cargo run --example python_lesson
//!
//! Note: Requires rustpython.wasm to be present in assets/

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wasm_code_playground_rs::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Python Lesson Example ===\n");

    let engine_config = EngineConfig::builder()
        .timeout(Duration::from_secs(10))
        .max_memory(64 * 1024 * 1024)
        .interpreter_path("assets/rustpython.wasm")
        .build();
    let factory = Arc::new(DefaultEngineFactory::new(engine_config));

    let config = PlaygroundConfig::builder(Language::Python)
        .title("Day 1: Functions")
        .description("Define a helper and call it.")
        .setup_source("def greet(name):\n    return f'Hello, {name}!'")
        .initial_source("print(greet('World'))\n[n * n for n in range(5)]")
        .expected_output("Hello, World!")
        .package_install(true)
        .build();
    let playground = Playground::new(config, factory);

    // Example 1: Engine acquisition
    println!("--- Test 1: Mount ---");
    playground.mount().await;
    println!("Status: {:?}", playground.engine_status());
    println!("{}", playground.output());
    if playground.engine_status() != EngineStatus::Ready {
        return Ok(());
    }

    // Example 2: Output plus trailing expression
    println!("--- Test 2: Run ---");
    playground.run().await;
    println!("{}\n", playground.output());

    // Example 3: Exceptions
    println!("--- Test 3: Exception ---");
    playground.edit("print('about to fail')\n1 / 0");
    playground.run().await;
    println!("{}\n", playground.output());

    // Example 4: Package installation
    println!("--- Test 4: Install a Package ---");
    playground.set_package_input("six");
    playground.install_package().await;
    println!("{}", playground.output());
    playground.edit("import six\nsix.__version__");
    playground.run().await;
    println!("{}\n", playground.output());

    // Example 5: The render model
    println!("--- Test 5: View ---");
    playground.reset();
    let view = playground.view();
    println!("Title: {}", view.title);
    println!("Run button: {} (enabled: {})", view.run_label, view.run_enabled);
    if let Some(installer) = &view.installer {
        println!("Installed: {:?}", installer.installed);
    }
    println!("Output panel: {}", view.output);

    println!("\n=== All tests completed ===");
    Ok(())
}
