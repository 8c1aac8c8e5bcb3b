//! Example of a multi-file Python playground.
//!
//! This example shows how to:
//! - Create and switch between virtual files
//! - Import one virtual file from another
//!
//! Run with: cargo run --example file_explorer
//!
//! Note: Requires rustpython.wasm to be present in assets/

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wasm_code_playground_rs::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== File Explorer Example ===\n");

    let config = PlaygroundConfig::builder(Language::Python)
        .title("Day 6: Project Layout")
        .initial_source("from models import User\nUser('ada').greeting()")
        .file_system(true)
        .build();
    let playground = Playground::new(config, Arc::new(DefaultEngineFactory::default()));

    playground.create_file("models.py")?;
    playground.edit(
        "class User:\n    def __init__(self, name):\n        self.name = name\n\n    def greeting(self):\n        return 'hi ' + self.name\n",
    );
    playground.switch_file("app.py")?;

    for entry in playground.view().explorer.unwrap_or_default() {
        let marker = if entry.active { "*" } else { " " };
        println!("{} {} {}", marker, entry.icon, entry.name);
    }
    println!();

    playground.mount().await;
    playground.run().await;
    println!("{}", playground.output());

    println!("\n=== All tests completed ===");
    Ok(())
}
