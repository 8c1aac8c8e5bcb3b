//! Example of a SQL lesson playground.
//!
//! This example shows how to:
//! - Seed a private database with a setup script
//! - Run a batch where one statement fails without stopping the rest
//! - Share a theme between two playgrounds
//!
//! Run with: RUST_LOG=debug cargo run --example sql_lesson

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wasm_code_playground_rs::prelude::*;
use wasm_code_playground_rs::ThemeChannel;

const SETUP: &str = r#"
CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);
INSERT INTO users (name, email) VALUES ('Ada', 'ada@example.com');
INSERT INTO users (name, email) VALUES ('Grace', 'grace@example.com');
"#;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== SQL Lesson Example ===\n");

    let factory: Arc<dyn EngineFactory> = Arc::new(DefaultEngineFactory::default());
    let theme = ThemeChannel::default();

    // Example 1: Querying seeded data
    println!("--- Test 1: Querying Seeded Data ---");
    let config = PlaygroundConfig::builder(Language::Sql)
        .title("Day 4: Databases")
        .setup_source(SETUP)
        .initial_source("SELECT id, name FROM users ORDER BY id;")
        .build();
    let lesson = Playground::new(config, Arc::clone(&factory));
    lesson.mount().await;
    println!("{}", lesson.output());
    lesson.run().await;
    println!("{}", lesson.output());

    // Example 2: A failing statement in the middle of a batch
    println!("--- Test 2: Per-Statement Errors ---");
    lesson.edit(
        "INSERT INTO users (name) VALUES ('Linus');
         SELECT * FROM orders;
         SELECT COUNT(*) AS total FROM users;",
    );
    lesson.run().await;
    println!("{}", lesson.output());

    // Example 3: Each playground gets its own database
    println!("--- Test 3: Isolated Databases ---");
    let scratch = Playground::new(
        PlaygroundConfig::builder(Language::Sql)
            .initial_source("SELECT * FROM users;")
            .build(),
        factory,
    );
    scratch.mount().await;
    scratch.run().await;
    println!("{}", scratch.output());

    // Example 4: Theme toggled once, observed everywhere
    println!("--- Test 4: Shared Theme ---");
    let mut other_page = theme.subscribe();
    let next = theme.toggle();
    println!("Toggled to {:?} (class: {:?})", next, next.css_class());
    println!("Other page sees {:?}", *other_page.borrow_and_update());

    println!("\n=== All tests completed ===");
    Ok(())
}
