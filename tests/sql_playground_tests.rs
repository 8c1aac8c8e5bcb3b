//! SQL playgrounds against the embedded SQLite engine.

mod common;

use std::sync::Arc;

use common::{BrokenSql, RecordingSql, ScriptedFactory};
use wasm_code_playground_rs::prelude::*;
use wasm_code_playground_rs::SqliteEngine;

async fn recorded(config: PlaygroundConfig) -> (Playground, Arc<RecordingSql<SqliteEngine>>) {
    let engine = Arc::new(RecordingSql::new(
        SqliteEngine::open(":memory:").await.unwrap(),
    ));
    let factory = ScriptedFactory::ready(EngineHandle::Sql(engine.clone()));
    let playground = Playground::new(config, Arc::new(factory));
    playground.mount().await;
    (playground, engine)
}

fn sql(source: &str) -> PlaygroundConfig {
    PlaygroundConfig::builder(Language::Sql)
        .initial_source(source)
        .build()
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{:?} not found in {:?}", needle, haystack))
}

#[tokio::test]
async fn test_blank_fragments_are_not_executed() {
    let (playground, engine) = recorded(sql("SELECT 1; ; SELECT 2;;")).await;

    playground.run().await;
    assert_eq!(engine.statements(), vec!["SELECT 1", "SELECT 2"]);

    let output = playground.output();
    assert!(output.contains("📊 Query 1 Results:"));
    assert!(output.contains("📊 Query 2 Results:"));
}

#[tokio::test]
async fn test_single_row_rendering() {
    let (playground, _engine) = recorded(sql("SELECT 1 AS a")).await;

    playground.run().await;
    let rule = "─".repeat(60);
    assert_eq!(
        playground.output(),
        format!("\n📊 Query 1 Results:\n{rule}\na\n{rule}\n1\n\n✅ 1 row(s) returned\n")
    );
}

#[tokio::test]
async fn test_empty_select_still_shows_columns() {
    let (playground, _engine) =
        recorded(sql("CREATE TABLE t (id INTEGER, name TEXT); SELECT * FROM t;")).await;

    playground.run().await;
    let output = playground.output();
    assert!(output.contains("✅ Statement 1 executed successfully"));
    assert!(output.contains("\nid | name\n"));
    assert!(output.contains("(No rows returned)"));
    assert!(output.contains("✅ 0 row(s) returned"));
}

#[tokio::test]
async fn test_faulting_statement_does_not_stop_batch() {
    let (playground, engine) = recorded(sql(
        "CREATE TABLE t (x INTEGER); SELECT * FROM missing; INSERT INTO t VALUES (1)",
    ))
    .await;

    playground.run().await;
    assert_eq!(engine.statements().len(), 3);

    let output = playground.output();
    let first = position(&output, "✅ Statement 1 executed successfully");
    let second = position(&output, "❌ Error in statement 2:\n");
    let third = position(&output, "✅ Statement 3 executed successfully");
    assert!(first < second && second < third);
    assert!(output.contains("no such table: missing"));
}

#[tokio::test]
async fn test_state_persists_across_runs() {
    let (playground, _engine) = recorded(sql("CREATE TABLE t (x INTEGER)")).await;

    playground.run().await;
    playground.edit("INSERT INTO t VALUES (7); SELECT x FROM t;");
    playground.run().await;

    let output = playground.output();
    assert!(output.contains("\n7\n"));
    assert!(output.starts_with("\n✅ Statement 1 executed successfully\n"));
}

#[tokio::test]
async fn test_only_separators_reports_success() {
    let (playground, engine) = recorded(sql(" ;\n; ")).await;

    playground.run().await;
    assert!(engine.statements().is_empty());
    assert_eq!(playground.output(), "✅ SQL executed successfully");
}

#[tokio::test]
async fn test_trailing_comment_is_a_successful_statement() {
    let (playground, engine) = recorded(sql("SELECT 1 AS a; -- done")).await;

    playground.run().await;
    assert_eq!(engine.statements(), vec!["SELECT 1 AS a", "-- done"]);

    let output = playground.output();
    assert!(output.contains("📊 Query 1 Results:"));
    assert!(output.contains("✅ Statement 2 executed successfully"));
    assert!(!output.contains("❌"));
}

#[tokio::test]
async fn test_comment_only_source_succeeds() {
    let (playground, _engine) = recorded(sql("-- write your query here")).await;

    playground.run().await;
    let output = playground.output();
    assert!(output.contains("✅ Statement 1 executed successfully"));
    assert!(!output.contains("❌"));
}

#[tokio::test]
async fn test_setup_script_runs_before_ready() {
    let config = PlaygroundConfig::builder(Language::Sql)
        .setup_source(
            "CREATE TABLE users (id INTEGER, name TEXT);
             INSERT INTO users VALUES (1, 'Ada');",
        )
        .initial_source("SELECT name FROM users")
        .build();
    let (playground, engine) = recorded(config).await;

    assert_eq!(
        playground.output(),
        "✅ SQLite database ready! You can start querying.\n"
    );

    playground.run().await;
    assert!(playground.output().contains("\nAda\n"));
    assert_eq!(engine.statements(), vec!["SELECT name FROM users"]);
}

#[tokio::test]
async fn test_setup_fault_fails_acquisition() {
    let config = PlaygroundConfig::builder(Language::Sql)
        .setup_source("CREATE TABL users (id INTEGER);")
        .build();
    let (playground, _engine) = recorded(config).await;

    assert_eq!(playground.engine_status(), EngineStatus::Failed);
    assert!(playground.output().starts_with("❌ Error loading SQLite: "));
}

#[tokio::test]
async fn test_batch_fault_replaces_log() {
    let factory = ScriptedFactory::ready(EngineHandle::Sql(Arc::new(BrokenSql)));
    let playground = Playground::new(sql("SELECT 1; SELECT 2"), Arc::new(factory));
    playground.mount().await;

    playground.run().await;
    assert_eq!(
        playground.output(),
        "❌ Error:\nengine worker failed: connection lost"
    );
    assert!(!playground.is_running());
}

#[tokio::test]
async fn test_package_install_unavailable_for_sql() {
    let config = PlaygroundConfig::builder(Language::Sql)
        .package_install(true)
        .build();
    let (playground, _engine) = recorded(config).await;

    playground.set_package_input("six");
    playground.install_package().await;
    assert!(playground.output().contains("not enabled"));
    assert!(playground.installed_packages().is_empty());
}

#[tokio::test]
async fn test_default_factory_gives_each_playground_its_own_database() {
    let factory: Arc<dyn EngineFactory> = Arc::new(DefaultEngineFactory::default());

    let first = Playground::new(
        sql("CREATE TABLE only_here (x INTEGER)"),
        Arc::clone(&factory),
    );
    let second = Playground::new(sql("SELECT * FROM only_here"), factory);
    first.mount().await;
    second.mount().await;

    first.run().await;
    second.run().await;

    assert!(first.output().contains("✅ Statement 1 executed successfully"));
    assert!(second.output().contains("no such table: only_here"));
}
