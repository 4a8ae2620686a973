//! Engine Demo
//!
//! Builds queries against a toy in-memory backend, then shows the statement
//! cache, the result cache and the optimizer's view of what ran.
//!
//! Run with `RUST_LOG=debug` to see compiled SQL and cache activity.

use async_trait::async_trait;
use lsc_cache::{CacheConfig, EvictionPolicy};
use lsc_core::{ExecutionBackend, InMemorySchemaRegistry, Record, TableSchema, Value};
use lsc_engine::{Engine, EngineConfig};
use lsc_optimizer::OptimizerConfig;
use lsc_query::prelude::*;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("demo backend does not support this statement")]
struct DemoError;

/// Returns a fixed table for every SELECT
struct DemoBackend {
    users: Vec<Record>,
}

#[async_trait]
impl ExecutionBackend for DemoBackend {
    type Error = DemoError;

    async fn query(&self, sql: &str, _: &[Value], _: &str) -> Result<Vec<Record>, DemoError> {
        tokio::time::sleep(Duration::from_millis(2)).await;
        if sql.contains("COUNT(*)") {
            let n = Value::from(self.users.len() as i64);
            return Ok(vec![Record::from([("count".to_string(), n)])]);
        }
        Ok(self.users.clone())
    }

    async fn update(&self, _: &str, _: &[Value], _: &str) -> Result<u64, DemoError> {
        Ok(1)
    }

    async fn delete(&self, _: &str, _: &[Value], _: &str) -> Result<u64, DemoError> {
        Err(DemoError)
    }
}

fn user(id: i64, name: &str, age: i64) -> Record {
    Record::from([
        ("id".to_string(), Value::from(id)),
        ("name".to_string(), Value::from(name)),
        ("age".to_string(), Value::from(age)),
    ])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Engine Demo ===\n");

    let backend = DemoBackend {
        users: vec![user(1, "Alice", 34), user(2, "Bob", 27), user(3, "Charlie", 41)],
    };
    let schema = InMemorySchemaRegistry::new().with_table(
        TableSchema::new("users", vec!["id".into(), "name".into(), "age".into()])
            .with_index("pk_users", &["id"]),
    );
    let config = EngineConfig::default()
        .with_cache(CacheConfig::new(16, EvictionPolicy::Lfu).with_default_ttl(Duration::from_secs(30)))
        .with_optimizer(
            OptimizerConfig::default()
                .with_slow_query_threshold(Duration::from_millis(1))
                .with_auto_optimize_threshold(3),
        );
    let engine = Engine::with_config(backend, schema, config);

    println!("--- Building queries ---\n");
    let adults = engine
        .query("users")
        .select(["id", "name"])
        .where_greater_than_or_equal("age", 30)
        .or_condition(|c| c.where_like("name", "B%").where_not_null("age"))
        .order_by_desc("age")
        .limit(10);
    let compiled = adults.to_select_sql()?;
    println!("SQL:  {}", compiled.sql);
    println!("Args: {:?}\n", compiled.args);

    for _ in 0..4 {
        adults.get().await?;
    }
    println!("Count: {}", engine.query("users").count().await?);
    if let Some(first) = engine.query("users").order_by_asc("id").first().await? {
        println!("First: {:?}\n", first);
    }

    println!("--- Statement cache ---\n");
    let stats = engine.statement_stats();
    println!("  Cached statements: {}", stats.size);
    println!("  Hits / misses: {} / {}", stats.hits, stats.misses);
    println!("  Hit rate: {:.1}%\n", stats.hit_rate * 100.0);

    println!("--- Result cache ---\n");
    let everyone = engine.query("users");
    engine.get_cached(&everyone).await?;
    engine.get_cached(&everyone).await?;
    let cache = engine.result_cache_stats();
    println!("  Hits / misses: {} / {}\n", cache.hits, cache.misses);

    println!("--- Optimizer ---\n");
    for slow in engine.slow_queries() {
        println!(
            "  {} ran {} times, avg {:?}",
            slow.sql(),
            slow.execution_count(),
            slow.average_time()
        );
    }
    let analysis = engine.analyze("SELECT * FROM users WHERE lower(name) LIKE '%li%' OR age > 30");
    println!("\n  Score: {}", analysis.complexity_score);
    println!("  Estimated: {} ms", analysis.estimated_time_ms);
    println!("  Missing indexes: {:?}", analysis.missing_indexes);
    for suggestion in &analysis.suggestions {
        println!("  - {}", suggestion);
    }

    match engine.query("users").where_equal("id", 2).delete().await {
        Ok(n) => println!("\nDeleted {} rows", n),
        Err(err) => println!("\nDelete failed: {}", err),
    }

    println!("\n=== Demo completed ===");
    Ok(())
}
