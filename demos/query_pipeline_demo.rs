//! Query Pipeline Demo Application
//!
//! Runs a handful of questions for a starter-tier user through the pipeline
//! and shows which are served from cache, which are billed, and what happens
//! when the monthly quota runs out.
//!
//! Usage:
//!   cargo run --example query_pipeline_demo
//!
//! Environment variables:
//!   QUERYCACHE_BACKEND    - memory or redis (default: memory)
//!   QUERYCACHE_REDIS_URL  - Redis URL (default: redis://localhost:6379)
//!   QUERYCACHE_TTL_SECS   - Result TTL in seconds (default: 3600)
//!   RUST_LOG              - Log filter (default: querycache=info)

use chrono::{Duration, Utc};
use querycache::{
    CachedQueryResult, Fingerprint, InMemoryUsageLedger, QueryOutcome, QueryPipeline,
    QueryRequest, QueryResultCache, Settings, Tier, UsageRecord, WriteMode,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("querycache=info")),
        )
        .init();

    info!("=== Query Pipeline Demo ===");

    let settings = Settings::from_env()?;
    let store = settings.build_store().await?;
    let cache = QueryResultCache::new(store, settings.cache.clone());
    info!("Cache backend: {}", cache.backend_name());

    let ledger = InMemoryUsageLedger::new();
    let mut record = UsageRecord::for_tier(Tier::Starter, Utc::now() + Duration::days(12));
    record.queries_used = 48;
    ledger.insert("demo-user", record).await;

    let pipeline = QueryPipeline::new(cache, Arc::new(ledger))
        .with_write_mode(WriteMode::Awaited)
        .with_single_flight(true);

    let fingerprint = Fingerprint::mint();
    let prompts = [
        "Show revenue by month",
        "show REVENUE by month.",
        "Top 5 products by units sold",
        "Average order value by region",
        "  show revenue by month!  ",
    ];

    for prompt in prompts {
        let request = QueryRequest::new(
            Some("demo-user".to_string()),
            "sales_csv",
            fingerprint.as_str(),
            prompt,
        );

        let outcome = pipeline
            .run(&request, || async move {
                info!("Analyzing: {}", prompt);
                Ok(CachedQueryResult::new(
                    json!({"type": "bar", "prompt": prompt}),
                    Some(format!("Analysis of '{}'", prompt)),
                ))
            })
            .await?;

        match outcome {
            QueryOutcome::Answered {
                cached: true, ..
            } => {
                info!("✓ {:<35} served from cache (free)", prompt);
            }
            QueryOutcome::Answered { usage, .. } => match usage {
                Some(usage) => info!(
                    "✓ {:<35} billed; {} remaining ({})",
                    prompt, usage.remaining, usage.status
                ),
                None => info!("✓ {:<35} answered", prompt),
            },
            QueryOutcome::LimitReached {
                days_until_reset,
                upgrade_message,
                ..
            } => {
                info!(
                    "✗ {:<35} limit reached; resets in {} days. {}",
                    prompt,
                    days_until_reset,
                    upgrade_message.unwrap_or_default()
                );
            }
        }
    }

    info!("\nCache stats: {}", pipeline.cache().stats());

    Ok(())
}
