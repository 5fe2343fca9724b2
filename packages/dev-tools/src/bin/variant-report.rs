//! Variant comparison report
//!
//! Generates a seeded workload, replays it on all four tree cache variants,
//! verifies they agree and prints the timing report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin variant-report
//!
//! # Bigger tree, different seed, raw samples exported
//! OUTLINE_NODES=50000 OUTLINE_SEED=7 OUTLINE_CSV=metrics.csv cargo run --release --bin variant-report
//! ```
//!
//! # Environment
//!
//! - `OUTLINE_WORKLOAD`: JSON file with a full workload configuration
//! - `OUTLINE_SEED` / `OUTLINE_NODES`: override seed and fixture size
//! - `OUTLINE_CSV`: write every timing sample to this CSV file
//! - `RUST_LOG`: log filter, defaults to `variant_report=info,outline_core=info`

use anyhow::{Context, Result};
use outline_core::config::WorkloadConfig;
use outline_core::harness::VariantHarness;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {} value '{}'", name, raw)),
        Err(_) => Ok(None),
    }
}

fn workload_from_env() -> Result<WorkloadConfig> {
    let mut config = match std::env::var("OUTLINE_WORKLOAD") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read workload file {}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse workload file {}", path))?
        }
        Err(_) => WorkloadConfig::default(),
    };

    if let Some(seed) = env_parse("OUTLINE_SEED")? {
        config.seed = seed;
    }
    if let Some(nodes) = env_parse("OUTLINE_NODES")? {
        config.target_nodes = nodes;
    }
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("variant_report=info,outline_core=info")),
        )
        .init();

    let config = workload_from_env()?;
    tracing::info!(
        seed = config.seed,
        nodes = config.target_nodes,
        page_size = config.page_size,
        "Running variant comparison"
    );

    let report = VariantHarness::run(&config).context("Variant comparison failed")?;
    println!("{}", report.render());

    if let Some(path) = env_parse::<PathBuf>("OUTLINE_CSV")? {
        report.metrics.export_csv(&path)?;
        tracing::info!(path = %path.display(), "Exported metrics");
    }

    Ok(())
}
