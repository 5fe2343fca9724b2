//! Variant Comparison Runner
//!
//! Replays one generated workload on each cache variant, times every phase and
//! validates that all variants agree.
//!
//! # Phases
//!
//! - **Load**: upsert the fixture's shuffled page batches
//! - **Replay**: apply the mutation script, one operation at a time
//! - **Flatten**: produce the final rows
//!
//! Agreement means identical [`Applied`] outcomes for every scripted operation,
//! identical flattened rows, and a clean [`TreeCache::check_invariants`].
//!
//! # Usage Example
//!
//! ```rust
//! use outline_core::config::WorkloadConfig;
//! use outline_core::harness::VariantHarness;
//!
//! let report = VariantHarness::run(&WorkloadConfig::with_seed(7, 500))?;
//! println!("{}", report.render());
//! # Ok::<(), outline_core::harness::HarnessError>(())
//! ```

use crate::cache::{CacheStats, TreeCache};
use crate::config::{CacheVariant, WorkloadConfig};
use crate::harness::metrics::{calculate_delta, MetricsCollector};
use crate::harness::HarnessError;
use crate::models::Row;
use crate::operations::{Applied, Operation};
use crate::workload::{build_script, generate_fixture, Fixture, PageBatch};
use std::time::{Duration, Instant};

/// Metric name for the page loading phase
pub const LOAD_PHASE: &str = "load_pages";

/// Metric name for the flatten phase
pub const FLATTEN_PHASE: &str = "flatten";

/// Runs a generated workload against cache variants and compares the results
#[derive(Debug, Clone)]
pub struct VariantHarness {
    config: WorkloadConfig,
    fixture: Fixture,
    batches: Vec<PageBatch>,
    script: Vec<Operation>,
    variants: Vec<CacheVariant>,
}

/// Outcome of replaying the workload on one variant
#[derive(Debug, Clone)]
pub struct VariantRun {
    pub variant: CacheVariant,
    pub rows: Vec<Row>,
    pub applied: Vec<Applied>,
    pub stats: CacheStats,
    pub load_time: Duration,
    pub replay_time: Duration,
    pub flatten_time: Duration,
}

impl VariantRun {
    /// Scripted operations the cache absorbed as no-ops
    pub fn ignored(&self) -> usize {
        self.applied.iter().filter(|a| a.is_ignored()).count()
    }
}

/// Result of a successful comparison across variants
#[derive(Debug, Clone)]
pub struct HarnessReport {
    pub workload: WorkloadConfig,
    pub fixture_nodes: usize,
    pub page_batches: usize,
    pub operations: usize,
    pub runs: Vec<VariantRun>,
    pub metrics: MetricsCollector,
}

impl HarnessReport {
    /// Rows produced by every variant
    pub fn rows(&self) -> &[Row] {
        self.runs.first().map(|run| run.rows.as_slice()).unwrap_or(&[])
    }

    pub fn run_for(&self, variant: CacheVariant) -> Option<&VariantRun> {
        self.runs.iter().find(|run| run.variant == variant)
    }

    /// Human-readable summary followed by the per-operation metrics
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Variant Harness Report ===\n");
        out.push_str(&format!(
            "Seed: {} | Fixture nodes: {} | Page batches: {} | Operations: {} | Rows: {}\n\n",
            self.workload.seed,
            self.fixture_nodes,
            self.page_batches,
            self.operations,
            self.rows().len()
        ));

        let baseline = self
            .run_for(CacheVariant::Plain)
            .map(|run| run.load_time + run.replay_time + run.flatten_time);

        for run in &self.runs {
            let total = run.load_time + run.replay_time + run.flatten_time;
            let delta = baseline.map_or(0.0, |base| calculate_delta(base, total));
            out.push_str(&format!(
                "{:<12} load {:>9.3}ms  replay {:>9.3}ms  flatten {:>9.3}ms | ignored {:<5} dangling {:<5} evicted {:<6} | Δ {:+.2}%\n",
                run.variant.name(),
                run.load_time.as_secs_f64() * 1000.0,
                run.replay_time.as_secs_f64() * 1000.0,
                run.flatten_time.as_secs_f64() * 1000.0,
                run.ignored(),
                run.stats.dangling_nodes,
                run.stats.evicted_nodes,
                delta
            ));
        }

        out.push('\n');
        out.push_str(&self.metrics.generate_report());
        out
    }
}

impl VariantHarness {
    /// Generate the fixture, page batches and script for `config`
    pub fn new(config: &WorkloadConfig) -> Result<Self, HarnessError> {
        config.validate().map_err(HarnessError::workload)?;

        let fixture = generate_fixture(config);
        let batches = fixture.pages(config.page_size, config.seed);
        let script = build_script(&fixture, config);

        tracing::info!(
            seed = config.seed,
            nodes = fixture.len(),
            batches = batches.len(),
            operations = script.len(),
            "Prepared workload"
        );

        Ok(Self {
            config: config.clone(),
            fixture,
            batches,
            script,
            variants: CacheVariant::all().to_vec(),
        })
    }

    /// Restrict the run to `variants`; the first one is the comparison baseline
    pub fn with_variants(mut self, variants: impl IntoIterator<Item = CacheVariant>) -> Self {
        self.variants = variants.into_iter().collect();
        self
    }

    /// Prepare and execute in one step
    pub fn run(config: &WorkloadConfig) -> Result<HarnessReport, HarnessError> {
        Self::new(config)?.execute()
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn batches(&self) -> &[PageBatch] {
        &self.batches
    }

    pub fn script(&self) -> &[Operation] {
        &self.script
    }

    /// Run every configured variant and validate that they agree
    pub fn execute(&self) -> Result<HarnessReport, HarnessError> {
        let mut metrics = MetricsCollector::new();
        let mut runs = Vec::with_capacity(self.variants.len());

        for variant in &self.variants {
            let run = self.run_variant(*variant, &mut metrics)?;
            tracing::info!(
                variant = %run.variant,
                load_ms = run.load_time.as_millis() as u64,
                replay_ms = run.replay_time.as_millis() as u64,
                flatten_ms = run.flatten_time.as_millis() as u64,
                rows = run.rows.len(),
                "Variant finished"
            );
            runs.push(run);
        }

        if let Some((baseline, rest)) = runs.split_first() {
            for run in rest {
                self.compare(baseline, run)?;
            }
        }

        Ok(HarnessReport {
            workload: self.config.clone(),
            fixture_nodes: self.fixture.len(),
            page_batches: self.batches.len(),
            operations: self.script.len(),
            runs,
            metrics,
        })
    }

    /// Replay the workload on a fresh cache of `variant`
    pub fn run_variant(
        &self,
        variant: CacheVariant,
        metrics: &mut MetricsCollector,
    ) -> Result<VariantRun, HarnessError> {
        let mut cache = TreeCache::new(variant.config())?;

        let started = Instant::now();
        for batch in &self.batches {
            cache.upsert_page(
                batch.parent_id.as_deref(),
                batch.page.nodes.clone(),
                batch.page.info.clone(),
            );
        }
        let load_time = started.elapsed();
        metrics.record(LOAD_PHASE, variant, load_time);

        cache
            .check_invariants()
            .map_err(|violations| HarnessError::InvariantViolation {
                variant,
                violations,
            })?;

        let mut applied = Vec::with_capacity(self.script.len());
        let mut replay_time = Duration::ZERO;
        for (index, op) in self.script.iter().enumerate() {
            let name = op.name();
            let op = op.clone();

            let started = Instant::now();
            let outcome = cache
                .apply(op)
                .map_err(|source| HarnessError::Rejected {
                    variant,
                    index,
                    source,
                })?;
            let elapsed = started.elapsed();

            metrics.record(name, variant, elapsed);
            replay_time += elapsed;
            applied.push(outcome);
        }

        let started = Instant::now();
        let rows = cache.flatten();
        let flatten_time = started.elapsed();
        metrics.record(FLATTEN_PHASE, variant, flatten_time);

        cache
            .check_invariants()
            .map_err(|violations| HarnessError::InvariantViolation {
                variant,
                violations,
            })?;

        Ok(VariantRun {
            variant,
            rows,
            applied,
            stats: cache.stats(),
            load_time,
            replay_time,
            flatten_time,
        })
    }

    fn compare(&self, baseline: &VariantRun, run: &VariantRun) -> Result<(), HarnessError> {
        let applied = baseline.applied.iter().zip(&run.applied).enumerate();
        for (index, (expected, actual)) in applied {
            if expected != actual {
                let name = self.script.get(index).map_or("unknown", Operation::name);
                return Err(HarnessError::divergence(
                    run.variant,
                    format!("operation #{} ({})", index, name),
                    format!(
                        "{} returned {:?}, {} returned {:?}",
                        baseline.variant, expected, run.variant, actual
                    ),
                ));
            }
        }

        if baseline.rows != run.rows {
            let index = baseline
                .rows
                .iter()
                .zip(&run.rows)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| baseline.rows.len().min(run.rows.len()));
            return Err(HarnessError::divergence(
                run.variant,
                FLATTEN_PHASE,
                format!(
                    "row {}: {} has {:?}, {} has {:?} ({} vs {} rows)",
                    index,
                    baseline.variant,
                    baseline.rows.get(index),
                    run.variant,
                    run.rows.get(index),
                    baseline.rows.len(),
                    run.rows.len()
                ),
            ));
        }

        Ok(())
    }
}
