//! Performance Metrics Collection for Variant Comparison
//!
//! Records execution times per `(operation, variant)` and summarizes them.
//!
//! # Features
//!
//! - **Operation Tracking**: Record execution times for cache operations per variant
//! - **Statistical Analysis**: Averages, percentiles and deltas against the plain variant
//! - **CSV Export**: Export raw samples for external analysis
//! - **Report Generation**: Formatted per-operation comparison tables
//!
//! # Usage
//!
//! ```rust
//! use outline_core::config::CacheVariant;
//! use outline_core::harness::MetricsCollector;
//! use std::time::Duration;
//!
//! let mut collector = MetricsCollector::new();
//!
//! collector.record("flatten", CacheVariant::Plain, Duration::from_micros(900));
//! collector.record("flatten", CacheVariant::DepthCache, Duration::from_micros(700));
//!
//! println!("{}", collector.generate_report());
//! ```

use crate::config::CacheVariant;
use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Metrics collector for per-variant timing data
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: Vec<OperationMetric>,
}

/// Single timing sample
#[derive(Debug, Clone)]
pub struct OperationMetric {
    /// Name of the operation (e.g., "insert", "flatten")
    pub operation: String,
    /// Variant the sample was taken on
    pub variant: CacheVariant,
    /// Execution duration
    pub duration: Duration,
    /// Timestamp when the metric was recorded
    pub timestamp: SystemTime,
}

/// Aggregated statistics for one operation on one variant
#[derive(Debug, Clone)]
pub struct MetricsStats {
    pub operation: String,
    pub variant: CacheVariant,
    /// Number of samples
    pub count: usize,
    pub total: Duration,
    pub avg: Duration,
    /// p50 (median)
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Vec::new(),
        }
    }

    /// Record one timing sample
    pub fn record(&mut self, operation: &str, variant: CacheVariant, duration: Duration) {
        self.metrics.push(OperationMetric {
            operation: operation.to_string(),
            variant,
            duration,
            timestamp: SystemTime::now(),
        });
    }

    /// Get all recorded metrics
    pub fn metrics(&self) -> &[OperationMetric] {
        &self.metrics
    }

    /// Recorded operation names, sorted and deduplicated
    pub fn operations(&self) -> Vec<String> {
        let mut operations: Vec<String> =
            self.metrics.iter().map(|m| m.operation.clone()).collect();
        operations.sort();
        operations.dedup();
        operations
    }

    /// Calculate statistics for `operation` on `variant`
    ///
    /// Returns None if no samples exist for the pair
    pub fn stats_for(&self, operation: &str, variant: CacheVariant) -> Option<MetricsStats> {
        let mut durations: Vec<Duration> = self
            .metrics
            .iter()
            .filter(|m| m.operation == operation && m.variant == variant)
            .map(|m| m.duration)
            .collect();

        if durations.is_empty() {
            return None;
        }

        let count = durations.len();
        let total: Duration = durations.iter().sum();
        let avg = Duration::from_nanos((total.as_nanos() / count as u128) as u64);

        durations.sort();

        Some(MetricsStats {
            operation: operation.to_string(),
            variant,
            count,
            total,
            avg,
            p50: percentile(&durations, 50.0),
            p95: percentile(&durations, 95.0),
            p99: percentile(&durations, 99.0),
        })
    }

    /// Total recorded time for `variant` across all operations
    pub fn total_for(&self, variant: CacheVariant) -> Duration {
        self.metrics
            .iter()
            .filter(|m| m.variant == variant)
            .map(|m| m.duration)
            .sum()
    }

    /// Generate a formatted performance report
    ///
    /// Deltas are relative to the plain variant when it has samples.
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Cache Variant Performance Report ===\n");
        report.push_str(&format!(
            "Total samples recorded: {}\n\n",
            self.metrics.len()
        ));

        for operation in self.operations() {
            report.push_str(&format!("Operation: {}\n", operation));
            let baseline = self.stats_for(&operation, CacheVariant::Plain);

            for variant in CacheVariant::all() {
                let Some(stats) = self.stats_for(&operation, variant) else {
                    continue;
                };
                let delta = baseline
                    .as_ref()
                    .map(|base| calculate_delta(base.avg, stats.avg))
                    .unwrap_or(0.0);
                report.push_str(&format!(
                    "  {:<12} n={:<6} avg {:>9.3}ms  p50 {:>9.3}ms  p95 {:>9.3}ms  p99 {:>9.3}ms | Δ {:+.2}%\n",
                    variant.name(),
                    stats.count,
                    millis(stats.avg),
                    millis(stats.p50),
                    millis(stats.p95),
                    millis(stats.p99),
                    delta
                ));
            }
            report.push('\n');
        }

        if !self.metrics.is_empty() {
            report.push_str("=== Overall Summary ===\n");
            let baseline = self.total_for(CacheVariant::Plain);
            for variant in CacheVariant::all() {
                let total = self.total_for(variant);
                if total.is_zero() {
                    continue;
                }
                report.push_str(&format!(
                    "  {:<12} total {:>10.3}ms | Δ {:+.2}%\n",
                    variant.name(),
                    millis(total),
                    calculate_delta(baseline, total)
                ));
            }
        }

        report
    }

    /// Export metrics to a CSV file
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(file, "timestamp,operation,variant,duration_ns")?;

        for metric in &self.metrics {
            let timestamp = metric
                .timestamp
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();

            writeln!(
                file,
                "{},{},{},{}",
                timestamp,
                metric.operation,
                metric.variant.name(),
                metric.duration.as_nanos()
            )?;
        }

        file.flush()?;
        Ok(())
    }

    /// Clear all recorded metrics
    pub fn clear(&mut self) {
        self.metrics.clear();
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Calculate percentile from sorted durations
fn percentile(sorted_durations: &[Duration], percentile: f64) -> Duration {
    if sorted_durations.is_empty() {
        return Duration::from_nanos(0);
    }

    let index = ((percentile / 100.0) * (sorted_durations.len() as f64 - 1.0)).round() as usize;
    sorted_durations[index.min(sorted_durations.len() - 1)]
}

/// Calculate performance delta percentage
///
/// Positive value means `candidate` is slower than `baseline`
///
/// # Formula
///
/// `delta = ((candidate - baseline) / baseline) * 100`
pub(crate) fn calculate_delta(baseline: Duration, candidate: Duration) -> f64 {
    if baseline.as_nanos() == 0 {
        return 0.0;
    }

    let base = baseline.as_nanos() as f64;
    let cand = candidate.as_nanos() as f64;

    ((cand - base) / base) * 100.0
}
