//! Suite-level metrics aggregation
//!
//! Reduces per-case durations and outcomes into run statistics.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{CaseStatus, TestCaseResult};

/// Response time statistics over one run, in milliseconds
///
/// Percentiles use the nearest-rank method: index `floor(n * p)` into the
/// sorted sample, clamped to the last element.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ResponseTimeStats {
    pub min: u64,
    pub max: u64,
    pub avg: u64,
    pub p95: u64,
    pub p99: u64,
}

impl ResponseTimeStats {
    /// Compute from unsorted duration samples. An empty sample yields zeros.
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let avg = sorted.iter().sum::<u64>() / sorted.len() as u64;

        Self {
            min,
            max,
            avg,
            p95: nearest_rank(&sorted, 0.95),
            p99: nearest_rank(&sorted, 0.99),
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "min={}ms max={}ms avg={}ms p95={}ms p99={}ms",
            self.min, self.max, self.avg, self.p95, self.p99
        )
    }
}

/// Nearest-rank percentile over a sorted sample
fn nearest_rank(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() as f64) * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Best-effort resource usage snapshot. The engine does not sample the OS;
/// all fields report zero unless an adapter supplies real numbers.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// Aggregated metrics for one run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SuiteMetrics {
    pub response_time: ResponseTimeStats,

    /// Percentage of cases that failed or errored, over all case results
    pub error_rate: f64,

    /// Executed cases per second of wall time; 0 when not measurable
    pub throughput: f64,

    pub resource_usage: ResourceUsage,
}

impl SuiteMetrics {
    /// Aggregate one run's case results.
    ///
    /// Duration samples cover executed cases only; skipped cases would drag
    /// the minimum to zero without having measured anything. The error rate
    /// divides by the full result count, matching the summary arithmetic.
    pub fn from_results(results: &[TestCaseResult], wall_time: Duration) -> Self {
        let samples: Vec<u64> = results
            .iter()
            .filter(|r| r.executed())
            .map(|r| r.duration_ms)
            .collect();

        let total = results.len();
        let faulted = results
            .iter()
            .filter(|r| matches!(r.status, CaseStatus::Failed | CaseStatus::Error))
            .count();
        let error_rate = if total == 0 {
            0.0
        } else {
            (faulted as f64 / total as f64) * 100.0
        };

        let wall_secs = wall_time.as_secs_f64();
        let throughput = if wall_secs > 0.0 {
            samples.len() as f64 / wall_secs
        } else {
            0.0
        };

        Self {
            response_time: ResponseTimeStats::from_samples(&samples),
            error_rate,
            throughput,
            resource_usage: ResourceUsage::default(),
        }
    }
}
