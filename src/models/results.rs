//! Result types for limno.
//!
//! One `ExperimentRow` per (scenario, policy) pair, carrying the sampled
//! inputs alongside the four outcomes so the results table is
//! self-describing. `RunStats` summarizes an entire run.

use crate::experiment::Scenario;
use crate::lake::ReleasePolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four scalar outcomes of one model evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcomes {
    /// Peak of the across-replication averaged pollution trajectory.
    /// The name is literal: max of the per-step average, not an average
    /// of per-replication maxima.
    #[serde(rename = "max_P")]
    pub max_p: f64,

    /// Discounted economic benefit of releases, averaged over replications
    pub utility: f64,

    /// Fraction of year-over-year release changes exceeding the inertia
    /// threshold, averaged over replications (in [0, 1])
    pub inertia: f64,

    /// Fraction of time steps with pollution below the critical
    /// threshold, indicator first, then averaged over replications
    /// (in [0, 1])
    pub reliability: f64,
}

/// One row of the results table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRow {
    /// Run this row belongs to
    pub run_id: String,

    /// Index of the scenario within the design
    pub scenario_id: usize,

    /// Index of the policy within the design
    pub policy_id: usize,

    /// Sampled uncertain factors
    pub scenario: Scenario,

    /// Lever assignment
    pub policy: ReleasePolicy,

    /// The four outcomes
    #[serde(flatten)]
    pub outcomes: Outcomes,

    /// Evaluation wall time in milliseconds, if tracked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_time_ms: Option<u64>,

    /// Evaluation timestamp
    pub evaluated_at: DateTime<Utc>,
}

/// Statistics for an experiment run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Scenarios in the design
    pub scenarios: usize,

    /// Policies in the design
    pub policies: usize,

    /// Total scenario-policy pairs
    pub total_cases: usize,

    /// Cases that produced an outcome row
    pub completed: usize,

    /// Cases that failed (numerical instability, invalid inputs)
    pub failed: usize,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Completed cases per second
    pub throughput_per_sec: f64,

    /// Failure rate (0.0 - 1.0)
    pub failure_rate: f64,
}

impl RunStats {
    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        if self.total_cases > 0 {
            self.failure_rate = self.failed as f64 / self.total_cases as f64;
        }
        if self.runtime_secs > 0.0 {
            self.throughput_per_sec = self.completed as f64 / self.runtime_secs;
        }
    }
}
