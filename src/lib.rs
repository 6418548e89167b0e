//! limno - Exploratory modelling of the shallow-lake pollution problem.
//!
//! ## Architecture
//!
//! limno has two halves:
//! - **Lake model**: a time-stepped pollution recurrence with log-normal
//!   natural inflow, reduced over Monte Carlo replications to four scalar
//!   outcomes (`max_P`, `utility`, `inertia`, `reliability`)
//! - **Experiment harness**: declared uncertainty/lever spaces, sampled
//!   scenario × policy designs, sequential or parallel evaluation, and a
//!   JSONL results table
//!
//! ## Determinism
//!
//! A design is a pure function of its base seed, and every case derives
//! its own replication seed, so re-running a seed reproduces the results
//! table exactly regardless of worker count.

pub mod experiment;
pub mod lake;
pub mod models;
pub mod pool;

// Re-exports for convenience
pub use experiment::{ExperimentCase, ExperimentDesign, ExperimentRunner, RealParameter, Scenario};
pub use lake::{critical_threshold, LakeModel, ReleasePolicy, Replication};
pub use models::{Config, LimnoError, Outcomes, Result, RunStats};
pub use pool::{Evaluator, ParallelEvaluator, SequentialEvaluator};
