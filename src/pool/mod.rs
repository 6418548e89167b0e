//! Evaluators: how a batch of experiment cases gets executed.
//!
//! Every case is an independent, side-effect-free function of its inputs
//! and seed, so the parallel evaluator needs no coordination beyond
//! collecting results. Sequential and parallel execution produce identical
//! outcomes because each case carries its own seed.

use crate::experiment::ExperimentCase;
use crate::lake::LakeModel;
use crate::models::{LimnoError, Outcomes, Result};
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// Outcome of one case, in batch order.
#[derive(Debug)]
pub struct CaseResult {
    /// Position of the case in the design
    pub index: usize,

    /// The four outcomes, or the surfaced failure
    pub outcomes: Result<Outcomes>,

    /// Evaluation wall time in milliseconds
    pub eval_time_ms: u64,
}

/// Batch-evaluation seam between the runner and the model.
pub trait Evaluator: Send + Sync {
    /// Evaluate all cases, returning results in input order.
    fn evaluate_batch(&self, model: &LakeModel, cases: &[ExperimentCase]) -> Vec<CaseResult>;
}

fn evaluate_case(model: &LakeModel, case: &ExperimentCase) -> CaseResult {
    let start = Instant::now();
    let outcomes = model.evaluate(&case.scenario, &case.policy, case.seed);
    CaseResult {
        index: case.index,
        outcomes,
        eval_time_ms: start.elapsed().as_millis() as u64,
    }
}

/// In-order, single-threaded evaluation.
pub struct SequentialEvaluator;

impl Evaluator for SequentialEvaluator {
    fn evaluate_batch(&self, model: &LakeModel, cases: &[ExperimentCase]) -> Vec<CaseResult> {
        cases.iter().map(|case| evaluate_case(model, case)).collect()
    }
}

/// Data-parallel evaluation over a rayon thread pool.
pub struct ParallelEvaluator {
    pool: rayon::ThreadPool,
}

impl ParallelEvaluator {
    /// Build a pool with `workers` threads (0 = one per core).
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| LimnoError::Internal(format!("building thread pool: {e}")))?;
        debug!(workers = pool.current_num_threads(), "Parallel evaluator ready");
        Ok(Self { pool })
    }
}

impl Evaluator for ParallelEvaluator {
    fn evaluate_batch(&self, model: &LakeModel, cases: &[ExperimentCase]) -> Vec<CaseResult> {
        self.pool.install(|| {
            cases
                .par_iter()
                .map(|case| evaluate_case(model, case))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::ExperimentDesign;

    #[test]
    fn test_parallel_matches_sequential_bit_for_bit() {
        let mut config = crate::models::Config::default();
        config.model.nsamples = 3;
        config.model.horizon = 30;
        let model = LakeModel::new(config.model);

        let design = ExperimentDesign::sample(4, 2, 77);
        let cases = design.cases();

        let sequential = SequentialEvaluator.evaluate_batch(&model, &cases);
        let parallel = ParallelEvaluator::new(4)
            .unwrap()
            .evaluate_batch(&model, &cases);

        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(&parallel) {
            assert_eq!(s.index, p.index);
            assert_eq!(
                s.outcomes.as_ref().unwrap(),
                p.outcomes.as_ref().unwrap()
            );
        }
    }
}
