//! Experiment design and execution.
//!
//! Design flow:
//! seed → sampled scenarios × policies → cases → evaluator → JSONL rows
//!
//! A design is the full cartesian pairing of scenarios and policies, built
//! reproducibly from one base seed; each case additionally derives its own
//! replication seed so results do not depend on evaluation order.

use crate::experiment::Scenario;
use crate::lake::{LakeModel, ReleasePolicy};
use crate::models::{Config, ExperimentRow, LimnoError, Result, RunStats};
use crate::pool::Evaluator;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// One (scenario, policy) pair ready for evaluation.
#[derive(Debug, Clone)]
pub struct ExperimentCase {
    /// Position in the design (scenario-major order)
    pub index: usize,
    pub scenario_id: usize,
    pub policy_id: usize,
    pub scenario: Scenario,
    pub policy: ReleasePolicy,
    /// Replication seed for this case
    pub seed: u64,
}

/// The cartesian pairing of sampled scenarios with candidate policies.
#[derive(Debug, Clone)]
pub struct ExperimentDesign {
    pub run_id: String,
    pub base_seed: u64,
    pub scenarios: Vec<Scenario>,
    pub policies: Vec<ReleasePolicy>,
}

impl ExperimentDesign {
    /// Sample a design: `scenarios` draws from the uncertainty space
    /// paired with `policies` draws from the lever space.
    pub fn sample(scenarios: usize, policies: usize, base_seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(base_seed);
        let scenarios = (0..scenarios).map(|_| Scenario::sample(&mut rng)).collect();
        let policies = (0..policies)
            .map(|_| ReleasePolicy::sample_rbf(&mut rng))
            .collect();
        Self {
            run_id: Uuid::new_v4().to_string(),
            base_seed,
            scenarios,
            policies,
        }
    }

    /// Sample scenarios only and pair them with an explicit policy list.
    pub fn with_policies(scenarios: usize, policies: Vec<ReleasePolicy>, base_seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(base_seed);
        let scenarios = (0..scenarios).map(|_| Scenario::sample(&mut rng)).collect();
        Self {
            run_id: Uuid::new_v4().to_string(),
            base_seed,
            scenarios,
            policies,
        }
    }

    /// Total number of scenario-policy pairs.
    pub fn len(&self) -> usize {
        self.scenarios.len() * self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand the design into evaluation cases, scenario-major.
    pub fn cases(&self) -> Vec<ExperimentCase> {
        let mut cases = Vec::with_capacity(self.len());
        for (scenario_id, scenario) in self.scenarios.iter().enumerate() {
            for (policy_id, policy) in self.policies.iter().enumerate() {
                let index = cases.len();
                cases.push(ExperimentCase {
                    index,
                    scenario_id,
                    policy_id,
                    scenario: *scenario,
                    policy: *policy,
                    seed: case_seed(self.base_seed, index as u64),
                });
            }
        }
        cases
    }

    /// Reject any sampled value outside its declared range.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(LimnoError::InvalidInput(
                "design has no scenario-policy pairs".to_string(),
            ));
        }
        for scenario in &self.scenarios {
            scenario.validate()?;
        }
        for policy in &self.policies {
            policy.validate()?;
        }
        Ok(())
    }
}

/// Derive a per-case replication seed from the design's base seed.
///
/// SplitMix64-style mixing keeps case streams decorrelated while staying a
/// pure function of (base, index), so parallel and sequential execution
/// agree bit-for-bit.
fn case_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add((index + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Executes a design through an evaluator and streams the results table.
pub struct ExperimentRunner {
    config: Config,
    model: LakeModel,
}

impl ExperimentRunner {
    pub fn new(config: Config) -> Self {
        let model = LakeModel::new(config.model.clone());
        Self { config, model }
    }

    pub fn model(&self) -> &LakeModel {
        &self.model
    }

    /// Run a design, writing one JSONL row per completed case.
    pub fn run(
        &self,
        design: &ExperimentDesign,
        evaluator: &dyn Evaluator,
        output_path: &Path,
    ) -> Result<RunStats> {
        design.validate()?;

        let start = Instant::now();
        let cases = design.cases();
        let total = cases.len();

        info!(
            run_id = %design.run_id,
            scenarios = design.scenarios.len(),
            policies = design.policies.len(),
            cases = total,
            nsamples = self.config.model.nsamples,
            "Starting experiment run"
        );

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("##-"),
        );

        let output_file =
            File::create(output_path).map_err(|e| LimnoError::io("creating output file", e))?;
        let mut writer = BufWriter::new(output_file);

        let mut stats = RunStats {
            scenarios: design.scenarios.len(),
            policies: design.policies.len(),
            total_cases: total,
            ..Default::default()
        };

        let batch_size = 256;
        for batch in cases.chunks(batch_size) {
            let results = evaluator.evaluate_batch(&self.model, batch);

            for (case, result) in batch.iter().zip(results) {
                match result.outcomes {
                    Ok(outcomes) => {
                        stats.completed += 1;
                        let row = ExperimentRow {
                            run_id: design.run_id.clone(),
                            scenario_id: case.scenario_id,
                            policy_id: case.policy_id,
                            scenario: case.scenario,
                            policy: case.policy,
                            outcomes,
                            eval_time_ms: self
                                .config
                                .output
                                .track_timing
                                .then_some(result.eval_time_ms),
                            evaluated_at: Utc::now(),
                        };
                        let json = serde_json::to_string(&row).map_err(|e| {
                            LimnoError::Internal(format!("Failed to serialize row: {e}"))
                        })?;
                        writeln!(writer, "{json}")
                            .map_err(|e| LimnoError::io("writing output", e))?;
                    }
                    Err(e) => {
                        stats.failed += 1;
                        warn!(
                            scenario_id = case.scenario_id,
                            policy_id = case.policy_id,
                            error = %e,
                            "Case evaluation failed"
                        );
                    }
                }
            }

            writer
                .flush()
                .map_err(|e| LimnoError::io("flushing output", e))?;
            pb.inc(batch.len() as u64);
            pb.set_message(format!(
                "completed: {}, failed: {}",
                stats.completed, stats.failed
            ));
        }

        pb.finish_with_message(format!(
            "Done! {} completed, {} failed",
            stats.completed, stats.failed
        ));

        stats.runtime_secs = start.elapsed().as_secs_f64();
        stats.finalize();

        info!(
            completed = stats.completed,
            failed = stats.failed,
            runtime = format!("{:.1}s", stats.runtime_secs),
            throughput = format!("{:.1}/s", stats.throughput_per_sec),
            "Experiment run complete"
        );

        Ok(stats)
    }
}
