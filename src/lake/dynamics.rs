//! The lake pollution dynamics model.
//!
//! A time-stepped recurrence over the pollution stock:
//!
//! ```text
//! X_{t+1} = X_t + a_t + X_t^q / (1 + X_t^q) - b·X_t + ε_t
//! ```
//!
//! with `a_t` the policy release and `ε_t` a log-normal natural inflow.
//! One evaluation runs `nsamples` independent replications of the noise
//! and reduces them to four scalar outcomes. The model is stateless
//! between evaluations and deterministic given the seed, so evaluations
//! can run on any number of workers with no coordination.

use crate::experiment::Scenario;
use crate::lake::ReleasePolicy;
use crate::models::{LimnoError, ModelConfig, Outcomes, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, LogNormal};

/// Threshold on year-over-year release change counted by the inertia
/// outcome.
pub const INERTIA_THRESHOLD: f64 = 0.2;

/// Bracket for the critical-threshold root search.
const XCRIT_BRACKET: (f64, f64) = (0.01, 1.5);
const XCRIT_TOL: f64 = 1e-12;

/// One stochastic realization of the planning horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct Replication {
    /// Pollution stock `X_0 .. X_T` (length horizon + 1)
    pub stock: Vec<f64>,

    /// Releases `a_0 .. a_{T-1}` (length horizon)
    pub releases: Vec<f64>,
}

/// Critical pollution threshold `X_crit` for removal rate `b` and
/// recycling exponent `q`.
///
/// The positive non-trivial fixed point of the deterministic stock update,
/// i.e. the root of `x^q / (1 + x^q) - b·x` past which natural removal no
/// longer counteracts recycling. Found by bisection on [0.01, 1.5]; the
/// bracket holds a sign change for every in-range `b` and `q`.
pub fn critical_threshold(b: f64, q: f64) -> Result<f64> {
    let f = |x: f64| {
        let xq = x.powf(q);
        xq / (1.0 + xq) - b * x
    };

    let (mut lo, mut hi) = XCRIT_BRACKET;
    if f(lo) > 0.0 || f(hi) < 0.0 {
        return Err(LimnoError::CriticalThresholdBracket {
            b,
            q,
            lower: lo,
            upper: hi,
        });
    }

    while hi - lo > XCRIT_TOL {
        let mid = 0.5 * (lo + hi);
        if f(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// The lake model: constants plus the evaluation contract.
///
/// `evaluate` is the single entry point the experiment harness binds to:
/// (uncertainties, levers, constants, seed) → four scalars.
#[derive(Debug, Clone)]
pub struct LakeModel {
    constants: ModelConfig,
}

impl LakeModel {
    pub fn new(constants: ModelConfig) -> Self {
        Self { constants }
    }

    /// Model with the default lake-problem constants.
    pub fn with_defaults() -> Self {
        Self::new(ModelConfig::default())
    }

    pub fn constants(&self) -> &ModelConfig {
        &self.constants
    }

    /// Evaluate one (scenario, policy) pair.
    ///
    /// Runs `nsamples` replications from the given seed and reduces them
    /// with [`outcomes_from_replications`]. Out-of-range inputs are
    /// rejected before any arithmetic; in-range inputs have no expected
    /// failure mode besides surfaced numerical instability.
    ///
    /// [`outcomes_from_replications`]: Self::outcomes_from_replications
    pub fn evaluate(
        &self,
        scenario: &Scenario,
        policy: &ReleasePolicy,
        seed: u64,
    ) -> Result<Outcomes> {
        scenario.validate()?;
        policy.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let inflow = inflow_distribution(scenario)?;

        let mut replications = Vec::with_capacity(self.constants.nsamples);
        for _ in 0..self.constants.nsamples {
            let inflows: Vec<f64> = (0..self.constants.horizon)
                .map(|_| inflow.sample(&mut rng))
                .collect();
            replications.push(self.simulate_replication(scenario, policy, &inflows)?);
        }

        self.outcomes_from_replications(scenario, &replications)
    }

    /// Run the recurrence once for an explicit inflow sequence.
    ///
    /// Exposed so deterministic studies and tests can drive the dynamics
    /// with hand-picked noise (including all zeros).
    pub fn simulate_replication(
        &self,
        scenario: &Scenario,
        policy: &ReleasePolicy,
        inflows: &[f64],
    ) -> Result<Replication> {
        let horizon = inflows.len();
        let mut stock = Vec::with_capacity(horizon + 1);
        let mut releases = Vec::with_capacity(horizon);

        let mut x = 0.0_f64;
        stock.push(x);

        for (t, eps) in inflows.iter().enumerate() {
            let a = policy.release(x);
            let xq = x.powf(scenario.q);
            x = x + a + xq / (1.0 + xq) - scenario.b * x + eps;
            if !x.is_finite() {
                return Err(LimnoError::NonFiniteStock { step: t });
            }
            releases.push(a);
            stock.push(x);
        }

        Ok(Replication { stock, releases })
    }

    /// Reduce replications to the four outcomes.
    ///
    /// `max_P` is the peak of the across-replication averaged trajectory;
    /// `reliability` applies the under-threshold indicator per replication
    /// and averages afterwards. That asymmetry is deliberate and must not
    /// be "simplified" into one aggregation order. `utility` and `inertia`
    /// are likewise averaged per replication, which collapses to the
    /// single-sequence formulas whenever the release sequence does not
    /// vary across replications.
    pub fn outcomes_from_replications(
        &self,
        scenario: &Scenario,
        replications: &[Replication],
    ) -> Result<Outcomes> {
        let Some(first) = replications.first() else {
            return Err(LimnoError::InvalidInput(
                "at least one replication is required".to_string(),
            ));
        };
        let horizon = first.releases.len();
        if horizon < 2 {
            return Err(LimnoError::InvalidInput(
                "horizon must be at least 2 steps".to_string(),
            ));
        }
        for rep in replications {
            if rep.releases.len() != horizon || rep.stock.len() != horizon + 1 {
                return Err(LimnoError::InvalidInput(
                    "replications must share one horizon".to_string(),
                ));
            }
        }

        let x_crit = critical_threshold(scenario.b, scenario.q)?;
        let n = replications.len() as f64;
        let alpha = self.constants.alpha;

        let mut averaged = vec![0.0_f64; horizon + 1];
        let mut utility = 0.0;
        let mut inertia = 0.0;
        let mut reliability = 0.0;

        for rep in replications {
            for (t, x) in rep.stock.iter().enumerate() {
                averaged[t] += x / n;
            }

            let mut discounted = 0.0;
            for (t, a) in rep.releases.iter().enumerate() {
                discounted += alpha * a * scenario.delta.powi(t as i32);
            }
            utility += discounted / n;

            let exceedances = rep
                .releases
                .windows(2)
                .filter(|w| (w[1] - w[0]).abs() > INERTIA_THRESHOLD)
                .count();
            inertia += exceedances as f64 / (horizon as f64 - 1.0) / n;

            let under = rep.stock[..horizon].iter().filter(|&&x| x < x_crit).count();
            reliability += under as f64 / horizon as f64 / n;
        }

        let max_p = averaged.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        Ok(Outcomes {
            max_p,
            utility,
            inertia,
            reliability,
        })
    }
}

/// Log-normal natural-inflow distribution for a scenario.
///
/// `mean` and `stdev` describe the log-normal variable itself, so the
/// underlying normal gets the standard reparameterization
/// `μ = ln(mean² / √(stdev² + mean²))`, `σ = √(ln(1 + stdev²/mean²))`.
fn inflow_distribution(scenario: &Scenario) -> Result<LogNormal<f64>> {
    let mean = scenario.mean;
    let var = scenario.stdev * scenario.stdev;
    let mu = (mean * mean / (var + mean * mean).sqrt()).ln();
    let sigma = (1.0 + var / (mean * mean)).ln().sqrt();
    LogNormal::new(mu, sigma)
        .map_err(|e| LimnoError::Internal(format!("log-normal inflow parameters: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;

    fn small_model(nsamples: usize, horizon: usize) -> LakeModel {
        let mut config = Config::default();
        config.model.nsamples = nsamples;
        config.model.horizon = horizon;
        LakeModel::new(config.model)
    }

    #[test]
    fn test_critical_threshold_boundary_closed_form() {
        // For b = 0.1, q = 2 the fixed-point condition x/(1+x²) = 0.1
        // reduces to x² - 10x + 1 = 0, lower root 5 - sqrt(24).
        let x_crit = critical_threshold(0.1, 2.0).unwrap();
        let expected = 5.0 - 24.0_f64.sqrt();
        assert!(x_crit > 0.0);
        assert!((x_crit - expected).abs() < 1e-9);
    }

    #[test]
    fn test_critical_threshold_is_a_fixed_point() {
        let s = Scenario::reference();
        let x = critical_threshold(s.b, s.q).unwrap();
        let residual = x.powf(s.q) / (1.0 + x.powf(s.q)) - s.b * x;
        assert!(residual.abs() < 1e-9);
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let model = small_model(1, 100);
        let scenario = Scenario::reference();
        let policy = ReleasePolicy::Rbf {
            c1: 0.25,
            c2: -0.5,
            r1: 0.5,
            r2: 1.0,
            w1: 0.7,
        };
        let a = model.evaluate(&scenario, &policy, 99).unwrap();
        let b = model.evaluate(&scenario, &policy, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let model = small_model(1, 100);
        let scenario = Scenario::reference();
        let policy = ReleasePolicy::zero();
        let a = model.evaluate(&scenario, &policy, 1).unwrap();
        let b = model.evaluate(&scenario, &policy, 2).unwrap();
        assert_ne!(a.max_p, b.max_p);
    }

    #[test]
    fn test_zero_release_zero_noise_stays_at_zero() {
        let model = small_model(1, 10);
        let scenario = Scenario::reference();
        let rep = model
            .simulate_replication(&scenario, &ReleasePolicy::zero(), &[0.0; 10])
            .unwrap();
        assert!(rep.stock.iter().all(|&x| x == 0.0));
        assert!(rep.releases.iter().all(|&a| a == 0.0));

        let outcomes = model
            .outcomes_from_replications(&scenario, &[rep])
            .unwrap();
        assert_eq!(outcomes.utility, 0.0);
        assert_eq!(outcomes.inertia, 0.0);
        assert_eq!(outcomes.reliability, 1.0);
        assert_eq!(outcomes.max_p, 0.0);
    }

    #[test]
    fn test_zero_release_follows_unforced_recurrence() {
        let model = small_model(1, 2);
        let scenario = Scenario::reference();
        let inflows = [0.03, 0.01];
        let rep = model
            .simulate_replication(&scenario, &ReleasePolicy::zero(), &inflows)
            .unwrap();

        let x1 = 0.03;
        let x1q = x1 * x1; // q = 2
        let x2 = x1 + x1q / (1.0 + x1q) - scenario.b * x1 + 0.01;
        assert_eq!(rep.stock[0], 0.0);
        assert!((rep.stock[1] - x1).abs() < 1e-15);
        assert!((rep.stock[2] - x2).abs() < 1e-15);
    }

    #[test]
    fn test_hand_computed_outcomes_for_constant_release() {
        let model = small_model(1, 4);
        let scenario = Scenario::reference();
        let rep = Replication {
            stock: vec![0.0, 0.3, 0.6, 1.0, 1.2],
            releases: vec![0.05; 4],
        };
        let outcomes = model
            .outcomes_from_replications(&scenario, &[rep])
            .unwrap();

        // utility = alpha * 0.05 * (1 + d + d² + d³), d = 0.98
        let d = scenario.delta;
        let expected_utility = 0.41 * 0.05 * (1.0 + d + d * d + d * d * d);
        assert!((outcomes.utility - expected_utility).abs() < 1e-12);

        // constant releases never move, so no exceedances
        assert_eq!(outcomes.inertia, 0.0);

        // X_crit for b=0.42, q=2 is ~0.5445; steps 0 and 1 are below it
        assert!((outcomes.reliability - 0.5).abs() < 1e-12);

        assert_eq!(outcomes.max_p, 1.2);
    }

    #[test]
    fn test_max_p_is_max_of_averaged_trajectory() {
        let model = small_model(1, 2);
        let scenario = Scenario::reference();
        let reps = [
            Replication {
                stock: vec![0.0, 1.0, 0.0],
                releases: vec![0.0; 2],
            },
            Replication {
                stock: vec![0.0, 0.0, 2.0],
                releases: vec![0.0; 2],
            },
        ];
        let outcomes = model.outcomes_from_replications(&scenario, &reps).unwrap();
        // averaged trajectory is [0, 0.5, 1.0]; neither the average of
        // per-replication maxima (1.5) nor the global maximum (2.0)
        assert_eq!(outcomes.max_p, 1.0);
    }

    #[test]
    fn test_reliability_averages_after_the_indicator() {
        let model = small_model(1, 2);
        let scenario = Scenario::reference();
        let reps = [
            Replication {
                stock: vec![0.0, 1.0, 1.0],
                releases: vec![0.0; 2],
            },
            Replication {
                stock: vec![0.0, 0.0, 0.0],
                releases: vec![0.0; 2],
            },
        ];
        let outcomes = model.outcomes_from_replications(&scenario, &reps).unwrap();
        // per replication: 1/2 and 2/2. The averaged trajectory
        // [0, 0.5, 0.5] sits entirely below X_crit ≈ 0.545 and would give
        // 1.0 — the wrong aggregation order.
        assert!((outcomes.reliability - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_inertia_counts_threshold_exceedances() {
        let model = small_model(1, 3);
        let scenario = Scenario::reference();
        let rep = Replication {
            stock: vec![0.0; 4],
            releases: vec![0.0, 0.3, 0.3],
        };
        let outcomes = model.outcomes_from_replications(&scenario, &[rep]).unwrap();
        // one change of 0.3 > 0.2 out of two year-over-year changes
        assert!((outcomes.inertia - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_monte_carlo_averaging_converges() {
        let model = small_model(500, 100);
        let scenario = Scenario::reference();
        let policy = ReleasePolicy::zero();
        let a = model.evaluate(&scenario, &policy, 10).unwrap();
        let b = model.evaluate(&scenario, &policy, 20).unwrap();
        assert!((a.max_p - b.max_p).abs() < 2e-3);
        assert_eq!(a.utility, 0.0);
        assert_eq!(b.utility, 0.0);
    }

    #[test]
    fn test_outcome_fractions_stay_in_unit_interval() {
        let model = small_model(5, 100);
        let scenario = Scenario {
            b: 0.1,
            q: 4.5,
            ..Scenario::reference()
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(17);
        for seed in 0..10 {
            let policy = ReleasePolicy::sample_rbf(&mut rng);
            let outcomes = model.evaluate(&scenario, &policy, seed).unwrap();
            assert!((0.0..=1.0).contains(&outcomes.inertia));
            assert!((0.0..=1.0).contains(&outcomes.reliability));
        }
    }

    #[test]
    fn test_non_finite_stock_is_surfaced() {
        let model = small_model(1, 2);
        let scenario = Scenario {
            q: 4.5,
            ..Scenario::reference()
        };
        let err = model
            .simulate_replication(&scenario, &ReleasePolicy::zero(), &[1e300, 0.0])
            .unwrap_err();
        assert!(matches!(err, LimnoError::NonFiniteStock { step: 1 }));
    }

    #[test]
    fn test_evaluate_rejects_out_of_range_scenario() {
        let model = small_model(1, 10);
        let scenario = Scenario {
            q: 9.0,
            ..Scenario::reference()
        };
        let err = model
            .evaluate(&scenario, &ReleasePolicy::zero(), 0)
            .unwrap_err();
        assert!(matches!(err, LimnoError::ParameterOutOfRange { .. }));
    }
}
