//! Release-decision rules.
//!
//! A policy maps the current pollution stock to the next release. The
//! parameterized form is the cubic radial-basis closed-loop rule with the
//! levers `c1, c2, r1, r2, w1`; a constant-rate rule covers the
//! no-release baseline and fixed-release studies. Whatever the rule
//! computes, the release is clipped to the physical range [0, 0.1] — this
//! clamp is a property of the decision variable, not input validation.

use crate::experiment::lever_space;
use crate::models::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A release-decision rule, fixed per policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum ReleasePolicy {
    /// Cubic radial-basis closed-loop rule:
    /// `w1·|(x−c1)/r1|³ + (1−w1)·|(x−c2)/r2|³`, clipped.
    Rbf {
        c1: f64,
        c2: f64,
        r1: f64,
        r2: f64,
        w1: f64,
    },

    /// Constant release rate, clipped. `Constant { rate: 0.0 }` is the
    /// no-release baseline.
    Constant { rate: f64 },
}

impl ReleasePolicy {
    /// Physical lower bound on the release decision.
    pub const MIN_RELEASE: f64 = 0.0;

    /// Physical upper bound on the release decision.
    pub const MAX_RELEASE: f64 = 0.1;

    /// The no-release baseline policy.
    pub fn zero() -> Self {
        Self::Constant { rate: 0.0 }
    }

    /// Draw an RBF policy uniformly from the lever space.
    pub fn sample_rbf(rng: &mut impl Rng) -> Self {
        let [c1, c2, r1, r2, w1] = lever_space();
        Self::Rbf {
            c1: c1.sample(rng),
            c2: c2.sample(rng),
            r1: r1.sample(rng),
            r2: r2.sample(rng),
            w1: w1.sample(rng),
        }
    }

    /// Compute the release for the current pollution stock.
    ///
    /// Deterministic given the levers and the stock. Always within
    /// [`MIN_RELEASE`, `MAX_RELEASE`]; degenerate levers (a zero radius at
    /// its own center) can yield NaN, which the simulation surfaces as
    /// numerical instability rather than masking here.
    ///
    /// [`MIN_RELEASE`]: Self::MIN_RELEASE
    /// [`MAX_RELEASE`]: Self::MAX_RELEASE
    pub fn release(&self, stock: f64) -> f64 {
        let raw = match *self {
            Self::Rbf { c1, c2, r1, r2, w1 } => {
                let basis1 = ((stock - c1) / r1).abs().powi(3);
                let basis2 = ((stock - c2) / r2).abs().powi(3);
                w1 * basis1 + (1.0 - w1) * basis2
            }
            Self::Constant { rate } => rate,
        };
        raw.clamp(Self::MIN_RELEASE, Self::MAX_RELEASE)
    }

    /// Reject lever values outside their declared ranges.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Rbf { c1, c2, r1, r2, w1 } => {
                let [pc1, pc2, pr1, pr2, pw1] = lever_space();
                pc1.check(c1)?;
                pc2.check(c2)?;
                pr1.check(r1)?;
                pr2.check(r2)?;
                pw1.check(w1)?;
                Ok(())
            }
            // A constant rule is usable for any finite rate; the clamp
            // bounds it to the physical range.
            Self::Constant { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LimnoError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_release_always_within_physical_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let policy = ReleasePolicy::sample_rbf(&mut rng);
            for i in 0..=50 {
                let stock = i as f64 * 0.1;
                let a = policy.release(stock);
                assert!(
                    (ReleasePolicy::MIN_RELEASE..=ReleasePolicy::MAX_RELEASE).contains(&a),
                    "release {a} out of bounds for {policy:?} at stock {stock}"
                );
            }
        }
    }

    #[test]
    fn test_zero_policy_never_releases() {
        let policy = ReleasePolicy::zero();
        for i in 0..10 {
            assert_eq!(policy.release(i as f64), 0.0);
        }
    }

    #[test]
    fn test_constant_policy_is_clipped() {
        let policy = ReleasePolicy::Constant { rate: 0.5 };
        assert_eq!(policy.release(0.0), 0.1);
        let policy = ReleasePolicy::Constant { rate: -1.0 };
        assert_eq!(policy.release(0.0), 0.0);
    }

    #[test]
    fn test_rbf_rule_matches_closed_form() {
        let policy = ReleasePolicy::Rbf {
            c1: 0.25,
            c2: 0.25,
            r1: 0.5,
            r2: 0.5,
            w1: 0.5,
        };
        // rule(0) = |(0 - 0.25)/0.5|^3 = 0.125, clipped to 0.1
        assert_eq!(policy.release(0.0), 0.1);
        // rule(0.25) = 0 at both centers
        assert_eq!(policy.release(0.25), 0.0);
    }

    #[test]
    fn test_sampled_policies_are_valid() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            ReleasePolicy::sample_rbf(&mut rng).validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_lever() {
        let policy = ReleasePolicy::Rbf {
            c1: 3.0,
            c2: 0.0,
            r1: 1.0,
            r2: 1.0,
            w1: 0.5,
        };
        let err = policy.validate().unwrap_err();
        assert!(matches!(
            err,
            LimnoError::ParameterOutOfRange { name: "c1", .. }
        ));
    }
}
