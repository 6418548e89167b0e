//! Parameter space declarations and scenario sampling.
//!
//! The uncertainty and lever ranges of the lake problem are declared once
//! as immutable constructors and referenced everywhere else; there is no
//! ambient mutable registry. Sampling is plain uniform per factor — the
//! design-of-experiments machinery (Latin hypercube, Sobol) of full
//! exploratory-modelling frameworks is deliberately out of scope.

use crate::models::{LimnoError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A named continuous parameter range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealParameter {
    pub name: &'static str,
    pub lower: f64,
    pub upper: f64,
}

impl RealParameter {
    pub const fn new(name: &'static str, lower: f64, upper: f64) -> Self {
        Self { name, lower, upper }
    }

    /// Draw a value uniformly from the range.
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        rng.random_range(self.lower..=self.upper)
    }

    /// Whether a value lies inside the range (bounds inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Reject a value outside the range.
    pub fn check(&self, value: f64) -> Result<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(LimnoError::ParameterOutOfRange {
                name: self.name,
                value,
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

/// The five deeply uncertain factors of the lake problem.
pub fn uncertainty_space() -> [RealParameter; 5] {
    [
        RealParameter::new("mean", 0.01, 0.05),
        RealParameter::new("stdev", 0.001, 0.005),
        RealParameter::new("b", 0.1, 0.45),
        RealParameter::new("q", 2.0, 4.5),
        RealParameter::new("delta", 0.93, 0.99),
    ]
}

/// The five release-rule lever coefficients.
pub fn lever_space() -> [RealParameter; 5] {
    [
        RealParameter::new("c1", -2.0, 2.0),
        RealParameter::new("c2", -2.0, 2.0),
        RealParameter::new("r1", 0.0, 2.0),
        RealParameter::new("r2", 0.0, 2.0),
        RealParameter::new("w1", 0.0, 1.0),
    ]
}

/// One sampled assignment of the uncertain factors.
///
/// Immutable once built; every replication of an evaluation sees the same
/// scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Mean of the log-normal natural-inflow distribution
    pub mean: f64,

    /// Standard deviation of that distribution
    pub stdev: f64,

    /// Natural removal rate of the lake
    pub b: f64,

    /// Natural recycling exponent of the lake
    pub q: f64,

    /// Annual discount factor
    pub delta: f64,
}

impl Scenario {
    /// Draw a scenario uniformly from the uncertainty space.
    pub fn sample(rng: &mut impl Rng) -> Self {
        let [mean, stdev, b, q, delta] = uncertainty_space();
        Self {
            mean: mean.sample(rng),
            stdev: stdev.sample(rng),
            b: b.sample(rng),
            q: q.sample(rng),
            delta: delta.sample(rng),
        }
    }

    /// Reject any factor outside its declared range.
    pub fn validate(&self) -> Result<()> {
        let [mean, stdev, b, q, delta] = uncertainty_space();
        mean.check(self.mean)?;
        stdev.check(self.stdev)?;
        b.check(self.b)?;
        q.check(self.q)?;
        delta.check(self.delta)?;
        Ok(())
    }

    /// Best-estimate default values from the lake problem literature.
    pub fn reference() -> Self {
        Self {
            mean: 0.02,
            stdev: 0.0017,
            b: 0.42,
            q: 2.0,
            delta: 0.98,
        }
    }
}
