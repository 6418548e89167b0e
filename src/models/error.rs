//! Error types for limno.
//!
//! The core is a pure numerical function, so the taxonomy is small:
//! caller precondition violations (out-of-range parameters, malformed
//! config) and surfaced numerical instability. There is no retry logic;
//! every failure is terminal for the evaluation that raised it.

use thiserror::Error;

/// Top-level error type for limno.
#[derive(Debug, Error)]
pub enum LimnoError {
    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A scenario or policy value falls outside its declared range.
    ///
    /// Out-of-range inputs are rejected loudly rather than clamped; the
    /// only intentional clamp in the system is the physical release bound.
    #[error("Parameter '{name}' = {value} outside declared range [{lower}, {upper}]")]
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
        lower: f64,
        upper: f64,
    },

    /// The pollution stock left the representable range mid-simulation
    /// (typically overflow of `x^q` for extreme inputs). Surfaced, never
    /// masked.
    #[error("Pollution stock became non-finite at step {step}")]
    NonFiniteStock { step: usize },

    /// The critical-threshold root finder found no sign change in its
    /// bracket. Does not happen for in-range `b` and `q`.
    #[error("No critical threshold in [{lower}, {upper}] for b={b}, q={q}")]
    CriticalThresholdBracket {
        b: f64,
        q: f64,
        lower: f64,
        upper: f64,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LimnoError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for limno.
pub type Result<T> = std::result::Result<T, LimnoError>;
