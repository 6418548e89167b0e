//! Experiment harness: parameter spaces, designs, and the runner.

mod runner;
mod space;

pub use runner::*;
pub use space::*;
