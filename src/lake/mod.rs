//! The lake pollution model: release policies and stock dynamics.

mod dynamics;
mod policy;

pub use dynamics::*;
pub use policy::*;
