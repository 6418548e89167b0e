//! Core data models for limno: configuration, errors, and result tables.

mod config;
mod error;
mod results;

pub use config::*;
pub use error::*;
pub use results::*;
