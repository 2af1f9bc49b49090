//! Core library: rule-based classification, naming and rename planning.

pub mod classifier;
pub mod config;
pub mod conflicts;
pub mod dates;
pub mod error;
pub mod insights;
pub mod models;
pub mod naming;
pub mod pipeline;
pub mod plan;
pub mod rules;
