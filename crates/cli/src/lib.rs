//! Public library modules for the CLI crate
pub mod classify;
pub mod name;
pub mod output;
pub mod plan;
pub mod report;
