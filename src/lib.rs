// rusty-optimizer - cost-based SQL query optimizer
// Core library module

pub mod cancellation;
pub mod catalog;
pub mod common;
pub mod config;
pub mod cost;
pub mod error;
pub mod expression;
pub mod hints;
pub mod index_advisor;
pub mod index_selector;
pub mod join_optimizer;
pub mod plan;
pub mod planner;
pub mod rules;

pub use cancellation::CancellationToken;
pub use catalog::Catalog;
pub use config::OptimizerConfig;
pub use error::{Diagnostic, OptimizerError, Result};
pub use planner::{OptimizeResult, Optimizer, OptimizerStatistics};
