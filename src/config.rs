use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cost-model tuning factors. Runtime-tunable; a snapshot is attached to
/// explain output so regressions can be diagnosed against a baseline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostFactors {
    pub io: f64,
    pub cpu: f64,
    pub memory: f64,
    pub network: f64,
}

impl Default for CostFactors {
    fn default() -> Self {
        Self {
            io: 1.0,
            cpu: 0.1,
            memory: 0.05,
            network: 0.5,
        }
    }
}

/// Selection strategy for the index advisor's genetic search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectionStrategy {
    Roulette,
    Tournament,
}

/// All tunables governing a single `Optimize` call and advisor session. A
/// plain struct the caller constructs and hands in; no file format is
/// mandated, but `Deserialize` is kept so an embedder can load it from
/// whatever configuration layer it already has.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    pub cost_factors: CostFactors,

    /// Upper bound on relations handled by the DP join-reorder search;
    /// above this, the heuristic reorder rule takes over.
    pub max_dp_relations: usize,
    /// Max fan-out at an internal node of a bushy join tree.
    pub bushiness_bound: usize,

    /// Safety-net bound on rule-engine iterations per node.
    pub max_rule_iterations: usize,

    // Index advisor tunables.
    pub max_num_index: usize,
    pub max_index_columns: usize,
    pub max_num_query: usize,
    pub max_total_size_bytes: u64,
    pub advisor_timeout: Duration,
    pub population_size: usize,
    pub max_generations: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub convergence_generations: usize,
    pub convergence_ratio: f64,
    pub selection_strategy: SelectionStrategy,
    pub elite_count: usize,
    pub genetic_seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cost_factors: CostFactors::default(),
            max_dp_relations: 10,
            bushiness_bound: 3,
            max_rule_iterations: 10,
            max_num_index: 10,
            max_index_columns: 4,
            max_num_query: 1000,
            max_total_size_bytes: 10 * 1024 * 1024 * 1024,
            advisor_timeout: Duration::from_secs(30),
            population_size: 50,
            max_generations: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            convergence_generations: 10,
            convergence_ratio: 0.01,
            selection_strategy: SelectionStrategy::Tournament,
            elite_count: 2,
            genetic_seed: 0x5EED,
        }
    }
}
