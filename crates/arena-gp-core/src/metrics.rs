use crate::config::RunConfig;
use crate::evolution::Individual;
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One entry of the per-generation history.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GenerationStats {
    pub generation: usize,
    /// Best fitness seen so far in the run; never decreases.
    pub best_fitness: f64,
    /// Best fitness within this generation alone.
    pub generation_best: f64,
    pub mean_fitness: f64,
    pub std_fitness: f64,
    /// Fraction of structurally distinct policies, in `(0, 1]` for a non-empty population.
    pub diversity: f64,
    pub mean_depth: f64,
    pub max_depth: usize,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: RunConfig,
    pub generations: usize,
    pub best_fitness: f64,
    pub best_policy: Policy,
    #[serde(default)]
    pub history: Vec<GenerationStats>,
}

/// Population standard deviation; zero for fewer than two values.
pub(crate) fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Share of distinct structural fingerprints in the population.
pub(crate) fn structural_diversity(population: &[Individual]) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<u64> = population.iter().map(|i| i.policy.fingerprint()).collect();
    distinct.len() as f64 / population.len() as f64
}

/// Summarize an evaluated population. `best_ever` is the running best
/// fitness, already including this generation.
pub fn collect_generation_stats(
    generation: usize,
    best_ever: f64,
    population: &[Individual],
) -> GenerationStats {
    let n = population.len();
    let denom = n.max(1) as f64;
    let fitnesses: Vec<f64> = population.iter().map(|i| i.fitness).collect();
    let mean_fitness = fitnesses.iter().sum::<f64>() / denom;
    let generation_best = fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let generation_best = if n == 0 { 0.0 } else { generation_best };

    let depths: Vec<usize> = population.iter().map(|i| i.policy.depth()).collect();

    GenerationStats {
        generation,
        best_fitness: best_ever.max(generation_best),
        generation_best,
        mean_fitness,
        std_fitness: std_dev(&fitnesses, mean_fitness),
        diversity: structural_diversity(population),
        mean_depth: depths.iter().sum::<usize>() as f64 / denom,
        max_depth: depths.iter().copied().max().unwrap_or(0),
    }
}
