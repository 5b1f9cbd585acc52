//! Generational GP loop: evaluate, record, select, reproduce.

mod selection;


pub use selection::{roulette, tournament};

use crate::arena::Arena;
use crate::config::{AgentConfig, ConfigError, RunConfig, SelectionStrategy};
use crate::episode::Episode;
use crate::metrics::{collect_generation_stats, GenerationStats, RunSummary};
use crate::policy::Policy;
use crate::rng::{create_rng, derive_trial_rng};
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub policy: Policy,
    /// Mean trial fitness from the most recent evaluation; 0 until evaluated.
    pub fitness: f64,
    /// Depth bound the lineage was generated with.
    pub depth: usize,
}

impl Individual {
    pub fn new(policy: Policy, depth: usize) -> Self {
        Self {
            policy,
            fitness: 0.0,
            depth,
        }
    }

    pub fn random<R: Rng + ?Sized>(depth: usize, rng: &mut R) -> Self {
        Self::new(Policy::random(depth, rng), depth)
    }
}

/// Mean fitness over `trials` independent episodes on clones of `arena`.
/// `trial_rng(t)` supplies the stream for trial `t`.
pub fn evaluate_policy<F>(
    policy: &Policy,
    arena: &Arena,
    params: &AgentConfig,
    trials: usize,
    trial_rng: F,
) -> f64
where
    F: Fn(usize) -> ChaCha12Rng,
{
    if trials == 0 {
        return 0.0;
    }
    let total: f64 = (0..trials)
        .map(|t| Episode::new(policy, params, arena.clone(), trial_rng(t)).run().fitness())
        .sum();
    total / trials as f64
}

/// Evolution engine. Owns the population, the run RNG and the history.
pub struct Evolution {
    config: RunConfig,
    rng: ChaCha12Rng,
    population: Vec<Individual>,
    generation: usize,
    best: Option<Individual>,
    history: Vec<GenerationStats>,
}

impl Evolution {
    /// Validate `config` and seed a random initial population.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = create_rng(config.evolution.seed);
        let depth = config.evolution.tree_depth;
        let population = (0..config.evolution.population_size)
            .map(|_| Individual::random(depth, &mut rng))
            .collect();
        Ok(Self {
            config,
            rng,
            population,
            generation: 0,
            best: None,
            history: Vec::new(),
        })
    }

    /// Start from explicit individuals instead of a random population.
    pub fn with_population(
        config: RunConfig,
        population: Vec<Individual>,
    ) -> Result<Self, ConfigError> {
        let mut engine = Self::new(config)?;
        if population.is_empty() {
            return Err(ConfigError::InvalidPopulationSize);
        }
        engine.population = population;
        Ok(engine)
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Index of the next generation to run.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Best individual seen across all evaluated generations.
    pub fn best(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Score every individual on `arena` and update the best-ever record.
    ///
    /// Each (generation, individual, trial) gets its own derived stream, so
    /// the result does not depend on `parallel` or thread count.
    pub fn evaluate_population(&mut self, arena: &Arena) {
        let seed = self.config.evolution.seed;
        let generation = self.generation;
        let trials = self.config.evolution.trials_per_individual;
        let params = &self.config.agent;
        let score = |(index, individual): (usize, &Individual)| {
            evaluate_policy(&individual.policy, arena, params, trials, |trial| {
                derive_trial_rng(seed, generation, index, trial)
            })
        };
        let scores: Vec<f64> = if self.config.evolution.parallel {
            self.population.par_iter().enumerate().map(score).collect()
        } else {
            self.population.iter().enumerate().map(score).collect()
        };
        for (individual, fitness) in self.population.iter_mut().zip(scores) {
            individual.fitness = fitness;
        }

        for individual in &self.population {
            if self
                .best
                .as_ref()
                .is_none_or(|best| individual.fitness > best.fitness)
            {
                self.best = Some(individual.clone());
            }
        }
    }

    /// Parent pool the same size as the population, per the configured strategy.
    pub fn select(&mut self) -> Vec<Individual> {
        match self.config.evolution.selection {
            SelectionStrategy::Tournament { size } => {
                tournament(&self.population, size, &mut self.rng)
            }
            SelectionStrategy::Roulette => roulette(&self.population, &mut self.rng),
        }
    }

    /// Run one full generation on a freshly generated arena.
    pub fn step_generation(&mut self) -> Result<GenerationStats, ConfigError> {
        let arena = Arena::generate(&self.config.arena, &mut self.rng)?;
        self.evaluate_population(&arena);

        let best_ever = self.best.as_ref().map_or(0.0, |b| b.fitness);
        let stats = collect_generation_stats(self.generation, best_ever, &self.population);
        info!(
            generation = stats.generation,
            best = stats.best_fitness,
            generation_best = stats.generation_best,
            mean = stats.mean_fitness,
            std_dev = stats.std_fitness,
            diversity = stats.diversity,
            max_depth = stats.max_depth,
            "generation evaluated"
        );
        self.history.push(stats.clone());

        self.population = self.reproduce();
        self.generation += 1;
        Ok(stats)
    }

    /// Run `generations` generations. Returns the best-ever individual (if any
    /// generation ran) and the full history.
    pub fn evolve(
        &mut self,
        generations: usize,
    ) -> Result<(Option<Individual>, Vec<GenerationStats>), ConfigError> {
        for _ in 0..generations {
            self.step_generation()?;
        }
        Ok((self.best.clone(), self.history.clone()))
    }

    /// Persistable record of the run so far.
    pub fn summary(&self) -> Option<RunSummary> {
        let best = self.best.as_ref()?;
        Some(RunSummary {
            schema_version: 1,
            config: self.config.clone(),
            generations: self.generation,
            best_fitness: best.fitness,
            best_policy: best.policy.clone(),
            history: self.history.clone(),
        })
    }

    /// Elites unchanged, then crossover + mutation children from the selected pool.
    fn reproduce(&mut self) -> Vec<Individual> {
        let evolution = &self.config.evolution;
        let size = evolution.population_size;
        let elite_count = evolution.elitism.count(size).min(self.population.len());
        let rate = evolution.mutation_rate_at(self.generation);
        let p_cut = evolution.crossover_cut;
        let depth_cap = evolution.max_tree_depth;
        let depth = evolution.tree_depth;

        let mut ranked: Vec<&Individual> = self.population.iter().collect();
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        let mut next: Vec<Individual> = ranked.into_iter().take(elite_count).cloned().collect();
        if let Some(top) = next.first() {
            debug!(elites = elite_count, top = top.fitness, "carrying elites");
        }

        let pool = self.select();
        if pool.is_empty() {
            return next;
        }
        while next.len() < size {
            let (i, j) = distinct_pair(pool.len(), &mut self.rng);
            let mut child = pool[i]
                .policy
                .crossover(&pool[j].policy, p_cut, &mut self.rng);
            child.mutate(rate, &mut self.rng);
            if let Some(max) = depth_cap {
                child.truncate(max, &mut self.rng);
            }
            next.push(Individual::new(child, depth));
        }
        next
    }
}

/// Two different indices below `len`, or `(0, 0)` when only one exists.
fn distinct_pair<R: Rng + ?Sized>(len: usize, rng: &mut R) -> (usize, usize) {
    if len < 2 {
        return (0, 0);
    }
    let i = rng.random_range(0..len);
    let mut j = rng.random_range(0..len - 1);
    if j >= i {
        j += 1;
    }
    (i, j)
}
