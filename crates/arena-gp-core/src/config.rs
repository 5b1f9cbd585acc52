use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the agent starts each trial.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    /// Arena center, regardless of obstacles.
    #[default]
    Center,
    /// Bounded random search for a point clear of obstacles.
    SafePoint,
}

/// Parent-pool selection strategy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Draw `size` contestants with replacement, keep the fittest.
    Tournament { size: usize },
    /// Fitness-proportional sampling.
    Roulette,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        Self::Tournament { size: 3 }
    }
}

/// How many top individuals survive unchanged into the next generation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Elitism {
    Count(usize),
    /// Fraction of the population size, rounded to the nearest individual.
    Fraction(f64),
}

impl Default for Elitism {
    fn default() -> Self {
        Self::Count(1)
    }
}

impl Elitism {
    /// Resolve to an absolute elite count for a population, never exceeding it.
    pub fn count(&self, population_size: usize) -> usize {
        let n = match *self {
            Elitism::Count(n) => n,
            Elitism::Fraction(f) => (f * population_size as f64).round() as usize,
        };
        n.min(population_size)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    /// Arena width in world units.
    pub width: u32,
    /// Arena height in world units.
    pub height: u32,
    /// Number of rectangular obstacles generated per arena.
    pub obstacle_count: usize,
    /// Distance from the walls within which obstacle corners are not placed.
    pub obstacle_margin: u32,
    /// Minimum obstacle side length.
    pub obstacle_min_size: u32,
    /// Maximum obstacle side length.
    pub obstacle_max_size: u32,
    /// Number of collectible resources generated per arena.
    pub resource_count: usize,
    /// Distance from the walls within which resources are not placed.
    pub resource_margin: u32,
    /// Pickup radius of a resource, added to the agent radius.
    pub resource_radius: f64,
    /// Radius of the goal circle.
    pub goal_radius: f64,
    /// Minimum distance between the goal center and any obstacle.
    pub goal_clearance: f64,
    /// Distance from the walls within which goal and spawn candidates are not drawn.
    pub placement_margin: u32,
    /// Retry budget for goal and safe-point placement searches.
    pub placement_attempts: usize,
    /// Episode length in steps before timeout.
    pub max_steps: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            obstacle_count: 5,
            obstacle_margin: 50,
            obstacle_min_size: 20,
            obstacle_max_size: 100,
            resource_count: 5,
            resource_margin: 20,
            resource_radius: 10.0,
            goal_radius: 30.0,
            goal_clearance: 50.0,
            placement_margin: 50,
            placement_attempts: 100,
            max_steps: 1000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Body radius used for collision, pickup and goal tests.
    pub radius: f64,
    /// Speed floor once the agent has started moving.
    pub min_speed: f64,
    /// Speed ceiling.
    pub max_speed: f64,
    /// Speed the agent is reset to after a collision.
    pub crawl_speed: f64,
    /// Displacement below which a step counts as stationary.
    pub stationary_epsilon: f64,
    /// Stationary steps tolerated before the escape override kicks in.
    pub stationary_threshold: u32,
    /// Acceleration floor applied while escaping a stall.
    pub forced_acceleration: f64,
    /// Bound of the random rotation applied while escaping a stall.
    pub escape_rotation: f64,
    /// Bound of the random jitter added to the heading after a collision.
    pub collision_jitter: f64,
    /// Energy spent every step.
    pub base_energy_cost: f64,
    /// Energy spent per unit of speed.
    pub speed_energy_cost: f64,
    /// Energy spent per radian of rotation.
    pub rotation_energy_cost: f64,
    /// Energy regained per collected resource.
    pub resource_energy_bonus: f64,
    /// Energy regained once, on reaching the goal.
    pub goal_energy_bonus: f64,
    /// Starting position policy.
    pub spawn: SpawnMode,
    /// Extra clearance over `radius` required by [`SpawnMode::SafePoint`].
    pub spawn_clearance: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            radius: 15.0,
            min_speed: 0.1,
            max_speed: 5.0,
            crawl_speed: 0.1,
            stationary_epsilon: 0.1,
            stationary_threshold: 5,
            forced_acceleration: 0.2,
            escape_rotation: 0.2,
            collision_jitter: std::f64::consts::FRAC_PI_8,
            base_energy_cost: 0.1,
            speed_energy_cost: 0.05,
            rotation_energy_cost: 0.1,
            resource_energy_bonus: 20.0,
            goal_energy_bonus: 50.0,
            spawn: SpawnMode::Center,
            spawn_clearance: 20.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Deterministic seed for reproducible evolutionary runs.
    pub seed: u64,
    /// Number of individuals per generation.
    pub population_size: usize,
    /// Depth bound used when generating random policy trees.
    pub tree_depth: usize,
    /// Independent episodes averaged into one fitness value.
    pub trials_per_individual: usize,
    /// Parent-pool selection strategy.
    pub selection: SelectionStrategy,
    /// Number of individuals copied unchanged into the next generation.
    pub elitism: Elitism,
    /// Initial per-node mutation probability (`p0`).
    pub mutation_rate: f64,
    /// Exponential decay constant `k` in `p0 * exp(-k * generation)`.
    pub mutation_decay: f64,
    /// Probability of a whole-subtree swap at each crossover node.
    pub crossover_cut: f64,
    /// Optional hard depth cap enforced on offspring after crossover.
    pub max_tree_depth: Option<usize>,
    /// Evaluate individuals on the rayon thread pool.
    pub parallel: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            population_size: 50,
            tree_depth: 3,
            trials_per_individual: 5,
            selection: SelectionStrategy::default(),
            elitism: Elitism::default(),
            mutation_rate: 0.1,
            mutation_decay: 0.0,
            crossover_cut: 0.1,
            max_tree_depth: None,
            parallel: true,
        }
    }
}

impl EvolutionConfig {
    /// Mutation probability for a generation: `p0 * exp(-k * generation)`.
    pub fn mutation_rate_at(&self, generation: usize) -> f64 {
        self.mutation_rate * (-self.mutation_decay * generation as f64).exp()
    }
}

/// Everything needed to run one evolutionary experiment.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub arena: ArenaConfig,
    pub agent: AgentConfig,
    pub evolution: EvolutionConfig,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("arena width and height must be greater than 0")]
    InvalidArenaSize,
    #[error("{field} margin ({margin}) leaves no room in a {width}x{height} arena")]
    MarginTooLarge {
        field: &'static str,
        margin: u32,
        width: u32,
        height: u32,
    },
    #[error("obstacle sizes must satisfy 0 < min ({min}) <= max ({max})")]
    InvalidObstacleSize { min: u32, max: u32 },
    #[error("resource_radius must be positive and finite")]
    InvalidResourceRadius,
    #[error("goal_radius must be positive and finite")]
    InvalidGoalRadius,
    #[error("goal_clearance must be non-negative and finite")]
    InvalidGoalClearance,
    #[error("placement_attempts must be greater than 0")]
    InvalidPlacementAttempts,
    #[error("max_steps must be greater than 0")]
    InvalidMaxSteps,
    #[error("agent radius must be positive and finite")]
    InvalidAgentRadius,
    #[error("speeds must satisfy 0 <= min_speed <= max_speed and crawl_speed <= max_speed")]
    InvalidSpeedBounds,
    #[error("{0} must be non-negative and finite")]
    NegativeAgentParameter(&'static str),
    #[error("population_size must be greater than 0")]
    InvalidPopulationSize,
    #[error("trials_per_individual must be greater than 0")]
    InvalidTrialCount,
    #[error("tournament size must be greater than 0")]
    InvalidTournamentSize,
    #[error("elitism fraction must be finite and within [0,1]")]
    InvalidElitismFraction,
    #[error("{0} must be finite and within [0,1]")]
    InvalidProbability(&'static str),
    #[error("mutation_decay must be non-negative and finite")]
    InvalidMutationDecay,
    #[error("max_tree_depth ({max}) must be at least tree_depth ({depth})")]
    DepthCapBelowTreeDepth { max: usize, depth: usize },
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_bounds()?;
        self.validate_geometry()?;
        if self.placement_attempts == 0 {
            return Err(ConfigError::InvalidPlacementAttempts);
        }
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidMaxSteps);
        }
        Ok(())
    }

    fn validate_bounds(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidArenaSize);
        }
        for (field, margin) in [
            ("obstacle", self.obstacle_margin),
            ("resource", self.resource_margin),
            ("placement", self.placement_margin),
        ] {
            if margin.saturating_mul(2) > self.width.min(self.height) {
                return Err(ConfigError::MarginTooLarge {
                    field,
                    margin,
                    width: self.width,
                    height: self.height,
                });
            }
        }
        Ok(())
    }

    fn validate_geometry(&self) -> Result<(), ConfigError> {
        if self.obstacle_min_size == 0 || self.obstacle_min_size > self.obstacle_max_size {
            return Err(ConfigError::InvalidObstacleSize {
                min: self.obstacle_min_size,
                max: self.obstacle_max_size,
            });
        }
        if !(self.resource_radius.is_finite() && self.resource_radius > 0.0) {
            return Err(ConfigError::InvalidResourceRadius);
        }
        if !(self.goal_radius.is_finite() && self.goal_radius > 0.0) {
            return Err(ConfigError::InvalidGoalRadius);
        }
        if !(self.goal_clearance.is_finite() && self.goal_clearance >= 0.0) {
            return Err(ConfigError::InvalidGoalClearance);
        }
        Ok(())
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigError::InvalidAgentRadius);
        }
        let speeds_ok = self.min_speed.is_finite()
            && self.max_speed.is_finite()
            && self.crawl_speed.is_finite()
            && self.min_speed >= 0.0
            && self.crawl_speed >= 0.0
            && self.min_speed <= self.max_speed
            && self.crawl_speed <= self.max_speed;
        if !speeds_ok {
            return Err(ConfigError::InvalidSpeedBounds);
        }
        for (name, value) in [
            ("stationary_epsilon", self.stationary_epsilon),
            ("forced_acceleration", self.forced_acceleration),
            ("escape_rotation", self.escape_rotation),
            ("collision_jitter", self.collision_jitter),
            ("base_energy_cost", self.base_energy_cost),
            ("speed_energy_cost", self.speed_energy_cost),
            ("rotation_energy_cost", self.rotation_energy_cost),
            ("resource_energy_bonus", self.resource_energy_bonus),
            ("goal_energy_bonus", self.goal_energy_bonus),
            ("spawn_clearance", self.spawn_clearance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NegativeAgentParameter(name));
            }
        }
        Ok(())
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_population()?;
        self.validate_operators()?;
        Ok(())
    }

    fn validate_population(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        if self.trials_per_individual == 0 {
            return Err(ConfigError::InvalidTrialCount);
        }
        if let SelectionStrategy::Tournament { size: 0 } = self.selection {
            return Err(ConfigError::InvalidTournamentSize);
        }
        if let Elitism::Fraction(f) = self.elitism {
            if !(f.is_finite() && (0.0..=1.0).contains(&f)) {
                return Err(ConfigError::InvalidElitismFraction);
            }
        }
        Ok(())
    }

    fn validate_operators(&self) -> Result<(), ConfigError> {
        if !(self.mutation_rate.is_finite() && (0.0..=1.0).contains(&self.mutation_rate)) {
            return Err(ConfigError::InvalidProbability("mutation_rate"));
        }
        if !(self.mutation_decay.is_finite() && self.mutation_decay >= 0.0) {
            return Err(ConfigError::InvalidMutationDecay);
        }
        if !(self.crossover_cut.is_finite() && (0.0..=1.0).contains(&self.crossover_cut)) {
            return Err(ConfigError::InvalidProbability("crossover_cut"));
        }
        if let Some(max) = self.max_tree_depth {
            if max < self.tree_depth {
                return Err(ConfigError::DepthCapBelowTreeDepth {
                    max,
                    depth: self.tree_depth,
                });
            }
        }
        Ok(())
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arena.validate()?;
        self.agent.validate()?;
        self.evolution.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(RunConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{
            "arena": { "obstacle_count": 0 },
            "evolution": { "seed": 7, "selection": { "kind": "roulette" }, "elitism": { "fraction": 0.1 } }
        }"#;
        let cfg: RunConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.arena.obstacle_count, 0);
        assert_eq!(cfg.arena.width, 800);
        assert_eq!(cfg.evolution.seed, 7);
        assert_eq!(cfg.evolution.selection, SelectionStrategy::Roulette);
        assert_eq!(cfg.evolution.elitism, Elitism::Fraction(0.1));
        assert_eq!(cfg.agent, AgentConfig::default());
    }

    #[test]
    fn elitism_resolves_counts_and_fractions() {
        assert_eq!(Elitism::Count(3).count(10), 3);
        assert_eq!(Elitism::Count(30).count(10), 10);
        assert_eq!(Elitism::Fraction(0.1).count(50), 5);
        assert_eq!(Elitism::Fraction(0.0).count(50), 0);
    }

    #[test]
    fn mutation_rate_decays_exponentially() {
        let cfg = EvolutionConfig {
            mutation_rate: 0.2,
            mutation_decay: 0.5,
            ..EvolutionConfig::default()
        };
        assert!((cfg.mutation_rate_at(0) - 0.2).abs() < 1e-12);
        assert!((cfg.mutation_rate_at(2) - 0.2 * (-1.0f64).exp()).abs() < 1e-12);
        assert!(cfg.mutation_rate_at(10) < cfg.mutation_rate_at(9));
    }

    #[test]
    fn oversized_margin_is_rejected() {
        let cfg = ArenaConfig {
            width: 80,
            height: 60,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MarginTooLarge { field: "obstacle", .. })
        ));
    }

    #[test]
    fn depth_cap_below_generation_depth_is_rejected() {
        let cfg = EvolutionConfig {
            tree_depth: 4,
            max_tree_depth: Some(2),
            ..EvolutionConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DepthCapBelowTreeDepth { max: 2, depth: 4 })
        );
    }

    #[test]
    fn zero_tournament_is_rejected() {
        let cfg = EvolutionConfig {
            selection: SelectionStrategy::Tournament { size: 0 },
            ..EvolutionConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidTournamentSize));
    }

    #[test]
    fn inverted_speed_bounds_are_rejected() {
        let cfg = AgentConfig {
            min_speed: 6.0,
            ..AgentConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidSpeedBounds));
    }
}
