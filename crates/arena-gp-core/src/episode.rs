//! Trial driver: runs one policy in one arena until energy or time runs out.

use crate::agent::{Agent, Control};
use crate::arena::{Arena, ArenaState};
use crate::config::{AgentConfig, SpawnMode};
use crate::constants::MAX_ENERGY;
use crate::policy::Policy;
use crate::sensors::{sense, SensorSnapshot};
use rand::Rng;
use serde::Serialize;

/// Fitness weights per trial.
const RESOURCE_WEIGHT: f64 = 100.0;
const DISTANCE_WEIGHT: f64 = 0.1;
const COLLISION_PENALTY: f64 = 50.0;
const ENERGY_DEFICIT_PENALTY: f64 = 0.5;
const GOAL_BONUS: f64 = 500.0;

/// Agent state a renderer needs.
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct AgentPose {
    pub position: [f64; 2],
    pub heading: f64,
    pub speed: f64,
    pub energy: f64,
}

impl From<&Agent> for AgentPose {
    fn from(agent: &Agent) -> Self {
        Self {
            position: agent.position,
            heading: agent.heading,
            speed: agent.speed,
            energy: agent.energy,
        }
    }
}

/// One simulated step: what the policy saw, what it did, where the agent ended up.
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub snapshot: SensorSnapshot,
    pub control: Control,
    pub agent: AgentPose,
    pub arena: ArenaState,
}

/// End-of-trial counters.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TrialOutcome {
    pub resources_collected: usize,
    pub distance_traveled: f64,
    pub collisions: usize,
    pub energy: f64,
    pub goal_reached: bool,
    pub steps: usize,
    /// True when the trial ended because energy hit zero.
    pub exhausted: bool,
}

impl TrialOutcome {
    /// Weighted score, never negative.
    pub fn fitness(&self) -> f64 {
        let mut score = RESOURCE_WEIGHT * self.resources_collected as f64
            + DISTANCE_WEIGHT * self.distance_traveled
            - COLLISION_PENALTY * self.collisions as f64
            - ENERGY_DEFICIT_PENALTY * (MAX_ENERGY - self.energy);
        if self.goal_reached {
            score += GOAL_BONUS;
        }
        score.max(0.0)
    }
}

/// A single trial, steppable one tick at a time.
pub struct Episode<'a, R: Rng> {
    policy: &'a Policy,
    params: &'a AgentConfig,
    arena: Arena,
    agent: Agent,
    rng: R,
    exhausted: bool,
    finished: bool,
}

impl<'a, R: Rng> Episode<'a, R> {
    /// Reset `arena` and place a fresh agent according to `params.spawn`.
    pub fn new(policy: &'a Policy, params: &'a AgentConfig, mut arena: Arena, mut rng: R) -> Self {
        arena.reset();
        let position = match params.spawn {
            SpawnMode::Center => arena.center(),
            SpawnMode::SafePoint => {
                arena.find_safe_point(params.radius + params.spawn_clearance, &mut rng)
            }
        };
        Self {
            policy,
            params,
            arena,
            agent: Agent::new(position, params.radius),
            rng,
            exhausted: false,
            finished: false,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Sense, decide, move. `None` once the trial has ended.
    pub fn step(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }
        let snapshot = sense(&self.agent, &self.arena);
        let control = self.policy.control(&snapshot);
        self.exhausted = self
            .agent
            .transition(control, &mut self.arena, self.params, &mut self.rng);
        let timed_out = self.arena.advance_step();
        self.finished = self.exhausted || timed_out;
        Some(Frame {
            snapshot,
            control,
            agent: AgentPose::from(&self.agent),
            arena: self.arena.state(),
        })
    }

    pub fn outcome(&self) -> TrialOutcome {
        TrialOutcome {
            resources_collected: self.agent.resources_collected,
            distance_traveled: self.agent.distance_traveled,
            collisions: self.agent.collisions,
            energy: self.agent.energy,
            goal_reached: self.agent.goal_reached,
            steps: self.arena.step(),
            exhausted: self.exhausted,
        }
    }

    /// Run to completion without keeping frames.
    pub fn run(mut self) -> TrialOutcome {
        while self.step().is_some() {}
        self.outcome()
    }

    /// Run to completion, keeping every frame.
    pub fn record(mut self) -> (Vec<Frame>, TrialOutcome) {
        let mut frames = Vec::with_capacity(self.arena.max_steps());
        while let Some(frame) = self.step() {
            frames.push(frame);
        }
        (frames, self.outcome())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ArenaLayout, Goal, Obstacle, Resource};
    use crate::config::ArenaConfig;
    use crate::policy::Node;
    use crate::rng::create_rng;

    fn open_arena(resources: Vec<[f64; 2]>, max_steps: usize) -> Arena {
        let config = ArenaConfig {
            max_steps,
            ..ArenaConfig::default()
        };
        let layout = ArenaLayout {
            width: 800,
            height: 600,
            obstacles: vec![],
            resources: resources
                .into_iter()
                .map(|[x, y]| Resource {
                    x,
                    y,
                    collected: false,
                })
                .collect(),
            goal: Goal {
                x: 700.0,
                y: 300.0,
                radius: 30.0,
            },
        };
        Arena::from_layout(&config, layout).unwrap()
    }

    fn idle() -> Policy {
        Policy::new(Node::constant(0.0), Node::constant(0.0))
    }

    #[test]
    fn fitness_formula_and_floor() {
        let mut outcome = TrialOutcome {
            resources_collected: 2,
            distance_traveled: 300.0,
            collisions: 1,
            energy: 80.0,
            goal_reached: true,
            steps: 10,
            exhausted: false,
        };
        assert!((outcome.fitness() - (200.0 + 30.0 - 50.0 - 10.0 + 500.0)).abs() < 1e-9);
        outcome.goal_reached = false;
        outcome.resources_collected = 0;
        outcome.collisions = 10;
        assert_eq!(outcome.fitness(), 0.0);
    }

    #[test]
    fn idle_step_costs_only_base_energy() {
        let policy = idle();
        let params = AgentConfig::default();
        let mut episode = Episode::new(&policy, &params, open_arena(vec![], 10), create_rng(1));
        let frame = episode.step().unwrap();
        assert_eq!(frame.agent.position, [400.0, 300.0]);
        assert!((frame.agent.energy - (MAX_ENERGY - params.base_energy_cost)).abs() < 1e-12);
        assert_eq!(frame.control, Control::default());
        assert_eq!(frame.arena.step, 1);
    }

    #[test]
    fn episode_ends_at_step_limit() {
        let policy = idle();
        let params = AgentConfig::default();
        let episode = Episode::new(&policy, &params, open_arena(vec![], 25), create_rng(2));
        let (frames, outcome) = episode.record();
        assert_eq!(frames.len(), 25);
        assert_eq!(outcome.steps, 25);
        assert!(!outcome.exhausted);
    }

    #[test]
    fn step_after_finish_is_none() {
        let policy = idle();
        let params = AgentConfig::default();
        let mut episode = Episode::new(&policy, &params, open_arena(vec![], 1), create_rng(3));
        assert!(episode.step().is_some());
        assert!(episode.is_finished());
        assert!(episode.step().is_none());
    }

    #[test]
    fn goto_goal_policy_reaches_goal_and_collects() {
        let policy = Policy::new(
            Node::goto_goal(Node::constant(1.0), Node::constant(1.0)),
            Node::goto_goal(Node::constant(1.0), Node::constant(1.0)),
        );
        let params = AgentConfig::default();
        let arena = open_arena(vec![[550.0, 300.0]], 150);
        let outcome = Episode::new(&policy, &params, arena, create_rng(4)).run();
        assert!(outcome.goal_reached);
        assert_eq!(outcome.resources_collected, 1);
        assert_eq!(outcome.collisions, 0);
        assert!(outcome.fitness() > GOAL_BONUS);
    }

    #[test]
    fn safe_point_spawn_clears_obstacles_by_radius_plus_margin() {
        let config = ArenaConfig::default();
        let layout = ArenaLayout {
            width: 800,
            height: 600,
            obstacles: vec![Obstacle::new(0.0, 0.0, 600.0, 600.0)],
            resources: vec![],
            goal: Goal {
                x: 700.0,
                y: 300.0,
                radius: 30.0,
            },
        };
        let arena = Arena::from_layout(&config, layout).unwrap();
        let policy = idle();
        let params = AgentConfig {
            spawn: SpawnMode::SafePoint,
            ..AgentConfig::default()
        };
        let required = params.radius + params.spawn_clearance;
        for seed in 0..50 {
            let episode = Episode::new(&policy, &params, arena.clone(), create_rng(seed));
            let [x, y] = episode.agent().position;
            let clearance = arena.obstacles()[0].distance_to(x, y);
            assert!(
                clearance >= required,
                "seed {seed}: spawn ({x}, {y}) only {clearance} from obstacle"
            );
        }
    }

    #[test]
    fn same_seed_same_trajectory() {
        let mut rng = create_rng(5);
        let policy = Policy::random(4, &mut rng);
        let params = AgentConfig::default();
        let run = || {
            let arena = open_arena(vec![[100.0, 100.0]], 200);
            Episode::new(&policy, &params, arena, create_rng(9)).run()
        };
        assert_eq!(run(), run());
    }
}
