//! Static arena geometry plus the small amount of per-episode state
//! (collected flags, goal latch, step clock).

use crate::config::{ArenaConfig, ConfigError};
use crate::spatial::ObstacleIndex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Axis-aligned rectangle; `(x, y)` is the minimum corner.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Obstacle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> [f64; 2] {
        [self.x + self.width * 0.5, self.y + self.height * 0.5]
    }

    /// Euclidean distance from a point to the rectangle (0 inside).
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let cx = x.clamp(self.x, self.x + self.width);
        let cy = y.clamp(self.y, self.y + self.height);
        (x - cx).hypot(y - cy)
    }

    /// Circle/rectangle overlap via closest-point clamping. Touching is not overlapping.
    pub fn overlaps_circle(&self, x: f64, y: f64, radius: f64) -> bool {
        self.distance_to(x, y) < radius
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub x: f64,
    pub y: f64,
    pub collected: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// What a circle ran into. Obstacles take precedence over the world boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collision {
    Boundary,
    /// Index into [`Arena::obstacles`].
    Obstacle(usize),
}

/// Serializable geometry, for renderers and for building arenas by hand.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ArenaLayout {
    pub width: u32,
    pub height: u32,
    pub obstacles: Vec<Obstacle>,
    pub resources: Vec<Resource>,
    pub goal: Goal,
}

/// Per-episode progress summary.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArenaState {
    pub step: usize,
    pub resources_collected: usize,
    pub resources_remaining: usize,
    pub goal_reached: bool,
}

#[derive(Clone, Debug)]
pub struct Arena {
    config: ArenaConfig,
    obstacles: Vec<Obstacle>,
    index: ObstacleIndex,
    resources: Vec<Resource>,
    goal: Goal,
    step: usize,
    goal_reached: bool,
}

impl Arena {
    /// Generate obstacles, then resources, then a goal clear of the obstacles.
    pub fn generate<R: Rng + ?Sized>(
        config: &ArenaConfig,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let obstacles: Vec<Obstacle> = (0..config.obstacle_count)
            .map(|_| {
                let margin = config.obstacle_margin;
                let x = rng.random_range(margin..=config.width - margin);
                let y = rng.random_range(margin..=config.height - margin);
                let w = rng.random_range(config.obstacle_min_size..=config.obstacle_max_size);
                let h = rng.random_range(config.obstacle_min_size..=config.obstacle_max_size);
                Obstacle::new(x as f64, y as f64, w as f64, h as f64)
            })
            .collect();
        let resources = (0..config.resource_count)
            .map(|_| Resource {
                x: rng.random_range(config.resource_margin..=config.width - config.resource_margin)
                    as f64,
                y: rng.random_range(config.resource_margin..=config.height - config.resource_margin)
                    as f64,
                collected: false,
            })
            .collect();

        let mut arena = Self {
            config: config.clone(),
            index: ObstacleIndex::build(&obstacles),
            obstacles,
            resources,
            goal: Goal {
                x: 0.0,
                y: 0.0,
                radius: config.goal_radius,
            },
            step: 0,
            goal_reached: false,
        };
        let [gx, gy] = match arena.search_clear_point(config.goal_clearance, rng) {
            Some(p) => p,
            None => {
                warn!(
                    attempts = config.placement_attempts,
                    clearance = config.goal_clearance,
                    "no clear goal position found; using arena center"
                );
                arena.center()
            }
        };
        arena.goal.x = gx;
        arena.goal.y = gy;
        debug!(
            obstacles = arena.obstacles.len(),
            resources = arena.resources.len(),
            goal_x = gx,
            goal_y = gy,
            "generated arena"
        );
        Ok(arena)
    }

    /// Build an arena from explicit geometry. Episode state starts cleared
    /// except for the resource flags, which are taken as given.
    pub fn from_layout(config: &ArenaConfig, layout: ArenaLayout) -> Result<Self, ConfigError> {
        let config = ArenaConfig {
            width: layout.width,
            height: layout.height,
            goal_radius: layout.goal.radius,
            ..config.clone()
        };
        config.validate()?;
        Ok(Self {
            index: ObstacleIndex::build(&layout.obstacles),
            obstacles: layout.obstacles,
            resources: layout.resources,
            goal: layout.goal,
            config,
            step: 0,
            goal_reached: false,
        })
    }

    pub fn width(&self) -> f64 {
        self.config.width as f64
    }

    pub fn height(&self) -> f64 {
        self.config.height as f64
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.config.width / 2) as f64,
            (self.config.height / 2) as f64,
        ]
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn max_steps(&self) -> usize {
        self.config.max_steps
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    pub fn resources_remaining(&self) -> usize {
        self.resources.iter().filter(|r| !r.collected).count()
    }

    /// Clear per-episode state; geometry is untouched.
    pub fn reset(&mut self) {
        self.step = 0;
        self.goal_reached = false;
        for r in &mut self.resources {
            r.collected = false;
        }
    }

    pub fn state(&self) -> ArenaState {
        let remaining = self.resources_remaining();
        ArenaState {
            step: self.step,
            resources_collected: self.resources.len() - remaining,
            resources_remaining: remaining,
            goal_reached: self.goal_reached,
        }
    }

    pub fn layout(&self) -> ArenaLayout {
        ArenaLayout {
            width: self.config.width,
            height: self.config.height,
            obstacles: self.obstacles.clone(),
            resources: self.resources.clone(),
            goal: self.goal,
        }
    }

    /// Classify what a circle at `(x, y)` collides with, if anything.
    pub fn collision(&self, x: f64, y: f64, radius: f64) -> Option<Collision> {
        let hit = self
            .index
            .candidates_near([x, y], radius)
            .filter(|&i| self.obstacles[i].overlaps_circle(x, y, radius))
            .min_by(|&a, &b| {
                let da = center_distance(&self.obstacles[a], x, y);
                let db = center_distance(&self.obstacles[b], x, y);
                da.total_cmp(&db).then(a.cmp(&b))
            });
        if let Some(i) = hit {
            return Some(Collision::Obstacle(i));
        }
        let out_of_bounds = x - radius < 0.0
            || x + radius > self.width()
            || y - radius < 0.0
            || y + radius > self.height();
        out_of_bounds.then_some(Collision::Boundary)
    }

    pub fn collides(&self, x: f64, y: f64, radius: f64) -> bool {
        self.collision(x, y, radius).is_some()
    }

    /// Mark every uncollected resource within reach as collected; returns how many.
    pub fn collect_resources(&mut self, x: f64, y: f64, radius: f64) -> usize {
        let reach = radius + self.config.resource_radius;
        let mut collected = 0;
        for r in self.resources.iter_mut().filter(|r| !r.collected) {
            if (x - r.x).hypot(y - r.y) < reach {
                r.collected = true;
                collected += 1;
            }
        }
        collected
    }

    /// True only on the first call of the episode that lands inside the goal.
    pub fn reached_goal(&mut self, x: f64, y: f64, radius: f64) -> bool {
        if self.goal_reached {
            return false;
        }
        if (x - self.goal.x).hypot(y - self.goal.y) < radius + self.goal.radius {
            self.goal_reached = true;
            return true;
        }
        false
    }

    /// Advance the step clock; true once the episode has timed out.
    pub fn advance_step(&mut self) -> bool {
        self.step += 1;
        self.step >= self.config.max_steps
    }

    /// Center of the obstacle nearest to `(x, y)` and its distance.
    pub fn nearest_obstacle(&self, x: f64, y: f64) -> Option<([f64; 2], f64)> {
        self.index
            .nearest_center([x, y])
            .map(|(i, d)| (self.obstacles[i].center(), d))
    }

    /// Random point at least `min_clearance` from every obstacle, or the arena
    /// center once the retry budget is spent.
    pub fn find_safe_point<R: Rng + ?Sized>(&self, min_clearance: f64, rng: &mut R) -> [f64; 2] {
        self.search_clear_point(min_clearance, rng).unwrap_or_else(|| {
            debug!(clearance = min_clearance, "safe point search exhausted; using center");
            self.center()
        })
    }

    fn search_clear_point<R: Rng + ?Sized>(
        &self,
        min_clearance: f64,
        rng: &mut R,
    ) -> Option<[f64; 2]> {
        let margin = self.config.placement_margin;
        (0..self.config.placement_attempts).find_map(|_| {
            let x = rng.random_range(margin..=self.config.width - margin) as f64;
            let y = rng.random_range(margin..=self.config.height - margin) as f64;
            self.obstacles
                .iter()
                .all(|o| o.distance_to(x, y) >= min_clearance)
                .then_some([x, y])
        })
    }
}

fn center_distance(o: &Obstacle, x: f64, y: f64) -> f64 {
    let [cx, cy] = o.center();
    (x - cx).hypot(y - cy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    fn layout(obstacles: Vec<Obstacle>, resources: Vec<[f64; 2]>) -> ArenaLayout {
        ArenaLayout {
            width: 800,
            height: 600,
            obstacles,
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
                y: 500.0,
                radius: 30.0,
            },
        }
    }

    fn arena(obstacles: Vec<Obstacle>, resources: Vec<[f64; 2]>) -> Arena {
        Arena::from_layout(&ArenaConfig::default(), layout(obstacles, resources)).unwrap()
    }

    #[test]
    fn boundary_crossing_collides() {
        let a = arena(vec![], vec![]);
        assert_eq!(a.collision(10.0, 300.0, 15.0), Some(Collision::Boundary));
        assert_eq!(a.collision(790.0, 300.0, 15.0), Some(Collision::Boundary));
        assert_eq!(a.collision(400.0, 5.0, 15.0), Some(Collision::Boundary));
        assert!(!a.collides(400.0, 300.0, 15.0));
    }

    #[test]
    fn rectangle_overlap_uses_closest_point() {
        let a = arena(vec![Obstacle::new(100.0, 100.0, 50.0, 50.0)], vec![]);
        // Diagonal from the corner: AABB-expanded test would hit, closest point does not.
        assert!(!a.collides(90.0, 90.0, 12.0));
        assert!(a.collides(90.0, 90.0, 15.0));
        assert_eq!(a.collision(125.0, 125.0, 1.0), Some(Collision::Obstacle(0)));
    }

    #[test]
    fn obstacle_takes_precedence_over_boundary() {
        let a = arena(vec![Obstacle::new(0.0, 0.0, 40.0, 40.0)], vec![]);
        assert_eq!(a.collision(5.0, 5.0, 15.0), Some(Collision::Obstacle(0)));
    }

    #[test]
    fn resources_are_collected_once() {
        let mut a = arena(vec![], vec![[200.0, 200.0], [210.0, 200.0], [600.0, 400.0]]);
        assert_eq!(a.collect_resources(205.0, 200.0, 15.0), 2);
        assert_eq!(a.collect_resources(205.0, 200.0, 15.0), 0);
        assert_eq!(a.resources_remaining(), 1);
        assert_eq!(a.state().resources_collected, 2);
    }

    #[test]
    fn pickup_radius_adds_resource_radius() {
        let mut a = arena(vec![], vec![[200.0, 200.0]]);
        assert_eq!(a.collect_resources(225.5, 200.0, 15.0), 0);
        assert_eq!(a.collect_resources(224.5, 200.0, 15.0), 1);
    }

    #[test]
    fn goal_latch_fires_once() {
        let mut a = arena(vec![], vec![]);
        assert!(!a.reached_goal(400.0, 300.0, 15.0));
        assert!(a.reached_goal(700.0, 500.0, 15.0));
        assert!(!a.reached_goal(700.0, 500.0, 15.0));
        assert!(a.goal_reached());
    }

    #[test]
    fn reset_clears_episode_state_and_keeps_geometry() {
        let mut a = arena(vec![Obstacle::new(100.0, 100.0, 50.0, 50.0)], vec![[200.0, 200.0]]);
        let before = a.layout();
        a.collect_resources(200.0, 200.0, 15.0);
        a.reached_goal(700.0, 500.0, 15.0);
        a.advance_step();
        a.reset();
        assert_eq!(a.layout(), before);
        assert_eq!(a.step(), 0);
        assert!(!a.goal_reached());
        assert!(a.reached_goal(700.0, 500.0, 15.0));
    }

    #[test]
    fn advance_step_signals_timeout_at_max() {
        let config = ArenaConfig {
            max_steps: 3,
            ..ArenaConfig::default()
        };
        let mut a = Arena::from_layout(&config, layout(vec![], vec![])).unwrap();
        assert!(!a.advance_step());
        assert!(!a.advance_step());
        assert!(a.advance_step());
    }

    #[test]
    fn generated_geometry_respects_bounds_and_goal_clearance() {
        let config = ArenaConfig::default();
        for seed in 0..20 {
            let a = Arena::generate(&config, &mut create_rng(seed)).unwrap();
            assert_eq!(a.obstacles().len(), config.obstacle_count);
            assert_eq!(a.resources().len(), config.resource_count);
            for o in a.obstacles() {
                assert!(o.x >= 50.0 && o.x <= 750.0 && o.y >= 50.0 && o.y <= 550.0);
                assert!((20.0..=100.0).contains(&o.width) && (20.0..=100.0).contains(&o.height));
            }
            for r in a.resources() {
                assert!(r.x >= 20.0 && r.x <= 780.0 && r.y >= 20.0 && r.y <= 580.0);
            }
            let g = a.goal();
            let clear = a.obstacles().iter().all(|o| o.distance_to(g.x, g.y) >= 50.0);
            assert!(clear || [g.x, g.y] == a.center());
        }
    }

    #[test]
    fn safe_point_falls_back_to_center_when_nothing_is_clear() {
        let blanket = Obstacle::new(0.0, 0.0, 800.0, 600.0);
        let a = arena(vec![blanket], vec![]);
        let p = a.find_safe_point(1.0, &mut create_rng(1));
        assert_eq!(p, [400.0, 300.0]);
    }

    #[test]
    fn safe_point_keeps_clearance() {
        let a = arena(vec![Obstacle::new(300.0, 200.0, 100.0, 100.0)], vec![]);
        let mut rng = create_rng(9);
        for _ in 0..50 {
            let [x, y] = a.find_safe_point(35.0, &mut rng);
            assert!(a.obstacles()[0].distance_to(x, y) >= 35.0);
        }
    }

    #[test]
    fn generation_is_deterministic_for_seed() {
        let config = ArenaConfig::default();
        let a = Arena::generate(&config, &mut create_rng(5)).unwrap();
        let b = Arena::generate(&config, &mut create_rng(5)).unwrap();
        assert_eq!(a.layout(), b.layout());
    }
}
