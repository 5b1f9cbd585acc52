//! Sensor snapshot: a fixed set of named numeric features derived from the
//! agent and the arena each step. Policy leaves reference features by name.

use crate::agent::{wrap_angle, Agent};
use crate::arena::Arena;
use crate::constants::{COLLECTION_HORIZON_STEPS, FORWARD_CONE_HALF_ANGLE};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ResourceDistance,
    ObstacleDistance,
    GoalDistance,
    ResourceBearing,
    GoalBearing,
    Energy,
    Speed,
    GoalReached,
    StepsStationary,
    ResourcesRemaining,
    GoalDirX,
    GoalDirY,
    ResourceDirX,
    ResourceDirY,
    ResourcesInCone,
    StepsSinceCollection,
}

impl Feature {
    pub const ALL: [Feature; 16] = [
        Feature::ResourceDistance,
        Feature::ObstacleDistance,
        Feature::GoalDistance,
        Feature::ResourceBearing,
        Feature::GoalBearing,
        Feature::Energy,
        Feature::Speed,
        Feature::GoalReached,
        Feature::StepsStationary,
        Feature::ResourcesRemaining,
        Feature::GoalDirX,
        Feature::GoalDirY,
        Feature::ResourceDirX,
        Feature::ResourceDirY,
        Feature::ResourcesInCone,
        Feature::StepsSinceCollection,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::ResourceDistance => "resource_distance",
            Feature::ObstacleDistance => "obstacle_distance",
            Feature::GoalDistance => "goal_distance",
            Feature::ResourceBearing => "resource_bearing",
            Feature::GoalBearing => "goal_bearing",
            Feature::Energy => "energy",
            Feature::Speed => "speed",
            Feature::GoalReached => "goal_reached",
            Feature::StepsStationary => "steps_stationary",
            Feature::ResourcesRemaining => "resources_remaining",
            Feature::GoalDirX => "goal_dir_x",
            Feature::GoalDirY => "goal_dir_y",
            Feature::ResourceDirX => "resource_dir_x",
            Feature::ResourceDirY => "resource_dir_y",
            Feature::ResourcesInCone => "resources_in_cone",
            Feature::StepsSinceCollection => "steps_since_collection",
        }
    }
}

/// Distances with nothing to measure against are `f64::INFINITY`
/// (serialized as `null`).
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct SensorSnapshot {
    pub resource_distance: f64,
    pub obstacle_distance: f64,
    pub goal_distance: f64,
    /// Signed angle from heading to the nearest uncollected resource.
    pub resource_bearing: f64,
    /// Signed angle from heading to the goal center.
    pub goal_bearing: f64,
    pub energy: f64,
    pub speed: f64,
    /// 1.0 once the goal has been reached this episode, else 0.0.
    pub goal_reached: f64,
    pub steps_stationary: f64,
    pub resources_remaining: f64,
    pub goal_dir_x: f64,
    pub goal_dir_y: f64,
    /// Normalized sum of unit vectors towards every uncollected resource.
    pub resource_dir_x: f64,
    pub resource_dir_y: f64,
    /// Fraction of uncollected resources within ±30° of the heading.
    pub resources_in_cone: f64,
    /// Steps since the last pickup over a 100-step horizon, saturating at 1.
    pub steps_since_collection: f64,
}

impl SensorSnapshot {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::ResourceDistance => self.resource_distance,
            Feature::ObstacleDistance => self.obstacle_distance,
            Feature::GoalDistance => self.goal_distance,
            Feature::ResourceBearing => self.resource_bearing,
            Feature::GoalBearing => self.goal_bearing,
            Feature::Energy => self.energy,
            Feature::Speed => self.speed,
            Feature::GoalReached => self.goal_reached,
            Feature::StepsStationary => self.steps_stationary,
            Feature::ResourcesRemaining => self.resources_remaining,
            Feature::GoalDirX => self.goal_dir_x,
            Feature::GoalDirY => self.goal_dir_y,
            Feature::ResourceDirX => self.resource_dir_x,
            Feature::ResourceDirY => self.resource_dir_y,
            Feature::ResourcesInCone => self.resources_in_cone,
            Feature::StepsSinceCollection => self.steps_since_collection,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::ResourceDistance => &mut self.resource_distance,
            Feature::ObstacleDistance => &mut self.obstacle_distance,
            Feature::GoalDistance => &mut self.goal_distance,
            Feature::ResourceBearing => &mut self.resource_bearing,
            Feature::GoalBearing => &mut self.goal_bearing,
            Feature::Energy => &mut self.energy,
            Feature::Speed => &mut self.speed,
            Feature::GoalReached => &mut self.goal_reached,
            Feature::StepsStationary => &mut self.steps_stationary,
            Feature::ResourcesRemaining => &mut self.resources_remaining,
            Feature::GoalDirX => &mut self.goal_dir_x,
            Feature::GoalDirY => &mut self.goal_dir_y,
            Feature::ResourceDirX => &mut self.resource_dir_x,
            Feature::ResourceDirY => &mut self.resource_dir_y,
            Feature::ResourcesInCone => &mut self.resources_in_cone,
            Feature::StepsSinceCollection => &mut self.steps_since_collection,
        };
        *slot = value;
    }
}

/// Read every feature for `agent` in `arena`. Pure: neither argument changes.
pub fn sense(agent: &Agent, arena: &Arena) -> SensorSnapshot {
    let [x, y] = agent.position;
    let bearing_to = |dx: f64, dy: f64| wrap_angle(dy.atan2(dx) - agent.heading);

    let mut remaining = 0usize;
    let mut in_cone = 0usize;
    let mut nearest: Option<(f64, f64)> = None;
    let mut sum = [0.0f64; 2];
    for r in arena.resources().iter().filter(|r| !r.collected) {
        remaining += 1;
        let (dx, dy) = (r.x - x, r.y - y);
        let dist = dx.hypot(dy);
        if dist > 0.0 {
            sum[0] += dx / dist;
            sum[1] += dy / dist;
        }
        let bearing = bearing_to(dx, dy);
        if bearing.abs() <= FORWARD_CONE_HALF_ANGLE {
            in_cone += 1;
        }
        if nearest.is_none_or(|(best, _)| dist < best) {
            nearest = Some((dist, bearing));
        }
    }
    let (resource_distance, resource_bearing) = nearest.unwrap_or((f64::INFINITY, 0.0));
    let [resource_dir_x, resource_dir_y] = unit(sum);
    let resources_in_cone = if remaining > 0 {
        in_cone as f64 / remaining as f64
    } else {
        0.0
    };

    let goal = arena.goal();
    let (gdx, gdy) = (goal.x - x, goal.y - y);
    let [goal_dir_x, goal_dir_y] = unit([gdx, gdy]);

    SensorSnapshot {
        resource_distance,
        obstacle_distance: arena
            .nearest_obstacle(x, y)
            .map_or(f64::INFINITY, |(_, d)| d),
        goal_distance: gdx.hypot(gdy),
        resource_bearing,
        goal_bearing: bearing_to(gdx, gdy),
        energy: agent.energy,
        speed: agent.speed,
        goal_reached: if agent.goal_reached { 1.0 } else { 0.0 },
        steps_stationary: agent.steps_stationary as f64,
        resources_remaining: remaining as f64,
        goal_dir_x,
        goal_dir_y,
        resource_dir_x,
        resource_dir_y,
        resources_in_cone,
        steps_since_collection: (agent.steps_since_collection as f64 / COLLECTION_HORIZON_STEPS)
            .min(1.0),
    }
}

fn unit([x, y]: [f64; 2]) -> [f64; 2] {
    let len = x.hypot(y);
    if len > 0.0 {
        [x / len, y / len]
    } else {
        [0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ArenaLayout, Goal, Obstacle, Resource};
    use crate::config::ArenaConfig;
    use std::f64::consts::FRAC_PI_2;

    fn arena(obstacles: Vec<Obstacle>, resources: Vec<[f64; 2]>) -> Arena {
        let layout = ArenaLayout {
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
                x: 400.0,
                y: 500.0,
                radius: 30.0,
            },
        };
        Arena::from_layout(&ArenaConfig::default(), layout).unwrap()
    }

    #[test]
    fn empty_arena_reports_infinite_distances() {
        let a = arena(vec![], vec![]);
        let s = sense(&Agent::new([400.0, 300.0], 15.0), &a);
        assert_eq!(s.resource_distance, f64::INFINITY);
        assert_eq!(s.obstacle_distance, f64::INFINITY);
        assert_eq!(s.resources_remaining, 0.0);
        assert_eq!(s.resources_in_cone, 0.0);
        assert_eq!([s.resource_dir_x, s.resource_dir_y], [0.0, 0.0]);
    }

    #[test]
    fn goal_direction_and_bearing() {
        let a = arena(vec![], vec![]);
        let s = sense(&Agent::new([400.0, 300.0], 15.0), &a);
        assert!((s.goal_distance - 200.0).abs() < 1e-9);
        assert!(s.goal_dir_x.abs() < 1e-12);
        assert!((s.goal_dir_y - 1.0).abs() < 1e-12);
        assert!((s.goal_bearing - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn nearest_resource_drives_distance_and_bearing() {
        let a = arena(vec![], vec![[100.0, 300.0], [450.0, 300.0], [400.0, 100.0]]);
        let s = sense(&Agent::new([400.0, 300.0], 15.0), &a);
        assert!((s.resource_distance - 50.0).abs() < 1e-9);
        assert!(s.resource_bearing.abs() < 1e-12);
        assert_eq!(s.resources_remaining, 3.0);
        assert!((s.resources_in_cone - 1.0 / 3.0).abs() < 1e-12);
        // East and west cancel, north remains.
        assert!(s.resource_dir_x.abs() < 1e-12);
        assert!((s.resource_dir_y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn obstacle_distance_measures_to_center() {
        let a = arena(vec![Obstacle::new(500.0, 280.0, 40.0, 40.0)], vec![]);
        let s = sense(&Agent::new([400.0, 300.0], 15.0), &a);
        assert!((s.obstacle_distance - 120.0).abs() < 1e-9);
    }

    #[test]
    fn counters_are_exposed_and_normalized() {
        let a = arena(vec![], vec![]);
        let mut agent = Agent::new([400.0, 300.0], 15.0);
        agent.steps_since_collection = 250;
        agent.steps_stationary = 3;
        agent.goal_reached = true;
        let s = sense(&agent, &a);
        assert_eq!(s.steps_since_collection, 1.0);
        assert_eq!(s.steps_stationary, 3.0);
        assert_eq!(s.goal_reached, 1.0);
        agent.steps_since_collection = 25;
        assert_eq!(sense(&agent, &a).steps_since_collection, 0.25);
    }

    #[test]
    fn get_and_set_cover_every_feature() {
        let mut s = SensorSnapshot::default();
        for (i, f) in Feature::ALL.iter().enumerate() {
            s.set(*f, i as f64 + 0.5);
        }
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(s.get(*f), i as f64 + 0.5);
        }
    }

    #[test]
    fn feature_names_match_serde() {
        for f in Feature::ALL {
            let json = serde_json::to_string(&f).unwrap();
            assert_eq!(json, format!("\"{}\"", f.name()));
        }
    }
}
