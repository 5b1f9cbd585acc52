use crate::arena::{Arena, Collision};
use crate::config::AgentConfig;
use crate::constants::{MAX_ACCELERATION, MAX_ENERGY, MAX_ROTATION};
use rand::Rng;
use serde::Serialize;
use std::f64::consts::{PI, TAU};

/// Wrap an angle into `[-PI, PI)`.
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// One step of policy output, already clamped to the actuator limits.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq)]
pub struct Control {
    pub acceleration: f64,
    pub rotation: f64,
}

impl Control {
    /// Clamp raw policy values to `[-1, 1]` and `[-0.5, 0.5]`. NaN becomes 0.
    pub fn clamped(acceleration: f64, rotation: f64) -> Self {
        let sanitize = |v: f64, limit: f64| {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(-limit, limit)
            }
        };
        Self {
            acceleration: sanitize(acceleration, MAX_ACCELERATION),
            rotation: sanitize(rotation, MAX_ROTATION),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Agent {
    pub position: [f64; 2],
    /// Radians, kept within `[-PI, PI)`.
    pub heading: f64,
    pub speed: f64,
    pub radius: f64,
    pub energy: f64,
    pub resources_collected: usize,
    pub collisions: usize,
    pub distance_traveled: f64,
    pub steps_stationary: u32,
    pub steps_since_collection: u32,
    pub goal_reached: bool,
    /// Position at the start of the previous step, for stall detection.
    pub last_position: [f64; 2],
    /// Set by the first non-zero acceleration; enables the speed floor.
    pub moving: bool,
}

impl Agent {
    pub fn new(position: [f64; 2], radius: f64) -> Self {
        Self {
            position,
            heading: 0.0,
            speed: 0.0,
            radius,
            energy: MAX_ENERGY,
            resources_collected: 0,
            collisions: 0,
            distance_traveled: 0.0,
            steps_stationary: 0,
            steps_since_collection: 0,
            goal_reached: false,
            last_position: position,
            moving: false,
        }
    }

    /// Start a fresh episode at `position`; radius is kept.
    pub fn reset(&mut self, position: [f64; 2]) {
        *self = Self::new(position, self.radius);
    }

    /// Advance one step. Returns true when the agent ran out of energy.
    pub fn transition<R: Rng + ?Sized>(
        &mut self,
        control: Control,
        arena: &mut Arena,
        params: &AgentConfig,
        rng: &mut R,
    ) -> bool {
        let mut acceleration = control.acceleration;
        let mut rotation = control.rotation;
        self.heading = wrap_angle(self.heading + rotation);

        let displacement = (self.position[0] - self.last_position[0])
            .hypot(self.position[1] - self.last_position[1]);
        self.last_position = self.position;
        if displacement < params.stationary_epsilon {
            self.steps_stationary += 1;
            if self.steps_stationary > params.stationary_threshold {
                acceleration = acceleration.max(params.forced_acceleration);
                rotation = rng.random_range(-params.escape_rotation..=params.escape_rotation);
                self.heading = wrap_angle(self.heading + rotation);
            }
        } else {
            self.steps_stationary = 0;
        }

        if acceleration != 0.0 {
            self.moving = true;
        }
        let floor = if self.moving { params.min_speed } else { 0.0 };
        self.speed = (self.speed + acceleration).clamp(floor, params.max_speed);

        let [x, y] = self.position;
        let nx = x + self.speed * self.heading.cos();
        let ny = y + self.speed * self.heading.sin();
        match arena.collision(nx, ny, self.radius) {
            Some(hit) => {
                self.collisions += 1;
                self.speed = params.crawl_speed;
                let jitter = rng.random_range(-params.collision_jitter..=params.collision_jitter);
                let away = match hit {
                    Collision::Obstacle(i) => {
                        let [cx, cy] = arena.obstacles()[i].center();
                        (y - cy).atan2(x - cx)
                    }
                    Collision::Boundary => self.heading + PI,
                };
                self.heading = wrap_angle(away + jitter);
            }
            None => {
                self.distance_traveled += (nx - x).hypot(ny - y);
                self.position = [nx, ny];
            }
        }

        let [x, y] = self.position;
        let picked = arena.collect_resources(x, y, self.radius);
        if picked > 0 {
            self.resources_collected += picked;
            self.steps_since_collection = 0;
            self.energy =
                (self.energy + params.resource_energy_bonus * picked as f64).min(MAX_ENERGY);
        } else {
            self.steps_since_collection = self.steps_since_collection.saturating_add(1);
        }
        if !self.goal_reached && arena.reached_goal(x, y, self.radius) {
            self.goal_reached = true;
            self.energy = (self.energy + params.goal_energy_bonus).min(MAX_ENERGY);
        }

        let cost = params.base_energy_cost
            + params.speed_energy_cost * self.speed
            + params.rotation_energy_cost * rotation.abs();
        self.energy = (self.energy - cost).clamp(0.0, MAX_ENERGY);
        self.energy <= 0.0
    }
}
