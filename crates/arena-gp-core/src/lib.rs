pub mod agent;
pub mod arena;
pub mod config;
pub mod constants;
pub mod episode;
pub mod evolution;
pub mod metrics;
pub mod policy;
pub mod rng;
pub mod sensors;
pub mod spatial;

pub use agent::{Agent, Control};
pub use arena::{Arena, ArenaLayout, ArenaState};
pub use config::{ConfigError, RunConfig};
pub use episode::{Episode, Frame, TrialOutcome};
pub use evolution::{Evolution, Individual};
pub use metrics::{GenerationStats, RunSummary};
pub use policy::{Node, Policy, PolicyError, Value};
pub use sensors::{Feature, SensorSnapshot};
