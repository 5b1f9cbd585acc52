use std::f64::consts::FRAC_PI_6;

/// Upper bound of the agent energy scale; energy lives in `[0, MAX_ENERGY]`.
pub const MAX_ENERGY: f64 = 100.0;

/// Control clamp for the acceleration channel (`[-MAX_ACCELERATION, MAX_ACCELERATION]`).
pub const MAX_ACCELERATION: f64 = 1.0;

/// Control clamp for the rotation channel, radians per step.
pub const MAX_ROTATION: f64 = 0.5;

/// Random constants in policy leaves are drawn from `[-CONSTANT_RANGE, CONSTANT_RANGE]`.
pub const CONSTANT_RANGE: f64 = 5.0;

/// Half-angle of the forward cone used by the `resources_in_cone` feature (±30°).
pub const FORWARD_CONE_HALF_ANGLE: f64 = FRAC_PI_6;

/// Steps after which `steps_since_collection` saturates at 1.0.
pub const COLLECTION_HORIZON_STEPS: f64 = 100.0;

/// Prime multiplier used to derive per-individual RNG streams from a base seed.
/// Chosen so streams for consecutive individuals have minimal overlap.
pub const RNG_DERIVATION_PRIME: u64 = 7919;

/// Prime multiplier for the trial index within one individual's evaluation.
pub const RNG_TRIAL_PRIME: u64 = 104_729;

/// Stride between generations; larger than any individual/trial offset in practice.
pub const RNG_GENERATION_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;
