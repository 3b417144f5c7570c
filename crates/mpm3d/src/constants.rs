//! Tuned constants for the MLS-MPM liquid solver.
//!
//! The simulation is unitless: grid spacing is 1, every particle has unit
//! mass, and the constants below are calibrated for that scale rather than
//! for SI units.

/// Gravity acceleration applied to grid velocities, negative Y.
pub const GRAVITY: f32 = -0.3;

/// Upper bound on the timestep at simulation speed 1.0. Larger steps put
/// the explicit integration outside its stability region; behavior beyond
/// this bound is undefined (not detected).
pub const MAX_DT: f32 = 0.4;

/// Default equation-of-state stiffness.
pub const DEFAULT_STIFFNESS: f32 = 50.0;

/// Default rest density (particles per cell at rest, roughly).
pub const DEFAULT_REST_DENSITY: f32 = 3.0;

/// Default dynamic viscosity coefficient.
pub const DEFAULT_DYNAMIC_VISCOSITY: f32 = 0.1;

/// Default fixed-point scale for grid accumulation.
///
/// Must be large enough that encode/decode keeps sub-unit precision
/// (error is bounded by 1/multiplier) and small enough that a cell cannot
/// overflow i32: a cell sees at most a few mass-units and velocity-scale
/// momentum from the particles overlapping it, so the accumulated
/// magnitude stays well below `i32::MAX / multiplier`.
pub const DEFAULT_FIXED_POINT_MULTIPLIER: f32 = 1e7;

/// Lattice spacing used when seeding the dam-break block.
pub const SEED_SPACING: f32 = 0.9;
