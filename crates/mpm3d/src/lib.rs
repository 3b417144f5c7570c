//! 3D MLS-MPM liquid simulation (CPU reference implementation).
//!
//! This crate implements the Moving-Least-Squares Material Point Method for
//! a weakly compressible liquid: particles carry position, velocity and an
//! affine velocity matrix `C`, and each step transfers momentum to a dense
//! background grid, updates the grid under gravity and boundary conditions,
//! and gathers the result back onto the particles.
//!
//! Grid accumulation goes through an i32 fixed-point encoding so that the
//! scatter is exactly order-independent. The GPU port in the `waterbox`
//! crate runs the same algorithm in WGSL compute shaders against the same
//! buffer layouts; this crate is the semantic reference and hosts the
//! property tests.
//!
//! # Example
//!
//! ```
//! use mpm3d::{InteractionInput, Simulation, SimulationConstants};
//! use glam::Vec3;
//!
//! let mut sim = Simulation::new(SimulationConstants::default(), 50_000, 200_000);
//! let placed = sim.reset(Vec3::new(30.0, 30.0, 30.0), 5_000).unwrap();
//! assert!(placed <= 5_000);
//!
//! sim.step(&InteractionInput {
//!     dt: 0.2,
//!     running: true,
//!     ..Default::default()
//! });
//! ```

pub mod constants;
pub mod density;
pub mod fixed_point;
pub mod grid;
pub mod kernels;
pub mod params;
pub mod particle;
pub mod seed;
pub mod solver;

pub use grid::{Cell, FixedPointGrid};
pub use params::{builtin_presets, InteractionInput, ScenePreset, SimulationConstants};
pub use particle::{GpuParticle, Particle, Particles};
pub use solver::{SimError, Simulation};
