//! The MLS-MPM step: scatter, grid update, gather.
//!
//! One step runs a fixed stage sequence over the particle arena and the
//! fixed-point grid:
//!
//! 1. clear grid
//! 2. scatter mass + APIC momentum (P2G pass 1)
//! 3. scatter pressure/viscosity forces (P2G pass 2)
//! 4. grid update: momentum -> velocity, gravity, wall boundaries
//! 5. gather velocity and affine matrix, advect (G2P)
//!
//! Scatter and gather share the kernel in [`crate::kernels`]; the weight
//! symmetry between the two directions is what conserves momentum across
//! the round trip. All grid accumulation is fixed-point (see
//! [`crate::fixed_point`]) so stage results are independent of particle
//! evaluation order.
//!
//! The depth-gated pointer force needs the renderer's depth map and
//! therefore lives only in the GPU port (`update_grid.wgsl`); this
//! reference implementation applies gravity and boundaries.

use std::error::Error;
use std::fmt;

use glam::{IVec3, Mat3, Vec3};

use crate::constants::GRAVITY;
use crate::fixed_point::{decode, encode};
use crate::grid::{grid_count_for, FixedPointGrid};
use crate::kernels::{quadratic_weights, APIC_D_INVERSE};
use crate::params::{InteractionInput, SimulationConstants};
use crate::particle::Particles;
use crate::seed;

/// Errors raised by reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// The requested domain needs more grid cells than were preallocated.
    /// Raised before any buffer is touched.
    GridCapacityExceeded {
        grid_count: usize,
        max_grid_count: usize,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::GridCapacityExceeded {
                grid_count,
                max_grid_count,
            } => write!(
                f,
                "domain needs {} grid cells but only {} are preallocated",
                grid_count, max_grid_count
            ),
        }
    }
}

impl Error for SimError {}

/// CPU MLS-MPM simulation over a fixed-capacity particle arena and grid.
pub struct Simulation {
    constants: SimulationConstants,
    particles: Particles,
    grid: FixedPointGrid,
    init_box_size: Vec3,
    real_box_size: Vec3,
}

impl Simulation {
    pub fn new(
        constants: SimulationConstants,
        max_particle_count: usize,
        max_grid_count: usize,
    ) -> Self {
        Self {
            constants,
            particles: Particles::with_capacity(max_particle_count),
            grid: FixedPointGrid::new(max_grid_count),
            init_box_size: Vec3::ZERO,
            real_box_size: Vec3::ZERO,
        }
    }

    /// Re-seed the dam break into a new domain. Fails on a capacity
    /// violation without mutating any state; otherwise returns the number
    /// of particles actually placed (which may be below the request).
    pub fn reset(&mut self, box_size: Vec3, particle_count: usize) -> Result<usize, SimError> {
        let grid_count = grid_count_for(box_size);
        if grid_count > self.grid.max_grid_count() {
            return Err(SimError::GridCapacityExceeded {
                grid_count,
                max_grid_count: self.grid.max_grid_count(),
            });
        }

        self.grid.resize(box_size)?;
        self.init_box_size = box_size;
        self.real_box_size = box_size;

        let requested = particle_count.min(self.particles.capacity());
        let seeded = seed::dam_break(box_size, requested, &mut rand::thread_rng());
        self.particles.replace(seeded);
        Ok(self.particles.len())
    }

    /// Move the animated domain extent. Same-value calls change nothing
    /// beyond rewriting the identical bound.
    pub fn set_box_size(&mut self, real_box_size: Vec3) {
        self.real_box_size = real_box_size;
    }

    pub fn constants(&self) -> &SimulationConstants {
        &self.constants
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn grid(&self) -> &FixedPointGrid {
        &self.grid
    }

    pub fn init_box_size(&self) -> Vec3 {
        self.init_box_size
    }

    pub fn real_box_size(&self) -> Vec3 {
        self.real_box_size
    }

    /// Advance one timestep, or nothing when paused.
    pub fn step(&mut self, input: &InteractionInput) {
        if !input.running || self.particles.is_empty() {
            return;
        }
        self.grid.clear();
        self.scatter_mass();
        self.scatter_forces(input.dt);
        self.update_grid(input.dt);
        self.gather_particles(input.dt);
    }

    /// P2G pass 1: mass and APIC momentum.
    fn scatter_mass(&mut self) {
        let m = self.constants.fixed_point_multiplier;
        let grid = &mut self.grid;

        for p in self.particles.iter() {
            let base = p.position.floor();
            let diff = (p.position - base) - 0.5;
            let wx = quadratic_weights(diff.x);
            let wy = quadratic_weights(diff.y);
            let wz = quadratic_weights(diff.z);
            let base = base.as_ivec3();

            for gx in 0..3i32 {
                for gy in 0..3i32 {
                    for gz in 0..3i32 {
                        let weight =
                            wx[gx as usize] * wy[gy as usize] * wz[gz as usize];
                        let cell = base + IVec3::new(gx - 1, gy - 1, gz - 1);
                        let Some(idx) = grid.index(cell) else {
                            continue;
                        };
                        let dist = (cell.as_vec3() - p.position) + 0.5;
                        let contrib = (p.velocity + p.affine * dist) * weight;
                        grid.accumulate(
                            idx,
                            encode(weight, m),
                            [
                                encode(contrib.x, m),
                                encode(contrib.y, m),
                                encode(contrib.z, m),
                            ],
                        );
                    }
                }
            }
        }
    }

    /// P2G pass 2: equation-of-state pressure and viscosity forces,
    /// scattered as momentum deltas.
    fn scatter_forces(&mut self, dt: f32) {
        let m = self.constants.fixed_point_multiplier;
        let m_inv = self.constants.multiplier_inverse();
        let grid = &mut self.grid;

        for p in self.particles.iter() {
            let base = p.position.floor();
            let diff = (p.position - base) - 0.5;
            let wx = quadratic_weights(diff.x);
            let wy = quadratic_weights(diff.y);
            let wz = quadratic_weights(diff.z);
            let base = base.as_ivec3();

            // Local density from the mass field populated by pass 1.
            let mut density = 0.0;
            for gx in 0..3i32 {
                for gy in 0..3i32 {
                    for gz in 0..3i32 {
                        let weight =
                            wx[gx as usize] * wy[gy as usize] * wz[gz as usize];
                        let cell = base + IVec3::new(gx - 1, gy - 1, gz - 1);
                        let Some(idx) = grid.index(cell) else {
                            continue;
                        };
                        density += weight * decode(grid.cells()[idx].mass, m_inv);
                    }
                }
            }
            if density <= 0.0 {
                continue;
            }

            let volume = 1.0 / density;
            let pressure =
                self.constants.stiffness * (density - self.constants.rest_density).max(0.0);

            let dudv = p.affine + p.affine.transpose();
            let stress = Mat3::from_diagonal(Vec3::splat(-pressure))
                + dudv * self.constants.dynamic_viscosity;
            let eq16 = stress * (-volume * APIC_D_INVERSE * dt);

            for gx in 0..3i32 {
                for gy in 0..3i32 {
                    for gz in 0..3i32 {
                        let weight =
                            wx[gx as usize] * wy[gy as usize] * wz[gz as usize];
                        let cell = base + IVec3::new(gx - 1, gy - 1, gz - 1);
                        let Some(idx) = grid.index(cell) else {
                            continue;
                        };
                        let dist = (cell.as_vec3() - p.position) + 0.5;
                        let momentum = (eq16 * dist) * weight;
                        grid.accumulate_momentum(
                            idx,
                            [
                                encode(momentum.x, m),
                                encode(momentum.y, m),
                                encode(momentum.z, m),
                            ],
                        );
                    }
                }
            }
        }
    }

    /// Grid update: momentum to velocity, gravity, wall boundaries.
    ///
    /// After this stage the momentum lanes hold the cell *velocity*,
    /// fixed-point encoded, which is what the gather reads.
    fn update_grid(&mut self, dt: f32) {
        let m = self.constants.fixed_point_multiplier;
        let m_inv = self.constants.multiplier_inverse();
        let size = self.grid.size();
        let real = self.real_box_size;

        for x in 0..size.x as i32 {
            for y in 0..size.y as i32 {
                for z in 0..size.z as i32 {
                    let idx = self
                        .grid
                        .index(IVec3::new(x, y, z))
                        .expect("cell inside active lattice");
                    let cell = self.grid.cells()[idx];
                    if cell.mass <= 0 {
                        continue;
                    }

                    let mass = decode(cell.mass, m_inv);
                    let mut v = Vec3::new(
                        decode(cell.momentum[0], m_inv),
                        decode(cell.momentum[1], m_inv),
                        decode(cell.momentum[2], m_inv),
                    ) / mass;

                    v.y += GRAVITY * dt;

                    // Zero the outward component at the walls; the upper
                    // walls follow the animated extent.
                    if x < 1 && v.x < 0.0 {
                        v.x = 0.0;
                    }
                    if x as f32 > real.x - 2.0 && v.x > 0.0 {
                        v.x = 0.0;
                    }
                    if y < 1 && v.y < 0.0 {
                        v.y = 0.0;
                    }
                    if y as f32 > real.y - 2.0 && v.y > 0.0 {
                        v.y = 0.0;
                    }
                    if z < 1 && v.z < 0.0 {
                        v.z = 0.0;
                    }
                    if z as f32 > real.z - 2.0 && v.z > 0.0 {
                        v.z = 0.0;
                    }

                    let cell = &mut self.grid.cells_mut()[idx];
                    cell.momentum = [encode(v.x, m), encode(v.y, m), encode(v.z, m)];
                }
            }
        }
    }

    /// G2P: gather velocity and the affine matrix, then advect.
    fn gather_particles(&mut self, dt: f32) {
        let m_inv = self.constants.multiplier_inverse();
        let real = self.real_box_size;
        let grid = &self.grid;

        for p in self.particles.iter_mut() {
            let base = p.position.floor();
            let diff = (p.position - base) - 0.5;
            let wx = quadratic_weights(diff.x);
            let wy = quadratic_weights(diff.y);
            let wz = quadratic_weights(diff.z);
            let base = base.as_ivec3();

            let mut velocity = Vec3::ZERO;
            let mut b = Mat3::ZERO;

            for gx in 0..3i32 {
                for gy in 0..3i32 {
                    for gz in 0..3i32 {
                        let weight =
                            wx[gx as usize] * wy[gy as usize] * wz[gz as usize];
                        let cell = base + IVec3::new(gx - 1, gy - 1, gz - 1);
                        let Some(idx) = grid.index(cell) else {
                            continue;
                        };
                        let c = grid.cells()[idx];
                        let dist = (cell.as_vec3() - p.position) + 0.5;
                        let w_vel = Vec3::new(
                            decode(c.momentum[0], m_inv),
                            decode(c.momentum[1], m_inv),
                            decode(c.momentum[2], m_inv),
                        ) * weight;
                        velocity += w_vel;
                        // Outer product w_vel (x) dist, accumulated column-wise.
                        b += Mat3::from_cols(w_vel * dist.x, w_vel * dist.y, w_vel * dist.z);
                    }
                }
            }

            p.affine = b * APIC_D_INVERSE;
            p.velocity = velocity;
            p.position += velocity * dt;
            p.position = p
                .position
                .clamp(Vec3::ONE, real - 2.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_constants() -> SimulationConstants {
        SimulationConstants::default()
    }

    #[test]
    fn test_reset_reports_placed_count() {
        let mut sim = Simulation::new(quiet_constants(), 200_000, 200_000);
        let placed = sim.reset(Vec3::new(60.0, 50.0, 60.0), 40_000).unwrap();
        assert_eq!(placed, 40_000);
        assert_eq!(sim.particles().len(), 40_000);
        assert_eq!(sim.grid().grid_count(), 180_000);
    }

    #[test]
    fn test_paused_step_is_a_no_op() {
        let mut sim = Simulation::new(quiet_constants(), 10_000, 200_000);
        sim.reset(Vec3::new(20.0, 20.0, 20.0), 1_000).unwrap();
        let before: Vec<_> = sim.particles().as_slice().to_vec();
        sim.step(&InteractionInput {
            dt: 0.2,
            running: false,
            ..Default::default()
        });
        assert_eq!(sim.particles().as_slice(), before.as_slice());
    }

    #[test]
    fn test_gravity_pulls_particles_down() {
        let mut sim = Simulation::new(quiet_constants(), 10_000, 200_000);
        sim.reset(Vec3::new(20.0, 20.0, 20.0), 1_000).unwrap();
        let mean_y_before: f32 = sim
            .particles()
            .iter()
            .map(|p| p.position.y)
            .sum::<f32>()
            / sim.particles().len() as f32;
        for _ in 0..20 {
            sim.step(&InteractionInput {
                dt: 0.2,
                running: true,
                ..Default::default()
            });
        }
        let mean_y_after: f32 = sim
            .particles()
            .iter()
            .map(|p| p.position.y)
            .sum::<f32>()
            / sim.particles().len() as f32;
        assert!(
            mean_y_after < mean_y_before,
            "fluid should fall: {} -> {}",
            mean_y_before,
            mean_y_after
        );
    }
}
