//! Particle state and the fixed-capacity particle arena.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec3};

/// A single liquid particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// World position, inside `[0, box_size)` after every step.
    pub position: Vec3,
    /// Current velocity.
    pub velocity: Vec3,
    /// Affine velocity matrix `C` (APIC local velocity-gradient model).
    pub affine: Mat3,
}

impl Particle {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            affine: Mat3::ZERO,
        }
    }

    /// A stationary particle at the given position.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO)
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

/// The 80-byte GPU particle record: `position` at offset 0, `velocity` at
/// 16, column-padded 3x3 `C` at 32. The stride is a contract between the
/// compute shaders and the renderer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct GpuParticle {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub velocity: [f32; 3],
    pub _pad1: f32,
    /// mat3x3<f32> columns, each padded to 16 bytes.
    pub affine: [[f32; 4]; 3],
}

impl From<Particle> for GpuParticle {
    fn from(p: Particle) -> Self {
        let c = p.affine.to_cols_array_2d();
        Self {
            position: p.position.to_array(),
            _pad0: 0.0,
            velocity: p.velocity.to_array(),
            _pad1: 0.0,
            affine: [
                [c[0][0], c[0][1], c[0][2], 0.0],
                [c[1][0], c[1][1], c[1][2], 0.0],
                [c[2][0], c[2][1], c[2][2], 0.0],
            ],
        }
    }
}

impl From<GpuParticle> for Particle {
    fn from(p: GpuParticle) -> Self {
        Self {
            position: Vec3::from_array(p.position),
            velocity: Vec3::from_array(p.velocity),
            affine: Mat3::from_cols(
                Vec3::new(p.affine[0][0], p.affine[0][1], p.affine[0][2]),
                Vec3::new(p.affine[1][0], p.affine[1][1], p.affine[1][2]),
                Vec3::new(p.affine[2][0], p.affine[2][1], p.affine[2][2]),
            ),
        }
    }
}

/// Fixed-capacity particle store. Capacity is set once; resets rewrite the
/// contents in place and only move the live count.
pub struct Particles {
    list: Vec<Particle>,
    capacity: usize,
}

impl Particles {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Replace the whole population, truncating to capacity.
    pub fn replace(&mut self, mut particles: Vec<Particle>) {
        particles.truncate(self.capacity);
        self.list = particles;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.list.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.list.iter_mut()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.list
    }

    /// Pack the live particles into the GPU record layout.
    pub fn to_gpu(&self) -> Vec<GpuParticle> {
        self.list.iter().copied().map(GpuParticle::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_particle_stride_is_80() {
        assert_eq!(std::mem::size_of::<GpuParticle>(), 80);
        assert_eq!(std::mem::offset_of!(GpuParticle, position), 0);
        assert_eq!(std::mem::offset_of!(GpuParticle, velocity), 16);
        assert_eq!(std::mem::offset_of!(GpuParticle, affine), 32);
    }

    #[test]
    fn test_gpu_round_trip() {
        let p = Particle {
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::new(-0.5, 0.25, 4.0),
            affine: Mat3::from_cols(
                Vec3::new(1.0, 2.0, 3.0),
                Vec3::new(4.0, 5.0, 6.0),
                Vec3::new(7.0, 8.0, 9.0),
            ),
        };
        let back = Particle::from(GpuParticle::from(p));
        assert_eq!(p, back);
    }

    #[test]
    fn test_replace_respects_capacity() {
        let mut particles = Particles::with_capacity(2);
        particles.replace(vec![Particle::default(); 5]);
        assert_eq!(particles.len(), 2);
        assert_eq!(particles.capacity(), 2);
    }
}
