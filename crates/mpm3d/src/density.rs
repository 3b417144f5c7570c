//! Secondary density lattice for volumetric shading.
//!
//! Independent of the simulation grid in resolution; each particle
//! scatters a unit contribution through the shared B-spline kernel into
//! fixed-point accumulators, which are decoded after the scatter. Runs at
//! whatever cadence the driver picks; it only needs current positions.

use glam::{IVec3, UVec3};

use crate::fixed_point::{decode, encode};
use crate::kernels::quadratic_weights;
use crate::particle::Particle;

/// Fixed-point density lattice. Cell (x, y, z) lives at index
/// `(x * size.y + y) * size.z + z`, matching the GPU buffer the 3D
/// texture is copied from.
pub struct DensityField {
    size: UVec3,
    cells: Vec<i32>,
}

impl DensityField {
    pub fn new(size: UVec3) -> Self {
        Self {
            size,
            cells: vec![0; (size.x * size.y * size.z) as usize],
        }
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    #[inline]
    fn index(&self, cell: IVec3) -> Option<usize> {
        if cell.x < 0
            || cell.y < 0
            || cell.z < 0
            || cell.x >= self.size.x as i32
            || cell.y >= self.size.y as i32
            || cell.z >= self.size.z as i32
        {
            return None;
        }
        Some(
            (cell.x as usize * self.size.y as usize + cell.y as usize) * self.size.z as usize
                + cell.z as usize,
        )
    }

    /// Scatter every particle's unit contribution.
    pub fn scatter(&mut self, particles: &[Particle], multiplier: f32) {
        for p in particles {
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
                        let Some(idx) = self.index(cell) else {
                            continue;
                        };
                        self.cells[idx] =
                            self.cells[idx].wrapping_add(encode(weight, multiplier));
                    }
                }
            }
        }
    }

    /// Decode the whole lattice back to floating point.
    pub fn decode(&self, multiplier_inverse: f32) -> Vec<f32> {
        self.cells
            .iter()
            .map(|&raw| decode(raw, multiplier_inverse))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_scatter_preserves_total_weight() {
        // An interior particle's 27 weights sum to 1; the decoded lattice
        // total must match the particle count within fixed-point error.
        let mut field = DensityField::new(UVec3::new(16, 16, 16));
        let particles: Vec<Particle> = (0..100)
            .map(|i| Particle::at(Vec3::new(4.0 + (i % 7) as f32, 5.3, 6.1 + (i % 3) as f32)))
            .collect();
        field.scatter(&particles, 1e7);
        let total: f32 = field.decode(1e-7).iter().sum();
        assert!(
            (total - 100.0).abs() < 1e-3,
            "decoded density total {} should be ~100",
            total
        );
    }

    #[test]
    fn test_clear_resets_cells() {
        let mut field = DensityField::new(UVec3::new(8, 8, 8));
        field.scatter(&[Particle::at(Vec3::splat(4.0))], 1e7);
        assert!(field.cells().iter().any(|&c| c != 0));
        field.clear();
        assert!(field.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_resolution_independent_of_sim_grid() {
        // The lattice takes its own size; nothing ties it to the domain.
        let field = DensityField::new(UVec3::new(90, 70, 128));
        assert_eq!(field.cells().len(), 90 * 70 * 128);
    }
}
