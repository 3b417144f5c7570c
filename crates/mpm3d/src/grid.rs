//! Dense fixed-point accumulation grid for the MLS-MPM transfers.

use bytemuck::{Pod, Zeroable};
use glam::{IVec3, UVec3, Vec3};

use crate::solver::SimError;

/// One grid cell: fixed-point mass and momentum accumulators.
///
/// Matches the 16-byte GPU cell layout (`mass` at offset 0, `momentum.xyz`
/// at 4/8/12). After the grid-update stage the momentum lanes hold the
/// cell *velocity*, still fixed-point encoded.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Cell {
    pub mass: i32,
    pub momentum: [i32; 3],
}

/// Dense cell lattice covering the simulation domain.
///
/// Allocated once at `max_grid_count` cells and never reallocated; a reset
/// only moves the logical extent. Cell (x, y, z) lives at index
/// `(x * size.y + y) * size.z + z` (x-major), the same convention the WGSL
/// stages use.
pub struct FixedPointGrid {
    size: UVec3,
    max_grid_count: usize,
    cells: Vec<Cell>,
}

/// Number of cells needed to cover `box_size`, one cell per unit.
pub fn grid_count_for(box_size: Vec3) -> usize {
    (box_size.x.ceil() as usize) * (box_size.y.ceil() as usize) * (box_size.z.ceil() as usize)
}

impl FixedPointGrid {
    pub fn new(max_grid_count: usize) -> Self {
        Self {
            size: UVec3::ZERO,
            max_grid_count,
            cells: vec![Cell::default(); max_grid_count],
        }
    }

    /// Re-extent the lattice for a new domain. Fails without touching any
    /// state when the domain needs more cells than were preallocated.
    pub fn resize(&mut self, box_size: Vec3) -> Result<(), SimError> {
        let grid_count = grid_count_for(box_size);
        if grid_count > self.max_grid_count {
            return Err(SimError::GridCapacityExceeded {
                grid_count,
                max_grid_count: self.max_grid_count,
            });
        }
        self.size = UVec3::new(
            box_size.x.ceil() as u32,
            box_size.y.ceil() as u32,
            box_size.z.ceil() as u32,
        );
        self.clear();
        Ok(())
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Number of cells in the active lattice.
    pub fn grid_count(&self) -> usize {
        (self.size.x * self.size.y * self.size.z) as usize
    }

    pub fn max_grid_count(&self) -> usize {
        self.max_grid_count
    }

    /// Zero every active cell.
    pub fn clear(&mut self) {
        let n = self.grid_count();
        self.cells[..n].fill(Cell::default());
    }

    /// Flat index of a cell, or None outside the active lattice.
    #[inline]
    pub fn index(&self, cell: IVec3) -> Option<usize> {
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

    pub fn cells(&self) -> &[Cell] {
        &self.cells[..self.grid_count()]
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        let n = self.grid_count();
        &mut self.cells[..n]
    }

    /// Accumulate fixed-point mass and momentum into a cell.
    ///
    /// Wrapping add mirrors the GPU's `atomicAdd` overflow behavior; a
    /// correctly chosen multiplier keeps values far from the wrap.
    #[inline]
    pub fn accumulate(&mut self, index: usize, mass: i32, momentum: [i32; 3]) {
        let cell = &mut self.cells[index];
        cell.mass = cell.mass.wrapping_add(mass);
        cell.momentum[0] = cell.momentum[0].wrapping_add(momentum[0]);
        cell.momentum[1] = cell.momentum[1].wrapping_add(momentum[1]);
        cell.momentum[2] = cell.momentum[2].wrapping_add(momentum[2]);
    }

    /// Accumulate momentum only (second P2G pass).
    #[inline]
    pub fn accumulate_momentum(&mut self, index: usize, momentum: [i32; 3]) {
        let cell = &mut self.cells[index];
        cell.momentum[0] = cell.momentum[0].wrapping_add(momentum[0]);
        cell.momentum[1] = cell.momentum[1].wrapping_add(momentum[1]);
        cell.momentum[2] = cell.momentum[2].wrapping_add(momentum[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_is_16_bytes() {
        assert_eq!(std::mem::size_of::<Cell>(), 16);
        assert_eq!(std::mem::offset_of!(Cell, mass), 0);
        assert_eq!(std::mem::offset_of!(Cell, momentum), 4);
    }

    #[test]
    fn test_grid_count_rounds_up() {
        assert_eq!(grid_count_for(Vec3::new(60.0, 50.0, 60.0)), 180_000);
        assert_eq!(grid_count_for(Vec3::new(10.5, 10.0, 10.0)), 1_100);
    }

    #[test]
    fn test_resize_rejects_oversized_domain() {
        let mut grid = FixedPointGrid::new(1_000);
        let err = grid.resize(Vec3::new(20.0, 20.0, 20.0)).unwrap_err();
        assert_eq!(
            err,
            SimError::GridCapacityExceeded {
                grid_count: 8_000,
                max_grid_count: 1_000
            }
        );
        // Nothing was mutated.
        assert_eq!(grid.size(), UVec3::ZERO);
        assert_eq!(grid.grid_count(), 0);
    }

    #[test]
    fn test_index_bounds() {
        let mut grid = FixedPointGrid::new(1_000);
        grid.resize(Vec3::new(8.0, 9.0, 10.0)).unwrap();
        assert_eq!(grid.index(IVec3::new(0, 0, 0)), Some(0));
        assert_eq!(grid.index(IVec3::new(0, 0, 1)), Some(1));
        assert_eq!(grid.index(IVec3::new(0, 1, 0)), Some(10));
        assert_eq!(grid.index(IVec3::new(1, 0, 0)), Some(90));
        assert_eq!(grid.index(IVec3::new(-1, 0, 0)), None);
        assert_eq!(grid.index(IVec3::new(8, 0, 0)), None);
        assert_eq!(grid.index(IVec3::new(7, 8, 9)), Some(719));
    }

    #[test]
    fn test_clear_zeroes_active_cells() {
        let mut grid = FixedPointGrid::new(1_000);
        grid.resize(Vec3::new(5.0, 5.0, 5.0)).unwrap();
        grid.accumulate(17, 42, [1, -2, 3]);
        grid.clear();
        assert!(grid.cells().iter().all(|c| *c == Cell::default()));
    }
}
