//! Simulation parameters, scene presets, and the per-frame input snapshot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DYNAMIC_VISCOSITY, DEFAULT_FIXED_POINT_MULTIPLIER, DEFAULT_REST_DENSITY,
    DEFAULT_STIFFNESS,
};
use crate::grid::grid_count_for;

/// Material and encoding constants, fixed at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConstants {
    /// Equation-of-state stiffness.
    pub stiffness: f32,
    /// Rest density; pressure is zero at or below it.
    pub rest_density: f32,
    /// Dynamic viscosity coefficient.
    pub dynamic_viscosity: f32,
    /// Fixed-point scale for grid accumulation. See
    /// [`crate::constants::DEFAULT_FIXED_POINT_MULTIPLIER`] for the
    /// precision/overflow constraint it must satisfy.
    pub fixed_point_multiplier: f32,
}

impl Default for SimulationConstants {
    fn default() -> Self {
        Self {
            stiffness: DEFAULT_STIFFNESS,
            rest_density: DEFAULT_REST_DENSITY,
            dynamic_viscosity: DEFAULT_DYNAMIC_VISCOSITY,
            fixed_point_multiplier: DEFAULT_FIXED_POINT_MULTIPLIER,
        }
    }
}

impl SimulationConstants {
    pub fn multiplier_inverse(&self) -> f32 {
        1.0 / self.fixed_point_multiplier
    }
}

/// A selectable simulation scale: particle count plus the domain and
/// camera framing tuned for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenePreset {
    pub name: String,
    pub particle_count: usize,
    pub box_size: [f32; 3],
    pub camera_distance: f32,
    pub camera_target_y: f32,
    pub interaction_radius: f32,
}

/// The built-in scale presets. Buffer preallocation is sized for the
/// largest of these.
pub fn builtin_presets() -> Vec<ScenePreset> {
    vec![
        ScenePreset {
            name: "Small (40k)".into(),
            particle_count: 40_000,
            box_size: [60.0, 50.0, 60.0],
            camera_distance: 50.0,
            camera_target_y: 10.0,
            interaction_radius: 15.0,
        },
        ScenePreset {
            name: "Medium (70k)".into(),
            particle_count: 70_000,
            box_size: [70.0, 50.0, 70.0],
            camera_distance: 60.0,
            camera_target_y: 12.0,
            interaction_radius: 15.0,
        },
        ScenePreset {
            name: "Large (100k)".into(),
            particle_count: 100_000,
            box_size: [80.0, 70.0, 80.0],
            camera_distance: 70.0,
            camera_target_y: 12.0,
            interaction_radius: 15.0,
        },
        ScenePreset {
            name: "Very large (180k)".into(),
            particle_count: 180_000,
            box_size: [90.0, 70.0, 90.0],
            camera_distance: 80.0,
            camera_target_y: 15.0,
            interaction_radius: 18.0,
        },
    ]
}

/// Particle capacity needed to hold any preset.
pub fn max_particle_count(presets: &[ScenePreset]) -> usize {
    presets.iter().map(|p| p.particle_count).max().unwrap_or(0)
}

/// Grid capacity needed to hold any preset's domain.
pub fn max_grid_count(presets: &[ScenePreset]) -> usize {
    presets
        .iter()
        .map(|p| grid_count_for(p.box_size.into()))
        .max()
        .unwrap_or(0)
}

/// Per-frame interaction snapshot, passed into the step by value. The
/// driver builds a fresh one each frame; nothing in the solver reads
/// mutable UI state directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct InteractionInput {
    /// Pointer position, normalized to [0, 1] over the viewport.
    pub pointer: Vec2,
    /// Pointer velocity: finite difference of the normalized position
    /// over the frame.
    pub pointer_velocity: Vec2,
    /// Interaction radius in world units; zero disables the force.
    pub radius: f32,
    /// Timestep for this frame, already scaled by the speed setting.
    pub dt: f32,
    /// False pauses the step entirely.
    pub running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let c = SimulationConstants::default();
        assert_eq!(c.stiffness, 50.0);
        assert_eq!(c.rest_density, 3.0);
        assert_eq!(c.dynamic_viscosity, 0.1);
        assert_eq!(c.fixed_point_multiplier, 1e7);
        assert!((c.multiplier_inverse() - 1e-7).abs() < 1e-12);
    }

    #[test]
    fn test_preset_capacities() {
        let presets = builtin_presets();
        assert_eq!(max_particle_count(&presets), 180_000);
        // Largest domain is 90 x 70 x 90.
        assert_eq!(max_grid_count(&presets), 90 * 70 * 90);
    }

    #[test]
    fn test_presets_serialize() {
        let presets = builtin_presets();
        let json = serde_json::to_string_pretty(&presets).unwrap();
        let back: Vec<ScenePreset> = serde_json::from_str(&json).unwrap();
        assert_eq!(presets, back);
    }
}
