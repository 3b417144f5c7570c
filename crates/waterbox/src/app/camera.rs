//! Orbit camera and pointer tracking.
//!
//! The camera supplies view/projection matrices and the normalized
//! pointer ray; the simulation and renderer treat it purely as a matrix
//! source.

use glam::{Mat4, Vec2, Vec3, Vec4};

pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub sensitivity: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 50.0,
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: 0.35,
            fov: 60.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            sensitivity: 0.005,
        }
    }
}

impl OrbitCamera {
    /// Re-frame for a new scene preset.
    pub fn reset(&mut self, distance: f32, target: Vec3) {
        self.distance = distance;
        self.target = target;
        self.yaw = std::f32::consts::FRAC_PI_2;
        self.pitch = 0.35;
    }

    pub fn position(&self) -> Vec3 {
        let offset = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        ) * self.distance;
        self.target + offset
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    pub fn on_mouse_drag(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw += delta_x * self.sensitivity;
        self.pitch = (self.pitch + delta_y * self.sensitivity).clamp(-1.5, 1.5);
    }

    pub fn on_scroll(&mut self, delta: f32) {
        self.distance = (self.distance - delta * self.distance * 0.1).clamp(5.0, 400.0);
    }

    /// World-space ray through the normalized pointer position
    /// (uv in [0, 1], y down). Returns (origin, direction).
    pub fn pointer_ray(&self, uv: Vec2, aspect: f32) -> (Vec3, Vec3) {
        let inv = (self.projection_matrix(aspect) * self.view_matrix()).inverse();
        let ndc = Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);
        let near = inv * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        (self.position(), (far - near).normalize())
    }

    /// Map a pointer-velocity (normalized screen units per frame) into a
    /// world-space direction on the camera plane.
    pub fn pointer_velocity_world(&self, velocity: Vec2) -> Vec3 {
        let view = self.view_matrix();
        let inv_view = view.inverse();
        let right = inv_view.transform_vector3(Vec3::X);
        let up = inv_view.transform_vector3(Vec3::Y);
        (right * velocity.x - up * velocity.y) * self.distance
    }
}

/// Pointer state sampled once per frame into the interaction snapshot.
#[derive(Default)]
pub struct PointerTracker {
    pub current: Vec2,
    previous: Vec2,
    pub dragging: bool,
}

impl PointerTracker {
    /// Update with a new normalized position; returns nothing, velocity
    /// is read via [`Self::velocity`] after the frame samples it.
    pub fn set_position(&mut self, position: Vec2) {
        self.current = position;
    }

    /// Finite-difference velocity since the last `end_frame`.
    pub fn velocity(&self) -> Vec2 {
        self.current - self.previous
    }

    /// Latch the current position as the next frame's reference.
    pub fn end_frame(&mut self) {
        self.previous = self.current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_points_at_target() {
        let mut camera = OrbitCamera::default();
        camera.reset(40.0, Vec3::new(30.0, 10.0, 30.0));
        let (origin, dir) = camera.pointer_ray(Vec2::new(0.5, 0.5), 16.0 / 9.0);
        let to_target = (camera.target - origin).normalize();
        assert!(
            dir.dot(to_target) > 0.999,
            "center ray {:?} should aim at the target ({:?})",
            dir,
            to_target
        );
    }

    #[test]
    fn test_orbit_distance_clamps() {
        let mut camera = OrbitCamera::default();
        for _ in 0..100 {
            camera.on_scroll(10.0);
        }
        assert!(camera.distance >= 5.0);
        for _ in 0..200 {
            camera.on_scroll(-10.0);
        }
        assert!(camera.distance <= 400.0);
    }

    #[test]
    fn test_pointer_velocity() {
        let mut pointer = PointerTracker::default();
        pointer.set_position(Vec2::new(0.5, 0.5));
        pointer.end_frame();
        pointer.set_position(Vec2::new(0.6, 0.45));
        let v = pointer.velocity();
        assert!((v.x - 0.1).abs() < 1e-6);
        assert!((v.y + 0.05).abs() < 1e-6);
    }
}
