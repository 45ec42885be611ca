/// FPS-style viewport camera
use nalgebra::{Matrix4, Point3, Vector3};

use crate::input::{KeyState, NavKey};

/// Viewport navigation camera: pitch/yaw orientation plus a position,
/// driven by the fixed keymap and camera-drag mouse deltas.
pub struct FlyCamera {
    pub position: Point3<f32>,
    /// Degrees, clamped to [-90, 90] so the view never flips over the pole.
    pitch: f32,
    /// Degrees, wrapped into [0, 360).
    yaw: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl FlyCamera {
    pub fn new() -> Self {
        Self {
            position: Point3::new(0.0, 1.0, 5.0),
            pitch: 0.0,
            yaw: 0.0,
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    fn rotation_matrix(&self) -> Matrix4<f32> {
        let pitch = Matrix4::new_rotation(Vector3::new(self.pitch.to_radians(), 0.0, 0.0));
        let yaw = Matrix4::new_rotation(Vector3::new(0.0, self.yaw.to_radians(), 0.0));
        pitch * yaw
    }

    /// World-space view direction.
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation_matrix()
            .transpose()
            .transform_vector(&Vector3::new(0.0, 0.0, -1.0))
    }

    /// View matrix: rotation applied to a translation by -position.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.rotation_matrix() * Matrix4::new_translation(&(-self.position.coords))
    }

    pub fn projection_matrix(&self, width: f32, height: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(width / height, self.fov, self.near, self.far)
    }

    /// Advance the position from the held navigation keys.
    ///
    /// The keymap builds a view-local move vector which is carried into
    /// world space through the inverse of the current rotation, so
    /// "forward" always means "where the camera looks".
    pub fn update(&mut self, dt: f32, move_speed: f32, keys: &KeyState) {
        let mut local = Vector3::zeros();
        if keys.is_down(NavKey::Forward) {
            local.z -= 1.0;
        }
        if keys.is_down(NavKey::Back) {
            local.z += 1.0;
        }
        if keys.is_down(NavKey::Left) {
            local.x -= 1.0;
        }
        if keys.is_down(NavKey::Right) {
            local.x += 1.0;
        }
        if keys.is_down(NavKey::Up) {
            local.y += 1.0;
        }
        if keys.is_down(NavKey::Down) {
            local.y -= 1.0;
        }
        if local == Vector3::zeros() {
            return;
        }
        let world = self
            .rotation_matrix()
            .transpose()
            .transform_vector(&(local * move_speed * dt));
        self.position += world;
    }

    /// Accumulate a camera-drag mouse delta into the orientation.
    pub fn look(&mut self, dx: f32, dy: f32, rotate_speed: f32) {
        self.yaw = (self.yaw + dx * rotate_speed).rem_euclid(360.0);
        self.pitch = (self.pitch + dy * rotate_speed).clamp(-90.0, 90.0);
    }
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new()
    }
}
