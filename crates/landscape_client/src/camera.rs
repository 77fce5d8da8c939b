use glam::{Mat4, Vec2, Vec3};

use crate::input::InputState;

pub const MIN_DISTANCE: f32 = 20.0;
pub const MAX_DISTANCE: f32 = 500.0;
const ORBIT_SENSITIVITY: f32 = 0.005;
const PAN_SENSITIVITY: f32 = 0.0015;
const ZOOM_STEP: f32 = 0.95;
const MAX_POLAR: f32 = 179.0_f32 * std::f32::consts::PI / 180.0;
const MIN_POLAR: f32 = 0.01;

/// Camera orbiting a target point, steered by mouse drags and the wheel.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Angle around +Y, measured from +Z.
    pub azimuth: f32,
    /// Angle down from +Y.
    pub polar: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_from(Vec3::new(0.0, 50.0, 100.0), Vec3::ZERO)
    }
}

impl OrbitCamera {
    pub fn looking_from(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().clamp(MIN_DISTANCE, MAX_DISTANCE);
        let polar = if offset.length_squared() > 0.0 {
            (offset.y / offset.length()).clamp(-1.0, 1.0).acos()
        } else {
            MIN_POLAR
        };
        Self {
            target,
            distance,
            azimuth: offset.x.atan2(offset.z),
            polar: polar.clamp(MIN_POLAR, MAX_POLAR),
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        let horizontal = self.polar.sin() * self.distance;
        self.target
            + Vec3::new(
                horizontal * self.azimuth.sin(),
                self.polar.cos() * self.distance,
                horizontal * self.azimuth.cos(),
            )
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.azimuth -= delta.x * ORBIT_SENSITIVITY;
        self.polar = (self.polar - delta.y * ORBIT_SENSITIVITY).clamp(MIN_POLAR, MAX_POLAR);
    }

    /// Moves the target in the view plane, scaled by distance.
    pub fn pan(&mut self, delta: Vec2) {
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let scale = self.distance * PAN_SENSITIVITY;
        self.target += (-right * delta.x + up * delta.y) * scale;
    }

    /// Positive `steps` zoom in.
    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance * ZOOM_STEP.powf(steps)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn update(&mut self, input: &InputState) {
        use winit::event::MouseButton;

        if input.is_held(MouseButton::Left) {
            self.orbit(input.mouse_delta);
        } else if input.is_held(MouseButton::Right) {
            self.pan(input.mouse_delta);
        }
        if input.scroll_delta != 0.0 {
            self.zoom(input.scroll_delta);
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position(), self.target, Vec3::Y);
        let projection = Mat4::perspective_rh(
            self.fov,
            self.aspect.max(0.0001),
            self.near.max(0.0001),
            self.far.max(self.near + 0.0001),
        );

        projection * view
    }

    /// Camera-space right and up axes in world space, for billboards.
    pub fn billboard_axes(&self) -> (Vec3, Vec3) {
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        (right, right.cross(forward))
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::{OrbitCamera, MAX_DISTANCE, MIN_DISTANCE};

    #[test]
    fn default_camera_starts_at_initial_position() {
        let camera = OrbitCamera::default();
        assert!((camera.position() - Vec3::new(0.0, 50.0, 100.0)).length() < 1e-3);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn zoom_is_clamped_to_distance_range() {
        let mut camera = OrbitCamera::default();
        camera.zoom(1_000.0);
        assert_eq!(camera.distance, MIN_DISTANCE);
        camera.zoom(-1_000.0);
        assert_eq!(camera.distance, MAX_DISTANCE);

        let mut far = OrbitCamera::looking_from(Vec3::new(0.0, 0.0, 5_000.0), Vec3::ZERO);
        assert_eq!(far.distance, MAX_DISTANCE);
        far.zoom(1.0);
        assert!(far.distance < MAX_DISTANCE);
    }

    #[test]
    fn orbit_keeps_distance_and_stays_off_the_pole() {
        let mut camera = OrbitCamera::default();
        let distance = camera.distance;
        camera.orbit(Vec2::new(300.0, 10_000.0));
        assert!(((camera.position() - camera.target).length() - distance).abs() < 1e-2);
        assert!(camera.polar > 0.0);
        assert!((camera.view_projection_matrix().determinant()).is_finite());
    }

    #[test]
    fn pan_moves_target_and_position_together() {
        let mut camera = OrbitCamera::default();
        let offset = camera.position() - camera.target;
        camera.pan(Vec2::new(40.0, 0.0));
        assert!(camera.target.x.abs() > 0.0);
        assert!(((camera.position() - camera.target) - offset).length() < 1e-3);
    }
}
