//! Camera state and the controller that moves it.
//!
//! [`Camera`] is plain data: where the eye is, what it looks at and the
//! projection parameters. [`CameraController`] mutates it once per frame,
//! either from key presses ([`CameraMode::Manual`]) or by orbiting the target
//! ([`CameraMode::Orbit`]).

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};
use winit::keyboard::KeyCode;

use crate::input::Input;
use crate::math;

/// A perspective camera looking at a target point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(30.0, 30.0, 30.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 75.0_f32.to_radians(),
            near: 0.01,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    pub fn looking_at(mut self, target: impl Into<Vec3>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov_y = fov_degrees.to_radians();
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn view(&self) -> Mat4 {
        math::look_at(self.position, self.target, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        math::perspective(self.fov_y, aspect, self.near, self.far)
    }

    /// Projection times view: world space to clip space.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        math::multiply(self.projection(aspect), self.view())
    }

    /// View-projection without the camera translation, for the skybox.
    pub fn sky_view_projection(&self, aspect: f32) -> Mat4 {
        math::multiply(self.projection(aspect), math::rotation_only(self.view()))
    }
}

/// How the controller moves the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraMode {
    /// Each key press moves the camera by `step` along a world axis.
    Manual { step: f32 },
    /// The camera circles the target at `radius` and `height`; keys are ignored.
    Orbit {
        radius: f32,
        height: f32,
        /// Radians per second.
        speed: f32,
    },
}

impl Default for CameraMode {
    fn default() -> Self {
        CameraMode::Manual { step: 1.0 }
    }
}

impl CameraMode {
    /// Orbit matching the default camera's distance from the origin.
    pub fn default_orbit() -> Self {
        CameraMode::Orbit {
            radius: 30.0,
            height: 30.0,
            speed: 1.0,
        }
    }
}

/// World-space direction bound to each movement key.
pub const MOVE_KEYS: [(KeyCode, Vec3); 6] = [
    (KeyCode::KeyW, Vec3::NEG_Z),
    (KeyCode::KeyS, Vec3::Z),
    (KeyCode::KeyA, Vec3::NEG_X),
    (KeyCode::KeyD, Vec3::X),
    (KeyCode::KeyZ, Vec3::Y),
    (KeyCode::KeyX, Vec3::NEG_Y),
];

#[derive(Clone, Debug, Default)]
pub struct CameraController {
    pub mode: CameraMode,
    angle: f32,
}

impl CameraController {
    pub fn new(mode: CameraMode) -> Self {
        Self { mode, angle: 0.0 }
    }

    /// Current orbit angle in radians, in `[0, 2pi]`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Advances the camera by one frame.
    pub fn update(&mut self, camera: &mut Camera, input: &Input, dt: f32) {
        match self.mode {
            CameraMode::Manual { step } => {
                for (key, direction) in MOVE_KEYS {
                    if input.key_pressed(key) {
                        camera.position += direction * step;
                    }
                }
            }
            CameraMode::Orbit {
                radius,
                height,
                speed,
            } => {
                let next = self.angle + speed * dt;
                self.angle = if next > TAU { 0.0 } else { next };
                camera.position = Vec3::new(
                    self.angle.cos() * radius,
                    height,
                    self.angle.sin() * radius,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn default_camera() {
        let camera = Camera::default();
        assert_eq!(camera.position, Vec3::new(30.0, 30.0, 30.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert!((camera.fov_y - 75.0_f32.to_radians()).abs() < EPS);
        assert_eq!((camera.near, camera.far), (0.01, 100.0));
    }

    #[test]
    fn manual_keys_move_along_axes() {
        let mut camera = Camera::new().at(Vec3::ZERO);
        let mut controller = CameraController::new(CameraMode::Manual { step: 2.0 });
        let mut input = Input::new();

        input.press(KeyCode::KeyW);
        input.press(KeyCode::KeyD);
        input.press(KeyCode::KeyZ);
        controller.update(&mut camera, &input, 0.016);
        assert_eq!(camera.position, Vec3::new(2.0, 2.0, -2.0));

        input.end_frame();
        input.release(KeyCode::KeyW);
        input.release(KeyCode::KeyD);
        input.release(KeyCode::KeyZ);
        input.press(KeyCode::KeyS);
        input.press(KeyCode::KeyA);
        input.press(KeyCode::KeyX);
        controller.update(&mut camera, &input, 0.016);
        assert_eq!(camera.position, Vec3::ZERO);
    }

    #[test]
    fn held_key_moves_once() {
        let mut camera = Camera::new().at(Vec3::ZERO);
        let mut controller = CameraController::new(CameraMode::Manual { step: 1.0 });
        let mut input = Input::new();

        input.press(KeyCode::KeyS);
        controller.update(&mut camera, &input, 0.016);
        input.end_frame();
        controller.update(&mut camera, &input, 0.016);

        assert_eq!(camera.position, Vec3::Z);
    }

    #[test]
    fn orbit_follows_circle_and_ignores_keys() {
        let mut camera = Camera::default();
        let mut controller = CameraController::new(CameraMode::Orbit {
            radius: 30.0,
            height: 30.0,
            speed: 1.0,
        });
        let mut input = Input::new();
        input.press(KeyCode::KeyW);

        controller.update(&mut camera, &input, 0.5);
        let expected = Vec3::new(0.5_f32.cos() * 30.0, 30.0, 0.5_f32.sin() * 30.0);
        assert!((camera.position - expected).length() < EPS);
    }

    #[test]
    fn orbit_angle_wraps_after_full_turn() {
        let mut camera = Camera::default();
        let mut controller = CameraController::new(CameraMode::default_orbit());
        let input = Input::new();

        for _ in 0..6 {
            controller.update(&mut camera, &input, 1.0);
        }
        assert!((controller.angle() - 6.0).abs() < EPS);

        controller.update(&mut camera, &input, 1.0);
        assert_eq!(controller.angle(), 0.0);
        assert!((camera.position - Vec3::new(30.0, 30.0, 0.0)).length() < EPS);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let camera = Camera::default();
        let clip = camera.view_projection(4.0 / 3.0) * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < EPS && ndc.y.abs() < EPS);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn sky_view_ignores_translation() {
        let near = Camera::default();
        let far = near.at(near.position * 2.0);
        assert!(
            near.sky_view_projection(1.0)
                .abs_diff_eq(far.sky_view_projection(1.0), EPS)
        );
    }
}
