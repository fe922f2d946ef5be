//! Camera and display parameters shared by the scheduler and the graphics backend.

use glam::{DMat4, DVec3};

/// Default tilt around the X axis, degrees.
pub const DEFAULT_ROTATION_X: f64 = -10.0;
/// Default spin around the Y axis, degrees.
pub const DEFAULT_ROTATION_Y: f64 = -20.0;
/// Default distance along -Z.
pub const DEFAULT_FORWARD: f64 = -1.5;
/// Spin speed while auto-rotation is enabled, degrees per rendered millisecond.
pub const ROTATION_DEGREES_PER_MS: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub width: u32,
    pub height: u32,
    /// Rotation around X in degrees.
    pub rotation_x: f64,
    /// Rotation around Y in degrees.
    pub rotation_y: f64,
    /// Translation along Z applied before rotating.
    pub forward: f64,
    /// Whether the model spins with elapsed render time.
    pub rotating: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(600, 600)
    }
}

impl ViewState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rotation_x: DEFAULT_ROTATION_X,
            rotation_y: DEFAULT_ROTATION_Y,
            forward: DEFAULT_FORWARD,
            rotating: true,
        }
    }

    pub fn reset_rotation(&mut self) {
        self.rotation_x = DEFAULT_ROTATION_X;
        self.rotation_y = DEFAULT_ROTATION_Y;
    }

    /// Spins the model proportionally to the last frame's render time.
    pub fn advance_rotation(&mut self, elapsed_ms: u64) {
        self.rotation_y += ROTATION_DEGREES_PER_MS * elapsed_ms as f64;
    }

    /// Applies a mouse drag in pixels: vertical motion tilts, horizontal spins.
    pub fn drag(&mut self, dx: f64, dy: f64) {
        self.rotation_x += dy;
        self.rotation_y += dx;
    }

    pub fn move_forward(&mut self, delta: f64) {
        self.forward += delta;
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width.max(1)) / f64::from(self.height.max(1))
    }

    /// Model-view transform: translate along Z, then spin around Y, then tilt around X.
    pub fn model_view(&self) -> DMat4 {
        DMat4::from_translation(DVec3::new(0.0, 0.0, self.forward))
            * DMat4::from_rotation_y(self.rotation_y.to_radians())
            * DMat4::from_rotation_x(self.rotation_x.to_radians())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_advances_with_time() {
        let mut view = ViewState::default();
        view.advance_rotation(50);
        assert!((view.rotation_y - (DEFAULT_ROTATION_Y + 1.0)).abs() < 1e-12);
        view.reset_rotation();
        assert_eq!(view.rotation_y, DEFAULT_ROTATION_Y);
    }

    #[test]
    fn test_model_view_translates_origin() {
        let view = ViewState::default();
        let origin = view.model_view().transform_point3(DVec3::ZERO);
        assert!((origin - DVec3::new(0.0, 0.0, DEFAULT_FORWARD)).length() < 1e-12);
    }
}
