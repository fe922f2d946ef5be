use glam::{DMat4, Mat3, Mat4};
use meshbench::ViewState;

/// Converts clip-space coordinates from OpenGL conventions (Z in [-1, 1])
/// to WebGPU conventions (Z in [0, 1]).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

/// Vertical field of view in degrees.
pub const FOV_Y_DEG: f64 = 90.0;
pub const Z_NEAR: f64 = 0.1;
pub const Z_FAR: f64 = 40.0;

/// Eye-space direction towards the light.
pub const LIGHT_DIR: [f32; 3] = [0.0, 2.0, 1.0];

/// Per-frame transforms derived from the view state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub model_view: Mat4,
    pub projection: Mat4,
    /// Inverse-transpose of the model-view rotation, for normals.
    pub normal: Mat3,
}

impl CameraMatrices {
    pub fn from_view(view: &ViewState) -> Self {
        let model_view: DMat4 = view.model_view();
        let projection = DMat4::perspective_rh_gl(
            FOV_Y_DEG.to_radians(),
            view.aspect_ratio(),
            Z_NEAR,
            Z_FAR,
        );
        let model_view = model_view.as_mat4();
        Self {
            model_view,
            projection: OPENGL_TO_WGPU_MATRIX * projection.as_mat4(),
            normal: Mat3::from_mat4(model_view).inverse().transpose(),
        }
    }
}
