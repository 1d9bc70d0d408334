//! Camera and view management.

use glam::{Mat4, Vec3};

/// A fixed perspective camera.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Camera {
    /// Creates the default viewing camera for the given aspect ratio.
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(-2.0, 4.0, 8.0),
            target: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::Y,
            fov: 45.0_f32.to_radians(),
            aspect_ratio,
            near: 0.01,
            far: 100.0,
        }
    }

    /// Creates a camera for a viewport of `width` x `height` pixels.
    #[allow(clippy::cast_precision_loss)]
    pub fn for_viewport(width: u32, height: u32) -> Self {
        Self::new(width as f32 / height.max(1) as f32)
    }

    /// Sets the aspect ratio.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect_ratio = aspect;
    }

    /// Returns the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix (depth range `[0, 1]`).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Returns the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1.5)
    }
}
