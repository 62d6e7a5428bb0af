use glam::{Mat4, Vec3};

/// The single static point light. It never moves, so its light-space matrix
/// is computed once at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::new(-8.0, 6.0, 6.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.6),
            specular: Vec3::splat(1.0),
            fov_y_degrees: 60.0,
            aspect: 1.0,
            near_plane: 0.5,
            far_plane: 20.0,
        }
    }
}

impl Light {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Depth range [0, 1], as wgpu expects.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near_plane,
            self.far_plane,
        )
    }

    pub fn light_space_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Inverse of the projection's depth mapping: NDC depth back to view distance.
    pub fn linearize_depth(&self, ndc_depth: f32) -> f32 {
        linearize_depth(ndc_depth, self.near_plane, self.far_plane)
    }
}

/// View distance for a `[0, 1]` depth produced by `Mat4::perspective_rh`.
pub fn linearize_depth(ndc_depth: f32, near: f32, far: f32) -> f32 {
    near * far / (far - ndc_depth * (far - near))
}
