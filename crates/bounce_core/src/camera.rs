use glam::{Mat4, Vec3};

bitflags::bitflags! {
    /// Directions requested for this frame. Several may be held at once.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CameraMovement: u8 {
        const FORWARD  = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT     = 1 << 2;
        const RIGHT    = 1 << 3;
    }
}

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;

const MAX_PITCH: f32 = 89.0;
const MIN_ZOOM: f32 = 1.0;
const MAX_ZOOM: f32 = 45.0;

/// Fly camera driven by yaw/pitch in degrees. `zoom` is the vertical field of
/// view, also in degrees.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub world_up: Vec3,

    pub yaw: f32,
    pub pitch: f32,

    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom: f32,

    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
            near: 0.1,
            far: 100.0,
        };
        camera.update_vectors();
        camera
    }

    /// World -> view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Computes the "Projection Matrix" (View -> Clip) for the given aspect ratio.
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect_ratio, self.near, self.far)
    }

    /// Moves along the camera basis by `movement_speed * delta_seconds` per
    /// requested direction.
    pub fn process_keyboard(&mut self, movement: CameraMovement, delta_seconds: f32) {
        let velocity = self.movement_speed * delta_seconds;

        if movement.contains(CameraMovement::FORWARD) {
            self.position += self.front * velocity;
        }
        if movement.contains(CameraMovement::BACKWARD) {
            self.position -= self.front * velocity;
        }
        if movement.contains(CameraMovement::LEFT) {
            self.position -= self.right * velocity;
        }
        if movement.contains(CameraMovement::RIGHT) {
            self.position += self.right * velocity;
        }
    }

    /// Applies a mouse offset (already in "screen up is positive" orientation).
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        }

        self.update_vectors();
    }

    /// Scrolling up narrows the field of view.
    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());

        self.front = front.normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
