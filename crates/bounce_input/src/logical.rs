use bounce_core::CameraMovement;

use crate::physical::{InputState, KeyCode};

/// Maps physical keys to camera movement, plus the key that closes the app.
#[derive(Clone, Debug)]
pub struct MovementBindings {
    pub bindings: Vec<(KeyCode, CameraMovement)>,
    pub close: KeyCode,
}

impl Default for MovementBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                (KeyCode::KeyW, CameraMovement::FORWARD),
                (KeyCode::KeyS, CameraMovement::BACKWARD),
                (KeyCode::KeyA, CameraMovement::LEFT),
                (KeyCode::KeyD, CameraMovement::RIGHT),
            ],
            close: KeyCode::Escape,
        }
    }
}

impl MovementBindings {
    /// Union of the directions whose keys are currently held.
    pub fn movement(&self, input: &InputState) -> CameraMovement {
        self.bindings
            .iter()
            .filter(|(key, _)| input.is_pressed(*key))
            .fold(CameraMovement::empty(), |acc, (_, movement)| acc | *movement)
    }

    pub fn close_requested(&self, input: &InputState) -> bool {
        input.is_pressed(self.close)
    }
}
