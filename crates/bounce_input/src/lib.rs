pub mod logical;
pub mod physical;

pub use logical::MovementBindings;
pub use physical::{InputState, KeyCode, MouseTracker};
