pub mod camera;
pub mod config;
pub mod time;

pub use camera::{Camera, CameraMovement};
pub use config::{AttributeBorder, ConfigError, DebugView, Settings};
pub use time::Time;
