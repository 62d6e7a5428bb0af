pub mod capture;
pub mod context;
pub mod error;
pub mod light;
pub mod mesh;
pub mod programs;
pub mod render;
pub mod samples;
pub mod scene;
pub mod shading;
pub mod texture;
pub mod uniforms;

pub use capture::CaptureTarget;
pub use context::{GpuDevice, RenderContext};
pub use error::{ProgramError, RenderError};
pub use light::Light;
pub use render::{FrameInput, RsmRenderer};
pub use samples::RandomSamples;
pub use scene::SceneDesc;
