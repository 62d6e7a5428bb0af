pub mod debug_program;
pub mod light_space_program;
pub mod reflect;
pub mod result_program;
pub mod shader_program;

pub use debug_program::DebugProgram;
pub use light_space_program::LightSpaceProgram;
pub use result_program::ResultProgram;
pub use shader_program::{BindingSlot, ProgramDescriptor, ProgramSources, ShaderProgram};

use crate::error::ProgramError;

/// Holds common WGPU references to simplify function signatures.
pub struct GpuProgramRenderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat, // The on-screen output format
}

pub trait GpuProgram: Sized {
    /// Data required to build the pipeline (layouts, sources, bound textures)
    type InitData<'a>;

    /// Data required to draw a frame
    type DrawData<'a>
    where
        Self: 'a;

    /// 1. INIT: compiles shaders, creates the pipeline layout and the pipeline.
    fn new(ctx: &GpuProgramRenderContext, init_data: Self::InitData<'_>) -> Result<Self, ProgramError>;

    /// 2. RECORD: activates the program and encodes its draws.
    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'_>, data: Self::DrawData<'a>);
}
