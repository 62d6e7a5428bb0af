use crate::{
    capture::CaptureTarget,
    error::ProgramError,
    light::Light,
    mesh::Vertex,
    programs::{GpuProgram, GpuProgramRenderContext, ProgramDescriptor, ProgramSources, ShaderProgram},
    scene::GpuScene,
    texture::TextureHelper,
    uniforms::{UniformKind, UniformLayout},
};

pub const PROGRAM_NAME: &str = "lightSpaceShader";

pub fn uniform_layout() -> UniformLayout {
    UniformLayout::new()
        .field("lightSpaceMatrix", UniformKind::Mat4)
        .structure(
            "light",
            UniformLayout::new()
                .field("position", UniformKind::Vec3)
                .field("diffuse", UniformKind::Vec3),
        )
}

/// Renders the scene from the light into the capture target.
pub struct LightSpaceProgram {
    pub program: ShaderProgram,
}

pub struct LightSpaceInit<'a> {
    pub sources: &'a ProgramSources,
    pub object_layout: &'a wgpu::BindGroupLayout,
}

impl GpuProgram for LightSpaceProgram {
    type InitData<'a> = LightSpaceInit<'a>;
    type DrawData<'a> = &'a GpuScene;

    fn new(ctx: &GpuProgramRenderContext, init: Self::InitData<'_>) -> Result<Self, ProgramError> {
        let targets = CaptureTarget::color_targets();
        let program = ShaderProgram::new(
            ctx.device,
            init.sources,
            &ProgramDescriptor {
                uniforms: uniform_layout(),
                slots: &[],
                resources: &[],
                extra_layouts: &[init.object_layout],
                vertex_layout: Vertex::desc(),
                targets: &targets,
                depth_stencil: Some(TextureHelper::depth_state(true, wgpu::CompareFunction::Less)),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
        )?;

        program.require_uniforms(&["lightSpaceMatrix", "light.position", "light.diffuse"])?;
        Ok(Self { program })
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'_>, scene: Self::DrawData<'a>) {
        self.program.use_program(render_pass);
        scene.draw_all(render_pass);
    }
}

impl LightSpaceProgram {
    /// Light-space uniforms never change after setup.
    pub fn configure(&mut self, queue: &wgpu::Queue, light: &Light) {
        self.program.set_mat4("lightSpaceMatrix", light.light_space_matrix());
        self.program.set_vec3("light.position", light.position);
        self.program.set_vec3("light.diffuse", light.diffuse);
        self.program.flush(queue);
    }
}
