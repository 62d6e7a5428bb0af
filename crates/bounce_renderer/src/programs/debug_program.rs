use bounce_core::DebugView;

use crate::{
    capture::CaptureTarget,
    error::ProgramError,
    light::Light,
    mesh::{FULLSCREEN_QUAD, GpuGeometry, QuadVertex},
    programs::{
        BindingSlot, GpuProgram, GpuProgramRenderContext, ProgramDescriptor, ProgramSources,
        ShaderProgram,
    },
    texture::TextureHelper,
    uniforms::{UniformKind, UniformLayout},
};

pub const PROGRAM_NAME: &str = "debug";

pub fn uniform_layout() -> UniformLayout {
    UniformLayout::new()
        .field("near_plane", UniformKind::Float)
        .field("far_plane", UniformKind::Float)
        .field("debug_view", UniformKind::Int)
}

/// Shows one capture buffer on a full-screen quad.
pub struct DebugProgram {
    pub program: ShaderProgram,
    quad: GpuGeometry,
}

pub struct DebugInit<'a> {
    pub sources: &'a ProgramSources,
    pub capture: &'a CaptureTarget,
}

impl GpuProgram for DebugProgram {
    type InitData<'a> = DebugInit<'a>;
    type DrawData<'a> = ();

    fn new(ctx: &GpuProgramRenderContext, init: Self::InitData<'_>) -> Result<Self, ProgramError> {
        let capture = init.capture;
        let slots = [
            BindingSlot::DEPTH_2D,
            BindingSlot::FLOAT_2D,
            BindingSlot::FLOAT_2D,
            BindingSlot::FLOAT_2D,
            BindingSlot::NEAREST_SAMPLER,
            BindingSlot::NEAREST_SAMPLER,
        ];
        let resources = [
            wgpu::BindingResource::TextureView(&capture.depth.view),
            wgpu::BindingResource::TextureView(&capture.normal.view),
            wgpu::BindingResource::TextureView(&capture.world_pos.view),
            wgpu::BindingResource::TextureView(&capture.flux.view),
            wgpu::BindingResource::Sampler(&capture.depth_sampler),
            wgpu::BindingResource::Sampler(&capture.attribute_sampler),
        ];

        let program = ShaderProgram::new(
            ctx.device,
            init.sources,
            &ProgramDescriptor {
                uniforms: uniform_layout(),
                slots: &slots,
                resources: &resources,
                extra_layouts: &[],
                vertex_layout: QuadVertex::desc(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                // shares the main pass, which has a depth attachment
                depth_stencil: Some(TextureHelper::depth_state(false, wgpu::CompareFunction::Always)),
                topology: wgpu::PrimitiveTopology::TriangleStrip,
            },
        )?;
        program.require_uniforms(&["near_plane", "far_plane", "debug_view"])?;

        let quad = GpuGeometry::new(
            ctx.device,
            "Debug Quad",
            &FULLSCREEN_QUAD,
            None,
            wgpu::PrimitiveTopology::TriangleStrip,
        );

        Ok(Self { program, quad })
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'_>, _data: Self::DrawData<'a>) {
        self.program.use_program(render_pass);
        self.quad.draw(render_pass);
    }
}

impl DebugProgram {
    pub fn configure(&mut self, queue: &wgpu::Queue, light: &Light, view: DebugView) {
        self.program.set_float("near_plane", light.near_plane);
        self.program.set_float("far_plane", light.far_plane);
        self.program.set_int("debug_view", view.shader_index());
        self.program.flush(queue);
    }
}
