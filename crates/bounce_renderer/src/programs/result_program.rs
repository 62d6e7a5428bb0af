use bounce_core::AttributeBorder;
use glam::{Mat4, Vec3};

use crate::{
    capture::CaptureTarget,
    error::ProgramError,
    light::Light,
    mesh::Vertex,
    programs::{
        BindingSlot, GpuProgram, GpuProgramRenderContext, ProgramDescriptor, ProgramSources,
        ShaderProgram,
    },
    scene::GpuScene,
    shading::Material,
    texture::{GpuTexture, TextureHelper},
    uniforms::{UniformKind, UniformLayout},
};

pub const PROGRAM_NAME: &str = "result_shader";

/// Block members the driver writes; checked once the program is built.
pub const REQUIRED_UNIFORMS: [&str; 17] = [
    "view",
    "projection",
    "lightSpaceMatrix",
    "viewPos",
    "sample_num",
    "material.ambient",
    "material.specular",
    "material.shininess",
    "light.position",
    "light.ambient",
    "light.diffuse",
    "light.specular",
    "sample_radius",
    "shadow_bias",
    "near_plane",
    "far_plane",
    "attribute_border",
];

pub fn uniform_layout() -> UniformLayout {
    UniformLayout::new()
        .field("view", UniformKind::Mat4)
        .field("projection", UniformKind::Mat4)
        .field("lightSpaceMatrix", UniformKind::Mat4)
        .field("viewPos", UniformKind::Vec3)
        .field("sample_num", UniformKind::Int)
        .structure(
            "material",
            UniformLayout::new()
                .field("ambient", UniformKind::Vec3)
                .field("specular", UniformKind::Vec3)
                .field("shininess", UniformKind::Float),
        )
        .structure(
            "light",
            UniformLayout::new()
                .field("position", UniformKind::Vec3)
                .field("ambient", UniformKind::Vec3)
                .field("diffuse", UniformKind::Vec3)
                .field("specular", UniformKind::Vec3),
        )
        .field("sample_radius", UniformKind::Float)
        .field("shadow_bias", UniformKind::Float)
        .field("near_plane", UniformKind::Float)
        .field("far_plane", UniformKind::Float)
        .field("attribute_border", UniformKind::Float)
}

/// Parameters fixed at setup.
#[derive(Debug, Clone, Copy)]
pub struct ResultSetup<'a> {
    pub light: &'a Light,
    pub material: Material,
    pub sample_num: u32,
    pub sample_radius: f32,
    pub shadow_bias: f32,
    pub attribute_border: AttributeBorder,
}

/// The shaded main view: direct light, shadows and the one-bounce estimate.
pub struct ResultProgram {
    pub program: ShaderProgram,
}

pub struct ResultInit<'a> {
    pub sources: &'a ProgramSources,
    pub object_layout: &'a wgpu::BindGroupLayout,
    pub capture: &'a CaptureTarget,
    pub random: &'a GpuTexture,
}

impl GpuProgram for ResultProgram {
    type InitData<'a> = ResultInit<'a>;
    type DrawData<'a> = &'a GpuScene;

    fn new(ctx: &GpuProgramRenderContext, init: Self::InitData<'_>) -> Result<Self, ProgramError> {
        let capture = init.capture;

        // bindings 1..=7: depthMap, normalMap, worldPosMap, fluxMap, randomMap, samplers
        let slots = [
            BindingSlot::DEPTH_2D,
            BindingSlot::FLOAT_2D,
            BindingSlot::FLOAT_2D,
            BindingSlot::FLOAT_2D,
            BindingSlot::FLOAT_1D,
            BindingSlot::NEAREST_SAMPLER,
            BindingSlot::NEAREST_SAMPLER,
        ];
        let resources = [
            wgpu::BindingResource::TextureView(&capture.depth.view),
            wgpu::BindingResource::TextureView(&capture.normal.view),
            wgpu::BindingResource::TextureView(&capture.world_pos.view),
            wgpu::BindingResource::TextureView(&capture.flux.view),
            wgpu::BindingResource::TextureView(&init.random.view),
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
                extra_layouts: &[init.object_layout],
                vertex_layout: Vertex::desc(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                depth_stencil: Some(TextureHelper::depth_state(true, wgpu::CompareFunction::Less)),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
        )?;

        program.require_uniforms(&REQUIRED_UNIFORMS)?;
        Ok(Self { program })
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'_>, scene: Self::DrawData<'a>) {
        self.program.use_program(render_pass);
        scene.draw_all(render_pass);
    }
}

impl ResultProgram {
    /// Uniforms that stay fixed for the whole run.
    pub fn configure(&mut self, queue: &wgpu::Queue, setup: &ResultSetup) {
        let light = setup.light;
        let program = &mut self.program;

        program.set_vec3("material.ambient", setup.material.ambient);
        program.set_vec3("material.specular", setup.material.specular);
        program.set_float("material.shininess", setup.material.shininess);
        program.set_vec3("light.position", light.position);
        program.set_vec3("light.ambient", light.ambient);
        program.set_vec3("light.diffuse", light.diffuse);
        program.set_vec3("light.specular", light.specular);
        program.set_mat4("lightSpaceMatrix", light.light_space_matrix());
        program.set_int("sample_num", setup.sample_num.min(i32::MAX as u32) as i32);
        program.set_float("sample_radius", setup.sample_radius);
        program.set_float("shadow_bias", setup.shadow_bias);
        program.set_float("near_plane", light.near_plane);
        program.set_float("far_plane", light.far_plane);
        program.set_float("attribute_border", setup.attribute_border.value());
        program.flush(queue);
    }

    /// Camera-dependent uniforms, uploaded every frame.
    pub fn update_view(&mut self, queue: &wgpu::Queue, view: Mat4, projection: Mat4, view_pos: Vec3) {
        self.program.set_vec3("viewPos", view_pos);
        self.program.set_mat4("view", view);
        self.program.set_mat4("projection", projection);
        self.program.flush(queue);
    }
}
