use bounce_core::Settings;
use glam::{Mat4, Vec3};

use crate::{
    capture::CaptureTarget,
    context::RenderContext,
    error::{ProgramError, RenderError},
    light::Light,
    programs::{
        DebugProgram, GpuProgram, GpuProgramRenderContext, LightSpaceProgram, ProgramSources,
        ResultProgram, debug_program, debug_program::DebugInit, light_space_program,
        light_space_program::LightSpaceInit, result_program, result_program::ResultInit,
        result_program::ResultSetup,
    },
    samples::{RandomSamples, clock_seed},
    scene::{GpuScene, SceneDesc},
    shading::Material,
    texture::GpuTexture,
};

/// Background of the main view.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// Camera state for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_pos: Vec3,
}

/// Rejects settings whose textures the device cannot create.
pub fn check_limits(settings: &Settings, limits: &wgpu::Limits) -> Result<(), RenderError> {
    let checks = [
        ("sample_num", settings.sample_num, limits.max_texture_dimension_1d),
        (
            "capture_resolution",
            settings.capture_resolution,
            limits.max_texture_dimension_2d,
        ),
    ];

    match checks.into_iter().find(|(_, value, max)| value > max) {
        Some((setting, value, max)) => Err(RenderError::Limit {
            setting,
            value,
            max,
        }),
        None => Ok(()),
    }
}

/// Drives the two passes: light-space capture, then the shaded main view.
pub struct RsmRenderer {
    light: Light,
    capture: CaptureTarget,
    samples: RandomSamples,
    random_texture: GpuTexture,
    scene: GpuScene,
    light_space: LightSpaceProgram,
    result: ResultProgram,
    debug: Option<DebugProgram>,
}

impl RsmRenderer {
    /// Allocates the capture target and sample texture, uploads the scene and
    /// builds the programs. Light-space or result program failures are fatal;
    /// a broken debug program only disables the debug view.
    pub fn new(
        ctx: &GpuProgramRenderContext,
        clamp_to_border: bool,
        settings: &Settings,
        scene: &SceneDesc,
    ) -> Result<Self, RenderError> {
        check_limits(settings, &ctx.device.limits())?;

        let light = Light::default();
        let capture = CaptureTarget::new(
            ctx.device,
            settings.capture_resolution,
            settings.attribute_border,
            clamp_to_border,
        );

        let seed = settings.seed.unwrap_or_else(clock_seed);
        log::info!("Generating {} samples (seed {seed})", settings.sample_num);
        let samples = RandomSamples::generate(settings.sample_num as usize, seed);
        let random_texture = samples.upload(ctx.device, ctx.queue);

        let scene = GpuScene::upload(ctx.device, scene);
        let shader_dir = settings.shader_dir.as_deref();

        let sources = ProgramSources::load(light_space_program::PROGRAM_NAME, shader_dir)?;
        let mut light_space = LightSpaceProgram::new(
            ctx,
            LightSpaceInit {
                sources: &sources,
                object_layout: scene.object_layout(),
            },
        )?;
        light_space.configure(ctx.queue, &light);

        let sources = ProgramSources::load(result_program::PROGRAM_NAME, shader_dir)?;
        let mut result = ResultProgram::new(
            ctx,
            ResultInit {
                sources: &sources,
                object_layout: scene.object_layout(),
                capture: &capture,
                random: &random_texture,
            },
        )?;
        result.configure(
            ctx.queue,
            &ResultSetup {
                light: &light,
                material: Material::default(),
                sample_num: settings.sample_num,
                sample_radius: settings.sample_radius,
                shadow_bias: settings.shadow_bias,
                attribute_border: settings.attribute_border,
            },
        );

        let debug = settings.debug_view.and_then(|view| {
            match Self::debug_program(ctx, &capture, shader_dir) {
                Ok(mut program) => {
                    program.configure(ctx.queue, &light, view);
                    log::info!("Debug view enabled: showing {view:?}");
                    Some(program)
                }
                Err(err) => {
                    log::warn!("Debug view disabled: {err}");
                    None
                }
            }
        });

        log::info!(
            "Pipeline compiled ({} -> {})",
            light_space.program.name(),
            result.program.name()
        );

        Ok(Self {
            light,
            capture,
            samples,
            random_texture,
            scene,
            light_space,
            result,
            debug,
        })
    }

    fn debug_program(
        ctx: &GpuProgramRenderContext,
        capture: &CaptureTarget,
        shader_dir: Option<&std::path::Path>,
    ) -> Result<DebugProgram, ProgramError> {
        let sources = ProgramSources::load(debug_program::PROGRAM_NAME, shader_dir)?;
        DebugProgram::new(
            ctx,
            DebugInit {
                sources: &sources,
                capture,
            },
        )
    }

    pub fn light(&self) -> &Light {
        &self.light
    }

    pub fn capture(&self) -> &CaptureTarget {
        &self.capture
    }

    pub fn samples(&self) -> &RandomSamples {
        &self.samples
    }

    pub fn random_texture(&self) -> &GpuTexture {
        &self.random_texture
    }

    pub fn scene(&self) -> &GpuScene {
        &self.scene
    }

    pub fn debug_view_active(&self) -> bool {
        self.debug.is_some()
    }

    /// Uploads the per-frame uniforms (camera position, view, projection).
    pub fn update_frame(&mut self, queue: &wgpu::Queue, frame: &FrameInput) {
        self.result
            .update_view(queue, frame.view, frame.projection, frame.view_pos);
    }

    /// Pass 1: the scene as seen from the light, into all four attachments.
    pub fn encode_capture(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut render_pass = self.capture.begin_pass(encoder);
        self.light_space.record(&mut render_pass, &self.scene);
    }

    /// Pass 2: the shaded view (or the debug quad) into `target`.
    pub fn encode_main(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        (width, height): (u32, u32),
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);

        match &self.debug {
            Some(debug) => debug.record(&mut render_pass, ()),
            None => self.result.record(&mut render_pass, &self.scene),
        }
    }

    /// Both passes, in order, on one encoder.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        size: (u32, u32),
    ) {
        self.encode_capture(encoder);
        self.encode_main(encoder, target, depth, size);
    }

    /// Renders and presents one frame. Skipped frames (lost surface) are not errors.
    pub fn render(&mut self, ctx: &mut RenderContext, frame: &FrameInput) -> Result<(), RenderError> {
        let Some(surface_texture) = ctx.acquire()? else {
            return Ok(());
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.update_frame(&ctx.gpu.queue, frame);

        let mut encoder = ctx
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.encode(&mut encoder, &view, &ctx.depth_texture.view, ctx.size());

        ctx.gpu.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        log::trace!("Frame presented");
        Ok(())
    }
}
