//! Offscreen GPU checks. Each test returns early when no adapter is available.

use bounce_core::{AttributeBorder, DebugView, Settings};
use bounce_renderer::{
    CaptureTarget, GpuDevice, ProgramError, RenderError, RsmRenderer, SceneDesc,
    error::ShaderStage,
    programs::ProgramSources,
    render::FrameInput,
    texture::{GpuTexture, TextureHelper},
};
use glam::{Mat4, Vec3};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const TARGET_SIZE: u32 = 64;

// No adapter, or one that cannot render the capture formats.
fn gpu() -> Option<GpuDevice> {
    match GpuDevice::headless() {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn settings() -> Settings {
    Settings {
        capture_resolution: 64,
        sample_num: 16,
        seed: Some(7),
        ..Settings::default()
    }
}

fn frame() -> FrameInput {
    let eye = Vec3::new(-4.0, 3.0, 4.0);
    FrameInput {
        view: Mat4::look_at_rh(eye, Vec3::new(-2.0, 1.0, 2.0), Vec3::Y),
        projection: Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0),
        view_pos: eye,
    }
}

struct Offscreen {
    color: GpuTexture,
    depth: GpuTexture,
}

impl Offscreen {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            color: TextureHelper::create_2d(
                device,
                TARGET_SIZE,
                TARGET_SIZE,
                TARGET_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                "Test Target",
            ),
            depth: TextureHelper::create_depth_texture(device, TARGET_SIZE, TARGET_SIZE, "Test Depth"),
        }
    }
}

fn render_frame(gpu: &GpuDevice, renderer: &mut RsmRenderer, target: &Offscreen) {
    renderer.update_frame(&gpu.queue, &frame());
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Test Encoder") });
    renderer.encode(
        &mut encoder,
        &target.color.view,
        &target.depth.view,
        (TARGET_SIZE, TARGET_SIZE),
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));
}

fn read_texture(gpu: &GpuDevice, texture: &wgpu::Texture, bytes_per_pixel: u32) -> Vec<u8> {
    let size = texture.size();
    // widths used here keep rows 256-byte aligned
    let bytes_per_row = size.width * bytes_per_pixel;
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (bytes_per_row * size.height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Readback") });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(size.height),
            },
        },
        size,
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
    gpu.device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    data
}

fn read_normals(gpu: &GpuDevice, renderer: &RsmRenderer) -> Vec<[f32; 4]> {
    let bytes = read_texture(gpu, &renderer.capture().normal.texture, 16);
    bytemuck::cast_slice(&bytes).to_vec()
}

#[test]
fn capture_is_identical_across_frames() {
    let Some(gpu) = gpu() else { return };
    let ctx = gpu.program_context(TARGET_FORMAT);
    let mut renderer =
        RsmRenderer::new(&ctx, gpu.clamp_to_border, &settings(), &SceneDesc::room()).unwrap();
    let target = Offscreen::new(&gpu.device);

    render_frame(&gpu, &mut renderer, &target);
    let first = read_normals(&gpu, &renderer);
    render_frame(&gpu, &mut renderer, &target);
    let second = read_normals(&gpu, &renderer);

    assert_eq!(first, second);
    // the room fills the light's view, so some texels hold real normals
    assert!(first.iter().any(|n| n[3] == 1.0 && n[1] > 0.9));
}

#[test]
fn empty_scene_leaves_only_border_values() {
    let Some(gpu) = gpu() else { return };
    let ctx = gpu.program_context(TARGET_FORMAT);
    let settings = Settings {
        attribute_border: AttributeBorder::Zero,
        ..settings()
    };
    let mut renderer = RsmRenderer::new(&ctx, gpu.clamp_to_border, &settings, &SceneDesc::default()).unwrap();
    let target = Offscreen::new(&gpu.device);

    render_frame(&gpu, &mut renderer, &target);
    assert!(read_normals(&gpu, &renderer).iter().all(|n| *n == [0.0; 4]));

    // nothing drawn: the main view is just the clear colour
    let pixels = read_texture(&gpu, &target.color.texture, 4);
    let first = &pixels[..4];
    assert!(pixels.chunks(4).all(|p| p == first));
}

/// Builds a renderer whose light-space program is read from a scratch directory.
fn with_light_space_sources(
    gpu: &GpuDevice,
    tag: &str,
    vertex: &str,
    fragment: &str,
) -> Result<RsmRenderer, RenderError> {
    let dir = std::env::temp_dir().join(format!("bounce-shaders-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("lightSpaceShader.vert.wgsl"), vertex).unwrap();
    std::fs::write(dir.join("lightSpaceShader.frag.wgsl"), fragment).unwrap();

    let settings = Settings {
        shader_dir: Some(dir.clone()),
        ..settings()
    };
    let ctx = gpu.program_context(TARGET_FORMAT);
    let result = RsmRenderer::new(&ctx, gpu.clamp_to_border, &settings, &SceneDesc::room());
    std::fs::remove_dir_all(&dir).ok();
    result
}

#[test]
fn broken_shader_source_is_a_compile_error() {
    let Some(gpu) = gpu() else { return };
    let result = with_light_space_sources(&gpu, "broken", "fn vs_main( {", "");

    match result {
        Err(RenderError::Program(ProgramError::Compile { stage, .. })) => {
            assert_eq!(stage, ShaderStage::Vertex)
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("broken shader compiled"),
    }
}

#[test]
fn debug_view_replaces_the_shaded_view() {
    let Some(gpu) = gpu() else { return };
    let ctx = gpu.program_context(TARGET_FORMAT);
    let settings = Settings {
        debug_view: Some(DebugView::Normal),
        ..settings()
    };
    let mut renderer = RsmRenderer::new(&ctx, gpu.clamp_to_border, &settings, &SceneDesc::room()).unwrap();
    assert!(renderer.debug_view_active());

    let target = Offscreen::new(&gpu.device);
    render_frame(&gpu, &mut renderer, &target);
    let pixels = read_texture(&gpu, &target.color.texture, 4);
    // ground and back wall normals show up as different colours
    let first = &pixels[..4];
    assert!(pixels.chunks(4).any(|p| p != first));
}

#[test]
fn renderer_resources_follow_settings() {
    let Some(gpu) = gpu() else { return };
    let ctx = gpu.program_context(TARGET_FORMAT);
    let renderer = RsmRenderer::new(&ctx, gpu.clamp_to_border, &settings(), &SceneDesc::room()).unwrap();

    assert!(!renderer.debug_view_active());
    assert_eq!(renderer.samples().len(), 16);
    assert_eq!(renderer.scene().len(), 11);
    assert_eq!(renderer.light().position, Vec3::new(-8.0, 6.0, 6.0));
    assert_eq!(renderer.random_texture().format(), wgpu::TextureFormat::Rgba32Float);
    assert_eq!(renderer.random_texture().texture.width(), 16);

    let capture = renderer.capture();
    assert_eq!(capture.resolution, 64);
    assert_eq!(capture.normal.format(), CaptureTarget::NORMAL_FORMAT);
    assert_eq!(capture.flux.format(), CaptureTarget::FLUX_FORMAT);
    assert_eq!(capture.hardware_border, gpu.clamp_to_border);
}

#[test]
fn reordered_uniform_struct_is_rejected() {
    let Some(gpu) = gpu() else { return };
    let embedded = ProgramSources::embedded("lightSpaceShader").unwrap();
    let swap = |source: &str| {
        source.replacen(
            "    position: vec3<f32>,\n    diffuse: vec3<f32>,",
            "    diffuse: vec3<f32>,\n    position: vec3<f32>,",
            1,
        )
    };

    let result = with_light_space_sources(
        &gpu,
        "reordered",
        &swap(&embedded.vertex),
        &swap(&embedded.fragment),
    );
    match result {
        Err(RenderError::Program(ProgramError::UniformLayout { stage, message, .. })) => {
            assert_eq!(stage, ShaderStage::Vertex);
            assert!(message.contains("light.position"), "{message}");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("mismatched uniform struct accepted"),
    }
}

#[test]
fn sample_count_beyond_device_limit_is_an_error() {
    let Some(gpu) = gpu() else { return };
    let max = gpu.device.limits().max_texture_dimension_1d;
    let settings = Settings {
        sample_num: max + 1,
        ..settings()
    };
    let ctx = gpu.program_context(TARGET_FORMAT);
    assert!(matches!(
        RsmRenderer::new(&ctx, gpu.clamp_to_border, &settings, &SceneDesc::room()),
        Err(RenderError::Limit {
            setting: "sample_num",
            ..
        })
    ));
}
