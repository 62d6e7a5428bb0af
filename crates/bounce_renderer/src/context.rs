use std::sync::Arc;

use winit::window::Window;

use crate::{
    capture::CaptureTarget,
    error::RenderError,
    programs::GpuProgramRenderContext,
    texture::{GpuTexture, TextureHelper},
};

/// Adapter, device and queue, with or without a surface.
pub struct GpuDevice {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// `ADDRESS_MODE_CLAMP_TO_BORDER` was available and enabled.
    pub clamp_to_border: bool,
}

impl GpuDevice {
    pub fn request(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, RenderError> {
        // pollster blocks on the async adapter/device requests
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface,
            force_fallback_adapter: false,
        }))?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let clamp_to_border = adapter
            .features()
            .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER);
        let required_features = if clamp_to_border {
            wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER
        } else {
            wgpu::Features::empty()
        };

        let adapter_limits = adapter.limits();
        check_capture_support(
            adapter
                .get_texture_format_features(CaptureTarget::NORMAL_FORMAT)
                .allowed_usages,
            adapter_limits.max_color_attachment_bytes_per_sample,
        )?;

        // two Rgba32Float targets plus flux exceed the default 32 bytes per sample
        let required_limits = wgpu::Limits {
            max_color_attachment_bytes_per_sample: adapter_limits
                .max_color_attachment_bytes_per_sample,
            ..wgpu::Limits::default().using_resolution(adapter_limits.clone())
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Bounce Device"),
            required_features,
            required_limits,
            ..Default::default()
        }))?;

        Ok(Self {
            adapter,
            device,
            queue,
            clamp_to_border,
        })
    }

    /// Device without a window, for offscreen work and tests.
    pub fn headless() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        Self::request(&instance, None)
    }

    pub fn program_context(&self, format: wgpu::TextureFormat) -> GpuProgramRenderContext<'_> {
        GpuProgramRenderContext {
            device: &self.device,
            queue: &self.queue,
            format,
        }
    }
}

/// Fails unless the adapter can render the capture attachments.
pub fn check_capture_support(
    float_usages: wgpu::TextureUsages,
    max_bytes_per_sample: u32,
) -> Result<(), RenderError> {
    if !float_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
        return Err(RenderError::UnsupportedAdapter(format!(
            "{:?} is not renderable",
            CaptureTarget::NORMAL_FORMAT
        )));
    }
    if max_bytes_per_sample < CaptureTarget::BYTES_PER_SAMPLE {
        return Err(RenderError::UnsupportedAdapter(format!(
            "{max_bytes_per_sample} colour attachment bytes per sample, {} needed",
            CaptureTarget::BYTES_PER_SAMPLE
        )));
    }
    Ok(())
}

/// Shading writes linear values, so a non-sRGB surface is preferred; the
/// output is not gamma encoded.
pub fn surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first().copied())
}

/// Everything tied to the window: surface, its configuration and the main depth buffer.
pub struct RenderContext {
    pub gpu: GpuDevice,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    pub depth_texture: GpuTexture,
}

impl RenderContext {
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        log::info!("Initializing GPU");

        // 1. Instance and the surface on the window
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let size = window.inner_size();
        let surface = instance.create_surface(window)?;

        // 2. Adapter and device
        let gpu = GpuDevice::request(&instance, Some(&surface))?;

        // 3. Configure the surface
        let caps = surface.get_capabilities(&gpu.adapter);
        let format = surface_format(&caps.formats).ok_or(RenderError::UnsupportedSurface)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync On
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&gpu.device, &config);

        let depth_texture = TextureHelper::create_depth_texture(
            &gpu.device,
            config.width,
            config.height,
            "Depth Texture",
        );

        log::info!("Surface configured ({}x{}, {format:?})", config.width, config.height);

        Ok(Self {
            gpu,
            surface,
            config,
            depth_texture,
        })
    }

    pub fn program_context(&self) -> GpuProgramRenderContext<'_> {
        self.gpu.program_context(self.config.format)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Reconfigures the surface and recreates the depth buffer. Zero sizes
    /// (minimised window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.gpu.device, &self.config);
        self.depth_texture =
            TextureHelper::create_depth_texture(&self.gpu.device, width, height, "Depth Texture");
        log::debug!("Resized surface to {width}x{height}");
    }

    /// Next surface texture, or `None` when this frame should be skipped.
    pub fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.gpu.device, &self.config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for the next frame");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downlevel_float_targets_are_rejected() {
        let sampled_only = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC;
        assert!(matches!(
            check_capture_support(sampled_only, 64),
            Err(RenderError::UnsupportedAdapter(_))
        ));
    }

    #[test]
    fn default_attachment_budget_is_too_small() {
        let renderable = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        assert!(matches!(
            check_capture_support(renderable, wgpu::Limits::default().max_color_attachment_bytes_per_sample),
            Err(RenderError::UnsupportedAdapter(_))
        ));
        assert!(check_capture_support(renderable, CaptureTarget::BYTES_PER_SAMPLE).is_ok());
    }

    #[test]
    fn linear_surface_formats_come_first() {
        use wgpu::TextureFormat::*;
        assert_eq!(surface_format(&[Bgra8UnormSrgb, Bgra8Unorm]), Some(Bgra8Unorm));
        assert_eq!(surface_format(&[Rgba8UnormSrgb]), Some(Rgba8UnormSrgb));
        assert_eq!(surface_format(&[]), None);
    }
}
