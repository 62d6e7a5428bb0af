use bounce_core::AttributeBorder;

use crate::texture::{GpuTexture, TextureHelper};

/// The light's view of the scene: depth plus the three attribute buffers
/// written together by the light-space pass.
pub struct CaptureTarget {
    pub resolution: u32,
    pub depth: GpuTexture,
    pub normal: GpuTexture,
    pub world_pos: GpuTexture,
    pub flux: GpuTexture,
    pub depth_sampler: wgpu::Sampler,
    pub attribute_sampler: wgpu::Sampler,
    pub border: AttributeBorder,
    /// Samplers really clamp to border (otherwise clamp-to-edge; the result
    /// shader applies the border itself either way).
    pub hardware_border: bool,
}

impl CaptureTarget {
    pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
    pub const WORLD_POS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
    pub const FLUX_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    /// Colour attachment cost per sample: two `Rgba32Float` targets at 16
    /// bytes, `Rgba8Unorm` counted as 8.
    pub const BYTES_PER_SAMPLE: u32 = 40;

    pub fn new(
        device: &wgpu::Device,
        resolution: u32,
        border: AttributeBorder,
        clamp_to_border: bool,
    ) -> Self {
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC;
        let attachment = |format, label| {
            TextureHelper::create_2d(device, resolution, resolution, format, usage, label)
        };

        let depth = attachment(TextureHelper::DEPTH_FORMAT, "Capture Depth");
        let normal = attachment(Self::NORMAL_FORMAT, "Capture Normal");
        let world_pos = attachment(Self::WORLD_POS_FORMAT, "Capture World Position");
        let flux = attachment(Self::FLUX_FORMAT, "Capture Flux");

        if !clamp_to_border {
            log::warn!("Adapter lacks clamp-to-border sampling, falling back to clamp-to-edge");
        }

        let depth_sampler = Self::nearest_sampler(
            device,
            "Capture Depth Sampler",
            clamp_to_border.then_some(wgpu::SamplerBorderColor::OpaqueWhite),
        );
        let attribute_border_color = match border {
            AttributeBorder::Zero => wgpu::SamplerBorderColor::TransparentBlack,
            AttributeBorder::OpaqueWhite => wgpu::SamplerBorderColor::OpaqueWhite,
        };
        let attribute_sampler = Self::nearest_sampler(
            device,
            "Capture Attribute Sampler",
            clamp_to_border.then_some(attribute_border_color),
        );

        log::info!("Capture target allocated ({resolution}x{resolution}, {border:?} border)");

        Self {
            resolution,
            depth,
            normal,
            world_pos,
            flux,
            depth_sampler,
            attribute_sampler,
            border,
            hardware_border: clamp_to_border,
        }
    }

    fn nearest_sampler(
        device: &wgpu::Device,
        label: &str,
        border: Option<wgpu::SamplerBorderColor>,
    ) -> wgpu::Sampler {
        let address_mode = match border {
            Some(_) => wgpu::AddressMode::ClampToBorder,
            None => wgpu::AddressMode::ClampToEdge,
        };

        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            border_color: border,
            ..Default::default()
        })
    }

    /// Normal, world position, flux: the light-space program's colour targets.
    pub fn color_targets() -> [Option<wgpu::ColorTargetState>; 3] {
        [
            Self::NORMAL_FORMAT,
            Self::WORLD_POS_FORMAT,
            Self::FLUX_FORMAT,
        ]
        .map(|format| {
            Some(wgpu::ColorTargetState {
                format,
                // float32 targets are not blendable
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
    }

    /// Clear value of every attribute attachment.
    pub fn clear_color(&self) -> wgpu::Color {
        let v = self.border.value() as f64;
        wgpu::Color {
            r: v,
            g: v,
            b: v,
            a: v,
        }
    }

    /// Starts the light-space pass. Every attachment is cleared, so nothing
    /// from the previous frame survives.
    pub fn begin_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        let clear = self.clear_color();
        let color_attachment = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Light Space Pass"),
            color_attachments: &[
                color_attachment(&self.normal.view),
                color_attachment(&self.world_pos.view),
                color_attachment(&self.flux.view),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0), // Clear to "Far" (1.0)
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        let size = self.resolution as f32;
        render_pass.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);
        render_pass
    }
}
