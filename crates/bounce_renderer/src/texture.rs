use wgpu::{
    Device, Extent3d, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
};

/// A texture together with its default view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn format(&self) -> TextureFormat {
        self.texture.format()
    }
}

pub struct TextureHelper;

impl TextureHelper {
    pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float; // Standard depth format

    /// Depth buffer for the on-screen pass, sized to the surface.
    pub fn create_depth_texture(device: &Device, width: u32, height: u32, label: &str) -> GpuTexture {
        Self::create_2d(
            device,
            width,
            height,
            Self::DEPTH_FORMAT,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            label,
        )
    }

    pub fn depth_state(write: bool, compare: wgpu::CompareFunction) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: Self::DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    pub fn create_2d(
        device: &Device,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsages,
        label: &str,
    ) -> GpuTexture {
        let size = Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        GpuTexture { texture, view }
    }
}
