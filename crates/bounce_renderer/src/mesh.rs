use std::mem;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

// #[repr(C)] keeps the field order the vertex layouts below describe.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0, // @location(0) position
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1, // @location(1) normal
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Full-screen quad vertex used by the debug view.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl QuadVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Triangle strip covering the whole viewport.
pub const FULLSCREEN_QUAD: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 1.0] },
    QuadVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 0.0] },
];

/// How a mesh is drawn. Fixed when the mesh is uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCall {
    Vertices(u32),
    Indexed(u32),
}

/// Static vertex (and optional index) buffer plus its draw call.
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub draw_call: DrawCall,
    pub topology: wgpu::PrimitiveTopology,
}

impl GpuGeometry {
    pub fn new<V: Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: Option<&[u32]>,
        topology: wgpu::PrimitiveTopology,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let (index_buffer, draw_call) = match indices {
            Some(indices) => {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} Index Buffer")),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                (Some(buffer), DrawCall::Indexed(indices.len() as u32))
            }
            None => (None, DrawCall::Vertices(vertices.len() as u32)),
        };

        Self {
            vertex_buffer,
            index_buffer,
            draw_call,
            topology,
        }
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        match (&self.index_buffer, self.draw_call) {
            (Some(indices), DrawCall::Indexed(count)) => {
                render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..count, 0, 0..1);
            }
            (_, DrawCall::Vertices(count)) => render_pass.draw(0..count, 0..1),
            (None, DrawCall::Indexed(_)) => {
                log::warn!("Indexed draw call without an index buffer, skipping");
            }
        }
    }
}
