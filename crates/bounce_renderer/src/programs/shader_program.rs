use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use glam::{Mat4, Vec3};

use crate::{
    error::{ProgramError, ShaderStage},
    programs::reflect,
    uniforms::{UniformBlock, UniformLayout, UniformValues},
};

/// Vertex/fragment WGSL text for one program.
#[derive(Debug, Clone)]
pub struct ProgramSources {
    pub name: String,
    pub vertex: String,
    pub fragment: String,
}

impl ProgramSources {
    /// Sources compiled into the binary.
    pub fn embedded(name: &str) -> Result<Self, ProgramError> {
        let (vertex, fragment) = match name {
            "result_shader" => (
                include_str!("../shaders/result_shader.vert.wgsl"),
                include_str!("../shaders/result_shader.frag.wgsl"),
            ),
            "lightSpaceShader" => (
                include_str!("../shaders/lightSpaceShader.vert.wgsl"),
                include_str!("../shaders/lightSpaceShader.frag.wgsl"),
            ),
            "debug" => (
                include_str!("../shaders/debug.vert.wgsl"),
                include_str!("../shaders/debug.frag.wgsl"),
            ),
            other => return Err(ProgramError::UnknownProgram(other.to_string())),
        };

        Ok(Self {
            name: name.to_string(),
            vertex: vertex.to_string(),
            fragment: fragment.to_string(),
        })
    }

    /// Reads `<name>.vert.wgsl` and `<name>.frag.wgsl` from `dir`.
    pub fn from_dir(dir: &Path, name: &str) -> Result<Self, ProgramError> {
        let read = |path: PathBuf| {
            std::fs::read_to_string(&path).map_err(|source| ProgramError::SourceRead { path, source })
        };

        Ok(Self {
            name: name.to_string(),
            vertex: read(dir.join(format!("{name}.vert.wgsl")))?,
            fragment: read(dir.join(format!("{name}.frag.wgsl")))?,
        })
    }

    pub fn load(name: &str, shader_dir: Option<&Path>) -> Result<Self, ProgramError> {
        match shader_dir {
            Some(dir) => {
                log::debug!("Loading {name} shaders from {}", dir.display());
                Self::from_dir(dir, name)
            }
            None => Self::embedded(name),
        }
    }
}

/// Extra group-0 binding after the uniform block (binding 0).
#[derive(Debug, Clone, Copy)]
pub enum BindingSlot {
    Texture {
        view_dimension: wgpu::TextureViewDimension,
        sample_type: wgpu::TextureSampleType,
    },
    Sampler(wgpu::SamplerBindingType),
}

impl BindingSlot {
    /// Nearest-sampled float texture (32-bit float formats are not filterable).
    pub const FLOAT_2D: BindingSlot = BindingSlot::Texture {
        view_dimension: wgpu::TextureViewDimension::D2,
        sample_type: wgpu::TextureSampleType::Float { filterable: false },
    };
    pub const FLOAT_1D: BindingSlot = BindingSlot::Texture {
        view_dimension: wgpu::TextureViewDimension::D1,
        sample_type: wgpu::TextureSampleType::Float { filterable: false },
    };
    pub const DEPTH_2D: BindingSlot = BindingSlot::Texture {
        view_dimension: wgpu::TextureViewDimension::D2,
        sample_type: wgpu::TextureSampleType::Depth,
    };
    pub const NEAREST_SAMPLER: BindingSlot =
        BindingSlot::Sampler(wgpu::SamplerBindingType::NonFiltering);

    fn layout_entry(self, binding: u32) -> wgpu::BindGroupLayoutEntry {
        let ty = match self {
            BindingSlot::Texture {
                view_dimension,
                sample_type,
            } => wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension,
                sample_type,
            },
            BindingSlot::Sampler(kind) => wgpu::BindingType::Sampler(kind),
        };

        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty,
            count: None,
        }
    }
}

/// Everything needed to turn a pair of sources into a pipeline.
pub struct ProgramDescriptor<'a> {
    pub uniforms: UniformLayout,
    /// Group 0, bindings 1.. in order.
    pub slots: &'a [BindingSlot],
    /// Resources for `slots`, same order.
    pub resources: &'a [wgpu::BindingResource<'a>],
    /// Groups 1.. (e.g. the per-object block).
    pub extra_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub vertex_layout: wgpu::VertexBufferLayout<'static>,
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub topology: wgpu::PrimitiveTopology,
}

/// A compiled pipeline plus its named uniform block.
pub struct ShaderProgram {
    name: String,
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBlock,
    bind_group: wgpu::BindGroup,
    /// Uniform members the compiled stages declare.
    declared: HashSet<String>,
}

/// Parses and compiles one stage, then checks its uniform struct against
/// `layout`. Returns the module and the member names the stage declares.
fn compile(
    device: &wgpu::Device,
    program: &str,
    stage: ShaderStage,
    source: &str,
    layout: &UniformLayout,
) -> Result<(wgpu::ShaderModule, Vec<String>), ProgramError> {
    let fail = |err: ProgramError| {
        log::error!("{err}");
        err
    };

    let parsed = reflect::parse(source).map_err(|message| {
        fail(ProgramError::Compile {
            program: program.to_string(),
            stage,
            message,
        })
    })?;

    let declared = match reflect::declared_uniforms(&parsed) {
        Some(declared) => {
            reflect::check_layout(layout, &declared).map_err(|message| {
                fail(ProgramError::UniformLayout {
                    program: program.to_string(),
                    stage,
                    message,
                })
            })?;
            declared.into_iter().map(|member| member.name).collect()
        }
        None => Vec::new(),
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{program} ({stage})")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(fail(ProgramError::Compile {
            program: program.to_string(),
            stage,
            message: err.to_string(),
        })),
        None => Ok((module, declared)),
    }
}

impl ShaderProgram {
    pub fn new(
        device: &wgpu::Device,
        sources: &ProgramSources,
        desc: &ProgramDescriptor,
    ) -> Result<Self, ProgramError> {
        let name = sources.name.as_str();

        // 1. Compile both stages and check their uniform structs
        let (vertex, vertex_uniforms) =
            compile(device, name, ShaderStage::Vertex, &sources.vertex, &desc.uniforms)?;
        let (fragment, fragment_uniforms) =
            compile(device, name, ShaderStage::Fragment, &sources.fragment, &desc.uniforms)?;
        let declared: HashSet<String> = vertex_uniforms.into_iter().chain(fragment_uniforms).collect();

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        // 2. Group 0: uniform block followed by the program's textures/samplers
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(desc.uniforms.size() as u64),
            },
            count: None,
        }];
        entries.extend(
            desc.slots
                .iter()
                .enumerate()
                .map(|(i, slot)| slot.layout_entry(i as u32 + 1)),
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{name} Bind Group Layout")),
            entries: &entries,
        });

        let uniforms = UniformBlock::new(
            device,
            &format!("{name} Uniform Buffer"),
            UniformValues::new(desc.uniforms.clone()),
        );

        let mut bind_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.buffer.as_entire_binding(),
        }];
        bind_entries.extend(desc.resources.iter().enumerate().map(|(i, resource)| {
            wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: resource.clone(),
            }
        }));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{name} Bind Group")),
            layout: &layout,
            entries: &bind_entries,
        });

        // 3. Pipeline layout: [0: program, 1..: extra groups]
        let mut group_layouts = vec![&layout];
        group_layouts.extend(desc.extra_layouts.iter().copied());

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{name} Pipeline Layout")),
            bind_group_layouts: &group_layouts,
            push_constant_ranges: &[],
        });

        // 4. The pipeline itself
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some(&format!("{name} Pipeline")),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[desc.vertex_layout.clone()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: desc.targets,
            }),
            depth_stencil: desc.depth_stencil.clone(),
            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // walls and beams are seen from both sides
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            let err = ProgramError::Link {
                program: name.to_string(),
                message: err.to_string(),
            };
            log::error!("{err}");
            return Err(err);
        }

        log::info!("Compiled program `{name}`");

        Ok(Self {
            name: name.to_string(),
            pipeline,
            uniforms,
            bind_group,
            declared,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes this program active for the following draws in `render_pass`.
    pub fn use_program(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.uniforms.values.set_int(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.uniforms.values.set_float(name, value);
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.uniforms.values.set_vec3(name, value);
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.uniforms.values.set_mat4(name, value);
    }

    /// Uploads staged uniform values.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.uniforms.flush(queue);
    }

    pub fn uniforms(&self) -> &UniformValues {
        &self.uniforms.values
    }

    /// Whether a compiled stage declares `name` in its uniform struct.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// Fails on the first name no compiled stage declares.
    pub fn require_uniforms(&self, names: &[&str]) -> Result<(), ProgramError> {
        match names.iter().find(|name| !self.has_uniform(name)) {
            Some(missing) => Err(ProgramError::MissingUniform {
                program: self.name.clone(),
                name: missing.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_is_embedded() {
        for name in ["result_shader", "lightSpaceShader", "debug"] {
            let sources = ProgramSources::embedded(name).unwrap();
            assert!(sources.vertex.contains("fn vs_main"), "{name} vertex");
            assert!(sources.fragment.contains("fn fs_main"), "{name} fragment");
        }
    }

    #[test]
    fn unknown_embedded_program() {
        assert!(matches!(
            ProgramSources::embedded("gbuffer"),
            Err(ProgramError::UnknownProgram(_))
        ));
    }

    #[test]
    fn missing_source_file_is_a_read_error() {
        let err = ProgramSources::from_dir(Path::new("no/such/dir"), "debug").unwrap_err();
        match err {
            ProgramError::SourceRead { path, .. } => assert!(path.ends_with("debug.vert.wgsl")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn uniform_names_appear_in_sources() {
        // every name the driver sets must be a member the shaders declare
        let sources = ProgramSources::embedded("result_shader").unwrap();
        let text = format!("{}{}", sources.vertex, sources.fragment);
        for name in [
            "lightSpaceMatrix",
            "viewPos",
            "sample_num",
            "sample_radius",
            "shadow_bias",
            "near_plane",
            "far_plane",
            "depthMap",
            "normalMap",
            "worldPosMap",
            "fluxMap",
            "randomMap",
            "shininess",
        ] {
            assert!(text.contains(name), "missing {name}");
        }
    }
}
