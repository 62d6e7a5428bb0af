use std::path::PathBuf;

use thiserror::Error;

/// Shader stage a compile diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("failed to read shader source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no embedded shader sources named `{0}`")]
    UnknownProgram(String),
    #[error("{program}: {stage} shader failed to compile: {message}")]
    Compile {
        program: String,
        stage: ShaderStage,
        message: String,
    },
    #[error("{program}: pipeline creation failed: {message}")]
    Link { program: String, message: String },
    #[error("{program}: {stage} uniform block does not match the program: {message}")]
    UniformLayout {
        program: String,
        stage: ShaderStage,
        message: String,
    },
    #[error("{program}: uniform `{name}` is not declared by the program")]
    MissingUniform { program: String, name: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface is not supported by the adapter")]
    UnsupportedSurface,
    #[error("adapter cannot hold the capture target: {0}")]
    UnsupportedAdapter(String),
    #[error("`{setting}` = {value} exceeds the device limit of {max}")]
    Limit {
        setting: &'static str,
        value: u32,
        max: u32,
    },
    #[error("failed to acquire the next frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Program(#[from] ProgramError),
}
