//! Named uniform blocks.
//!
//! Each program keeps its uniforms in one WGSL struct. `UniformLayout` mirrors
//! that struct (WGSL uniform address space rules), so values can be staged by
//! their dotted names (`light.position`) and uploaded as one buffer.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Mat4,
}

impl UniformKind {
    pub fn align(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec3 | UniformKind::Mat4 => 16,
        }
    }

    pub fn size(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec3 => 12,
            UniformKind::Mat4 => 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
}

fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Byte layout of one uniform struct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    cursor: u32,
    align: u32,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            cursor: 0,
            align: 4,
        }
    }

    pub fn field(mut self, name: &str, kind: UniformKind) -> Self {
        let offset = round_up(self.cursor, kind.align());
        self.fields.push(UniformField {
            name: name.to_string(),
            kind,
            offset,
        });
        self.cursor = offset + kind.size();
        self.align = self.align.max(kind.align());
        self
    }

    /// Nested struct member. Its fields become `name.field`.
    pub fn structure(mut self, name: &str, members: UniformLayout) -> Self {
        let offset = round_up(self.cursor, members.align);
        for member in members.fields.iter() {
            self.fields.push(UniformField {
                name: format!("{name}.{}", member.name),
                kind: member.kind,
                offset: offset + member.offset,
            });
        }
        self.cursor = offset + members.struct_size();
        self.align = self.align.max(members.align);
        self
    }

    fn struct_size(&self) -> u32 {
        round_up(self.cursor, self.align)
    }

    /// Buffer size, padded to 16 bytes.
    pub fn size(&self) -> u32 {
        round_up(self.cursor.max(1), self.align.max(16))
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    pub fn find(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

/// CPU copy of a uniform struct. Values persist until overwritten.
#[derive(Debug, Clone)]
pub struct UniformValues {
    layout: UniformLayout,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformValues {
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.size() as usize];
        Self {
            layout,
            data,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        let field = self.layout.find(name)?;
        let start = field.offset as usize;
        Some(&self.data[start..start + field.kind.size() as usize])
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.write(name, UniformKind::Int, bytemuck::bytes_of(&value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.write(name, UniformKind::Float, bytemuck::bytes_of(&value));
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.write(name, UniformKind::Vec3, bytemuck::cast_slice(&value.to_array()));
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.write(name, UniformKind::Mat4, bytemuck::cast_slice(&value.to_cols_array()));
    }

    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) {
        let Some(field) = self.layout.find(name) else {
            log::trace!("Ignoring unknown uniform `{name}`");
            return;
        };
        if field.kind != kind {
            log::warn!(
                "Uniform `{name}` is {:?}, refusing to write a {kind:?}",
                field.kind
            );
            return;
        }

        let start = field.offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
    }
}

/// Uniform values plus the GPU buffer they are uploaded into.
pub struct UniformBlock {
    pub values: UniformValues,
    pub buffer: wgpu::Buffer,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, label: &str, values: UniformValues) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: values.bytes(),
            // COPY_DST so staged values can be uploaded later
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut block = Self { values, buffer };
        block.values.mark_clean();
        block
    }

    /// Uploads staged values if anything changed since the last flush.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.values.is_dirty() {
            queue.write_buffer(&self.buffer, 0, self.values.bytes());
            self.values.mark_clean();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::{debug_program, light_space_program, result_program};
    use crate::scene::object_layout;

    fn offset(layout: &UniformLayout, name: &str) -> u32 {
        layout.find(name).unwrap().offset
    }

    #[test]
    fn result_block_matches_wgsl_layout() {
        let layout = result_program::uniform_layout();
        assert_eq!(offset(&layout, "view"), 0);
        assert_eq!(offset(&layout, "projection"), 64);
        assert_eq!(offset(&layout, "lightSpaceMatrix"), 128);
        assert_eq!(offset(&layout, "viewPos"), 192);
        // scalar packs into the vec3 tail
        assert_eq!(offset(&layout, "sample_num"), 204);
        assert_eq!(offset(&layout, "material.ambient"), 208);
        assert_eq!(offset(&layout, "material.specular"), 224);
        assert_eq!(offset(&layout, "material.shininess"), 236);
        assert_eq!(offset(&layout, "light.position"), 240);
        assert_eq!(offset(&layout, "light.ambient"), 256);
        assert_eq!(offset(&layout, "light.diffuse"), 272);
        assert_eq!(offset(&layout, "light.specular"), 288);
        assert_eq!(offset(&layout, "sample_radius"), 304);
        assert_eq!(offset(&layout, "shadow_bias"), 308);
        assert_eq!(offset(&layout, "near_plane"), 312);
        assert_eq!(offset(&layout, "far_plane"), 316);
        assert_eq!(offset(&layout, "attribute_border"), 320);
        assert_eq!(layout.size(), 336);
    }

    #[test]
    fn object_block_layout() {
        let layout = object_layout();
        assert_eq!(offset(&layout, "model"), 0);
        assert_eq!(offset(&layout, "normalMatrix"), 64);
        assert_eq!(offset(&layout, "material.diffuse"), 128);
        assert_eq!(layout.size(), 144);
    }

    #[test]
    fn light_space_and_debug_layouts() {
        let light = light_space_program::uniform_layout();
        assert_eq!(offset(&light, "light.position"), 64);
        assert_eq!(offset(&light, "light.diffuse"), 80);
        assert_eq!(light.size(), 96);

        let debug = debug_program::uniform_layout();
        assert_eq!(offset(&debug, "debug_view"), 8);
        assert_eq!(debug.size(), 16);
    }

    #[test]
    fn setters_write_at_field_offsets() {
        let mut values = UniformValues::new(result_program::uniform_layout());
        values.mark_clean();

        values.set_int("sample_num", 512);
        values.set_vec3("light.position", Vec3::new(-8.0, 6.0, 6.0));
        assert!(values.is_dirty());

        assert_eq!(values.field_bytes("sample_num").unwrap(), 512i32.to_ne_bytes());
        let position: &[f32] = bytemuck::cast_slice(values.field_bytes("light.position").unwrap());
        assert_eq!(position, [-8.0, 6.0, 6.0]);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut values = UniformValues::new(debug_program::uniform_layout());
        values.mark_clean();
        let before = values.bytes().to_vec();

        values.set_float("not_a_uniform", 1.0);
        assert!(!values.is_dirty());
        assert_eq!(values.bytes(), &before[..]);
    }

    #[test]
    fn kind_mismatch_is_ignored() {
        let mut values = UniformValues::new(debug_program::uniform_layout());
        values.mark_clean();
        values.set_int("near_plane", 3);
        assert!(!values.is_dirty());
    }
}
