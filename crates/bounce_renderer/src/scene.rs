//! The static room: ground, two walls and a frame of box beams.

use glam::{Mat4, Vec3};

use crate::{
    mesh::{GpuGeometry, Vertex},
    uniforms::{UniformBlock, UniformKind, UniformLayout, UniformValues},
};

/// Per-object block shared by the light-space and result programs (group 1).
pub fn object_layout() -> UniformLayout {
    UniformLayout::new()
        .field("model", UniformKind::Mat4)
        .field("normalMatrix", UniformKind::Mat4)
        .structure(
            "material",
            UniformLayout::new().field("diffuse", UniformKind::Vec3),
        )
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub label: &'static str,
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
}

/// One draw: a mesh, where it goes and its flat colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectDesc {
    pub mesh: usize,
    pub model: Mat4,
    pub diffuse: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDesc {
    pub meshes: Vec<MeshData>,
    pub objects: Vec<ObjectDesc>,
}

impl SceneDesc {
    /// Ground, back wall, right wall and eight beams.
    pub fn room() -> Self {
        let mut scene = SceneDesc::default();
        Planes.add_to(&mut scene);
        BoxFrame.add_to(&mut scene);
        scene
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_object(&mut self, mesh: usize, model: Mat4, diffuse: Vec3) {
        self.objects.push(ObjectDesc {
            mesh,
            model,
            diffuse,
        });
    }
}

/// Supplies static geometry and its placements once at startup.
pub trait GeometryProvider {
    fn add_to(&self, scene: &mut SceneDesc);
}

pub struct Planes;

impl Planes {
    const INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

    fn quad(label: &'static str, corners: [[f32; 3]; 4], normal: [f32; 3]) -> MeshData {
        MeshData {
            label,
            vertices: corners.iter().map(|&p| Vertex::new(p, normal)).collect(),
            indices: Some(Self::INDICES.to_vec()),
        }
    }
}

impl GeometryProvider for Planes {
    fn add_to(&self, scene: &mut SceneDesc) {
        let ground = scene.add_mesh(Self::quad(
            "Ground",
            [[0.0, 0.0, 0.0], [-5.0, 0.0, 0.0], [-5.0, 0.0, 5.0], [0.0, 0.0, 5.0]],
            [0.0, 1.0, 0.0],
        ));
        let back = scene.add_mesh(Self::quad(
            "Back Wall",
            [[0.0, 0.0, 0.0], [0.0, 5.0, 0.0], [-5.0, 5.0, 0.0], [-5.0, 0.0, 0.0]],
            [0.0, 0.0, 1.0],
        ));
        let right = scene.add_mesh(Self::quad(
            "Right Wall",
            [[0.0, 0.0, 0.0], [0.0, 0.0, 5.0], [0.0, 5.0, 5.0], [0.0, 5.0, 0.0]],
            [-1.0, 0.0, 0.0],
        ));

        scene.add_object(ground, Mat4::IDENTITY, Vec3::new(0.0, 0.0, 0.8));
        scene.add_object(back, Mat4::IDENTITY, Vec3::new(0.0, 0.8, 0.0));
        scene.add_object(right, Mat4::IDENTITY, Vec3::new(0.8, 0.0, 0.0));
    }
}

/// A 0.25 x 2 x 0.25 beam, instanced into uprights and crossbars.
pub struct BoxFrame;

impl BoxFrame {
    pub const WIDTH: f32 = 0.25;
    pub const HEIGHT: f32 = 2.0;

    /// 36 vertices, six faces of two triangles, flat normals.
    pub fn beam() -> MeshData {
        let (w, h) = (Self::WIDTH, Self::HEIGHT);
        // (normal, four corners in fan order)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, -1.0, 0.0], [[0.0, 0.0, 0.0], [0.0, 0.0, w], [w, 0.0, w], [w, 0.0, 0.0]]),
            ([-1.0, 0.0, 0.0], [[0.0, 0.0, 0.0], [0.0, h, 0.0], [0.0, h, w], [0.0, 0.0, w]]),
            ([0.0, 0.0, -1.0], [[0.0, 0.0, 0.0], [w, 0.0, 0.0], [w, h, 0.0], [0.0, h, 0.0]]),
            ([0.0, 0.0, 1.0], [[0.0, 0.0, w], [w, 0.0, w], [w, h, w], [0.0, h, w]]),
            ([1.0, 0.0, 0.0], [[w, 0.0, 0.0], [w, h, 0.0], [w, h, w], [w, 0.0, w]]),
            ([0.0, 1.0, 0.0], [[0.0, h, 0.0], [0.0, h, w], [w, h, w], [w, h, 0.0]]),
        ];

        let vertices = faces
            .iter()
            .flat_map(|(normal, c)| {
                [c[0], c[1], c[2], c[2], c[3], c[0]].map(|p| Vertex::new(p, *normal))
            })
            .collect();

        MeshData {
            label: "Box Frame Beam",
            vertices,
            indices: None,
        }
    }

    /// Four uprights, then four crossbars laid across their tops.
    pub fn placements() -> [Mat4; 8] {
        let t = |x: f32, y: f32, z: f32| Mat4::from_translation(Vec3::new(x, y, z));
        let along_x = Mat4::from_rotation_z(90f32.to_radians());
        let along_z = Mat4::from_rotation_x((-90f32).to_radians());

        let first = t(-4.0, 0.0, 4.0);
        let second = first * t(1.75, 0.0, 0.0);
        let third = second * t(0.0, 0.0, -2.0);
        let fourth = third * t(-1.75, 0.0, 0.0);

        let back_bar = t(-2.0, 2.0, 2.0);
        let front_bar = back_bar * t(0.0, 0.0, 2.0);
        let right_bar = front_bar * t(-0.25, 0.0, 0.0);
        let left_bar = right_bar * t(-1.75, 0.0, 0.0);

        [
            first,
            second,
            third,
            fourth,
            back_bar * along_x,
            front_bar * along_x,
            right_bar * along_z,
            left_bar * along_z,
        ]
    }
}

impl GeometryProvider for BoxFrame {
    fn add_to(&self, scene: &mut SceneDesc) {
        let beam = scene.add_mesh(Self::beam());
        for model in Self::placements() {
            scene.add_object(beam, model, Vec3::splat(0.8));
        }
    }
}

/// An uploaded object: its uniform block and the group-1 bind group over it.
pub struct SceneObject {
    pub mesh: usize,
    pub uniforms: UniformBlock,
    pub bind_group: wgpu::BindGroup,
}

pub struct GpuScene {
    layout: wgpu::BindGroupLayout,
    meshes: Vec<GpuGeometry>,
    objects: Vec<SceneObject>,
}

impl GpuScene {
    pub fn upload(device: &wgpu::Device, desc: &SceneDesc) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let meshes = desc
            .meshes
            .iter()
            .map(|mesh| {
                GpuGeometry::new(
                    device,
                    mesh.label,
                    &mesh.vertices,
                    mesh.indices.as_deref(),
                    wgpu::PrimitiveTopology::TriangleList,
                )
            })
            .collect();

        let objects = desc
            .objects
            .iter()
            .enumerate()
            .map(|(i, object)| {
                let mut values = UniformValues::new(object_layout());
                values.set_mat4("model", object.model);
                // Transpose(Inverse(Model)) keeps normals perpendicular under scaling
                values.set_mat4("normalMatrix", object.model.inverse().transpose());
                values.set_vec3("material.diffuse", object.diffuse);

                let uniforms = UniformBlock::new(device, &format!("Object {i} Uniform Buffer"), values);
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Object {i} Bind Group")),
                    layout: &layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.buffer.as_entire_binding(),
                    }],
                });

                SceneObject {
                    mesh: object.mesh,
                    uniforms,
                    bind_group,
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "Uploaded scene: {} meshes, {} objects",
            desc.meshes.len(),
            objects.len()
        );

        Self {
            layout,
            meshes,
            objects,
        }
    }

    pub fn object_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Draws every object with whatever program is active on group 0.
    pub fn draw_all(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        for object in &self.objects {
            let Some(mesh) = self.meshes.get(object.mesh) else {
                continue;
            };
            render_pass.set_bind_group(1, &object.bind_group, &[]);
            mesh.draw(render_pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn room_has_three_planes_and_eight_beams() {
        let scene = SceneDesc::room();
        assert_eq!(scene.meshes.len(), 4);
        assert_eq!(scene.objects.len(), 11);
        assert!(scene.objects.iter().all(|o| o.mesh < scene.meshes.len()));
    }

    #[test]
    fn plane_colours() {
        let scene = SceneDesc::room();
        let colours: Vec<Vec3> = scene.objects.iter().take(3).map(|o| o.diffuse).collect();
        assert_eq!(
            colours,
            [
                Vec3::new(0.0, 0.0, 0.8),
                Vec3::new(0.0, 0.8, 0.0),
                Vec3::new(0.8, 0.0, 0.0)
            ]
        );
        assert!(scene.objects[3..].iter().all(|o| o.diffuse == Vec3::splat(0.8)));
    }

    #[test]
    fn beam_is_a_closed_box() {
        let beam = BoxFrame::beam();
        assert_eq!(beam.vertices.len(), 36);
        assert!(beam.indices.is_none());

        for v in &beam.vertices {
            assert_relative_eq!(Vec3::from(v.normal).length(), 1.0);
            for (axis, max) in [(0, 0.25), (1, 2.0), (2, 0.25)] {
                assert!(v.position[axis] >= 0.0 && v.position[axis] <= max);
            }
        }
    }

    #[test]
    fn plane_normals_face_the_room() {
        let scene = SceneDesc::room();
        // room interior sits at x < 0, y > 0, z > 0
        let inside = Vec3::new(-2.5, 2.5, 2.5);
        for mesh in &scene.meshes[..3] {
            let v = mesh.vertices[0];
            let to_inside = inside - Vec3::from(v.position);
            assert!(Vec3::from(v.normal).dot(to_inside) > 0.0, "{}", mesh.label);
        }
    }

    #[test]
    fn uprights_and_crossbars_are_placed() {
        let placements = BoxFrame::placements();
        let origins: Vec<Vec3> = placements
            .iter()
            .map(|m| m.transform_point3(Vec3::ZERO))
            .collect();

        let expected = [
            Vec3::new(-4.0, 0.0, 4.0),
            Vec3::new(-2.25, 0.0, 4.0),
            Vec3::new(-2.25, 0.0, 2.0),
            Vec3::new(-4.0, 0.0, 2.0),
            Vec3::new(-2.0, 2.0, 2.0),
            Vec3::new(-2.0, 2.0, 4.0),
            Vec3::new(-2.25, 2.0, 4.0),
            Vec3::new(-4.0, 2.0, 4.0),
        ];
        for (got, want) in origins.iter().zip(expected) {
            assert!(got.abs_diff_eq(want, 1e-5), "{got} != {want}");
        }

        // crossbar along -x: the beam's +y axis maps onto -x
        let top = placements[4].transform_point3(Vec3::new(0.0, 2.0, 0.0));
        assert!(top.abs_diff_eq(Vec3::new(-4.0, 2.0, 2.0), 1e-5));
        // crossbar along -z after rotating -90 degrees about x
        let top = placements[6].transform_point3(Vec3::new(0.0, 2.0, 0.0));
        assert!(top.abs_diff_eq(Vec3::new(-2.25, 2.0, 2.0), 1e-5));
    }
}
