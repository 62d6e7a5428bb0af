//! CPU version of the result shader's lighting, over a CPU-side capture.
//!
//! Used to check the lighting model without a GPU; `result_shader.frag.wgsl`
//! computes the same terms per fragment.

use bounce_core::AttributeBorder;
use glam::{Mat4, Vec3, Vec4Swizzles};

use crate::light::{Light, linearize_depth};

/// Surface parameters shared by every object (only the diffuse colour varies).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.1),
            specular: Vec3::splat(0.1),
            shininess: 8.0,
        }
    }
}

/// One texel of the attribute buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTexel {
    pub depth: f32,
    pub normal: Vec3,
    pub world_pos: Vec3,
    pub flux: Vec3,
}

impl CaptureTexel {
    pub fn border(border: AttributeBorder) -> Self {
        let v = Vec3::splat(border.value());
        Self {
            depth: 1.0,
            normal: v,
            world_pos: v,
            flux: v,
        }
    }
}

/// Square capture, nearest sampling, clamp-to-border.
#[derive(Debug, Clone)]
pub struct CpuCapture {
    resolution: u32,
    border: AttributeBorder,
    texels: Vec<CaptureTexel>,
}

impl CpuCapture {
    /// Every texel holds the border values, as after a pass that drew nothing.
    pub fn cleared(resolution: u32, border: AttributeBorder) -> Self {
        let resolution = resolution.max(1);
        Self {
            resolution,
            border,
            texels: vec![CaptureTexel::border(border); (resolution * resolution) as usize],
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn set(&mut self, x: u32, y: u32, texel: CaptureTexel) {
        if x < self.resolution && y < self.resolution {
            self.texels[(y * self.resolution + x) as usize] = texel;
        }
    }

    pub fn sample(&self, uv: [f32; 2]) -> CaptureTexel {
        let [u, v] = uv;
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return CaptureTexel::border(self.border);
        }

        let max = self.resolution - 1;
        let x = ((u * self.resolution as f32) as u32).min(max);
        let y = ((v * self.resolution as f32) as u32).min(max);
        self.texels[(y * self.resolution + x) as usize]
    }
}

/// Where a world position lands in the capture: texture coordinates and NDC depth.
pub fn light_space_uv(light_space: Mat4, world_pos: Vec3) -> ([f32; 2], f32) {
    let clip = light_space * world_pos.extend(1.0);
    let ndc = clip.xyz() / clip.w;
    ([ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5], ndc.z)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingInputs<'a> {
    pub light: &'a Light,
    pub material: Material,
    pub view_pos: Vec3,
    pub sample_radius: f32,
    pub shadow_bias: f32,
    pub samples: &'a [Vec3],
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadedTerms {
    pub ambient: Vec3,
    pub direct: Vec3,
    pub indirect: Vec3,
}

impl ShadedTerms {
    pub fn total(&self) -> Vec3 {
        self.ambient + self.direct + self.indirect
    }
}

/// 1.0 when something in the capture sits closer to the light than `world_pos`.
pub fn shadow(capture: &CpuCapture, inputs: &ShadingInputs, world_pos: Vec3) -> f32 {
    let light = inputs.light;
    let (uv, ndc_depth) = light_space_uv(light.light_space_matrix(), world_pos);
    if ndc_depth > 1.0 {
        return 0.0;
    }

    let closest = linearize_depth(capture.sample(uv).depth, light.near_plane, light.far_plane);
    let current = linearize_depth(ndc_depth, light.near_plane, light.far_plane);
    if current - inputs.shadow_bias > closest { 1.0 } else { 0.0 }
}

/// One-bounce estimate: every sampled capture texel acts as a small light.
pub fn indirect(capture: &CpuCapture, inputs: &ShadingInputs, world_pos: Vec3, normal: Vec3) -> Vec3 {
    if inputs.samples.is_empty() {
        return Vec3::ZERO;
    }

    let (uv, _) = light_space_uv(inputs.light.light_space_matrix(), world_pos);
    let sum = inputs.samples.iter().fold(Vec3::ZERO, |acc, r| {
        let coords = [
            uv[0] + inputs.sample_radius * r.x,
            uv[1] + inputs.sample_radius * r.y,
        ];
        let texel = capture.sample(coords);
        let to_fragment = world_pos - texel.world_pos;
        let dist_sq = to_fragment.length_squared();
        let weight = texel.normal.dot(to_fragment).max(0.0) * normal.dot(-to_fragment).max(0.0)
            / (dist_sq * dist_sq).max(1e-4);
        acc + texel.flux * weight * r.z
    });

    sum / inputs.samples.len() as f32
}

/// Ambient + shadowed Blinn-Phong + indirect, for a fragment of colour `albedo`.
pub fn shade(
    capture: &CpuCapture,
    inputs: &ShadingInputs,
    world_pos: Vec3,
    normal: Vec3,
    albedo: Vec3,
) -> ShadedTerms {
    let light = inputs.light;
    let material = inputs.material;
    let normal = normal.normalize();
    let light_dir = (light.position - world_pos).normalize();
    let n_dot_l = normal.dot(light_dir);

    let ambient = light.ambient * material.ambient;

    let direct = if n_dot_l > 0.0 {
        let view_dir = (inputs.view_pos - world_pos).normalize();
        let halfway = (light_dir + view_dir).normalize();
        let spec = normal.dot(halfway).max(0.0).powf(material.shininess);
        let lit = 1.0 - shadow(capture, inputs, world_pos);
        (light.diffuse * n_dot_l * albedo + light.specular * spec * material.specular) * lit
    } else {
        Vec3::ZERO
    };

    let indirect = indirect(capture, inputs, world_pos, normal) * albedo;

    ShadedTerms {
        ambient,
        direct,
        indirect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::RandomSamples;
    use approx::assert_relative_eq;

    fn inputs<'a>(light: &'a Light, samples: &'a [Vec3]) -> ShadingInputs<'a> {
        ShadingInputs {
            light,
            material: Material::default(),
            view_pos: Vec3::new(-4.0, 3.0, 4.0),
            sample_radius: 0.3,
            shadow_bias: 0.05,
            samples,
        }
    }

    #[test]
    fn border_only_capture_gives_no_indirect_light() {
        let light = Light::default();
        let samples = RandomSamples::generate(512, 5);
        let inputs = inputs(&light, samples.as_slice());
        let capture = CpuCapture::cleared(64, AttributeBorder::Zero);

        let terms = shade(&capture, &inputs, Vec3::new(-2.0, 0.0, 2.0), Vec3::Y, Vec3::splat(0.8));
        assert_eq!(terms.indirect, Vec3::ZERO);
        // depth border reads as "no occluder", so the ground is lit
        assert!(terms.direct.length() > 0.0);
    }

    #[test]
    fn facing_away_from_the_light_is_ambient_only() {
        let light = Light::default();
        let samples = RandomSamples::generate(64, 5);
        let inputs = inputs(&light, samples.as_slice());
        let capture = CpuCapture::cleared(64, AttributeBorder::Zero);

        // the ground's underside faces away from a light above it
        let terms = shade(&capture, &inputs, Vec3::new(-2.0, 0.0, 2.0), -Vec3::Y, Vec3::splat(0.8));
        assert_eq!(terms.direct, Vec3::ZERO);
        assert_eq!(terms.indirect, Vec3::ZERO);
        assert_relative_eq!(terms.total().x, 0.02, epsilon = 1e-6);
        assert_eq!(terms.total(), light.ambient * Material::default().ambient);
    }

    #[test]
    fn occluder_in_the_capture_casts_a_shadow() {
        let light = Light::default();
        let inputs = inputs(&light, &[]);
        let point = Vec3::new(-2.0, 0.0, 2.0);

        let mut capture = CpuCapture::cleared(256, AttributeBorder::Zero);
        let (uv, _) = light_space_uv(light.light_space_matrix(), point);
        // something halfway between the light and the point
        let (_, occluder_depth) =
            light_space_uv(light.light_space_matrix(), point.lerp(light.position, 0.5));
        let x = (uv[0] * 256.0) as u32;
        let y = (uv[1] * 256.0) as u32;
        capture.set(
            x,
            y,
            CaptureTexel {
                depth: occluder_depth,
                ..CaptureTexel::border(AttributeBorder::Zero)
            },
        );

        assert_eq!(shadow(&capture, &inputs, point), 1.0);
        assert_eq!(shadow(&CpuCapture::cleared(256, AttributeBorder::Zero), &inputs, point), 0.0);
    }

    #[test]
    fn lit_neighbour_bounces_light() {
        let light = Light::default();
        let samples = [Vec3::new(0.0, 0.0, 1.0)];
        let inputs = ShadingInputs {
            sample_radius: 0.0,
            ..inputs(&light, &samples)
        };

        // a wall texel facing the fragment, one unit away along +x
        let fragment = Vec3::new(-2.0, 0.5, 2.0);
        let mut capture = CpuCapture::cleared(1, AttributeBorder::Zero);
        capture.set(
            0,
            0,
            CaptureTexel {
                depth: 0.5,
                normal: Vec3::NEG_X,
                world_pos: fragment + Vec3::X,
                flux: Vec3::splat(0.5),
            },
        );

        let bounce = indirect(&capture, &inputs, fragment, Vec3::X);
        // dot(np, x - xp) = 1, dot(n, xp - x) = 1, dist^4 = 1
        assert_relative_eq!(bounce.x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn out_of_range_lookups_use_the_border() {
        let capture = CpuCapture::cleared(4, AttributeBorder::OpaqueWhite);
        let texel = capture.sample([1.5, -0.2]);
        assert_eq!(texel.normal, Vec3::ONE);
        assert_eq!(texel.depth, 1.0);
    }
}
