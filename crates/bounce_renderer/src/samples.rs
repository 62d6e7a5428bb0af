use std::f32::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::texture::GpuTexture;

/// Polar disk samples for the indirect-light sum.
///
/// `x, y = r1 * (sin 2πr2, cos 2πr2)` and `z = r1²`. Radial density is
/// proportional to `r1`, so samples bunch towards the centre; `z` weights the
/// outer ones back up.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomSamples {
    samples: Vec<Vec3>,
}

impl RandomSamples {
    pub fn generate(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::from_rng(count, &mut rng)
    }

    pub fn from_rng<R: Rng>(count: usize, rng: &mut R) -> Self {
        let samples = (0..count)
            .map(|_| {
                let r1: f32 = rng.gen_range(0.0..1.0);
                let r2: f32 = rng.gen_range(0.0..1.0);
                let angle = 2.0 * PI * r2;
                Vec3::new(r1 * angle.sin(), r1 * angle.cos(), r1 * r1)
            })
            .collect();

        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.samples
    }

    /// Uploads as an N x 1 `Rgba32Float` texture with a 1D view.
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> GpuTexture {
        let width = self.samples.len().max(1) as u32;
        let size = wgpu::Extent3d {
            width,
            height: 1,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Random Sample Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut texels: Vec<[f32; 4]> = self
            .samples
            .iter()
            .map(|s| [s.x, s.y, s.z, 1.0])
            .collect();
        texels.resize(width as usize, [0.0; 4]);

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 16),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Random Sample View"),
            dimension: Some(wgpu::TextureViewDimension::D1),
            ..Default::default()
        });

        GpuTexture { texture, view }
    }
}

/// Seed drawn from the wall clock, for runs without an explicit seed.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_count() {
        for count in [0, 1, 7, 512] {
            assert_eq!(RandomSamples::generate(count, 3).len(), count);
        }
    }

    #[test]
    fn samples_lie_in_the_unit_disk() {
        let samples = RandomSamples::generate(512, 42);
        for s in samples.as_slice() {
            let radius_sq = s.x * s.x + s.y * s.y;
            assert!(s.z >= 0.0 && s.z < 1.0);
            assert!(radius_sq <= s.z + 1e-6);
            assert!((radius_sq - s.z).abs() <= 1e-5, "{radius_sq} vs {}", s.z);
        }
    }

    #[test]
    fn same_seed_same_samples() {
        assert_eq!(RandomSamples::generate(64, 9), RandomSamples::generate(64, 9));
        assert_ne!(RandomSamples::generate(64, 9), RandomSamples::generate(64, 10));
    }

    #[test]
    fn radial_density_favours_the_centre() {
        // r1 uniform => half the samples fall inside radius 0.5 (a quarter of the area)
        let samples = RandomSamples::generate(4096, 1);
        let inner = samples.as_slice().iter().filter(|s| s.z < 0.25).count();
        let fraction = inner as f32 / samples.len() as f32;
        assert!((fraction - 0.5).abs() < 0.05, "{fraction}");
    }
}
