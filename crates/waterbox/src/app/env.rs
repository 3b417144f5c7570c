//! Procedural environment cubemap.
//!
//! A simple sky/ground gradient with a sun disc, generated on the CPU
//! and uploaded once. Keeps the composite's reflection/refraction
//! lookups working without any asset files.

use glam::Vec3;

const FACE_SIZE: u32 = 128;

fn face_direction(face: u32, s: f32, t: f32) -> Vec3 {
    match face {
        0 => Vec3::new(1.0, -t, -s),
        1 => Vec3::new(-1.0, -t, s),
        2 => Vec3::new(s, 1.0, t),
        3 => Vec3::new(s, -1.0, -t),
        4 => Vec3::new(s, -t, 1.0),
        _ => Vec3::new(-s, -t, -1.0),
    }
    .normalize()
}

fn sky_color(dir: Vec3) -> [u8; 4] {
    let zenith = Vec3::new(0.32, 0.55, 0.85);
    let horizon = Vec3::new(0.82, 0.88, 0.95);
    let ground = Vec3::new(0.35, 0.33, 0.30);
    let sun_dir = Vec3::new(0.45, 0.65, 0.35).normalize();

    let mut color = if dir.y >= 0.0 {
        horizon.lerp(zenith, dir.y.powf(0.6))
    } else {
        horizon.lerp(ground, (-dir.y).powf(0.4))
    };

    let sun = dir.dot(sun_dir).max(0.0).powf(400.0);
    color += Vec3::splat(sun * 2.0);

    let c = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

/// Build the cubemap texture and return a cube view of it.
pub fn create_environment_map(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("environment cubemap"),
        size: wgpu::Extent3d {
            width: FACE_SIZE,
            height: FACE_SIZE,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let mut face_pixels = vec![0u8; (FACE_SIZE * FACE_SIZE * 4) as usize];
    for face in 0..6u32 {
        for y in 0..FACE_SIZE {
            for x in 0..FACE_SIZE {
                let s = (x as f32 + 0.5) / FACE_SIZE as f32 * 2.0 - 1.0;
                let t = (y as f32 + 0.5) / FACE_SIZE as f32 * 2.0 - 1.0;
                let rgba = sky_color(face_direction(face, s, t));
                let offset = ((y * FACE_SIZE + x) * 4) as usize;
                face_pixels[offset..offset + 4].copy_from_slice(&rgba);
            }
        }
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: face,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &face_pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(FACE_SIZE * 4),
                rows_per_image: Some(FACE_SIZE),
            },
            wgpu::Extent3d {
                width: FACE_SIZE,
                height: FACE_SIZE,
                depth_or_array_layers: 1,
            },
        );
    }

    texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_directions_are_unit() {
        for face in 0..6 {
            for (s, t) in [(-0.9, -0.9), (0.0, 0.0), (0.7, -0.3)] {
                let d = face_direction(face, s, t);
                assert!((d.length() - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_sky_brighter_than_ground() {
        let sky = sky_color(Vec3::new(0.0, 1.0, 0.0));
        let ground = sky_color(Vec3::new(0.0, -1.0, 0.0));
        let sky_sum: u32 = sky[..3].iter().map(|&c| c as u32).sum();
        let ground_sum: u32 = ground[..3].iter().map(|&c| c as u32).sum();
        assert!(sky_sum > ground_sum);
    }
}
