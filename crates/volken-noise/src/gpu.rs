//! Upload of generated noise to GPU textures.

use wgpu::util::DeviceExt;

use crate::field::{NoisePlane, NoiseVolume, PlanetSurfaceMap};
use crate::synthesizer::CloudNoiseSet;

/// GPU copies of a [`CloudNoiseSet`] plus the repeat sampler used for all
/// of them.
pub struct NoiseTextures {
    pub shape: wgpu::Texture,
    pub shape_view: wgpu::TextureView,
    pub detail: wgpu::Texture,
    pub detail_view: wgpu::TextureView,
    pub planet_map: wgpu::Texture,
    pub planet_map_view: wgpu::TextureView,
    pub blue_noise: wgpu::Texture,
    pub blue_noise_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl NoiseTextures {
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, set: &CloudNoiseSet) -> Self {
        let shape = volume_texture(device, queue, "cloud-shape-noise", &set.shape);
        let detail = volume_texture(device, queue, "cloud-detail-noise", &set.detail);
        let planet_map = planet_map_texture(device, queue, &set.planet_map);
        let blue_noise = plane_texture(device, queue, "cloud-blue-noise", &set.blue_noise);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cloud-noise-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::info!(
            "Uploaded cloud noise textures ({} KiB)",
            (set.shape.data().len()
                + set.detail.data().len()
                + set.blue_noise.data().len()
                + set.planet_map.density().len() * 8)
                / 1024
        );

        let view = |t: &wgpu::Texture| t.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            shape_view: view(&shape),
            detail_view: view(&detail),
            planet_map_view: view(&planet_map),
            blue_noise_view: view(&blue_noise),
            shape,
            detail,
            planet_map,
            blue_noise,
            sampler,
        }
    }
}

fn to_unorm8(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

fn sampled_descriptor(
    label: &str,
    size: wgpu::Extent3d,
    dimension: wgpu::TextureDimension,
    format: wgpu::TextureFormat,
) -> wgpu::TextureDescriptor<'_> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }
}

fn volume_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    volume: &NoiseVolume,
) -> wgpu::Texture {
    let r = volume.resolution();
    let size = wgpu::Extent3d {
        width: r,
        height: r,
        depth_or_array_layers: r,
    };
    device.create_texture_with_data(
        queue,
        &sampled_descriptor(
            label,
            size,
            wgpu::TextureDimension::D3,
            wgpu::TextureFormat::R8Unorm,
        ),
        wgpu::util::TextureDataOrder::LayerMajor,
        &to_unorm8(volume.data()),
    )
}

fn plane_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    plane: &NoisePlane,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: plane.width(),
        height: plane.height(),
        depth_or_array_layers: 1,
    };
    device.create_texture_with_data(
        queue,
        &sampled_descriptor(
            label,
            size,
            wgpu::TextureDimension::D2,
            wgpu::TextureFormat::R8Unorm,
        ),
        wgpu::util::TextureDataOrder::LayerMajor,
        &to_unorm8(plane.data()),
    )
}

fn planet_map_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    map: &PlanetSurfaceMap,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: map.width(),
        height: map.resolution(),
        depth_or_array_layers: 1,
    };
    let texels = map.interleaved();
    device.create_texture_with_data(
        queue,
        &sampled_descriptor(
            "cloud-planet-map",
            size,
            wgpu::TextureDimension::D2,
            wgpu::TextureFormat::Rg32Float,
        ),
        wgpu::util::TextureDataOrder::LayerMajor,
        bytemuck::cast_slice(&texels),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unorm8_quantisation() {
        assert_eq!(to_unorm8(&[0.0, 0.5, 1.0, -1.0, 2.0]), vec![0, 128, 255, 0, 255]);
    }

    #[cfg(feature = "gpu_tests")]
    #[test]
    fn test_upload_preview_set() {
        use crate::{NoiseSettings, NoiseSynthesizer};

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(
            instance.request_adapter(&wgpu::RequestAdapterOptions::default()),
        )
        .expect("no GPU adapter");
        let (device, queue) = pollster::block_on(
            adapter.request_device(&wgpu::DeviceDescriptor::default(), None),
        )
        .expect("device");

        let set = CloudNoiseSet::generate(&NoiseSynthesizer::new(0), &NoiseSettings::preview())
            .expect("preview settings");
        let textures = NoiseTextures::upload(&device, &queue, &set);
        assert_eq!(textures.shape.size().depth_or_array_layers, set.shape.resolution());
        assert_eq!(textures.planet_map.size().width, set.planet_map.width());
        assert_eq!(textures.planet_map.format(), wgpu::TextureFormat::Rg32Float);
    }
}
