use std::path::Path;
use thiserror::Error;

/// Face file names, in wgpu cube layer order (+x, -x, +y, -y, +z, -z).
const FACE_FILES: [&str; 6] = [
  "cubemap_posx.png",
  "cubemap_negx.png",
  "cubemap_posy.png",
  "cubemap_negy.png",
  "cubemap_posz.png",
  "cubemap_negz.png",
];

#[derive(Debug, Error)]
pub enum CubemapError {
  #[error("failed to decode cubemap face {path}")]
  Decode {
    path: String,
    #[source]
    source: image::ImageError,
  },
  #[error("cubemap face {path} is {width}x{height}, expected {expected}x{expected}")]
  MismatchedFace {
    path: String,
    width: u32,
    height: u32,
    expected: u32,
  },
}

/// A cube texture plus the view/sampler the environment pass binds.
pub struct CubemapTexture {
  pub view: wgpu::TextureView,
  pub sampler: wgpu::Sampler,
}

/// Decode the six face images under `dir` into one cube texture. All faces
/// must be square and share one size.
pub fn load_cubemap(
  device: &wgpu::Device,
  queue: &wgpu::Queue,
  dir: &Path,
) -> Result<CubemapTexture, CubemapError> {
  let mut faces = Vec::with_capacity(6);
  let mut size = 0u32;
  for name in FACE_FILES {
    let path = dir.join(name);
    let image = image::open(&path)
      .map_err(|source| CubemapError::Decode {
        path: path.display().to_string(),
        source,
      })?
      .to_rgba8();
    let (width, height) = image.dimensions();
    if size == 0 {
      size = width;
    }
    if width != size || height != size {
      return Err(CubemapError::MismatchedFace {
        path: path.display().to_string(),
        width,
        height,
        expected: size,
      });
    }
    faces.push(image.into_raw());
  }

  Ok(upload_faces(device, queue, size, &faces))
}

/// 1x1 solid cubemap used when the real one fails to load; the session
/// keeps running with a flat background.
#[must_use]
pub fn solid_cubemap(device: &wgpu::Device, queue: &wgpu::Queue, rgba: [u8; 4]) -> CubemapTexture {
  let faces: Vec<Vec<u8>> = (0..6).map(|_| rgba.to_vec()).collect();
  upload_faces(device, queue, 1, &faces)
}

fn upload_faces(
  device: &wgpu::Device,
  queue: &wgpu::Queue,
  size: u32,
  faces: &[Vec<u8>],
) -> CubemapTexture {
  let texture = device.create_texture(&wgpu::TextureDescriptor {
    label: Some("Environment Cubemap"),
    size: wgpu::Extent3d {
      width: size,
      height: size,
      depth_or_array_layers: 6,
    },
    mip_level_count: 1,
    sample_count: 1,
    dimension: wgpu::TextureDimension::D2,
    format: wgpu::TextureFormat::Rgba8UnormSrgb,
    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    view_formats: &[],
  });

  for (layer, data) in faces.iter().enumerate() {
    queue.write_texture(
      wgpu::ImageCopyTexture {
        texture: &texture,
        mip_level: 0,
        origin: wgpu::Origin3d {
          x: 0,
          y: 0,
          z: layer as u32,
        },
        aspect: wgpu::TextureAspect::All,
      },
      data,
      wgpu::ImageDataLayout {
        offset: 0,
        bytes_per_row: Some(4 * size),
        rows_per_image: Some(size),
      },
      wgpu::Extent3d {
        width: size,
        height: size,
        depth_or_array_layers: 1,
      },
    );
  }

  let view = texture.create_view(&wgpu::TextureViewDescriptor {
    label: Some("Environment Cubemap View"),
    dimension: Some(wgpu::TextureViewDimension::Cube),
    ..wgpu::TextureViewDescriptor::default()
  });
  let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
    label: Some("Environment Sampler"),
    address_mode_u: wgpu::AddressMode::ClampToEdge,
    address_mode_v: wgpu::AddressMode::ClampToEdge,
    address_mode_w: wgpu::AddressMode::ClampToEdge,
    mag_filter: wgpu::FilterMode::Linear,
    min_filter: wgpu::FilterMode::Linear,
    ..wgpu::SamplerDescriptor::default()
  });

  CubemapTexture { view, sampler }
}
