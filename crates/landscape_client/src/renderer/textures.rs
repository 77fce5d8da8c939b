use std::fmt;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use tracing::{info, warn};

#[derive(Debug)]
pub enum TextureLoadError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl fmt::Display for TextureLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read texture {}: {source}", path.display())
            }
            Self::Decode { path, source } => {
                write!(f, "failed to decode texture {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for TextureLoadError {}

pub fn load_rgba(path: &Path) -> Result<RgbaImage, TextureLoadError> {
    let bytes = std::fs::read(path).map_err(|source| TextureLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| TextureLoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.to_rgba8())
}

/// 1×1 image of a linear RGB colour.
pub fn solid_rgba(color: [f32; 3]) -> RgbaImage {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbaImage::from_pixel(
        1,
        1,
        Rgba([channel(color[0]), channel(color[1]), channel(color[2]), 255]),
    )
}

/// Loads `path`, or logs the failure and returns a flat `fallback` texel.
pub fn load_or_fallback(path: &Path, fallback: [f32; 3]) -> RgbaImage {
    match load_rgba(path) {
        Ok(image) => {
            info!(
                "Loaded texture {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            image
        }
        Err(err) => {
            warn!("{err}; using flat colour");
            solid_rgba(fallback)
        }
    }
}

/// Tangent-space +Z, the texel of an unperturbed normal map.
pub const FLAT_NORMAL: [f32; 3] = [0.5, 0.5, 1.0];

/// Loads a normal map if one is given; a missing one is flat.
pub fn load_normal_map(path: Option<&Path>) -> RgbaImage {
    match path {
        Some(path) => load_or_fallback(path, FLAT_NORMAL),
        None => solid_rgba(FLAT_NORMAL),
    }
}

#[derive(Debug)]
pub struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: image.width().max(1),
            height: image.height().max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: Some(size.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

pub fn create_sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{load_normal_map, load_or_fallback, load_rgba, solid_rgba, TextureLoadError};

    #[test]
    fn solid_texel_matches_colour() {
        let image = solid_rgba([1.0, 0.5, 0.0]);
        assert_eq!(image.dimensions(), (1, 1));
        assert_eq!(image.get_pixel(0, 0).0, [255, 128, 0, 255]);
    }

    #[test]
    fn missing_texture_falls_back_to_flat_colour() {
        let path = Path::new("textures/definitely-not-here.jpg");
        assert!(matches!(load_rgba(path), Err(TextureLoadError::Read { .. })));
        let image = load_or_fallback(path, [0.0, 1.0, 0.0]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 255, 0, 255]);
    }

    #[test]
    fn absent_normal_map_points_straight_out() {
        let expected = [128, 128, 255, 255];
        assert_eq!(load_normal_map(None).get_pixel(0, 0).0, expected);
        let missing = load_normal_map(Some(Path::new("textures/no-such-normal.png")));
        assert_eq!(missing.dimensions(), (1, 1));
        assert_eq!(missing.get_pixel(0, 0).0, expected);
    }

    #[test]
    fn undecodable_texture_reports_decode_error() {
        let path = std::env::temp_dir().join("landscape-not-an-image.jpg");
        std::fs::write(&path, b"plain text").expect("write temp file");
        assert!(matches!(load_rgba(&path), Err(TextureLoadError::Decode { .. })));
        let _ = std::fs::remove_file(&path);
    }
}
