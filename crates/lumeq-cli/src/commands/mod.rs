//! Subcommand implementations and the image file plumbing they share.

pub mod device;
pub mod equalize;
pub mod histogram;

use anyhow::{Context, Result};
use image::{ColorType, DynamicImage};
use lumeq_core::{Channels, Image, PixelFormat, RawImage};
use std::path::Path;

/// Load an image file as a raw surface in the closest engine format.
pub fn load_raw(path: &Path) -> Result<RawImage> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let (width, height) = (img.width(), img.height());

    let raw = match img {
        DynamicImage::ImageLuma8(buf) => {
            RawImage::packed(width, height, PixelFormat::Gray8, buf.into_raw())
        }
        DynamicImage::ImageRgb8(buf) => {
            RawImage::packed(width, height, PixelFormat::Rgb24, buf.into_raw())
        }
        DynamicImage::ImageRgba8(buf) => {
            RawImage::packed(width, height, PixelFormat::Rgba32, buf.into_raw())
        }
        DynamicImage::ImageLuma16(buf) => {
            RawImage::packed(width, height, PixelFormat::Gray16, le_bytes(&buf.into_raw()))
        }
        DynamicImage::ImageRgb16(buf) => {
            RawImage::packed(width, height, PixelFormat::Rgb48, le_bytes(&buf.into_raw()))
        }
        DynamicImage::ImageRgba16(buf) => {
            RawImage::packed(width, height, PixelFormat::Rgba64, le_bytes(&buf.into_raw()))
        }
        other => {
            tracing::debug!("Converting {:?} input to RGBA8", other.color());
            RawImage::packed(width, height, PixelFormat::Rgba32, other.to_rgba8().into_raw())
        }
    };

    tracing::debug!(
        "Loaded {}: {}x{} {}",
        path.display(),
        raw.width,
        raw.height,
        raw.format
    );
    Ok(raw)
}

/// Save an 8-bit image. The file format follows the extension.
pub fn save_image(path: &Path, image: &Image) -> Result<()> {
    let color = match image.channels {
        Channels::Gray => ColorType::L8,
        Channels::Rgb => ColorType::Rgb8,
        Channels::Rgba => ColorType::Rgba8,
    };
    image::save_buffer(path, &image.pixels, image.width, image.height, color)
        .with_context(|| format!("Failed to save {}", path.display()))
}

fn le_bytes(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
