//! Conversion between [`RawImage`] surfaces and canonical [`Image`]s.

use crate::error::{EqualizeError, Result};
use crate::image::{Channels, Image};
use crate::pixel::format::{Conversion, PixelFormat};
use crate::pixel::layout::{aligned_stride, insert_padding, strip_padding};

/// A locked framebuffer in a source layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// Bytes from the start of one row to the next (>= packed row length).
    pub stride: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    /// RGB palette for indexed formats. A grey ramp is used when absent.
    pub palette: Option<Vec<[u8; 3]>>,
}

impl RawImage {
    /// Surface with tightly packed rows.
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: format.row_bytes(width),
            format,
            data,
            palette: None,
        }
    }

    /// Attach a palette.
    pub fn with_palette(mut self, palette: Vec<[u8; 3]>) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Override the row stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Packed bytes for one row.
    pub fn row_bytes(&self) -> usize {
        self.format.row_bytes(self.width)
    }

    fn check(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EqualizeError::InvalidDimensions(format!(
                "{}x{}",
                self.width, self.height
            )));
        }
        if self.data.is_empty() {
            return Err(EqualizeError::NullInput);
        }
        Ok(())
    }

    fn packed_rows(&self) -> Result<Vec<u8>> {
        self.check()?;
        strip_padding(&self.data, self.row_bytes(), self.stride, self.height as usize)
    }
}

/// Convert a raw surface into a packed canonical image.
pub fn decode(raw: &RawImage) -> Result<Image> {
    let packed = raw.packed_rows()?;
    let class = raw.format.classify();
    let row_bytes = raw.row_bytes();
    let width = raw.width as usize;

    let pixels = match class.conversion {
        Conversion::Direct => packed,
        Conversion::SwapRedBlue => {
            let mut px = packed;
            swap_red_blue(&mut px, class.channels.count());
            px
        }
        Conversion::Palette { bits } => {
            let mut out = Vec::with_capacity(width * raw.height as usize * 3);
            for row in packed.chunks_exact(row_bytes) {
                expand_indexed_row(row, width, bits, raw.palette.as_deref(), &mut out);
            }
            out
        }
        Conversion::Unpremultiply { bgr } => {
            let mut px = packed;
            for p in px.chunks_exact_mut(4) {
                let a = p[3] as u32;
                for c in &mut p[..3] {
                    *c = match a {
                        0 => 0,
                        a => ((*c as u32 * 255 + a / 2) / a).min(255) as u8,
                    };
                }
            }
            if bgr {
                swap_red_blue(&mut px, 4);
            }
            px
        }
        Conversion::Opaque { bgr } => {
            let mut px = packed;
            for p in px.chunks_exact_mut(4) {
                p[3] = 255;
            }
            if bgr {
                swap_red_blue(&mut px, 4);
            }
            px
        }
        Conversion::Fallback => {
            tracing::warn!(
                "Unsupported pixel format {}, converting to 8-bit RGB",
                raw.format
            );
            fallback_to_rgb(raw.format, &packed)
        }
    };

    Image::from_parts(raw.width, raw.height, class.channels.count() as u32, pixels)
}

/// Like [`decode`], but 8-bit indexed surfaces keep their indices as a
/// grayscale plane instead of expanding through the palette.
pub fn decode_for_histogram(raw: &RawImage) -> Result<Image> {
    if raw.format == PixelFormat::Indexed8 {
        let indices = raw.packed_rows()?;
        return Image::gray(raw.width, raw.height, indices);
    }
    decode(raw)
}

/// Write a canonical image in `format` with the given row stride.
///
/// Formats that cannot be written directly are written as their target.
pub fn encode(image: &Image, format: PixelFormat, stride: usize) -> Result<RawImage> {
    image.validate()?;
    let format = if format.is_writable() {
        format
    } else {
        format.classify().target
    };
    let class = format.classify();
    if class.channels != image.channels {
        return Err(EqualizeError::UnsupportedChannelCount(
            image.channels.count() as u32
        ));
    }

    let mut packed = image.pixels.clone();
    match class.conversion {
        Conversion::Direct => {}
        Conversion::SwapRedBlue => swap_red_blue(&mut packed, class.channels.count()),
        Conversion::Unpremultiply { bgr } => {
            for p in packed.chunks_exact_mut(4) {
                let a = p[3] as u32;
                for c in &mut p[..3] {
                    *c = ((*c as u32 * a + 127) / 255) as u8;
                }
            }
            if bgr {
                swap_red_blue(&mut packed, 4);
            }
        }
        Conversion::Palette { .. } | Conversion::Opaque { .. } | Conversion::Fallback => {
            unreachable!("non-writable formats are mapped to their target")
        }
    }

    let row_bytes = format.row_bytes(image.width);
    let data = insert_padding(&packed, row_bytes, stride, image.height as usize)?;
    Ok(RawImage {
        width: image.width,
        height: image.height,
        stride,
        format,
        data,
        palette: None,
    })
}

/// Write an engine result back in the target layout of `original`.
///
/// The stride is kept when the target has the same pixel size as the source;
/// otherwise rows are padded to a 4-byte boundary.
pub fn restore(image: &Image, original: &RawImage) -> Result<RawImage> {
    let target = original.format.classify().target;
    let stride = if target.bits_per_pixel() == original.format.bits_per_pixel() {
        original.stride
    } else {
        aligned_stride(target.row_bytes(image.width))
    };
    encode(image, target, stride)
}

fn swap_red_blue(pixels: &mut [u8], channels: usize) {
    for px in pixels.chunks_exact_mut(channels) {
        px.swap(0, 2);
    }
}

fn expand_indexed_row(
    row: &[u8],
    width: usize,
    bits: u8,
    palette: Option<&[[u8; 3]]>,
    out: &mut Vec<u8>,
) {
    let bits = bits as usize;
    let mask = (1u16 << bits) as usize - 1;
    for x in 0..width {
        let offset = x * bits;
        let shift = 8 - bits - offset % 8;
        let index = (row[offset / 8] as usize >> shift) & mask;
        let rgb = palette
            .and_then(|p| p.get(index).copied())
            .unwrap_or_else(|| {
                let v = (index * 255 / mask) as u8;
                [v, v, v]
            });
        out.extend_from_slice(&rgb);
    }
}

fn fallback_to_rgb(format: PixelFormat, packed: &[u8]) -> Vec<u8> {
    let words: Vec<u16> = packed
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();
    let hi = |v: u16| (v >> 8) as u8;
    let expand5 = |v: u16| ((v << 3) | (v >> 2)) as u8;
    let expand6 = |v: u16| ((v << 2) | (v >> 4)) as u8;

    match format {
        PixelFormat::Gray16 => words.iter().flat_map(|&v| [hi(v); 3]).collect(),
        PixelFormat::Rgb48 => words.iter().map(|&v| hi(v)).collect(),
        PixelFormat::Rgba64 => words
            .chunks_exact(4)
            .flat_map(|px| [hi(px[0]), hi(px[1]), hi(px[2])])
            .collect(),
        PixelFormat::Rgb565 => words
            .iter()
            .flat_map(|&v| {
                [
                    expand5((v >> 11) & 0x1f),
                    expand6((v >> 5) & 0x3f),
                    expand5(v & 0x1f),
                ]
            })
            .collect(),
        PixelFormat::Rgb555 => words
            .iter()
            .flat_map(|&v| {
                [
                    expand5((v >> 10) & 0x1f),
                    expand5((v >> 5) & 0x1f),
                    expand5(v & 0x1f),
                ]
            })
            .collect(),
        other => {
            debug_assert!(false, "{other} is not a fallback format");
            Vec::new()
        }
    }
}
