//! RGB ↔ luma/chroma (BT.601 YCbCr) transforms on 8-bit samples.
//!
//! Every result is truncated toward zero and then clamped to `[0, 255]`,
//! the same rounding the compute kernels use. Forward and inverse always
//! share one [`ColorRange`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// YCbCr quantization convention.
///
/// Offsets (16 and 128) are added before truncation, so a negative fractional
/// chroma term rounds down: `128 - 43.03` gives 84, not 85.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorRange {
    /// JPEG/JFIF full range: luma and chroma span 0-255.
    #[default]
    Full,
    /// Studio swing: luma 16-235, chroma 16-240.
    Studio,
}

impl ColorRange {
    /// Value handed to the compute kernels.
    pub fn shader_flag(self) -> u32 {
        match self {
            Self::Full => 0,
            Self::Studio => 1,
        }
    }
}

impl fmt::Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Studio => write!(f, "studio"),
        }
    }
}

impl FromStr for ColorRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "jpeg" | "pc" => Ok(Self::Full),
            "studio" | "limited" | "tv" => Ok(Self::Studio),
            other => Err(format!("unknown color range '{other}'")),
        }
    }
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v as i32).clamp(0, 255) as u8
}

/// Luma of one RGB pixel.
#[inline]
pub fn luma(r: u8, g: u8, b: u8, range: ColorRange) -> u8 {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    match range {
        ColorRange::Full => quantize(0.299 * r + 0.587 * g + 0.114 * b),
        ColorRange::Studio => quantize(16.0 + 0.257 * r + 0.504 * g + 0.098 * b),
    }
}

/// RGB → YCbCr for one pixel.
#[inline]
pub fn rgb_to_ycbcr(rgb: [u8; 3], range: ColorRange) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    match range {
        ColorRange::Full => [
            quantize(0.299 * r + 0.587 * g + 0.114 * b),
            quantize(128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b),
            quantize(128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b),
        ],
        ColorRange::Studio => [
            quantize(16.0 + 0.257 * r + 0.504 * g + 0.098 * b),
            quantize(128.0 - 0.148 * r - 0.291 * g + 0.439 * b),
            quantize(128.0 + 0.439 * r - 0.368 * g - 0.071 * b),
        ],
    }
}

/// YCbCr → RGB for one pixel.
#[inline]
pub fn ycbcr_to_rgb(ycc: [u8; 3], range: ColorRange) -> [u8; 3] {
    let y = ycc[0] as f32;
    let d = ycc[1] as f32 - 128.0;
    let e = ycc[2] as f32 - 128.0;
    match range {
        ColorRange::Full => [
            quantize(y + 1.402 * e),
            quantize(y - 0.344136 * d - 0.714136 * e),
            quantize(y + 1.772 * d),
        ],
        ColorRange::Studio => {
            let c = y - 16.0;
            [
                quantize(1.164 * c + 1.596 * e),
                quantize(1.164 * c - 0.392 * d - 0.813 * e),
                quantize(1.164 * c + 2.017 * d),
            ]
        }
    }
}

/// Luma plane of an interleaved RGB or RGBA buffer.
pub fn luma_plane(pixels: &[u8], stride: usize, range: ColorRange) -> Vec<u8> {
    pixels
        .chunks_exact(stride)
        .map(|px| luma(px[0], px[1], px[2], range))
        .collect()
}

/// Copy channel 0 of an interleaved 3-channel buffer into a plane.
pub fn extract_first_channel(ycc: &[u8]) -> Vec<u8> {
    ycc.chunks_exact(3).map(|px| px[0]).collect()
}

/// Overwrite channel 0 of an interleaved 3-channel buffer from a plane.
pub fn replace_first_channel(ycc: &mut [u8], plane: &[u8]) {
    for (px, &v) in ycc.chunks_exact_mut(3).zip(plane) {
        px[0] = v;
    }
}
