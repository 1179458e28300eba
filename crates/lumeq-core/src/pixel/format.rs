//! Closed enumeration of source pixel formats and their classification.

use std::fmt;

use crate::image::Channels;

/// Source pixel formats the adapter understands.
///
/// Multi-byte samples are little-endian. Indexed formats pack pixels
/// most-significant-bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 1-bit palette index.
    Indexed1,
    /// 4-bit palette index.
    Indexed4,
    /// 8-bit palette index.
    Indexed8,
    /// 8-bit grayscale.
    Gray8,
    /// R, G, B bytes.
    Rgb24,
    /// B, G, R bytes.
    Bgr24,
    /// R, G, B, A with straight alpha.
    Rgba32,
    /// B, G, R, A with straight alpha.
    Bgra32,
    /// R, G, B, unused byte.
    Rgbx32,
    /// B, G, R, unused byte.
    Bgrx32,
    /// R, G, B, A with premultiplied color.
    PremultipliedRgba32,
    /// B, G, R, A with premultiplied color.
    PremultipliedBgra32,
    /// 16-bit grayscale.
    Gray16,
    /// 16 bits per RGB channel.
    Rgb48,
    /// 16 bits per RGBA channel.
    Rgba64,
    /// Packed 5-6-5 RGB.
    Rgb565,
    /// Packed 5-5-5 RGB, top bit unused.
    Rgb555,
}

/// How a format becomes canonical 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Bytes are already in canonical order.
    Direct,
    /// Swap bytes 0 and 2 of every pixel.
    SwapRedBlue,
    /// Expand indices through the palette.
    Palette { bits: u8 },
    /// Divide color by alpha, then optionally swap R/B.
    Unpremultiply { bgr: bool },
    /// Fourth byte is padding: set alpha to 255, then optionally swap R/B.
    Opaque { bgr: bool },
    /// Not natively handled; converted to 8-bit RGB.
    Fallback,
}

/// Result of classifying a [`PixelFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatClass {
    /// Canonical channel layout the engine sees.
    pub channels: Channels,
    /// Decode strategy.
    pub conversion: Conversion,
    /// Format results are written back in.
    pub target: PixelFormat,
}

impl PixelFormat {
    /// Classify this format. Total over the enumeration.
    pub fn classify(self) -> FormatClass {
        use Channels::{Gray, Rgb, Rgba};
        use Conversion::*;
        let (channels, conversion, target) = match self {
            Self::Indexed1 => (Rgb, Palette { bits: 1 }, Self::Rgb24),
            Self::Indexed4 => (Rgb, Palette { bits: 4 }, Self::Rgb24),
            Self::Indexed8 => (Rgb, Palette { bits: 8 }, Self::Rgb24),
            Self::Gray8 => (Gray, Direct, Self::Gray8),
            Self::Rgb24 => (Rgb, Direct, Self::Rgb24),
            Self::Bgr24 => (Rgb, SwapRedBlue, Self::Bgr24),
            Self::Rgba32 => (Rgba, Direct, Self::Rgba32),
            Self::Bgra32 => (Rgba, SwapRedBlue, Self::Bgra32),
            Self::Rgbx32 => (Rgba, Opaque { bgr: false }, Self::Rgba32),
            Self::Bgrx32 => (Rgba, Opaque { bgr: true }, Self::Bgra32),
            Self::PremultipliedRgba32 => (Rgba, Unpremultiply { bgr: false }, Self::Rgba32),
            Self::PremultipliedBgra32 => (Rgba, Unpremultiply { bgr: true }, Self::Bgra32),
            Self::Gray16 | Self::Rgb48 | Self::Rgba64 | Self::Rgb565 | Self::Rgb555 => {
                (Rgb, Fallback, Self::Rgb24)
            }
        };
        FormatClass {
            channels,
            conversion,
            target,
        }
    }

    /// Storage bits per pixel.
    pub fn bits_per_pixel(self) -> usize {
        match self {
            Self::Indexed1 => 1,
            Self::Indexed4 => 4,
            Self::Indexed8 | Self::Gray8 => 8,
            Self::Gray16 | Self::Rgb565 | Self::Rgb555 => 16,
            Self::Rgb24 | Self::Bgr24 => 24,
            Self::Rgba32
            | Self::Bgra32
            | Self::Rgbx32
            | Self::Bgrx32
            | Self::PremultipliedRgba32
            | Self::PremultipliedBgra32 => 32,
            Self::Rgb48 => 48,
            Self::Rgba64 => 64,
        }
    }

    /// Packed bytes for one row of `width` pixels.
    pub fn row_bytes(self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel()).div_ceil(8)
    }

    /// Whether this format is written as-is by [`encode`](super::encode).
    pub fn is_writable(self) -> bool {
        !matches!(
            self.classify().conversion,
            Conversion::Palette { .. } | Conversion::Opaque { .. } | Conversion::Fallback
        )
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
