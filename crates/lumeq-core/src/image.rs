//! Canonical image record consumed and produced by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EqualizeError, Result};

/// Supported interleaved channel layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channels {
    /// Single grayscale plane.
    Gray,
    /// Interleaved RGB.
    Rgb,
    /// Interleaved RGBA, alpha last.
    Rgba,
}

impl Channels {
    /// Number of bytes per pixel.
    pub fn count(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray => write!(f, "gray"),
            Self::Rgb => write!(f, "RGB"),
            Self::Rgba => write!(f, "RGBA"),
        }
    }
}

impl TryFrom<u32> for Channels {
    type Error = EqualizeError;

    fn try_from(count: u32) -> Result<Self> {
        match count {
            1 => Ok(Self::Gray),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            other => Err(EqualizeError::UnsupportedChannelCount(other)),
        }
    }
}

/// Tightly packed 8-bit image. `pixels.len() == width * height * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Interleaved channel layout.
    pub channels: Channels,
    /// Packed pixel bytes, no row padding.
    pub pixels: Vec<u8>,
}

impl Image {
    /// Build an image from a raw channel count, validating every invariant.
    ///
    /// Check order: dimensions, channel count, missing data, length.
    pub fn from_parts(
        width: u32,
        height: u32,
        channel_count: u32,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EqualizeError::dims(format!("{width}x{height}")));
        }
        let channels = Channels::try_from(channel_count)?;
        let image = Self {
            width,
            height,
            channels,
            pixels,
        };
        image.validate()?;
        Ok(image)
    }

    /// Single-channel image from a plane.
    pub fn gray(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::from_parts(width, height, 1, pixels)
    }

    /// Re-check the shape invariants of an image built by hand.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EqualizeError::dims(format!("{}x{}", self.width, self.height)));
        }
        if self.pixels.is_empty() {
            return Err(EqualizeError::NullInput);
        }
        let expected = self.byte_len();
        if self.pixels.len() != expected {
            return Err(EqualizeError::dims(format!(
                "{}x{} {} needs {expected} bytes, got {}",
                self.width,
                self.height,
                self.channels,
                self.pixels.len()
            )));
        }
        Ok(())
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Expected length of `pixels`.
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * self.channels.count()
    }
}
