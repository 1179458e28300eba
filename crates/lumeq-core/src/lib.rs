//! lumeq Core: host-side domain layer for histogram equalization.
//!
//! This crate contains the image record, histogram and LUT math, the
//! luma/chroma color transforms, and the pixel-layout adapter. No GPU
//! dependency here; `lumeq-gpu` runs the data-parallel parts on an accelerator.

pub mod color;
pub mod device;
pub mod error;
pub mod histogram;
pub mod image;
pub mod lut;
pub mod pixel;
pub mod record;

// Re-exports for convenience.
pub use color::ColorRange;
pub use device::{ArchVersion, BackendKind, DeviceDescriptor};
pub use error::{EqualizeError, ErrorClass, Result};
pub use histogram::Histogram;
pub use image::{Channels, Image};
pub use lut::Lut;
pub use pixel::{PixelFormat, RawImage};
pub use record::{ConversionRecord, RecordSink};
