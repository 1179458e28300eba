//! Pixel-layout adaptation between source framebuffers and canonical images.
//!
//! A [`RawImage`] is a locked surface in some [`PixelFormat`] with optional
//! row padding. [`decode`] turns it into a packed [`Image`](crate::Image);
//! [`restore`] writes an engine result back into the source's target layout.

pub mod adapter;
pub mod format;
pub mod layout;

pub use adapter::{RawImage, decode, decode_for_histogram, encode, restore};
pub use format::{Conversion, FormatClass, PixelFormat};
