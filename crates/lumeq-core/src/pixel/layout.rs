//! Row-stride padding and alpha-plane separation.

use crate::error::{EqualizeError, Result};

/// Round a row length up to a 4-byte boundary.
pub fn aligned_stride(row_bytes: usize) -> usize {
    row_bytes.next_multiple_of(4)
}

/// Copy `height` rows of `row_bytes` out of a `stride`-padded buffer.
pub fn strip_padding(
    data: &[u8],
    row_bytes: usize,
    stride: usize,
    height: usize,
) -> Result<Vec<u8>> {
    check_padded_len(data.len(), row_bytes, stride, height)?;
    if stride == row_bytes {
        return Ok(data[..row_bytes * height].to_vec());
    }
    let mut packed = Vec::with_capacity(row_bytes * height);
    for row in data.chunks(stride).take(height) {
        packed.extend_from_slice(&row[..row_bytes]);
    }
    Ok(packed)
}

/// Spread packed rows back out to `stride`, zero-filling the padding.
pub fn insert_padding(
    packed: &[u8],
    row_bytes: usize,
    stride: usize,
    height: usize,
) -> Result<Vec<u8>> {
    if stride < row_bytes {
        return Err(EqualizeError::InvalidDimensions(format!(
            "stride {stride} shorter than row ({row_bytes} bytes)"
        )));
    }
    if packed.len() != row_bytes * height {
        return Err(EqualizeError::InvalidDimensions(format!(
            "packed buffer is {} bytes, expected {}",
            packed.len(),
            row_bytes * height
        )));
    }
    if stride == row_bytes {
        return Ok(packed.to_vec());
    }
    let mut padded = vec![0u8; stride * height];
    for (dst, src) in padded.chunks_mut(stride).zip(packed.chunks(row_bytes)) {
        dst[..row_bytes].copy_from_slice(src);
    }
    Ok(padded)
}

fn check_padded_len(len: usize, row_bytes: usize, stride: usize, height: usize) -> Result<()> {
    if stride < row_bytes {
        return Err(EqualizeError::InvalidDimensions(format!(
            "stride {stride} shorter than row ({row_bytes} bytes)"
        )));
    }
    let needed = match height {
        0 => 0,
        h => stride * (h - 1) + row_bytes,
    };
    if len < needed {
        return Err(EqualizeError::InvalidDimensions(format!(
            "buffer is {len} bytes, {height} rows at stride {stride} need {needed}"
        )));
    }
    Ok(())
}

/// Split interleaved RGBA into packed RGB and an alpha plane.
pub fn split_alpha(rgba: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let pixels = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
        alpha.push(px[3]);
    }
    (rgb, alpha)
}

/// Interleave packed RGB with an alpha plane.
pub fn merge_alpha(rgb: &[u8], alpha: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(alpha.len() * 4);
    for (px, &a) in rgb.chunks_exact(3).zip(alpha) {
        rgba.extend_from_slice(px);
        rgba.push(a);
    }
    rgba
}
