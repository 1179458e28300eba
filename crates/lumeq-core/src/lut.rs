//! Equalization lookup table built from a cumulative histogram.

use crate::error::{EqualizeError, Result};
use crate::histogram::{BINS, Histogram};

/// 256-entry intensity remap table. Always non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lut {
    table: [u8; BINS],
}

impl Lut {
    /// Build the equalization LUT for a plane of `pixel_count` pixels.
    ///
    /// ```text
    /// cumulative[i] = Σ_{k<=i} H[k]
    /// lut[i]        = clamp(floor(cumulative[i] * 255 / N), 0, 255)
    /// ```
    pub fn from_histogram(histogram: &Histogram, pixel_count: usize) -> Result<Self> {
        if pixel_count == 0 {
            return Err(EqualizeError::InvalidDimensions(
                "cannot build a LUT for an empty plane".into(),
            ));
        }
        let scale = 255.0f32 / pixel_count as f32;
        let cdf = histogram.cumulative();
        let mut table = [0u8; BINS];
        for (entry, &c) in table.iter_mut().zip(cdf.iter()) {
            *entry = ((c as f32 * scale).floor() as i32).clamp(0, 255) as u8;
        }
        Ok(Self { table })
    }

    /// Look up one intensity.
    pub fn map(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    /// Raw table.
    pub fn as_array(&self) -> &[u8; BINS] {
        &self.table
    }

    /// Host-side reference application.
    pub fn apply(&self, plane: &[u8]) -> Vec<u8> {
        plane.iter().map(|&v| self.map(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_image_maps_to_255() {
        let h = Histogram::compute(&[10, 10, 10, 10]);
        let lut = Lut::from_histogram(&h, 4).unwrap();
        assert_eq!(lut.map(10), 255);
        assert_eq!(lut.map(9), 0);
        assert_eq!(lut.apply(&[10, 10, 10, 10]), vec![255; 4]);
    }

    #[test]
    fn test_lut_non_decreasing() {
        let plane: Vec<u8> = (0..4096u32).map(|i| ((i * i) % 251) as u8).collect();
        let h = Histogram::compute(&plane);
        let lut = Lut::from_histogram(&h, plane.len()).unwrap();
        assert!(lut.as_array().windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(lut.map(255), 255);
    }

    #[test]
    fn test_lut_is_deterministic() {
        let h = Histogram::compute(&[1, 2, 3, 200, 200]);
        let a = Lut::from_histogram(&h, 5).unwrap();
        let b = Lut::from_histogram(&h, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_values_stay_ordered() {
        let plane = [0u8, 85, 170, 255];
        let h = Histogram::compute(&plane);
        let out = Lut::from_histogram(&h, 4).unwrap().apply(&plane);
        assert_eq!(out, vec![63, 127, 191, 255]);
    }

    #[test]
    fn test_zero_pixels_rejected() {
        let h = Histogram::default();
        assert!(matches!(
            Lut::from_histogram(&h, 0),
            Err(EqualizeError::InvalidDimensions(_))
        ));
    }
}
