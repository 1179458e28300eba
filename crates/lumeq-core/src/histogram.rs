//! 256-bin intensity histogram.

use serde::{Deserialize, Serialize};

/// Number of intensity bins.
pub const BINS: usize = 256;

/// Bin counts for one 8-bit channel plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    bins: Vec<u32>,
}

impl Histogram {
    /// Wrap 256 bin counts.
    pub fn from_bins(bins: [u32; BINS]) -> Self {
        Self {
            bins: bins.to_vec(),
        }
    }

    /// Host-side reference count over a plane.
    pub fn compute(plane: &[u8]) -> Self {
        let mut bins = [0u32; BINS];
        for &v in plane {
            bins[v as usize] += 1;
        }
        Self::from_bins(bins)
    }

    /// All bin counts.
    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Count for one intensity.
    pub fn bin(&self, value: u8) -> u32 {
        self.bins[value as usize]
    }

    /// Sum over all bins; equals the plane's pixel count.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&b| b as u64).sum()
    }

    /// Largest bin count (for normalization).
    pub fn peak(&self) -> u32 {
        self.bins.iter().copied().max().unwrap_or(0)
    }

    /// Running sum of bins.
    pub fn cumulative(&self) -> [u64; BINS] {
        let mut cdf = [0u64; BINS];
        let mut sum = 0u64;
        for (slot, &count) in cdf.iter_mut().zip(&self.bins) {
            sum += count as u64;
            *slot = sum;
        }
        cdf
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::from_bins([0; BINS])
    }
}
