//! The data-parallel kernels an equalization backend must provide.

use lumeq_core::{ColorRange, DeviceDescriptor, Histogram, Lut, Result};

/// A parallel compute backend.
///
/// Each method runs one kernel to completion before returning. Inputs have
/// already been validated by the pipeline; implementations only fail on
/// device errors.
pub trait Accelerator: Send {
    /// Name and core count of the bound device.
    fn descriptor(&self) -> &DeviceDescriptor;

    /// Count each of the 256 intensities in a single-channel plane.
    fn histogram(&self, plane: &[u8]) -> Result<Histogram>;

    /// `out[i] = lut[plane[i]]`.
    fn apply_lut(&self, plane: &[u8], lut: &Lut) -> Result<Vec<u8>>;

    /// Interleaved RGB to YCbCr. A trailing partial pixel stays zero.
    fn rgb_to_ycbcr(&self, rgb: &[u8], range: ColorRange) -> Result<Vec<u8>>;

    /// Interleaved YCbCr to RGB. A trailing partial pixel stays zero.
    fn ycbcr_to_rgb(&self, ycc: &[u8], range: ColorRange) -> Result<Vec<u8>>;
}
