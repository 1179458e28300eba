//! Top-level equalization pipeline that orchestrates the kernels.
//!
//! Grayscale: histogram → LUT (host) → LUT apply.
//! RGB: forward color transform → equalize the luma plane → inverse transform.
//! RGBA: split alpha → RGB path → re-interleave the untouched alpha.
//!
//! Every stage finishes on the device before the next one starts.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use lumeq_core::color::{extract_first_channel, luma_plane, replace_first_channel};
use lumeq_core::pixel::layout::{merge_alpha, split_alpha};
use lumeq_core::pixel::{self, RawImage};
use lumeq_core::{
    Channels, ColorRange, ConversionRecord, DeviceDescriptor, EqualizeError, Histogram, Image,
    Lut, RecordSink, Result,
};
use parking_lot::{Mutex, MutexGuard};

use crate::accelerator::Accelerator;
use crate::config::EngineConfig;
use crate::handle::AcceleratorHandle;

/// Cooperative cancellation flag, checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Kernels already running finish first.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EqualizeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Histogram queries and equalization over one bound accelerator.
pub struct EqualizationPipeline {
    handle: AcceleratorHandle,
    color_range: ColorRange,
    sink: Option<Box<dyn RecordSink>>,
}

impl EqualizationPipeline {
    /// Bind an accelerator as configured.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let handle = AcceleratorHandle::bind(config)?;
        Ok(Self::with_handle(handle, config.color_range))
    }

    /// Use an existing handle.
    pub fn with_handle(handle: AcceleratorHandle, color_range: ColorRange) -> Self {
        Self {
            handle,
            color_range,
            sink: None,
        }
    }

    /// Deliver a [`ConversionRecord`] to `sink` after each timed equalize.
    pub fn set_record_sink(&mut self, sink: Box<dyn RecordSink>) {
        self.sink = Some(sink);
    }

    pub fn color_range(&self) -> ColorRange {
        self.color_range
    }

    /// Name and core count of the bound accelerator.
    pub fn device(&self) -> Result<&DeviceDescriptor> {
        self.handle.descriptor()
    }

    /// 256-bin histogram of the image's intensity.
    ///
    /// Color images are reduced to their luma plane on the host first.
    pub fn get_histogram(&self, image: &Image) -> Result<Histogram> {
        image.validate()?;
        let accelerator = self.handle.accelerator()?;
        let plane = match image.channels {
            Channels::Gray => Cow::Borrowed(image.pixels.as_slice()),
            Channels::Rgb => Cow::Owned(luma_plane(&image.pixels, 3, self.color_range)),
            Channels::Rgba => Cow::Owned(luma_plane(&image.pixels, 4, self.color_range)),
        };
        accelerator.histogram(&plane)
    }

    /// Build an image from raw parts and return its histogram.
    pub fn get_histogram_from_parts(
        &self,
        width: u32,
        height: u32,
        channel_count: u32,
        pixels: &[u8],
    ) -> Result<Histogram> {
        let image = Image::from_parts(width, height, channel_count, pixels.to_vec())?;
        self.get_histogram(&image)
    }

    /// Equalize an image. The input is left untouched.
    pub fn equalize(&self, image: &Image) -> Result<Image> {
        self.equalize_with_cancel(image, &CancelToken::default())
    }

    /// Build an image from raw parts and equalize it.
    pub fn equalize_from_parts(
        &self,
        width: u32,
        height: u32,
        channel_count: u32,
        pixels: &[u8],
    ) -> Result<Image> {
        let image = Image::from_parts(width, height, channel_count, pixels.to_vec())?;
        self.equalize(&image)
    }

    /// Equalize, checking `cancel` between stages.
    pub fn equalize_with_cancel(&self, image: &Image, cancel: &CancelToken) -> Result<Image> {
        image.validate()?;
        let accelerator = self.handle.accelerator()?;

        let pixels = match image.channels {
            Channels::Gray => equalize_plane(accelerator, &image.pixels, cancel)?,
            Channels::Rgb => self.equalize_rgb(accelerator, &image.pixels, cancel)?,
            Channels::Rgba => {
                let (rgb, alpha) = split_alpha(&image.pixels);
                let rgb = self.equalize_rgb(accelerator, &rgb, cancel)?;
                merge_alpha(&rgb, &alpha)
            }
        };

        Ok(Image {
            width: image.width,
            height: image.height,
            channels: image.channels,
            pixels,
        })
    }

    /// Equalize and time the call. The record also goes to the attached sink.
    pub fn equalize_timed(&mut self, image: &Image) -> Result<(Image, ConversionRecord)> {
        let start = Instant::now();
        let out = self.equalize(image)?;
        let record = ConversionRecord::new(
            image.pixel_count() as u64,
            self.handle.descriptor()?,
            start.elapsed(),
        );
        tracing::info!(
            "Equalized {}x{} {} on {} in {:.2} ms",
            image.width,
            image.height,
            image.channels,
            record.device_name,
            record.elapsed_ms
        );
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&record);
        }
        Ok((out, record))
    }

    /// Equalize a raw surface and write the result in its target format.
    pub fn equalize_raw(&self, raw: &RawImage) -> Result<RawImage> {
        let image = pixel::decode(raw)?;
        let out = self.equalize(&image)?;
        pixel::restore(&out, raw)
    }

    /// Histogram of a raw surface. 8-bit indexed surfaces count indices.
    pub fn histogram_raw(&self, raw: &RawImage) -> Result<Histogram> {
        let image = pixel::decode_for_histogram(raw)?;
        self.get_histogram(&image)
    }

    /// Release the accelerator. Later calls fail with `UseAfterDispose`.
    pub fn dispose(&mut self) {
        self.handle.dispose();
    }

    fn equalize_rgb(
        &self,
        accelerator: &dyn Accelerator,
        rgb: &[u8],
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        cancel.check()?;
        let mut ycc = accelerator.rgb_to_ycbcr(rgb, self.color_range)?;
        let luma = extract_first_channel(&ycc);
        let luma = equalize_plane(accelerator, &luma, cancel)?;
        replace_first_channel(&mut ycc, &luma);
        cancel.check()?;
        accelerator.ycbcr_to_rgb(&ycc, self.color_range)
    }
}

impl std::fmt::Debug for EqualizationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EqualizationPipeline")
            .field("handle", &self.handle)
            .field("color_range", &self.color_range)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

fn equalize_plane(
    accelerator: &dyn Accelerator,
    plane: &[u8],
    cancel: &CancelToken,
) -> Result<Vec<u8>> {
    cancel.check()?;
    let start = Instant::now();
    let histogram = accelerator.histogram(plane)?;
    tracing::debug!("histogram: {:?}", start.elapsed());

    cancel.check()?;
    let lut = Lut::from_histogram(&histogram, plane.len())?;

    cancel.check()?;
    let start = Instant::now();
    let out = accelerator.apply_lut(plane, &lut)?;
    tracing::debug!("apply_lut: {:?}", start.elapsed());
    Ok(out)
}

/// An [`EqualizationPipeline`] shared between threads; calls are serialized.
#[derive(Clone)]
pub struct SharedPipeline {
    inner: Arc<Mutex<EqualizationPipeline>>,
}

impl SharedPipeline {
    pub fn new(pipeline: EqualizationPipeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    pub fn get_histogram(&self, image: &Image) -> Result<Histogram> {
        self.inner.lock().get_histogram(image)
    }

    pub fn equalize(&self, image: &Image) -> Result<Image> {
        self.inner.lock().equalize(image)
    }

    pub fn equalize_timed(&self, image: &Image) -> Result<(Image, ConversionRecord)> {
        self.inner.lock().equalize_timed(image)
    }

    /// Exclusive access for anything not forwarded above.
    pub fn lock(&self) -> MutexGuard<'_, EqualizationPipeline> {
        self.inner.lock()
    }
}
