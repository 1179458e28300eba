//! Pipeline behavior on the CPU backend and an instrumented stub.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lumeq_core::{
    Channels, ColorRange, ConversionRecord, DeviceDescriptor, EqualizeError, ErrorClass,
    Histogram, Image, Lut, PixelFormat, RawImage, RecordSink, Result,
};
use lumeq_gpu::{
    Accelerator, AcceleratorHandle, CancelToken, CpuAccelerator, EqualizationPipeline,
    SharedPipeline,
};

fn cpu_pipeline(range: ColorRange) -> EqualizationPipeline {
    let cpu = CpuAccelerator::with_threads(2).expect("cpu pool");
    EqualizationPipeline::with_handle(AcceleratorHandle::from_accelerator(cpu), range)
}

/// Delegates to the CPU backend and counts every kernel call.
struct CountingAccelerator {
    inner: CpuAccelerator,
    calls: Arc<AtomicUsize>,
}

impl CountingAccelerator {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let acc = Self {
            inner: CpuAccelerator::with_threads(1).expect("cpu pool"),
            calls: calls.clone(),
        };
        (acc, calls)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Accelerator for CountingAccelerator {
    fn descriptor(&self) -> &DeviceDescriptor {
        self.inner.descriptor()
    }

    fn histogram(&self, plane: &[u8]) -> Result<Histogram> {
        self.hit();
        self.inner.histogram(plane)
    }

    fn apply_lut(&self, plane: &[u8], lut: &Lut) -> Result<Vec<u8>> {
        self.hit();
        self.inner.apply_lut(plane, lut)
    }

    fn rgb_to_ycbcr(&self, rgb: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        self.hit();
        self.inner.rgb_to_ycbcr(rgb, range)
    }

    fn ycbcr_to_rgb(&self, ycc: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        self.hit();
        self.inner.ycbcr_to_rgb(ycc, range)
    }
}

fn counting_pipeline() -> (EqualizationPipeline, Arc<AtomicUsize>) {
    let (acc, calls) = CountingAccelerator::new();
    let pipeline = EqualizationPipeline::with_handle(
        AcceleratorHandle::from_accelerator(acc),
        ColorRange::Full,
    );
    (pipeline, calls)
}

/// Always fails inside the device.
struct FailingAccelerator {
    descriptor: DeviceDescriptor,
}

impl Accelerator for FailingAccelerator {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn histogram(&self, _: &[u8]) -> Result<Histogram> {
        Err(EqualizeError::DeviceOperation("lost device".into()))
    }

    fn apply_lut(&self, _: &[u8], _: &Lut) -> Result<Vec<u8>> {
        Err(EqualizeError::DeviceOperation("lost device".into()))
    }

    fn rgb_to_ycbcr(&self, _: &[u8], _: ColorRange) -> Result<Vec<u8>> {
        Err(EqualizeError::DeviceOperation("lost device".into()))
    }

    fn ycbcr_to_rgb(&self, _: &[u8], _: ColorRange) -> Result<Vec<u8>> {
        Err(EqualizeError::DeviceOperation("lost device".into()))
    }
}

/// Runs every kernel on the CPU except the inverse color transform, which
/// fails. Records the order kernels were reached in.
struct InverseFailsAccelerator {
    inner: CpuAccelerator,
    log: Arc<parking_lot::Mutex<Vec<&'static str>>>,
}

impl InverseFailsAccelerator {
    fn new() -> (Self, Arc<parking_lot::Mutex<Vec<&'static str>>>) {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let acc = Self {
            inner: CpuAccelerator::with_threads(1).expect("cpu pool"),
            log: log.clone(),
        };
        (acc, log)
    }
}

impl Accelerator for InverseFailsAccelerator {
    fn descriptor(&self) -> &DeviceDescriptor {
        self.inner.descriptor()
    }

    fn histogram(&self, plane: &[u8]) -> Result<Histogram> {
        self.log.lock().push("histogram");
        self.inner.histogram(plane)
    }

    fn apply_lut(&self, plane: &[u8], lut: &Lut) -> Result<Vec<u8>> {
        self.log.lock().push("apply_lut");
        self.inner.apply_lut(plane, lut)
    }

    fn rgb_to_ycbcr(&self, rgb: &[u8], range: ColorRange) -> Result<Vec<u8>> {
        self.log.lock().push("rgb_to_ycbcr");
        self.inner.rgb_to_ycbcr(rgb, range)
    }

    fn ycbcr_to_rgb(&self, _: &[u8], _: ColorRange) -> Result<Vec<u8>> {
        self.log.lock().push("ycbcr_to_rgb");
        Err(EqualizeError::DeviceOperation("kernel launch failed".into()))
    }
}

/// Deterministic pseudo-random bytes.
fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn test_uniform_gray_maps_to_white() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let image = Image::gray(2, 2, vec![10; 4]).unwrap();

    let hist = pipeline.get_histogram(&image).unwrap();
    assert_eq!(hist.bin(10), 4);
    assert_eq!(hist.total(), 4);

    let out = pipeline.equalize(&image).unwrap();
    assert_eq!(out.pixels, vec![255; 4]);
    assert_eq!(image.pixels, vec![10; 4], "input must stay valid");
}

#[test]
fn test_distinct_ramp_stays_strictly_increasing() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let image = Image::gray(1, 4, vec![0, 85, 170, 255]).unwrap();
    let out = pipeline.equalize(&image).unwrap();
    assert!(out.pixels.windows(2).all(|w| w[0] < w[1]), "{:?}", out.pixels);
    assert_eq!(out.pixels, vec![63, 127, 191, 255]);
}

#[test]
fn test_two_channels_rejected_without_device_calls() {
    let (pipeline, calls) = counting_pipeline();
    let err = pipeline
        .equalize_from_parts(2, 2, 2, &[0; 8])
        .unwrap_err();
    assert!(matches!(err, EqualizeError::UnsupportedChannelCount(2)));
    assert_eq!(err.class(), ErrorClass::Input);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_width_histogram_rejected_without_device_calls() {
    let (pipeline, calls) = counting_pipeline();
    let err = pipeline
        .get_histogram_from_parts(0, 3, 1, &[])
        .unwrap_err();
    assert!(matches!(err, EqualizeError::InvalidDimensions(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let hand_built = Image {
        width: 0,
        height: 3,
        channels: Channels::Gray,
        pixels: vec![],
    };
    assert!(matches!(
        pipeline.get_histogram(&hand_built),
        Err(EqualizeError::InvalidDimensions(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_rgba_alpha_preserved() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let mut pixels = noise(16 * 8 * 4, 7);
    for px in pixels.chunks_exact_mut(4) {
        px[3] = 128;
    }
    let image = Image::from_parts(16, 8, 4, pixels).unwrap();
    let out = pipeline.equalize(&image).unwrap();
    assert_eq!(out.channels, Channels::Rgba);
    assert!(out.pixels.chunks_exact(4).all(|px| px[3] == 128));
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn test_histogram_sums_to_pixel_count_for_every_layout() {
    let pipeline = cpu_pipeline(ColorRange::Studio);
    for channels in [1u32, 3, 4] {
        let (w, h) = (13, 7);
        let image =
            Image::from_parts(w, h, channels, noise((w * h * channels) as usize, channels))
                .unwrap();
        let hist = pipeline.get_histogram(&image).unwrap();
        assert_eq!(hist.total(), (w * h) as u64, "channels={channels}");
    }
}

#[test]
fn test_lut_non_decreasing_and_deterministic() {
    for seed in 1..20 {
        let plane = noise(997, seed);
        let hist = Histogram::compute(&plane);
        let a = Lut::from_histogram(&hist, plane.len()).unwrap();
        let b = Lut::from_histogram(&hist, plane.len()).unwrap();
        assert_eq!(a, b);
        assert!(a.as_array().windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn test_uniform_image_equalizes_to_lut_value() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    for v in [0u8, 1, 77, 254] {
        let image = Image::gray(5, 3, vec![v; 15]).unwrap();
        let lut = Lut::from_histogram(&Histogram::compute(&image.pixels), 15).unwrap();
        let out = pipeline.equalize(&image).unwrap();
        assert!(out.pixels.iter().all(|&p| p == lut.map(v)));
    }
}

#[test]
fn test_gray_output_preserves_order() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let plane = noise(64 * 64, 3);
    let image = Image::gray(64, 64, plane.clone()).unwrap();
    let out = pipeline.equalize(&image).unwrap();
    for (i, j) in [(0usize, 1usize), (10, 500), (4000, 17)] {
        if plane[i] < plane[j] {
            assert!(out.pixels[i] <= out.pixels[j]);
        }
    }
}

#[test]
fn test_rgb_shape_preserved() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let image = Image::from_parts(9, 4, 3, noise(9 * 4 * 3, 11)).unwrap();
    let out = pipeline.equalize(&image).unwrap();
    assert_eq!((out.width, out.height, out.channels), (9, 4, Channels::Rgb));
    assert_eq!(out.pixels.len(), image.pixels.len());
}

// ── Lifecycle, cancellation, records ────────────────────────────────

#[test]
fn test_dispose_then_equalize_fails() {
    let mut pipeline = cpu_pipeline(ColorRange::Full);
    pipeline.dispose();
    let image = Image::gray(1, 1, vec![5]).unwrap();
    let err = pipeline.equalize(&image).unwrap_err();
    assert!(matches!(err, EqualizeError::UseAfterDispose));
    assert_eq!(err.class(), ErrorClass::Lifecycle);
}

#[test]
fn test_validation_precedes_dispose_check() {
    let mut pipeline = cpu_pipeline(ColorRange::Full);
    pipeline.dispose();
    let err = pipeline.equalize_from_parts(1, 1, 2, &[0, 0]).unwrap_err();
    assert!(matches!(err, EqualizeError::UnsupportedChannelCount(2)));
}

#[test]
fn test_cancelled_token_stops_before_device_work() {
    let (pipeline, calls) = counting_pipeline();
    let token = CancelToken::new();
    token.cancel();
    let image = Image::gray(2, 2, vec![1, 2, 3, 4]).unwrap();
    let err = pipeline.equalize_with_cancel(&image, &token).unwrap_err();
    assert!(matches!(err, EqualizeError::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_device_failure_leaves_handle_usable() {
    let failing = FailingAccelerator {
        descriptor: DeviceDescriptor::cpu(1),
    };
    let pipeline = EqualizationPipeline::with_handle(
        AcceleratorHandle::from_accelerator(failing),
        ColorRange::Full,
    );
    let image = Image::gray(1, 2, vec![1, 2]).unwrap();
    let err = pipeline.equalize(&image).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Environment);
    assert!(pipeline.device().is_ok());
}

#[test]
fn test_late_stage_failure_aborts_call_and_handle_survives() {
    let (acc, log) = InverseFailsAccelerator::new();
    let pipeline = EqualizationPipeline::with_handle(
        AcceleratorHandle::from_accelerator(acc),
        ColorRange::Full,
    );

    let rgba = Image::from_parts(4, 4, 4, noise(64, 11)).unwrap();
    let err = pipeline.equalize(&rgba).unwrap_err();
    assert!(matches!(err, EqualizeError::DeviceOperation(_)));
    assert_eq!(
        *log.lock(),
        vec!["rgb_to_ycbcr", "histogram", "apply_lut", "ycbcr_to_rgb"]
    );

    log.lock().clear();
    let gray = Image::gray(1, 4, vec![0, 85, 170, 255]).unwrap();
    let out = pipeline.equalize(&gray).unwrap();
    assert_eq!(out.pixels.len(), 4);
    assert!(out.pixels.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*log.lock(), vec!["histogram", "apply_lut"]);
}

#[test]
fn test_timed_equalize_delivers_record() {
    #[derive(Clone, Default)]
    struct SharedSink(Arc<parking_lot::Mutex<Vec<ConversionRecord>>>);

    impl RecordSink for SharedSink {
        fn record(&mut self, record: &ConversionRecord) {
            self.0.lock().push(record.clone());
        }
    }

    let mut pipeline = cpu_pipeline(ColorRange::Full);
    let sink = SharedSink::default();
    pipeline.set_record_sink(Box::new(sink.clone()));

    let image = Image::gray(4, 4, noise(16, 5)).unwrap();
    let (_, record) = pipeline.equalize_timed(&image).unwrap();
    assert_eq!(record.pixel_count, 16);
    assert_eq!(record.core_count, 2);

    let bad = Image {
        width: 4,
        height: 4,
        channels: Channels::Gray,
        pixels: vec![0; 3],
    };
    assert!(pipeline.equalize_timed(&bad).is_err());
    assert_eq!(sink.0.lock().len(), 1, "only successful calls are recorded");
}

#[test]
fn test_shared_pipeline_across_threads() {
    let shared = SharedPipeline::new(cpu_pipeline(ColorRange::Full));
    let handles: Vec<_> = (0..4)
        .map(|seed| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                let image = Image::gray(8, 8, noise(64, seed + 1)).unwrap();
                shared.equalize(&image).map(|out| out.pixels.len())
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 64);
    }
}

// ── Raw surfaces ────────────────────────────────────────────────────

#[test]
fn test_equalize_raw_bgra_keeps_layout_and_alpha() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let (w, h, stride) = (3u32, 2u32, 16usize);
    let mut data = vec![0u8; stride * h as usize];
    for y in 0..h as usize {
        for x in 0..w as usize {
            let i = y * w as usize + x;
            let o = y * stride + x * 4;
            data[o..o + 4].copy_from_slice(&[(i * 40) as u8, (i * 20) as u8, (i * 10) as u8, 200]);
        }
    }
    let raw = RawImage::packed(w, h, PixelFormat::Bgra32, data).with_stride(stride);
    let out = pipeline.equalize_raw(&raw).unwrap();
    assert_eq!(out.format, PixelFormat::Bgra32);
    assert_eq!(out.stride, stride);
    for row in out.data.chunks(stride) {
        assert!(row[..12].chunks(4).all(|px| px[3] == 200));
        assert!(row[12..].iter().all(|&b| b == 0));
    }
}

#[test]
fn test_histogram_raw_indexed8_counts_indices() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let raw = RawImage::packed(4, 1, PixelFormat::Indexed8, vec![2, 2, 9, 2])
        .with_palette(vec![[255, 255, 255]; 16]);
    let hist = pipeline.histogram_raw(&raw).unwrap();
    assert_eq!(hist.bin(2), 3);
    assert_eq!(hist.bin(9), 1);
}

#[test]
fn test_equalize_raw_indexed_writes_rgb24() {
    let pipeline = cpu_pipeline(ColorRange::Full);
    let raw = RawImage::packed(8, 1, PixelFormat::Indexed1, vec![0b1100_1010]);
    let out = pipeline.equalize_raw(&raw).unwrap();
    assert_eq!(out.format, PixelFormat::Rgb24);
    assert_eq!(out.stride, 24);
    assert_eq!(out.data.len(), 24);
}
