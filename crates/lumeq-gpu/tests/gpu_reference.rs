//! GPU integration tests. Compares the wgpu kernels against the CPU backend.
//!
//! Run with: `cargo test -p lumeq-gpu`. Tests return early when no adapter
//! (including a software one) can be bound.

use std::sync::{Mutex, OnceLock};

use lumeq_core::{ColorRange, EqualizeError, Histogram, Image, Lut};
use lumeq_gpu::{
    Accelerator, AcceleratorHandle, CpuAccelerator, EngineConfig, EqualizationPipeline,
    GpuAccelerator,
};

fn gpu_test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Bind a GPU accelerator, or `None` when the machine has no usable adapter.
fn create_test_accelerator() -> Option<GpuAccelerator> {
    create_accelerator_with(test_config())
}

fn test_config() -> EngineConfig {
    let mut config = EngineConfig::builtin();
    config.allow_software_adapter = true;
    config
}

fn create_accelerator_with(config: EngineConfig) -> Option<GpuAccelerator> {
    match GpuAccelerator::new(&config) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("Skipping GPU test: {e}");
            None
        }
    }
}

fn cpu() -> CpuAccelerator {
    CpuAccelerator::with_threads(2).expect("cpu pool")
}

/// Gradient plus a repeating pattern, so every bin gets some traffic.
fn test_plane(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 7) % 256) as u8).collect()
}

#[test]
fn test_histogram_matches_cpu() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(gpu) = create_test_accelerator() else {
        return;
    };
    // Lengths that are and are not whole words.
    for len in [1usize, 3, 4, 1023, 256 * 1024 + 5] {
        let plane = test_plane(len);
        let hist = gpu.histogram(&plane).unwrap();
        assert_eq!(hist, cpu().histogram(&plane).unwrap(), "len={len}");
        assert_eq!(hist.total(), len as u64);
        assert_eq!(gpu.live_buffers(), 0);
    }
}

#[test]
fn test_apply_lut_matches_cpu() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(gpu) = create_test_accelerator() else {
        return;
    };
    let plane = test_plane(4099);
    let lut = Lut::from_histogram(&Histogram::compute(&plane), plane.len()).unwrap();
    let out = gpu.apply_lut(&plane, &lut).unwrap();
    assert_eq!(out, lut.apply(&plane));
    assert_eq!(gpu.live_buffers(), 0);
}

#[test]
fn test_color_kernels_within_one_of_cpu() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(gpu) = create_test_accelerator() else {
        return;
    };
    let cpu = cpu();
    // 37 pixels: not a multiple of the four-pixel kernel group.
    let rgb = test_plane(37 * 3);
    for range in [ColorRange::Full, ColorRange::Studio] {
        let g = gpu.rgb_to_ycbcr(&rgb, range).unwrap();
        let c = cpu.rgb_to_ycbcr(&rgb, range).unwrap();
        assert_eq!(g.len(), c.len());
        for (i, (a, b)) in g.iter().zip(&c).enumerate() {
            assert!(
                (*a as i32 - *b as i32).abs() <= 1,
                "{range} fwd byte {i}: gpu={a} cpu={b}"
            );
        }

        let g = gpu.ycbcr_to_rgb(&c, range).unwrap();
        let c = cpu.ycbcr_to_rgb(&c, range).unwrap();
        for (i, (a, b)) in g.iter().zip(&c).enumerate() {
            assert!(
                (*a as i32 - *b as i32).abs() <= 1,
                "{range} inv byte {i}: gpu={a} cpu={b}"
            );
        }
    }
    assert_eq!(gpu.live_buffers(), 0);
}

#[test]
fn test_partial_trailing_pixel_left_zero() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(gpu) = create_test_accelerator() else {
        return;
    };
    let out = gpu.rgb_to_ycbcr(&[10, 20, 30, 40, 50], ColorRange::Full).unwrap();
    assert_eq!(&out[3..], &[0, 0]);
}

#[test]
fn test_failed_call_releases_buffers() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    // The 1 KiB LUT table is uploaded after the plane and output buffers.
    let Some(gpu) = create_accelerator_with(test_config().with_max_buffer_bytes(1000)) else {
        return;
    };
    let plane = test_plane(512);
    let lut = Lut::from_histogram(&Histogram::compute(&plane), plane.len()).unwrap();

    let err = gpu.apply_lut(&plane, &lut).unwrap_err();
    assert!(matches!(err, EqualizeError::DeviceOperation(_)), "{err}");
    assert_eq!(gpu.live_buffers(), 0);

    let hist = gpu.histogram(&plane).unwrap();
    assert_eq!(hist.total(), 512);
    assert_eq!(gpu.live_buffers(), 0);
}

#[test]
fn test_pipeline_on_gpu_scenarios() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(gpu) = create_test_accelerator() else {
        return;
    };
    let pipeline = EqualizationPipeline::with_handle(
        AcceleratorHandle::from_accelerator(gpu),
        ColorRange::Full,
    );

    let flat = Image::gray(2, 2, vec![10; 4]).unwrap();
    assert_eq!(pipeline.get_histogram(&flat).unwrap().bin(10), 4);
    assert_eq!(pipeline.equalize(&flat).unwrap().pixels, vec![255; 4]);

    let ramp = Image::gray(1, 4, vec![0, 85, 170, 255]).unwrap();
    let out = pipeline.equalize(&ramp).unwrap();
    assert!(out.pixels.windows(2).all(|w| w[0] < w[1]));

    let rgba: Vec<u8> = test_plane(64 * 4)
        .chunks(4)
        .flat_map(|px| [px[0], px[1], px[2], 128])
        .collect();
    let image = Image::from_parts(8, 8, 4, rgba).unwrap();
    let out = pipeline.equalize(&image).unwrap();
    assert!(out.pixels.chunks_exact(4).all(|px| px[3] == 128));
}
