//! `lumeq equalize`

use anyhow::{Context, Result};
use lumeq_core::{ConversionRecord, RecordSink, pixel};
use lumeq_gpu::{EngineConfig, EqualizationPipeline};

use super::{load_raw, save_image};
use crate::EqualizeArgs;

/// Forwards records to the log.
struct LogSink;

impl RecordSink for LogSink {
    fn record(&mut self, record: &ConversionRecord) {
        tracing::debug!(
            "record: {} px, {} ({} cores), {:.3} ms",
            record.pixel_count,
            record.device_name,
            record.core_count,
            record.elapsed_ms
        );
    }
}

pub fn run(args: EqualizeArgs, config: &EngineConfig) -> Result<()> {
    let raw = load_raw(&args.input)?;
    let image = pixel::decode(&raw).context("Unsupported input layout")?;

    let mut pipeline = EqualizationPipeline::new(config)?;
    pipeline.set_record_sink(Box::new(LogSink));
    let (out, record) = pipeline.equalize_timed(&image)?;

    save_image(&args.output, &out)?;
    println!(
        "{} -> {} ({:.2} ms on {})",
        args.input.display(),
        args.output.display(),
        record.elapsed_ms,
        record.device_name
    );
    Ok(())
}
