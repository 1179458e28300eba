//! `lumeq histogram`

use anyhow::Result;
use lumeq_gpu::{EngineConfig, EqualizationPipeline};

use super::load_raw;
use crate::HistogramArgs;

pub fn run(args: HistogramArgs, config: &EngineConfig) -> Result<()> {
    let raw = load_raw(&args.input)?;
    let pipeline = EqualizationPipeline::new(config)?;
    let histogram = pipeline.histogram_raw(&raw)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&histogram)?);
        return Ok(());
    }

    println!("{}: {}x{} {}", args.input.display(), raw.width, raw.height, raw.format);
    println!("Total: {}  Peak: {}", histogram.total(), histogram.peak());
    for (value, &count) in histogram.bins().iter().enumerate() {
        if count > 0 {
            println!("{value:>3}  {count}");
        }
    }
    Ok(())
}
