//! `lumeq device`

use anyhow::Result;
use lumeq_gpu::{EngineConfig, EqualizationPipeline};

pub fn run(config: &EngineConfig) -> Result<()> {
    let pipeline = EqualizationPipeline::new(config)?;
    let device = pipeline.device()?;

    println!("Device:      {}", device.name);
    println!("Backend:     {}", device.kind);
    println!("Details:     {}", device.details);
    if device.core_count > 0 {
        println!("Cores:       {}", device.core_count);
    } else {
        println!("Cores:       unknown");
    }
    println!("Color range: {}", pipeline.color_range());
    Ok(())
}
