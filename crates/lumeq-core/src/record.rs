//! Conversion timing record handed to the persistence collaborator.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::device::DeviceDescriptor;

/// One successful equalize call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub pixel_count: u64,
    pub device_name: String,
    pub core_count: u32,
    pub elapsed_ms: f64,
    pub timestamp: SystemTime,
}

impl ConversionRecord {
    /// Record a call that finished now and took `elapsed`.
    pub fn new(pixel_count: u64, device: &DeviceDescriptor, elapsed: Duration) -> Self {
        Self {
            pixel_count,
            device_name: device.name.clone(),
            core_count: device.core_count,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            timestamp: SystemTime::now(),
        }
    }
}

/// Receives conversion records. Storage is the implementor's concern.
pub trait RecordSink: Send {
    fn record(&mut self, record: &ConversionRecord);
}

impl RecordSink for Vec<ConversionRecord> {
    fn record(&mut self, record: &ConversionRecord) {
        self.push(record.clone());
    }
}
