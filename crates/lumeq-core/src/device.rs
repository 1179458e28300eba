//! Accelerator descriptor and the architecture → core-count table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compute architecture version (e.g. CUDA compute capability 8.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchVersion {
    pub major: u32,
    pub minor: u32,
}

impl ArchVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ArchVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ArchVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("expected MAJOR.MINOR, got '{s}'"))?;
        let major = major.parse().map_err(|_| format!("bad major version in '{s}'"))?;
        let minor = minor.parse().map_err(|_| format!("bad minor version in '{s}'"))?;
        Ok(Self { major, minor })
    }
}

/// Known (major, minor) → cores per multiprocessor.
const CORES_PER_MULTIPROCESSOR: &[((u32, u32), u32)] = &[
    // Fermi
    ((2, 0), 32),
    ((2, 1), 48),
    // Kepler
    ((3, 0), 192),
    ((3, 2), 192),
    ((3, 5), 192),
    ((3, 7), 192),
    // Maxwell
    ((5, 0), 128),
    ((5, 2), 128),
    ((5, 3), 128),
    // Pascal
    ((6, 0), 64),
    ((6, 1), 128),
    ((6, 2), 128),
    // Volta
    ((7, 0), 64),
    ((7, 2), 64),
    // Turing
    ((7, 5), 64),
    // Ampere
    ((8, 0), 64),
    ((8, 6), 128),
    ((8, 7), 128),
    // Ada
    ((8, 9), 128),
    // Hopper
    ((9, 0), 128),
];

/// Cores per multiprocessor for an architecture.
///
/// Unlisted versions fall back to 64 for major >= 7, else 128.
pub fn cores_per_multiprocessor(arch: ArchVersion) -> u32 {
    CORES_PER_MULTIPROCESSOR
        .iter()
        .find(|(key, _)| *key == (arch.major, arch.minor))
        .map(|&(_, cores)| cores)
        .unwrap_or(if arch.major >= 7 { 64 } else { 128 })
}

/// Which kind of backend a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// wgpu compute device.
    Gpu,
    /// rayon thread pool.
    Cpu,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Immutable description of a bound accelerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Adapter or backend name.
    pub name: String,
    /// Derived parallel core count; 0 when unknown.
    pub core_count: u32,
    /// Backend kind.
    pub kind: BackendKind,
    /// Free-form backend details (graphics API, device type).
    pub details: String,
}

impl DeviceDescriptor {
    /// Descriptor for a GPU whose architecture may or may not be known.
    ///
    /// `core_count` is `multiprocessors * cores_per_multiprocessor(arch)`
    /// when both are provided, otherwise 0.
    pub fn gpu(
        name: impl Into<String>,
        details: impl Into<String>,
        arch: Option<ArchVersion>,
        multiprocessors: Option<u32>,
    ) -> Self {
        let core_count = match (arch, multiprocessors) {
            (Some(arch), Some(sm)) => sm.saturating_mul(cores_per_multiprocessor(arch)),
            _ => 0,
        };
        Self {
            name: name.into(),
            core_count,
            kind: BackendKind::Gpu,
            details: details.into(),
        }
    }

    /// Descriptor for the CPU backend.
    pub fn cpu(threads: usize) -> Self {
        Self {
            name: format!("CPU ({threads} threads)"),
            core_count: u32::try_from(threads).unwrap_or(u32::MAX),
            kind: BackendKind::Cpu,
            details: "rayon".to_string(),
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}; {} cores; {}]",
            self.name, self.kind, self.core_count, self.details
        )
    }
}
