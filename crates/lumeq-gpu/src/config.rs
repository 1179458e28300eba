//! Engine configuration read from `LUMEQ_*` environment variables.

use std::fmt;
use std::str::FromStr;

use lumeq_core::{ArchVersion, ColorRange};

/// Which backend the engine should bind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendPreference {
    /// Try a GPU adapter first and fall back to the CPU backend.
    #[default]
    Auto,
    /// Require a GPU adapter.
    Gpu,
    /// Always use the CPU backend.
    Cpu,
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu" | "wgpu" => Ok(Self::Gpu),
            "cpu" | "rayon" => Ok(Self::Cpu),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Runtime configuration for the equalization engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Backend selection policy.
    pub backend: BackendPreference,
    /// Adapter power preference used to order GPU candidates.
    pub power_preference: wgpu::PowerPreference,
    /// Whether software (`DeviceType::Cpu`) adapters may be bound.
    pub allow_software_adapter: bool,
    /// YCbCr convention for color images.
    pub color_range: ColorRange,
    /// Compute architecture of the GPU, for the core-count table.
    pub architecture: Option<ArchVersion>,
    /// Multiprocessor count of the GPU.
    pub multiprocessors: Option<u32>,
    /// Cap on any single device buffer, below the adapter's own limit.
    pub max_buffer_bytes: Option<u64>,
}

impl EngineConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration from any key source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::builtin();
        Self {
            backend: parse_or("LUMEQ_BACKEND", &lookup, defaults.backend),
            power_preference: lookup("LUMEQ_POWER")
                .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                    "low" | "low-power" => wgpu::PowerPreference::LowPower,
                    "high" | "high-performance" => wgpu::PowerPreference::HighPerformance,
                    "none" => wgpu::PowerPreference::None,
                    other => {
                        tracing::warn!("Ignoring LUMEQ_POWER={other}: expected low or high");
                        defaults.power_preference
                    }
                })
                .unwrap_or(defaults.power_preference),
            allow_software_adapter: lookup("LUMEQ_ALLOW_SOFTWARE")
                .map(|raw| matches!(raw.trim(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.allow_software_adapter),
            color_range: parse_or("LUMEQ_COLOR_RANGE", &lookup, defaults.color_range),
            architecture: parse_opt("LUMEQ_ARCH", &lookup),
            multiprocessors: parse_opt("LUMEQ_SM_COUNT", &lookup),
            max_buffer_bytes: parse_opt("LUMEQ_MAX_BUFFER_BYTES", &lookup),
        }
    }

    /// Built-in defaults, ignoring the environment.
    pub fn builtin() -> Self {
        Self {
            backend: BackendPreference::Auto,
            power_preference: wgpu::PowerPreference::HighPerformance,
            allow_software_adapter: false,
            color_range: ColorRange::Full,
            architecture: None,
            multiprocessors: None,
            max_buffer_bytes: None,
        }
    }

    /// Same configuration with a different backend preference.
    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    /// Same configuration with a per-buffer size cap.
    pub fn with_max_buffer_bytes(mut self, bytes: u64) -> Self {
        self.max_buffer_bytes = Some(bytes);
        self
    }

    /// Same configuration with a different color range.
    pub fn with_color_range(mut self, color_range: ColorRange) -> Self {
        self.color_range = color_range;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    parse_opt(key, lookup).unwrap_or(default)
}

fn parse_opt<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {key}={raw}: {e}");
            None
        }
    }
}
