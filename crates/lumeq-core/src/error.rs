//! Error taxonomy shared by every engine operation.

/// Errors produced by the equalization engine.
///
/// Input errors are always raised before any accelerator work is issued.
#[derive(Debug, thiserror::Error)]
pub enum EqualizeError {
    /// No compatible accelerator could be bound.
    #[error("accelerator initialization failed: {0}")]
    Initialization(String),
    /// Non-positive width/height or a buffer whose length does not match.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
    /// Channel count outside {1, 3, 4}.
    #[error("unsupported channel count: {0} (expected 1, 3 or 4)")]
    UnsupportedChannelCount(u32),
    /// Pixel data missing.
    #[error("no pixel data supplied")]
    NullInput,
    /// The accelerator handle was used after `dispose`.
    #[error("accelerator used after dispose")]
    UseAfterDispose,
    /// Kernel launch, synchronization, or transfer failure.
    #[error("device operation failed: {0}")]
    DeviceOperation(String),
    /// A cancellation token was observed between pipeline stages.
    #[error("operation cancelled")]
    Cancelled,
}

/// Coarse classification for deciding how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input shape; the caller can fix it.
    Input,
    /// Missing or failing accelerator; needs hardware/driver changes.
    Environment,
    /// Handle lifecycle misuse.
    Lifecycle,
    /// Caller-requested cancellation.
    Cancelled,
}

impl EqualizeError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidDimensions(_) | Self::UnsupportedChannelCount(_) | Self::NullInput => {
                ErrorClass::Input
            }
            Self::Initialization(_) | Self::DeviceOperation(_) => ErrorClass::Environment,
            Self::UseAfterDispose => ErrorClass::Lifecycle,
            Self::Cancelled => ErrorClass::Cancelled,
        }
    }

    pub(crate) fn dims(msg: impl Into<String>) -> Self {
        Self::InvalidDimensions(msg.into())
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, EqualizeError>;
