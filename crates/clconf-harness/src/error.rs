//! Error types for the conformance harness.
//!
//! Every backend fault is fatal for the test that hit it. Value mismatches
//! are not errors; they are counted by [`crate::compare`].

use crate::config::ConfigError;
use crate::element::ElementType;

/// Errors raised while setting up, building, or launching a conformance test.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The backend reported no compute platforms at all.
    #[error("no compute platforms found")]
    NoPlatform,

    /// The selected platform exposes no device of the requested type.
    #[error("no compute devices available on platform '{platform}'")]
    NoDevice { platform: String },

    /// Any other setup failure (index out of range, context creation, ...).
    #[error("setup failed: {0}")]
    Setup(String),

    /// Kernel source failed to compile. `log` is the backend's full build log.
    #[error("failed to build program '{program}'")]
    Build { program: String, log: String },

    /// Kernel creation, argument binding, enqueue, or wait failed.
    #[error("launch of kernel '{kernel}' failed: {reason}")]
    Launch { kernel: String, reason: String },

    /// Blocking copy from a device buffer back to host memory failed.
    #[error("readback for kernel '{kernel}' failed: {reason}")]
    Readback { kernel: String, reason: String },

    /// An argument list or output buffer did not have the expected shape.
    #[error("argument mismatch for '{kernel}': {detail}")]
    ArgumentMismatch { kernel: String, detail: String },

    /// A device output buffer came back with a different element type.
    #[error("expected {expected:?} output from '{kernel}', got {actual:?}")]
    OutputType { kernel: String, expected: ElementType, actual: ElementType },

    /// A test vector length is not a multiple of its storage width.
    #[error("vector length {len} is not a multiple of {lanes} storage lanes")]
    InvalidLength { len: usize, lanes: usize },

    /// A logical shift amount would leave `[0, bits)`.
    #[error("shift amount {amount} out of range for {bits}-bit operand")]
    ShiftOutOfRange { amount: u32, bits: u32 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing the report to its sink failed.
    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl HarnessError {
    /// Whether this error means the device or platform could not be opened.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::NoPlatform | Self::NoDevice { .. } | Self::Setup(_))
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
