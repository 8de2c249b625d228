//! Compute backends.
//!
//! A [`ComputeBackend`] owns one opened device: it builds programs and runs
//! one blocking launch at a time. [`HostBackend`] executes kernels in
//! software; `OpenClBackend` (feature `opencl`) drives a real OpenCL driver.

mod host;
mod host_kernels;
#[cfg(feature = "opencl")]
mod opencl;

pub use host::HostBackend;
#[cfg(feature = "opencl")]
pub use opencl::OpenClBackend;

use std::fmt;

use tracing::{info, warn};

use crate::config::{BackendKind, HarnessConfig};
use crate::element::{ElementType, HostBuffer, ScalarArg};
use crate::error::Result;
use crate::program::ProgramSource;

/// Identity of the platform a backend runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSummary {
    pub vendor: String,
    pub name: String,
    pub version: String,
}

/// Identity of the device a backend runs on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSummary {
    pub vendor: String,
    pub name: String,
    pub version: String,
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.vendor)
    }
}

/// A program built by a backend, valid only for that backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(usize);

impl ProgramHandle {
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    pub const fn id(self) -> usize {
        self.0
    }
}

/// One positional kernel argument.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelArg {
    /// Read-only buffer initialised from host data.
    Input(HostBuffer),
    /// Write-only buffer of `len` elements, read back after the launch.
    Output { element: ElementType, len: usize },
    /// By-value scalar.
    Scalar(ScalarArg),
}

impl KernelArg {
    pub fn output(element: ElementType, len: usize) -> Self {
        Self::Output { element, len }
    }
}

/// The narrow interface every conformance test runs against.
pub trait ComputeBackend {
    fn platform(&self) -> &PlatformSummary;

    fn device(&self) -> &DeviceSummary;

    /// Compile `source` with compiler `options`. A compile failure is
    /// [`crate::HarnessError::Build`] carrying the full build log.
    fn build(&mut self, source: &ProgramSource, options: &str) -> Result<ProgramHandle>;

    /// Bind `args` positionally, run `entry` over `global` work-items, wait
    /// for completion and read back every output buffer, in argument order.
    fn launch(
        &mut self,
        program: ProgramHandle,
        entry: &str,
        args: &[KernelArg],
        global: usize,
        local: Option<usize>,
    ) -> Result<Vec<HostBuffer>>;
}

/// Notice logged when a run lands on the host emulator only because this
/// build has no OpenCL backend.
fn emulator_notice(config: &HarnessConfig) -> Option<&'static str> {
    (config.backend == BackendKind::Host && !cfg!(feature = "opencl")).then_some(
        "running on the host emulator, not an OpenCL driver; build with `--features opencl` to test a real device",
    )
}

/// Open the backend selected by `config`.
pub fn open(config: &HarnessConfig) -> Result<Box<dyn ComputeBackend>> {
    if let Some(notice) = emulator_notice(config) {
        warn!("{notice}");
    }
    let backend: Box<dyn ComputeBackend> = match config.backend {
        BackendKind::Host => Box::new(HostBackend::open(config)?),
        BackendKind::OpenCl => open_opencl(config)?,
    };
    info!(
        platform = %backend.platform().name,
        device = %backend.device(),
        "compute backend opened"
    );
    Ok(backend)
}

#[cfg(feature = "opencl")]
fn open_opencl(config: &HarnessConfig) -> Result<Box<dyn ComputeBackend>> {
    Ok(Box::new(OpenClBackend::open(config)?))
}

#[cfg(not(feature = "opencl"))]
fn open_opencl(_config: &HarnessConfig) -> Result<Box<dyn ComputeBackend>> {
    Err(crate::error::HarnessError::Setup(
        "built without the `opencl` feature; rebuild with it or set CLCONF_BACKEND=host".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_host_backend() {
        let config = HarnessConfig { backend: BackendKind::Host, ..HarnessConfig::default() };
        let backend = open(&config).unwrap();
        assert!(!backend.platform().name.is_empty());
    }

    #[cfg(not(feature = "opencl"))]
    #[test]
    fn default_build_flags_the_emulator() {
        let config = HarnessConfig::default();
        assert_eq!(config.backend, BackendKind::Host);
        assert!(emulator_notice(&config).is_some_and(|n| n.contains("--features opencl")));
    }

    #[cfg(feature = "opencl")]
    #[test]
    fn opencl_build_defaults_to_the_driver() {
        let config = HarnessConfig::default();
        assert_eq!(config.backend, BackendKind::OpenCl);
        assert_eq!(emulator_notice(&config), None);
        let host = HarnessConfig { backend: BackendKind::Host, ..config };
        assert_eq!(emulator_notice(&host), None);
    }

    #[cfg(not(feature = "opencl"))]
    #[test]
    fn opencl_without_feature_is_setup_error() {
        let config = HarnessConfig { backend: BackendKind::OpenCl, ..HarnessConfig::default() };
        let err = open(&config).err().unwrap();
        assert!(err.is_setup());
    }
}
