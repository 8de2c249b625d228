//! Software compute device.
//!
//! `HostBackend` "compiles" a program by checking what a real compiler would
//! reject first (no kernels, an unresolved `TYPE`, a malformed define) and
//! runs known kernels work-item by work-item on the host. Useful on machines
//! without an OpenCL ICD, and as the device in the harness's own tests.

use tracing::{debug, info};

use super::host_kernels::{self, Invocation};
use super::{ComputeBackend, DeviceSummary, KernelArg, PlatformSummary, ProgramHandle};
use crate::config::{DeviceKind, HarnessConfig};
use crate::element::{ElementType, HostBuffer, VectorWidth, parse_cl_type};
use crate::error::{HarnessError, Result};
use crate::program::{ProgramSource, kernel_signatures, parse_defines};

const PLATFORM_NAME: &str = "clconf host emulator";

struct HostProgram {
    name: &'static str,
    kernels: Vec<(&'static str, usize)>,
    type_param: Option<(ElementType, VectorWidth)>,
}

/// Executes kernels on the host CPU, one work-item at a time.
pub struct HostBackend {
    platform: PlatformSummary,
    device: DeviceSummary,
    programs: Vec<HostProgram>,
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend {
    pub fn new() -> Self {
        Self {
            platform: PlatformSummary {
                vendor: "clconf".into(),
                name: PLATFORM_NAME.into(),
                version: "OpenCL 1.2 host".into(),
            },
            device: DeviceSummary {
                vendor: "clconf".into(),
                name: "host cpu".into(),
                version: "OpenCL 1.2".into(),
            },
            programs: Vec::new(),
        }
    }

    /// Open the single host device, honouring the configured indices and
    /// device type the same way a one-platform, one-CPU driver would.
    pub fn open(config: &HarnessConfig) -> Result<Self> {
        if config.platform_index != 0 {
            return Err(HarnessError::Setup(format!(
                "platform index {} out of range: 1 platform available",
                config.platform_index
            )));
        }
        if matches!(config.device_type, DeviceKind::Gpu | DeviceKind::Accelerator) {
            return Err(HarnessError::NoDevice { platform: PLATFORM_NAME.into() });
        }
        if config.device_index != 0 {
            return Err(HarnessError::Setup(format!(
                "device index {} out of range: 1 device available",
                config.device_index
            )));
        }
        let backend = Self::new();
        info!(device = %backend.device, "host backend ready");
        Ok(backend)
    }
}

/// First line mentioning the `TYPE` placeholder, 1-based.
fn placeholder_line(text: &str) -> Option<usize> {
    text.lines().position(|line| uses_placeholder(line)).map(|i| i + 1)
}

fn uses_placeholder(text: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).any(|token| token == "TYPE")
}

impl ComputeBackend for HostBackend {
    fn platform(&self) -> &PlatformSummary {
        &self.platform
    }

    fn device(&self) -> &DeviceSummary {
        &self.device
    }

    fn build(&mut self, source: &ProgramSource, options: &str) -> Result<ProgramHandle> {
        let fail = |log: String| HarnessError::Build { program: source.name.to_string(), log };

        let defines = parse_defines(options).map_err(|e| fail(format!("error: {e}")))?;
        let kernels: Vec<_> =
            kernel_signatures(source.text).into_iter().map(|sig| (sig.name, sig.arity)).collect();
        if kernels.is_empty() {
            return Err(fail(format!("{}: error: no __kernel functions defined", source.name)));
        }

        let type_param = match placeholder_line(source.text) {
            None => None,
            Some(line) => {
                let Some(define) = defines.iter().find(|d| d.name == "TYPE") else {
                    return Err(fail(format!(
                        "{}:{line}: error: unknown type name 'TYPE'",
                        source.name
                    )));
                };
                let parsed = parse_cl_type(&define.value).ok_or_else(|| {
                    fail(format!("{}:{line}: error: unknown type name '{}'", source.name, define.value))
                })?;
                Some(parsed)
            }
        };

        debug!(program = source.name, options, kernels = kernels.len(), "host program built");
        self.programs.push(HostProgram { name: source.name, kernels, type_param });
        Ok(ProgramHandle::new(self.programs.len() - 1))
    }

    fn launch(
        &mut self,
        program: ProgramHandle,
        entry: &str,
        args: &[KernelArg],
        global: usize,
        local: Option<usize>,
    ) -> Result<Vec<HostBuffer>> {
        let launch_error = |reason: String| HarnessError::Launch { kernel: entry.to_string(), reason };

        let program = self
            .programs
            .get(program.id())
            .ok_or_else(|| launch_error("CL_INVALID_PROGRAM: unknown program handle".into()))?;
        let Some(&(_, arity)) = program.kernels.iter().find(|(name, _)| *name == entry) else {
            return Err(launch_error(format!(
                "CL_INVALID_KERNEL_NAME: no kernel '{entry}' in program '{}'",
                program.name
            )));
        };
        if arity != args.len() {
            return Err(HarnessError::ArgumentMismatch {
                kernel: entry.to_string(),
                detail: format!("kernel takes {arity} arguments, {} bound", args.len()),
            });
        }
        if global == 0 {
            return Err(launch_error("CL_INVALID_GLOBAL_WORK_SIZE: global size is 0".into()));
        }
        if let Some(local) = local {
            if local == 0 || global % local != 0 {
                return Err(launch_error(format!(
                    "CL_INVALID_WORK_GROUP_SIZE: global size {global} is not a multiple of local size {local}"
                )));
            }
        }

        let mut invocation = Invocation::new(entry, args, program.type_param, global);
        host_kernels::dispatch(&mut invocation)?;
        debug!(kernel = entry, global, "host launch complete");
        Ok(invocation.into_outputs())
    }
}
