//! OpenCL backend through the `opencl3` crate.
//!
//! Opens one device by configured platform index, device type and device
//! index, then builds and launches programs on an in-order queue. Every
//! launch waits for completion and reads its outputs back with blocking
//! reads.

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{
    CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU, Device,
};
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY};
use opencl3::platform::get_platforms;
use opencl3::program::Program;
use opencl3::types::{CL_BLOCKING, cl_device_type};
use tracing::{debug, info};

use super::{ComputeBackend, DeviceSummary, KernelArg, PlatformSummary, ProgramHandle};
use crate::config::{DeviceKind, HarnessConfig};
use crate::element::{ElementType, HostBuffer, ScalarArg};
use crate::error::{HarnessError, Result};
use crate::program::ProgramSource;

/// A device opened through the system's OpenCL ICD loader.
pub struct OpenClBackend {
    platform: PlatformSummary,
    device: DeviceSummary,
    context: Context,
    queue: CommandQueue,
    programs: Vec<Program>,
}

impl std::fmt::Debug for OpenClBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenClBackend")
            .field("platform", &self.platform)
            .field("device", &self.device)
            .field("programs", &self.programs.len())
            .finish()
    }
}

fn device_type_bits(kind: DeviceKind) -> cl_device_type {
    match kind {
        DeviceKind::All => CL_DEVICE_TYPE_ALL,
        DeviceKind::Gpu => CL_DEVICE_TYPE_GPU,
        DeviceKind::Cpu => CL_DEVICE_TYPE_CPU,
        DeviceKind::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
    }
}

fn setup(what: &str, err: impl std::fmt::Display) -> HarnessError {
    HarnessError::Setup(format!("{what}: {err}"))
}

/// Bound form of one kernel argument.
enum Bound {
    Input(Buffer<u8>),
    Output(Buffer<u8>, ElementType, usize),
    Scalar(ScalarArg),
}

impl OpenClBackend {
    pub fn open(config: &HarnessConfig) -> Result<Self> {
        let platforms = get_platforms().map_err(|e| setup("failed to get OpenCL platforms", e))?;
        debug!(count = platforms.len(), "OpenCL platforms found");
        if platforms.is_empty() {
            return Err(HarnessError::NoPlatform);
        }
        let platform = platforms.get(config.platform_index).ok_or_else(|| {
            HarnessError::Setup(format!(
                "platform index {} out of range: {} platform(s) available",
                config.platform_index,
                platforms.len()
            ))
        })?;
        let platform_summary = PlatformSummary {
            vendor: platform.vendor().unwrap_or_default(),
            name: platform.name().unwrap_or_default(),
            version: platform.version().unwrap_or_default(),
        };

        let device_ids = platform.get_devices(device_type_bits(config.device_type)).unwrap_or_default();
        debug!(platform = %platform_summary.name, count = device_ids.len(), "OpenCL devices found");
        if device_ids.is_empty() {
            return Err(HarnessError::NoDevice { platform: platform_summary.name });
        }
        let device_id = *device_ids.get(config.device_index).ok_or_else(|| {
            HarnessError::Setup(format!(
                "device index {} out of range: {} device(s) available",
                config.device_index,
                device_ids.len()
            ))
        })?;
        let device = Device::new(device_id);
        let device_summary = DeviceSummary {
            vendor: device.vendor().unwrap_or_default(),
            name: device.name().unwrap_or_default(),
            version: device.version().unwrap_or_default(),
        };

        let context =
            Context::from_device(&device).map_err(|e| setup("failed to create OpenCL context", e))?;
        let queue = CommandQueue::create_default_with_properties(&context, 0, 0)
            .map_err(|e| setup("failed to create command queue", e))?;

        info!(
            platform = %platform_summary.name,
            device = %device_summary,
            "OpenCL backend ready"
        );
        Ok(Self { platform: platform_summary, device: device_summary, context, queue, programs: Vec::new() })
    }

    fn bind(&self, kernel: &str, args: &[KernelArg]) -> Result<Vec<Bound>> {
        let buffer_error = |e: opencl3::error_codes::ClError| HarnessError::Launch {
            kernel: kernel.to_string(),
            reason: format!("buffer create: {e}"),
        };
        let mut bound = Vec::with_capacity(args.len());
        for arg in args {
            let entry = match arg {
                KernelArg::Input(data) => {
                    let mut bytes = data.to_ne_bytes();
                    // SAFETY: COPY_HOST_PTR copies `bytes` during creation; the
                    // pointer is valid for `bytes.len()` bytes.
                    let buffer = unsafe {
                        Buffer::<u8>::create(
                            &self.context,
                            CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR,
                            bytes.len(),
                            bytes.as_mut_ptr().cast(),
                        )
                    }
                    .map_err(buffer_error)?;
                    Bound::Input(buffer)
                }
                KernelArg::Output { element, len } => {
                    // SAFETY: no host pointer is supplied.
                    let buffer = unsafe {
                        Buffer::<u8>::create(
                            &self.context,
                            CL_MEM_WRITE_ONLY,
                            len * element.size_bytes(),
                            std::ptr::null_mut(),
                        )
                    }
                    .map_err(buffer_error)?;
                    Bound::Output(buffer, *element, *len)
                }
                KernelArg::Scalar(value) => Bound::Scalar(*value),
            };
            bound.push(entry);
        }
        Ok(bound)
    }
}

impl ComputeBackend for OpenClBackend {
    fn platform(&self) -> &PlatformSummary {
        &self.platform
    }

    fn device(&self) -> &DeviceSummary {
        &self.device
    }

    fn build(&mut self, source: &ProgramSource, options: &str) -> Result<ProgramHandle> {
        let program = Program::create_and_build_from_source(&self.context, source.text, options)
            .map_err(|log| HarnessError::Build { program: source.name.to_string(), log })?;
        info!(program = source.name, options, "OpenCL program built");
        self.programs.push(program);
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
        let launch_error = |what: &str, e: opencl3::error_codes::ClError| HarnessError::Launch {
            kernel: entry.to_string(),
            reason: format!("{what}: {e}"),
        };

        let program = self.programs.get(program.id()).ok_or_else(|| HarnessError::Launch {
            kernel: entry.to_string(),
            reason: "unknown program handle".into(),
        })?;
        let kernel = Kernel::create(program, entry).map_err(|e| launch_error("kernel create", e))?;
        let arity = kernel.num_args().map_err(|e| launch_error("kernel info", e))? as usize;
        if arity != args.len() {
            return Err(HarnessError::ArgumentMismatch {
                kernel: entry.to_string(),
                detail: format!("kernel takes {arity} arguments, {} bound", args.len()),
            });
        }

        let bound = self.bind(entry, args)?;

        // SAFETY: every argument is bound in declaration order with a type
        // matching the kernel signature; buffers outlive the wait below.
        let event = unsafe {
            let mut exec = ExecuteKernel::new(&kernel);
            for arg in &bound {
                match arg {
                    Bound::Input(buffer) | Bound::Output(buffer, ..) => {
                        exec.set_arg(&buffer.get());
                    }
                    Bound::Scalar(ScalarArg::Int(v)) => {
                        exec.set_arg(v);
                    }
                    Bound::Scalar(ScalarArg::Uint(v)) => {
                        exec.set_arg(v);
                    }
                    Bound::Scalar(ScalarArg::Ulong(v)) => {
                        exec.set_arg(v);
                    }
                    Bound::Scalar(ScalarArg::Float(v)) => {
                        exec.set_arg(v);
                    }
                }
            }
            exec.set_global_work_size(global);
            if let Some(local) = local {
                exec.set_local_work_size(local);
            }
            exec.enqueue_nd_range(&self.queue).map_err(|e| launch_error("enqueue", e))?
        };
        event.wait().map_err(|e| launch_error("kernel wait", e))?;
        self.queue.finish().map_err(|e| launch_error("queue finish", e))?;

        let readback_error = |reason: String| HarnessError::Readback { kernel: entry.to_string(), reason };
        let mut outputs = Vec::new();
        for arg in &bound {
            let Bound::Output(buffer, element, len) = arg else { continue };
            let mut bytes = vec![0u8; len * element.size_bytes()];
            // SAFETY: blocking read into a host slice of exactly the buffer size.
            unsafe { self.queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, &mut bytes, &[]) }
                .map_err(|e| readback_error(e.to_string()))?;
            let data = HostBuffer::from_ne_bytes(*element, &bytes)
                .ok_or_else(|| readback_error(format!("{} bytes is not a whole number of {element}", bytes.len())))?;
            outputs.push(data);
        }
        debug!(kernel = entry, global, outputs = outputs.len(), "OpenCL launch complete");
        Ok(outputs)
    }
}
