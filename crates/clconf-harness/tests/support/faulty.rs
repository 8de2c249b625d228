//! Backends that misbehave on purpose, wrapping the host device.

use clconf_harness::backend::{ComputeBackend, DeviceSummary, KernelArg, PlatformSummary, ProgramHandle};
use clconf_harness::program::ProgramSource;
use clconf_harness::{HarnessError, HostBackend, HostBuffer, Result};

/// Flips the lowest bit of the first element of every output buffer.
pub struct CorruptingBackend {
    inner: HostBackend,
}

impl CorruptingBackend {
    pub fn new() -> Self {
        Self { inner: HostBackend::new() }
    }
}

impl ComputeBackend for CorruptingBackend {
    fn platform(&self) -> &PlatformSummary {
        self.inner.platform()
    }

    fn device(&self) -> &DeviceSummary {
        self.inner.device()
    }

    fn build(&mut self, source: &ProgramSource, options: &str) -> Result<ProgramHandle> {
        self.inner.build(source, options)
    }

    fn launch(
        &mut self,
        program: ProgramHandle,
        entry: &str,
        args: &[KernelArg],
        global: usize,
        local: Option<usize>,
    ) -> Result<Vec<HostBuffer>> {
        let outputs = self.inner.launch(program, entry, args, global, local)?;
        Ok(outputs.into_iter().map(corrupt_first).collect())
    }
}

fn corrupt_first(buffer: HostBuffer) -> HostBuffer {
    let element = buffer.element_type();
    let mut bytes = buffer.to_ne_bytes();
    let index = if cfg!(target_endian = "little") { 0 } else { element.size_bytes().saturating_sub(1) };
    match bytes.get_mut(index) {
        Some(byte) => *byte ^= 1,
        None => return buffer,
    }
    HostBuffer::from_ne_bytes(element, &bytes).unwrap_or(buffer)
}

/// Rejects every program with a fixed build log.
pub struct FailingBuildBackend {
    inner: HostBackend,
}

impl FailingBuildBackend {
    pub const LOG: &'static str = "<kernel>:3:5: error: use of undeclared identifier 'y'";

    pub fn new() -> Self {
        Self { inner: HostBackend::new() }
    }
}

impl ComputeBackend for FailingBuildBackend {
    fn platform(&self) -> &PlatformSummary {
        self.inner.platform()
    }

    fn device(&self) -> &DeviceSummary {
        self.inner.device()
    }

    fn build(&mut self, source: &ProgramSource, _options: &str) -> Result<ProgramHandle> {
        Err(HarnessError::Build { program: source.name.to_string(), log: Self::LOG.to_string() })
    }

    fn launch(
        &mut self,
        program: ProgramHandle,
        entry: &str,
        args: &[KernelArg],
        global: usize,
        local: Option<usize>,
    ) -> Result<Vec<HostBuffer>> {
        self.inner.launch(program, entry, args, global, local)
    }
}

/// Lets `remaining` launches through, then fails every launch.
pub struct AbortingBackend {
    inner: HostBackend,
    remaining: usize,
}

impl AbortingBackend {
    pub fn after(launches: usize) -> Self {
        Self { inner: HostBackend::new(), remaining: launches }
    }
}

impl ComputeBackend for AbortingBackend {
    fn platform(&self) -> &PlatformSummary {
        self.inner.platform()
    }

    fn device(&self) -> &DeviceSummary {
        self.inner.device()
    }

    fn build(&mut self, source: &ProgramSource, options: &str) -> Result<ProgramHandle> {
        self.inner.build(source, options)
    }

    fn launch(
        &mut self,
        program: ProgramHandle,
        entry: &str,
        args: &[KernelArg],
        global: usize,
        local: Option<usize>,
    ) -> Result<Vec<HostBuffer>> {
        if self.remaining == 0 {
            return Err(HarnessError::Launch {
                kernel: entry.to_string(),
                reason: "CL_OUT_OF_RESOURCES".into(),
            });
        }
        self.remaining -= 1;
        self.inner.launch(program, entry, args, global, local)
    }
}

/// Answers `fmin(±0, ∓0)` with `-0` whatever the operand order, as a
/// `minss`-style device may.
pub struct NegativeZeroBackend {
    inner: HostBackend,
    /// Results rewritten by the last launches.
    pub rewritten: usize,
}

impl NegativeZeroBackend {
    pub fn new() -> Self {
        Self { inner: HostBackend::new(), rewritten: 0 }
    }
}

impl ComputeBackend for NegativeZeroBackend {
    fn platform(&self) -> &PlatformSummary {
        self.inner.platform()
    }

    fn device(&self) -> &DeviceSummary {
        self.inner.device()
    }

    fn build(&mut self, source: &ProgramSource, options: &str) -> Result<ProgramHandle> {
        self.inner.build(source, options)
    }

    fn launch(
        &mut self,
        program: ProgramHandle,
        entry: &str,
        args: &[KernelArg],
        global: usize,
        local: Option<usize>,
    ) -> Result<Vec<HostBuffer>> {
        let mut outputs = self.inner.launch(program, entry, args, global, local)?;
        if let (
            Some(KernelArg::Input(HostBuffer::F32(a))),
            Some(KernelArg::Input(HostBuffer::F32(b))),
            Some(HostBuffer::F32(out)),
        ) = (args.first(), args.get(1), outputs.first_mut())
        {
            for ((x, y), r) in a.iter().zip(b).zip(out.iter_mut()) {
                if entry.starts_with("fmin") && *x == 0.0 && *y == 0.0 {
                    *r = -0.0;
                    self.rewritten += 1;
                }
            }
        }
        Ok(outputs)
    }
}
