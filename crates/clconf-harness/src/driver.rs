//! Test driver: runs a conformance case's configurations against a backend.
//!
//! One driver serves every test. A case describes its configurations (kernel
//! source, build defines, kernel variants) and how to run one of them; the
//! driver builds the program per configuration, labels and prints reports,
//! and stops at the first fatal error.

use std::collections::VecDeque;
use std::io::Write;

use tracing::{error, info, warn};

use crate::backend::{self, ComputeBackend, KernelArg, ProgramHandle};
use crate::compare::{ComparisonReport, Reporter};
use crate::config::HarnessConfig;
use crate::element::{Element, ElementType, HostBuffer, VectorWidth, cl_type_name};
use crate::error::{HarnessError, Result};
use crate::exit::{EXIT_FATAL, EXIT_MISMATCH, EXIT_SUCCESS};
use crate::generator::InputGenerator;
use crate::program::{BuildDefine, ProgramSource, build_options};

/// One kernel variant of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub entry: &'static str,
    pub element: ElementType,
    pub width: VectorWidth,
}

impl OperationSpec {
    pub const fn new(entry: &'static str, element: ElementType, width: VectorWidth) -> Self {
        Self { entry, element, width }
    }
}

/// A program plus the defines it is built with and the variants launched
/// from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub label: String,
    pub program: ProgramSource,
    pub defines: Vec<BuildDefine>,
    pub variants: Vec<OperationSpec>,
}

impl Configuration {
    pub fn new(label: impl Into<String>, program: ProgramSource) -> Self {
        Self { label: label.into(), program, defines: Vec::new(), variants: Vec::new() }
    }

    /// A configuration of a `TYPE`-parameterized program: labelled with the
    /// OpenCL type name and built with `-DTYPE=<name>`.
    pub fn typed(program: ProgramSource, entry: &'static str, element: ElementType, width: VectorWidth) -> Self {
        let name = cl_type_name(element, width);
        Self::new(name.clone(), program)
            .define("TYPE", name)
            .variant(OperationSpec::new(entry, element, width))
    }

    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push(BuildDefine::new(name, value));
        self
    }

    pub fn variant(mut self, spec: OperationSpec) -> Self {
        self.variants.push(spec);
        self
    }

    pub fn options(&self) -> String {
        build_options(&self.defines)
    }

    /// The single variant of a one-variant configuration.
    pub fn primary(&self) -> Result<OperationSpec> {
        self.variants.first().copied().ok_or_else(|| HarnessError::ArgumentMismatch {
            kernel: self.program.name.to_string(),
            detail: format!("configuration '{}' has no kernel variants", self.label),
        })
    }
}

/// A conformance micro-test.
pub trait ConformanceCase {
    /// Binary and CLI name.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn configurations(&self) -> Vec<Configuration>;

    /// Generate inputs, launch every variant of `config` in the session's
    /// built program, and compare against the reference. Reports come back
    /// in variant order.
    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>>;
}

/// Output buffers of one launch, consumed in argument order.
#[derive(Debug)]
pub struct LaunchOutputs {
    kernel: String,
    buffers: VecDeque<HostBuffer>,
}

impl LaunchOutputs {
    pub fn new(kernel: impl Into<String>, buffers: Vec<HostBuffer>) -> Self {
        Self { kernel: kernel.into(), buffers: buffers.into() }
    }

    /// Take the next output buffer as `T` elements.
    pub fn next<T: Element>(&mut self) -> Result<Vec<T>> {
        let buffer = self.buffers.pop_front().ok_or_else(|| HarnessError::ArgumentMismatch {
            kernel: self.kernel.clone(),
            detail: "backend returned fewer output buffers than expected".into(),
        })?;
        let actual = buffer.element_type();
        T::from_owned(buffer).ok_or_else(|| HarnessError::OutputType {
            kernel: self.kernel.clone(),
            expected: T::TYPE,
            actual,
        })
    }
}

/// State shared by the configurations of one case run.
pub struct Session<'a> {
    backend: &'a mut dyn ComputeBackend,
    generator: InputGenerator,
    local: Option<usize>,
    program: Option<ProgramHandle>,
}

impl<'a> Session<'a> {
    pub fn new(backend: &'a mut dyn ComputeBackend, seed: u64, local: Option<usize>) -> Self {
        Self { backend, generator: InputGenerator::new(seed), local, program: None }
    }

    pub fn generator(&mut self) -> &mut InputGenerator {
        &mut self.generator
    }

    /// Build the configuration's program; later launches use it.
    pub fn build(&mut self, config: &Configuration) -> Result<()> {
        let options = config.options();
        info!(program = config.program.name, options = %options, "building program");
        self.program = Some(self.backend.build(&config.program, &options)?);
        Ok(())
    }

    /// Launch `entry` of the current program over `global` work-items.
    pub fn launch(&mut self, entry: &str, args: &[KernelArg], global: usize) -> Result<LaunchOutputs> {
        let program = self.program.ok_or_else(|| HarnessError::Launch {
            kernel: entry.to_string(),
            reason: "no program has been built".into(),
        })?;
        let local = self.local.filter(|&l| l != 0 && global % l == 0);
        if local.is_none() && self.local.is_some() {
            warn!(kernel = entry, global, local = ?self.local, "local size does not divide global size, letting the driver choose");
        }
        let buffers = self.backend.launch(program, entry, args, global, local)?;
        Ok(LaunchOutputs::new(entry, buffers))
    }
}

/// Outcome of running one case.
#[derive(Debug)]
pub struct RunSummary {
    pub case: String,
    pub reports: Vec<ComparisonReport>,
    pub fatal: Option<HarnessError>,
}

impl RunSummary {
    pub fn failed(case: impl Into<String>, err: HarnessError) -> Self {
        Self { case: case.into(), reports: Vec::new(), fatal: Some(err) }
    }

    pub fn mismatch_count(&self) -> usize {
        self.reports.iter().map(ComparisonReport::mismatch_count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.fatal.is_none() && self.mismatch_count() == 0
    }

    /// `1` on a fatal error, otherwise `2` if any value mismatched, else `0`.
    /// With `lenient`, mismatches alone exit `0`.
    pub fn exit_code(&self, lenient: bool) -> u8 {
        if self.fatal.is_some() {
            EXIT_FATAL
        } else if self.mismatch_count() > 0 && !lenient {
            EXIT_MISMATCH
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Summary label of the `index`-th report of a configuration.
pub fn summary_label(index: usize, count: usize) -> String {
    if count == 1 { "Wrong".to_string() } else { format!("Wrong{}", index + 1) }
}

/// Runs cases against one opened backend.
pub struct TestDriver<'a, W: Write> {
    backend: &'a mut dyn ComputeBackend,
    reporter: &'a mut Reporter<W>,
    seed: u64,
    local: Option<usize>,
}

impl<'a, W: Write> TestDriver<'a, W> {
    pub fn new(backend: &'a mut dyn ComputeBackend, reporter: &'a mut Reporter<W>, config: &HarnessConfig) -> Self {
        Self { backend, reporter, seed: config.seed, local: config.local_work_size }
    }

    pub fn run(&mut self, case: &dyn ConformanceCase) -> RunSummary {
        let mut summary = RunSummary { case: case.name().to_string(), reports: Vec::new(), fatal: None };
        info!(case = case.name(), seed = self.seed, "running conformance case");
        if let Err(err) = self.run_configurations(case, &mut summary) {
            error!(case = case.name(), error = %err, "conformance case aborted");
            if let Err(write_err) = self.reporter.fatal(&err) {
                warn!(error = %write_err, "failed to write fatal error to report");
            }
            summary.fatal = Some(err);
        }
        summary
    }

    fn run_configurations(&mut self, case: &dyn ConformanceCase, summary: &mut RunSummary) -> Result<()> {
        let mut session = Session::new(&mut *self.backend, self.seed, self.local);
        for config in case.configurations() {
            self.reporter.configuration(case.name(), &config.label)?;
            session.build(&config)?;
            let mut reports = case.run_configuration(&config, &mut session)?;
            let count = reports.len();
            for (index, report) in reports.iter_mut().enumerate() {
                report.label = summary_label(index, count);
                self.reporter.report(report)?;
            }
            summary.reports.extend(reports);
        }
        Ok(())
    }
}

/// Print the banner and run `case` on an already opened backend.
pub fn run_case<W: Write>(
    case: &dyn ConformanceCase,
    backend: &mut dyn ComputeBackend,
    config: &HarnessConfig,
    reporter: &mut Reporter<W>,
) -> RunSummary {
    if let Err(err) = reporter.banner(backend.platform(), backend.device()) {
        return RunSummary::failed(case.name(), err);
    }
    TestDriver::new(backend, reporter, config).run(case)
}

/// Open the configured backend and run `case`, reporting to `out`.
pub fn run_with_config<W: Write>(case: &dyn ConformanceCase, config: &HarnessConfig, out: W) -> RunSummary {
    let mut reporter = Reporter::new(out);
    match backend::open(config) {
        Ok(mut backend) => run_case(case, backend.as_mut(), config, &mut reporter),
        Err(err) => {
            error!(case = case.name(), error = %err, "failed to open compute backend");
            if let Err(write_err) = reporter.fatal(&err) {
                warn!(error = %write_err, "failed to write fatal error to report");
            }
            RunSummary::failed(case.name(), err)
        }
    }
}
