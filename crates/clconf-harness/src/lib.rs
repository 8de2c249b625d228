//! Conformance harness for OpenCL numeric and bit-manipulation builtins.
//!
//! Each micro-test generates seeded inputs, runs one kernel per
//! configuration on a [`ComputeBackend`], recomputes every element on the
//! host and reports each mismatch. The binaries under `src/bin` run one test
//! each; the `clconf` runner can run any subset.

pub mod backend;
pub mod cases;
pub mod compare;
pub mod config;
pub mod driver;
pub mod element;
pub mod error;
pub mod exit;
pub mod generator;
pub mod kernels;
pub mod program;
pub mod reference;

use std::io;
use std::process::ExitCode;

pub use backend::{ComputeBackend, DeviceSummary, HostBackend, KernelArg, PlatformSummary, ProgramHandle};
pub use compare::{Comparator, ComparisonReport, EqualityPolicy, MismatchReport, Reporter};
pub use config::{BackendKind, ConfigError, DeviceKind, HarnessConfig};
pub use driver::{ConformanceCase, RunSummary, TestDriver, run_case, run_with_config};
pub use element::{Element, ElementType, HostBuffer, ScalarArg, VectorWidth};
pub use error::{HarnessError, Result};
pub use generator::{InputGenerator, TestVector};

/// Install the stderr `fmt` subscriber, filtered by `RUST_LOG` with `info`
/// as the floor. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Entry point of a single-test binary: configure from `CLCONF_*`, run
/// `case` and report on stdout.
pub fn run_standalone(case: &dyn ConformanceCase) -> ExitCode {
    init_tracing();
    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            let err = HarnessError::from(err);
            tracing::error!(case = case.name(), error = %err, "invalid configuration");
            if let Err(write_err) = Reporter::new(io::stdout().lock()).fatal(&err) {
                tracing::warn!(error = %write_err, "failed to write fatal error to report");
            }
            return ExitCode::from(exit::EXIT_FATAL);
        }
    };
    let summary = run_with_config(case, &config, io::stdout().lock());
    ExitCode::from(summary.exit_code(config.lenient_exit))
}
