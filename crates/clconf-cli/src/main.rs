//! `clconf`: list and run the conformance micro-tests.
//!
//! Each selected test runs against a freshly opened backend and prints the
//! same report its standalone binary would. The process exits with the worst
//! exit code of the run.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use clconf_harness::config::{BackendKind, DeviceKind, HarnessConfig, parse_seed};
use clconf_harness::exit::{EXIT_SUCCESS, worst};
use clconf_harness::{ConformanceCase, cases};

/// Conformance micro-tests for OpenCL builtins
#[derive(Parser, Debug)]
#[command(name = "clconf")]
#[command(version)]
#[command(about = "Run OpenCL builtin conformance micro-tests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available tests
    List,

    /// Run tests (all of them when no name is given)
    Run(RunArgs),
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Tests to run, by name
    #[arg(value_name = "NAME")]
    names: Vec<String>,

    /// Input generator seed, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_seed)]
    seed: Option<u64>,

    /// Backend executing the kernels (host, opencl)
    #[arg(long, value_name = "BACKEND")]
    backend: Option<BackendKind>,

    /// Zero-based platform index
    #[arg(long, value_name = "I")]
    platform: Option<usize>,

    /// Zero-based device index within the platform
    #[arg(long, value_name = "I")]
    device: Option<usize>,

    /// Device type filter (all, gpu, cpu, accelerator)
    #[arg(long, value_name = "TYPE")]
    device_type: Option<DeviceKind>,

    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Exit 0 when only value mismatches were found
    #[arg(long)]
    lenient_exit: bool,
}

impl RunArgs {
    /// Defaults, then the TOML file or environment, then these flags.
    fn resolve_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => HarnessConfig::from_env().context("invalid CLCONF_* environment override")?,
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(platform) = self.platform {
            config.platform_index = platform;
        }
        if let Some(device) = self.device {
            config.device_index = device;
        }
        if let Some(device_type) = self.device_type {
            config.device_type = device_type;
        }
        config.lenient_exit |= self.lenient_exit;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn selected_cases(&self) -> Result<Vec<Box<dyn ConformanceCase>>> {
        if self.names.is_empty() {
            return Ok(cases::all());
        }
        let mut selected = Vec::with_capacity(self.names.len());
        for name in &self.names {
            match cases::by_name(name) {
                Some(case) => selected.push(case),
                None => bail!("unknown test '{name}' (available: {})", cases::names().join(", ")),
            }
        }
        Ok(selected)
    }
}

fn main() -> Result<ExitCode> {
    clconf_harness::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::List => list(),
        Commands::Run(args) => run(&args),
    }
}

fn list() -> Result<ExitCode> {
    let mut out = io::stdout().lock();
    for case in cases::all() {
        writeln!(out, "{:<12} {}", case.name(), case.description()).context("failed to write test list")?;
    }
    Ok(ExitCode::SUCCESS)
}

fn run(args: &RunArgs) -> Result<ExitCode> {
    let config = args.resolve_config()?;
    let selected = args.selected_cases()?;
    info!(tests = selected.len(), seed = config.seed, backend = %config.backend, "starting run");

    let mut code = EXIT_SUCCESS;
    for case in &selected {
        let summary = clconf_harness::run_with_config(case.as_ref(), &config, io::stdout().lock());
        let case_code = summary.exit_code(config.lenient_exit);
        if case_code != EXIT_SUCCESS {
            warn!(case = %summary.case, mismatches = summary.mismatch_count(), exit = case_code, "test failed");
        }
        code = worst(code, case_code);
    }
    io::stdout().flush().context("failed to flush report")?;
    Ok(ExitCode::from(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "clconf", "run", "srl", "divrem", "--seed", "0x10", "--backend", "host", "--device", "0",
            "--lenient-exit",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        assert_eq!(args.names, ["srl", "divrem"]);
        assert_eq!(args.seed, Some(16));
        assert_eq!(args.backend, Some(BackendKind::Host));
        assert_eq!(args.device, Some(0));
        assert!(args.lenient_exit);
    }

    #[test]
    fn rejects_bad_backend() {
        assert!(Cli::try_parse_from(["clconf", "run", "--backend", "cuda"]).is_err());
    }

    #[test]
    fn unknown_test_is_an_error() {
        let args = RunArgs { names: vec!["pow".into()], ..RunArgs::default() };
        let err = args.selected_cases().err().unwrap();
        assert!(err.to_string().contains("unknown test 'pow'"));
    }

    #[test]
    fn empty_selection_runs_everything() {
        let args = RunArgs::default();
        assert_eq!(args.selected_cases().unwrap().len(), cases::names().len());
    }
}
