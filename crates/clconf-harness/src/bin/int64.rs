use std::process::ExitCode;

fn main() -> ExitCode {
    clconf_harness::run_standalone(&clconf_harness::cases::Int64)
}
