//! Full runs of the conformance cases against the host backend, plus runs
//! against deliberately faulty backends to pin down reporting and exit codes.

mod support;

use clconf_harness::backend::{ComputeBackend, KernelArg};
use clconf_harness::exit::{EXIT_FATAL, EXIT_MISMATCH, EXIT_SUCCESS};
use clconf_harness::{
    BackendKind, ElementType, HarnessConfig, HarnessError, HostBackend, HostBuffer, Reporter, RunSummary, cases,
    kernels, run_case, run_with_config,
};
use support::faulty::{AbortingBackend, CorruptingBackend, FailingBuildBackend, NegativeZeroBackend};

fn host_config() -> HarnessConfig {
    HarnessConfig { backend: BackendKind::Host, ..HarnessConfig::default() }
}

fn run_on(case: &str, backend: &mut dyn ComputeBackend, config: &HarnessConfig) -> (RunSummary, String) {
    let case = cases::by_name(case).unwrap();
    let mut reporter = Reporter::new(Vec::new());
    let summary = run_case(case.as_ref(), backend, config, &mut reporter);
    (summary, String::from_utf8(reporter.into_inner()).unwrap())
}

#[test]
fn every_case_is_clean_on_the_host_backend() {
    let config = host_config();
    for case in cases::all() {
        let mut out = Vec::new();
        let summary = run_with_config(case.as_ref(), &config, &mut out);
        let text = String::from_utf8(out).unwrap();
        assert!(summary.fatal.is_none(), "{}: {:?}\n{text}", case.name(), summary.fatal);
        assert!(!summary.reports.is_empty(), "{} produced no reports", case.name());
        assert_eq!(summary.mismatch_count(), 0, "{} mismatched:\n{text}", case.name());
        assert_eq!(summary.exit_code(false), EXIT_SUCCESS);
    }
}

#[test]
fn clean_runs_do_not_depend_on_the_seed() {
    for seed in [0, 1, u64::MAX] {
        let config = HarnessConfig { seed, ..host_config() };
        for case in cases::all() {
            let summary = run_with_config(case.as_ref(), &config, std::io::sink());
            assert!(summary.is_clean(), "{} seed {seed}: {:?}", case.name(), summary.fatal);
        }
    }
}

#[test]
fn square_reports_zero_of_sixty_four() {
    let mut backend = HostBackend::new();
    let (summary, text) = run_on("square", &mut backend, &host_config());
    assert!(summary.is_clean());
    assert!(text.starts_with("Platform is `clconf host emulator' by: clconf"), "{text}");
    assert!(text.contains("Device is `host cpu'"), "{text}");
    assert!(text.contains("Wrong: 0/64\n"), "{text}");
}

#[test]
fn two_variant_cases_label_each_summary() {
    let mut backend = HostBackend::new();
    let (summary, text) = run_on("fmin", &mut backend, &host_config());
    assert_eq!(summary.reports.len(), 2);
    assert!(text.contains("Wrong1: 0/64\n"), "{text}");
    assert!(text.contains("Wrong2: 0/64\n"), "{text}");
}

#[test]
fn fmin_accepts_either_zero_for_mixed_zero_operands() {
    let mut backend = NegativeZeroBackend::new();
    let (summary, text) = run_on("fmin", &mut backend, &host_config());
    // Both orders of the zero pair, in both the scalar and float4 launches.
    assert_eq!(backend.rewritten, 4);
    assert!(summary.is_clean(), "{text}");
    assert!(text.contains("Wrong1: 0/64\n"), "{text}");
    assert!(text.contains("Wrong2: 0/64\n"), "{text}");
    assert_eq!(summary.exit_code(false), EXIT_SUCCESS);
}

#[test]
fn divrem_runs_every_integer_width() {
    let mut backend = HostBackend::new();
    let (summary, text) = run_on("divrem", &mut backend, &host_config());
    assert!(summary.is_clean());
    for label in ["char", "uchar", "int", "uint", "long", "ulong"] {
        assert!(text.contains(&format!("== divrem [{label}]\n")), "{text}");
    }
    assert_eq!(summary.reports.len(), 6);
}

#[test]
fn ulong_one_over_max_is_zero_remainder_one() {
    let mut backend = HostBackend::new();
    let program = backend.build(&kernels::DIVREM, "-DTYPE=ulong").unwrap();
    let args = [
        KernelArg::Input(HostBuffer::U64(vec![1, 7, 5])),
        KernelArg::Input(HostBuffer::U64(vec![u64::MAX, 0, 2])),
        KernelArg::output(ElementType::U64, 3),
        KernelArg::output(ElementType::U64, 3),
    ];
    let outputs = backend.launch(program, "divrem", &args, 3, Some(1)).unwrap();
    assert_eq!(outputs, vec![HostBuffer::U64(vec![0, 0, 2]), HostBuffer::U64(vec![1, 0, 1])]);
}

#[test]
fn signed_min_over_minus_one_wraps() {
    let mut backend = HostBackend::new();
    let program = backend.build(&kernels::DIVREM, "-DTYPE=char").unwrap();
    let args = [
        KernelArg::Input(HostBuffer::I8(vec![i8::MIN, -7])),
        KernelArg::Input(HostBuffer::I8(vec![-1, 2])),
        KernelArg::output(ElementType::I8, 2),
        KernelArg::output(ElementType::I8, 2),
    ];
    let outputs = backend.launch(program, "divrem", &args, 2, None).unwrap();
    assert_eq!(outputs, vec![HostBuffer::I8(vec![i8::MIN, -3]), HostBuffer::I8(vec![0, -1])]);
}

#[test]
fn vector_shift_agrees_with_scalar_where_amounts_coincide() {
    let mut backend = HostBackend::new();
    let program = backend.build(&kernels::SRL, "").unwrap();
    let input: Vec<u64> = (0..8).map(|i| u64::MAX - i).collect();
    let args = [KernelArg::Input(HostBuffer::U64(input.clone())), KernelArg::output(ElementType::U64, 8)];

    let scalar = backend.launch(program, "srl_test", &args, 8, None).unwrap();
    let vec4 = backend.launch(program, "srl_vec4_test", &args, 2, None).unwrap();
    let (HostBuffer::U64(scalar), HostBuffer::U64(vec4)) = (&scalar[0], &vec4[0]) else {
        panic!("srl writes ulong");
    };
    // Element 0 is shifted by 0 in both.
    assert_eq!(scalar[0], input[0]);
    assert_eq!(vec4[0], scalar[0]);
    // Elements 4..8 belong to the second vector, shifted by 1.
    assert_eq!(vec4[4], input[4] >> 1);
    assert_eq!(scalar[4], input[4] >> 4);
}

#[test]
fn corrupted_output_exits_with_mismatch() {
    let mut backend = CorruptingBackend::new();
    let (summary, text) = run_on("square", &mut backend, &host_config());
    assert!(summary.fatal.is_none());
    assert_eq!(summary.mismatch_count(), 1);
    assert!(text.contains("Incorrect element(0):"), "{text}");
    assert!(text.contains("Wrong: 1/64\n"), "{text}");
    assert_eq!(summary.exit_code(false), EXIT_MISMATCH);
    assert_eq!(summary.exit_code(true), EXIT_SUCCESS);
}

#[test]
fn corrupted_vector_record_counts_once() {
    let mut backend = CorruptingBackend::new();
    let (summary, text) = run_on("weightblend", &mut backend, &host_config());
    assert_eq!(summary.mismatch_count(), 1);
    assert!(text.contains("Wrong: 1/16\n"), "{text}");
}

#[test]
fn build_failure_prints_log_and_is_fatal() {
    let mut backend = FailingBuildBackend::new();
    let (summary, text) = run_on("normalize", &mut backend, &host_config());
    assert!(matches!(summary.fatal, Some(HarnessError::Build { .. })));
    assert!(summary.reports.is_empty());
    assert!(text.contains(&format!("BUILD FAIL\n{}\nLOG DONE\n", FailingBuildBackend::LOG)), "{text}");
    assert!(text.contains("FATAL: failed to build program 'normalize'"), "{text}");
    assert_eq!(summary.exit_code(true), EXIT_FATAL);
}

#[test]
fn abort_keeps_reports_of_finished_configurations() {
    let mut backend = AbortingBackend::after(2);
    let (summary, text) = run_on("divrem", &mut backend, &host_config());
    assert_eq!(summary.reports.len(), 2);
    assert!(matches!(summary.fatal, Some(HarnessError::Launch { .. })));
    assert!(text.contains("== divrem [int]\n"), "{text}");
    assert!(!text.contains("== divrem [uint]"), "{text}");
    assert!(text.contains("FATAL: launch of kernel 'divrem' failed: CL_OUT_OF_RESOURCES"), "{text}");
    assert_eq!(summary.exit_code(false), EXIT_FATAL);
}

#[test]
fn unavailable_device_is_fatal_before_any_output() {
    let config = HarnessConfig { device_index: 3, ..host_config() };
    let mut out = Vec::new();
    let summary = run_with_config(&cases::Square, &config, &mut out);
    assert!(summary.fatal.as_ref().is_some_and(HarnessError::is_setup));
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("FATAL: setup failed"), "{text}");
}

#[test]
fn uneven_local_size_falls_back_to_driver_choice() {
    // None of these global sizes is a multiple of 5; the session drops the
    // hint instead of failing the launch.
    let config = HarnessConfig { local_work_size: Some(5), ..host_config() };
    for name in ["normalize", "srl", "contrast"] {
        let case = cases::by_name(name).unwrap();
        let summary = run_with_config(case.as_ref(), &config, std::io::sink());
        assert!(summary.is_clean(), "{name}: {:?}", summary.fatal);
    }
}
