use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, ScalarArg, VectorWidth};
use crate::error::Result;
use crate::kernels;
use crate::reference::{self, IntegerOps};

/// Multiply, divide and remainder of by-value `uint` and `ulong` arguments.
pub struct Int64;

impl ConformanceCase for Int64 {
    fn name(&self) -> &'static str {
        "int64"
    }

    fn description(&self) -> &'static str {
        "x*y, x/y and x%y on by-value uint and ulong arguments"
    }

    fn configurations(&self) -> Vec<Configuration> {
        vec![
            Configuration::new("uint/ulong", kernels::INT64)
                .variant(OperationSpec::new("test1", ElementType::U32, VectorWidth::Scalar))
                .variant(OperationSpec::new("test2", ElementType::U64, VectorWidth::Scalar)),
        ]
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let mut reports = Vec::with_capacity(config.variants.len());
        for spec in &config.variants {
            let report = match spec.element {
                ElementType::U32 => {
                    let random = (session.generator().value(0..=u32::MAX), session.generator().value(1..=u32::MAX));
                    let pairs = [(6, 4), (u32::MAX, 3), (7, 0), random];
                    run_pairs(*spec, session, &pairs, ScalarArg::Uint)?
                }
                _ => {
                    let random = (session.generator().value(0..=u64::MAX), session.generator().value(1..=u64::MAX));
                    let pairs = [(6, 4), (u64::MAX, 3), (7, 0), random];
                    run_pairs(*spec, session, &pairs, ScalarArg::Ulong)?
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }
}

/// One single-work-item launch per `(x, y)` pair; each writes three results.
fn run_pairs<T: IntegerOps>(
    spec: OperationSpec,
    session: &mut Session<'_>,
    pairs: &[(T, T)],
    scalar: fn(T) -> ScalarArg,
) -> Result<ComparisonReport> {
    let mut device = Vec::with_capacity(pairs.len() * 3);
    let mut expected = Vec::with_capacity(pairs.len() * 3);
    for &(x, y) in pairs {
        let args = [KernelArg::Scalar(scalar(x)), KernelArg::Scalar(scalar(y)), KernelArg::output(T::TYPE, 3)];
        device.extend(session.launch(spec.entry, &args, 1)?.next::<T>()?);
        expected.extend(reference::scalar_arith(x, y));
    }
    Comparator::new(EqualityPolicy::Value).with_group(3, 3).compare(spec.entry, &device, &expected, |i| {
        let (x, y) = pairs[i];
        format!("x={x} y={y} (x*y, x/y, x%y)")
    })
}
