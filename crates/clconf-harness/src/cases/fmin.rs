use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, VectorWidth};
use crate::error::Result;
use crate::kernels;
use crate::reference;

const DATA_SIZE: usize = 64;

/// Operand pairs written over the random fill: NaN payloads on either side,
/// infinities, and both orders of signed zero.
fn boundary_pairs() -> [(f32, f32); 6] {
    [
        (f32::from_bits(0x7fe7_afae), f32::from_bits(0x134a_752c)),
        (f32::from_bits(0x1010_8d49), f32::from_bits(0xffa6_6c5d)),
        (f32::INFINITY, 1.0),
        (f32::NEG_INFINITY, f32::from_bits(0x7fc0_0000)),
        (0.0, -0.0),
        (-0.0, 0.0),
    ]
}

/// Scalar and `float4` `fmin`, compared bit for bit except for the sign of
/// a zero result, which `fmin(±0, ∓0)` leaves unspecified.
pub struct Fmin;

impl ConformanceCase for Fmin {
    fn name(&self) -> &'static str {
        "fmin"
    }

    fn description(&self) -> &'static str {
        "fmin on float and float4 with NaN, infinity and signed-zero operands"
    }

    fn configurations(&self) -> Vec<Configuration> {
        vec![
            Configuration::new("float/float4", kernels::FMIN)
                .variant(OperationSpec::new("fmin_test", ElementType::F32, VectorWidth::Scalar))
                .variant(OperationSpec::new("fmin_vec_test", ElementType::F32, VectorWidth::V4)),
        ]
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let pairs = boundary_pairs();
        let lhs: Vec<_> = pairs.iter().enumerate().map(|(i, p)| (i, p.0)).collect();
        let rhs: Vec<_> = pairs.iter().enumerate().map(|(i, p)| (i, p.1)).collect();
        let a = session.generator().uniform(DATA_SIZE, VectorWidth::Scalar, 0.0f32..1.0, &lhs);
        let b = session.generator().uniform(DATA_SIZE, VectorWidth::Scalar, 0.0f32..1.0, &rhs);

        let expected: Vec<f32> =
            a.values().iter().zip(b.values()).map(|(&x, &y)| reference::fmin(x, y)).collect();
        let comparator = Comparator::new(EqualityPolicy::BitPatternAnyZero);

        let mut reports = Vec::with_capacity(config.variants.len());
        for spec in &config.variants {
            let args = [
                KernelArg::Input(a.to_buffer()),
                KernelArg::Input(b.to_buffer()),
                KernelArg::output(ElementType::F32, DATA_SIZE),
            ];
            let global = DATA_SIZE / spec.width.storage_lanes();
            let device = session.launch(spec.entry, &args, global)?.next::<f32>()?;
            reports.push(comparator.compare(spec.entry, &device, &expected, |i| {
                format!("{:e}, {:e}", a.values()[i], b.values()[i])
            })?);
        }
        Ok(reports)
    }
}
