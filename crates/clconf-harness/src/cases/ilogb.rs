use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, VectorWidth};
use crate::error::Result;
use crate::kernels;
use crate::reference;

const DATA_SIZE: usize = 64;

fn boundary_values() -> Vec<(usize, f32)> {
    [
        0.0,
        f32::NAN,
        f32::INFINITY,
        -0.0,
        f32::NEG_INFINITY,
        f32::from_bits(1),
        f32::MIN_POSITIVE,
        f32::MAX,
        f32::from_bits(0x007f_ffff),
        -3.5,
    ]
    .into_iter()
    .enumerate()
    .collect()
}

/// Scalar and `float4` `ilogb`, subnormals and sentinels included.
pub struct Ilogb;

impl ConformanceCase for Ilogb {
    fn name(&self) -> &'static str {
        "ilogb"
    }

    fn description(&self) -> &'static str {
        "ilogb on float and float4 including zero, NaN, infinity and subnormals"
    }

    fn configurations(&self) -> Vec<Configuration> {
        vec![
            Configuration::new("float/float4", kernels::ILOGB)
                .variant(OperationSpec::new("ilogb_test", ElementType::F32, VectorWidth::Scalar))
                .variant(OperationSpec::new("ilogb_vec_test", ElementType::F32, VectorWidth::V4)),
        ]
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let input =
            session.generator().uniform(DATA_SIZE, VectorWidth::Scalar, 0.0f32..1.0, &boundary_values());
        let expected: Vec<i32> = input.values().iter().map(|&x| reference::ilogb(x)).collect();
        let comparator = Comparator::new(EqualityPolicy::Value);

        let mut reports = Vec::with_capacity(config.variants.len());
        for spec in &config.variants {
            let args = [KernelArg::Input(input.to_buffer()), KernelArg::output(ElementType::I32, DATA_SIZE)];
            let global = DATA_SIZE / spec.width.storage_lanes();
            let device = session.launch(spec.entry, &args, global)?.next::<i32>()?;
            reports.push(comparator.compare(spec.entry, &device, &expected, |i| {
                format!("{:e}", input.values()[i])
            })?);
        }
        Ok(reports)
    }
}
