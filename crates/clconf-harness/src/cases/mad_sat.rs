use rand::distr::uniform::SampleUniform;

use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, VectorWidth};
use crate::error::{HarnessError, Result};
use crate::kernels;
use crate::reference::{self, IntegerOps, SaturatingMad};

const VECTORS: usize = 16;

/// Saturating multiply-add on unsigned scalars and vectors.
pub struct MadSat;

impl ConformanceCase for MadSat {
    fn name(&self) -> &'static str {
        "mad_sat"
    }

    fn description(&self) -> &'static str {
        "mad_sat on uint3, uchar, ushort2 and ulong4 across the full value range"
    }

    fn configurations(&self) -> Vec<Configuration> {
        [
            (ElementType::U32, VectorWidth::V3),
            (ElementType::U8, VectorWidth::Scalar),
            (ElementType::U16, VectorWidth::V2),
            (ElementType::U64, VectorWidth::V4),
        ]
        .into_iter()
        .map(|(element, width)| Configuration::typed(kernels::MAD_SAT, "mad_sat_test", element, width))
        .collect()
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let spec = config.primary()?;
        let report = match spec.element {
            ElementType::U8 => run_typed::<u8>(spec, session)?,
            ElementType::U16 => run_typed::<u16>(spec, session)?,
            ElementType::U32 => run_typed::<u32>(spec, session)?,
            ElementType::U64 => run_typed::<u64>(spec, session)?,
            other => {
                return Err(HarnessError::ArgumentMismatch {
                    kernel: spec.entry.to_string(),
                    detail: format!("mad_sat is tested on unsigned types only, not {other}"),
                });
            }
        };
        Ok(vec![report])
    }
}

fn run_typed<T>(spec: OperationSpec, session: &mut Session<'_>) -> Result<ComparisonReport>
where
    T: SaturatingMad + IntegerOps + SampleUniform + PartialOrd,
{
    let stride = spec.width.storage_lanes();
    let len = VECTORS * stride;
    let (zero, one, max) = (T::ZERO, T::ONE, <T as SaturatingMad>::MAX);

    // Lane 0 of the first vectors: max*max+max, zero product, exact max,
    // max plus one, and 1*1+0.
    let a_over = [(0, max), (stride, zero), (2 * stride, max), (3 * stride, max), (4 * stride, one)];
    let b_over = [(0, max), (2 * stride, one), (3 * stride, one), (4 * stride, one)];
    let c_over = [(0, max), (2 * stride, zero), (3 * stride, one), (4 * stride, zero)];

    let generator = session.generator();
    let a = generator.uniform(VECTORS, spec.width, zero..=max, &a_over);
    let b = generator.uniform(VECTORS, spec.width, zero..=max, &b_over);
    let c = generator.uniform(VECTORS, spec.width, zero..=max, &c_over);

    let args = [
        KernelArg::Input(a.to_buffer()),
        KernelArg::Input(b.to_buffer()),
        KernelArg::Input(c.to_buffer()),
        KernelArg::output(spec.element, len),
    ];
    let device = session.launch(spec.entry, &args, VECTORS)?.next::<T>()?;

    let expected: Vec<T> = a
        .values()
        .iter()
        .zip(b.values())
        .zip(c.values())
        .map(|((&x, &y), &z)| reference::mad_sat(x, y, z))
        .collect();

    Comparator::new(EqualityPolicy::Value).with_group(stride, spec.width.lanes()).compare(
        spec.entry,
        &device,
        &expected,
        |i| {
            format!(
                "{} * {} + {}",
                super::operand(a.values(), spec.width, i),
                super::operand(b.values(), spec.width, i),
                super::operand(c.values(), spec.width, i),
            )
        },
    )
}
