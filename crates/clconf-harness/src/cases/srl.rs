use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, VectorWidth};
use crate::error::Result;
use crate::generator::{InputGenerator, TestVector};
use crate::kernels;
use crate::reference;

/// Elements per buffer. The scalar kernel shifts element `i` by `i`, so this
/// must not exceed the operand width.
const DATA_SIZE: usize = 64;

/// Full-width random operands, so high shift amounts still see set bits,
/// with all-ones and the top bit alone written over the first two.
fn inputs(generator: &mut InputGenerator) -> TestVector<u64> {
    let overrides = [(0, u64::MAX), (1, 1u64 << 63)];
    generator.uniform(DATA_SIZE, VectorWidth::Scalar, 0..=u64::MAX, &overrides)
}

/// Logical right shift of `ulong`, `ulong4` and `ulong8` by the work-item id.
pub struct ShiftRight;

impl ConformanceCase for ShiftRight {
    fn name(&self) -> &'static str {
        "srl"
    }

    fn description(&self) -> &'static str {
        "logical right shift of ulong, ulong4 and ulong8 by the work-item id"
    }

    fn configurations(&self) -> Vec<Configuration> {
        vec![
            Configuration::new("ulong/ulong4/ulong8", kernels::SRL)
                .variant(OperationSpec::new("srl_test", ElementType::U64, VectorWidth::Scalar))
                .variant(OperationSpec::new("srl_vec4_test", ElementType::U64, VectorWidth::V4))
                .variant(OperationSpec::new("srl_vec8_test", ElementType::U64, VectorWidth::V8)),
        ]
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let input = inputs(session.generator());
        let comparator = Comparator::new(EqualityPolicy::Value);

        let mut reports = Vec::with_capacity(config.variants.len());
        for spec in &config.variants {
            let lanes = spec.width.lanes();
            let expected = input
                .values()
                .iter()
                .enumerate()
                .map(|(e, &x)| {
                    let amount = reference::shift_amount(reference::vector_shift_amount(e, lanes), u64::BITS)?;
                    Ok(reference::shift_right(x, amount))
                })
                .collect::<Result<Vec<u64>>>()?;

            let args = [KernelArg::Input(input.to_buffer()), KernelArg::output(ElementType::U64, DATA_SIZE)];
            let device = session.launch(spec.entry, &args, DATA_SIZE / lanes)?.next::<u64>()?;
            reports.push(comparator.compare(spec.entry, &device, &expected, |e| {
                format!("{:#x} >> {}", input.values()[e], reference::vector_shift_amount(e, lanes))
            })?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_shift_amounts_see_set_bits() {
        let input = inputs(&mut InputGenerator::new(0));
        let values = input.values();
        assert_eq!(&values[..2], &[u64::MAX, 1 << 63]);
        // Elements past 32 are shifted by more than 32; their operands must
        // reach above bit 32 for the shift to be observable.
        let observable = values[33..].iter().enumerate().filter(|&(k, &x)| x >> (33 + k) != 0).count();
        assert!(observable > 0, "{values:x?}");
        assert!(values[2..].iter().any(|&x| x > u64::from(u32::MAX)));
    }
}
