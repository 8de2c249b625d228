use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, Session};
use crate::element::{ElementType, VectorWidth};
use crate::error::Result;
use crate::kernels;
use crate::reference;

/// Scalar slots per configuration; the last four are zeroed.
const DATA_SIZE: usize = 12;

/// `normalize` on `float` through `float4`.
pub struct Normalize;

impl ConformanceCase for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn description(&self) -> &'static str {
        "normalize on float, float2, float3 and float4, zero vectors included"
    }

    fn configurations(&self) -> Vec<Configuration> {
        [VectorWidth::Scalar, VectorWidth::V2, VectorWidth::V3, VectorWidth::V4]
            .into_iter()
            .map(|width| Configuration::typed(kernels::NORMALIZE, "norm", ElementType::F32, width))
            .collect()
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let spec = config.primary()?;
        let (stride, lanes) = (spec.width.storage_lanes(), spec.width.lanes());
        let vectors = DATA_SIZE / stride;

        let mut overrides = vec![(0, -3.0f32)];
        overrides.extend((DATA_SIZE - 4..DATA_SIZE).map(|i| (i, 0.0)));
        let input = session.generator().uniform(vectors, spec.width, 0.0f32..10.0, &overrides);

        let args = [KernelArg::Input(input.to_buffer()), KernelArg::output(ElementType::F32, input.len())];
        let device = session.launch(spec.entry, &args, vectors)?.next::<f32>()?;

        let mut expected = vec![0.0f32; input.len()];
        for (record, chunk) in expected.chunks_exact_mut(stride).enumerate() {
            let normalized = reference::normalize(super::lanes(input.values(), spec.width, record));
            for (slot, value) in chunk.iter_mut().zip(normalized) {
                *slot = value;
            }
        }

        let report = Comparator::new(EqualityPolicy::Value).with_group(stride, lanes).compare(
            spec.entry,
            &device,
            &expected,
            |i| super::operand(input.values(), spec.width, i),
        )?;
        Ok(vec![report])
    }
}
