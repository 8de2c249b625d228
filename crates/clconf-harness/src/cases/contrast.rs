use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, HostBuffer, ScalarArg, VectorWidth};
use crate::error::Result;
use crate::kernels;
use crate::reference;

/// Floats per buffer (32 `float2` pixels).
const DATA_SIZE: usize = 64;
const CURVE_POINTS: usize = 5;

/// Tone-curve lookup through a host-backed read-only curve buffer.
pub struct Contrast;

impl ConformanceCase for Contrast {
    fn name(&self) -> &'static str {
        "contrast"
    }

    fn description(&self) -> &'static str {
        "float2 tone-curve lookup with a by-value sample count"
    }

    fn configurations(&self) -> Vec<Configuration> {
        vec![Configuration::new("float2", kernels::CONTRAST).variant(OperationSpec::new(
            "contrast",
            ElementType::F32,
            VectorWidth::V2,
        ))]
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let spec = config.primary()?;
        let pixels = DATA_SIZE / spec.width.storage_lanes();
        // Below the curve, exactly at its end, past it, and just inside.
        let overrides = [(0, -0.5f32), (2, 1.0), (4, 2.0), (6, 0.999)];
        let input = session.generator().uniform(pixels, spec.width, 0.0f32..1.0, &overrides);
        let curve = reference::linear_curve(CURVE_POINTS);

        let args = [
            KernelArg::Input(input.to_buffer()),
            KernelArg::output(ElementType::F32, DATA_SIZE),
            KernelArg::Input(HostBuffer::F32(curve.clone())),
            KernelArg::Scalar(ScalarArg::Int(CURVE_POINTS as i32)),
        ];
        let device = session.launch(spec.entry, &args, pixels)?.next::<f32>()?;

        let expected: Vec<f32> = input
            .values()
            .chunks_exact(2)
            .flat_map(|p| reference::contrast([p[0], p[1]], &curve))
            .collect();

        let report = Comparator::new(EqualityPolicy::Value).with_group(2, 2).compare(
            spec.entry,
            &device,
            &expected,
            |p| super::operand(input.values(), spec.width, p),
        )?;
        Ok(vec![report])
    }
}
