use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, ScalarArg, VectorWidth};
use crate::error::Result;
use crate::kernels;
use crate::reference;

const DATA_SIZE: usize = 64;

/// `out[i] = in[i]^2` over 64 floats.
pub struct Square;

impl ConformanceCase for Square {
    fn name(&self) -> &'static str {
        "square"
    }

    fn description(&self) -> &'static str {
        "square 64 floats in [0, 1)"
    }

    fn configurations(&self) -> Vec<Configuration> {
        vec![Configuration::new("float", kernels::SQUARE).variant(OperationSpec::new(
            "square",
            ElementType::F32,
            VectorWidth::Scalar,
        ))]
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let spec = config.primary()?;
        let input = session.generator().uniform(DATA_SIZE, VectorWidth::Scalar, 0.0f32..1.0, &[]);

        let args = [
            KernelArg::Input(input.to_buffer()),
            KernelArg::output(ElementType::F32, DATA_SIZE),
            KernelArg::Scalar(ScalarArg::Uint(DATA_SIZE as u32)),
        ];
        let device = session.launch(spec.entry, &args, DATA_SIZE)?.next::<f32>()?;
        let expected: Vec<f32> = input.values().iter().map(|&x| reference::square(x)).collect();

        let report = Comparator::new(EqualityPolicy::Value).compare(spec.entry, &device, &expected, |i| {
            super::operand(input.values(), VectorWidth::Scalar, i)
        })?;
        Ok(vec![report])
    }
}
