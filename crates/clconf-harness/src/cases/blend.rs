use crate::backend::KernelArg;
use crate::compare::{Comparator, ComparisonReport, EqualityPolicy};
use crate::driver::{Configuration, ConformanceCase, OperationSpec, Session};
use crate::element::{ElementType, VectorWidth};
use crate::error::Result;
use crate::kernels;
use crate::reference;

const PIXELS: usize = 16;

/// Pixels written over the random fill, as (input, aux) RGBA pairs: a mixed
/// pair, both alphas zero, and a fully transparent input over an opaque aux.
const BOUNDARY_PIXELS: [([f32; 4], [f32; 4]); 3] = [
    ([0.0, 1.0, 0.0, 1.0], [1.0, 0.0, 0.0, 0.5]),
    ([0.3, 0.4, 0.5, 0.0], [0.9, 0.8, 0.7, 0.0]),
    ([0.3, 0.4, 0.5, 0.0], [0.9, 0.8, 0.7, 1.0]),
];

/// Alpha-weighted blend of two `float4` images.
pub struct WeightBlend;

impl ConformanceCase for WeightBlend {
    fn name(&self) -> &'static str {
        "weightblend"
    }

    fn description(&self) -> &'static str {
        "alpha-weighted blend of two float4 images, zero total alpha included"
    }

    fn configurations(&self) -> Vec<Configuration> {
        vec![Configuration::new("float4", kernels::BLEND).variant(OperationSpec::new(
            "cl_weighted_blend",
            ElementType::F32,
            VectorWidth::V4,
        ))]
    }

    fn run_configuration(&self, config: &Configuration, session: &mut Session<'_>) -> Result<Vec<ComparisonReport>> {
        let spec = config.primary()?;
        let pixel_overrides = |pick: fn(&([f32; 4], [f32; 4])) -> [f32; 4]| -> Vec<(usize, f32)> {
            BOUNDARY_PIXELS
                .iter()
                .enumerate()
                .flat_map(|(p, pair)| pick(pair).into_iter().enumerate().map(move |(c, v)| (p * 4 + c, v)))
                .collect()
        };
        let input = session.generator().uniform(PIXELS, spec.width, 0.0f32..1.0, &pixel_overrides(|p| p.0));
        let aux = session.generator().uniform(PIXELS, spec.width, 0.0f32..1.0, &pixel_overrides(|p| p.1));

        let args = [
            KernelArg::Input(input.to_buffer()),
            KernelArg::Input(aux.to_buffer()),
            KernelArg::output(ElementType::F32, PIXELS * 4),
        ];
        let device = session.launch(spec.entry, &args, PIXELS)?.next::<f32>()?;

        let expected: Vec<f32> = input
            .values()
            .chunks_exact(4)
            .zip(aux.values().chunks_exact(4))
            .flat_map(|(i, a)| reference::weighted_blend(pixel(i), pixel(a)))
            .collect();

        let report = Comparator::new(EqualityPolicy::Value).with_group(4, 4).compare(
            spec.entry,
            &device,
            &expected,
            |p| {
                format!(
                    "in {} aux {}",
                    super::operand(input.values(), spec.width, p),
                    super::operand(aux.values(), spec.width, p)
                )
            },
        )?;
        Ok(vec![report])
    }
}

fn pixel(lanes: &[f32]) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (slot, &v) in out.iter_mut().zip(lanes) {
        *slot = v;
    }
    out
}
