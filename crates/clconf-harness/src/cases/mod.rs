//! The conformance micro-tests.

mod blend;
mod contrast;
mod divrem;
mod fmin;
mod ilogb;
mod int64;
mod mad_sat;
mod normalize;
mod square;
mod srl;

pub use blend::WeightBlend;
pub use contrast::Contrast;
pub use divrem::DivRem;
pub use fmin::Fmin;
pub use ilogb::Ilogb;
pub use int64::Int64;
pub use mad_sat::MadSat;
pub use normalize::Normalize;
pub use square::Square;
pub use srl::ShiftRight;

use std::fmt::Display;

use crate::compare::render;
use crate::driver::ConformanceCase;
use crate::element::VectorWidth;

/// Every test, in listing order.
pub fn all() -> Vec<Box<dyn ConformanceCase>> {
    vec![
        Box::new(Square),
        Box::new(Fmin),
        Box::new(Ilogb),
        Box::new(MadSat),
        Box::new(Normalize),
        Box::new(DivRem),
        Box::new(ShiftRight),
        Box::new(WeightBlend),
        Box::new(Contrast),
        Box::new(Int64),
    ]
}

pub fn by_name(name: &str) -> Option<Box<dyn ConformanceCase>> {
    all().into_iter().find(|case| case.name() == name)
}

pub fn names() -> Vec<&'static str> {
    all().iter().map(|case| case.name()).collect()
}

/// The significant lanes of record `index` in a flattened buffer.
pub(crate) fn lanes<T>(values: &[T], width: VectorWidth, index: usize) -> &[T] {
    let start = index * width.storage_lanes();
    values.get(start..start + width.lanes()).unwrap_or(&[])
}

/// Render record `index` of a flattened buffer for a mismatch line.
pub(crate) fn operand<T: Display>(values: &[T], width: VectorWidth, index: usize) -> String {
    render(lanes(values, width, index))
}
